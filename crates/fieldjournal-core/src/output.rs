//! JSON and JSON Lines output for photos, galleries, upload results and
//! progress events.
//!
//! JSON writes one document per call (an array for batches). JSON Lines
//! writes one compact object per line, which suits streaming upload
//! progress to another process.

use serde::Serialize;
use std::io::{self, Write};

use crate::config::OutputConfig;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Single JSON object or array
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// Serializes records to a writer in the configured format.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    records: usize,
}

impl<W: Write> OutputWriter<W> {
    /// `pretty` only affects [`OutputFormat::Json`].
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            records: 0,
        }
    }

    /// Writer using the `[output]` section. Unknown formats fall back to JSON.
    pub fn from_config(writer: W, config: &OutputConfig) -> Self {
        let format = OutputFormat::parse(&config.format).unwrap_or(OutputFormat::Json);
        Self::new(writer, format, config.pretty)
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Write one record.
    pub fn write<T: Serialize>(&mut self, record: &T) -> io::Result<()> {
        if self.pretty && self.format == OutputFormat::Json {
            serde_json::to_writer_pretty(&mut self.writer, record).map_err(io::Error::other)?;
        } else {
            serde_json::to_writer(&mut self.writer, record).map_err(io::Error::other)?;
        }
        writeln!(self.writer)?;
        self.records += 1;
        Ok(())
    }

    /// Write a batch: a JSON array, or one line per record.
    pub fn write_all<T: Serialize>(&mut self, records: &[T]) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                if self.pretty {
                    serde_json::to_writer_pretty(&mut self.writer, records)
                        .map_err(io::Error::other)?;
                } else {
                    serde_json::to_writer(&mut self.writer, records).map_err(io::Error::other)?;
                }
                writeln!(self.writer)?;
                self.records += records.len();
            }
            OutputFormat::JsonLines => {
                for record in records {
                    self.write(record)?;
                }
            }
        }
        Ok(())
    }

    pub fn records_written(&self) -> usize {
        self.records
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Serialize a record to a JSON string.
pub fn to_json<T: Serialize>(record: &T, pretty: bool) -> Result<String, serde_json::Error> {
    if pretty {
        serde_json::to_string_pretty(record)
    } else {
        serde_json::to_string(record)
    }
}
