//! The `fieldjournal upload` command.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use clap::Args;
use fieldjournal_core::pipeline::FileDiscovery;
use fieldjournal_core::{
    Config, FieldJournal, GalleryStore, NewGallery, UploadError, UploadFile, UploadOutcome,
    UploadProgress, UploadStage,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use uuid::Uuid;

use super::{connect, expand_path, parse_id, stdout_writer};

/// Arguments for the `upload` command.
#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Image file or directory of images
    pub input: PathBuf,

    /// Gallery to upload into
    #[arg(short, long, required_unless_present = "dry_run")]
    pub gallery: Option<String>,

    /// Run the pipeline against in-memory storage
    #[arg(long)]
    pub dry_run: bool,

    /// Title of the scratch gallery created for a dry run
    #[arg(long, default_value = "Dry run")]
    pub title: String,

    /// Maximum uploads in flight (overrides upload.max_concurrent)
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Stream progress events as JSON Lines on stdout instead of a progress bar
    #[arg(long)]
    pub events: bool,
}

/// Per-file line of the upload report.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FailedUpload {
    file_name: String,
    error: String,
}

/// Everything written to stdout once the batch finishes.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadReport {
    gallery_id: Uuid,
    uploaded: Vec<UploadOutcome>,
    failed: Vec<FailedUpload>,
    /// Saved without AI suggestions
    degraded: usize,
}

impl UploadReport {
    fn new(gallery_id: Uuid, results: Vec<Result<UploadOutcome, UploadError>>) -> Self {
        let mut uploaded = Vec::new();
        let mut failed = Vec::new();
        for result in results {
            match result {
                Ok(outcome) => uploaded.push(outcome),
                Err(e) => failed.push(FailedUpload {
                    file_name: e.file_name().to_string(),
                    error: e.to_string(),
                }),
            }
        }
        let degraded = uploaded.iter().filter(|o| o.ai_degraded).count();
        Self {
            gallery_id,
            uploaded,
            failed,
            degraded,
        }
    }
}

/// Execute the upload command.
pub async fn execute(args: UploadArgs, mut config: Config) -> anyhow::Result<()> {
    let input = expand_path(&args.input);
    if !input.exists() {
        anyhow::bail!(
            "Input path does not exist: {:?}\n\n  Hint: Check the file path and try again.",
            input
        );
    }

    if let Some(concurrency) = args.concurrency {
        config.upload.max_concurrent = concurrency.max(1);
    }

    let discovered = FileDiscovery::new(config.upload.clone()).discover(&input);
    if discovered.is_empty() {
        anyhow::bail!(
            "No uploadable images found at {:?}\n\n  Allowed types: {}",
            input,
            config.upload.allowed_types.join(", ")
        );
    }
    tracing::info!(
        "Found {} images ({:.1} MB)",
        discovered.len(),
        FileDiscovery::total_size(&discovered) as f64 / 1_048_576.0
    );

    let journal = if args.dry_run {
        FieldJournal::in_memory(config.clone())?
    } else {
        connect(config.clone())?
    };

    let gallery_id = match (&args.gallery, args.dry_run) {
        (Some(raw), false) => parse_id("gallery", raw)?,
        _ => {
            let gallery = journal
                .store()
                .create_gallery(&NewGallery {
                    title: args.title.clone(),
                    ..NewGallery::default()
                })
                .await?;
            tracing::info!("Dry run: created in-memory gallery {} ({})", gallery.title, gallery.id);
            gallery.id
        }
    };
    let target = journal.upload_target(gallery_id).await?;

    let mut files = Vec::with_capacity(discovered.len());
    for entry in &discovered {
        match UploadFile::from_path(&entry.path).await {
            Ok(file) => files.push(file),
            Err(e) => tracing::warn!("Skipping {:?}: {e}", entry.path),
        }
    }

    let progress = if args.events {
        stream_events(&journal, &config);
        None
    } else {
        Some(attach_progress_bar(&journal, files.len() as u64))
    };

    let uploads = journal.uploads().clone();
    let cancel = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let cancelled = uploads.cancel_pending();
            tracing::warn!("Interrupted: cancelled {cancelled} queued uploads, finishing the rest");
        }
    });

    let results = journal.uploads().upload_batch(&target, files).await;
    cancel.abort();

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let report = UploadReport::new(gallery_id, results);
    eprintln!(
        "Uploaded {} of {} images ({} without AI suggestions, {} failed)",
        report.uploaded.len(),
        report.uploaded.len() + report.failed.len(),
        report.degraded,
        report.failed.len()
    );
    for failure in &report.failed {
        tracing::error!("{}", failure.error);
    }

    if !args.events {
        let mut writer = stdout_writer(&config);
        writer.write(&report)?;
        writer.flush()?;
    }

    if report.uploaded.is_empty() {
        anyhow::bail!("no images were uploaded");
    }
    Ok(())
}

fn attach_progress_bar(journal: &FieldJournal, total: u64) -> ProgressBar {
    let pb = create_progress_bar(total);
    let listener_pb = pb.clone();
    journal
        .uploads()
        .on_progress(Arc::new(move |event: &UploadProgress| {
            if event.stage.is_terminal() {
                listener_pb.inc(1);
            }
            listener_pb.set_message(progress_message(event));
        }));
    pb
}

fn stream_events(journal: &FieldJournal, config: &Config) {
    let writer = Mutex::new(stdout_writer(config));
    journal
        .uploads()
        .on_progress(Arc::new(move |event: &UploadProgress| {
            if let Ok(mut writer) = writer.lock() {
                if let Err(e) = writer.write(event).and_then(|()| writer.flush()) {
                    tracing::warn!("Could not write progress event: {e}");
                }
            }
        }));
}

fn progress_message(event: &UploadProgress) -> String {
    match event.stage {
        UploadStage::Error => format!("{}: {}", event.file_name, event.message),
        _ => format!("{} {}", event.file_name, event.stage.message()),
    }
}

fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb
}
