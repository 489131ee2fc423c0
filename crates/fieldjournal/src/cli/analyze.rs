//! The `fieldjournal analyze` command: vision analysis without saving.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Subcommand};
use fieldjournal_core::pipeline::{MetadataExtractor, VariantGenerator};
use fieldjournal_core::types::{ExifData, GpsExtraction};
use fieldjournal_core::upload::validate_upload;
use fieldjournal_core::vision::ImageInput;
use fieldjournal_core::{
    Config, FieldJournal, GalleryContext, GalleryStore, SuggestionBundle, UploadFile,
};
use serde::Serialize;

use super::{connect, expand_path, parse_id, stdout_writer};

/// Arguments for the `analyze` command.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    #[command(subcommand)]
    pub command: AnalyzeCommand,
}

#[derive(Subcommand, Debug)]
pub enum AnalyzeCommand {
    /// Caption one image (local file or URL)
    Image {
        /// Image path, or an http(s) URL the model can fetch
        input: String,

        /// Use this gallery's title and brief as context
        #[arg(long, conflicts_with_all = ["title", "context"])]
        gallery: Option<String>,

        /// Gallery title to show the model
        #[arg(long, default_value = "Untitled")]
        title: String,

        /// Project brief to show the model
        #[arg(long)]
        context: Option<String>,

        /// One attempt, no retries
        #[arg(long)]
        no_retry: bool,
    },

    /// Suggest keywords from existing text only
    Keywords {
        #[arg(long)]
        caption: String,

        #[arg(long)]
        location: Option<String>,

        #[arg(long)]
        category: Option<String>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageAnalysis {
    source: String,
    suggestions: SuggestionBundle,
    #[serde(skip_serializing_if = "Option::is_none")]
    exif: Option<ExifData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gps: Option<GpsExtraction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    proxy_reduction_percent: Option<i32>,
}

/// Execute the analyze command.
pub async fn execute(args: AnalyzeArgs, config: Config) -> anyhow::Result<()> {
    let mut writer = stdout_writer(&config);

    match args.command {
        AnalyzeCommand::Image {
            input,
            gallery,
            title,
            context,
            no_retry,
        } => {
            let (journal, context) = match gallery {
                Some(raw) => {
                    let journal = connect(config)?;
                    let gallery = journal.store().get_gallery(parse_id("gallery", &raw)?).await?;
                    (journal, gallery.context())
                }
                None => (
                    FieldJournal::in_memory(config)?,
                    GalleryContext {
                        title,
                        description: None,
                        project_context: context,
                    },
                ),
            };
            let analysis = analyze_image(&journal, &input, &context, no_retry).await?;
            if analysis.suggestions.is_empty() {
                tracing::warn!("The model reply could not be parsed into suggestions");
            }
            writer.write(&analysis)?;
        }

        AnalyzeCommand::Keywords {
            caption,
            location,
            category,
        } => {
            let journal = FieldJournal::in_memory(config)?;
            let vision = require_vision(&journal)?;
            let keywords = vision
                .suggest_keywords(&caption, location.as_deref(), category.as_deref())
                .await;
            writer.write(&keywords)?;
        }
    }

    writer.flush()?;
    Ok(())
}

async fn analyze_image(
    journal: &FieldJournal,
    input: &str,
    context: &GalleryContext,
    no_retry: bool,
) -> anyhow::Result<ImageAnalysis> {
    let vision = require_vision(journal)?;

    let (image_url, exif, gps, reduction) = if is_remote(input) {
        (input.to_string(), None, None, None)
    } else {
        let path = expand_path(Path::new(input));
        let file = UploadFile::from_path(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        validate_upload(&journal.config().upload, &file)?;

        let data = Arc::new(file.data);
        let (exif, gps) = MetadataExtractor::new().extract_all(Arc::clone(&data)).await;

        let variants = VariantGenerator::new(journal.config().variants.clone());
        let proxy_data = Arc::clone(&data);
        let proxy = tokio::task::spawn_blocking(move || {
            variants.create_variant(&proxy_data, variants.proxy_options())
        })
        .await?;
        let mime = proxy.mime_type(&file.mime_type).to_string();
        let url = ImageInput::from_bytes(&proxy.data, &mime).data_url();
        let reduction = (!proxy.degraded).then_some(proxy.reduction_percent);
        (url, (!exif.is_empty()).then_some(exif), Some(gps), reduction)
    };

    let suggestions = if no_retry {
        vision.analyze(&image_url, context).await?
    } else {
        vision.analyze_with_retry(&image_url, context).await?
    };

    Ok(ImageAnalysis {
        source: input.to_string(),
        suggestions,
        exif,
        gps,
        proxy_reduction_percent: reduction,
    })
}

fn require_vision(journal: &FieldJournal) -> anyhow::Result<&fieldjournal_core::VisionClient> {
    journal.vision().context(
        "vision model not configured\n\n  Hint: set vision.api_key in the config file or export MINIMAX_API_KEY.",
    )
}

fn is_remote(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}
