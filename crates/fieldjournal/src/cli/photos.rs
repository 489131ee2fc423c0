//! The `fieldjournal photos` command.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Subcommand, ValueEnum};
use fieldjournal_core::api::{BatchPublishRequest, ReorderRequest, TelemetryPatch};
use fieldjournal_core::reconcile::ReorderOutcome;
use fieldjournal_core::{Config, FieldJournal, GalleryStore, SuggestionField};
use serde::Serialize;

use super::{connect, expand_path, parse_id, stdout_writer};

/// Arguments for the `photos` command.
#[derive(Args, Debug)]
pub struct PhotosArgs {
    #[command(subcommand)]
    pub command: PhotosCommand,
}

#[derive(Subcommand, Debug)]
pub enum PhotosCommand {
    /// List a gallery's photos in display order
    List {
        gallery: String,

        /// Only published photos
        #[arg(long)]
        published: bool,
    },

    /// Move the photo at one position to another (0-based, saved photos only)
    Move {
        gallery: String,

        #[arg(long)]
        from: usize,

        #[arg(long)]
        to: usize,
    },

    /// Apply a `{"orders":[{"id","displayOrder"}]}` document
    Reorder {
        gallery: String,

        /// JSON file, or `-` for stdin
        file: PathBuf,
    },

    /// Publish photos
    Publish {
        gallery: String,

        #[arg(required = true)]
        photos: Vec<String>,
    },

    /// Return photos to draft
    Unpublish {
        gallery: String,

        #[arg(required = true)]
        photos: Vec<String>,
    },

    /// Make a photo the gallery's only featured photo
    Feature {
        photo: String,

        /// Remove the featured flag instead
        #[arg(long)]
        unset: bool,
    },

    /// Approve AI suggestions and copy them onto the photo
    Approve {
        photo: String,

        /// Suggested fields to approve
        #[arg(long = "field", value_enum)]
        fields: Vec<FieldArg>,

        /// Index of a suggested keyword to approve (repeatable)
        #[arg(long = "keyword")]
        keywords: Vec<usize>,
    },

    /// Merge engagement counters; counters never go down
    Telemetry {
        photo: String,

        #[arg(long)]
        views: Option<i64>,

        #[arg(long)]
        likes: Option<i64>,

        #[arg(long)]
        shares: Option<i64>,

        #[arg(long)]
        downloads: Option<i64>,
    },

    /// Delete a photo and its stored images
    Delete { photo: String },
}

/// Approvable suggestion fields on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FieldArg {
    AltText,
    Caption,
    Story,
}

impl From<FieldArg> for SuggestionField {
    fn from(arg: FieldArg) -> Self {
        match arg {
            FieldArg::AltText => SuggestionField::AltText,
            FieldArg::Caption => SuggestionField::Caption,
            FieldArg::Story => SuggestionField::StoryContext,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PublishResult {
    requested: usize,
    changed: usize,
    is_published: bool,
}

/// Execute the photos command.
pub async fn execute(args: PhotosArgs, config: Config) -> anyhow::Result<()> {
    let mut writer = stdout_writer(&config);
    let journal = connect(config)?;

    match args.command {
        PhotosCommand::List { gallery, published } => {
            let gallery_id = parse_id("gallery", &gallery)?;
            let photos = journal.store().list_photos(gallery_id, published).await?;
            writer.write_all(&photos)?;
        }

        PhotosCommand::Move { gallery, from, to } => {
            let board = journal.board(parse_id("gallery", &gallery)?).await?;
            let outcome = journal.reorderer().move_photo(&board, from, to).await?;
            report_partial(&outcome);
            writer.write(&outcome)?;
        }

        PhotosCommand::Reorder { gallery, file } => {
            let request = read_reorder_request(&file)?;
            let board = journal.board(parse_id("gallery", &gallery)?).await?;
            let outcome = journal.reorder(&board, &request).await?;
            report_partial(&outcome);
            writer.write(&outcome)?;
        }

        PhotosCommand::Publish { gallery, photos } => {
            let result = set_published(&journal, &gallery, photos, true).await?;
            writer.write(&result)?;
        }

        PhotosCommand::Unpublish { gallery, photos } => {
            let result = set_published(&journal, &gallery, photos, false).await?;
            writer.write(&result)?;
        }

        PhotosCommand::Feature { photo, unset } => {
            let photo_id = parse_id("photo", &photo)?;
            let gallery_id = journal.store().get_photo(photo_id).await?.gallery_id;
            let board = journal.board(gallery_id).await?;
            if unset {
                journal.featured().unset_featured(&board, photo_id).await?;
            } else {
                journal.featured().set_featured(&board, photo_id).await?;
            }
            writer.write(&journal.store().get_photo(photo_id).await?)?;
        }

        PhotosCommand::Approve {
            photo,
            fields,
            keywords,
        } => {
            if fields.is_empty() && keywords.is_empty() {
                anyhow::bail!("nothing to approve: pass --field and/or --keyword");
            }
            let fields: Vec<SuggestionField> = fields.into_iter().map(Into::into).collect();
            let saved = journal
                .approve_suggestions(parse_id("photo", &photo)?, &fields, &keywords)
                .await?;
            writer.write(&saved)?;
        }

        PhotosCommand::Telemetry {
            photo,
            views,
            likes,
            shares,
            downloads,
        } => {
            let patch = TelemetryPatch {
                views,
                likes,
                shares,
                downloads,
            };
            let saved = journal.patch_telemetry(parse_id("photo", &photo)?, &patch).await?;
            writer.write(&saved.telemetry)?;
        }

        PhotosCommand::Delete { photo } => {
            let photo_id = parse_id("photo", &photo)?;
            journal.delete_photo(photo_id).await?;
            eprintln!("Deleted photo {photo_id}");
        }
    }

    writer.flush()?;
    Ok(())
}

async fn set_published(
    journal: &FieldJournal,
    gallery: &str,
    photo_ids: Vec<String>,
    is_published: bool,
) -> anyhow::Result<PublishResult> {
    let board = journal.board(parse_id("gallery", gallery)?).await?;
    let request = BatchPublishRequest {
        photo_ids,
        is_published,
    };
    let changed = journal.batch_publish(&board, &request).await?;
    Ok(PublishResult {
        requested: request.photo_ids.len(),
        changed,
        is_published,
    })
}

fn report_partial(outcome: &ReorderOutcome) {
    if outcome.is_partial() {
        tracing::warn!(
            "Order saved only partly; reload the gallery before reordering again ({:?})",
            outcome.persistence
        );
    }
}

fn read_reorder_request(file: &Path) -> anyhow::Result<ReorderRequest> {
    let content = if file.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        let path = expand_path(file);
        std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?
    };
    parse_reorder_request(&content)
}

fn parse_reorder_request(content: &str) -> anyhow::Result<ReorderRequest> {
    serde_json::from_str(content).context("expected {\"orders\":[{\"id\":...,\"displayOrder\":...}]}")
}
