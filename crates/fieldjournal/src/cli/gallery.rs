//! The `fieldjournal gallery` command.

use clap::{Args, Subcommand};
use fieldjournal_core::{
    Bin, BinMove, Config, FieldJournal, GalleryBins, GalleryStore, GallerySummary, NewGallery,
    SummaryStyle,
};
use serde::Serialize;
use uuid::Uuid;

use super::{connect, parse_id, stdout_writer};

/// Arguments for the `gallery` command.
#[derive(Args, Debug)]
pub struct GalleryArgs {
    #[command(subcommand)]
    pub command: GalleryCommand,
}

#[derive(Subcommand, Debug)]
pub enum GalleryCommand {
    /// List active galleries, newest first
    List {
        /// Only published galleries
        #[arg(long)]
        published: bool,
    },

    /// Create a gallery; the slug is derived from the title
    Create {
        title: String,

        #[arg(long)]
        description: Option<String>,

        /// Project brief shown to the vision model with every image
        #[arg(long)]
        context: Option<String>,

        /// Publish immediately
        #[arg(long)]
        publish: bool,
    },

    /// Move a gallery to the published bin
    Publish { gallery: String },

    /// Move a gallery back to drafts
    Draft { gallery: String },

    /// Write an introduction from the gallery's photo text
    Summary {
        /// Gallery to summarize (omit with --all)
        #[arg(required_unless_present = "all")]
        gallery: Option<String>,

        /// Summarize every active gallery
        #[arg(long, conflicts_with = "gallery")]
        all: bool,

        /// narrative, poetic, informative or ethnographic
        #[arg(long, default_value = "narrative")]
        style: SummaryStyle,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BinResult {
    gallery_id: Uuid,
    bin: Bin,
    result: BinMove,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryRow {
    gallery_id: Uuid,
    #[serde(flatten)]
    summary: GallerySummary,
}

/// Execute the gallery command.
pub async fn execute(args: GalleryArgs, config: Config) -> anyhow::Result<()> {
    let mut writer = stdout_writer(&config);
    let journal = connect(config)?;
    let store = journal.store();

    match args.command {
        GalleryCommand::List { published } => {
            let galleries = store.list_galleries(published).await?;
            writer.write_all(&galleries)?;
        }

        GalleryCommand::Create {
            title,
            description,
            context,
            publish,
        } => {
            let gallery = store
                .create_gallery(&NewGallery {
                    title,
                    description,
                    project_context: context,
                    is_published: publish,
                    ..NewGallery::default()
                })
                .await?;
            tracing::info!("Created gallery {} ({})", gallery.slug, gallery.id);
            writer.write(&gallery)?;
        }

        GalleryCommand::Publish { gallery } => {
            let result = move_to_bin(&journal, &gallery, Bin::Published).await?;
            writer.write(&result)?;
        }

        GalleryCommand::Draft { gallery } => {
            let result = move_to_bin(&journal, &gallery, Bin::Draft).await?;
            writer.write(&result)?;
        }

        GalleryCommand::Summary { gallery, all, style } => {
            if all {
                let mut loaded = Vec::new();
                for gallery in store.list_galleries(false).await? {
                    let photos = store.list_photos(gallery.id, false).await?;
                    loaded.push((gallery, photos));
                }
                tracing::info!("Summarizing {} galleries ({})", loaded.len(), style.as_str());
                let summaries: Vec<SummaryRow> = journal
                    .summaries()
                    .summarize_batch(&loaded, style)
                    .await
                    .into_iter()
                    .map(|(gallery_id, summary)| SummaryRow {
                        gallery_id,
                        summary,
                    })
                    .collect();
                writer.write_all(&summaries)?;
            } else if let Some(raw) = gallery {
                let id = parse_id("gallery", &raw)?;
                let summary = journal.summarize_gallery(id, style).await?;
                if let Some(fallback) = summary.fallback {
                    tracing::warn!("Used fallback introduction ({fallback:?})");
                }
                writer.write(&summary)?;
            }
        }
    }

    writer.flush()?;
    Ok(())
}

async fn move_to_bin(
    journal: &FieldJournal,
    raw: &str,
    target: Bin,
) -> anyhow::Result<BinResult> {
    let gallery_id = parse_id("gallery", raw)?;
    let bins = GalleryBins::load(journal.store().as_ref()).await?;
    let result = journal.publisher().move_gallery(&bins, gallery_id, target).await?;
    if result == BinMove::Unchanged {
        eprintln!("Gallery {gallery_id} is already in {target:?}");
    }
    Ok(BinResult {
        gallery_id,
        bin: target,
        result,
    })
}
