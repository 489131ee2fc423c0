//! Field Journal CLI - upload, caption and organize photo galleries.
//!
//! Uploads go through the full enrichment pipeline (variants, EXIF/GPS,
//! vision captioning) and land in a gallery. The remaining commands manage
//! gallery order, publish state and featured photos from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Upload a folder into a gallery
//! fieldjournal upload ./serengeti/ --gallery 5f0c...
//!
//! # Try the pipeline without touching the store
//! fieldjournal upload ./serengeti/ --dry-run
//!
//! # Move the third photo to the front
//! fieldjournal photos move 5f0c... --from 2 --to 0
//!
//! # Write a gallery introduction
//! fieldjournal gallery summary 5f0c... --style poetic
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Field Journal - upload and enrichment pipeline for photo galleries.
#[derive(Parser, Debug)]
#[command(name = "fieldjournal")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "FIELDJOURNAL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload images into a gallery
    Upload(cli::upload::UploadArgs),

    /// List, create and publish galleries
    Gallery(cli::gallery::GalleryArgs),

    /// Reorder, publish, feature and approve photos
    Photos(cli::photos::PhotosArgs),

    /// Run the vision model on one image without saving anything
    Analyze(cli::analyze::AnalyzeArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let config = match cli::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `fieldjournal config path`."
            );
            fieldjournal_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Field Journal v{}", fieldjournal_core::VERSION);

    match cli.command {
        Commands::Upload(args) => cli::upload::execute(args, config).await,
        Commands::Gallery(args) => cli::gallery::execute(args, config).await,
        Commands::Photos(args) => cli::photos::execute(args, config).await,
        Commands::Analyze(args) => cli::analyze::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args, cli.config).await,
    }
}
