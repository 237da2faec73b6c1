#![forbid(unsafe_code)]

//! Runs one ingestion pass in the foreground and exits. Useful from cron or
//! to seed the database before the server starts.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use recotube::{
    config::{self, DEFAULT_CONFIG_PATH},
    extractor::YtDlp,
    ingest,
    metadata::{MetadataReader, MetadataStore},
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Scrape playlists into the video database once.")]
struct Cli {
    #[arg(long = "config", value_name = "PATH", default_value = DEFAULT_CONFIG_PATH, help = "Path to the config file")]
    config: PathBuf,
    #[arg(
        value_name = "PLAYLIST_URL",
        help = "Playlists to scrape instead of the configured ones"
    )]
    playlists: Vec<String>,
}

fn main() -> Result<()> {
    recotube::init_tracing();
    let cli = Cli::parse();

    let cfg = config::load_runtime_config_from(&cli.config)?;
    let playlists = if cli.playlists.is_empty() {
        cfg.playlists.clone()
    } else {
        cli.playlists
    };

    let extractor = YtDlp::new(&cfg.yt_dlp);
    extractor.ensure_available()?;
    let store = MetadataStore::open(&cfg.db_path).context("initializing video database")?;

    tracing::info!(
        db = %cfg.db_path.display(),
        playlists = playlists.len(),
        "starting ingestion"
    );
    let summary = ingest::ingest_playlists(&extractor, &store, &playlists, &cfg.filter);

    let total = MetadataReader::new(&cfg.db_path).count_videos()?;
    tracing::info!(?summary, total, "ingestion complete");

    Ok(())
}
