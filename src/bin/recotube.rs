#![forbid(unsafe_code)]

//! Web server entry point. Opens the video database, starts one background
//! ingestion run over the configured playlists and serves the recommender.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use recotube::{
    config::{self, DEFAULT_CONFIG_PATH},
    extractor::YtDlp,
    ingest,
    metadata::{MetadataReader, MetadataStore},
    web,
};
use tokio::signal;

#[derive(Parser, Debug)]
#[command(author, version, about = "Serve random video recommendations.")]
struct Cli {
    #[arg(long = "config", value_name = "PATH", default_value = DEFAULT_CONFIG_PATH, help = "Path to the config file")]
    config: PathBuf,
    #[arg(
        long = "skip-ingest",
        help = "Serve the existing database without scraping playlists"
    )]
    skip_ingest: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    recotube::init_tracing();
    let cli = Cli::parse();

    let cfg = config::load_runtime_config_from(&cli.config)?;
    let store = MetadataStore::open(&cfg.db_path).context("initializing video database")?;

    if cli.skip_ingest {
        tracing::info!("skipping playlist ingestion");
    } else {
        let extractor = YtDlp::new(&cfg.yt_dlp);
        if let Err(err) = extractor.ensure_available() {
            tracing::warn!("{err:#}; playlists will not be scraped this run");
        }
        tracing::info!(playlists = cfg.playlists.len(), "starting background ingestion");
        // Detached; the thread logs its own summary when it finishes.
        ingest::spawn_background_ingest(extractor, store, cfg.playlists.clone(), cfg.filter)?;
    }

    let app = web::router(MetadataReader::new(&cfg.db_path));

    let addr = cfg.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {}", addr))?;
    tracing::info!("listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running web server")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        tracing::error!("failed to install Ctrl+C handler: {}", err);
    }
}
