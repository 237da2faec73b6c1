#![forbid(unsafe_code)]

//! Shared pieces of recotube.
//!
//! The binaries are thin: `recotube` serves the web app and kicks off one
//! background ingestion run, `ingest_playlists` runs ingestion in the
//! foreground. Everything they need lives in the modules below.

pub mod config;
pub mod extractor;
pub mod ingest;
pub mod metadata;
pub mod web;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "recotube=info,ingest_playlists=info,tower_http=info";

/// Installs the global log subscriber. `RUST_LOG` overrides the default
/// filter.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
