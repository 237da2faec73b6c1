use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::extractor;
use crate::ingest::IngestFilter;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/recotube-env";
pub const DEFAULT_DB_PATH: &str = "videos.db";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_PLAYLISTS: &[&str] = &[
    "https://www.youtube.com/playlist?list=PLbeHrp_B4_oOTMtp-mnX59mAIppEFvedH",
    "https://www.youtube.com/playlist?list=PLbeHrp_B4_oPUVJHzv4cRfk2OxYRWwftr",
    "https://www.youtube.com/playlist?list=PLbeHrp_B4_oO6zbDWpH6CWvVL_OLSls38",
];

/// Raw values read from the env-style config file. Anything left `None` falls
/// back to the defaults above.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub db_path: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub yt_dlp: Option<PathBuf>,
    pub playlists: Option<Vec<String>>,
    pub cutoff_date: Option<NaiveDate>,
    pub min_duration_minutes: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub yt_dlp: PathBuf,
    pub playlists: Vec<String>,
    pub filter: IngestFilter,
}

impl RuntimeConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        EnvConfig::default().into_runtime()
    }
}

impl EnvConfig {
    fn into_runtime(self) -> RuntimeConfig {
        let defaults = IngestFilter::default();
        RuntimeConfig {
            db_path: self.db_path.unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            host: self.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: self.port.unwrap_or(DEFAULT_PORT),
            yt_dlp: self
                .yt_dlp
                .unwrap_or_else(|| PathBuf::from(extractor::DEFAULT_PROGRAM)),
            playlists: self.playlists.unwrap_or_else(|| {
                DEFAULT_PLAYLISTS
                    .iter()
                    .map(|url| url.to_string())
                    .collect()
            }),
            filter: IngestFilter {
                cutoff: self.cutoff_date.unwrap_or(defaults.cutoff),
                min_duration_minutes: self
                    .min_duration_minutes
                    .unwrap_or(defaults.min_duration_minutes),
            },
        }
    }
}

pub fn read_env_config(path: &Path) -> Result<Option<EnvConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    let mut cfg = EnvConfig::default();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some((key, value_raw)) = trimmed.split_once('=') {
            let value = value_raw.trim().trim_matches('"');
            if value.is_empty() {
                continue;
            }
            match key.trim() {
                "DB_PATH" => cfg.db_path = Some(PathBuf::from(value)),
                "HOST" => cfg.host = Some(value.to_string()),
                "PORT" => {
                    let port: u16 = value
                        .parse()
                        .with_context(|| format!("Parsing PORT from {}", path.display()))?;
                    cfg.port = Some(port);
                }
                "YT_DLP" => cfg.yt_dlp = Some(PathBuf::from(value)),
                "PLAYLISTS" => {
                    let playlists: Vec<String> = value
                        .split(',')
                        .map(str::trim)
                        .filter(|url| !url.is_empty())
                        .map(str::to_owned)
                        .collect();
                    if !playlists.is_empty() {
                        cfg.playlists = Some(playlists);
                    }
                }
                "CUTOFF_DATE" => {
                    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").with_context(|| {
                        format!("Parsing CUTOFF_DATE from {}", path.display())
                    })?;
                    cfg.cutoff_date = Some(date);
                }
                "MIN_DURATION_MINUTES" => {
                    let minutes: i64 = value.parse().with_context(|| {
                        format!("Parsing MIN_DURATION_MINUTES from {}", path.display())
                    })?;
                    cfg.min_duration_minutes = Some(minutes);
                }
                _ => {}
            }
        }
    }
    Ok(Some(cfg))
}

/// Loads the runtime configuration. A missing file is not an error: the
/// built-in defaults describe the stock setup.
pub fn load_runtime_config_from(path: impl AsRef<Path>) -> Result<RuntimeConfig> {
    let path = path.as_ref();
    let cfg = match read_env_config(path)? {
        Some(cfg) => cfg,
        None => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            EnvConfig::default()
        }
    };
    Ok(cfg.into_runtime())
}

pub fn load_runtime_config() -> Result<RuntimeConfig> {
    load_runtime_config_from(DEFAULT_CONFIG_PATH)
}
