//! One-shot scrape of the configured playlists into the video table.
//!
//! Nothing in here retries. A playlist that yt-dlp cannot list is skipped, a
//! video whose metadata cannot be fetched or converted is skipped, and a URL
//! that is already stored is skipped. Every skip is logged and counted.

use std::thread::{self, JoinHandle};

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;

use crate::extractor::{VideoInfo, YtDlp, watch_url};
use crate::metadata::{InsertOutcome, MetadataStore, NewVideo};

/// Uploads before this date are ignored.
pub const DEFAULT_CUTOFF: (i32, u32, u32) = (2019, 12, 15);
pub const DEFAULT_MIN_DURATION_MINUTES: i64 = 5;

const UPLOAD_DATE_FORMAT: &str = "%Y%m%d";
const STORED_DATE_FORMAT: &str = "%Y-%m-%d";

/// Which videos are worth recommending. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestFilter {
    pub cutoff: NaiveDate,
    pub min_duration_minutes: i64,
}

impl Default for IngestFilter {
    fn default() -> Self {
        let (year, month, day) = DEFAULT_CUTOFF;
        Self {
            cutoff: NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN),
            min_duration_minutes: DEFAULT_MIN_DURATION_MINUTES,
        }
    }
}

impl IngestFilter {
    pub fn accepts(&self, video: &NewVideo) -> bool {
        let Ok(published) = NaiveDate::parse_from_str(&video.published_date, STORED_DATE_FORMAT)
        else {
            return false;
        };
        published >= self.cutoff && video.duration >= self.min_duration_minutes
    }
}

/// Counters reported once a run finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub playlists_processed: usize,
    pub playlists_failed: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub filtered: usize,
    pub failed: usize,
}

/// Converts yt-dlp metadata into a storable row.
///
/// Durations are truncated to whole minutes and a missing duration counts as
/// zero. `fallback_url` is used when yt-dlp does not report `webpage_url`.
pub fn video_from_info(info: &VideoInfo, fallback_url: &str) -> Result<NewVideo> {
    let title = info
        .title
        .as_deref()
        .filter(|title| !title.is_empty())
        .ok_or_else(|| anyhow!("missing title"))?;
    let thumbnail = info
        .thumbnail
        .as_deref()
        .filter(|thumbnail| !thumbnail.is_empty())
        .ok_or_else(|| anyhow!("missing thumbnail"))?;
    let url = info
        .webpage_url
        .as_deref()
        .filter(|url| !url.is_empty())
        .unwrap_or(fallback_url);

    let raw_date = info
        .upload_date
        .as_deref()
        .ok_or_else(|| anyhow!("missing upload_date"))?;
    let published = NaiveDate::parse_from_str(raw_date, UPLOAD_DATE_FORMAT)
        .with_context(|| format!("parsing upload_date {raw_date:?}"))?;

    let seconds = info.duration.unwrap_or(0.0).max(0.0) as i64;

    Ok(NewVideo {
        title: title.to_owned(),
        url: url.to_owned(),
        thumbnail: thumbnail.to_owned(),
        published_date: published.format(STORED_DATE_FORMAT).to_string(),
        duration: seconds / 60,
    })
}

/// Walks every playlist once and stores qualifying videos.
pub fn ingest_playlists<S: AsRef<str>>(
    extractor: &YtDlp,
    store: &MetadataStore,
    playlists: &[S],
    filter: &IngestFilter,
) -> IngestSummary {
    let mut summary = IngestSummary::default();

    for (index, playlist) in playlists.iter().enumerate() {
        let playlist = playlist.as_ref();
        tracing::info!(
            playlist,
            "[{}/{}] listing playlist",
            index + 1,
            playlists.len()
        );

        let entries = match extractor.list_playlist(playlist) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(playlist, "error fetching playlist: {err:#}");
                summary.playlists_failed += 1;
                continue;
            }
        };

        tracing::info!(playlist, count = entries.len(), "found videos");
        for entry in &entries {
            ingest_video(extractor, store, &watch_url(&entry.id), filter, &mut summary);
        }
        summary.playlists_processed += 1;
    }

    summary
}

fn ingest_video(
    extractor: &YtDlp,
    store: &MetadataStore,
    video_url: &str,
    filter: &IngestFilter,
    summary: &mut IngestSummary,
) {
    let video = match extractor
        .fetch_video(video_url)
        .and_then(|info| video_from_info(&info, video_url))
    {
        Ok(video) => video,
        Err(err) => {
            tracing::warn!(url = video_url, "error fetching details: {err:#}");
            summary.failed += 1;
            return;
        }
    };

    if !filter.accepts(&video) {
        tracing::debug!(
            url = %video.url,
            published = %video.published_date,
            minutes = video.duration,
            "video does not pass filters"
        );
        summary.filtered += 1;
        return;
    }

    match store.insert_video(&video) {
        Ok(InsertOutcome::Inserted) => {
            tracing::debug!(url = %video.url, title = %video.title, "stored video");
            summary.inserted += 1;
        }
        Ok(InsertOutcome::Duplicate) => {
            tracing::debug!(url = %video.url, "skipping duplicate video");
            summary.duplicates += 1;
        }
        Err(err) => {
            tracing::warn!(url = %video.url, "error saving video: {err:#}");
            summary.failed += 1;
        }
    }
}

/// Runs [`ingest_playlists`] once on its own thread. The caller is free to
/// drop the handle; the thread logs its own completion.
pub fn spawn_background_ingest(
    extractor: YtDlp,
    store: MetadataStore,
    playlists: Vec<String>,
    filter: IngestFilter,
) -> Result<JoinHandle<IngestSummary>> {
    thread::Builder::new()
        .name("ingest".into())
        .spawn(move || {
            let summary = ingest_playlists(&extractor, &store, &playlists, &filter);
            tracing::info!(?summary, "background ingestion completed");
            summary
        })
        .context("spawning ingestion thread")
}
