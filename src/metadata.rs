//! SQLite persistence for scraped videos.
//!
//! A single `videos` table holds everything the recommender needs. Rows are
//! written once by the ingestion task and only ever read back by the random
//! selection query, so the layer stays deliberately thin: one writer type that
//! owns a connection and one cloneable reader that opens a connection per
//! query.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};

const READER_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A video that passed the ingestion filters and is ready to be stored.
///
/// `published_date` is already normalized to `YYYY-MM-DD` and `duration` is
/// in whole minutes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVideo {
    pub title: String,
    pub url: String,
    pub thumbnail: String,
    pub published_date: String,
    pub duration: i64,
}

/// Payload served by `/recommend`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub url: String,
    pub thumbnail: String,
}

/// Result of an insert attempt. Duplicates are not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Duplicate,
}

/// Owns the write connection used by the ingestion task.
#[derive(Debug)]
pub struct MetadataStore {
    conn: Connection,
}

impl MetadataStore {
    /// Opens (and if necessary creates) the database file and makes sure the
    /// `videos` table exists. WAL mode keeps the web readers from blocking on
    /// the ingestion writer.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating database directory {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("opening video DB {}", path.display()))?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .context("enabling WAL mode for video DB")?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .context("setting video DB synchronous mode")?;

        let store = Self { conn };
        store.ensure_tables()?;
        Ok(store)
    }

    fn ensure_tables(&self) -> Result<()> {
        self.conn
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS videos (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT NOT NULL,
                    url TEXT NOT NULL UNIQUE,
                    thumbnail TEXT NOT NULL,
                    published_date TEXT NOT NULL,
                    duration INTEGER NOT NULL
                );
                "#,
            )
            .context("creating videos table")?;
        Ok(())
    }

    /// Inserts a video unless its URL is already stored.
    pub fn insert_video(&self, video: &NewVideo) -> Result<InsertOutcome> {
        let changed = self
            .conn
            .execute(
                r#"
                INSERT INTO videos (title, url, thumbnail, published_date, duration)
                VALUES (:title, :url, :thumbnail, :published_date, :duration)
                ON CONFLICT(url) DO NOTHING
                "#,
                params![
                    video.title,
                    video.url,
                    video.thumbnail,
                    video.published_date,
                    video.duration,
                ],
            )
            .with_context(|| format!("inserting video {}", video.url))?;

        Ok(if changed == 0 {
            InsertOutcome::Duplicate
        } else {
            InsertOutcome::Inserted
        })
    }
}

/// Cloneable reader that opens a short-lived connection for each query, so it
/// can be handed to blocking tasks without sharing a connection.
#[derive(Debug, Clone)]
pub struct MetadataReader {
    db_path: PathBuf,
}

impl MetadataReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            db_path: path.as_ref().to_path_buf(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = Connection::open(&self.db_path)
            .with_context(|| format!("opening video DB {}", self.db_path.display()))?;
        conn.busy_timeout(READER_BUSY_TIMEOUT)?;
        f(&conn)
    }

    /// Picks one stored video uniformly at random, or `None` when the table
    /// is empty.
    pub fn random_video(&self) -> Result<Option<Recommendation>> {
        self.with_connection(|conn| {
            let video = conn
                .query_row(
                    r#"
                    SELECT title, url, thumbnail
                    FROM videos
                    ORDER BY RANDOM()
                    LIMIT 1
                    "#,
                    [],
                    |row| {
                        Ok(Recommendation {
                            title: row.get("title")?,
                            url: row.get("url")?,
                            thumbnail: row.get("thumbnail")?,
                        })
                    },
                )
                .optional()
                .context("selecting random video")?;
            Ok(video)
        })
    }

    pub fn count_videos(&self) -> Result<i64> {
        self.with_connection(|conn| {
            let count = conn
                .query_row("SELECT COUNT(*) FROM videos", [], |row| row.get(0))
                .context("counting videos")?;
            Ok(count)
        })
    }

    pub fn contains_url(&self, url: &str) -> Result<bool> {
        self.with_connection(|conn| {
            let found: Option<i64> = conn
                .query_row("SELECT id FROM videos WHERE url = ?1", [url], |row| {
                    row.get(0)
                })
                .optional()
                .with_context(|| format!("looking up {url}"))?;
            Ok(found.is_some())
        })
    }
}
