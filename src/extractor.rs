//! Thin wrapper around the `yt-dlp` command line.
//!
//! Only two invocations are needed: a flat listing of a playlist and a full
//! metadata dump for a single video. Both ask yt-dlp for JSON on stdout.

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

pub const DEFAULT_PROGRAM: &str = "yt-dlp";

/// One line of `yt-dlp --flat-playlist --dump-json`.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistEntry {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// Subset of `yt-dlp --dump-json` for a single video. Everything is optional
/// because older uploads and non-YouTube extractors omit fields freely.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub webpage_url: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// `YYYYMMDD`
    #[serde(default)]
    pub upload_date: Option<String>,
    /// Seconds. yt-dlp emits either an integer or a float here.
    #[serde(default)]
    pub duration: Option<f64>,
}

/// Canonical watch URL for a YouTube video id.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

impl YtDlp {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Runs `<program> --version` so a missing binary is reported once up
    /// front instead of once per playlist.
    pub fn ensure_available(&self) -> Result<()> {
        let status = Command::new(&self.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            Ok(_) => bail!(
                "{} is installed but returned a failure status",
                self.program.display()
            ),
            Err(err) => bail!(
                "{} is not installed or not in PATH: {}",
                self.program.display(),
                err
            ),
        }
    }

    /// Lists the members of a playlist without resolving each video.
    pub fn list_playlist(&self, playlist_url: &str) -> Result<Vec<PlaylistEntry>> {
        let mut command = Command::new(&self.program);
        command
            .arg("--flat-playlist")
            .arg("--dump-json")
            .arg(playlist_url);

        let output = run(command, playlist_url)?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        let mut entries = Vec::new();
        for line in stdout.lines().map(str::trim).filter(|line| !line.is_empty()) {
            match serde_json::from_str::<PlaylistEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(err) => {
                    tracing::warn!(playlist = playlist_url, %err, "skipping unparseable playlist entry");
                }
            }
        }

        Ok(entries)
    }

    /// Fetches full metadata for a single video.
    pub fn fetch_video(&self, video_url: &str) -> Result<VideoInfo> {
        let mut command = Command::new(&self.program);
        command.arg("--dump-json").arg(video_url);

        let output = run(command, video_url)?;
        let info = serde_json::from_slice(&output.stdout)
            .with_context(|| format!("deserializing metadata JSON for {video_url}"))?;
        Ok(info)
    }
}

fn run(mut command: Command, target: &str) -> Result<Output> {
    let output = command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .with_context(|| format!("running yt-dlp for {target}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "yt-dlp failed for {} (status {}): {}",
            target,
            output.status,
            stderr.trim()
        );
    }

    Ok(output)
}

/// Helpers for tests that need a fake yt-dlp on disk.
#[cfg(test)]
pub(crate) mod test_support {
    use std::fs;
    #[cfg(unix)]
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    use anyhow::Result;

    /// Writes an executable bash script named `yt-dlp` into `dir`. `body` runs
    /// after `set -euo pipefail` with the original arguments in `$@`.
    pub(crate) fn install_ytdlp_stub(dir: &Path, body: &str) -> Result<PathBuf> {
        let script_path = dir.join("yt-dlp");
        let script = format!("#!/usr/bin/env bash\nset -euo pipefail\n{body}\n");
        fs::write(&script_path, script)?;
        #[cfg(unix)]
        {
            let mut perms = fs::metadata(&script_path)?.permissions();
            perms.set_mode(0o755);
            fs::set_permissions(&script_path, perms)?;
        }
        Ok(script_path)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::install_ytdlp_stub;
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn watch_url_formats_id() {
        assert_eq!(watch_url("abc123"), "https://www.youtube.com/watch?v=abc123");
    }

    #[test]
    fn list_playlist_parses_each_line_and_skips_garbage() -> Result<()> {
        let dir = tempdir()?;
        let stub = install_ytdlp_stub(
            dir.path(),
            r#"printf '%s\n' '{"id":"one","title":"First"}' 'not json' '' '{"id":"two"}'"#,
        )?;

        let entries = YtDlp::new(stub).list_playlist("https://example.com/playlist?list=x")?;
        let ids: Vec<_> = entries.iter().map(|entry| entry.id.as_str()).collect();
        assert_eq!(ids, ["one", "two"]);
        assert_eq!(entries[0].title.as_deref(), Some("First"));
        Ok(())
    }

    #[test]
    fn list_playlist_passes_flat_playlist_flags() -> Result<()> {
        let dir = tempdir()?;
        let stub = install_ytdlp_stub(
            dir.path(),
            r#"[[ "$1" == "--flat-playlist" && "$2" == "--dump-json" ]] || exit 3
echo "{\"id\":\"$3\"}""#,
        )?;

        let entries = YtDlp::new(stub).list_playlist("target")?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "target");
        Ok(())
    }

    #[test]
    fn non_zero_exit_reports_stderr() -> Result<()> {
        let dir = tempdir()?;
        let stub = install_ytdlp_stub(dir.path(), "echo 'ERROR: private playlist' >&2\nexit 1")?;

        let err = YtDlp::new(stub)
            .list_playlist("https://example.com/private")
            .expect_err("listing should fail");
        assert!(err.to_string().contains("private playlist"));
        Ok(())
    }

    #[test]
    fn fetch_video_reads_fractional_duration() -> Result<()> {
        let dir = tempdir()?;
        let stub = install_ytdlp_stub(
            dir.path(),
            r#"cat <<'JSON'
{"id":"abc","title":"Talk","webpage_url":"https://www.youtube.com/watch?v=abc","thumbnail":"https://i/abc.jpg","upload_date":"20210304","duration":321.5,"view_count":7}
JSON"#,
        )?;

        let info = YtDlp::new(stub).fetch_video(&watch_url("abc"))?;
        assert_eq!(info.title.as_deref(), Some("Talk"));
        assert_eq!(info.upload_date.as_deref(), Some("20210304"));
        assert_eq!(info.duration, Some(321.5));
        Ok(())
    }

    #[test]
    fn fetch_video_rejects_invalid_json() -> Result<()> {
        let dir = tempdir()?;
        let stub = install_ytdlp_stub(dir.path(), "echo 'definitely not json'")?;
        assert!(YtDlp::new(stub).fetch_video("https://example.com/v").is_err());
        Ok(())
    }

    #[test]
    fn ensure_available_fails_for_missing_binary() -> Result<()> {
        let dir = tempdir()?;
        let missing = dir.path().join("no-such-yt-dlp");
        assert!(YtDlp::new(missing).ensure_available().is_err());

        let stub = install_ytdlp_stub(dir.path(), "echo 2025.01.01")?;
        YtDlp::new(stub).ensure_available()?;
        Ok(())
    }
}
