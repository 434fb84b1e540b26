//! Append-only run logs

use chrono::Duration;
use gapstat_core::Result;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Plain-text audit trail of a run.
///
/// Every line is appended to the log file and mirrored through `tracing`.
/// Write failures are reported through `tracing` and never abort a run.
#[derive(Debug)]
pub struct RunLog {
    file: Option<File>,
    path: Option<PathBuf>,
}

impl RunLog {
    /// Open `path` for appending, creating it if needed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Some(file),
            path: Some(path.to_path_buf()),
        })
    }

    /// A log that only goes to `tracing`
    pub fn discard() -> Self {
        Self {
            file: None,
            path: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn line(&mut self, content: impl AsRef<str>) {
        let content = content.as_ref();
        info!("{}", content);
        self.append(content);
    }

    pub fn warn(&mut self, content: impl AsRef<str>) {
        let content = content.as_ref();
        warn!("{}", content);
        self.append(&format!("WARNING -- {}", content));
    }

    pub fn error(&mut self, content: impl AsRef<str>) {
        let content = content.as_ref();
        error!("{}", content);
        self.append(&format!("ERROR -- {}", content));
    }

    fn append(&mut self, content: &str) {
        if let Some(file) = self.file.as_mut() {
            if let Err(e) = writeln!(file, "{}", content) {
                warn!(error = %e, "could not write to run log");
            }
        }
    }
}

/// Elapsed time as `H:MM:SS.ffffff`
pub fn format_elapsed(elapsed: Duration) -> String {
    let micros = elapsed.num_microseconds().unwrap_or(i64::MAX).max(0);
    let secs = micros / 1_000_000;
    format!(
        "{}:{:02}:{:02}.{:06}",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60,
        micros % 1_000_000
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::zero()), "0:00:00.000000");
        assert_eq!(
            format_elapsed(Duration::milliseconds(3_725_250)),
            "1:02:05.250000"
        );
        assert_eq!(format_elapsed(Duration::hours(27)), "27:00:00.000000");
    }

    #[test]
    fn test_log_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("log2026-10-18.txt");

        let mut log = RunLog::open(&path).unwrap();
        log.line("first");
        log.error("bad raster");
        drop(log);

        let mut log = RunLog::open(&path).unwrap();
        log.warn("second run");
        drop(log);

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "first\nERROR -- bad raster\nWARNING -- second run\n");
    }
}
