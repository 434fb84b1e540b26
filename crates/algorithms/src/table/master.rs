//! Persistent master tables

use super::{archive, merge, MergeSummary, ResultTable};
use chrono::NaiveDateTime;
use gapstat_core::Result;
use std::path::{Path, PathBuf};
use tracing::info;

/// A master CSV plus the directory its snapshots are archived into.
#[derive(Debug, Clone)]
pub struct MasterTable {
    path: PathBuf,
    archive_dir: PathBuf,
}

/// Outcome of [`MasterTable::update`]
#[derive(Debug, Clone)]
pub struct MasterUpdate {
    pub table: ResultTable,
    pub summary: MergeSummary,
    /// Snapshot of the pre-update master, if one existed
    pub archived: Option<PathBuf>,
}

impl MasterTable {
    pub fn new(path: impl Into<PathBuf>, archive_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            archive_dir: archive_dir.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "master".to_string())
    }

    /// Current master, `None` if it has never been written
    pub fn load(&self) -> Result<Option<ResultTable>> {
        if !self.path.exists() {
            return Ok(None);
        }
        ResultTable::read_csv(&self.path).map(Some)
    }

    /// Archive the current master, merge `new` into it and write it back.
    ///
    /// Without an existing master, `new` becomes the master.
    pub fn update(&self, new: &ResultTable, timestamp: NaiveDateTime) -> Result<MasterUpdate> {
        let Some(current) = self.load()? else {
            new.write_csv(&self.path)?;
            info!(path = %self.path.display(), rows = new.len(), "created master table");
            return Ok(MasterUpdate {
                table: new.clone(),
                summary: MergeSummary {
                    appended_rows: new.len(),
                    ..MergeSummary::default()
                },
                archived: None,
            });
        };

        let (merged, summary) = merge(&current, new)?;
        let snapshot = archive(&current, &self.archive_dir, &self.stem(), timestamp)?;
        merged.write_csv(&self.path)?;
        info!(
            path = %self.path.display(),
            updated = summary.updated_rows,
            appended = summary.appended_rows,
            "updated master table"
        );

        Ok(MasterUpdate {
            table: merged,
            summary,
            archived: Some(snapshot),
        })
    }
}
