//! Run workspace layout

use gapstat_core::Result;
use std::path::{Path, PathBuf};

/// Directory a run writes into: logs, tables, archives, checkpoints.
///
/// One workspace serves one run at a time.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Use `root`, creating it if needed
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// A file directly under the root
    pub fn file(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Snapshots of master tables and per-run result tables
    pub fn archive_dir(&self) -> PathBuf {
        self.root.join("archive")
    }

    /// Richness checkpoints
    pub fn intermediates_dir(&self) -> PathBuf {
        self.root.join("Richness_intermediates")
    }
}
