//! Per-subject failure reporting

use super::{RunLog, SubjectId};
use gapstat_core::Error;
use std::fmt;

/// Classification of a per-subject failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    MissingInput,
    CorruptRaster,
    DimensionCheck,
    GridMismatch,
    CategoryOutOfDomain,
    Other,
}

impl From<&Error> for FailureKind {
    fn from(err: &Error) -> Self {
        match err {
            Error::MissingInput { .. } => FailureKind::MissingInput,
            Error::CorruptRaster { .. } | Error::Decode(_) | Error::UnsupportedDataType(_) => {
                FailureKind::CorruptRaster
            }
            Error::DimensionCheck { .. } => FailureKind::DimensionCheck,
            Error::GridMismatch(_) | Error::SizeMismatch { .. } => FailureKind::GridMismatch,
            Error::CategoryOutOfDomain { .. } => FailureKind::CategoryOutOfDomain,
            _ => FailureKind::Other,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::MissingInput => "missing input",
            FailureKind::CorruptRaster => "corrupt raster",
            FailureKind::DimensionCheck => "dimension check",
            FailureKind::GridMismatch => "grid mismatch",
            FailureKind::CategoryOutOfDomain => "category out of domain",
            FailureKind::Other => "error",
        };
        f.write_str(name)
    }
}

/// A skipped subject
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectFailure {
    pub subject: SubjectId,
    pub kind: FailureKind,
    pub message: String,
}

impl SubjectFailure {
    /// Text of the `Status` cell written for this subject
    pub fn status(&self) -> String {
        match self.kind {
            FailureKind::Other => format!("error: {}", self.message),
            kind => format!("error ({}): {}", kind, self.message),
        }
    }
}

/// Every subject skipped during a run, in the order they failed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FailureReport {
    failures: Vec<SubjectFailure>,
}

impl FailureReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, subject: &SubjectId, err: &Error) {
        self.failures.push(SubjectFailure {
            subject: subject.clone(),
            kind: FailureKind::from(err),
            message: err.to_string(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubjectFailure> {
        self.failures.iter()
    }

    pub fn contains(&self, subject: &SubjectId) -> bool {
        self.failures.iter().any(|f| &f.subject == subject)
    }

    /// Write the end-of-run summary to the log
    pub fn write_to(&self, log: &mut RunLog) {
        if self.failures.is_empty() {
            log.line("All subjects processed");
            return;
        }
        log.warn(format!("{} subject(s) skipped:", self.failures.len()));
        for f in &self.failures {
            log.warn(format!("\t{} ({}): {}", f.subject, f.kind, f.message));
        }
    }
}
