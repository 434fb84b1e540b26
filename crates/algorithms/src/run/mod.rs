//! Run plumbing shared by the accumulators
//!
//! - RunLog: append-only text log mirrored to `tracing`
//! - FailureReport: every skipped subject and why
//! - SubjectSource: where habitat rasters come from
//! - Workspace: output directory layout

mod failure;
mod log;
mod subject;
mod workspace;

pub use failure::{FailureKind, FailureReport, SubjectFailure};
pub use log::{format_elapsed, RunLog};
pub use subject::{GeoTiffDirectory, MemorySource, SubjectId, SubjectSource};
pub use workspace::Workspace;
