//! Result tables and the master-table merger
//!
//! - ResultTable: rows keyed by subject or (subject, zone), CSV I/O
//! - merge: column-wise overwrite, append of new keys
//! - archive: timestamped snapshots
//! - MasterTable: archive → merge → persist

mod master;
mod merge;
mod result_table;
mod value;

pub use master::{MasterTable, MasterUpdate};
pub use merge::{archive, merge, MergeSummary, ARCHIVE_TIMESTAMP};
pub use result_table::{
    KeySchema, ResultTable, Row, TableKey, STATUS_COLUMN, STATUS_OK, SUBJECT_COLUMN, ZONE_COLUMN,
};
pub use value::Value;
