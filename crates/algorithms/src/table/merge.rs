//! Column-wise merging and archival snapshots

use super::ResultTable;
use chrono::NaiveDateTime;
use gapstat_core::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Timestamp format used in archive file names
pub const ARCHIVE_TIMESTAMP: &str = "%Y-%m-%d-%H%M%S";

/// What a merge changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Existing rows that received at least one new cell value
    pub updated_rows: usize,
    /// Rows only present in the new results
    pub appended_rows: usize,
    /// Existing rows the new results did not touch
    pub untouched_rows: usize,
    /// Cells written into existing rows
    pub overwritten_cells: usize,
}

/// Merge `new` into `existing`.
///
/// For keys in both tables, every cell present in the new row overwrites
/// the old cell; cells absent from the new row keep their prior value.
/// Keys only in `new` are appended after the existing rows, in `new`'s
/// order. Columns only in `new` are appended to the column list.
///
/// # Errors
/// `MergeConflict` when the tables are keyed differently.
pub fn merge(existing: &ResultTable, new: &ResultTable) -> Result<(ResultTable, MergeSummary)> {
    if existing.schema() != new.schema() {
        return Err(Error::MergeConflict(format!(
            "master table keyed by {} cannot take results keyed by {}",
            existing.schema(),
            new.schema()
        )));
    }

    let mut merged = existing.clone();
    for column in new.columns() {
        merged.add_column(column.clone());
    }

    let mut summary = MergeSummary::default();
    for row in new.rows() {
        let is_new = !merged.contains_key(&row.key);
        let target = merged.ensure_row(row.key.clone())?;
        if is_new {
            target.cells = row.cells.clone();
            summary.appended_rows += 1;
            continue;
        }
        if !row.cells.is_empty() {
            summary.updated_rows += 1;
        }
        for (column, value) in &row.cells {
            target.cells.insert(column.clone(), value.clone());
            summary.overwritten_cells += 1;
        }
    }
    summary.untouched_rows = existing
        .keys()
        .filter(|k| new.row(k).map_or(true, |r| r.cells.is_empty()))
        .count();

    debug!(
        updated = summary.updated_rows,
        appended = summary.appended_rows,
        cells = summary.overwritten_cells,
        "merged result tables"
    );
    Ok((merged, summary))
}

/// Write a snapshot of `table` to `dir/<stem>_<timestamp>.csv`.
pub fn archive(
    table: &ResultTable,
    dir: &Path,
    stem: &str,
    timestamp: NaiveDateTime,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}_{}.csv", stem, timestamp.format(ARCHIVE_TIMESTAMP)));
    table.write_csv(&path)?;
    debug!(path = %path.display(), rows = table.len(), "archived table");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{KeySchema, TableKey, Value};

    fn master() -> ResultTable {
        let mut t = ResultTable::new(KeySchema::SubjectZone);
        t.set(TableKey::zoned("sp1", 1), "SummerPixels", 60i64).unwrap();
        t.set(TableKey::zoned("sp1", 1), "Legacy", "kept").unwrap();
        t.set(TableKey::zoned("sp9", 1), "SummerPixels", 5i64).unwrap();
        t
    }

    #[test]
    fn test_merge_preserves_overwrites_appends() {
        let mut update = ResultTable::new(KeySchema::SubjectZone);
        update.set(TableKey::zoned("sp1", 1), "SummerPixels", 61i64).unwrap();
        update.set(TableKey::zoned("sp2", 1), "SummerPixels", 7i64).unwrap();

        let (merged, summary) = merge(&master(), &update).unwrap();

        let sp1 = TableKey::zoned("sp1", 1);
        assert_eq!(merged.get(&sp1, "SummerPixels"), Some(&Value::Int(61)));
        assert_eq!(merged.get(&sp1, "Legacy"), Some(&Value::from("kept")));
        assert_eq!(
            merged.get(&TableKey::zoned("sp9", 1), "SummerPixels"),
            Some(&Value::Int(5))
        );
        assert_eq!(merged.keys().last(), Some(&TableKey::zoned("sp2", 1)));
        assert_eq!(
            summary,
            MergeSummary {
                updated_rows: 1,
                appended_rows: 1,
                untouched_rows: 1,
                overwritten_cells: 1,
            }
        );
    }

    #[test]
    fn test_schema_mismatch_is_conflict() {
        let update = ResultTable::new(KeySchema::Subject);
        assert!(matches!(
            merge(&master(), &update),
            Err(Error::MergeConflict(_))
        ));
    }

    #[test]
    fn test_archive_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let ts = chrono::NaiveDate::from_ymd_opt(2026, 10, 18)
            .unwrap()
            .and_hms_opt(9, 5, 0)
            .unwrap();
        let table = master();
        let path = archive(&table, &dir.path().join("archive"), "PADUS_Master", ts).unwrap();

        assert!(path.ends_with("PADUS_Master_2026-10-18-090500.csv"));
        assert_eq!(ResultTable::read_csv(&path).unwrap(), table);
    }
}
