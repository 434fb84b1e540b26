//! Keyed result tables and their CSV form

use super::Value;
use gapstat_core::{Error, Result};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::{Read, Write};
use std::path::Path;

/// Name of the subject key column
pub const SUBJECT_COLUMN: &str = "GeoTiff";
/// Name of the zone key column
pub const ZONE_COLUMN: &str = "Zone";
/// Per-row processing status: `ok`, or the error that skipped the subject
pub const STATUS_COLUMN: &str = "Status";
/// Status of a successfully processed subject
pub const STATUS_OK: &str = "ok";

/// How rows of a table are keyed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySchema {
    /// One row per subject (richness weight tables)
    Subject,
    /// One row per (subject, zone) (zonal overlays)
    SubjectZone,
}

impl fmt::Display for KeySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySchema::Subject => write!(f, "({})", SUBJECT_COLUMN),
            KeySchema::SubjectZone => write!(f, "({}, {})", SUBJECT_COLUMN, ZONE_COLUMN),
        }
    }
}

/// Row key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableKey {
    pub subject: String,
    pub zone: Option<i64>,
}

impl TableKey {
    pub fn subject(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            zone: None,
        }
    }

    pub fn zoned(subject: impl Into<String>, zone: i64) -> Self {
        Self {
            subject: subject.into(),
            zone: Some(zone),
        }
    }

    fn schema(&self) -> KeySchema {
        match self.zone {
            Some(_) => KeySchema::SubjectZone,
            None => KeySchema::Subject,
        }
    }
}

/// A keyed row; absent cells are simply not stored
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub key: TableKey,
    pub cells: BTreeMap<String, Value>,
}

/// A table of rows with unique keys.
///
/// Row order is insertion order and column order is first-use order, so a
/// table written back out keeps the layout it was read with.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    schema: KeySchema,
    columns: Vec<String>,
    rows: Vec<Row>,
    index: HashMap<TableKey, usize>,
}

impl ResultTable {
    pub fn new(schema: KeySchema) -> Self {
        Self {
            schema,
            columns: Vec::new(),
            rows: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Declare columns up front to fix their output order
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for c in columns {
            self.add_column(c.into());
        }
        self
    }

    pub fn schema(&self) -> KeySchema {
        self.schema
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn keys(&self) -> impl Iterator<Item = &TableKey> {
        self.rows.iter().map(|r| &r.key)
    }

    pub fn contains_key(&self, key: &TableKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn row(&self, key: &TableKey) -> Option<&Row> {
        self.index.get(key).map(|&i| &self.rows[i])
    }

    /// Cell at `(key, column)`, `None` when the row or cell is absent
    pub fn get(&self, key: &TableKey, column: &str) -> Option<&Value> {
        self.row(key).and_then(|r| r.cells.get(column))
    }

    /// Ensure a row exists for `key`, appending an empty one if needed.
    pub fn ensure_row(&mut self, key: TableKey) -> Result<&mut Row> {
        if key.schema() != self.schema {
            return Err(Error::Table(format!(
                "key {:?} does not fit table keyed by {}",
                key, self.schema
            )));
        }
        let existing = self.index.get(&key).copied();
        let i = match existing {
            Some(i) => i,
            None => {
                self.rows.push(Row {
                    key: key.clone(),
                    cells: BTreeMap::new(),
                });
                self.index.insert(key, self.rows.len() - 1);
                self.rows.len() - 1
            }
        };
        Ok(&mut self.rows[i])
    }

    /// Set one cell, creating the row and column as needed
    pub fn set(&mut self, key: TableKey, column: &str, value: impl Into<Value>) -> Result<()> {
        self.add_column(column.to_string());
        self.ensure_row(key)?
            .cells
            .insert(column.to_string(), value.into());
        Ok(())
    }

    pub(crate) fn add_column(&mut self, column: String) {
        if !self.columns.iter().any(|c| *c == column) {
            self.columns.push(column);
        }
    }

    // CSV

    /// Read a table; the schema follows from the header's key columns.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().flexible(false).from_reader(reader);
        let headers = rdr
            .headers()
            .map_err(|e| Error::Table(e.to_string()))?
            .clone();

        if headers.get(0) != Some(SUBJECT_COLUMN) {
            return Err(Error::Table(format!(
                "first column must be {}, found {:?}",
                SUBJECT_COLUMN,
                headers.get(0)
            )));
        }
        let (schema, key_cols) = if headers.get(1) == Some(ZONE_COLUMN) {
            (KeySchema::SubjectZone, 2)
        } else {
            (KeySchema::Subject, 1)
        };

        let mut table =
            ResultTable::new(schema).with_columns(headers.iter().skip(key_cols).map(String::from));

        for record in rdr.records() {
            let record = record.map_err(|e| Error::Table(e.to_string()))?;
            let subject = record.get(0).unwrap_or_default().to_string();
            let zone = match schema {
                KeySchema::Subject => None,
                KeySchema::SubjectZone => {
                    let field = record.get(1).unwrap_or_default();
                    Some(field.trim().parse::<i64>().map_err(|_| {
                        Error::Table(format!("invalid zone {:?} for {}", field, subject))
                    })?)
                }
            };
            let key = TableKey { subject, zone };
            if table.contains_key(&key) {
                return Err(Error::Table(format!("duplicate key {:?}", key)));
            }

            let row = table.ensure_row(key)?;
            for (column, field) in headers.iter().zip(record.iter()).skip(key_cols) {
                if let Some(value) = Value::parse(field) {
                    row.cells.insert(column.to_string(), value);
                }
            }
        }

        Ok(table)
    }

    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::MissingInput {
                path: path.to_path_buf(),
            });
        }
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        let table_err = |e: csv::Error| Error::Table(e.to_string());

        let mut header = vec![SUBJECT_COLUMN.to_string()];
        if self.schema == KeySchema::SubjectZone {
            header.push(ZONE_COLUMN.to_string());
        }
        header.extend(self.columns.iter().cloned());
        wtr.write_record(&header).map_err(table_err)?;

        for row in &self.rows {
            let mut fields = vec![row.key.subject.clone()];
            if let Some(zone) = row.key.zone {
                fields.push(zone.to_string());
            }
            fields.extend(
                self.columns
                    .iter()
                    .map(|c| row.cells.get(c).map(Value::to_string).unwrap_or_default()),
            );
            wtr.write_record(&fields).map_err(table_err)?;
        }

        wtr.flush()?;
        Ok(())
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.to_writer(std::io::BufWriter::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResultTable {
        let mut t = ResultTable::new(KeySchema::SubjectZone).with_columns(["PercSummer", "Date"]);
        t.set(TableKey::zoned("mSEWEx.tif", 1), "PercSummer", 60.0).unwrap();
        t.set(TableKey::zoned("mSEWEx.tif", 1), "Date", "2026-10-18").unwrap();
        t.set(TableKey::zoned("mSEWEx.tif", 2), "PercSummer", 40.0).unwrap();
        t.set(TableKey::zoned("bAMROx.tif", 1), "SummerPixels", 12i64).unwrap();
        t
    }

    #[test]
    fn test_csv_round_trip_keeps_layout() {
        let table = sample();
        let mut buf = Vec::new();
        table.to_writer(&mut buf).unwrap();

        let text = String::from_utf8(buf.clone()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("GeoTiff,Zone,PercSummer,Date,SummerPixels"));
        assert_eq!(lines.next(), Some("mSEWEx.tif,1,60.0,2026-10-18,"));

        let back = ResultTable::from_reader(buf.as_slice()).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn test_subject_schema_from_header() {
        let csv = "GeoTiff,cnt,weight\nsp1,10,1.0\nsp2,,2.0\n";
        let t = ResultTable::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(t.schema(), KeySchema::Subject);
        assert_eq!(t.get(&TableKey::subject("sp1"), "cnt"), Some(&Value::Int(10)));
        assert_eq!(t.get(&TableKey::subject("sp2"), "cnt"), None);
    }

    #[test]
    fn test_wrong_key_kind_rejected() {
        let mut t = ResultTable::new(KeySchema::Subject);
        assert!(t.set(TableKey::zoned("sp1", 1), "cnt", 1i64).is_err());
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let csv = "GeoTiff,Zone,x\nsp1,1,1\nsp1,1,2\n";
        assert!(ResultTable::from_reader(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_missing_key_column() {
        let csv = "Species,x\nsp1,1\n";
        assert!(matches!(
            ResultTable::from_reader(csv.as_bytes()),
            Err(Error::Table(_))
        ));
    }
}
