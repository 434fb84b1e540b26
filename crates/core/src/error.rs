//! Error types for GapStat

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for GapStat operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Raster grids are not aligned: {0}")]
    GridMismatch(String),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("GeoTIFF decode error: {0}")]
    Decode(String),

    #[error("GeoTIFF encode error: {0}")]
    Encode(String),

    /// A subject raster does not exist where it was expected.
    #[error("Missing input raster: {}", path.display())]
    MissingInput { path: PathBuf },

    /// A raster's category table cannot be built (unreadable file or
    /// pixel values outside any category domain).
    #[error("Corrupt raster {subject}: {reason}")]
    CorruptRaster { subject: String, reason: String },

    /// A category code does not fit the overlay encoding.
    #[error("Category {value} is outside the encodable domain 0..{base}")]
    CategoryOutOfDomain { value: i64, base: i64 },

    /// Zone code 0 or a negative zone code was supplied or found.
    #[error("Invalid zone code {code}: zone codes must be positive integers")]
    InvalidZone { code: i64 },

    /// An accumulated count does not match the number of contributors.
    #[error("Dimension check failed for {context}: expected {expected}, found {found}")]
    DimensionCheck {
        context: String,
        expected: String,
        found: String,
    },

    #[error("Master table merge conflict: {0}")]
    MergeConflict(String),

    #[error("Table error: {0}")]
    Table(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Tag a decode failure of a subject raster as corruption, relabelling
    /// corruption raised further down with the subject's name.
    pub fn into_corrupt(self, subject: impl Into<String>) -> Self {
        match self {
            Error::Decode(reason)
            | Error::UnsupportedDataType(reason)
            | Error::CorruptRaster { reason, .. } => Error::CorruptRaster {
                subject: subject.into(),
                reason,
            },
            Error::InvalidDimensions { width, height } => Error::CorruptRaster {
                subject: subject.into(),
                reason: format!("pixel buffer does not match {}x{}", width, height),
            },
            other => other,
        }
    }
}

/// Result type alias for GapStat operations
pub type Result<T> = std::result::Result<T, Error>;
