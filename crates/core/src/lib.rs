//! # GapStat Core
//!
//! Core types and I/O shared by the GapStat habitat-analysis crates.
//!
//! This crate provides:
//! - `Raster<T>`: georeferenced 2D grid used for habitat, zone and tally layers
//! - `GeoTransform`: affine georeferencing plus grid alignment checks
//! - `Error`: the error taxonomy every component reports through
//! - Native GeoTIFF reading, writing and description

pub mod error;
pub mod io;
pub mod raster;

pub use error::{Error, Result};
pub use raster::{GeoTransform, PixelType, Raster, RasterElement};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
}
