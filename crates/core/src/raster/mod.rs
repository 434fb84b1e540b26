//! Raster data structures

mod element;
mod geotransform;
mod grid;

pub use element::{PixelType, RasterElement};
pub use geotransform::GeoTransform;
pub use grid::Raster;
