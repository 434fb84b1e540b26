//! Overlay of habitat and zone rasters
//!
//! - Encoding: invertible `subject + zone * base` codes
//! - Zones: zone raster plus the zone codes of interest
//! - Combine: subject × zone category raster
//! - Season masks, expansion onto a national grid, map-unit reclassification

mod combine;
mod encoding;
mod expand;
mod reclass;
mod season;
mod zones;

pub use combine::combine;
pub use encoding::OverlayEncoding;
pub use expand::{expand_mask, expand_onto};
pub use reclass::reclassify_codes;
pub use season::{season_mask, Season, NON_HABITAT, SUMMER, WINTER, YEAR_ROUND};
pub use zones::ZoneSpec;
