//! Zonal cross-tabulation of habitat maps
//!
//! For each subject: overlay with the zone raster, summarize the combined
//! raster, decode into seasonal counts per zone, derive the share of each
//! season's habitat inside each zone.

mod accumulator;
mod record;

pub use accumulator::{OverlayExtent, PublishedRun, ZonalAccumulator, ZonalParams, ZonalRun};
pub use record::{percent, SeasonCounts, ZonalRecord, ZONAL_COLUMNS};
