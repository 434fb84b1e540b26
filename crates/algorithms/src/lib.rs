//! # GapStat Algorithms
//!
//! Zonal cross-tabulation and weighted accumulation of GAP habitat maps.
//!
//! ## Modules
//!
//! - **summary**: tiled category → pixel count tables
//! - **overlay**: subject × zone combination, season masks, grid expansion
//! - **zonal**: share of each species' seasonal habitat inside each zone
//! - **richness**: (weighted) species richness with checkpoints
//! - **table**: result tables, master-table merging and archives
//! - **run**: run logs, failure reports, subject sources, workspaces

pub mod overlay;
pub mod richness;
pub mod run;
pub mod summary;
pub mod table;
pub mod zonal;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::overlay::{
        combine, expand_onto, reclassify_codes, season_mask, OverlayEncoding, Season, ZoneSpec,
    };
    pub use crate::richness::{
        RichnessAccumulator, RichnessOutcome, RichnessParams, WeightPolicy, WeightTable,
    };
    pub use crate::run::{
        FailureReport, GeoTiffDirectory, MemorySource, RunLog, SubjectId, SubjectSource,
        Workspace,
    };
    pub use crate::summary::{summarize, CrossTabulation, SummaryParams};
    pub use crate::table::{merge, MasterTable, ResultTable, TableKey};
    pub use crate::zonal::{OverlayExtent, ZonalAccumulator, ZonalParams, ZonalRecord, ZonalRun};
    pub use gapstat_core::prelude::*;
}
