//! Categorical raster summaries
//!
//! - CrossTabulation: category code → pixel count
//! - summarize: tiled cross-tabulation, optionally parallel over tiles

mod crosstab;
mod tabulate;

pub use crosstab::CrossTabulation;
pub use tabulate::{summarize, summarize_single_pass, SummaryParams};
