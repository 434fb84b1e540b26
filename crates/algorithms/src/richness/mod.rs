//! Species richness
//!
//! Sums the season masks of a list of subjects into a running tally,
//! optionally weighted, with periodic checkpoints for audit and recovery.

mod accumulator;
mod weights;

pub use accumulator::{
    encode_tally, RichnessAccumulator, RichnessOutcome, RichnessParams, TALLY_SCALE,
};
pub use weights::{average_ranks, WeightEntry, WeightPolicy, WeightTable};
