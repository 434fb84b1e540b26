//! # GapStat Parallel
//!
//! Tiled processing for national-extent rasters.
//!
//! This crate provides:
//! - Non-overlapping tile iteration
//! - Tile map-reduce, sequential or on the rayon pool

pub mod strategy;
pub mod tiled;

pub use strategy::{num_threads, ProcessingMode};
pub use tiled::{Tile, TileIterator, TiledProcessor};
