//! Tiled categorical summary

use super::CrossTabulation;
use gapstat_core::raster::{Raster, RasterElement};
use gapstat_core::{Error, Result};
use gapstat_parallel::{ProcessingMode, TiledProcessor};
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

/// Parameters for categorical summaries
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SummaryParams {
    /// Side length of the square tiles summarized independently
    pub tile_size: usize,
    /// Summarize tiles on the rayon pool
    pub parallel: bool,
}

impl Default for SummaryParams {
    fn default() -> Self {
        Self {
            tile_size: 1024,
            parallel: true,
        }
    }
}

impl SummaryParams {
    fn processor(&self) -> Result<TiledProcessor> {
        if self.tile_size == 0 {
            return Err(Error::InvalidParameter {
                name: "tile_size",
                value: "0".into(),
                reason: "tiles must hold at least one cell".into(),
            });
        }
        let mode = if self.parallel {
            ProcessingMode::Parallel
        } else {
            ProcessingMode::Sequential
        };
        Ok(TiledProcessor::new(self.tile_size, mode))
    }
}

/// Cross-tabulate a categorical raster tile by tile.
///
/// Each tile is tabulated on its own and the tile tables are summed, so no
/// single pass accumulates more than `tile_size²` cells. No-data cells are
/// not counted.
///
/// # Errors
/// `CorruptRaster` when a valid cell holds a negative or fractional value,
/// since such a raster has no usable category index.
pub fn summarize<T: RasterElement>(
    raster: &Raster<T>,
    params: &SummaryParams,
) -> Result<CrossTabulation> {
    let processor = params.processor()?;
    let nodata = raster.nodata();

    processor.map_reduce(
        raster,
        Ok(CrossTabulation::new()),
        |_, view| tabulate_view(view, nodata),
        |acc, part| match (acc, part) {
            (Ok(mut total), Ok(part)) => {
                total.merge(&part);
                Ok(total)
            }
            (Err(e), _) | (_, Err(e)) => Err(e),
        },
    )
}

/// Cross-tabulate the whole raster in one pass
pub fn summarize_single_pass<T: RasterElement>(raster: &Raster<T>) -> Result<CrossTabulation> {
    tabulate_view(raster.view(), raster.nodata())
}

fn tabulate_view<T: RasterElement>(
    view: ArrayView2<'_, T>,
    nodata: Option<T>,
) -> Result<CrossTabulation> {
    let mut table = CrossTabulation::new();
    for &value in view.iter() {
        if value.is_nodata(nodata) {
            continue;
        }
        match value.to_category() {
            Some(code) if code >= 0 => table.add(code, 1),
            _ => {
                return Err(Error::CorruptRaster {
                    subject: "raster".into(),
                    reason: format!("{:?} is not a category code", value),
                })
            }
        }
    }
    Ok(table)
}
