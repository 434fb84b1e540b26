//! Tiled processing for large rasters
//!
//! National 30 m grids run to tens of thousands of cells per side. Counting
//! them in one pass overflowed the 32-bit attribute tables older tooling
//! relied on, so work is cut into fixed-size blocks whose partial results
//! are combined afterwards.

use crate::strategy::ProcessingMode;
use gapstat_core::raster::{Raster, RasterElement};
use ndarray::ArrayView2;

/// A rectangular window of a raster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// Row offset in the source raster
    pub row_offset: usize,
    /// Column offset in the source raster
    pub col_offset: usize,
    /// Number of rows in this tile
    pub rows: usize,
    /// Number of columns in this tile
    pub cols: usize,
}

impl Tile {
    /// Number of cells in the tile
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// View of this tile's cells in `raster`
    pub fn view<'a, T: RasterElement>(&self, raster: &'a Raster<T>) -> ArrayView2<'a, T> {
        raster.window(self.row_offset, self.col_offset, self.rows, self.cols)
    }
}

/// Iterator over non-overlapping tiles covering a raster row by row.
///
/// Edge tiles are truncated to the raster bounds, so every cell belongs to
/// exactly one tile.
pub struct TileIterator {
    total_rows: usize,
    total_cols: usize,
    tile_size: usize,
    current_row: usize,
    current_col: usize,
}

impl TileIterator {
    pub fn new(total_rows: usize, total_cols: usize, tile_size: usize) -> Self {
        Self {
            total_rows,
            total_cols,
            tile_size: tile_size.max(1),
            current_row: 0,
            current_col: 0,
        }
    }
}

impl Iterator for TileIterator {
    type Item = Tile;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_row >= self.total_rows || self.total_cols == 0 {
            return None;
        }

        let rows = self.tile_size.min(self.total_rows - self.current_row);
        let cols = self.tile_size.min(self.total_cols - self.current_col);
        let tile = Tile {
            row_offset: self.current_row,
            col_offset: self.current_col,
            rows,
            cols,
        };

        self.current_col += self.tile_size;
        if self.current_col >= self.total_cols {
            self.current_col = 0;
            self.current_row += self.tile_size;
        }

        Some(tile)
    }
}

/// Map-reduce over the tiles of a raster
#[derive(Debug, Clone, Copy)]
pub struct TiledProcessor {
    tile_size: usize,
    mode: ProcessingMode,
}

impl TiledProcessor {
    pub fn new(tile_size: usize, mode: ProcessingMode) -> Self {
        Self {
            tile_size: tile_size.max(1),
            mode,
        }
    }

    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    /// Tiles covering a grid of the given shape
    pub fn tiles(&self, rows: usize, cols: usize) -> Vec<Tile> {
        TileIterator::new(rows, cols, self.tile_size).collect()
    }

    /// Run `map` on every tile, then fold the per-tile results with `reduce`
    /// in tile order starting from `init`.
    pub fn map_reduce<T, A, M, R>(&self, raster: &Raster<T>, init: A, map: M, reduce: R) -> A
    where
        T: RasterElement,
        A: Send,
        M: Fn(Tile, ArrayView2<'_, T>) -> A + Sync + Send,
        R: Fn(A, A) -> A,
    {
        let (rows, cols) = raster.shape();
        let partials = self
            .mode
            .map_collect(self.tiles(rows, cols), |tile| map(tile, tile.view(raster)));
        partials.into_iter().fold(init, reduce)
    }
}

impl Default for TiledProcessor {
    fn default() -> Self {
        Self::new(1024, ProcessingMode::default())
    }
}
