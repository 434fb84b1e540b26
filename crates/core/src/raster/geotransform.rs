//! Affine georeferencing and grid alignment

use serde::{Deserialize, Serialize};

/// Relative tolerance, in cells, for treating two grids as aligned.
const ALIGN_TOLERANCE: f64 = 1e-6;

/// North-up affine transform of a raster grid.
///
/// ```text
/// x = origin_x + col * pixel_width
/// y = origin_y + row * pixel_height
/// ```
///
/// `pixel_height` is negative for north-up images. GAP habitat maps are
/// 30 m Albers grids that all snap to the same national grid, so two layers
/// can be overlaid cell-by-cell once they share cell size and their origins
/// differ by a whole number of cells.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    /// Cell size in X
    pub pixel_width: f64,
    /// Cell size in Y (usually negative)
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// Geographic coordinates of the top-left corner of a cell
    pub fn cell_corner(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.origin_x + col as f64 * self.pixel_width,
            self.origin_y + row as f64 * self.pixel_height,
        )
    }

    /// Cell size (assumes square cells)
    pub fn cell_size(&self) -> f64 {
        self.pixel_width.abs()
    }

    /// Bounding box (min_x, min_y, max_x, max_y) for a grid of given size
    pub fn bounds(&self, cols: usize, rows: usize) -> (f64, f64, f64, f64) {
        let (x0, y0) = self.cell_corner(0, 0);
        let (x1, y1) = self.cell_corner(cols, rows);
        (x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }

    /// Whether both transforms use the same cell size in both axes
    pub fn same_resolution(&self, other: &GeoTransform) -> bool {
        let tol = self.cell_size() * ALIGN_TOLERANCE;
        (self.pixel_width - other.pixel_width).abs() <= tol
            && (self.pixel_height - other.pixel_height).abs() <= tol
    }

    /// Whether both transforms describe the same grid origin and resolution
    pub fn same_grid(&self, other: &GeoTransform) -> bool {
        self.offset_of(other) == Some((0, 0))
    }

    /// Cell offset `(row, col)` of `other`'s origin within this grid.
    ///
    /// Returns `None` when the grids differ in resolution or `other` does
    /// not snap to this grid.
    pub fn offset_of(&self, other: &GeoTransform) -> Option<(isize, isize)> {
        if !self.same_resolution(other) {
            return None;
        }
        let col = (other.origin_x - self.origin_x) / self.pixel_width;
        let row = (other.origin_y - self.origin_y) / self.pixel_height;
        let (col_r, row_r) = (col.round(), row.round());
        if (col - col_r).abs() > ALIGN_TOLERANCE || (row - row_r).abs() > ALIGN_TOLERANCE {
            return None;
        }
        Some((row_r as isize, col_r as isize))
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bounds() {
        let gt = GeoTransform::new(0.0, 100.0, 30.0, -30.0);
        let (min_x, min_y, max_x, max_y) = gt.bounds(10, 5);

        assert_relative_eq!(min_x, 0.0, epsilon = 1e-10);
        assert_relative_eq!(min_y, -50.0, epsilon = 1e-10);
        assert_relative_eq!(max_x, 300.0, epsilon = 1e-10);
        assert_relative_eq!(max_y, 100.0, epsilon = 1e-10);
    }

    #[test]
    fn test_offset_of_snapped_grid() {
        let national = GeoTransform::new(-2_361_915.0, 3_177_435.0, 30.0, -30.0);
        let range = GeoTransform::new(-2_361_915.0 + 30.0 * 12.0, 3_177_435.0 - 30.0 * 7.0, 30.0, -30.0);

        assert_eq!(national.offset_of(&range), Some((7, 12)));
        assert_eq!(range.offset_of(&national), Some((-7, -12)));
        assert!(national.same_grid(&national));
    }

    #[test]
    fn test_offset_of_misaligned() {
        let a = GeoTransform::new(0.0, 0.0, 30.0, -30.0);
        let half_cell = GeoTransform::new(15.0, 0.0, 30.0, -30.0);
        let coarse = GeoTransform::new(0.0, 0.0, 60.0, -60.0);

        assert_eq!(a.offset_of(&half_cell), None);
        assert_eq!(a.offset_of(&coarse), None);
    }
}
