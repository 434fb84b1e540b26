//! Range-extent habitat maps onto a national grid

use gapstat_core::raster::{Raster, RasterElement};
use gapstat_core::{Error, Result};

/// Place `subject` onto the grid of `base`.
///
/// Each output cell is the sum of the valid values of `base` and of the
/// subject cell that falls on it; cells valid in neither are no-data. With a
/// base of zeros plus counter cells, this yields a national-extent copy of
/// the subject carrying the counter cells.
///
/// The subject may extend past the base; cells outside the base are
/// dropped.
///
/// # Errors
/// `GridMismatch` unless both grids share cell size and snap to each other.
pub fn expand_onto(subject: &Raster<i32>, base: &Raster<i32>) -> Result<Raster<i32>> {
    let (dr, dc) = offset_on_base(subject, base)?;

    let nd = base.nodata().unwrap_or_else(i32::default_nodata);
    let (rows, cols) = base.shape();
    let (srows, scols) = subject.shape();
    let mut out = Raster::filled(rows, cols, nd)
        .with_transform(*base.transform())
        .with_nodata(Some(nd));

    for row in 0..rows {
        for col in 0..cols {
            let b = base.get(row, col)?;
            let b = (!base.is_nodata(b)).then_some(b);

            let sr = row as isize - dr;
            let sc = col as isize - dc;
            let s = if sr >= 0 && sc >= 0 && (sr as usize) < srows && (sc as usize) < scols {
                let v = subject.get(sr as usize, sc as usize)?;
                (!subject.is_nodata(v)).then_some(v)
            } else {
                None
            };

            let value = match (b, s) {
                (Some(b), Some(s)) => b.checked_add(s).ok_or_else(|| {
                    Error::Algorithm(format!("cell sum overflows at ({}, {})", row, col))
                })?,
                (Some(v), None) | (None, Some(v)) => v,
                (None, None) => continue,
            };
            out.set(row, col, value)?;
        }
    }

    Ok(out)
}

/// Place a binary season mask onto the grid of `base`.
///
/// A cell is 1 where the mask is 1 or where `base` holds a positive valid
/// value (a counter cell), and 0 elsewhere. Counter cells therefore count
/// once per subject whatever the subject's habitat category there.
///
/// # Errors
/// `GridMismatch` unless both grids share cell size and snap to each other.
pub fn expand_mask(mask: &Raster<u8>, base: &Raster<i32>) -> Result<Raster<u8>> {
    let (dr, dc) = offset_on_base(mask, base)?;
    let (srows, scols) = mask.shape();

    let mut out = base.map(|b| u8::from(!base.is_nodata(b) && b > 0));
    for ((row, col), cell) in out.data_mut().indexed_iter_mut() {
        let sr = row as isize - dr;
        let sc = col as isize - dc;
        let inside = sr >= 0 && sc >= 0 && (sr as usize) < srows && (sc as usize) < scols;
        if inside && mask.get(sr as usize, sc as usize)? == 1 {
            *cell = 1;
        }
    }
    Ok(out)
}

fn offset_on_base<T: RasterElement>(
    subject: &Raster<T>,
    base: &Raster<i32>,
) -> Result<(isize, isize)> {
    base.transform().offset_of(subject.transform()).ok_or_else(|| {
        Error::GridMismatch(format!(
            "subject origin ({}, {}) does not snap to the base grid",
            subject.transform().origin_x,
            subject.transform().origin_y
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gapstat_core::GeoTransform;

    fn national() -> Raster<i32> {
        let mut base = Raster::new(4, 5).with_transform(GeoTransform::new(0.0, 120.0, 30.0, -30.0));
        // counter cell in the upper-left corner
        base.set(0, 0, 3).unwrap();
        base
    }

    #[test]
    fn test_expand_places_subject_by_offset() {
        // 2x2 range map starting one row down, two columns in
        let subject = Raster::from_vec(vec![1, 255, 3, 2], 2, 2)
            .unwrap()
            .with_transform(GeoTransform::new(60.0, 90.0, 30.0, -30.0))
            .with_nodata(Some(255));

        let out = expand_onto(&subject, &national()).unwrap();
        assert_eq!(out.shape(), (4, 5));
        assert_eq!(out.get(0, 0).unwrap(), 3);
        assert_eq!(out.get(1, 2).unwrap(), 1);
        assert_eq!(out.get(1, 3).unwrap(), 0);
        assert_eq!(out.get(2, 2).unwrap(), 3);
        assert_eq!(out.get(2, 3).unwrap(), 2);
        assert_eq!(out.get(3, 4).unwrap(), 0);
        assert_eq!(out.valid_count(), 20);
    }

    #[test]
    fn test_subject_clipped_to_base() {
        let subject = Raster::filled(3, 3, 1)
            .with_transform(GeoTransform::new(90.0, 150.0, 30.0, -30.0));
        let out = expand_onto(&subject, &national()).unwrap();
        // overlap is rows 0..2, cols 3..5
        let ones = out.data().iter().filter(|&&v| v == 1).count();
        assert_eq!(ones, 4);
    }

    #[test]
    fn test_mask_keeps_counter_cells_binary() {
        let mut base = Raster::new(4, 5).with_transform(GeoTransform::new(0.0, 120.0, 30.0, -30.0));
        base.set(0, 0, 1).unwrap();
        // mask covers the counter cell and the cell to its right
        let mask = Raster::from_vec(vec![1u8, 1, 0, 0], 2, 2)
            .unwrap()
            .with_transform(GeoTransform::new(0.0, 120.0, 30.0, -30.0));

        let out = expand_mask(&mask, &base).unwrap();
        assert_eq!(out.get(0, 0).unwrap(), 1);
        assert_eq!(out.get(0, 1).unwrap(), 1);
        assert_eq!(out.get(1, 0).unwrap(), 0);
        assert_eq!(out.data().iter().map(|&v| v as u32).sum::<u32>(), 2);
    }

    #[test]
    fn test_mask_outside_subject_is_zero() {
        let mask = Raster::filled(1, 1, 1u8).with_transform(GeoTransform::new(120.0, 30.0, 30.0, -30.0));
        let out = expand_mask(&mask, &national()).unwrap();
        // counter cell from the base, plus the mask cell at (3, 4)
        assert_eq!(out.get(0, 0).unwrap(), 1);
        assert_eq!(out.get(3, 4).unwrap(), 1);
        assert_eq!(out.data().iter().filter(|&&v| v == 1).count(), 2);
    }

    #[test]
    fn test_misaligned_grid() {
        let subject = Raster::filled(2, 2, 1)
            .with_transform(GeoTransform::new(15.0, 120.0, 30.0, -30.0));
        assert!(matches!(
            expand_onto(&subject, &national()),
            Err(Error::GridMismatch(_))
        ));
    }
}
