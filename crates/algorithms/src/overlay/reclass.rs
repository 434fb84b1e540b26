//! Map-unit reclassification

use gapstat_core::raster::{Raster, RasterElement};
use gapstat_core::{Error, Result};
use std::collections::HashSet;

/// Reclassify a categorical raster: cells whose code is in `codes` become
/// `to`, every other cell becomes no-data.
///
/// Typically used to turn land-cover map units into a single-zone raster.
pub fn reclassify_codes<T: RasterElement>(
    raster: &Raster<T>,
    codes: &[i64],
    to: i32,
) -> Result<Raster<i32>> {
    if codes.is_empty() {
        return Err(Error::InvalidParameter {
            name: "codes",
            value: String::new(),
            reason: "at least one code is required".into(),
        });
    }
    let nd = i32::default_nodata();
    if to == nd {
        return Err(Error::InvalidParameter {
            name: "to",
            value: to.to_string(),
            reason: "collides with the no-data value".into(),
        });
    }

    let wanted: HashSet<i64> = codes.iter().copied().collect();
    let nodata = raster.nodata();
    let cells = raster
        .data()
        .iter()
        .map(|&v| {
            let hit = !v.is_nodata(nodata) && v.to_category().is_some_and(|c| wanted.contains(&c));
            if hit {
                to
            } else {
                nd
            }
        })
        .collect();

    let (rows, cols) = raster.shape();
    Ok(Raster::from_vec(cells, rows, cols)?
        .with_transform(*raster.transform())
        .with_nodata(Some(nd)))
}
