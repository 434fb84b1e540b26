//! Subject × zone combination

use super::{OverlayEncoding, ZoneSpec};
use gapstat_core::raster::{Raster, RasterElement};
use gapstat_core::{Error, Result};

/// Combine a subject raster with a zone raster into one category raster.
///
/// Every cell of the extent gets a code, so downstream totals account for
/// the whole grid:
/// - subject no-data combines as category 0 (non-habitat)
/// - zone no-data and zones not of interest combine as zone 0
///
/// # Errors
/// `SizeMismatch`/`GridMismatch` when the grids differ, `CorruptRaster`
/// for negative or fractional subject values, `CategoryOutOfDomain` when a
/// subject category is not below the encoding base, `InvalidZone` when a
/// combined code does not fit 32 bits.
pub fn combine<T: RasterElement>(
    subject: &Raster<T>,
    zones: &ZoneSpec,
    encoding: &OverlayEncoding,
) -> Result<Raster<i32>> {
    zones.raster().ensure_same_grid(subject)?;

    let nodata = subject.nodata();
    let codes = subject
        .data()
        .iter()
        .zip(zones.raster().data().iter())
        .map(|(&value, &zone)| {
            let category = if value.is_nodata(nodata) {
                0
            } else {
                match value.to_category() {
                    Some(c) if c >= 0 => c,
                    _ => {
                        return Err(Error::CorruptRaster {
                            subject: "subject".into(),
                            reason: format!("{:?} is not a habitat category", value),
                        })
                    }
                }
            };
            let zone = i64::from(zone);
            let zone = if zones.contains(zone) { zone } else { 0 };
            let code = encoding.encode(category, zone)?;
            i32::try_from(code).map_err(|_| Error::InvalidZone { code: zone })
        })
        .collect::<Result<Vec<i32>>>()?;

    let (rows, cols) = subject.shape();
    Ok(Raster::from_vec(codes, rows, cols)?.with_transform(*subject.transform()))
}
