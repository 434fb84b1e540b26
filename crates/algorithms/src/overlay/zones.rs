//! Zones of interest

use gapstat_core::raster::{GeoTransform, Raster, RasterElement};
use gapstat_core::{Error, Result};
use ndarray::s;
use std::collections::BTreeSet;

/// A zone raster together with the sorted, unique zone codes of interest.
///
/// Zone code 0 is reserved for "outside every zone". Internally the raster
/// stores 0 for no-data cells, which is safe because 0 is rejected as a
/// valid pixel value at construction.
#[derive(Debug, Clone)]
pub struct ZoneSpec {
    name: String,
    raster: Raster<i32>,
    codes: Vec<i64>,
}

impl ZoneSpec {
    /// Build a zone spec from a zone raster.
    ///
    /// With `codes = None` every distinct valid pixel value is a zone.
    ///
    /// # Errors
    /// `InvalidZone` when a supplied code or a valid pixel value is 0,
    /// negative or beyond 32 bits; `CorruptRaster` for fractional pixel
    /// values.
    pub fn from_raster<T: RasterElement>(
        name: impl Into<String>,
        raster: &Raster<T>,
        codes: Option<&[i64]>,
    ) -> Result<Self> {
        let name = name.into();
        let nodata = raster.nodata();
        let mut found = BTreeSet::new();

        let mut cells = Vec::with_capacity(raster.len());
        for &value in raster.data().iter() {
            if value.is_nodata(nodata) {
                cells.push(0);
                continue;
            }
            let code = value.to_category().ok_or_else(|| Error::CorruptRaster {
                subject: name.clone(),
                reason: format!("zone value {:?} is not an integer", value),
            })?;
            let cell = i32::try_from(code).map_err(|_| Error::InvalidZone { code })?;
            if cell <= 0 {
                return Err(Error::InvalidZone { code });
            }
            found.insert(code);
            cells.push(cell);
        }

        let codes: Vec<i64> = match codes {
            Some(requested) => {
                if let Some(&bad) = requested
                    .iter()
                    .find(|&&c| c <= 0 || i32::try_from(c).is_err())
                {
                    return Err(Error::InvalidZone { code: bad });
                }
                let unique: BTreeSet<i64> = requested.iter().copied().collect();
                unique.into_iter().collect()
            }
            None => found.into_iter().collect(),
        };
        if codes.is_empty() {
            return Err(Error::InvalidParameter {
                name: "zones",
                value: name,
                reason: "no zone codes of interest".into(),
            });
        }

        let (rows, cols) = raster.shape();
        let zones = Raster::from_vec(cells, rows, cols)?.with_transform(*raster.transform());

        Ok(Self {
            name,
            raster: zones,
            codes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Zone raster, 0 where no zone is defined
    pub fn raster(&self) -> &Raster<i32> {
        &self.raster
    }

    /// Sorted zone codes of interest
    pub fn codes(&self) -> &[i64] {
        &self.codes
    }

    pub fn contains(&self, code: i64) -> bool {
        self.codes.binary_search(&code).is_ok()
    }

    /// Zone of interest at a cell, 0 when outside all of them
    pub fn zone_at(&self, row: usize, col: usize) -> i64 {
        match self.raster.get(row, col) {
            Ok(code) if self.contains(i64::from(code)) => i64::from(code),
            _ => 0,
        }
    }

    /// The same zones over another `rows` × `cols` extent on this grid.
    ///
    /// Cells of the extent that lie beyond the zone raster are outside every
    /// zone.
    ///
    /// # Errors
    /// `GridMismatch` unless `transform` shares the cell size and snaps to
    /// the zone grid.
    pub fn clip_to(&self, transform: &GeoTransform, rows: usize, cols: usize) -> Result<ZoneSpec> {
        let (dr, dc) = self.raster.transform().offset_of(transform).ok_or_else(|| {
            Error::GridMismatch(format!(
                "extent origin ({}, {}) does not snap to the {} zone grid",
                transform.origin_x, transform.origin_y, self.name
            ))
        })?;

        let mut clipped = Raster::<i32>::new(rows, cols)
            .with_transform(*transform)
            .with_nodata(self.raster.nodata());

        // overlap in zone-grid coordinates
        let (zrows, zcols) = self.raster.shape();
        let r0 = dr.max(0);
        let c0 = dc.max(0);
        let r1 = (dr + rows as isize).min(zrows as isize);
        let c1 = (dc + cols as isize).min(zcols as isize);
        if r0 < r1 && c0 < c1 {
            let (h, w) = ((r1 - r0) as usize, (c1 - c0) as usize);
            let src = self.raster.window(r0 as usize, c0 as usize, h, w);
            let (tr, tc) = ((r0 - dr) as usize, (c0 - dc) as usize);
            clipped
                .data_mut()
                .slice_mut(s![tr..tr + h, tc..tc + w])
                .assign(&src);
        }

        Ok(ZoneSpec {
            name: self.name.clone(),
            raster: clipped,
            codes: self.codes.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovers_codes() {
        let r = Raster::from_vec(vec![2u8, 1, 255, 2], 2, 2).unwrap().with_nodata(Some(255));
        let spec = ZoneSpec::from_raster("padus", &r, None).unwrap();
        assert_eq!(spec.codes(), &[1, 2]);
        assert_eq!(spec.zone_at(1, 0), 0);
        assert_eq!(spec.zone_at(0, 0), 2);
    }

    #[test]
    fn test_requested_subset() {
        let r = Raster::from_vec(vec![1i32, 2, 3, 3], 2, 2).unwrap();
        let spec = ZoneSpec::from_raster("lc", &r, Some(&[3, 1, 3])).unwrap();
        assert_eq!(spec.codes(), &[1, 3]);
        assert_eq!(spec.zone_at(0, 1), 0);
    }

    #[test]
    fn test_zero_pixel_is_fatal() {
        let r = Raster::from_vec(vec![1i32, 0], 1, 2).unwrap();
        assert!(matches!(
            ZoneSpec::from_raster("z", &r, None),
            Err(Error::InvalidZone { code: 0 })
        ));
    }

    #[test]
    fn test_clip_to_subject_extent() {
        // 3x4 zones, 10 m cells, origin (0, 30)
        let r = Raster::from_vec(vec![1i32, 1, 2, 2, 1, 1, 2, 2, 3, 3, 3, 3], 3, 4)
            .unwrap()
            .with_transform(GeoTransform::new(0.0, 30.0, 10.0, -10.0));
        let spec = ZoneSpec::from_raster("z", &r, Some(&[1, 2])).unwrap();

        // 2x3 extent one row down, two columns in; its last column hangs off
        let clipped = spec
            .clip_to(&GeoTransform::new(20.0, 20.0, 10.0, -10.0), 2, 3)
            .unwrap();
        assert_eq!(clipped.codes(), &[1, 2]);
        assert_eq!(
            clipped.raster().data().iter().copied().collect::<Vec<_>>(),
            vec![2, 2, 0, 3, 3, 0]
        );
        assert_eq!(clipped.zone_at(0, 1), 2);
        // 3 is present but not of interest
        assert_eq!(clipped.zone_at(1, 0), 0);
    }

    #[test]
    fn test_clip_to_misaligned_extent() {
        let r = Raster::filled(2, 2, 1i32).with_transform(GeoTransform::new(0.0, 20.0, 10.0, -10.0));
        let spec = ZoneSpec::from_raster("z", &r, None).unwrap();
        assert!(matches!(
            spec.clip_to(&GeoTransform::new(5.0, 20.0, 10.0, -10.0), 1, 1),
            Err(Error::GridMismatch(_))
        ));
    }

    #[test]
    fn test_zone_beyond_32_bits_rejected() {
        let r = Raster::from_vec(vec![1i64, 1 << 40], 1, 2).unwrap();
        assert!(matches!(
            ZoneSpec::from_raster("z", &r, None),
            Err(Error::InvalidZone { .. })
        ));
    }

    #[test]
    fn test_zero_code_supplied_is_fatal() {
        let r = Raster::from_vec(vec![1i32, 2], 1, 2).unwrap();
        assert!(matches!(
            ZoneSpec::from_raster("z", &r, Some(&[0, 1])),
            Err(Error::InvalidZone { code: 0 })
        ));
    }
}
