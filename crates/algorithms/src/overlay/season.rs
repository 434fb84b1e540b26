//! Seasonal habitat masks

use gapstat_core::raster::{Raster, RasterElement};
use gapstat_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Habitat category codes
pub const NON_HABITAT: i64 = 0;
pub const SUMMER: i64 = 1;
pub const WINTER: i64 = 2;
pub const YEAR_ROUND: i64 = 3;

/// Season selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Season {
    Summer,
    Winter,
    /// Any habitat (summer, winter or year-round)
    #[default]
    Any,
}

impl Season {
    /// Whether `category` is habitat in this season
    pub fn includes(self, category: i64) -> bool {
        match self {
            Season::Summer => category == SUMMER || category == YEAR_ROUND,
            Season::Winter => category == WINTER || category == YEAR_ROUND,
            Season::Any => category > NON_HABITAT,
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Season::Summer => "Summer",
            Season::Winter => "Winter",
            Season::Any => "Any",
        };
        f.write_str(name)
    }
}

/// Case-insensitive; any non-empty prefix of a season name is accepted.
impl FromStr for Season {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_ascii_lowercase();
        if !key.is_empty() {
            for (name, season) in [
                ("summer", Season::Summer),
                ("winter", Season::Winter),
                ("any", Season::Any),
            ] {
                if name.starts_with(&key) {
                    return Ok(season);
                }
            }
        }
        Err(Error::InvalidParameter {
            name: "season",
            value: s.to_string(),
            reason: "expected Summer, Winter or Any".into(),
        })
    }
}

/// Binary mask: 1 where the cell is habitat in `season`, 0 elsewhere
/// (no-data included).
pub fn season_mask<T: RasterElement>(raster: &Raster<T>, season: Season) -> Result<Raster<u8>> {
    let nodata = raster.nodata();
    let cells = raster
        .data()
        .iter()
        .map(|&value| {
            if value.is_nodata(nodata) {
                return Ok(0);
            }
            match value.to_category() {
                Some(c) if c >= 0 => Ok(u8::from(season.includes(c))),
                _ => Err(Error::CorruptRaster {
                    subject: "habitat".into(),
                    reason: format!("{:?} is not a habitat category", value),
                }),
            }
        })
        .collect::<Result<Vec<u8>>>()?;

    let (rows, cols) = raster.shape();
    Ok(Raster::from_vec(cells, rows, cols)?.with_transform(*raster.transform()))
}
