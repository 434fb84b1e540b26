//! Raster element trait for generic cell values

use num_traits::{NumCast, Zero};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

/// Storage type of a raster cell, as written to or read from a GeoTIFF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelType {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl PixelType {
    /// Whether cells of this type hold integer category codes
    pub fn is_integer(self) -> bool {
        !matches!(self, PixelType::F32 | PixelType::F64)
    }
}

impl fmt::Display for PixelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PixelType::U8 => "8_BIT_UNSIGNED",
            PixelType::U16 => "16_BIT_UNSIGNED",
            PixelType::U32 => "32_BIT_UNSIGNED",
            PixelType::U64 => "64_BIT_UNSIGNED",
            PixelType::I8 => "8_BIT_SIGNED",
            PixelType::I16 => "16_BIT_SIGNED",
            PixelType::I32 => "32_BIT_SIGNED",
            PixelType::I64 => "64_BIT_SIGNED",
            PixelType::F32 => "32_BIT_FLOAT",
            PixelType::F64 => "64_BIT_FLOAT",
        };
        f.write_str(name)
    }
}

/// Trait for types that can be stored in a raster cell.
///
/// Habitat, zone and combined-category layers use integer types; the
/// richness tally uses `f64`.
pub trait RasterElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// GeoTIFF storage type matching this element
    fn pixel_type() -> PixelType;

    /// Default no-data value for this type
    fn default_nodata() -> Self;

    /// Check if this value represents no-data
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Category code of this value, `None` for non-integral floats
    fn to_category(self) -> Option<i64>;

    /// Convert self to f64
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }
}

macro_rules! impl_raster_element_int {
    ($t:ty, $px:ident) => {
        impl RasterElement for $t {
            fn pixel_type() -> PixelType {
                PixelType::$px
            }

            fn default_nodata() -> Self {
                <$t>::MAX
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                nodata.map_or(false, |nd| *self == nd)
            }

            fn to_category(self) -> Option<i64> {
                NumCast::from(self)
            }
        }
    };
}

macro_rules! impl_raster_element_float {
    ($t:ty, $px:ident) => {
        impl RasterElement for $t {
            fn pixel_type() -> PixelType {
                PixelType::$px
            }

            fn default_nodata() -> Self {
                <$t>::NAN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                if self.is_nan() {
                    return true;
                }
                match nodata {
                    Some(nd) => (self - nd).abs() < <$t>::EPSILON * 100.0,
                    None => false,
                }
            }

            fn to_category(self) -> Option<i64> {
                if self.fract() != 0.0 {
                    return None;
                }
                NumCast::from(self)
            }
        }
    };
}

impl_raster_element_int!(i8, I8);
impl_raster_element_int!(i16, I16);
impl_raster_element_int!(i32, I32);
impl_raster_element_int!(i64, I64);
impl_raster_element_int!(u8, U8);
impl_raster_element_int!(u16, U16);
impl_raster_element_int!(u32, U32);
impl_raster_element_int!(u64, U64);
impl_raster_element_float!(f32, F32);
impl_raster_element_float!(f64, F64);
