//! Native GeoTIFF reading/writing
//!
//! Uses the `tiff` crate. Georeferencing is read from and written to the
//! ModelPixelScale / ModelTiepoint tags; the no-data value travels in the
//! GDAL_NODATA ASCII tag so categorical layers keep their nodata through a
//! write/read cycle.

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, PixelType, Raster, RasterElement};
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{self, ColorType};
use tiff::encoder::{TiffEncoder, TiffValue};
use tiff::tags::Tag;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

/// Metadata of a GeoTIFF, read without decoding pixels
#[derive(Debug, Clone, PartialEq)]
pub struct RasterInfo {
    pub rows: usize,
    pub cols: usize,
    pub pixel_type: PixelType,
    pub transform: GeoTransform,
    pub nodata: Option<f64>,
}

/// Read a GeoTIFF file into a Raster
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref()).map_err(|e| open_error(path.as_ref(), e))?;
    decode_geotiff(BufReader::new(file))
}

/// Read a GeoTIFF from an in-memory buffer into a Raster
pub fn read_geotiff_from_buffer<T>(data: &[u8]) -> Result<Raster<T>>
where
    T: RasterElement,
{
    decode_geotiff(Cursor::new(data))
}

/// Describe a GeoTIFF (size, pixel type, georeferencing, nodata)
pub fn describe_geotiff<P: AsRef<Path>>(path: P) -> Result<RasterInfo> {
    let file = File::open(path.as_ref()).map_err(|e| open_error(path.as_ref(), e))?;
    let mut decoder = Decoder::new(BufReader::new(file))
        .map_err(|e| Error::Decode(format!("TIFF decode error: {}", e)))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Decode(format!("Cannot read dimensions: {}", e)))?;
    let pixel_type = read_pixel_type(&mut decoder)?;

    Ok(RasterInfo {
        rows: height as usize,
        cols: width as usize,
        pixel_type,
        transform: read_geotransform(&mut decoder).unwrap_or_default(),
        nodata: read_nodata(&mut decoder),
    })
}

fn open_error(path: &Path, e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::NotFound {
        Error::MissingInput {
            path: path.to_path_buf(),
        }
    } else {
        Error::Io(e)
    }
}

macro_rules! cast_buffer {
    ($buf:expr) => {
        $buf.into_iter()
            .map(|v| num_traits::cast(v).unwrap_or(T::default_nodata()))
            .collect()
    };
}

fn decode_geotiff<T, R>(reader: R) -> Result<Raster<T>>
where
    T: RasterElement,
    R: Read + Seek,
{
    let mut decoder = Decoder::new(reader)
        .map_err(|e| Error::Decode(format!("TIFF decode error: {}", e)))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Decode(format!("Cannot read dimensions: {}", e)))?;
    let rows = height as usize;
    let cols = width as usize;

    let result = decoder
        .read_image()
        .map_err(|e| Error::Decode(format!("Cannot read image data: {}", e)))?;

    let data: Vec<T> = match result {
        DecodingResult::U8(buf) => cast_buffer!(buf),
        DecodingResult::U16(buf) => cast_buffer!(buf),
        DecodingResult::U32(buf) => cast_buffer!(buf),
        DecodingResult::U64(buf) => cast_buffer!(buf),
        DecodingResult::I8(buf) => cast_buffer!(buf),
        DecodingResult::I16(buf) => cast_buffer!(buf),
        DecodingResult::I32(buf) => cast_buffer!(buf),
        DecodingResult::I64(buf) => cast_buffer!(buf),
        DecodingResult::F32(buf) => cast_buffer!(buf),
        DecodingResult::F64(buf) => cast_buffer!(buf),
        #[allow(unreachable_patterns)]
        _ => return Err(Error::UnsupportedDataType("Unsupported TIFF pixel format".to_string())),
    };

    let nodata = read_nodata(&mut decoder).and_then(num_traits::cast::<f64, T>);
    let mut raster = Raster::from_vec(data, rows, cols)?.with_nodata(nodata);
    if let Ok(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }
    Ok(raster)
}

fn read_pixel_type<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<PixelType> {
    let bits = decoder
        .get_tag_u32(Tag::BitsPerSample)
        .map_err(|e| Error::Decode(format!("Cannot read bits per sample: {}", e)))?;
    // SampleFormat: 1 = unsigned, 2 = signed, 3 = float; absent means unsigned
    let format = decoder.get_tag_u32(Tag::SampleFormat).unwrap_or(1);

    let pixel_type = match (format, bits) {
        (1, 8) => PixelType::U8,
        (1, 16) => PixelType::U16,
        (1, 32) => PixelType::U32,
        (1, 64) => PixelType::U64,
        (2, 8) => PixelType::I8,
        (2, 16) => PixelType::I16,
        (2, 32) => PixelType::I32,
        (2, 64) => PixelType::I64,
        (3, 32) => PixelType::F32,
        (3, 64) => PixelType::F64,
        _ => {
            return Err(Error::UnsupportedDataType(format!(
                "sample format {} with {} bits",
                format, bits
            )))
        }
    };
    Ok(pixel_type)
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    decoder
        .get_tag_ascii_string(Tag::Unknown(GDAL_NODATA))
        .ok()
        .and_then(|s| s.trim_matches(|c: char| c == '\0' || c.is_whitespace()).parse().ok())
}

fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoTransform> {
    let scale = decoder
        .get_tag_f64_vec(Tag::Unknown(MODEL_PIXEL_SCALE))
        .map_err(|_| Error::Decode("No pixel scale tag".into()))?;
    let tiepoint = decoder
        .get_tag_f64_vec(Tag::Unknown(MODEL_TIEPOINT))
        .map_err(|_| Error::Decode("No tiepoint tag".into()))?;

    if scale.len() >= 2 && tiepoint.len() >= 6 {
        // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
        let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
        let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
        return Ok(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]));
    }

    Err(Error::Decode("Cannot determine geotransform".into()))
}

/// Write a Raster to a GeoTIFF file in its native pixel type
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    encode_geotiff(raster, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Write a Raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer<T>(raster: &Raster<T>) -> Result<Vec<u8>>
where
    T: RasterElement,
{
    let mut buf = Vec::new();
    encode_geotiff(raster, Cursor::new(&mut buf))?;
    Ok(buf)
}

fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
{
    let mut encoder = TiffEncoder::new(writer)
        .map_err(|e| Error::Encode(format!("TIFF encoder error: {}", e)))?;

    match T::pixel_type() {
        PixelType::U8 => encode_as::<colortype::Gray8, _, _>(&mut encoder, raster),
        PixelType::U16 => encode_as::<colortype::Gray16, _, _>(&mut encoder, raster),
        PixelType::U32 => encode_as::<colortype::Gray32, _, _>(&mut encoder, raster),
        PixelType::U64 => encode_as::<colortype::Gray64, _, _>(&mut encoder, raster),
        PixelType::I8 => encode_as::<colortype::GrayI8, _, _>(&mut encoder, raster),
        PixelType::I16 => encode_as::<colortype::GrayI16, _, _>(&mut encoder, raster),
        PixelType::I32 => encode_as::<colortype::GrayI32, _, _>(&mut encoder, raster),
        PixelType::I64 => encode_as::<colortype::GrayI64, _, _>(&mut encoder, raster),
        PixelType::F32 => encode_as::<colortype::Gray32Float, _, _>(&mut encoder, raster),
        PixelType::F64 => encode_as::<colortype::Gray64Float, _, _>(&mut encoder, raster),
    }
}

fn encode_as<C, T, W>(encoder: &mut TiffEncoder<W>, raster: &Raster<T>) -> Result<()>
where
    C: ColorType,
    C::Inner: num_traits::NumCast,
    [C::Inner]: TiffValue,
    T: RasterElement,
    W: Write + Seek,
{
    let (rows, cols) = raster.shape();
    let data = raster
        .data()
        .iter()
        .map(|&v| num_traits::cast::<T, C::Inner>(v))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| Error::Encode(format!("value not representable as {}", T::pixel_type())))?;

    let mut image = encoder
        .new_image::<C>(cols as u32, rows as u32)
        .map_err(|e| Error::Encode(format!("Cannot create TIFF image: {}", e)))?;

    let gt = raster.transform();
    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_PIXEL_SCALE), &scale[..])
        .map_err(|e| Error::Encode(format!("Cannot write scale tag: {}", e)))?;

    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_TIEPOINT), &tiepoint[..])
        .map_err(|e| Error::Encode(format!("Cannot write tiepoint tag: {}", e)))?;

    // Version 1.1.0 with two keys: projected model, pixel-is-area
    let geokeys: [u16; 12] = [1, 1, 0, 2, 1024, 0, 1, 1, 1025, 0, 1, 1];
    image
        .encoder()
        .write_tag(Tag::Unknown(GEO_KEY_DIRECTORY), &geokeys[..])
        .map_err(|e| Error::Encode(format!("Cannot write geokey tag: {}", e)))?;

    if let Some(nd) = raster.nodata().and_then(|v| v.to_f64()) {
        let text = format!("{}", nd);
        image
            .encoder()
            .write_tag(Tag::Unknown(GDAL_NODATA), text.as_str())
            .map_err(|e| Error::Encode(format!("Cannot write nodata tag: {}", e)))?;
    }

    image
        .write_data(&data)
        .map_err(|e| Error::Encode(format!("Cannot write image data: {}", e)))?;

    Ok(())
}
