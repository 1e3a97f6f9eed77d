//! PNG encoding and decoding of rasters.
//!
//! PNG stores 8 and 16 bits per sample losslessly for gray, gray+alpha, RGB
//! and RGBA, which covers every layout the TIFF reader accepts. Palette
//! images are stored as their 8-bit indices; the palette itself travels in
//! the sidecar.
//!
//! | samples | 8-bit      | 16-bit      |
//! |---------|------------|-------------|
//! | 1       | `L8`       | `L16`       |
//! | 2       | `La8`      | `La16`      |
//! | 3       | `Rgb8`     | `Rgb16`     |
//! | 4       | `Rgba8`    | `Rgba16`    |

use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat, ImageReader};

use crate::error::CodecError;
use crate::format::raster::{PixelData, Raster};
use crate::format::write_atomic;

// =============================================================================
// Encoding
// =============================================================================

fn color_type(raster: &Raster) -> Result<ExtendedColorType, CodecError> {
    let color = match (raster.samples_per_pixel, &raster.data) {
        (1, PixelData::U8(_)) => ExtendedColorType::L8,
        (1, PixelData::U16(_)) => ExtendedColorType::L16,
        (2, PixelData::U8(_)) => ExtendedColorType::La8,
        (2, PixelData::U16(_)) => ExtendedColorType::La16,
        (3, PixelData::U8(_)) => ExtendedColorType::Rgb8,
        (3, PixelData::U16(_)) => ExtendedColorType::Rgb16,
        (4, PixelData::U8(_)) => ExtendedColorType::Rgba8,
        (4, PixelData::U16(_)) => ExtendedColorType::Rgba16,
        (n, _) => {
            return Err(CodecError::UnsupportedPixels(format!(
                "{} samples per pixel cannot be stored as PNG",
                n
            )))
        }
    };
    Ok(color)
}

/// Encode a raster as PNG bytes.
///
/// 16-bit samples are handed over in native order; the encoder swaps them to
/// the big-endian layout PNG stores.
pub fn encode_png(raster: &Raster) -> Result<Vec<u8>, CodecError> {
    let color = color_type(raster)?;
    let bytes: Vec<u8> = match &raster.data {
        PixelData::U8(v) => v.clone(),
        PixelData::U16(v) => v.iter().flat_map(|x| x.to_ne_bytes()).collect(),
    };

    let mut output = Vec::new();
    PngEncoder::new(&mut output).write_image(&bytes, raster.width, raster.height, color)?;
    Ok(output)
}

/// Encode and write a raster to `path`, atomically.
pub fn save_png(path: impl AsRef<Path>, raster: &Raster) -> Result<(), CodecError> {
    let bytes = encode_png(raster)?;
    write_atomic(path.as_ref(), &bytes)?;
    Ok(())
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode PNG bytes into a raster.
pub fn decode_png(source: &[u8]) -> Result<Raster, CodecError> {
    let reader = ImageReader::with_format(Cursor::new(source), ImageFormat::Png);
    let img = reader.decode()?;

    let (width, height) = (img.width(), img.height());
    let (samples, data) = match img {
        image::DynamicImage::ImageLuma8(b) => (1, PixelData::U8(b.into_raw())),
        image::DynamicImage::ImageLuma16(b) => (1, PixelData::U16(b.into_raw())),
        image::DynamicImage::ImageLumaA8(b) => (2, PixelData::U8(b.into_raw())),
        image::DynamicImage::ImageLumaA16(b) => (2, PixelData::U16(b.into_raw())),
        image::DynamicImage::ImageRgb8(b) => (3, PixelData::U8(b.into_raw())),
        image::DynamicImage::ImageRgb16(b) => (3, PixelData::U16(b.into_raw())),
        image::DynamicImage::ImageRgba8(b) => (4, PixelData::U8(b.into_raw())),
        image::DynamicImage::ImageRgba16(b) => (4, PixelData::U16(b.into_raw())),
        other => {
            return Err(CodecError::UnsupportedPixels(format!(
                "decoded PNG has color type {:?}",
                other.color()
            )))
        }
    };

    Ok(Raster::new(width, height, samples, data)?)
}

/// Read and decode the PNG at `path`.
pub fn load_png(path: impl AsRef<Path>) -> Result<Raster, CodecError> {
    let bytes = fs::read(path.as_ref())?;
    decode_png(&bytes)
}

// =============================================================================
// Tests
// =============================================================================
