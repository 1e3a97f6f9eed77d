//! Decoded pixel data shared by the TIFF and PNG sides.

use crate::error::TiffError;

/// Interleaved samples, one variant per bit depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PixelData {
    U8(Vec<u8>),
    U16(Vec<u16>),
}

impl PixelData {
    pub fn len(&self) -> usize {
        match self {
            PixelData::U8(v) => v.len(),
            PixelData::U16(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single image plane with chunky (interleaved) samples, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub samples_per_pixel: u16,
    pub data: PixelData,
}

impl Raster {
    /// Build a raster, checking the buffer length against the dimensions.
    pub fn new(
        width: u32,
        height: u32,
        samples_per_pixel: u16,
        data: PixelData,
    ) -> Result<Self, TiffError> {
        let expected = width as u64 * height as u64 * samples_per_pixel as u64;
        if data.len() as u64 != expected {
            return Err(TiffError::UnsupportedLayout(format!(
                "{}x{}x{} raster needs {} samples, got {}",
                width,
                height,
                samples_per_pixel,
                expected,
                data.len()
            )));
        }
        Ok(Raster {
            width,
            height,
            samples_per_pixel,
            data,
        })
    }

    pub fn bits_per_sample(&self) -> u16 {
        match self.data {
            PixelData::U8(_) => 8,
            PixelData::U16(_) => 16,
        }
    }

    /// Bytes in one row of samples.
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.samples_per_pixel as usize * (self.bits_per_sample() as usize / 8)
    }

    /// Total size of the pixel buffer in bytes.
    pub fn byte_len(&self) -> u64 {
        self.row_bytes() as u64 * self.height as u64
    }
}
