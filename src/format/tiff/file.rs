//! Whole-file TIFF reading and writing.
//!
//! Reading keeps every tag of the first page and decodes its pixels into a
//! [`Raster`]. Writing produces a single-page, little-endian classic TIFF:
//!
//! ```text
//! +--------+----------+----------+-----+-----------+---------------------+
//! | header | strip 0  | strip 1  | ... | IFD table | out-of-line values  |
//! | 8 B    | (even)   | (even)   |     |           | (word aligned)      |
//! +--------+----------+----------+-----+-----------+---------------------+
//! ```
//!
//! Structural tags (dimensions, sample layout, strip offsets and counts) are
//! regenerated from the raster. Every other tag is written as given.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::TiffError;
use crate::format::raster::{PixelData, Raster};
use crate::format::write_atomic;

use super::ifd::{slice, Ifd, ParsedIfd, SkippedEntry};
use super::parser::{ByteOrder, TiffHeader, TIFF_HEADER_SIZE};
use super::tags::{Compression, Photometric, TiffTag};
use super::values::TagValue;

/// Tile tags, dropped on write since output is always stripped.
const TILE_TAGS: [u16; 4] = [322, 323, 324, 325];

// =============================================================================
// TiffFile
// =============================================================================

/// First page of a TIFF file: its tags and decoded pixels.
#[derive(Debug, Clone)]
pub struct TiffFile {
    pub byte_order: ByteOrder,
    pub tags: Ifd,
    pub raster: Raster,
    /// The file holds more than one page; only the first was read
    pub has_more_pages: bool,
    /// Entries of the first page whose field type cannot be carried over
    pub skipped: Vec<SkippedEntry>,
}

impl TiffFile {
    /// Read a TIFF file from disk.
    ///
    /// The whole file is read into memory and the handle closed before
    /// returning, so the path can be removed or replaced right after.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TiffError> {
        let data = fs::read(path.as_ref())?;
        Self::from_bytes(&data)
    }

    /// Parse a TIFF held in memory.
    pub fn from_bytes(data: &[u8]) -> Result<Self, TiffError> {
        let header = TiffHeader::parse(data, data.len() as u64)?;
        let ParsedIfd {
            ifd: tags,
            next_offset: next,
            skipped,
        } = Ifd::read(data, &header, header.first_ifd_offset)?;
        if next != 0 {
            debug!("TIFF has more than one page, reading the first only");
        }

        let raster = read_strips(data, &header, &tags)?;

        Ok(TiffFile {
            byte_order: header.byte_order,
            tags,
            raster,
            has_more_pages: next != 0,
            skipped,
        })
    }

    pub fn photometric(&self) -> Option<Photometric> {
        self.tags
            .get_known(TiffTag::PhotometricInterpretation)
            .and_then(TagValue::as_u32)
            .and_then(|v| u16::try_from(v).ok())
            .and_then(Photometric::from_u16)
    }

    /// Palette as flat `r, g, b` triplets when the page is color-mapped.
    pub fn palette(&self) -> Option<Vec<u8>> {
        if self.photometric() != Some(Photometric::Palette) {
            return None;
        }
        match self.tags.get_known(TiffTag::ColorMap)? {
            TagValue::Short(map) => Some(palette_from_colormap(map)),
            _ => None,
        }
    }
}

/// Convert a planar 16-bit ColorMap (all reds, then greens, then blues) to
/// interleaved 8-bit triplets.
pub fn palette_from_colormap(map: &[u16]) -> Vec<u8> {
    let n = map.len() / 3;
    let mut out = Vec::with_capacity(n * 3);
    for i in 0..n {
        for channel in 0..3 {
            out.push((map[channel * n + i] >> 8) as u8);
        }
    }
    out
}

/// Inverse of [`palette_from_colormap`], scaling 8-bit entries to 16 bits.
pub fn colormap_from_palette(palette: &[u8]) -> Vec<u16> {
    let n = palette.len() / 3;
    let mut map = vec![0u16; n * 3];
    for (i, rgb) in palette.chunks_exact(3).enumerate() {
        for (channel, &value) in rgb.iter().enumerate() {
            map[channel * n + i] = value as u16 * 257;
        }
    }
    map
}

// -----------------------------------------------------------------------------
// Strip decoding
// -----------------------------------------------------------------------------

fn read_strips(data: &[u8], header: &TiffHeader, tags: &Ifd) -> Result<Raster, TiffError> {
    let compression = tags.u32_or(TiffTag::Compression, 1)?;
    match u16::try_from(compression).ok().and_then(Compression::from_u16) {
        Some(c) if c.is_supported() => {}
        Some(c) => return Err(TiffError::UnsupportedCompression(c.name().to_string())),
        None => return Err(TiffError::UnsupportedCompression(format!("code {}", compression))),
    }

    if tags.get_known(TiffTag::TileWidth).is_some() {
        return Err(TiffError::UnsupportedLayout("tiled images".to_string()));
    }

    let width = tags.required_u32(TiffTag::ImageWidth)?;
    let height = tags.required_u32(TiffTag::ImageLength)?;
    let samples = tags.u32_or(TiffTag::SamplesPerPixel, 1)?;
    if !(1..=4).contains(&samples) {
        return Err(TiffError::UnsupportedLayout(format!(
            "{} samples per pixel",
            samples
        )));
    }
    let samples = samples as u16;

    if samples > 1 && tags.u32_or(TiffTag::PlanarConfiguration, 1)? != 1 {
        return Err(TiffError::UnsupportedLayout("planar sample layout".to_string()));
    }

    let bits = match tags.get_known(TiffTag::BitsPerSample) {
        Some(_) => tags.required_u64_vec(TiffTag::BitsPerSample)?,
        None => vec![1],
    };
    let depth = bits[0];
    if bits.iter().any(|&b| b != depth) || !(depth == 8 || depth == 16) {
        return Err(TiffError::UnsupportedLayout(format!(
            "{:?} bits per sample",
            bits
        )));
    }

    let rows_per_strip = tags
        .u32_or(TiffTag::RowsPerStrip, height)?
        .clamp(1, height.max(1));
    let row_bytes = width as u64 * samples as u64 * depth / 8;
    let expected = row_bytes * height as u64;
    let expected_len =
        usize::try_from(expected).map_err(|_| TiffError::TooLarge(expected))?;

    let offsets = tags.required_u64_vec(TiffTag::StripOffsets)?;
    let counts = match tags.get_known(TiffTag::StripByteCounts) {
        Some(_) => tags.required_u64_vec(TiffTag::StripByteCounts)?,
        // Uncompressed strips are full except the last
        None => (0..offsets.len() as u64)
            .map(|i| {
                let first_row = i * rows_per_strip as u64;
                let rows = (height as u64).saturating_sub(first_row).min(rows_per_strip as u64);
                rows * row_bytes
            })
            .collect(),
    };
    if counts.len() != offsets.len() {
        return Err(TiffError::InvalidTagValue {
            tag: TiffTag::StripByteCounts.name(),
            message: format!("{} counts for {} strips", counts.len(), offsets.len()),
        });
    }

    let mut bytes = Vec::with_capacity(expected_len);
    for (&offset, &count) in offsets.iter().zip(&counts) {
        let wanted = (expected_len - bytes.len()).min(count as usize);
        bytes.extend_from_slice(slice(data, offset, wanted)?);
        if bytes.len() == expected_len {
            break;
        }
    }
    if bytes.len() != expected_len {
        return Err(TiffError::InvalidTagValue {
            tag: TiffTag::StripByteCounts.name(),
            message: format!("strips hold {} bytes, image needs {}", bytes.len(), expected_len),
        });
    }

    let pixels = if depth == 8 {
        PixelData::U8(bytes)
    } else {
        let order = header.byte_order;
        PixelData::U16(bytes.chunks_exact(2).map(|b| order.read_u16(b)).collect())
    };

    Raster::new(width, height, samples, pixels)
}

// =============================================================================
// Writing
// =============================================================================

/// Encode `raster` with `tags` as a little-endian classic TIFF.
pub fn encode_tiff(raster: &Raster, tags: &Ifd) -> Result<Vec<u8>, TiffError> {
    let order = ByteOrder::LittleEndian;

    let pixels = match &raster.data {
        PixelData::U8(v) => v.clone(),
        PixelData::U16(v) => {
            let mut out = Vec::with_capacity(v.len() * 2);
            v.iter().for_each(|&x| order.write_u16(&mut out, x));
            out
        }
    };

    let height = raster.height.max(1);
    let rows_per_strip = tags
        .get_known(TiffTag::RowsPerStrip)
        .and_then(TagValue::as_u32)
        .unwrap_or(height)
        .clamp(1, height);
    let strip_len = (raster.row_bytes() * rows_per_strip as usize).max(1);

    let mut body = TiffHeader::encode_classic(order, 0);
    let mut offsets = Vec::new();
    let mut counts = Vec::new();
    for strip in pixels.chunks(strip_len) {
        offsets.push(to_u32(body.len() as u64)?);
        counts.push(to_u32(strip.len() as u64)?);
        body.extend_from_slice(strip);
        if body.len() % 2 != 0 {
            body.push(0);
        }
    }
    if offsets.is_empty() {
        // Zero-sized image still needs one (empty) strip
        offsets.push(to_u32(body.len() as u64)?);
        counts.push(0);
    }

    let ifd = structural_tags(raster, tags, offsets, counts, rows_per_strip);
    let ifd_offset = to_u32(body.len() as u64)?;
    let total = body.len() as u64 + ifd.encoded_len() as u64;
    to_u32(total)?;

    body[4..TIFF_HEADER_SIZE].copy_from_slice(&ifd_offset.to_le_bytes());
    body.extend(ifd.encode_classic(order, ifd_offset)?);
    Ok(body)
}

/// Write `raster` with `tags` to `path`, atomically.
pub fn write_tiff(path: impl AsRef<Path>, raster: &Raster, tags: &Ifd) -> Result<(), TiffError> {
    let bytes = encode_tiff(raster, tags)?;
    write_atomic(path.as_ref(), &bytes)?;
    Ok(())
}

fn structural_tags(
    raster: &Raster,
    tags: &Ifd,
    offsets: Vec<u32>,
    counts: Vec<u32>,
    rows_per_strip: u32,
) -> Ifd {
    let mut ifd = tags.clone();
    for tag in TILE_TAGS {
        ifd.remove(tag);
    }

    let mut set = |tag: TiffTag, values: Vec<u32>| {
        let value = TagValue::unsigned_like(tags.get_known(tag), values);
        ifd.insert(tag.as_u16(), value);
    };

    let samples = raster.samples_per_pixel as usize;
    set(TiffTag::ImageWidth, vec![raster.width]);
    set(TiffTag::ImageLength, vec![raster.height]);
    set(TiffTag::BitsPerSample, vec![raster.bits_per_sample() as u32; samples]);
    set(TiffTag::Compression, vec![Compression::None as u32]);
    set(TiffTag::SamplesPerPixel, vec![samples as u32]);
    set(TiffTag::StripOffsets, offsets);
    set(TiffTag::StripByteCounts, counts);

    // Any value of at least the height means a single strip, so the
    // source's own value (often 2^32 - 1) still describes the layout
    let height = raster.height.max(1) as u64;
    let keeps_rows = tags
        .get_known(TiffTag::RowsPerStrip)
        .and_then(TagValue::as_u64)
        .is_some_and(|rows| rows == rows_per_strip as u64 || rows >= height);
    if !keeps_rows {
        set(TiffTag::RowsPerStrip, vec![rows_per_strip]);
    }

    ifd
}

fn to_u32(value: u64) -> Result<u32, TiffError> {
    u32::try_from(value).map_err(|_| TiffError::TooLarge(value))
}

// =============================================================================
// Tests
// =============================================================================
