//! Image File Directory reading and writing.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::TiffError;

use super::parser::{ByteOrder, TiffHeader};
use super::tags::{FieldType, TiffTag};
use super::values::TagValue;

/// Bytes taken by the entry count and next-IFD pointer of a classic IFD.
const CLASSIC_IFD_OVERHEAD: usize = 2 + 4;

/// Size of a classic IFD entry.
const CLASSIC_ENTRY_SIZE: usize = 12;

// =============================================================================
// Ifd
// =============================================================================

/// An entry [`Ifd::read`] could not keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkippedEntry {
    pub tag: u16,
    /// Field type code found in the file
    pub type_code: u16,
}

/// A directory as read from a file.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedIfd {
    pub ifd: Ifd,
    /// Offset of the next directory, 0 if this is the last
    pub next_offset: u64,
    pub skipped: Vec<SkippedEntry>,
}

/// One image directory: every tag of a page, ordered by tag id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ifd {
    entries: BTreeMap<u16, TagValue>,
}

impl Ifd {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: u16, value: TagValue) -> Option<TagValue> {
        self.entries.insert(tag, value)
    }

    pub fn remove(&mut self, tag: u16) -> Option<TagValue> {
        self.entries.remove(&tag)
    }

    pub fn get(&self, tag: u16) -> Option<&TagValue> {
        self.entries.get(&tag)
    }

    pub fn get_known(&self, tag: TiffTag) -> Option<&TagValue> {
        self.get(tag.as_u16())
    }

    pub fn contains(&self, tag: u16) -> bool {
        self.entries.contains_key(&tag)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending tag order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &TagValue)> {
        self.entries.iter().map(|(&tag, value)| (tag, value))
    }

    /// Required single integer value.
    pub fn required_u32(&self, tag: TiffTag) -> Result<u32, TiffError> {
        let value = self
            .get_known(tag)
            .ok_or(TiffError::MissingTag(tag.name()))?;
        value.as_u32().ok_or_else(|| TiffError::InvalidTagValue {
            tag: tag.name(),
            message: format!("expected an unsigned integer, got {:?}", value.field_type()),
        })
    }

    /// Optional single integer value with a default.
    pub fn u32_or(&self, tag: TiffTag, default: u32) -> Result<u32, TiffError> {
        match self.get_known(tag) {
            Some(_) => self.required_u32(tag),
            None => Ok(default),
        }
    }

    /// Required integer array, widened to u64.
    pub fn required_u64_vec(&self, tag: TiffTag) -> Result<Vec<u64>, TiffError> {
        let value = self
            .get_known(tag)
            .ok_or(TiffError::MissingTag(tag.name()))?;
        value.as_u64_vec().ok_or_else(|| TiffError::InvalidTagValue {
            tag: tag.name(),
            message: format!("expected unsigned integers, got {:?}", value.field_type()),
        })
    }

    // -------------------------------------------------------------------------
    // Reading
    // -------------------------------------------------------------------------

    /// Parse the IFD at `offset` of an in-memory file.
    ///
    /// Entries with IFD pointer or unknown field types are skipped and
    /// listed in [`ParsedIfd::skipped`]: their values point into the source
    /// file and are meaningless elsewhere.
    pub fn read(data: &[u8], header: &TiffHeader, offset: u64) -> Result<ParsedIfd, TiffError> {
        let order = header.byte_order;
        let count_size = header.count_width();
        let entry_size = header.entry_width();

        let count_bytes = slice(data, offset, count_size)?;
        let count = if header.is_bigtiff {
            order.read_u64(count_bytes)
        } else {
            order.read_u16(count_bytes) as u64
        };

        let entries_start = offset + count_size as u64;
        let entries_len = count
            .checked_mul(entry_size as u64)
            .ok_or(TiffError::InvalidIfdOffset(offset))?;
        let entries = slice(data, entries_start, entries_len as usize)?;

        let mut ifd = Ifd::new();
        let mut skipped = Vec::new();
        for raw in entries.chunks_exact(entry_size) {
            let tag = order.read_u16(&raw[0..2]);
            let type_code = order.read_u16(&raw[2..4]);
            let (count, field) = if header.is_bigtiff {
                (order.read_u64(&raw[4..12]), &raw[12..20])
            } else {
                (order.read_u32(&raw[4..8]) as u64, &raw[8..12])
            };

            let Some(field_type) = FieldType::from_u16(type_code) else {
                debug!("Skipping tag {} with unsupported field type {}", tag, type_code);
                skipped.push(SkippedEntry { tag, type_code });
                continue;
            };

            let byte_len = count
                .checked_mul(field_type.size_in_bytes() as u64)
                .ok_or_else(|| TiffError::InvalidTagValue {
                    tag: "unknown",
                    message: format!("tag {} count {} overflows", tag, count),
                })?;

            let bytes = if field_type.fits_inline(count, header.is_bigtiff) {
                field
            } else {
                let value_offset = header.read_pointer(field);
                slice(data, value_offset, byte_len as usize)?
            };

            let value = TagValue::decode(field_type, count as usize, bytes, order)?;
            ifd.insert(tag, value);
        }

        let next_start = entries_start + entries_len;
        let next_bytes = slice(data, next_start, header.pointer_width())?;
        let next_offset = header.read_pointer(next_bytes);

        Ok(ParsedIfd {
            ifd,
            next_offset,
            skipped,
        })
    }

    // -------------------------------------------------------------------------
    // Writing
    // -------------------------------------------------------------------------

    /// Size of the classic IFD block (entries plus out-of-line values) this
    /// directory encodes to.
    pub fn encoded_len(&self) -> usize {
        let mut len = CLASSIC_IFD_OVERHEAD + CLASSIC_ENTRY_SIZE * self.entries.len();
        for value in self.entries.values() {
            if !value.field_type().fits_inline(value.count(), false) {
                let size = value.field_type().size_in_bytes() * value.count() as usize;
                len += size + size % 2;
            }
        }
        len
    }

    /// Encode as a classic IFD located at `ifd_offset`, followed by the
    /// out-of-line values. Each out-of-line value starts on a word boundary.
    pub fn encode_classic(&self, order: ByteOrder, ifd_offset: u32) -> Result<Vec<u8>, TiffError> {
        let table_len = CLASSIC_IFD_OVERHEAD + CLASSIC_ENTRY_SIZE * self.entries.len();
        let mut table = Vec::with_capacity(table_len);
        let mut values = Vec::new();

        order.write_u16(&mut table, self.entries.len() as u16);
        for (&tag, value) in &self.entries {
            let bytes = value.encode(order);
            let count = u32::try_from(value.count())
                .map_err(|_| TiffError::TooLarge(value.count()))?;

            order.write_u16(&mut table, tag);
            order.write_u16(&mut table, value.field_type().as_u16());
            order.write_u32(&mut table, count);

            if bytes.len() <= 4 {
                let mut inline = [0u8; 4];
                inline[..bytes.len()].copy_from_slice(&bytes);
                table.extend_from_slice(&inline);
            } else {
                let at = ifd_offset as u64 + table_len as u64 + values.len() as u64;
                let at = u32::try_from(at).map_err(|_| TiffError::TooLarge(at))?;
                order.write_u32(&mut table, at);
                values.extend_from_slice(&bytes);
                if values.len() % 2 != 0 {
                    values.push(0);
                }
            }
        }
        // Single page
        order.write_u32(&mut table, 0);

        table.extend_from_slice(&values);
        Ok(table)
    }
}

impl FromIterator<(u16, TagValue)> for Ifd {
    fn from_iter<I: IntoIterator<Item = (u16, TagValue)>>(iter: I) -> Self {
        Ifd {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Bounds-checked view into the file.
pub(crate) fn slice(data: &[u8], offset: u64, len: usize) -> Result<&[u8], TiffError> {
    let out_of_bounds = || TiffError::RangeOutOfBounds {
        offset,
        requested: len as u64,
        size: data.len() as u64,
    };
    let start = usize::try_from(offset).map_err(|_| out_of_bounds())?;
    let end = start.checked_add(len).ok_or_else(out_of_bounds)?;
    data.get(start..end).ok_or_else(out_of_bounds)
}

// =============================================================================
// Tests
// =============================================================================
