//! File header and byte order.
//!
//! ```text
//!          classic              BigTIFF
//! +-----+--------------+  +-----+--------------+
//! | 0-1 | II / MM      |  | 0-1 | II / MM      |
//! | 2-3 | 42           |  | 2-3 | 43           |
//! | 4-7 | first IFD    |  | 4-5 | pointer = 8  |
//! +-----+--------------+  | 6-7 | 0            |
//!                         | 8-15| first IFD    |
//!                         +-----+--------------+
//! ```
//!
//! Instruments write classic files. BigTIFF is read so that large re-exports
//! still convert; everything written here is little-endian classic.

use crate::error::TiffError;

const CLASSIC: u16 = 42;
const BIG: u16 = 43;

/// Header length of a classic file.
pub const TIFF_HEADER_SIZE: usize = 8;

/// Header length of a BigTIFF file.
pub const BIGTIFF_HEADER_SIZE: usize = 16;

// =============================================================================
// ByteOrder
// =============================================================================

/// Endianness announced by the first two bytes of a file.
///
/// Readers index the slice directly and panic when it is short; the IFD code
/// bounds-checks every range before decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// `II`
    LittleEndian,
    /// `MM`
    BigEndian,
}

macro_rules! byte_order_io {
    ($($read:ident, $write:ident => $ty:ty, $n:literal);* $(;)?) => {
        $(
            #[inline]
            pub fn $read(self, bytes: &[u8]) -> $ty {
                let mut buf = [0u8; $n];
                buf.copy_from_slice(&bytes[..$n]);
                match self {
                    ByteOrder::LittleEndian => <$ty>::from_le_bytes(buf),
                    ByteOrder::BigEndian => <$ty>::from_be_bytes(buf),
                }
            }

            #[inline]
            pub fn $write(self, out: &mut Vec<u8>, value: $ty) {
                match self {
                    ByteOrder::LittleEndian => out.extend_from_slice(&value.to_le_bytes()),
                    ByteOrder::BigEndian => out.extend_from_slice(&value.to_be_bytes()),
                }
            }
        )*
    };
}

impl ByteOrder {
    byte_order_io! {
        read_u16, write_u16 => u16, 2;
        read_i16, write_i16 => i16, 2;
        read_u32, write_u32 => u32, 4;
        read_i32, write_i32 => i32, 4;
        read_u64, write_u64 => u64, 8;
        read_f32, write_f32 => f32, 4;
        read_f64, write_f64 => f64, 8;
    }

    /// Byte order for the two opening bytes of a file.
    pub fn from_magic(magic: [u8; 2]) -> Option<Self> {
        match &magic {
            b"II" => Some(ByteOrder::LittleEndian),
            b"MM" => Some(ByteOrder::BigEndian),
            _ => None,
        }
    }

    pub const fn magic(self) -> [u8; 2] {
        match self {
            ByteOrder::LittleEndian => *b"II",
            ByteOrder::BigEndian => *b"MM",
        }
    }
}

// =============================================================================
// TiffHeader
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiffHeader {
    pub byte_order: ByteOrder,
    /// 64-bit counts and pointers
    pub is_bigtiff: bool,
    pub first_ifd_offset: u64,
}

impl TiffHeader {
    /// Parse the header of a file of `file_size` bytes starting with `bytes`.
    pub fn parse(bytes: &[u8], file_size: u64) -> Result<Self, TiffError> {
        let too_small = |required: usize| TiffError::FileTooSmall {
            required: required as u64,
            actual: bytes.len() as u64,
        };
        if bytes.len() < TIFF_HEADER_SIZE {
            return Err(too_small(TIFF_HEADER_SIZE));
        }

        let magic = [bytes[0], bytes[1]];
        let byte_order = ByteOrder::from_magic(magic)
            .ok_or(TiffError::InvalidMagic(u16::from_be_bytes(magic)))?;

        let (is_bigtiff, first_ifd_offset) = match byte_order.read_u16(&bytes[2..]) {
            CLASSIC => (false, u64::from(byte_order.read_u32(&bytes[4..]))),
            BIG if bytes.len() < BIGTIFF_HEADER_SIZE => {
                return Err(too_small(BIGTIFF_HEADER_SIZE))
            }
            BIG => match byte_order.read_u16(&bytes[4..]) {
                8 => (true, byte_order.read_u64(&bytes[8..])),
                other => return Err(TiffError::InvalidBigTiffOffsetSize(other)),
            },
            other => return Err(TiffError::InvalidVersion(other)),
        };

        if first_ifd_offset >= file_size {
            return Err(TiffError::InvalidIfdOffset(first_ifd_offset));
        }

        Ok(TiffHeader {
            byte_order,
            is_bigtiff,
            first_ifd_offset,
        })
    }

    /// Classic header bytes pointing at `first_ifd_offset`.
    pub fn encode_classic(byte_order: ByteOrder, first_ifd_offset: u32) -> Vec<u8> {
        let mut out = byte_order.magic().to_vec();
        byte_order.write_u16(&mut out, CLASSIC);
        byte_order.write_u32(&mut out, first_ifd_offset);
        out
    }

    /// Width of the entry count opening an IFD.
    pub const fn count_width(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            2
        }
    }

    /// Width of one IFD entry: tag, type, count and value field.
    pub const fn entry_width(&self) -> usize {
        4 + 2 * self.pointer_width()
    }

    /// Width of a pointer, which is also the inline value capacity.
    pub const fn pointer_width(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            4
        }
    }

    pub fn read_pointer(&self, bytes: &[u8]) -> u64 {
        match self.is_bigtiff {
            true => self.byte_order.read_u64(bytes),
            false => u64::from(self.byte_order.read_u32(bytes)),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
