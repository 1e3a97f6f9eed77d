//! TIFF reading and writing for single-page microscope images.
//!
//! # Key Concepts
//!
//! - **Byte order**: TIFF files declare their endianness (II = little-endian, MM = big-endian)
//!   in the header. All multi-byte values must be read respecting this order.
//!
//! - **Classic TIFF vs BigTIFF**: Classic TIFF uses 32-bit offsets (max 4GB files),
//!   while BigTIFF uses 64-bit offsets. Both are read; output is always classic.
//!
//! - **IFD (Image File Directory)**: Holds every tag of a page. Tags are kept with
//!   their original field type so that they survive a round trip unchanged.
//!
//! - **Inline vs offset values**: Small values are stored inline in the IFD entry,
//!   larger values are stored at an offset pointed to by the entry.

mod file;
mod ifd;
mod parser;
mod tags;
mod values;

pub use file::{colormap_from_palette, encode_tiff, palette_from_colormap, write_tiff, TiffFile};
pub use ifd::{Ifd, ParsedIfd, SkippedEntry};
pub use parser::{ByteOrder, TiffHeader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};
pub use tags::{Compression, FieldType, Photometric, TiffTag};
pub use values::TagValue;
