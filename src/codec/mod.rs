//! Lossless TIFF to PNG compression and back.
//!
//! Compressing `image--X01--Y02.ome.tif` produces two files:
//!
//! ```text
//! image--X01--Y02.png    pixels of the first page
//! image--X01--Y02.json   every TIFF tag, see [`sidecar`]
//! ```
//!
//! Decompressing the PNG reads the JSON next to it and writes
//! `image--X01--Y02.ome.tif` with the same pixels and tags.
//!
//! Both directions are idempotent: when the output already exists nothing is
//! written and the existing path is returned. The batch functions never fail
//! as a whole; a failed image is logged and leaves `None` in its slot.

mod compress;
mod decompress;
pub mod sidecar;

use std::path::{Path, PathBuf};

pub use compress::{compress, compress_image, png_path, CompressOptions};
pub use decompress::{decompress, decompress_image, tif_path, DecompressOptions};
pub use sidecar::Sidecar;

/// Outcome of a single-image conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Converted {
    /// The output was written by this call
    Written(PathBuf),
    /// The output was already there and left untouched
    Existing(PathBuf),
}

impl Converted {
    pub fn path(&self) -> &Path {
        match self {
            Converted::Written(p) | Converted::Existing(p) => p,
        }
    }

    pub fn into_path(self) -> PathBuf {
        match self {
            Converted::Written(p) | Converted::Existing(p) => p,
        }
    }

    pub fn was_written(&self) -> bool {
        matches!(self, Converted::Written(_))
    }
}

/// Output path in `folder` (or next to `source`) with a new file name.
fn output_path(source: &Path, folder: Option<&Path>, file_name: String) -> PathBuf {
    match folder {
        Some(folder) => folder.join(file_name),
        None => source.with_file_name(file_name),
    }
}

/// File name of `path` without its extension, as a string.
fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().is_some_and(|e| e == extension)
}
