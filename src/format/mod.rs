//! Image formats on both sides of the conversion.
//!
//! - [`tiff`]: the source format, read and written tag for tag
//! - [`png`]: the compressed pixel container, through the `image` crate
//!
//! Both meet at [`Raster`], an interleaved pixel buffer.

pub mod png;
pub mod raster;
pub mod tiff;

use std::fs;
use std::io::{self, Write};
use std::path::Path;

pub use raster::{PixelData, Raster};

/// Write `bytes` to `path` through a temporary file in the same folder.
///
/// The file shows up at `path` complete or not at all, so an interrupted
/// write never passes for an existing output later.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let folder = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut builder = tempfile::Builder::new();
    builder.prefix(".matrixscan-");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o644));
    }

    let mut file = builder.tempfile_in(folder)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}
