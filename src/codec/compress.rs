use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::dispatch::{Batch, WorkerPool};
use crate::error::CodecError;
use crate::format::png::encode_png;
use crate::format::tiff::TiffFile;
use crate::format::write_atomic;

use super::sidecar::Sidecar;
use super::{has_extension, output_path, stem, Converted};

/// Options for [`compress`] and [`compress_image`].
#[derive(Debug, Clone, Default)]
pub struct CompressOptions {
    /// Store PNG and JSON here instead of next to the source
    pub folder: Option<PathBuf>,
    /// Remove the TIFF once the PNG is saved
    pub delete_original: bool,
    /// Compress even if the PNG already exists
    pub force: bool,
}

/// PNG path for a TIFF: extension and a trailing `.ome` removed, `.png` added.
pub fn png_path(source: &Path, folder: Option<&Path>) -> PathBuf {
    let stem = stem(source);
    let base = stem.strip_suffix(".ome").unwrap_or(&stem);
    output_path(source, folder, format!("{}.png", base))
}

/// Compress one TIFF to PNG plus JSON sidecar.
pub fn compress_image(source: &Path, options: &CompressOptions) -> Result<Converted, CodecError> {
    debug!("Compressing {}", source.display());

    // A PNG source would map onto itself and pass as already compressed
    if !has_extension(source, "tif") {
        return Err(CodecError::InvalidInput {
            operation: "compress",
            expected: "TIFF",
            path: source.to_path_buf(),
        });
    }
    let png = png_path(source, options.folder.as_deref());
    if png.is_file() && !options.force {
        info!("PNG already exists, skipping: {}", png.display());
        return Ok(Converted::Existing(png));
    }
    if !source.is_file() {
        return Err(CodecError::NotFound(source.to_path_buf()));
    }

    // Whole file is read and closed here
    let tiff = TiffFile::open(source)?;
    if tiff.has_more_pages {
        info!("Only the first page is kept: {}", source.display());
    }
    for entry in &tiff.skipped {
        warn!(
            "Tag {} of {} has field type {} and is not preserved",
            entry.tag,
            source.display(),
            entry.type_code
        );
    }

    let palette = tiff.palette();
    if palette.is_some() {
        debug!("Palette image stored as its index plane");
    }

    // Nothing is written if encoding fails
    let encoded = encode_png(&tiff.raster)?;
    let json = png.with_extension("json");
    Sidecar::from_tags(&tiff.tags, palette).write(&json)?;

    // The PNG marks the image as done, so it is written last
    debug!("Saving to {}", png.display());
    if let Err(e) = write_atomic(&png, &encoded) {
        if !png.is_file() {
            if let Err(cleanup) = fs::remove_file(&json) {
                warn!("Cannot remove {}: {}", json.display(), cleanup);
            }
        }
        return Err(e.into());
    }

    if options.delete_original {
        fs::remove_file(source)?;
    }

    Ok(Converted::Written(png))
}

/// Compress a batch of TIFFs on `pool`.
///
/// Returns one slot per input, in input order: the PNG path (new or already
/// present) or `None` if that image failed.
pub fn compress(
    images: impl Into<Batch>,
    options: &CompressOptions,
    pool: &WorkerPool,
) -> Vec<Option<PathBuf>> {
    pool.map(images.into().into_vec(), |image| {
        match compress_image(&image, options) {
            Ok(converted) => Some(converted.into_path()),
            Err(e) => {
                warn!("Aborting compress of {}: {}", image.display(), e);
                None
            }
        }
    })
}

// =============================================================================
// Tests
// =============================================================================
