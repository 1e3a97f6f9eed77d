use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::dispatch::{Batch, WorkerPool};
use crate::error::CodecError;
use crate::format::png::load_png;
use crate::format::tiff::{colormap_from_palette, write_tiff, Photometric, TagValue, TiffTag};

use super::sidecar::Sidecar;
use super::{has_extension, output_path, stem, Converted};

/// Options for [`decompress`] and [`decompress_image`].
#[derive(Debug, Clone, Default)]
pub struct DecompressOptions {
    /// Store the TIFF here instead of next to the PNG
    pub folder: Option<PathBuf>,
    /// Remove the PNG once the TIFF is saved
    pub delete_png: bool,
    /// Remove the JSON sidecar once the TIFF is saved
    pub delete_json: bool,
}

/// TIFF path for a PNG: extension replaced by `.ome.tif`.
pub fn tif_path(source: &Path, folder: Option<&Path>) -> PathBuf {
    output_path(source, folder, format!("{}.ome.tif", stem(source)))
}

/// Restore one PNG and its JSON sidecar to a TIFF.
pub fn decompress_image(
    source: &Path,
    options: &DecompressOptions,
) -> Result<Converted, CodecError> {
    debug!("Decompressing {}", source.display());

    let tif = tif_path(source, options.folder.as_deref());
    if tif.is_file() {
        info!("TIFF already exists, skipping: {}", tif.display());
        return Ok(Converted::Existing(tif));
    }
    if !source.is_file() {
        return Err(CodecError::NotFound(source.to_path_buf()));
    }
    if !has_extension(source, "png") {
        return Err(CodecError::InvalidInput {
            operation: "decompress",
            expected: "PNG",
            path: source.to_path_buf(),
        });
    }

    let raster = load_png(source)?;

    let json = source.with_extension("json");
    let sidecar = Sidecar::read(&json)?;
    let mut tags = sidecar.to_tags()?;

    if let Some(palette) = &sidecar.palette {
        if tags.get_known(TiffTag::ColorMap).is_none() {
            debug!("Restoring color map from palette");
            tags.insert(
                TiffTag::ColorMap.as_u16(),
                TagValue::Short(colormap_from_palette(palette)),
            );
            tags.insert(
                TiffTag::PhotometricInterpretation.as_u16(),
                TagValue::Short(vec![Photometric::Palette.as_u16()]),
            );
        }
    }

    debug!("Saving to {}", tif.display());
    write_tiff(&tif, &raster, &tags)?;

    if options.delete_png {
        fs::remove_file(source)?;
    }
    if options.delete_json {
        fs::remove_file(&json)?;
    }

    Ok(Converted::Written(tif))
}

/// Decompress a batch of PNGs on `pool`.
///
/// One slot per input, in input order: the TIFF path or `None` on failure.
pub fn decompress(
    images: impl Into<Batch>,
    options: &DecompressOptions,
    pool: &WorkerPool,
) -> Vec<Option<PathBuf>> {
    pool.map(images.into().into_vec(), |image| {
        match decompress_image(&image, options) {
            Ok(converted) => Some(converted.into_path()),
            Err(e) => {
                warn!("Aborting decompress of {}: {}", image.display(), e);
                None
            }
        }
    })
}

// =============================================================================
// Tests
// =============================================================================
