//! Navigation of a matrix scan experiment folder.
//!
//! The scanning software exports an experiment as a fixed hierarchy:
//!
//! ```text
//! <experiment>/
//! ├── AdditionalData/
//! │   └── {ScanningTemplate}<name>.xml
//! └── slide--S00/
//!     └── chamber--U00--V00/                     well
//!         ├── TileConfiguration.registered.txt   after stitching
//!         └── field--X00--Y00/
//!             ├── metadata/
//!             │   └── image--...--X00--Y00.ome.xml
//!             └── image--L0000--S00--U00--V00--J20--E00--O00--X00--Y00--T0000--Z00--C00.ome.tif
//! ```
//!
//! [`Experiment`] caches nothing: every accessor globs the filesystem again,
//! so results reflect compressions or deletions made in between. Lists are
//! sorted lexicographically by path.

pub mod pattern;
mod tile_config;

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::attributes::attributes;
use crate::codec::{self, CompressOptions, DecompressOptions};
use crate::dispatch::{chop, WorkerPool};
use crate::error::ExperimentError;
use crate::stitch::{stitch_macro, MacroRunner};

use self::pattern::{extend, sorted_glob, validate};

pub use pattern::pattern;
pub use tile_config::{StitchCoordinates, TILE_CONFIGURATION};

const SLIDE: &str = "slide";
const CHAMBER: &str = "chamber";
const FIELD: &str = "field";
const IMAGE: &str = "image";
const STITCHED: &str = "stitched";
const METADATA: &str = "metadata";
const ADDITIONAL_DATA: &str = "AdditionalData";
const SCANNING_TEMPLATE: &str = "{ScanningTemplate}";

// =============================================================================
// Experiment
// =============================================================================

/// A matrix scan experiment rooted at an absolute path.
#[derive(Clone, PartialEq, Eq)]
pub struct Experiment {
    path: PathBuf,
    slide_pattern: String,
    well_pattern: String,
    field_pattern: String,
    image_pattern: String,
}

impl Experiment {
    /// Open the experiment at `path`; relative paths are resolved against
    /// the current directory. The folder does not need to exist.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, ExperimentError> {
        let path = path.as_ref();
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };

        let slide_pattern = pattern(&path, &[SLIDE], None);
        let well_pattern = extend(&slide_pattern, &[CHAMBER], None);
        let field_pattern = extend(&well_pattern, &[FIELD], None);
        let image_pattern = extend(&field_pattern, &[IMAGE], None);
        validate(&image_pattern)?;

        Ok(Experiment {
            path,
            slide_pattern,
            well_pattern,
            field_pattern,
            image_pattern,
        })
    }

    /// Absolute path of the experiment folder.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Folder containing the experiment.
    pub fn dirname(&self) -> Option<&Path> {
        self.path.parent()
    }

    /// Name of the experiment folder.
    pub fn basename(&self) -> Option<String> {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
    }

    // -------------------------------------------------------------------------
    // Hierarchy levels
    // -------------------------------------------------------------------------

    pub fn slides(&self) -> Vec<PathBuf> {
        sorted_glob(&self.slide_pattern)
    }

    pub fn wells(&self) -> Vec<PathBuf> {
        sorted_glob(&self.well_pattern)
    }

    /// Alias of [`Experiment::wells`].
    pub fn chambers(&self) -> Vec<PathBuf> {
        self.wells()
    }

    pub fn fields(&self) -> Vec<PathBuf> {
        sorted_glob(&self.field_pattern)
    }

    /// TIFF and PNG images, sorted together.
    pub fn images(&self) -> Vec<PathBuf> {
        let mut images = sorted_glob(&extend(&self.image_pattern, &[], Some("tif")));
        images.extend(sorted_glob(&extend(&self.image_pattern, &[], Some("png"))));
        images.sort();
        images
    }

    /// Stitched images stored in the experiment folder.
    pub fn stitched(&self) -> Vec<PathBuf> {
        sorted_glob(&pattern(&self.path, &[STITCHED], None))
    }

    /// The `{ScanningTemplate}*.xml` file of the experiment.
    pub fn scanning_template(&self) -> Option<PathBuf> {
        sorted_glob(&pattern(
            &self.path,
            &[ADDITIONAL_DATA, SCANNING_TEMPLATE],
            Some("*.xml"),
        ))
        .into_iter()
        .next()
    }

    // -------------------------------------------------------------------------
    // Coordinate lookups
    // -------------------------------------------------------------------------

    /// First image of field (`field_x`, `field_y`) in well (`well_x`, `well_y`).
    pub fn image(&self, well_x: u32, well_y: u32, field_x: u32, field_y: u32) -> Option<PathBuf> {
        self.images().into_iter().find(|image| {
            let attrs = attributes(&image.to_string_lossy());
            attrs.u() == Some(well_x)
                && attrs.v() == Some(well_y)
                && attrs.x() == Some(field_x)
                && attrs.y() == Some(field_y)
        })
    }

    /// All images of well (`well_x`, `well_y`).
    pub fn well_images(&self, well_x: u32, well_y: u32) -> Vec<PathBuf> {
        self.images()
            .into_iter()
            .filter(|image| {
                let attrs = attributes(&image.to_string_lossy());
                attrs.u() == Some(well_x) && attrs.v() == Some(well_y)
            })
            .collect()
    }

    /// Distinct field X indices of a well, ascending.
    pub fn columns(&self, well_x: u32, well_y: u32) -> Vec<u32> {
        self.distinct_in_well(well_x, well_y, 'X')
    }

    /// Distinct field Y indices of a well, ascending.
    pub fn rows(&self, well_x: u32, well_y: u32) -> Vec<u32> {
        self.distinct_in_well(well_x, well_y, 'Y')
    }

    fn distinct_in_well(&self, well_x: u32, well_y: u32, code: char) -> Vec<u32> {
        self.well_images(well_x, well_y)
            .iter()
            .filter_map(|image| attributes(&image.to_string_lossy()).value(code))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// OME-XML metadata file of a field. Parsing it is left to the caller.
    pub fn field_metadata(
        &self,
        well_x: u32,
        well_y: u32,
        field_x: u32,
        field_y: u32,
    ) -> Option<PathBuf> {
        let field = self.fields().into_iter().find(|field| {
            let attrs = attributes(&field.to_string_lossy());
            attrs.u() == Some(well_x)
                && attrs.v() == Some(well_y)
                && attrs.x() == Some(field_x)
                && attrs.y() == Some(field_y)
        })?;

        sorted_glob(&pattern(&field, &[METADATA, IMAGE], Some("*.ome.xml")))
            .into_iter()
            .next()
    }

    /// Registered tile positions of a well.
    ///
    /// Returns `Ok(None)` when no well or more than one well matches.
    pub fn stitch_coordinates(
        &self,
        well_x: u32,
        well_y: u32,
    ) -> Result<Option<StitchCoordinates>, ExperimentError> {
        let wells: Vec<PathBuf> = self
            .wells()
            .into_iter()
            .filter(|well| {
                let attrs = attributes(&well.to_string_lossy());
                attrs.u() == Some(well_x) && attrs.v() == Some(well_y)
            })
            .collect();

        match wells.as_slice() {
            [well] => StitchCoordinates::read(&well.join(TILE_CONFIGURATION)).map(Some),
            _ => {
                warn!(
                    "stitch_coordinates({}, {}): {} wells match, expected one",
                    well_x,
                    well_y,
                    wells.len()
                );
                Ok(None)
            }
        }
    }

    // -------------------------------------------------------------------------
    // Whole-experiment operations
    // -------------------------------------------------------------------------

    /// Compress every TIFF image of the experiment.
    pub fn compress(&self, options: &CompressOptions, pool: &WorkerPool) -> Vec<Option<PathBuf>> {
        let tifs = self.images_with_extension("tif");
        debug!("Compressing {} images of {}", tifs.len(), self);
        codec::compress(tifs, options, pool)
    }

    /// Decompress every PNG image of the experiment.
    pub fn decompress(
        &self,
        options: &DecompressOptions,
        pool: &WorkerPool,
    ) -> Vec<Option<PathBuf>> {
        let pngs = self.images_with_extension("png");
        debug!("Decompressing {} images of {}", pngs.len(), self);
        codec::decompress(pngs, options, pool)
    }

    fn images_with_extension(&self, extension: &str) -> Vec<PathBuf> {
        self.images()
            .into_iter()
            .filter(|p| p.extension().is_some_and(|e| e == extension))
            .collect()
    }

    /// Stitch every well into `folder` (default: the experiment folder).
    ///
    /// Returns outputs that existed before plus those produced now. A well
    /// that cannot be planned is logged and skipped.
    pub fn stitch<R: MacroRunner>(
        &self,
        folder: Option<&Path>,
        runner: &R,
        pool: &WorkerPool,
    ) -> Vec<PathBuf> {
        let folder = folder.unwrap_or(self.path.as_path());
        debug!("Stitching {} to {}", self, folder.display());

        let mut outputs = Vec::new();
        let mut jobs = Vec::new();
        for well in self.wells() {
            match stitch_macro(&well, folder) {
                Ok(plan) => {
                    outputs.extend(plan.existing);
                    jobs.extend(plan.jobs);
                }
                Err(e) => warn!("Skipping well {}: {}", well.display(), e),
            }
        }
        if jobs.is_empty() {
            return outputs;
        }

        let produced = pool.map(chop(&jobs, pool.size()), |chunk| match runner.run(&chunk) {
            Ok(files) => files,
            Err(e) => {
                warn!("Stitching {} jobs failed: {}", chunk.len(), e);
                Vec::new()
            }
        });
        outputs.extend(produced.into_iter().flatten());
        outputs
    }
}

impl fmt::Display for Experiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Experiment({})", self.path.display())
    }
}

impl fmt::Debug for Experiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

// =============================================================================
// Tests
// =============================================================================
