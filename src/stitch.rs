//! Stitching of well fields into one image per channel and z-slice.
//!
//! Every field of a well holds the same set of images (one per channel and
//! z-slice). Stitching a well means, for each (Z, C) pair, handing the
//! ImageJ "Grid/Collection stitching" plugin a file name template such as
//!
//! ```text
//! field--X{xx}--Y{yy}/image--L0000--S00--U00--V00--J20--E00--O00--X{xx}--Y{yy}--T0000--Z00--C01.ome.tif
//! ```
//!
//! together with the grid size and first index. The plugin writes
//! `stitched--U00--V00--C01--Z00.png` and a `TileConfiguration.registered.txt`
//! with the tile positions it settled on.
//!
//! Running the plugin is behind the [`MacroRunner`] trait; [`FijiRunner`]
//! runs a Fiji installation headless.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, warn};

use crate::attributes::{attribute_as_str, attributes, Attributes};
use crate::error::ExperimentError;
use crate::experiment::pattern::{pattern, sorted_glob};

/// Overlap between neighbouring fields, in percent.
pub const DEFAULT_TILE_OVERLAP: u32 = 10;

/// Codes written before the `X`/`Y` placeholders, in file name order.
const LEADING_CODES: [char; 7] = ['L', 'S', 'U', 'V', 'J', 'E', 'O'];

// =============================================================================
// StitchJob
// =============================================================================

/// One stitching run: one channel and z-slice of one well.
#[derive(Debug, Clone, PartialEq)]
pub struct StitchJob {
    /// Well folder the file name template is relative to
    pub well: PathBuf,
    /// File name template with `{xx}` and `{yy}` placeholders
    pub file_names: String,
    /// Number of distinct field columns and rows
    pub grid: (usize, usize),
    /// Smallest field X and Y index
    pub start: (u32, u32),
    pub tile_overlap: u32,
    pub output: PathBuf,
}

impl StitchJob {
    /// ImageJ macro text running the stitching plugin and saving the result.
    pub fn to_macro(&self) -> String {
        format!(
            "run(\"Grid/Collection stitching\", \"type=[Filename defined position] \
             order=[Defined by filename         ] grid_size_x={gx} grid_size_y={gy} \
             tile_overlap={overlap} first_file_index_x={sx} first_file_index_y={sy} \
             directory=[{dir}] file_names=[{names}] \
             output_textfile_name=TileConfiguration.txt fusion_method=[Linear Blending] \
             regression_threshold=0.30 max/avg_displacement_threshold=2.50 \
             absolute_displacement_threshold=3.50 compute_overlap subpixel_accuracy \
             computation_parameters=[Save computation time (but use more RAM)] \
             image_output=[Fuse and display]\");\n\
             saveAs(\"PNG\", \"{output}\");\n\
             close();\n",
            gx = self.grid.0,
            gy = self.grid.1,
            overlap = self.tile_overlap,
            sx = self.start.0,
            sy = self.start.1,
            dir = self.well.display(),
            names = self.file_names,
            output = self.output.display(),
        )
    }
}

// =============================================================================
// StitchPlan
// =============================================================================

/// Stitching work for one well.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StitchPlan {
    /// Outputs that already exist and will not be stitched again
    pub existing: Vec<PathBuf>,
    /// Jobs whose output is missing
    pub jobs: Vec<StitchJob>,
}

impl StitchPlan {
    /// Every output of the well, existing or pending.
    pub fn outputs(&self) -> Vec<PathBuf> {
        let mut all = self.existing.clone();
        all.extend(self.jobs.iter().map(|job| job.output.clone()));
        all
    }
}

/// Plan the stitching of every channel and z-slice of `well`.
///
/// Fields are assumed to form a full rectangle and to hold the same images
/// as the first field.
pub fn stitch_macro(well: &Path, output_folder: &Path) -> Result<StitchPlan, ExperimentError> {
    debug!("Planning stitch of {} to {}", well.display(), output_folder.display());
    let incomplete = |reason: &str| ExperimentError::IncompleteWell {
        path: well.to_path_buf(),
        reason: reason.to_string(),
    };

    let fields = sorted_glob(&pattern(well, &["field"], None));
    let mut xs = Vec::with_capacity(fields.len());
    let mut ys = Vec::with_capacity(fields.len());
    for field in &fields {
        let attrs = attributes(&field.to_string_lossy());
        match (attrs.x(), attrs.y()) {
            (Some(x), Some(y)) => {
                xs.push(x);
                ys.push(y);
            }
            _ => return Err(incomplete("field folder without X/Y coordinates")),
        }
    }
    let (Some(&x_min), Some(&y_min)) = (xs.iter().min(), ys.iter().min()) else {
        return Err(incomplete("no fields"));
    };
    let grid = (
        xs.iter().collect::<BTreeSet<_>>().len(),
        ys.iter().collect::<BTreeSet<_>>().len(),
    );

    let images = sorted_glob(&pattern(&fields[0], &["image"], None));
    let (Some(first), Some(last)) = (images.first(), images.last()) else {
        return Err(incomplete("no images in first field"));
    };
    let attrs = attributes(&first.to_string_lossy());

    let mut channels: Vec<String> = Vec::new();
    let mut slices: Vec<String> = Vec::new();
    for image in &images {
        let path = image.to_string_lossy();
        let (Some(c), Some(z)) = (attribute_as_str(&path, "C"), attribute_as_str(&path, "Z"))
        else {
            return Err(incomplete("image without C/Z coordinates"));
        };
        if !channels.contains(&c) {
            channels.push(c);
        }
        if !slices.contains(&z) {
            slices.push(z);
        }
    }
    debug!("Channels {:?}, z-slices {:?}", channels, slices);

    let extension = match last.extension().and_then(|e| e.to_str()) {
        Some("tif") => ".ome.tif".to_string(),
        Some(other) => format!(".{}", other),
        None => String::new(),
    };

    let mut plan = StitchPlan::default();
    for z in &slices {
        for c in &channels {
            let file_names = file_name_template(&attrs, z, c, &extension);
            let output = output_folder.join(format!(
                "stitched--U{}--V{}--C{}--Z{}.png",
                attrs.raw('U').unwrap_or("00"),
                attrs.raw('V').unwrap_or("00"),
                c,
                z
            ));

            if output.is_file() {
                info!("Stitched image already exists: {}", output.display());
                plan.existing.push(output);
                continue;
            }
            plan.jobs.push(StitchJob {
                well: well.to_path_buf(),
                file_names,
                grid,
                start: (x_min, y_min),
                tile_overlap: DEFAULT_TILE_OVERLAP,
                output,
            });
        }
    }

    Ok(plan)
}

fn file_name_template(attrs: &Attributes, z: &str, c: &str, extension: &str) -> String {
    let mut name = String::from("field--X{xx}--Y{yy}/image");
    for code in LEADING_CODES {
        if let Some(raw) = attrs.raw(code) {
            name.push_str(&format!("--{}{}", code, raw));
        }
    }
    name.push_str("--X{xx}--Y{yy}");
    if let Some(raw) = attrs.raw('T') {
        name.push_str(&format!("--T{}", raw));
    }
    name.push_str(&format!("--Z{}--C{}{}", z, c, extension));
    name
}

// =============================================================================
// Runners
// =============================================================================

/// Executes stitching jobs.
pub trait MacroRunner: Sync {
    /// Run `jobs` and return the outputs that exist afterwards.
    fn run(&self, jobs: &[StitchJob]) -> Result<Vec<PathBuf>, ExperimentError>;
}

/// Runs jobs through a Fiji executable in headless mode.
#[derive(Debug, Clone)]
pub struct FijiRunner {
    executable: PathBuf,
}

impl FijiRunner {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        FijiRunner {
            executable: executable.into(),
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

impl MacroRunner for FijiRunner {
    fn run(&self, jobs: &[StitchJob]) -> Result<Vec<PathBuf>, ExperimentError> {
        if jobs.is_empty() {
            return Ok(Vec::new());
        }

        let mut file = tempfile::Builder::new()
            .prefix("matrixscan-")
            .suffix(".ijm")
            .tempfile()?;
        for job in jobs {
            file.write_all(job.to_macro().as_bytes())?;
        }
        file.flush()?;

        debug!("Running {} stitch jobs with {}", jobs.len(), self.executable.display());
        let output = Command::new(&self.executable)
            .arg("--headless")
            .arg("-macro")
            .arg(file.path())
            .output()
            .map_err(|e| {
                ExperimentError::Runner(format!("{}: {}", self.executable.display(), e))
            })?;

        if !output.status.success() {
            warn!(
                "{} exited with {}: {}",
                self.executable.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(jobs
            .iter()
            .map(|job| job.output.clone())
            .filter(|path| path.is_file())
            .collect())
    }
}

// =============================================================================
// Tests
// =============================================================================
