//! Command-line configuration for the `matrixscan` binary.
//!
//! Every option can also be set through an environment variable with the
//! `MATRIXSCAN_` prefix:
//!
//! - `MATRIXSCAN_WORKERS` - Worker threads (default: available parallelism)
//! - `MATRIXSCAN_FOLDER` - Output folder for compress/decompress/stitch
//! - `MATRIXSCAN_DELETE_ORIGINAL` - Remove TIFFs after compression
//! - `MATRIXSCAN_FORCE` - Recompress even if the PNG exists
//! - `MATRIXSCAN_DELETE_PNG` / `MATRIXSCAN_DELETE_JSON` - Cleanup after decompression
//! - `MATRIXSCAN_FIJI` - Fiji executable used for stitching (default: fiji)
//!
//! # Example
//!
//! ```text
//! matrixscan compress /data/experiment--2024 --delete-original --workers 8
//! matrixscan list /data/experiment--2024 images --well 0,0
//! matrixscan coordinates /data/experiment--2024 --well 1,0
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::codec::{CompressOptions, DecompressOptions};

/// Default Fiji executable name, looked up on `PATH`.
pub const DEFAULT_FIJI: &str = "fiji";

// =============================================================================
// CLI Arguments
// =============================================================================

/// Navigate matrix scan experiments and losslessly compress their images.
#[derive(Parser, Debug, Clone)]
#[command(name = "matrixscan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Compress TIFF images to PNG with a JSON tag sidecar.
    Compress(CompressConfig),

    /// Restore TIFF images from PNG and JSON sidecar.
    Decompress(DecompressConfig),

    /// List slides, wells, fields or images of an experiment.
    List(ListConfig),

    /// Print the registered stitch coordinates of a well.
    Coordinates(CoordinatesConfig),

    /// Stitch every well of an experiment with Fiji.
    Stitch(StitchConfig),
}

// =============================================================================
// Shared Options
// =============================================================================

#[derive(Args, Debug, Clone, Default)]
pub struct WorkerArgs {
    /// Number of worker threads.
    ///
    /// Defaults to the number of available CPU cores.
    #[arg(short, long, env = "MATRIXSCAN_WORKERS")]
    pub workers: Option<usize>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl WorkerArgs {
    fn validate(&self) -> Result<(), String> {
        if self.workers == Some(0) {
            return Err("workers must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Well coordinates given as `U,V`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Well {
    pub x: u32,
    pub y: u32,
}

fn parse_well(text: &str) -> Result<Well, String> {
    let (x, y) = text
        .split_once(',')
        .ok_or_else(|| format!("expected `U,V`, got {:?}", text))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<u32>()
            .map_err(|_| format!("invalid well coordinate {:?}", v))
    };
    Ok(Well {
        x: parse(x)?,
        y: parse(y)?,
    })
}

fn check_paths(paths: &[PathBuf]) -> Result<(), String> {
    if paths.is_empty() {
        return Err("at least one image or experiment folder is required".to_string());
    }
    Ok(())
}

fn check_folder(folder: &Option<PathBuf>) -> Result<(), String> {
    match folder {
        Some(folder) if !folder.is_dir() => Err(format!(
            "output folder {} does not exist",
            folder.display()
        )),
        _ => Ok(()),
    }
}

// =============================================================================
// compress
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct CompressConfig {
    /// TIFF images, or experiment folders to compress entirely.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Store PNG and JSON files here instead of next to each image.
    #[arg(long, env = "MATRIXSCAN_FOLDER")]
    pub folder: Option<PathBuf>,

    /// Delete each TIFF after it has been compressed.
    #[arg(long, default_value_t = false, env = "MATRIXSCAN_DELETE_ORIGINAL")]
    pub delete_original: bool,

    /// Compress even when the PNG already exists.
    #[arg(long, default_value_t = false, env = "MATRIXSCAN_FORCE")]
    pub force: bool,

    #[command(flatten)]
    pub common: WorkerArgs,
}

impl CompressConfig {
    pub fn validate(&self) -> Result<(), String> {
        check_paths(&self.paths)?;
        check_folder(&self.folder)?;
        self.common.validate()
    }

    pub fn options(&self) -> CompressOptions {
        CompressOptions {
            folder: self.folder.clone(),
            delete_original: self.delete_original,
            force: self.force,
        }
    }
}

// =============================================================================
// decompress
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct DecompressConfig {
    /// PNG images, or experiment folders to decompress entirely.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Store TIFF files here instead of next to each PNG.
    #[arg(long, env = "MATRIXSCAN_FOLDER")]
    pub folder: Option<PathBuf>,

    /// Delete each PNG after its TIFF has been written.
    #[arg(long, default_value_t = false, env = "MATRIXSCAN_DELETE_PNG")]
    pub delete_png: bool,

    /// Delete each JSON sidecar after its TIFF has been written.
    #[arg(long, default_value_t = false, env = "MATRIXSCAN_DELETE_JSON")]
    pub delete_json: bool,

    #[command(flatten)]
    pub common: WorkerArgs,
}

impl DecompressConfig {
    pub fn validate(&self) -> Result<(), String> {
        check_paths(&self.paths)?;
        check_folder(&self.folder)?;
        self.common.validate()
    }

    pub fn options(&self) -> DecompressOptions {
        DecompressOptions {
            folder: self.folder.clone(),
            delete_png: self.delete_png,
            delete_json: self.delete_json,
        }
    }
}

// =============================================================================
// list
// =============================================================================

/// Hierarchy level to list.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Slides,
    Wells,
    Fields,
    Images,
    Stitched,
}

#[derive(Args, Debug, Clone)]
pub struct ListConfig {
    /// Experiment folder.
    pub experiment: PathBuf,

    /// What to list.
    #[arg(value_enum, default_value_t = Level::Images)]
    pub level: Level,

    /// Only images of this well, given as `U,V`.
    #[arg(long, value_parser = parse_well)]
    pub well: Option<Well>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ListConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.well.is_some() && self.level != Level::Images {
            return Err("--well only applies when listing images".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// coordinates
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct CoordinatesConfig {
    /// Experiment folder.
    pub experiment: PathBuf,

    /// Well given as `U,V`.
    #[arg(long, value_parser = parse_well, default_value = "0,0")]
    pub well: Well,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

// =============================================================================
// stitch
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct StitchConfig {
    /// Experiment folder.
    pub experiment: PathBuf,

    /// Store stitched images here instead of the experiment folder.
    #[arg(long, env = "MATRIXSCAN_FOLDER")]
    pub folder: Option<PathBuf>,

    /// Fiji executable.
    #[arg(long, default_value = DEFAULT_FIJI, env = "MATRIXSCAN_FIJI")]
    pub fiji: PathBuf,

    #[command(flatten)]
    pub common: WorkerArgs,
}

impl StitchConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.experiment.is_dir() {
            return Err(format!(
                "experiment folder {} does not exist",
                self.experiment.display()
            ));
        }
        check_folder(&self.folder)?;
        self.common.validate()
    }
}

// =============================================================================
// Tests
// =============================================================================
