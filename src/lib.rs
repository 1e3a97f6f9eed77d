//! # matrixscan
//!
//! Access to microscope matrix scan experiments and lossless compression of
//! their images.
//!
//! A matrix scan exports one OME-TIFF per field, channel and z-slice into a
//! `slide--*/chamber--*/field--*` folder hierarchy. Those TIFFs are
//! uncompressed; converting them to PNG typically halves the disk usage. The
//! conversion here is lossless in both pixels and tags: every TIFF tag is
//! kept in a JSON sidecar and written back on decompression.
//!
//! ## Architecture
//!
//! - [`attributes`] - Coordinates (`--U00--V01--X02...`) parsed from paths
//! - [`experiment`] - The folder hierarchy, coordinate lookups, tile positions
//! - [`codec`] - Compression to PNG + JSON and back
//! - [`mod@format`] - TIFF reader/writer and PNG encoding
//! - [`dispatch`] - Worker pool running per-image jobs in parallel
//! - [`stitch`] - Planning and running Fiji stitching per well
//! - [`config`] - CLI types
//!
//! ## Example
//!
//! ```rust,no_run
//! use matrixscan::{compress, CompressOptions, Experiment, WorkerPool};
//!
//! let experiment = Experiment::new("/data/experiment--2024-05-01").unwrap();
//! let pool = WorkerPool::with_default_size().unwrap();
//!
//! // All images of well (0, 0)
//! let images = experiment.well_images(0, 0);
//!
//! // One slot per image: the PNG path, or None if that image failed
//! let pngs = compress(images, &CompressOptions::default(), &pool);
//! println!("{} images compressed", pngs.iter().flatten().count());
//! ```

pub mod attributes;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod experiment;
pub mod format;
pub mod stitch;

// Re-export commonly used types
pub use attributes::{attribute, attribute_as_str, attributes, Attribute, Attributes};
pub use codec::{
    compress, compress_image, decompress, decompress_image, png_path, tif_path, CompressOptions,
    Converted, DecompressOptions, Sidecar,
};
pub use dispatch::{chop, default_pool_size, Batch, WorkerPool};
pub use error::{CodecError, DispatchError, ExperimentError, TiffError};
pub use experiment::{Experiment, StitchCoordinates};
pub use format::tiff::{Ifd, TagValue, TiffFile};
pub use format::{PixelData, Raster};
pub use stitch::{stitch_macro, FijiRunner, MacroRunner, StitchJob, StitchPlan};
