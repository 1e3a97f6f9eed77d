use std::path::PathBuf;

use thiserror::Error;

/// Reading or writing a TIFF file failed.
#[derive(Debug, Error)]
pub enum TiffError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// First two bytes are neither `II` nor `MM`
    #[error("Not a TIFF file: byte order mark 0x{0:04X}")]
    InvalidMagic(u16),

    #[error("Unknown TIFF version {0} (42 classic, 43 BigTIFF)")]
    InvalidVersion(u16),

    #[error("BigTIFF pointer width is {0}, only 8 is defined")]
    InvalidBigTiffOffsetSize(u16),

    #[error("Truncated header: {actual} bytes, {required} needed")]
    FileTooSmall { required: u64, actual: u64 },

    /// An IFD pointer or entry table lies outside the file
    #[error("IFD at offset {0} is outside the file")]
    InvalidIfdOffset(u64),

    /// A value or strip points past the end of the file
    #[error("{requested} bytes at offset {offset} exceed the file size {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    #[error("{0} tag is missing")]
    MissingTag(&'static str),

    /// Tag present with a type or count the reader cannot use
    #[error("{tag}: {message}")]
    InvalidTagValue { tag: &'static str, message: String },

    /// Pixel data is compressed with a scheme we do not decode
    #[error("Unsupported compression: {0} (only uncompressed strips are supported)")]
    UnsupportedCompression(String),

    /// Pixel layout we cannot convert losslessly
    #[error("Unsupported pixel layout: {0}")]
    UnsupportedLayout(String),

    /// The image does not fit in a classic (32-bit offset) TIFF
    #[error("Image too large for classic TIFF: {0} bytes")]
    TooLarge(u64),
}

/// Errors from a single compress or decompress job.
///
/// Batch entry points never propagate these; they log them and leave an
/// empty slot in the result list.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Source file does not exist
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Source has the wrong extension for the requested direction
    #[error("Aborting {operation}, not a {expected}: {}", .path.display())]
    InvalidInput {
        operation: &'static str,
        expected: &'static str,
        path: PathBuf,
    },

    /// TIFF parsing or writing failed
    #[error("TIFF error: {0}")]
    Tiff(#[from] TiffError),

    /// PNG encoding or decoding failed
    #[error("PNG error: {0}")]
    Image(#[from] image::ImageError),

    /// The raster and its target format disagree
    #[error("Unsupported pixel layout: {0}")]
    UnsupportedPixels(String),

    /// Sidecar could not be serialized or parsed as JSON
    #[error("Sidecar {}: {source}", .path.display())]
    Sidecar {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Sidecar parsed but holds values that are not TIFF tags
    #[error("Invalid sidecar entry {key}: {message}")]
    InvalidSidecar { key: String, message: String },

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from walking an experiment folder
#[derive(Debug, Error)]
pub enum ExperimentError {
    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A hierarchy glob pattern failed to compile
    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// A tile configuration line could not be parsed
    #[error("Invalid tile configuration {} line {line}: {message}", .path.display())]
    TileConfiguration {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// A well folder does not contain the fields/images needed for stitching
    #[error("Cannot stitch {}: {reason}", .path.display())]
    IncompleteWell { path: PathBuf, reason: String },

    /// The stitching tool could not be run or reported failure
    #[error("Stitching tool failed: {0}")]
    Runner(String),
}

/// Errors from building the worker pool
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Pool size must be at least one
    #[error("Worker pool size must be greater than 0")]
    EmptyPool,

    /// rayon refused to build the pool
    #[error("Failed to build worker pool: {0}")]
    Build(#[from] rayon::ThreadPoolBuildError),
}
