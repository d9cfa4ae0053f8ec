use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading the stage position log (`tiles.txt`).
#[derive(Debug, Error)]
pub enum StageTableError {
    /// The log file does not exist; stage positions are unknowable
    #[error(
        "stage position log not found at {0}; it should have been written by the \
         microscope software and contains the stage positions"
    )]
    NotFound(PathBuf),

    /// The log file exists but could not be read
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A data line does not have the expected `filename; unknown; (x, y, z)` shape
    #[error("malformed stage log line {line}: {message}")]
    Malformed { line: usize, message: String },
}

/// Errors raised while scanning a folder for image files.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The input folder is missing or is not a directory
    #[error("input folder not found: {0}")]
    FolderNotFound(PathBuf),

    /// A naming pattern is not a valid regular expression
    #[error("invalid pattern for {field}: {source}")]
    InvalidPattern {
        field: String,
        #[source]
        source: regex::Error,
    },

    /// A naming pattern uses look-around, which the regex engine lacks
    #[error(
        "pattern for {field} uses look-around ({pattern}), which is not supported; \
         put the value in a capture group instead, e.g. `_C(\\d+)` rather than `(?<=_C)\\d+`"
    )]
    LookAround { field: String, pattern: String },

    /// Listing the folder failed
    #[error("I/O error listing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while building the mosaic index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// No file has both a stage position and an integer Z value
    #[error(
        "no tiles found: {files} file(s) matched the whitelist and {joined} had a \
         stage position, but none had an integer Z value"
    )]
    Empty { files: usize, joined: usize },
}

/// Errors raised while loading a Z-stack from disk.
#[derive(Debug, Error)]
pub enum LoadError {
    /// No slice paths were given
    #[error("cannot load an empty stack")]
    EmptyStack,

    /// A slice could not be opened or decoded
    #[error("failed to read {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// A slice has different dimensions than the first slice
    #[error(
        "slice {path} is {actual:?} (height, width) but the stack is {expected:?}"
    )]
    InconsistentDimensions {
        path: PathBuf,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// Decoded pixel data does not fit the reported image size
    #[error("invalid slice shape: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// The worker pool could not be created
    #[error("failed to build loader thread pool: {0}")]
    ThreadPool(String),
}

/// Errors raised by the pyramidal container writer.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// The dataset already exists and overwriting was not requested
    #[error("dataset already exists at {0} (use --overwrite to replace it)")]
    AlreadyExists(PathBuf),

    /// A view index is outside the axis sizes the container was created with
    #[error("{axis} index {index} out of range (container has {count})")]
    IndexOutOfRange {
        axis: &'static str,
        index: usize,
        count: usize,
    },

    /// The same view (setup, timepoint) was appended twice
    #[error("view setup {setup} at timepoint {timepoint} was already written")]
    DuplicateView { setup: usize, timepoint: usize },

    /// A descriptor commit was requested before the descriptor was staged
    #[error("descriptor {0} was committed before being staged")]
    NotStaged(PathBuf),

    /// A stack has a zero-sized axis
    #[error("cannot write an empty stack of shape {0:?}")]
    EmptyStack((usize, usize, usize)),

    /// Serializing N5 attributes failed
    #[error("failed to serialize attributes: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ContainerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ContainerError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Top-level error for a conversion run.
#[derive(Debug, Error)]
pub enum MosaicError {
    #[error(transparent)]
    Stage(#[from] StageTableError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Container(#[from] ContainerError),

    /// Writing was requested for an index without any tile group
    #[error("mosaic index is empty, nothing can be written")]
    EmptyIndex,

    /// A tile group whose channel or illumination is not in the index
    #[error("tile stack {stack_key} has no channel/illumination index")]
    UnindexedGroup { stack_key: String },

    /// Creating an output folder failed
    #[error("failed to create output folder {path}: {source}")]
    OutputFolder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
