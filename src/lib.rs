//! # um2bdv
//!
//! Converts ultramicroscope (light-sheet) mosaic acquisitions into
//! multi-resolution BigDataViewer datasets that BigStitcher can open.
//!
//! An acquisition is a folder of 2D slices, one file per tile, channel,
//! illumination side and Z plane, plus a `tiles.txt` log with the stage
//! position of every slice. This crate regroups the slices into per-tile
//! Z-stacks, places each tile at its stage position and writes two datasets:
//! a Z-projected one for a fast first registration and the full volume.
//!
//! ## Architecture
//!
//! - [`metadata`] - stage position log and filename field extraction
//! - [`mosaic`] - slice grouping, tile placement and the conversion driver
//! - [`stack`] - parallel Z-stack loading into `ndarray` arrays
//! - [`bdv`] - N5 container, resolution pyramids and the SpimData XML
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use um2bdv::{convert_folder, PatternSet, WriteOptions, WriteOutcome};
//!
//! fn main() -> Result<(), um2bdv::MosaicError> {
//!     let patterns = PatternSet::new(".*tif", r"_Z(\d+)", r"channel(\d+)", r"_Ill([0-9a-zA-Z]+)")?;
//!
//!     let mut options = WriteOptions::new("/data/stitching");
//!     options.xyspacing = 0.5;
//!     options.zspacing = 2.0;
//!
//!     if let WriteOutcome::Written(summary) = convert_folder("/data/acquisition", patterns, options)? {
//!         println!("{} tiles written", summary.tiles);
//!     }
//!     Ok(())
//! }
//! ```

pub mod bdv;
pub mod config;
pub mod error;
pub mod metadata;
pub mod mosaic;
pub mod stack;

// Re-export commonly used types
pub use bdv::{
    AffineTransform, BdvLayout, BdvWriter, Compression, ResolutionLevel, ResolutionSchedule,
    SpimDataDescriptor, ViewDescription,
};
pub use config::{Cli, Command, ConvertConfig, PatternArgs, ScanConfig};
pub use error::{
    ContainerError, ExtractError, IndexError, LoadError, MosaicError, StageTableError,
};
pub use metadata::{
    FieldPattern, FieldValues, FileMetadata, FileRecord, PatternSet, StagePosition,
    StagePositionTable, STAGE_LOG_FILENAME,
};
pub use mosaic::{
    convert_folder, index_folder, stage_affine, AxisIndex, AxisValue, MosaicIndex, MosaicRecord,
    MosaicWriter, PyramidTarget, SkipReason, SkippedFile, TileGroup, WriteOptions, WriteOutcome,
    WriteSummary, ZProjection,
};
pub use stack::{read_slice, PixelType, StackLoader, Voxel};
