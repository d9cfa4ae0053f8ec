//! Mosaic assembly: from discovered slices to written datasets.
//!
//! ```text
//!  FileMetadata + StagePositionTable
//!                 │
//!                 ▼
//!            MosaicIndex ──► TileGroup (one Z-stack per tile × channel × illumination)
//!                 │
//!                 ▼
//!            MosaicWriter ──► StackLoader ──► BdvWriter (projected)
//!                                        └──► BdvWriter (volume)
//! ```

mod index;
mod projection;
mod writer;

use std::path::Path;

use crate::error::MosaicError;
use crate::metadata::{FileMetadata, PatternSet, StagePositionTable};

pub use index::{
    AxisIndex, AxisValue, MosaicIndex, MosaicRecord, SkipReason, SkippedFile, TileGroup,
    MISSING_AXIS_LABEL,
};
pub use projection::ZProjection;
pub use writer::{
    stage_affine, MosaicWriter, PyramidTarget, WriteOptions, WriteOutcome, WriteSummary,
    VOXEL_UNIT,
};

/// Read the stage log of `folder`, scan it and build the mosaic index.
///
/// The stage log is read first: without it no stage position is known and
/// the folder is not scanned.
pub fn index_folder(
    folder: impl AsRef<Path>,
    patterns: PatternSet,
) -> Result<MosaicIndex, MosaicError> {
    let folder = folder.as_ref();
    let stages = StagePositionTable::from_folder(folder)?;
    let metadata = FileMetadata::scan(folder, patterns)?;

    let index = MosaicIndex::build(&metadata, &stages)?;
    Ok(index)
}

/// Convert one acquisition folder into the datasets requested by `options`.
///
/// # Errors
///
/// Any configuration, load or write failure aborts the conversion. Datasets
/// that were being written when the failure happened are removed.
pub fn convert_folder(
    folder: impl AsRef<Path>,
    patterns: PatternSet,
    options: WriteOptions,
) -> Result<WriteOutcome, MosaicError> {
    let index = index_folder(folder, patterns)?;
    MosaicWriter::new(&index, options).write()
}
