//! Mosaic writer: turns a [`MosaicIndex`] into BigDataViewer datasets.
//!
//! # Output
//!
//! ```text
//! <output_base>/
//! ├── projected/     Z-projected tiles (one plane deep)
//! │   ├── dataset.n5/
//! │   └── dataset.xml
//! └── volume/        full 3D tiles
//!     ├── dataset.n5/
//!     └── dataset.xml
//! ```
//!
//! Both datasets share the same tile, channel and illumination indices, so a
//! registration computed on the projections can be transferred to the volumes.
//!
//! # Stage coordinates
//!
//! Stage positions are logged in meters while the voxel size is given in
//! micrometers per voxel. A stage position becomes a translation in voxel
//! units as `x * 1e6 / xyspacing * direction_x` (likewise for y); the stage Z
//! is not used.

use std::fs;
use std::path::{Path, PathBuf};

use ndarray::Array3;
use tracing::{debug, info};

use crate::bdv::{
    AffineTransform, BdvLayout, BdvWriter, Compression, ResolutionSchedule, ViewDescription,
};
use crate::error::MosaicError;
use crate::metadata::StagePosition;
use crate::stack::{PixelType, StackLoader, Voxel};

use super::index::{MosaicIndex, TileGroup};
use super::projection::ZProjection;

/// Meters to micrometers.
const METERS_TO_MICRONS: f64 = 1e6;

/// Physical unit of the recorded voxel sizes.
pub const VOXEL_UNIT: &str = "um";

// =============================================================================
// PyramidTarget
// =============================================================================

/// One of the two datasets a conversion can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PyramidTarget {
    /// Z-projected tiles, one plane deep
    Projected,
    /// Full 3D tiles
    Volume,
}

impl PyramidTarget {
    /// Subfolder of the output base holding this dataset.
    pub fn subfolder(self) -> &'static str {
        match self {
            PyramidTarget::Projected => "projected",
            PyramidTarget::Volume => "volume",
        }
    }

    pub fn schedule(self) -> ResolutionSchedule {
        match self {
            PyramidTarget::Projected => ResolutionSchedule::projected(),
            PyramidTarget::Volume => ResolutionSchedule::volume(),
        }
    }

    /// Name recorded for the stage translation of `tile`.
    pub fn transform_name(self, tile: usize) -> String {
        match self {
            PyramidTarget::Projected => format!("proj. tile {} translation", tile),
            PyramidTarget::Volume => format!("tile {} translation", tile),
        }
    }

    /// Voxel size and calibration `(x, y, z)` for the given spacings.
    ///
    /// Projections are two-dimensional, so their Z voxel size repeats the XY
    /// spacing and no calibration is applied.
    fn voxel_geometry(self, xyspacing: f64, zspacing: f64) -> ([f64; 3], [f64; 3]) {
        match self {
            PyramidTarget::Projected => ([xyspacing; 3], [1.0; 3]),
            PyramidTarget::Volume => (
                [xyspacing, xyspacing, zspacing],
                [1.0, 1.0, zspacing / xyspacing],
            ),
        }
    }
}

// =============================================================================
// Options
// =============================================================================

/// Parameters of a conversion run.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOptions {
    /// Folder receiving the `projected/` and `volume/` subfolders
    pub output_base: PathBuf,

    /// Write the Z-projected dataset
    pub projected: bool,

    /// Write the full volume dataset
    pub volume: bool,

    /// Pixel spacing in X and Y, micrometers per voxel
    pub xyspacing: f64,

    /// Slice spacing in Z, micrometers per voxel
    pub zspacing: f64,

    /// Sign applied to the stage X coordinate (1 or -1)
    pub direction_x: f64,

    /// Sign applied to the stage Y coordinate (1 or -1)
    pub direction_y: f64,

    /// Reduction used for the projected dataset
    pub projection: ZProjection,

    /// Replace existing datasets
    pub overwrite: bool,

    /// Element type stored in the datasets
    pub pixel_type: PixelType,

    /// Worker threads for stack loading (rayon default when `None`)
    pub threads: Option<usize>,

    pub compression: Compression,
}

impl WriteOptions {
    /// Options writing both datasets below `output_base` with unit spacing.
    pub fn new(output_base: impl Into<PathBuf>) -> Self {
        Self {
            output_base: output_base.into(),
            projected: true,
            volume: true,
            xyspacing: 1.0,
            zspacing: 1.0,
            direction_x: 1.0,
            direction_y: -1.0,
            projection: ZProjection::default(),
            overwrite: false,
            pixel_type: PixelType::default(),
            threads: None,
            compression: Compression::default(),
        }
    }

    /// The datasets that were requested, projected first.
    pub fn targets(&self) -> Vec<PyramidTarget> {
        let mut targets = Vec::with_capacity(2);
        if self.projected {
            targets.push(PyramidTarget::Projected);
        }
        if self.volume {
            targets.push(PyramidTarget::Volume);
        }
        targets
    }

    /// Folder of the dataset for `target`.
    pub fn target_dir(&self, target: PyramidTarget) -> PathBuf {
        self.output_base.join(target.subfolder())
    }
}

/// Translation placing a tile at its stage position, in voxel units.
pub fn stage_affine(
    position: StagePosition,
    xyspacing: f64,
    direction_x: f64,
    direction_y: f64,
) -> AffineTransform {
    let tx = position[0] * METERS_TO_MICRONS / xyspacing * direction_x;
    let ty = position[1] * METERS_TO_MICRONS / xyspacing * direction_y;
    AffineTransform::translation(tx, ty, 0.0)
}

// =============================================================================
// Outcome
// =============================================================================

/// What a completed run wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteSummary {
    pub tiles: usize,
    pub channels: usize,
    pub illuminations: usize,

    /// Descriptor of the projected dataset, if written
    pub projected: Option<PathBuf>,

    /// Descriptor of the volume dataset, if written
    pub volume: Option<PathBuf>,
}

/// Result of [`MosaicWriter::write`].
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// Neither dataset was requested; nothing was touched
    NothingToDo,

    Written(WriteSummary),
}

// =============================================================================
// MosaicWriter
// =============================================================================

/// Writes the tiles of an index into the requested datasets.
pub struct MosaicWriter<'a> {
    index: &'a MosaicIndex,
    options: WriteOptions,
}

impl<'a> MosaicWriter<'a> {
    pub fn new(index: &'a MosaicIndex, options: WriteOptions) -> Self {
        Self { index, options }
    }

    pub fn options(&self) -> &WriteOptions {
        &self.options
    }

    /// Write all tiles with the configured element type.
    ///
    /// # Errors
    ///
    /// Fails before creating any container if the index is empty. Any load or
    /// write failure aborts the run; datasets that were being written are
    /// removed, including one whose descriptor was already written when the
    /// other descriptor fails.
    pub fn write(&self) -> Result<WriteOutcome, MosaicError> {
        match self.options.pixel_type {
            PixelType::U8 => self.write_as::<u8>(),
            PixelType::U16 => self.write_as::<u16>(),
            PixelType::I16 => self.write_as::<i16>(),
            PixelType::F32 => self.write_as::<f32>(),
        }
    }

    /// Write all tiles with element type `T`, ignoring `pixel_type`.
    pub fn write_as<T: Voxel>(&self) -> Result<WriteOutcome, MosaicError> {
        let targets = self.options.targets();
        if targets.is_empty() {
            info!("Neither projected nor volume output selected, nothing to do");
            return Ok(WriteOutcome::NothingToDo);
        }
        if self.index.is_empty() {
            return Err(MosaicError::EmptyIndex);
        }

        let groups = self.index.groups();
        let layout = BdvLayout::new(
            self.index.channels().len(),
            self.index.illuminations().len(),
            groups.len(),
        );
        info!(
            "Processing {} tile(s), xy spacing {} um, z spacing {} um",
            groups.len(),
            self.options.xyspacing,
            self.options.zspacing
        );

        let loader = StackLoader::new(self.options.threads)?;
        let mut writers = Vec::with_capacity(targets.len());
        for target in targets {
            writers.push((target, self.open::<T>(target, layout)?));
        }

        for group in groups {
            info!("Processing tile {} out of {}", group.tile + 1, groups.len());
            let stack: Array3<T> = loader.load(&group.paths())?;
            debug!(
                "Loaded stack {} with shape {:?}",
                group.stack_key,
                stack.dim()
            );

            for (target, writer) in writers.iter_mut() {
                let view = self.view_description(*target, group)?;
                match target {
                    PyramidTarget::Volume => {
                        writer.append_view(stack.view(), &view)?;
                    }
                    PyramidTarget::Projected => {
                        let plane = self.options.projection.project(stack.view());
                        writer.append_view(plane.view(), &view)?;
                    }
                }
            }
        }

        let channel_names = self.index.channels().labels();
        let illumination_names = self.index.illuminations().labels();
        let mut summary = WriteSummary {
            tiles: groups.len(),
            channels: layout.nchannels,
            illuminations: layout.nilluminations,
            projected: None,
            volume: None,
        };
        // Every descriptor is staged before any is committed; a failure here
        // drops all writers and with them every container
        for (_, writer) in writers.iter_mut() {
            writer.stage(1, |descriptor| {
                descriptor.attributes.channels = channel_names.clone();
                descriptor.attributes.illuminations = illumination_names.clone();
            })?;
        }
        for (target, writer) in writers {
            let xml = writer.commit()?;
            match target {
                PyramidTarget::Projected => summary.projected = Some(xml),
                PyramidTarget::Volume => summary.volume = Some(xml),
            }
        }

        Ok(WriteOutcome::Written(summary))
    }

    fn open<T: Voxel>(
        &self,
        target: PyramidTarget,
        layout: BdvLayout,
    ) -> Result<BdvWriter<T>, MosaicError> {
        let dir = self.options.target_dir(target);
        create_output_folder(&dir)?;
        let writer = BdvWriter::create(
            &dir,
            layout,
            target.schedule(),
            self.options.compression,
            self.options.overwrite,
        )?;
        Ok(writer)
    }

    fn view_description(
        &self,
        target: PyramidTarget,
        group: &TileGroup,
    ) -> Result<ViewDescription, MosaicError> {
        let (channel, illumination) =
            self.index
                .view_indices(group)
                .ok_or_else(|| MosaicError::UnindexedGroup {
                    stack_key: group.stack_key.clone(),
                })?;
        let (voxel_size, calibration) =
            target.voxel_geometry(self.options.xyspacing, self.options.zspacing);
        Ok(ViewDescription {
            time: 0,
            channel,
            illumination,
            tile: group.tile,
            angle: 0,
            affine: stage_affine(
                group.stage_position(),
                self.options.xyspacing,
                self.options.direction_x,
                self.options.direction_y,
            ),
            affine_name: target.transform_name(group.tile),
            voxel_size,
            voxel_unit: VOXEL_UNIT.to_string(),
            calibration,
        })
    }
}

fn create_output_folder(dir: &Path) -> Result<(), MosaicError> {
    fs::create_dir_all(dir).map_err(|source| MosaicError::OutputFolder {
        path: dir.to_path_buf(),
        source,
    })
}

// =============================================================================
// Tests
// =============================================================================
