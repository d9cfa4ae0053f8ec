use std::collections::BTreeMap;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use ndarray::ArrayView3;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::ContainerError;
use crate::stack::Voxel;

use super::n5::{self, Compression, DatasetAttributes};
use super::pyramid::{downsample, ResolutionSchedule};
use super::transform::AffineTransform;
use super::xml::{
    AttributeNames, NamedTransform, SpimDataDescriptor, ViewRegistrationEntry, ViewSetupEntry,
};

/// Base name of the container and its descriptor (`dataset.n5`, `dataset.xml`).
pub const DATASET_BASENAME: &str = "dataset";

/// Extension added to a staged descriptor until it is committed.
const STAGED_EXTENSION: &str = "xml.tmp";

// =============================================================================
// Layout
// =============================================================================

/// Sizes of the view axes of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BdvLayout {
    pub nchannels: usize,
    pub nilluminations: usize,
    pub ntiles: usize,
    pub nangles: usize,
}

impl BdvLayout {
    pub fn new(nchannels: usize, nilluminations: usize, ntiles: usize) -> Self {
        Self {
            nchannels,
            nilluminations,
            ntiles,
            nangles: 1,
        }
    }

    /// Setup id of a channel × illumination × tile × angle combination.
    ///
    /// Tiles vary fastest, then illuminations, channels and angles.
    pub fn setup_id(&self, channel: usize, illumination: usize, tile: usize, angle: usize) -> usize {
        tile + self.ntiles
            * (illumination + self.nilluminations * (channel + self.nchannels * angle))
    }

    fn check(&self, view: &ViewDescription) -> Result<(), ContainerError> {
        let axes = [
            ("channel", view.channel, self.nchannels),
            ("illumination", view.illumination, self.nilluminations),
            ("tile", view.tile, self.ntiles),
            ("angle", view.angle, self.nangles),
        ];
        for (axis, index, count) in axes {
            if index >= count {
                return Err(ContainerError::IndexOutOfRange { axis, index, count });
            }
        }
        Ok(())
    }
}

/// Everything that identifies and places one appended view.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewDescription {
    pub time: usize,
    pub channel: usize,
    pub illumination: usize,
    pub tile: usize,
    pub angle: usize,

    /// Placement of the view in the global coordinate system
    pub affine: AffineTransform,

    /// Name recorded for `affine` in the descriptor
    pub affine_name: String,

    /// Physical voxel size `(x, y, z)`
    pub voxel_size: [f64; 3],

    pub voxel_unit: String,

    /// Voxel-to-physical scaling `(x, y, z)`, identity when `[1, 1, 1]`
    pub calibration: [f64; 3],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SetupAttributes {
    downsampling_factors: Vec<[u32; 3]>,
    data_type: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TimepointAttributes {
    resolution: [f64; 3],
    multi_scale: bool,
}

// =============================================================================
// BdvWriter
// =============================================================================

/// Writer for one BigDataViewer N5 dataset.
///
/// The container directory is created by [`BdvWriter::create`], views are
/// appended one at a time, and [`BdvWriter::finish`] writes the XML descriptor.
/// A writer dropped without `finish` (an error path) removes the container it
/// created, so no dataset without a descriptor is left behind.
///
/// Finishing can also be split in two: [`BdvWriter::stage`] writes the
/// descriptor next to its final path and [`BdvWriter::commit`] renames it into
/// place. Callers writing several datasets stage all of them before committing
/// any, so a failed descriptor write drops every container.
pub struct BdvWriter<T: Voxel> {
    n5_root: PathBuf,
    xml_path: PathBuf,
    staged_path: PathBuf,
    staged: bool,
    layout: BdvLayout,
    schedule: ResolutionSchedule,
    compression: Compression,
    setups: BTreeMap<usize, ViewSetupEntry>,
    registrations: BTreeMap<(usize, usize), ViewRegistrationEntry>,
    finished: bool,
    _voxel: PhantomData<T>,
}

impl<T: Voxel> BdvWriter<T> {
    /// Create `<dir>/dataset.n5`; the descriptor will be `<dir>/dataset.xml`.
    ///
    /// # Errors
    ///
    /// Fails with [`ContainerError::AlreadyExists`] if the container or its
    /// descriptor exists and `overwrite` is false.
    pub fn create(
        dir: impl AsRef<Path>,
        layout: BdvLayout,
        schedule: ResolutionSchedule,
        compression: Compression,
        overwrite: bool,
    ) -> Result<Self, ContainerError> {
        let dir = dir.as_ref();
        let n5_root = dir.join(format!("{}.n5", DATASET_BASENAME));
        let xml_path = dir.join(format!("{}.xml", DATASET_BASENAME));
        let staged_path = dir.join(format!("{}.{}", DATASET_BASENAME, STAGED_EXTENSION));

        // A descriptor without its container is still a dataset to protect
        if let Some(existing) = [&n5_root, &xml_path].into_iter().find(|p| p.exists()) {
            if !overwrite {
                return Err(ContainerError::AlreadyExists(existing.clone()));
            }
            info!("Replacing existing dataset {}", existing.display());
        }
        if overwrite {
            if n5_root.exists() {
                fs::remove_dir_all(&n5_root).map_err(|e| ContainerError::io(&n5_root, e))?;
            }
            if xml_path.exists() {
                fs::remove_file(&xml_path).map_err(|e| ContainerError::io(&xml_path, e))?;
            }
        }

        n5::create_root(&n5_root)?;
        debug!(
            "Created {} ({} channel(s), {} illumination(s), {} tile(s))",
            n5_root.display(),
            layout.nchannels,
            layout.nilluminations,
            layout.ntiles
        );

        Ok(Self {
            n5_root,
            xml_path,
            staged_path,
            staged: false,
            layout,
            schedule,
            compression,
            setups: BTreeMap::new(),
            registrations: BTreeMap::new(),
            finished: false,
            _voxel: PhantomData,
        })
    }

    /// Path of the N5 container.
    pub fn n5_root(&self) -> &Path {
        &self.n5_root
    }

    /// Path the descriptor will be written to.
    pub fn xml_path(&self) -> &Path {
        &self.xml_path
    }

    pub fn layout(&self) -> BdvLayout {
        self.layout
    }

    /// Number of views appended so far.
    pub fn view_count(&self) -> usize {
        self.registrations.len()
    }

    /// Append a `(z, y, x)` stack as one view, writing every pyramid level.
    ///
    /// Returns the setup id of the view.
    pub fn append_view(
        &mut self,
        stack: ArrayView3<'_, T>,
        view: &ViewDescription,
    ) -> Result<usize, ContainerError> {
        self.layout.check(view)?;
        let (depth, height, width) = stack.dim();
        if depth == 0 || height == 0 || width == 0 {
            return Err(ContainerError::EmptyStack((depth, height, width)));
        }

        let setup = self
            .layout
            .setup_id(view.channel, view.illumination, view.tile, view.angle);
        if self.registrations.contains_key(&(view.time, setup)) {
            return Err(ContainerError::DuplicateView {
                setup,
                timepoint: view.time,
            });
        }

        let setup_dir = self.n5_root.join(format!("setup{}", setup));
        if !self.setups.contains_key(&setup) {
            n5::write_attributes(
                &setup_dir,
                &SetupAttributes {
                    downsampling_factors: self.schedule.factors(),
                    data_type: T::DATA_TYPE,
                },
            )?;
        }

        let timepoint_dir = setup_dir.join(format!("timepoint{}", view.time));
        n5::write_attributes(
            &timepoint_dir,
            &TimepointAttributes {
                resolution: view.voxel_size,
                multi_scale: true,
            },
        )?;

        let full = [width as u64, height as u64, depth as u64];
        for (level_index, level) in self.schedule.levels().iter().enumerate() {
            let data = downsample(stack, level.factors);
            let attributes = DatasetAttributes {
                dimensions: level.dimensions(full),
                block_size: level.block_size,
                data_type: T::DATA_TYPE,
                compression: self.compression,
                downsampling_factors: Some(level.factors),
            };
            let level_dir = timepoint_dir.join(format!("s{}", level_index));
            let blocks = n5::write_dataset(&level_dir, data.view(), &attributes)?;
            debug!(
                "setup {} level {}: {:?} in {} block(s)",
                setup, level_index, attributes.dimensions, blocks
            );
        }

        self.setups.insert(
            setup,
            ViewSetupEntry {
                id: setup,
                size: full,
                voxel_size: view.voxel_size,
                voxel_unit: view.voxel_unit.clone(),
                channel: view.channel,
                illumination: view.illumination,
                tile: view.tile,
                angle: view.angle,
            },
        );

        let [cx, cy, cz] = view.calibration;
        self.registrations.insert(
            (view.time, setup),
            ViewRegistrationEntry {
                timepoint: view.time,
                setup,
                transforms: vec![
                    NamedTransform {
                        name: view.affine_name.clone(),
                        affine: view.affine,
                    },
                    NamedTransform {
                        name: "calibration".to_string(),
                        affine: AffineTransform::scale(cx, cy, cz),
                    },
                ],
            },
        );

        Ok(setup)
    }

    /// Build the descriptor for the views appended so far.
    pub fn descriptor(&self, ntimes: usize) -> SpimDataDescriptor {
        let names = |n: usize| (0..n).map(|i| i.to_string()).collect::<Vec<_>>();
        SpimDataDescriptor {
            n5_path: format!("{}.n5", DATASET_BASENAME),
            setups: self.setups.values().cloned().collect(),
            registrations: self.registrations.values().cloned().collect(),
            attributes: AttributeNames {
                channels: names(self.layout.nchannels),
                illuminations: names(self.layout.nilluminations),
                tiles: names(self.layout.ntiles),
                angles: names(self.layout.nangles),
            },
            ntimes,
        }
    }

    /// Write the descriptor and close the container.
    ///
    /// Returns the path of the descriptor.
    pub fn finish(self, ntimes: usize) -> Result<PathBuf, ContainerError> {
        self.finish_with(ntimes, |_| {})
    }

    /// Like [`finish`](Self::finish), letting the caller adjust the
    /// descriptor (e.g. attribute names) before it is written.
    pub fn finish_with(
        mut self,
        ntimes: usize,
        adjust: impl FnOnce(&mut SpimDataDescriptor),
    ) -> Result<PathBuf, ContainerError> {
        self.stage(ntimes, adjust)?;
        self.commit()
    }

    /// Write the descriptor to a staging file next to [`xml_path`](Self::xml_path).
    ///
    /// The container stays unfinished: dropping the writer afterwards removes
    /// both the container and the staged descriptor.
    pub fn stage(
        &mut self,
        ntimes: usize,
        adjust: impl FnOnce(&mut SpimDataDescriptor),
    ) -> Result<&Path, ContainerError> {
        let mut descriptor = self.descriptor(ntimes);
        adjust(&mut descriptor);

        self.staged = true;
        fs::write(&self.staged_path, descriptor.to_xml())
            .map_err(|e| ContainerError::io(&self.staged_path, e))?;
        debug!("Staged descriptor {}", self.staged_path.display());
        Ok(&self.staged_path)
    }

    /// Move a staged descriptor into place and close the container.
    ///
    /// Returns the path of the descriptor.
    pub fn commit(mut self) -> Result<PathBuf, ContainerError> {
        if !self.staged {
            return Err(ContainerError::NotStaged(self.xml_path.clone()));
        }
        fs::rename(&self.staged_path, &self.xml_path)
            .map_err(|e| ContainerError::io(&self.xml_path, e))?;
        self.finished = true;

        info!(
            "Wrote {} view(s) to {}",
            self.registrations.len(),
            self.xml_path.display()
        );
        Ok(self.xml_path.clone())
    }
}

impl<T: Voxel> Drop for BdvWriter<T> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!(
            "Dataset {} was not finalized, removing partial container",
            self.n5_root.display()
        );
        if let Err(e) = fs::remove_dir_all(&self.n5_root) {
            warn!("Failed to remove {}: {}", self.n5_root.display(), e);
        }
        if self.staged && self.staged_path.is_file() {
            if let Err(e) = fs::remove_file(&self.staged_path) {
                warn!("Failed to remove {}: {}", self.staged_path.display(), e);
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
