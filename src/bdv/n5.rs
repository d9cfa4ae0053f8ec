//! Minimal N5 writer.
//!
//! N5 stores a hierarchy of groups and datasets as plain directories. Every
//! node may carry an `attributes.json`; datasets are cut into blocks that are
//! stored as individual files under `<dataset>/<bx>/<by>/<bz>`.
//!
//! # Block layout
//!
//! ```text
//! ┌────────────┬────────────┬───────────────────────┬──────────────────────┐
//! │ mode (u16) │ ndim (u16) │ block size (u32 each) │ compressed elements  │
//! │     0      │     3      │  x, y, z (big-endian) │ big-endian, x fastest│
//! └────────────┴────────────┴───────────────────────┴──────────────────────┘
//! ```
//!
//! Border blocks record their actual (truncated) size in the header.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use ndarray::{s, ArrayView3};
use serde::Serialize;

use crate::error::ContainerError;
use crate::stack::Voxel;

/// N5 specification version written to the root attributes.
pub const N5_VERSION: &str = "4.0.0";

/// Name of the attribute file of every N5 node.
pub const ATTRIBUTES_FILE: &str = "attributes.json";

/// Block header mode for a default (dense, non varlength) block.
const MODE_DEFAULT: u16 = 0;

// =============================================================================
// Compression
// =============================================================================

/// Block compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Compression {
    /// Uncompressed
    Raw,

    /// Gzip stream (`level` -1 means the default level)
    Gzip {
        level: i32,
        #[serde(rename = "useZlib")]
        use_zlib: bool,
    },
}

impl Compression {
    /// Gzip at the default level.
    pub const fn gzip() -> Self {
        Compression::Gzip {
            level: -1,
            use_zlib: false,
        }
    }

    fn encode(&self, raw: Vec<u8>, out: &mut Vec<u8>) -> std::io::Result<()> {
        match *self {
            Compression::Raw => {
                out.extend_from_slice(&raw);
                Ok(())
            }
            Compression::Gzip { level, .. } => {
                let level = if level < 0 {
                    flate2::Compression::default()
                } else {
                    flate2::Compression::new(level.min(9) as u32)
                };
                let mut encoder = GzEncoder::new(out, level);
                encoder.write_all(&raw)?;
                encoder.finish()?;
                Ok(())
            }
        }
    }
}

impl Default for Compression {
    fn default() -> Self {
        Self::gzip()
    }
}

// =============================================================================
// Attributes
// =============================================================================

/// Attributes of an N5 dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetAttributes {
    /// Size `(x, y, z)`
    pub dimensions: [u64; 3],

    /// Block size `(x, y, z)`
    pub block_size: [u32; 3],

    pub data_type: &'static str,

    pub compression: Compression,

    /// Factors relative to full resolution, read by multiscale viewers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downsampling_factors: Option<[u32; 3]>,
}

/// Write `attributes` as the `attributes.json` of the node at `dir`.
pub fn write_attributes(dir: &Path, attributes: &impl Serialize) -> Result<(), ContainerError> {
    fs::create_dir_all(dir).map_err(|e| ContainerError::io(dir, e))?;
    let path = dir.join(ATTRIBUTES_FILE);
    let json = serde_json::to_vec_pretty(attributes)?;
    fs::write(&path, json).map_err(|e| ContainerError::io(path, e))
}

/// Create the root of an N5 container.
pub fn create_root(root: &Path) -> Result<(), ContainerError> {
    write_attributes(root, &serde_json::json!({ "n5": N5_VERSION }))
}

// =============================================================================
// Datasets
// =============================================================================

/// Write a `(z, y, x)` array as an N5 dataset at `dir`.
///
/// Returns the number of blocks written.
pub fn write_dataset<T: Voxel>(
    dir: &Path,
    data: ArrayView3<'_, T>,
    attributes: &DatasetAttributes,
) -> Result<usize, ContainerError> {
    write_attributes(dir, attributes)?;

    let [bx, by, bz] = attributes.block_size.map(|b| b.max(1) as usize);
    let (depth, height, width) = data.dim();
    let grid = [width.div_ceil(bx), height.div_ceil(by), depth.div_ceil(bz)];

    let mut written = 0;
    for gz in 0..grid[2] {
        for gy in 0..grid[1] {
            for gx in 0..grid[0] {
                let block = data.slice(s![
                    gz * bz..((gz + 1) * bz).min(depth),
                    gy * by..((gy + 1) * by).min(height),
                    gx * bx..((gx + 1) * bx).min(width)
                ]);
                let bytes = encode_block(block, attributes.compression)
                    .map_err(|e| ContainerError::io(dir, e))?;

                let path = block_path(dir, [gx, gy, gz]);
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).map_err(|e| ContainerError::io(parent, e))?;
                }
                fs::write(&path, bytes).map_err(|e| ContainerError::io(&path, e))?;
                written += 1;
            }
        }
    }

    Ok(written)
}

/// Path of the block at grid position `(x, y, z)`.
pub fn block_path(dataset: &Path, grid: [usize; 3]) -> PathBuf {
    dataset
        .join(grid[0].to_string())
        .join(grid[1].to_string())
        .join(grid[2].to_string())
}

/// Serialize one block: header followed by the compressed elements.
pub fn encode_block<T: Voxel>(
    block: ArrayView3<'_, T>,
    compression: Compression,
) -> std::io::Result<Vec<u8>> {
    let (depth, height, width) = block.dim();

    let mut out = Vec::with_capacity(16);
    out.extend_from_slice(&MODE_DEFAULT.to_be_bytes());
    out.extend_from_slice(&3u16.to_be_bytes());
    for size in [width, height, depth] {
        out.extend_from_slice(&(size as u32).to_be_bytes());
    }

    // Logical (z, y, x) iteration order puts x fastest
    let mut raw = Vec::with_capacity(block.len() * T::BYTES);
    for value in block.iter() {
        value.write_be(&mut raw);
    }

    compression.encode(raw, &mut out)?;
    Ok(out)
}
