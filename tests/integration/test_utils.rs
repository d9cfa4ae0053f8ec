//! Test utilities for integration tests.
//!
//! This module builds synthetic ultramicroscope acquisitions (16-bit TIFF
//! slices plus a `tiles.txt` stage log) in temporary folders, and reads back
//! the N5 blocks and attributes the converter writes.

use flate2::read::GzDecoder;
use image::{ImageBuffer, Luma};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use um2bdv::PatternSet;

/// Z pattern used by the synthetic filenames (`..._Z003_...`).
pub const TEST_Z_PATTERN: &str = r"_Z(\d+)";

// =============================================================================
// Acquisition builder
// =============================================================================

/// A synthetic acquisition folder.
pub struct Acquisition {
    dir: TempDir,
    width: u32,
    height: u32,
    entries: Vec<(String, [f64; 3])>,
}

impl Acquisition {
    /// Create an empty acquisition with slices of `width` x `height` pixels.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            width,
            height,
            entries: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write one slice whose pixel at `(x, y)` is `base + y * width + x`.
    ///
    /// The slice is also recorded in the stage log.
    pub fn add_slice(&mut self, name: &str, base: u16, stage: [f64; 3]) -> PathBuf {
        let path = self.write_image(name, base);
        self.entries.push((name.to_string(), stage));
        path
    }

    /// Write one slice that is not listed in the stage log.
    pub fn add_unlisted_slice(&self, name: &str, base: u16) -> PathBuf {
        self.write_image(name, base)
    }

    /// Write a Z-stack `img_Z001_<suffix>` .. `img_Z<n>_<suffix>`.
    ///
    /// Slice `z` has base value `base + z * 100`.
    pub fn add_stack(&mut self, prefix: &str, suffix: &str, depth: usize, base: u16, stage: [f64; 3]) {
        for z in 1..=depth {
            let name = format!("{}_Z{:03}_{}", prefix, z, suffix);
            self.add_slice(&name, base + (z as u16) * 100, stage);
        }
    }

    /// Write a file with arbitrary bytes, listed in the stage log.
    pub fn add_raw_file(&mut self, name: &str, bytes: &[u8], stage: [f64; 3]) {
        fs::write(self.path().join(name), bytes).unwrap();
        self.entries.push((name.to_string(), stage));
    }

    /// Write `tiles.txt` listing every recorded slice.
    pub fn write_stage_log(&self) {
        let mut text = String::from("filename;unknown;stagexyz\n");
        for (name, [x, y, z]) in &self.entries {
            text.push_str(&format!("{}; 0; ({}, {}, {})\n", name, x, y, z));
        }
        fs::write(self.path().join("tiles.txt"), text).unwrap();
    }

    fn write_image(&self, name: &str, base: u16) -> PathBuf {
        let path = self.path().join(name);
        let width = self.width;
        let img: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_fn(self.width, self.height, |x, y| {
                Luma([base + (y * width + x) as u16])
            });
        img.save(&path).unwrap();
        path
    }
}

/// Patterns matching the synthetic filenames.
pub fn test_patterns() -> PatternSet {
    PatternSet::new(
        r".*tif",
        TEST_Z_PATTERN,
        r"channel(\d+)",
        r"_Ill([0-9a-zA-Z]+)",
    )
    .unwrap()
}

// =============================================================================
// Output readers
// =============================================================================

/// Read an `attributes.json` file.
pub fn read_attributes(dir: &Path) -> serde_json::Value {
    let text = fs::read_to_string(dir.join("attributes.json")).unwrap();
    serde_json::from_str(&text).unwrap()
}

/// Decode a gzip-compressed uint16 N5 block into its `(x, y, z)` size and
/// its elements (x fastest).
pub fn read_u16_block(path: &Path) -> ([u32; 3], Vec<u16>) {
    let bytes = fs::read(path).unwrap();
    assert_eq!(u16::from_be_bytes([bytes[0], bytes[1]]), 0, "block mode");
    assert_eq!(u16::from_be_bytes([bytes[2], bytes[3]]), 3, "block ndim");

    let mut size = [0u32; 3];
    for (axis, value) in size.iter_mut().enumerate() {
        let start = 4 + axis * 4;
        *value = u32::from_be_bytes(bytes[start..start + 4].try_into().unwrap());
    }

    let mut raw = Vec::new();
    GzDecoder::new(&bytes[16..]).read_to_end(&mut raw).unwrap();
    let values = raw
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();

    (size, values)
}

/// Path of the level `level` dataset of a setup at timepoint 0.
pub fn level_dir(dataset: &Path, setup: usize, level: usize) -> PathBuf {
    dataset
        .join("dataset.n5")
        .join(format!("setup{}", setup))
        .join("timepoint0")
        .join(format!("s{}", level))
}

/// Number of `<ViewSetup>` entries in a descriptor.
pub fn count_view_setups(xml: &str) -> usize {
    xml.matches("<ViewSetup>").count()
}
