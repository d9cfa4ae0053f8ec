//! Resolution schedules and downsampling.
//!
//! A pyramid stores the same view at several resolutions. Each level is
//! described by its downsampling factors relative to full resolution and by
//! the block size its chunks are cut into. Both are given in `(x, y, z)`
//! order, matching the N5 and BigDataViewer conventions, while stacks in
//! memory are `(z, y, x)` arrays.
//!
//! ```text
//! level  factors (x, y, z)   block (x, y, z)
//! s0     1  1  1             64 64 64
//! s1     2  2  1             64 64 64
//! s2     4  4  1             64 64 64
//!  ...
//! ```

use ndarray::{s, Array3, ArrayView3};

use crate::stack::Voxel;

// =============================================================================
// ResolutionLevel
// =============================================================================

/// One level of a resolution schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionLevel {
    /// Downsampling factors relative to full resolution `(x, y, z)`
    pub factors: [u32; 3],

    /// Chunk size `(x, y, z)`
    pub block_size: [u32; 3],
}

impl ResolutionLevel {
    pub const fn new(factors: [u32; 3], block_size: [u32; 3]) -> Self {
        Self {
            factors,
            block_size,
        }
    }

    /// Dimensions `(x, y, z)` of this level for a full resolution size.
    ///
    /// Partial windows at the border count as one voxel, so every dimension
    /// is `ceil(full / factor)`.
    pub fn dimensions(&self, full: [u64; 3]) -> [u64; 3] {
        let mut dims = [0u64; 3];
        for axis in 0..3 {
            dims[axis] = full[axis].div_ceil(u64::from(self.factors[axis].max(1)));
        }
        dims
    }
}

// =============================================================================
// ResolutionSchedule
// =============================================================================

/// The ordered list of levels of one pyramid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionSchedule {
    levels: Vec<ResolutionLevel>,
}

impl ResolutionSchedule {
    /// Create a schedule; level 0 should have factors `(1, 1, 1)`.
    pub fn new(levels: Vec<ResolutionLevel>) -> Self {
        Self { levels }
    }

    /// Schedule for full 3D stacks.
    ///
    /// Light-sheet stacks are typically coarser in Z than in XY, so Z is only
    /// downsampled at the two coarsest levels.
    pub fn volume() -> Self {
        Self::new(vec![
            ResolutionLevel::new([1, 1, 1], [64, 64, 64]),
            ResolutionLevel::new([2, 2, 1], [64, 64, 64]),
            ResolutionLevel::new([4, 4, 1], [64, 64, 64]),
            ResolutionLevel::new([8, 8, 1], [64, 64, 64]),
            ResolutionLevel::new([16, 16, 2], [32, 32, 32]),
            ResolutionLevel::new([32, 32, 4], [16, 16, 16]),
        ])
    }

    /// Schedule for Z-projected stacks (one plane deep).
    pub fn projected() -> Self {
        Self::new(vec![
            ResolutionLevel::new([1, 1, 1], [64, 64, 1]),
            ResolutionLevel::new([2, 2, 1], [64, 64, 1]),
            ResolutionLevel::new([4, 4, 1], [64, 64, 1]),
            ResolutionLevel::new([8, 8, 1], [64, 64, 1]),
            ResolutionLevel::new([16, 16, 1], [64, 64, 1]),
        ])
    }

    pub fn levels(&self) -> &[ResolutionLevel] {
        &self.levels
    }

    /// Downsampling factors of every level, `(x, y, z)`.
    pub fn factors(&self) -> Vec<[u32; 3]> {
        self.levels.iter().map(|l| l.factors).collect()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

// =============================================================================
// Downsampling
// =============================================================================

/// Downsample a `(z, y, x)` stack by `(x, y, z)` factors.
///
/// Each output voxel is the mean of its input window; windows at the far
/// border may be partial. Integer element types are rounded to nearest.
pub fn downsample<T: Voxel>(stack: ArrayView3<'_, T>, factors: [u32; 3]) -> Array3<T> {
    let [fx, fy, fz] = factors.map(|f| f.max(1) as usize);
    if (fx, fy, fz) == (1, 1, 1) {
        return stack.to_owned();
    }

    let (depth, height, width) = stack.dim();
    let out_dim = (depth.div_ceil(fz), height.div_ceil(fy), width.div_ceil(fx));

    Array3::from_shape_fn(out_dim, |(z, y, x)| {
        let window = stack.slice(s![
            z * fz..((z + 1) * fz).min(depth),
            y * fy..((y + 1) * fy).min(height),
            x * fx..((x + 1) * fx).min(width)
        ]);
        let sum: f64 = window.iter().map(|v| v.to_f64()).sum();
        let mean = sum / window.len() as f64;
        if T::INTEGER {
            T::from_f64(mean.round())
        } else {
            T::from_f64(mean)
        }
    })
}
