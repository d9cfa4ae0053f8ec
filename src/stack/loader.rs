use std::path::Path;

use image::DynamicImage;
use ndarray::{s, Array2, Array3};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use crate::error::LoadError;

use super::voxel::Voxel;

// =============================================================================
// StackLoader
// =============================================================================

/// Loads ordered 2D slices into a 3D `(z, y, x)` array.
///
/// Slices are decoded on a bounded worker pool. Completion order does not
/// matter: the result always follows the order of the input paths, which must
/// already be Z-ascending. The loader does not re-sort.
pub struct StackLoader {
    pool: ThreadPool,
}

impl StackLoader {
    /// Create a loader with `threads` workers (rayon's default when `None`).
    pub fn new(threads: Option<usize>) -> Result<Self, LoadError> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("stack-loader-{}", i));
        if let Some(threads) = threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder
            .build()
            .map_err(|e| LoadError::ThreadPool(e.to_string()))?;
        Ok(Self { pool })
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Load `paths` as one stack with element type `T`.
    ///
    /// # Errors
    ///
    /// Fails without returning a partial stack if the list is empty, any slice
    /// cannot be decoded, or the slices do not all have the same size.
    pub fn load<T, P>(&self, paths: &[P]) -> Result<Array3<T>, LoadError>
    where
        T: Voxel,
        P: AsRef<Path> + Sync,
    {
        if paths.is_empty() {
            return Err(LoadError::EmptyStack);
        }

        // Indexed parallel collect keeps input order
        let slices: Vec<Array2<T>> = self.pool.install(|| {
            paths
                .par_iter()
                .map(|path| read_slice::<T>(path.as_ref()))
                .collect::<Result<Vec<_>, LoadError>>()
        })?;

        let expected = slices[0].dim();
        for (slice, path) in slices.iter().zip(paths) {
            if slice.dim() != expected {
                return Err(LoadError::InconsistentDimensions {
                    path: path.as_ref().to_path_buf(),
                    expected,
                    actual: slice.dim(),
                });
            }
        }

        Ok(build_stack(&slices))
    }
}

fn build_stack<T: Voxel>(slices: &[Array2<T>]) -> Array3<T> {
    let (height, width) = slices[0].dim();
    let mut stack = Array3::<T>::from_elem((slices.len(), height, width), T::default());

    for (z, slice) in slices.iter().enumerate() {
        stack.slice_mut(s![z, .., ..]).assign(slice);
    }

    stack
}

/// Decode one image file as a 2D `(y, x)` array of `T`.
///
/// Grayscale 8/16-bit data keeps its values; colour images are reduced to
/// luma first. Conversion to `T` happens per slice, before stacking.
pub fn read_slice<T: Voxel>(path: &Path) -> Result<Array2<T>, LoadError> {
    debug!("Reading {}", path.display());

    let image = image::open(path).map_err(|source| LoadError::Decode {
        path: path.to_path_buf(),
        source,
    })?;

    let (width, height) = (image.width() as usize, image.height() as usize);
    let values: Vec<T> = match image {
        DynamicImage::ImageLuma8(buf) => buf.into_raw().into_iter().map(T::from_u8).collect(),
        DynamicImage::ImageLuma16(buf) => buf.into_raw().into_iter().map(T::from_u16).collect(),
        image @ (DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_)) => image
            .to_luma32f()
            .into_raw()
            .into_iter()
            .map(T::from_f32)
            .collect(),
        other => other.to_luma16().into_raw().into_iter().map(T::from_u16).collect(),
    };

    Ok(Array2::from_shape_vec((height, width), values)?)
}

// =============================================================================
// Tests
// =============================================================================
