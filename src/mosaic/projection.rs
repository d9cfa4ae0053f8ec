//! Z-projection of tile stacks.

use clap::ValueEnum;
use ndarray::{Array3, ArrayView3, Axis};

use crate::stack::Voxel;

/// Reduction collapsing a stack along Z.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ZProjection {
    /// Brightest value along Z
    #[default]
    Max,
    /// Darkest value along Z
    Min,
    /// Mean along Z, rounded for integer element types
    Mean,
}

impl ZProjection {
    /// Collapse a `(z, y, x)` stack into a `(1, y, x)` stack.
    ///
    /// An empty stack projects to an empty plane.
    pub fn project<T: Voxel>(self, stack: ArrayView3<'_, T>) -> Array3<T> {
        let (depth, height, width) = stack.dim();
        if depth == 0 {
            return Array3::default((1, height, width));
        }

        let plane = stack.map_axis(Axis(0), |column| match self {
            ZProjection::Max => column
                .iter()
                .copied()
                .fold(column[0], |acc, v| if v > acc { v } else { acc }),
            ZProjection::Min => column
                .iter()
                .copied()
                .fold(column[0], |acc, v| if v < acc { v } else { acc }),
            ZProjection::Mean => {
                let mean = column.iter().map(|v| v.to_f64()).sum::<f64>() / depth as f64;
                if T::INTEGER {
                    T::from_f64(mean.round())
                } else {
                    T::from_f64(mean)
                }
            }
        });

        plane.insert_axis(Axis(0))
    }
}
