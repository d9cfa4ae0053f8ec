//! Z-stack loading.
//!
//! The acquisition stores every Z slice of a tile as its own 2D image. This
//! module reads an ordered list of such slices back into one `(z, y, x)`
//! [`ndarray::Array3`], decoding files in parallel with rayon and converting
//! them to a caller-chosen [`Voxel`] element type.

mod loader;
mod voxel;

pub use loader::{read_slice, StackLoader};
pub use voxel::{PixelType, Voxel};
