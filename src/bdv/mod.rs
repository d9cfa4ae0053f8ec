//! BigDataViewer N5 dataset writer.
//!
//! A dataset is a pair of an N5 container holding the pixel data of every
//! view at several resolutions and a SpimData XML file describing the views
//! and their placement:
//!
//! ```text
//! <out>/
//! ├── dataset.xml                 view setups, registrations, loader
//! └── dataset.n5/
//!     ├── attributes.json         {"n5": "4.0.0"}
//!     └── setup{id}/
//!         ├── attributes.json     downsamplingFactors, dataType
//!         └── timepoint{t}/
//!             ├── attributes.json multiScale, resolution
//!             ├── s0/{x}/{y}/{z}  full resolution blocks
//!             ├── s1/...
//!             └── sN/...
//! ```
//!
//! The setup id of a view is `tile + ntiles * (illumination + nilluminations * channel)`.

pub mod n5;
pub mod pyramid;
pub mod transform;
pub mod writer;
pub mod xml;

pub use n5::{Compression, DatasetAttributes};
pub use pyramid::{downsample, ResolutionLevel, ResolutionSchedule};
pub use transform::AffineTransform;
pub use writer::{BdvLayout, BdvWriter, ViewDescription, DATASET_BASENAME};
pub use xml::{
    AttributeNames, NamedTransform, SpimDataDescriptor, ViewRegistrationEntry, ViewSetupEntry,
};
