//! Acquisition metadata: stage positions and filename-encoded fields.
//!
//! ```text
//! ┌──────────────────────┐    ┌──────────────────────┐
//! │  acquisition folder  │    │      tiles.txt       │
//! └──────────┬───────────┘    └──────────┬───────────┘
//!            ▼                           ▼
//! ┌──────────────────────┐    ┌──────────────────────┐
//! │     FileMetadata     │    │  StagePositionTable  │
//! │ (whitelist + fields) │    │ (filename -> x,y,z)  │
//! └──────────┬───────────┘    └──────────┬───────────┘
//!            └────────────┬──────────────┘
//!                         ▼
//!                  mosaic::MosaicIndex
//! ```

mod extract;
mod stage;

pub use extract::{
    FieldPattern, FieldValues, FileMetadata, FileRecord, PatternSet, DEFAULT_CHANNEL_PATTERN,
    DEFAULT_ILLUMINATION_PATTERN, DEFAULT_WHITELIST_PATTERN, DEFAULT_Z_PATTERN,
};
pub use stage::{parse_stage_vector, StagePosition, StagePositionTable, STAGE_LOG_FILENAME};
