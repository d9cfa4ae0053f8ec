//! Mosaic index: joins file metadata with stage positions and regroups the
//! individual slices into per-tile Z-stacks.
//!
//! # Stack reconstruction
//!
//! Slices of one physical stack differ only in their Z token. Rewriting that
//! token to the smallest Z value found in the folder makes every slice of a
//! stack "pretend" to be its first slice, which yields a key shared by exactly
//! the slices of one tile × channel × illumination combination:
//!
//! ```text
//! img_C003_channel0_IllLeft.tif ─┐
//! img_C001_channel0_IllLeft.tif ─┼─► img_C001_channel0_IllLeft.tif
//! img_C002_channel0_IllLeft.tif ─┘
//! ```
//!
//! Z values are compared as integers, so `9` sorts before `10` regardless of
//! zero padding.
//!
//! # Files without a usable Z value
//!
//! A file whose Z pattern did not match, or matched something that is not an
//! integer, cannot be placed in a stack. Such files are excluded from the index
//! (with a warning) and reported through [`MosaicIndex::skipped`].

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, info, warn};

use crate::error::IndexError;
use crate::metadata::{FileMetadata, FileRecord, StagePosition, StagePositionTable};

/// Label used for a channel or illumination that could not be extracted.
pub const MISSING_AXIS_LABEL: &str = "nan";

// =============================================================================
// Axis values
// =============================================================================

/// Value of a channel or illumination field.
///
/// Values are opaque tokens: they are only ever compared for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AxisValue {
    /// The token extracted from the filename
    Token(String),

    /// The pattern did not match
    Missing,
}

impl AxisValue {
    fn from_field(field: Option<&str>) -> Self {
        match field {
            Some(token) if !token.is_empty() => AxisValue::Token(token.to_string()),
            _ => AxisValue::Missing,
        }
    }
}

impl fmt::Display for AxisValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisValue::Token(token) => f.write_str(token),
            AxisValue::Missing => f.write_str(MISSING_AXIS_LABEL),
        }
    }
}

/// Dense indices for the distinct values of one axis, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AxisIndex {
    values: Vec<AxisValue>,
}

impl AxisIndex {
    /// Assign indices to the distinct values of `values` in first-seen order.
    pub fn from_values<'a>(values: impl IntoIterator<Item = &'a AxisValue>) -> Self {
        let mut unique: Vec<AxisValue> = Vec::new();
        for value in values {
            if !unique.contains(value) {
                unique.push(value.clone());
            }
        }
        Self { values: unique }
    }

    /// Index assigned to `value`.
    pub fn index_of(&self, value: &AxisValue) -> Option<usize> {
        self.values.iter().position(|v| v == value)
    }

    /// Distinct values, ordered by index.
    pub fn values(&self) -> &[AxisValue] {
        &self.values
    }

    /// Labels of the distinct values, ordered by index.
    pub fn labels(&self) -> Vec<String> {
        self.values.iter().map(ToString::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// =============================================================================
// Records and groups
// =============================================================================

/// A discovered file joined with its stage position.
#[derive(Debug, Clone, PartialEq)]
pub struct MosaicRecord {
    /// The file and its raw extracted fields
    pub file: FileRecord,

    /// Stage position in meters
    pub stage_position: StagePosition,

    /// Filename with the Z token rewritten to the minimum Z of the folder
    pub stack_key: String,

    /// Numeric Z slice index
    pub z: i64,

    pub channel: AxisValue,

    pub illumination: AxisValue,
}

/// All slices of one physical tile × channel × illumination stack,
/// ordered by ascending Z.
#[derive(Debug, Clone, PartialEq)]
pub struct TileGroup {
    /// Enumeration index of this group, shared by every output container
    pub tile: usize,

    /// Key shared by all slices of the stack
    pub stack_key: String,

    records: Vec<MosaicRecord>,
}

impl TileGroup {
    /// Slices in Z order.
    pub fn records(&self) -> &[MosaicRecord] {
        &self.records
    }

    /// Slice paths in Z order, ready for the stack loader.
    pub fn paths(&self) -> Vec<&std::path::Path> {
        self.records.iter().map(|r| r.file.path.as_path()).collect()
    }

    /// Z values in stack order.
    pub fn z_values(&self) -> Vec<i64> {
        self.records.iter().map(|r| r.z).collect()
    }

    /// Stage position of the tile (taken from its first slice).
    pub fn stage_position(&self) -> StagePosition {
        self.first().stage_position
    }

    pub fn channel(&self) -> &AxisValue {
        &self.first().channel
    }

    pub fn illumination(&self) -> &AxisValue {
        &self.first().illumination
    }

    /// Number of slices in the stack.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    // Groups are only built from at least one record
    fn first(&self) -> &MosaicRecord {
        &self.records[0]
    }
}

// =============================================================================
// Skipped files
// =============================================================================

/// Why a discovered file is not part of the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The stage log has no entry for the file
    NoStagePosition,

    /// The Z pattern did not match the filename
    MissingZ,

    /// The Z pattern matched a token that is not an integer
    NonNumericZ(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoStagePosition => f.write_str("no stage position"),
            SkipReason::MissingZ => f.write_str("Z pattern did not match"),
            SkipReason::NonNumericZ(token) => write!(f, "Z value '{}' is not an integer", token),
        }
    }
}

/// A discovered file that was excluded from the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub filename: String,
    pub reason: SkipReason,
}

// =============================================================================
// MosaicIndex
// =============================================================================

/// The ordered table driving output generation.
///
/// Built once per run from a [`FileMetadata`] scan and a
/// [`StagePositionTable`], immutable afterwards.
#[derive(Debug, Clone)]
pub struct MosaicIndex {
    records: Vec<MosaicRecord>,
    groups: Vec<TileGroup>,
    channels: AxisIndex,
    illuminations: AxisIndex,
    min_z: i64,
    skipped: Vec<SkippedFile>,
}

impl MosaicIndex {
    /// Join, group and index the discovered files.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Empty`] if no file has both a stage position and
    /// an integer Z value.
    pub fn build(
        metadata: &FileMetadata,
        stages: &StagePositionTable,
    ) -> Result<Self, IndexError> {
        let mut skipped = Vec::new();
        let mut joined = 0usize;
        let mut candidates: Vec<(FileRecord, StagePosition, i64, &str)> = Vec::new();

        for file in metadata.records() {
            let Some(position) = stages.get(&file.filename) else {
                debug!("No stage position for {}, skipping", file.filename);
                skipped.push(SkippedFile {
                    filename: file.filename.clone(),
                    reason: SkipReason::NoStagePosition,
                });
                continue;
            };
            joined += 1;

            match parse_z(file.fields.z.as_deref()) {
                Ok((z, token)) => candidates.push((file.clone(), position, z, token)),
                Err(reason) => {
                    warn!("Excluding {} from the mosaic: {}", file.filename, reason);
                    skipped.push(SkippedFile {
                        filename: file.filename.clone(),
                        reason,
                    });
                }
            }
        }

        // min_by_key keeps the first of equal minima, so the token is stable
        let Some(&(_, _, min_z, min_token)) = candidates.iter().min_by_key(|c| c.2) else {
            return Err(IndexError::Empty {
                files: metadata.len(),
                joined,
            });
        };
        let min_token = min_token.to_string();
        info!("First Z slice is {}", min_token);

        let z_pattern = &metadata.patterns().z;
        let mut records: Vec<MosaicRecord> = candidates
            .into_iter()
            .map(|(file, stage_position, z, _)| {
                let stack_key = z_pattern.replace_token(&file.filename, &min_token).into_owned();
                let channel = AxisValue::from_field(file.fields.channel.as_deref());
                let illumination = AxisValue::from_field(file.fields.illumination.as_deref());
                MosaicRecord {
                    file,
                    stage_position,
                    stack_key,
                    z,
                    channel,
                    illumination,
                }
            })
            .collect();

        // Stable: equal Z keeps filename order
        records.sort_by_key(|r| r.z);

        let groups = group_records(&records);
        let channels = AxisIndex::from_values(records.iter().map(|r| &r.channel));
        let illuminations = AxisIndex::from_values(records.iter().map(|r| &r.illumination));

        info!(
            "Indexed {} slice(s): {} tile stack(s), {} channel(s), {} illumination(s)",
            records.len(),
            groups.len(),
            channels.len(),
            illuminations.len()
        );

        Ok(Self {
            records,
            groups,
            channels,
            illuminations,
            min_z,
            skipped,
        })
    }

    /// All indexed slices, sorted by ascending Z.
    pub fn records(&self) -> &[MosaicRecord] {
        &self.records
    }

    /// Tile stacks in tile-index order.
    pub fn groups(&self) -> &[TileGroup] {
        &self.groups
    }

    pub fn channels(&self) -> &AxisIndex {
        &self.channels
    }

    pub fn illuminations(&self) -> &AxisIndex {
        &self.illuminations
    }

    /// Smallest Z value in the folder.
    pub fn min_z(&self) -> i64 {
        self.min_z
    }

    /// Files that were discovered but excluded from the index.
    pub fn skipped(&self) -> &[SkippedFile] {
        &self.skipped
    }

    /// Number of distinct Z values.
    pub fn unique_z_count(&self) -> usize {
        let mut zs: Vec<i64> = self.records.iter().map(|r| r.z).collect();
        zs.dedup();
        zs.len()
    }

    /// Channel and illumination indices of a group.
    ///
    /// Always `Some` for the groups of this index; `None` for a group whose
    /// channel or illumination this index has never seen.
    pub fn view_indices(&self, group: &TileGroup) -> Option<(usize, usize)> {
        let channel = self.channels.index_of(group.channel())?;
        let illumination = self.illuminations.index_of(group.illumination())?;
        Some((channel, illumination))
    }

    /// Whether the index has no tile groups.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

fn parse_z(field: Option<&str>) -> Result<(i64, &str), SkipReason> {
    let token = field.ok_or(SkipReason::MissingZ)?;
    token
        .parse::<i64>()
        .map(|z| (z, token))
        .map_err(|_| SkipReason::NonNumericZ(token.to_string()))
}

fn group_records(records: &[MosaicRecord]) -> Vec<TileGroup> {
    let mut by_key: BTreeMap<&str, Vec<MosaicRecord>> = BTreeMap::new();
    for record in records {
        by_key
            .entry(record.stack_key.as_str())
            .or_default()
            .push(record.clone());
    }

    by_key
        .into_iter()
        .enumerate()
        .map(|(tile, (stack_key, records))| {
            check_group(stack_key, &records);
            TileGroup {
                tile,
                stack_key: stack_key.to_string(),
                records,
            }
        })
        .collect()
}

fn check_group(stack_key: &str, records: &[MosaicRecord]) {
    if records.windows(2).any(|w| w[0].z == w[1].z) {
        warn!("Stack {} contains repeated Z values", stack_key);
    }
    let first = records[0].stage_position;
    if records.iter().any(|r| r.stage_position != first) {
        warn!(
            "Slices of stack {} have different stage positions, using {:?}",
            stack_key, first
        );
    }
}

// =============================================================================
// Tests
// =============================================================================
