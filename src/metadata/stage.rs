//! Stage position log parsing.
//!
//! The microscope software writes a `tiles.txt` file next to the image slices.
//! It is semicolon separated, starts with one header line, and maps every
//! slice filename to the stage position (in meters) at which it was acquired:
//!
//! ```text
//! filename;unknown;stagexyz
//! img_Z001_channel0_IllLeft.tif;0;(0.001, 0.002, 0.0)
//! img_Z002_channel0_IllLeft.tif;0;(0.001, 0.002, 0.0)
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::error::StageTableError;

/// Name of the stage position log inside an acquisition folder.
pub const STAGE_LOG_FILENAME: &str = "tiles.txt";

/// Column separator used by the stage position log.
const SEPARATOR: u8 = b';';

/// Physical stage position in meters.
pub type StagePosition = [f64; 3];

// =============================================================================
// StagePositionTable
// =============================================================================

/// Mapping from slice filename to the stage position it was acquired at.
#[derive(Debug, Clone, Default)]
pub struct StagePositionTable {
    positions: HashMap<String, StagePosition>,
}

impl StagePositionTable {
    /// Read `tiles.txt` from an acquisition folder.
    pub fn from_folder(folder: impl AsRef<Path>) -> Result<Self, StageTableError> {
        Self::from_file(folder.as_ref().join(STAGE_LOG_FILENAME))
    }

    /// Read a stage position log from an explicit path.
    ///
    /// # Errors
    ///
    /// Returns [`StageTableError::NotFound`] if the file does not exist, and
    /// [`StageTableError::Malformed`] for the first line that cannot be parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, StageTableError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(StageTableError::NotFound(path.to_path_buf()));
        }

        info!("Reading stage positions from {}", path.display());
        let text = fs::read_to_string(path).map_err(|source| StageTableError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let table = Self::parse(&text)?;
        debug!("Read {} stage position(s)", table.len());
        Ok(table)
    }

    /// Parse the contents of a stage position log.
    ///
    /// Fields are trimmed and may be quoted; blank lines are skipped.
    pub fn parse(text: &str) -> Result<Self, StageTableError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(SEPARATOR)
            .has_headers(true)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut positions = HashMap::new();
        for record in reader.records() {
            let record = record.map_err(malformed)?;
            // Line numbers are 1-based and include the header
            let line = record.position().map_or(0, |p| p.line() as usize);

            let (filename, position) = parse_record(&record)
                .map_err(|message| StageTableError::Malformed { line, message })?;
            positions.insert(filename, position);
        }

        Ok(Self { positions })
    }

    /// Look up the stage position of a slice by its bare filename.
    pub fn get(&self, filename: &str) -> Option<StagePosition> {
        self.positions.get(filename).copied()
    }

    /// Number of filenames with a known position.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the log contained no positions.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl FromIterator<(String, StagePosition)> for StagePositionTable {
    fn from_iter<I: IntoIterator<Item = (String, StagePosition)>>(iter: I) -> Self {
        Self {
            positions: iter.into_iter().collect(),
        }
    }
}

fn parse_record(record: &csv::StringRecord) -> Result<(String, StagePosition), String> {
    if record.len() < 3 {
        return Err(format!(
            "expected 3 columns separated by '{}', found {}",
            SEPARATOR as char,
            record.len()
        ));
    }

    let filename = &record[0];
    if filename.is_empty() {
        return Err("empty filename".to_string());
    }

    let position = parse_stage_vector(&record[2])?;
    Ok((filename.to_string(), position))
}

fn malformed(err: csv::Error) -> StageTableError {
    let line = err.position().map_or(0, |p| p.line() as usize);
    StageTableError::Malformed {
        line,
        message: err.to_string(),
    }
}

/// Parse a textual vector such as `(12.0, 13.0, 14.0)` or `[1, 2, 3]`.
///
/// Bracket characters are ignored; the remainder must be exactly three
/// comma-separated floating point numbers.
pub fn parse_stage_vector(text: &str) -> Result<StagePosition, String> {
    let stripped: String = text
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | '[' | ']'))
        .collect();

    let values: Vec<f64> = stripped
        .split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<f64>()
                .map_err(|_| format!("'{}' is not a number in stage vector '{}'", part, text))
        })
        .collect::<Result<_, _>>()?;

    match values.as_slice() {
        [x, y, z] => Ok([*x, *y, *z]),
        _ => Err(format!(
            "stage vector '{}' has {} component(s), expected 3",
            text,
            values.len()
        )),
    }
}

// =============================================================================
// Tests
// =============================================================================
