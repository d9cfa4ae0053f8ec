//! Filename-driven metadata extraction.
//!
//! Ultramicroscope acquisitions encode the Z slice, the channel and the
//! illumination side in each slice's filename. The extractor lists a folder,
//! keeps the files whose name matches a whitelist pattern, and applies one
//! regular expression per metadata field to recover the field values.
//!
//! # Pattern semantics
//!
//! - The value of a field is the first capture group of the first match, or
//!   the whole first match if the pattern has no capture group.
//! - A pattern that does not match leaves the field empty (`None`) and emits a
//!   warning; the run continues, so optional axes such as illumination may be
//!   absent from the filenames.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use regex::{Captures, Regex};
use tracing::{debug, info, warn};

use crate::error::ExtractError;

/// Look-ahead and look-behind openers.
const LOOK_AROUND: [&str; 4] = ["(?=", "(?!", "(?<=", "(?<!"];

/// Default whitelist: any TIFF file.
pub const DEFAULT_WHITELIST_PATTERN: &str = r".*tif";

/// Default Z slice pattern, e.g. `..._C07...`.
pub const DEFAULT_Z_PATTERN: &str = r"_C(\d+)";

/// Default channel pattern, e.g. `...channel1...`.
pub const DEFAULT_CHANNEL_PATTERN: &str = r"channel(\d+)";

/// Default illumination pattern, e.g. `..._IllLeft...`.
pub const DEFAULT_ILLUMINATION_PATTERN: &str = r"_Ill([0-9a-zA-Z]+)";

// =============================================================================
// FieldPattern
// =============================================================================

/// A compiled pattern for one metadata field.
#[derive(Debug, Clone)]
pub struct FieldPattern {
    name: String,
    regex: Regex,
}

impl FieldPattern {
    /// Compile a pattern for the named field.
    ///
    /// Values are taken from the first capture group, so look-around is never
    /// needed; patterns using it are rejected with a hint instead of the
    /// regex engine's parse error.
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self, ExtractError> {
        let name = name.into();
        let regex = Regex::new(pattern).map_err(|source| {
            if LOOK_AROUND.iter().any(|opener| pattern.contains(opener)) {
                ExtractError::LookAround {
                    field: name.clone(),
                    pattern: pattern.to_string(),
                }
            } else {
                ExtractError::InvalidPattern {
                    field: name.clone(),
                    source,
                }
            }
        })?;
        Ok(Self { name, regex })
    }

    /// Field name this pattern extracts.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source text of the pattern.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Whether the pattern matches anywhere in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Extract the field value from `text`.
    ///
    /// Returns the first capture group of the first match, falling back to the
    /// whole match when the pattern has no group (or the group did not take
    /// part in the match).
    pub fn extract<'t>(&self, text: &'t str) -> Option<&'t str> {
        let caps = self.regex.captures(text)?;
        token(&caps).map(|m| m.as_str())
    }

    /// Replace every occurrence of the field token in `text` with `replacement`.
    ///
    /// Only the token (capture group, or whole match) is replaced; the context
    /// that anchors the pattern, such as a `_C` prefix, is kept.
    pub fn replace_token<'t>(&self, text: &'t str, replacement: &str) -> Cow<'t, str> {
        self.regex.replace_all(text, |caps: &Captures<'_>| {
            let (Some(whole), Some(tok)) = (caps.get(0), token(caps)) else {
                return String::new();
            };
            let text = whole.as_str();
            format!(
                "{}{}{}",
                &text[..tok.start() - whole.start()],
                replacement,
                &text[tok.end() - whole.start()..]
            )
        })
    }
}

fn token<'t>(caps: &Captures<'t>) -> Option<regex::Match<'t>> {
    caps.get(1).or_else(|| caps.get(0))
}

// =============================================================================
// PatternSet
// =============================================================================

/// The naming rules for one acquisition.
///
/// The three axes the mosaic needs are typed fields; anything else the caller
/// wants recorded goes into `extra`.
#[derive(Debug, Clone)]
pub struct PatternSet {
    pub filewhitelist: FieldPattern,
    pub z: FieldPattern,
    pub channel: FieldPattern,
    pub illumination: FieldPattern,
    pub extra: Vec<FieldPattern>,
}

impl PatternSet {
    /// Compile the whitelist and the three axis patterns.
    pub fn new(
        filewhitelist: &str,
        z: &str,
        channel: &str,
        illumination: &str,
    ) -> Result<Self, ExtractError> {
        Ok(Self {
            filewhitelist: FieldPattern::new("filewhitelist", filewhitelist)?,
            z: FieldPattern::new("Z", z)?,
            channel: FieldPattern::new("ch", channel)?,
            illumination: FieldPattern::new("illu", illumination)?,
            extra: Vec::new(),
        })
    }

    /// Add an extra named field to extract.
    pub fn with_extra(mut self, name: &str, pattern: &str) -> Result<Self, ExtractError> {
        self.extra.push(FieldPattern::new(name, pattern)?);
        Ok(self)
    }

    /// Build a pattern set from `name -> pattern` pairs.
    ///
    /// The keys `filewhitelist`, `Z`, `ch` and `illu` map onto the typed
    /// fields (missing keys fall back to the defaults); every other key
    /// becomes an extra field.
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, ExtractError> {
        let get = |key: &str, default: &'static str| {
            map.get(key).map(String::as_str).unwrap_or(default)
        };
        let mut set = Self::new(
            get("filewhitelist", DEFAULT_WHITELIST_PATTERN),
            get("Z", DEFAULT_Z_PATTERN),
            get("ch", DEFAULT_CHANNEL_PATTERN),
            get("illu", DEFAULT_ILLUMINATION_PATTERN),
        )?;
        for (name, pattern) in map {
            if !matches!(name.as_str(), "filewhitelist" | "Z" | "ch" | "illu") {
                set = set.with_extra(name, pattern)?;
            }
        }
        Ok(set)
    }

    /// Apply all field patterns to a filename.
    fn extract(&self, filename: &str) -> FieldValues {
        FieldValues {
            z: extract_logged(&self.z, filename),
            channel: extract_logged(&self.channel, filename),
            illumination: extract_logged(&self.illumination, filename),
            extra: self
                .extra
                .iter()
                .map(|p| (p.name().to_string(), extract_logged(p, filename)))
                .collect(),
        }
    }
}

impl Default for PatternSet {
    fn default() -> Self {
        Self::new(
            DEFAULT_WHITELIST_PATTERN,
            DEFAULT_Z_PATTERN,
            DEFAULT_CHANNEL_PATTERN,
            DEFAULT_ILLUMINATION_PATTERN,
        )
        .expect("default patterns are valid")
    }
}

fn extract_logged(pattern: &FieldPattern, filename: &str) -> Option<String> {
    let value = pattern.extract(filename).map(str::to_string);
    if value.is_none() {
        warn!(
            "Pattern {} ('{}') did not match {}",
            pattern.name(),
            pattern.as_str(),
            filename
        );
    }
    value
}

// =============================================================================
// FileRecord
// =============================================================================

/// Field values extracted from one filename. `None` means no match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldValues {
    pub z: Option<String>,
    pub channel: Option<String>,
    pub illumination: Option<String>,
    pub extra: BTreeMap<String, Option<String>>,
}

/// One discovered image file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Full path to the file
    pub path: PathBuf,

    /// Bare filename, the key into the stage position log
    pub filename: String,

    /// Metadata recovered from the filename
    pub fields: FieldValues,
}

// =============================================================================
// FileMetadata
// =============================================================================

/// The result of scanning one acquisition folder.
///
/// Built once per run and treated as an immutable value afterwards.
#[derive(Debug, Clone)]
pub struct FileMetadata {
    folder: PathBuf,
    patterns: PatternSet,
    records: Vec<FileRecord>,
}

impl FileMetadata {
    /// Scan `folder` and extract metadata from every whitelisted file.
    ///
    /// Records are sorted by filename so the result does not depend on the
    /// order in which the filesystem lists the folder.
    ///
    /// # Errors
    ///
    /// Returns an error if the folder does not exist or cannot be listed.
    pub fn scan(folder: impl AsRef<Path>, patterns: PatternSet) -> Result<Self, ExtractError> {
        let folder = folder.as_ref();
        if !folder.is_dir() {
            return Err(ExtractError::FolderNotFound(folder.to_path_buf()));
        }

        let io_err = |source| ExtractError::Io {
            path: folder.to_path_buf(),
            source,
        };

        let mut files: Vec<(PathBuf, String)> = Vec::new();
        for entry in fs::read_dir(folder).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if !path.is_file() {
                continue;
            }
            let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
                debug!("Skipping non UTF-8 filename {}", path.display());
                continue;
            };
            if patterns.filewhitelist.is_match(filename) {
                let filename = filename.to_string();
                files.push((path, filename));
            }
        }
        files.sort_by(|a, b| a.1.cmp(&b.1));

        info!(
            "Found {} file(s) matching '{}' in {}",
            files.len(),
            patterns.filewhitelist.as_str(),
            folder.display()
        );

        let records = Self::extract_records(files, &patterns);
        Ok(Self {
            folder: folder.to_path_buf(),
            patterns,
            records,
        })
    }

    /// Build from an explicit list of paths instead of a folder listing.
    ///
    /// The whitelist is still applied to each bare filename.
    pub fn from_paths(
        folder: impl Into<PathBuf>,
        paths: impl IntoIterator<Item = PathBuf>,
        patterns: PatternSet,
    ) -> Self {
        let mut files: Vec<(PathBuf, String)> = paths
            .into_iter()
            .filter_map(|path| {
                let filename = path.file_name()?.to_str()?.to_string();
                patterns
                    .filewhitelist
                    .is_match(&filename)
                    .then_some((path, filename))
            })
            .collect();
        files.sort_by(|a, b| a.1.cmp(&b.1));

        let records = Self::extract_records(files, &patterns);
        Self {
            folder: folder.into(),
            patterns,
            records,
        }
    }

    fn extract_records(files: Vec<(PathBuf, String)>, patterns: &PatternSet) -> Vec<FileRecord> {
        files
            .into_iter()
            .map(|(path, filename)| {
                let fields = patterns.extract(&filename);
                FileRecord {
                    path,
                    filename,
                    fields,
                }
            })
            .collect()
    }

    /// Folder the records were discovered in.
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Patterns used for extraction.
    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    /// Discovered records, sorted by filename.
    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    /// Number of discovered files.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no file matched the whitelist.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
