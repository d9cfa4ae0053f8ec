//! Configuration management for um2bdv.
//!
//! This module provides the command-line interface:
//! - Command-line arguments via clap
//! - Environment variables with `UM2BDV_` prefix
//! - Defaults matching the usual ultramicroscope file naming
//!
//! # Commands
//!
//! - `convert` - write the projected and/or volume datasets of a folder
//! - `scan` - report what a folder contains without writing anything
//!
//! # Environment Variables
//!
//! - `UM2BDV_OUTPUT` - Output base folder
//! - `UM2BDV_XY_SPACING` - XY pixel spacing in um/voxel (default: 1.0)
//! - `UM2BDV_Z_SPACING` - Z slice spacing in um/voxel (default: 1.0)
//! - `UM2BDV_DIRECTION_X` - Stage X direction, 1 or -1 (default: 1)
//! - `UM2BDV_DIRECTION_Y` - Stage Y direction, 1 or -1 (default: -1)
//! - `UM2BDV_WHITELIST` - Filename whitelist pattern
//! - `UM2BDV_Z_PATTERN` - Z slice pattern
//! - `UM2BDV_CHANNEL_PATTERN` - Channel pattern
//! - `UM2BDV_ILLUMINATION_PATTERN` - Illumination pattern
//! - `UM2BDV_THREADS` - Stack loading threads

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::bdv::Compression;
use crate::error::ExtractError;
use crate::metadata::{
    PatternSet, DEFAULT_CHANNEL_PATTERN, DEFAULT_ILLUMINATION_PATTERN, DEFAULT_WHITELIST_PATTERN,
    DEFAULT_Z_PATTERN,
};
use crate::mosaic::{WriteOptions, ZProjection};
use crate::stack::PixelType;

// =============================================================================
// Default Values
// =============================================================================

/// Default XY pixel spacing in um/voxel.
pub const DEFAULT_XY_SPACING: f64 = 1.0;

/// Default Z slice spacing in um/voxel.
pub const DEFAULT_Z_SPACING: f64 = 1.0;

/// Default sign of the stage X axis.
pub const DEFAULT_DIRECTION_X: i8 = 1;

/// Default sign of the stage Y axis.
pub const DEFAULT_DIRECTION_Y: i8 = -1;

// =============================================================================
// CLI Arguments
// =============================================================================

/// um2bdv - Ultramicroscope mosaics to BigStitcher datasets.
///
/// Regroups the individual Z slices of an ultramicroscope acquisition into
/// per-tile stacks and writes them, placed at their stage positions, as
/// multi-resolution BigDataViewer N5 datasets.
#[derive(Parser, Debug, Clone)]
#[command(name = "um2bdv")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Convert an acquisition folder into BigDataViewer datasets
    Convert(ConvertConfig),

    /// List the tiles, channels and illuminations found in a folder
    Scan(ScanConfig),
}

/// Naming rules shared by every command.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct PatternArgs {
    /// Regular expression a filename must match to be considered.
    #[arg(long, default_value = DEFAULT_WHITELIST_PATTERN, env = "UM2BDV_WHITELIST")]
    pub whitelist: String,

    /// Pattern extracting the Z slice index (first capture group).
    #[arg(long, default_value = DEFAULT_Z_PATTERN, env = "UM2BDV_Z_PATTERN")]
    pub z_pattern: String,

    /// Pattern extracting the channel (first capture group).
    #[arg(long, default_value = DEFAULT_CHANNEL_PATTERN, env = "UM2BDV_CHANNEL_PATTERN")]
    pub channel_pattern: String,

    /// Pattern extracting the illumination side (first capture group).
    #[arg(
        long,
        default_value = DEFAULT_ILLUMINATION_PATTERN,
        env = "UM2BDV_ILLUMINATION_PATTERN"
    )]
    pub illumination_pattern: String,
}

impl PatternArgs {
    /// Compile the patterns.
    pub fn to_pattern_set(&self) -> Result<PatternSet, ExtractError> {
        PatternSet::new(
            &self.whitelist,
            &self.z_pattern,
            &self.channel_pattern,
            &self.illumination_pattern,
        )
    }
}

impl Default for PatternArgs {
    fn default() -> Self {
        Self {
            whitelist: DEFAULT_WHITELIST_PATTERN.to_string(),
            z_pattern: DEFAULT_Z_PATTERN.to_string(),
            channel_pattern: DEFAULT_CHANNEL_PATTERN.to_string(),
            illumination_pattern: DEFAULT_ILLUMINATION_PATTERN.to_string(),
        }
    }
}

// =============================================================================
// Convert Command
// =============================================================================

/// Arguments of the `convert` command.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct ConvertConfig {
    /// Acquisition folder holding the slices and tiles.txt.
    pub folder: PathBuf,

    /// Output base folder; `projected/` and `volume/` are created inside it.
    #[arg(short, long, env = "UM2BDV_OUTPUT")]
    pub output: PathBuf,

    #[command(flatten)]
    pub patterns: PatternArgs,

    // =========================================================================
    // Outputs
    // =========================================================================
    /// Skip the Z-projected dataset.
    #[arg(long, default_value_t = false)]
    pub no_projected: bool,

    /// Skip the full volume dataset.
    #[arg(long, default_value_t = false)]
    pub no_volume: bool,

    /// Reduction used for the projected dataset.
    #[arg(long, value_enum, default_value_t = ZProjection::Max)]
    pub projection: ZProjection,

    /// Element type stored in the datasets.
    #[arg(long, value_enum, default_value_t = PixelType::U16)]
    pub pixel_type: PixelType,

    /// Store blocks uncompressed instead of gzip.
    #[arg(long, default_value_t = false)]
    pub raw: bool,

    /// Replace datasets that already exist in the output folder.
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,

    // =========================================================================
    // Geometry
    // =========================================================================
    /// Pixel spacing in X and Y, in um/voxel.
    #[arg(long, default_value_t = DEFAULT_XY_SPACING, env = "UM2BDV_XY_SPACING")]
    pub xy_spacing: f64,

    /// Slice spacing in Z, in um/voxel.
    #[arg(long, default_value_t = DEFAULT_Z_SPACING, env = "UM2BDV_Z_SPACING")]
    pub z_spacing: f64,

    /// Direction of the stage X axis (1 or -1).
    #[arg(
        long,
        default_value_t = DEFAULT_DIRECTION_X,
        env = "UM2BDV_DIRECTION_X",
        allow_negative_numbers = true
    )]
    pub direction_x: i8,

    /// Direction of the stage Y axis (1 or -1).
    #[arg(
        long,
        default_value_t = DEFAULT_DIRECTION_Y,
        env = "UM2BDV_DIRECTION_Y",
        allow_negative_numbers = true
    )]
    pub direction_y: i8,

    // =========================================================================
    // Runtime
    // =========================================================================
    /// Number of threads reading slices (all cores when omitted).
    #[arg(long, env = "UM2BDV_THREADS")]
    pub threads: Option<usize>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ConvertConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.xy_spacing.is_finite() && self.xy_spacing > 0.0) {
            return Err("xy_spacing must be a positive number".to_string());
        }
        if !(self.z_spacing.is_finite() && self.z_spacing > 0.0) {
            return Err("z_spacing must be a positive number".to_string());
        }

        for (name, direction) in [("direction_x", self.direction_x), ("direction_y", self.direction_y)] {
            if direction != 1 && direction != -1 {
                return Err(format!("{} must be 1 or -1, got {}", name, direction));
            }
        }

        if self.threads == Some(0) {
            return Err("threads must be greater than 0".to_string());
        }

        self.patterns.to_pattern_set().map_err(|e| e.to_string())?;

        Ok(())
    }

    /// Options for the mosaic writer.
    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            output_base: self.output.clone(),
            projected: !self.no_projected,
            volume: !self.no_volume,
            xyspacing: self.xy_spacing,
            zspacing: self.z_spacing,
            direction_x: f64::from(self.direction_x),
            direction_y: f64::from(self.direction_y),
            projection: self.projection,
            overwrite: self.overwrite,
            pixel_type: self.pixel_type,
            threads: self.threads,
            compression: if self.raw {
                Compression::Raw
            } else {
                Compression::gzip()
            },
        }
    }
}

// =============================================================================
// Scan Command
// =============================================================================

/// Arguments of the `scan` command.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct ScanConfig {
    /// Acquisition folder holding the slices and tiles.txt.
    pub folder: PathBuf,

    #[command(flatten)]
    pub patterns: PatternArgs,

    /// List every tile stack with its slices.
    #[arg(long, default_value_t = false)]
    pub list_tiles: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ScanConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.patterns.to_pattern_set().map_err(|e| e.to_string())?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
