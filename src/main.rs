//! um2bdv - Ultramicroscope mosaics to BigStitcher datasets.
//!
//! This binary parses the command line and runs the conversion pipeline.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use um2bdv::{
    config::{Cli, Command, ConvertConfig, ScanConfig},
    mosaic::{self, WriteOutcome},
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Convert(config) => run_convert(config),
        Command::Scan(config) => run_scan(config),
    }
}

// =============================================================================
// Convert Command
// =============================================================================

fn run_convert(config: ConvertConfig) -> ExitCode {
    init_logging(config.verbose);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let patterns = match config.patterns.to_pattern_set() {
        Ok(p) => p,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let options = config.write_options();

    info!("Configuration:");
    info!("  Input folder: {}", config.folder.display());
    info!("  Output folder: {}", options.output_base.display());
    info!("  XY spacing: {} um/voxel", options.xyspacing);
    info!("  Z spacing: {} um/voxel", options.zspacing);
    info!(
        "  Stage directions: x {}, y {}",
        config.direction_x, config.direction_y
    );
    info!(
        "  Outputs: projected {}, volume {}",
        options.projected, options.volume
    );
    info!("  Element type: {}", options.pixel_type.data_type());

    match mosaic::convert_folder(&config.folder, patterns, options) {
        Ok(WriteOutcome::NothingToDo) => {
            warn!("Both --no-projected and --no-volume given, nothing was written");
            ExitCode::SUCCESS
        }
        Ok(WriteOutcome::Written(summary)) => {
            info!(
                "Done: {} tile(s), {} channel(s), {} illumination(s)",
                summary.tiles, summary.channels, summary.illuminations
            );
            if let Some(path) = summary.projected {
                info!("  Projected dataset: {}", path.display());
            }
            if let Some(path) = summary.volume {
                info!("  Volume dataset: {}", path.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Conversion failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Scan Command
// =============================================================================

fn run_scan(config: ScanConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let patterns = match config.patterns.to_pattern_set() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let index = match mosaic::index_folder(&config.folder, patterns) {
        Ok(index) => index,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("Folder: {}", config.folder.display());
    println!("═════════════════════════════════");
    println!("Slices:        {}", index.records().len());
    println!("Z planes:      {}", index.unique_z_count());
    println!("Tile stacks:   {}", index.groups().len());
    println!("Channels:      {}", index.channels().labels().join(", "));
    println!("Illuminations: {}", index.illuminations().labels().join(", "));

    if !index.skipped().is_empty() {
        println!();
        println!("Skipped {} file(s):", index.skipped().len());
        for skipped in index.skipped() {
            println!("  {} ({})", skipped.filename, skipped.reason);
        }
    }

    if config.list_tiles {
        println!();
        println!("Tile stacks:");
        println!("─────────────────");
        for group in index.groups() {
            let [x, y, z] = group.stage_position();
            let zs = group.z_values();
            println!(
                "  {:>4}  {}  ch {}  illu {}  z {}..{} ({} slices)  stage ({}, {}, {})",
                group.tile,
                group.stack_key,
                group.channel(),
                group.illumination(),
                zs.first().copied().unwrap_or_default(),
                zs.last().copied().unwrap_or_default(),
                group.len(),
                x,
                y,
                z
            );
        }
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose { "um2bdv=debug" } else { "um2bdv=info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
