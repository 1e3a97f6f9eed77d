//! matrixscan - matrix scan experiment tool.
//!
//! Compresses and restores experiment images, lists the experiment hierarchy
//! and drives stitching.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use matrixscan::{
    config::{
        Cli, Command, CompressConfig, CoordinatesConfig, DecompressConfig, Level, ListConfig,
        StitchConfig, WorkerArgs,
    },
    dispatch::WorkerPool,
    experiment::Experiment,
    stitch::FijiRunner,
    CompressOptions, DecompressOptions,
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Compress(config) => run_compress(config),
        Command::Decompress(config) => run_decompress(config),
        Command::List(config) => run_list(config),
        Command::Coordinates(config) => run_coordinates(config),
        Command::Stitch(config) => run_stitch(config),
    }
}

// =============================================================================
// compress / decompress
// =============================================================================

fn run_compress(config: CompressConfig) -> ExitCode {
    init_logging(config.common.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }
    let Some(pool) = build_pool(&config.common) else {
        return ExitCode::FAILURE;
    };

    let options = config.options();
    let mut results = Vec::new();
    for path in &config.paths {
        results.extend(compress_path(path, &options, &pool));
    }
    report("Compressed", &results)
}

fn compress_path(
    path: &Path,
    options: &CompressOptions,
    pool: &WorkerPool,
) -> Vec<Option<PathBuf>> {
    if !path.is_dir() {
        return matrixscan::compress(path, options, pool);
    }
    match Experiment::new(path) {
        Ok(experiment) => experiment.compress(options, pool),
        Err(e) => {
            error!("Cannot open experiment {}: {}", path.display(), e);
            vec![None]
        }
    }
}

fn run_decompress(config: DecompressConfig) -> ExitCode {
    init_logging(config.common.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }
    let Some(pool) = build_pool(&config.common) else {
        return ExitCode::FAILURE;
    };

    let options = config.options();
    let mut results = Vec::new();
    for path in &config.paths {
        results.extend(decompress_path(path, &options, &pool));
    }
    report("Decompressed", &results)
}

fn decompress_path(
    path: &Path,
    options: &DecompressOptions,
    pool: &WorkerPool,
) -> Vec<Option<PathBuf>> {
    if !path.is_dir() {
        return matrixscan::decompress(path, options, pool);
    }
    match Experiment::new(path) {
        Ok(experiment) => experiment.decompress(options, pool),
        Err(e) => {
            error!("Cannot open experiment {}: {}", path.display(), e);
            vec![None]
        }
    }
}

/// Print produced paths; fail if any image failed.
fn report(verb: &str, results: &[Option<PathBuf>]) -> ExitCode {
    for path in results.iter().flatten() {
        println!("{}", path.display());
    }
    let done = results.iter().filter(|r| r.is_some()).count();
    info!("{} {} of {} images", verb, done, results.len());

    if done == results.len() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

// =============================================================================
// list / coordinates
// =============================================================================

fn run_list(config: ListConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }
    let Some(experiment) = open_experiment(&config.experiment) else {
        return ExitCode::FAILURE;
    };

    let paths = match (config.level, config.well) {
        (Level::Images, Some(well)) => experiment.well_images(well.x, well.y),
        (Level::Images, None) => experiment.images(),
        (Level::Slides, _) => experiment.slides(),
        (Level::Wells, _) => experiment.wells(),
        (Level::Fields, _) => experiment.fields(),
        (Level::Stitched, _) => experiment.stitched(),
    };
    for path in paths {
        println!("{}", path.display());
    }
    ExitCode::SUCCESS
}

fn run_coordinates(config: CoordinatesConfig) -> ExitCode {
    init_logging(config.verbose);

    let Some(experiment) = open_experiment(&config.experiment) else {
        return ExitCode::FAILURE;
    };

    match experiment.stitch_coordinates(config.well.x, config.well.y) {
        Ok(Some(coords)) => {
            for ((x, y), attrs) in coords.xs.iter().zip(&coords.ys).zip(&coords.attributes) {
                println!("{}\t{}\t{}", attrs, x, y);
            }
            ExitCode::SUCCESS
        }
        // Already logged
        Ok(None) => ExitCode::FAILURE,
        Err(e) => {
            error!("Cannot read stitch coordinates: {}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// stitch
// =============================================================================

fn run_stitch(config: StitchConfig) -> ExitCode {
    init_logging(config.common.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }
    let Some(pool) = build_pool(&config.common) else {
        return ExitCode::FAILURE;
    };
    let Some(experiment) = open_experiment(&config.experiment) else {
        return ExitCode::FAILURE;
    };

    let runner = FijiRunner::new(&config.fiji);
    let outputs = experiment.stitch(config.folder.as_deref(), &runner, &pool);
    for path in &outputs {
        println!("{}", path.display());
    }
    info!("{} stitched images", outputs.len());
    ExitCode::SUCCESS
}

// =============================================================================
// Helpers
// =============================================================================

fn open_experiment(path: &Path) -> Option<Experiment> {
    match Experiment::new(path) {
        Ok(experiment) => Some(experiment),
        Err(e) => {
            error!("Cannot open experiment {}: {}", path.display(), e);
            None
        }
    }
}

fn build_pool(args: &WorkerArgs) -> Option<WorkerPool> {
    let pool = match args.workers {
        Some(size) => WorkerPool::new(size),
        None => WorkerPool::with_default_size(),
    };
    match pool {
        Ok(pool) => {
            info!("Using {} workers", pool.size());
            Some(pool)
        }
        Err(e) => {
            error!("{}", e);
            None
        }
    }
}

/// Initialize the tracing subscriber.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "matrixscan=debug"
    } else {
        "matrixscan=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
