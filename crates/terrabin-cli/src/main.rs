//! Terrabin CLI
//!
//! Command-line driver for the Terrabin binning engine. Each input file is
//! binned spatially as one pass, then all passes are merged temporally.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

mod input;
mod output;

use clap::{Parser, Subcommand};
use output::OutputFormat;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use terrabin_common::{BinningConfig, Result};
use terrabin_core::{compute_results, BinManager, RegularGrid, SpatialBinner, TemporalBinner};

// =============================================================================
// CLI Arguments
// =============================================================================

#[derive(Parser)]
#[command(name = "terrabin")]
#[command(author = "AutomataNexus Development Team")]
#[command(version = "0.1.0")]
#[command(about = "Terrabin spatial and temporal binning", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bin observation files into a global grid
    Bin {
        #[arg(short, long, default_value = "terrabin.toml")]
        config: PathBuf,
        /// JSON-lines observation file, one per pass (`-` reads stdin)
        #[arg(short, long, required = true)]
        input: Vec<PathBuf>,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,
    },
    /// List the feature names produced by a configuration
    Features {
        #[arg(short, long, default_value = "terrabin.toml")]
        config: PathBuf,
    },
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Bin {
            config,
            input,
            format,
        } => run_bin(&config, &input, format),
        Commands::Features { config } => run_features(&config),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Commands
// =============================================================================

fn load_manager(config: &BinningConfig) -> Result<Arc<BinManager>> {
    let manager = Arc::new(BinManager::from_config(config)?);
    tracing::info!(
        "Loaded {} aggregators over {} variables",
        manager.aggregator_count(),
        manager.variable_context().variable_count()
    );
    Ok(manager)
}

fn run_bin(config_path: &Path, inputs: &[PathBuf], format: OutputFormat) -> Result<()> {
    let config = BinningConfig::from_file(config_path)?;
    let stdout = io::stdout();
    let mut writer = BufWriter::new(stdout.lock());
    bin_passes(&config, inputs, format, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Bin each input as one pass, merge the passes per cell and write one
/// result row per cell. Observations are streamed, so memory is bounded by
/// the number of active cells.
fn bin_passes<W: Write>(
    config: &BinningConfig,
    inputs: &[PathBuf],
    format: OutputFormat,
    writer: &mut W,
) -> Result<()> {
    let manager = load_manager(config)?;
    let grid = RegularGrid::new(config.num_rows)?;
    let temporal = TemporalBinner::new(Arc::clone(&manager));
    let mut spatial = SpatialBinner::new(Arc::clone(&manager), grid);

    for path in inputs {
        for observation in input::open_observations(path)? {
            spatial.process_observation(&observation?)?;
        }
        let (seen, dropped) = (spatial.observation_count(), spatial.dropped_count());
        if dropped > 0 {
            tracing::warn!(
                "{}: dropped {} observations outside the grid",
                path.display(),
                dropped
            );
        }
        let bins = spatial.complete()?;
        tracing::info!(
            "{}: {} observations into {} bins",
            path.display(),
            seen,
            bins.len()
        );
        temporal.merge_all(&bins)?;
    }

    let bins = temporal.complete()?;
    let results = compute_results(&manager, &bins)?;
    tracing::info!("Computed results for {} bins", results.len());

    output::write_results(
        writer,
        format,
        &grid,
        manager.result_feature_names(),
        &results,
    )
}

fn run_features(config_path: &Path) -> Result<()> {
    let manager = load_manager(&BinningConfig::from_file(config_path)?)?;

    let stdout = io::stdout();
    let mut writer = stdout.lock();
    writeln!(writer, "spatial: {}", manager.spatial_feature_names().join(","))?;
    writeln!(writer, "temporal: {}", manager.temporal_feature_names().join(","))?;
    writeln!(writer, "output: {}", manager.output_feature_names().join(","))?;
    writeln!(writer, "result: {}", manager.result_feature_names().join(","))?;
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
