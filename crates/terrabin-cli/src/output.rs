//! Terrabin CLI Output
//!
//! Writes one row per temporal bin, as CSV with a header or as JSON lines.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use clap::ValueEnum;
use serde::Serialize;
use serde_json::Map;
use std::io::{self, Write};
use terrabin_common::Result;
use terrabin_core::{BinResult, RegularGrid};

/// Output encoding for bin results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Json,
}

#[derive(Serialize)]
struct JsonRow {
    index: i64,
    lat: f64,
    lon: f64,
    num_obs: u32,
    num_passes: u32,
    features: Map<String, serde_json::Value>,
}

/// Write `results` with their feature `names`; cell centers come from `grid`.
pub fn write_results<W: Write>(
    writer: &mut W,
    format: OutputFormat,
    grid: &RegularGrid,
    names: &[String],
    results: &[BinResult],
) -> Result<()> {
    match format {
        OutputFormat::Csv => write_csv(writer, grid, names, results),
        OutputFormat::Json => write_json(writer, grid, names, results),
    }
}

fn center(grid: &RegularGrid, index: i64) -> (f64, f64) {
    grid.center(index).unwrap_or((f64::NAN, f64::NAN))
}

fn write_csv<W: Write>(
    writer: &mut W,
    grid: &RegularGrid,
    names: &[String],
    results: &[BinResult],
) -> Result<()> {
    write!(writer, "index,lat,lon,num_obs,num_passes")?;
    for name in names {
        write!(writer, ",{}", name)?;
    }
    writeln!(writer)?;

    for result in results {
        let (lat, lon) = center(grid, result.index);
        write!(
            writer,
            "{},{:.6},{:.6},{},{}",
            result.index, lat, lon, result.num_obs, result.num_passes
        )?;
        for value in &result.values {
            write!(writer, ",{}", value)?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

fn write_json<W: Write>(
    writer: &mut W,
    grid: &RegularGrid,
    names: &[String],
    results: &[BinResult],
) -> Result<()> {
    for result in results {
        let (lat, lon) = center(grid, result.index);
        let features = names
            .iter()
            .zip(&result.values)
            .map(|(name, &value)| (name.clone(), serde_json::json!(value)))
            .collect();
        let row = JsonRow {
            index: result.index,
            lat,
            lon,
            num_obs: result.num_obs,
            num_passes: result.num_passes,
            features,
        };
        serde_json::to_writer(&mut *writer, &row).map_err(io::Error::from)?;
        writeln!(writer)?;
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
