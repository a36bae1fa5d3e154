//! Terrabin CLI Input
//!
//! Streams observations from JSON-lines files. Each non-empty line is one
//! observation; `null` values mark missing samples.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use serde::Deserialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use terrabin_common::{BinningError, Result};
use terrabin_core::Observation;

// =============================================================================
// Observation Records
// =============================================================================

/// Wire form of one observation.
#[derive(Debug, Deserialize)]
struct ObservationRecord {
    lat: f64,
    lon: f64,
    #[serde(default)]
    mjd: f64,
    values: Vec<Option<f64>>,
}

impl From<ObservationRecord> for Observation {
    fn from(record: ObservationRecord) -> Self {
        Observation::new(
            record.lat,
            record.lon,
            record.mjd,
            record
                .values
                .into_iter()
                .map(|value| value.unwrap_or(f64::NAN))
                .collect(),
        )
    }
}

// =============================================================================
// Readers
// =============================================================================

/// Streams observations from a JSON-lines reader, one line at a time.
/// Blank lines are skipped; a malformed line yields a parse error naming it.
pub struct ObservationReader<R> {
    lines: io::Lines<R>,
    line_number: usize,
}

impl<R: BufRead> ObservationReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
        }
    }
}

impl<R: BufRead> Iterator for ObservationReader<R> {
    type Item = Result<Observation>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_number += 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let record = serde_json::from_str::<ObservationRecord>(line)
                .map(Observation::from)
                .map_err(|e| BinningError::Parse(format!("line {}: {}", self.line_number, e)));
            return Some(record);
        }
    }
}

/// Open a JSON-lines observation file, or stdin if `path` is `-`.
pub fn open_observations(path: &Path) -> Result<ObservationReader<Box<dyn BufRead>>> {
    let reader: Box<dyn BufRead> = if path.as_os_str() == "-" {
        Box::new(io::stdin().lock())
    } else {
        Box::new(BufReader::new(File::open(path)?))
    };
    Ok(ObservationReader::new(reader))
}

// =============================================================================
// Tests
// =============================================================================
