//! Terrabin Observation
//!
//! One geolocated input sample. Values are aligned to the variable context;
//! NaN marks a missing or invalid value.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use serde::{Deserialize, Serialize};

// =============================================================================
// Observation
// =============================================================================

/// A single geolocated sample with one value per context variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub latitude: f64,
    pub longitude: f64,
    /// Acquisition time as Modified Julian Date.
    pub mjd: f64,
    pub values: Vec<f64>,
}

impl Observation {
    pub fn new(latitude: f64, longitude: f64, mjd: f64, values: Vec<f64>) -> Self {
        Self {
            latitude,
            longitude,
            mjd,
            values,
        }
    }

    /// Number of values carried.
    pub fn size(&self) -> usize {
        self.values.len()
    }

    /// Value of the variable at `index`; NaN if the observation carries no
    /// value for it.
    pub fn get(&self, index: usize) -> f64 {
        self.values.get(index).copied().unwrap_or(f64::NAN)
    }
}

// =============================================================================
// Tests
// =============================================================================
