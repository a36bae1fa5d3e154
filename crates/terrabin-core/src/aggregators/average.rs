//! Count-weighted arithmetic mean of one variable.
//!
//! Spatial region: `{sum, sum_sq, counts}`, turned into per-pass means of the
//! value and of its square on completion. Temporal region: `{sum, sum_sq,
//! weights}`, where each pass contributes its means weighted by
//! `counts ^ weight_coeff`. With the default coefficient of 1 the temporal
//! mean equals the mean over every valid observation, whatever the merge
//! order.

use super::{count_weight, feature_names, Aggregator};
use crate::context::VariableContext;
use crate::observation::Observation;
use crate::vector::{Vector, WritableVector};
use terrabin_common::config::DEFAULT_WEIGHT_COEFF;
use terrabin_common::Result;

/// Aggregator computing a weighted mean, optionally with its sigma.
#[derive(Debug, Clone)]
pub struct AggregatorAverage {
    var_name: String,
    var_index: usize,
    weight_coeff: f64,
    spatial_feature_names: Vec<String>,
    temporal_feature_names: Vec<String>,
    output_feature_names: Vec<String>,
}

impl AggregatorAverage {
    pub fn new(context: &VariableContext, var_name: &str) -> Result<Self> {
        let var_index = context.require(var_name)?;
        Ok(Self {
            var_name: var_name.to_string(),
            var_index,
            weight_coeff: DEFAULT_WEIGHT_COEFF,
            spatial_feature_names: feature_names(var_name, &["sum", "sum_sq", "counts"]),
            temporal_feature_names: feature_names(var_name, &["sum", "sum_sq", "weights"]),
            output_feature_names: feature_names(var_name, &["mean"]),
        })
    }

    pub fn with_weight_coeff(mut self, weight_coeff: f64) -> Self {
        self.weight_coeff = weight_coeff;
        self
    }

    /// Also emit `<var>_sigma` as a second output feature.
    pub fn with_sigma(mut self, output_sigma: bool) -> Self {
        let suffixes: &[&str] = if output_sigma {
            &["mean", "sigma"]
        } else {
            &["mean"]
        };
        self.output_feature_names = feature_names(&self.var_name, suffixes);
        self
    }

    pub fn weight_coeff(&self) -> f64 {
        self.weight_coeff
    }
}

// =============================================================================
// Moment Accumulation
// =============================================================================
//
// Shared with the maximum-likelihood mean, which runs the same arithmetic on
// log-transformed values.

pub(super) fn init_moments(vector: &mut dyn WritableVector) {
    vector.set(0, 0.0);
    vector.set(1, 0.0);
    vector.set(2, 0.0);
}

pub(super) fn fold_value(value: f64, spatial: &mut dyn WritableVector) {
    spatial.set(0, spatial.get(0) + value);
    spatial.set(1, spatial.get(1) + value * value);
    spatial.set(2, spatial.get(2) + 1.0);
}

pub(super) fn complete_spatial_moments(spatial: &mut dyn WritableVector) {
    let counts = spatial.get(2);
    if counts > 0.0 {
        spatial.set(0, spatial.get(0) / counts);
        spatial.set(1, spatial.get(1) / counts);
    } else {
        spatial.set(0, f64::NAN);
        spatial.set(1, f64::NAN);
    }
}

pub(super) fn merge_moments(
    spatial: &dyn Vector,
    weight_coeff: f64,
    temporal: &mut dyn WritableVector,
) {
    let counts = spatial.get(2);
    if counts <= 0.0 {
        return;
    }
    let weight = count_weight(counts, weight_coeff);
    temporal.set(0, temporal.get(0) + spatial.get(0) * weight);
    temporal.set(1, temporal.get(1) + spatial.get(1) * weight);
    temporal.set(2, temporal.get(2) + weight);
}

pub(super) fn complete_temporal_moments(temporal: &mut dyn WritableVector) {
    complete_spatial_moments(temporal);
}

/// Mean and variance from a completed `{mean, mean_sq, weights}` region.
pub(super) fn mean_and_variance(temporal: &dyn Vector) -> (f64, f64) {
    let mean = temporal.get(0);
    if mean.is_nan() {
        return (f64::NAN, f64::NAN);
    }
    let variance = (temporal.get(1) - mean * mean).max(0.0);
    (mean, variance)
}

// =============================================================================
// Aggregator Implementation
// =============================================================================

impl Aggregator for AggregatorAverage {
    fn name(&self) -> &str {
        "AVG"
    }

    fn spatial_feature_names(&self) -> &[String] {
        &self.spatial_feature_names
    }

    fn temporal_feature_names(&self) -> &[String] {
        &self.temporal_feature_names
    }

    fn output_feature_names(&self) -> &[String] {
        &self.output_feature_names
    }

    fn init_spatial(&self, spatial: &mut dyn WritableVector) {
        init_moments(spatial);
    }

    fn aggregate_spatial(&self, observation: &Observation, spatial: &mut dyn WritableVector) {
        let value = observation.get(self.var_index);
        if !value.is_nan() {
            fold_value(value, spatial);
        }
    }

    fn complete_spatial(&self, _num_obs: u32, spatial: &mut dyn WritableVector) {
        complete_spatial_moments(spatial);
    }

    fn init_temporal(&self, temporal: &mut dyn WritableVector) {
        init_moments(temporal);
    }

    fn aggregate_temporal(
        &self,
        spatial: &dyn Vector,
        _num_spatial_obs: u32,
        temporal: &mut dyn WritableVector,
    ) {
        merge_moments(spatial, self.weight_coeff, temporal);
    }

    fn complete_temporal(&self, _num_obs: u32, temporal: &mut dyn WritableVector) {
        complete_temporal_moments(temporal);
    }

    fn compute_output(&self, temporal: &dyn Vector, output: &mut dyn WritableVector) {
        let (mean, variance) = mean_and_variance(temporal);
        output.set(0, mean);
        if output.size() > 1 {
            output.set(1, variance.sqrt());
        }
    }
}
