//! Maximum-likelihood mean of a log-normally distributed variable.
//!
//! Accumulates `ln(value)` exactly like [`AggregatorAverage`] accumulates the
//! value itself and transforms back to linear space only when the output is
//! computed. Values that are NaN or not strictly positive have no logarithm
//! and are skipped.
//!
//! With `μ` and `σ²` the weighted log-space mean and variance, the outputs are
//! `mean = exp(μ + σ²/2)`, `sigma = mean·sqrt(exp(σ²) − 1)`,
//! `median = exp(μ)` and `mode = exp(μ − σ²)`.
//!
//! [`AggregatorAverage`]: super::AggregatorAverage

use super::average::{
    complete_spatial_moments, complete_temporal_moments, fold_value, init_moments,
    mean_and_variance, merge_moments,
};
use super::{feature_names, Aggregator};
use crate::context::VariableContext;
use crate::observation::Observation;
use crate::vector::{Vector, WritableVector};
use terrabin_common::config::DEFAULT_WEIGHT_COEFF;
use terrabin_common::Result;

/// Aggregator computing log-normal statistics of a variable.
#[derive(Debug, Clone)]
pub struct AggregatorAverageMl {
    var_index: usize,
    weight_coeff: f64,
    spatial_feature_names: Vec<String>,
    temporal_feature_names: Vec<String>,
    output_feature_names: Vec<String>,
}

impl AggregatorAverageMl {
    pub fn new(context: &VariableContext, var_name: &str) -> Result<Self> {
        let var_index = context.require(var_name)?;
        Ok(Self {
            var_index,
            weight_coeff: DEFAULT_WEIGHT_COEFF,
            spatial_feature_names: feature_names(var_name, &["sum_log", "sum_log_sq", "counts"]),
            temporal_feature_names: feature_names(var_name, &["sum_log", "sum_log_sq", "weights"]),
            output_feature_names: feature_names(var_name, &["mean", "sigma", "median", "mode"]),
        })
    }

    pub fn with_weight_coeff(mut self, weight_coeff: f64) -> Self {
        self.weight_coeff = weight_coeff;
        self
    }
}

impl Aggregator for AggregatorAverageMl {
    fn name(&self) -> &str {
        "AVG_ML"
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
        if value > 0.0 {
            fold_value(value.ln(), spatial);
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
        let (mu, variance) = mean_and_variance(temporal);
        let mean = (mu + 0.5 * variance).exp();
        output.set(0, mean);
        output.set(1, mean * (variance.exp() - 1.0).sqrt());
        output.set(2, mu.exp());
        output.set(3, (mu - variance).exp());
    }
}
