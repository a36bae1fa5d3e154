//! Minimum and maximum of one variable.
//!
//! Spatial, temporal and output regions all hold `{min, max}`. Both folds
//! are commutative, so merge order never matters.

use super::{feature_names, Aggregator};
use crate::context::VariableContext;
use crate::observation::Observation;
use crate::vector::{Vector, WritableVector};
use terrabin_common::Result;

/// Aggregator tracking the extrema of a variable.
#[derive(Debug, Clone)]
pub struct AggregatorMinMax {
    var_index: usize,
    feature_names: Vec<String>,
}

impl AggregatorMinMax {
    pub fn new(context: &VariableContext, var_name: &str) -> Result<Self> {
        let var_index = context.require(var_name)?;
        Ok(Self {
            var_index,
            feature_names: feature_names(var_name, &["min", "max"]),
        })
    }

    fn fold(value: f64, vector: &mut dyn WritableVector) {
        if value.is_nan() {
            return;
        }
        if value < vector.get(0) {
            vector.set(0, value);
        }
        if value > vector.get(1) {
            vector.set(1, value);
        }
    }

    // A region that never saw a valid value still holds the neutral element.
    fn finish(vector: &mut dyn WritableVector) {
        if vector.get(0) > vector.get(1) {
            vector.set(0, f64::NAN);
            vector.set(1, f64::NAN);
        }
    }
}

impl Aggregator for AggregatorMinMax {
    fn name(&self) -> &str {
        "MIN_MAX"
    }

    fn spatial_feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn temporal_feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn output_feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn init_spatial(&self, spatial: &mut dyn WritableVector) {
        spatial.set(0, f64::INFINITY);
        spatial.set(1, f64::NEG_INFINITY);
    }

    fn aggregate_spatial(&self, observation: &Observation, spatial: &mut dyn WritableVector) {
        Self::fold(observation.get(self.var_index), spatial);
    }

    fn complete_spatial(&self, _num_obs: u32, spatial: &mut dyn WritableVector) {
        Self::finish(spatial);
    }

    fn init_temporal(&self, temporal: &mut dyn WritableVector) {
        temporal.set(0, f64::INFINITY);
        temporal.set(1, f64::NEG_INFINITY);
    }

    fn aggregate_temporal(
        &self,
        spatial: &dyn Vector,
        _num_spatial_obs: u32,
        temporal: &mut dyn WritableVector,
    ) {
        Self::fold(spatial.get(0), temporal);
        Self::fold(spatial.get(1), temporal);
    }

    fn complete_temporal(&self, _num_obs: u32, temporal: &mut dyn WritableVector) {
        Self::finish(temporal);
    }

    fn compute_output(&self, temporal: &dyn Vector, output: &mut dyn WritableVector) {
        output.set(0, temporal.get(0));
        output.set(1, temporal.get(1));
    }
}
