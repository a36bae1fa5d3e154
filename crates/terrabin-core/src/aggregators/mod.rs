//! Terrabin Aggregators
//!
//! The aggregator protocol and the built-in statistics. An aggregator owns
//! one statistic's complete lifecycle: its neutral element, how a single
//! observation is folded into a spatial region, how completed spatial
//! regions merge into a temporal region, and how output features are derived
//! from the completed temporal region.
//!
//! Aggregators never see whole bins. The bin manager hands each one the
//! window of bin storage it declared, sized by the length of the matching
//! feature-name list.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

mod average;
mod average_ml;
mod min_max;

pub use average::AggregatorAverage;
pub use average_ml::AggregatorAverageMl;
pub use min_max::AggregatorMinMax;

use crate::context::VariableContext;
use crate::observation::Observation;
use crate::vector::{Vector, WritableVector};
use std::fmt;
use terrabin_common::{AggregatorConfig, Result};

// =============================================================================
// Aggregator Trait
// =============================================================================

/// A statistic computed per bin in two accumulation stages.
///
/// Implementations hold only immutable configuration, so one instance serves
/// every bin concurrently.
pub trait Aggregator: Send + Sync + fmt::Debug {
    /// Kind name, e.g. `"MIN_MAX"`.
    fn name(&self) -> &str;

    fn spatial_feature_names(&self) -> &[String];

    fn temporal_feature_names(&self) -> &[String];

    fn output_feature_names(&self) -> &[String];

    /// Write the neutral element of the spatial stage.
    fn init_spatial(&self, spatial: &mut dyn WritableVector);

    /// Fold one observation into the spatial region. Observations whose
    /// relevant value is NaN leave the region untouched.
    fn aggregate_spatial(&self, observation: &Observation, spatial: &mut dyn WritableVector);

    /// Finalize the spatial region once the pass has been folded in.
    fn complete_spatial(&self, num_obs: u32, spatial: &mut dyn WritableVector);

    /// Write the neutral element of the temporal stage.
    fn init_temporal(&self, temporal: &mut dyn WritableVector);

    /// Merge one completed spatial region into the temporal region. The
    /// result must not depend on the order spatial regions are merged in.
    fn aggregate_temporal(
        &self,
        spatial: &dyn Vector,
        num_spatial_obs: u32,
        temporal: &mut dyn WritableVector,
    );

    /// Finalize the temporal region once every pass has been merged.
    fn complete_temporal(&self, num_obs: u32, temporal: &mut dyn WritableVector);

    /// Derive the output features from the completed temporal region.
    fn compute_output(&self, temporal: &dyn Vector, output: &mut dyn WritableVector);
}

// =============================================================================
// Factory
// =============================================================================

/// Build the aggregator described by `config`, resolving its variables
/// against `context`.
pub fn create_aggregator(
    config: &AggregatorConfig,
    context: &VariableContext,
) -> Result<Box<dyn Aggregator>> {
    let aggregator: Box<dyn Aggregator> = match config {
        AggregatorConfig::MinMax { var_name } => {
            Box::new(AggregatorMinMax::new(context, var_name)?)
        }
        AggregatorConfig::Average {
            var_name,
            output_sigma,
            ..
        } => Box::new(
            AggregatorAverage::new(context, var_name)?
                .with_weight_coeff(config.weight_coeff())
                .with_sigma(*output_sigma),
        ),
        AggregatorConfig::AverageMl { var_name, .. } => Box::new(
            AggregatorAverageMl::new(context, var_name)?.with_weight_coeff(config.weight_coeff()),
        ),
    };
    Ok(aggregator)
}

// =============================================================================
// Helpers
// =============================================================================

/// Feature names of the form `<var>_<suffix>`.
pub(crate) fn feature_names(var_name: &str, suffixes: &[&str]) -> Vec<String> {
    suffixes
        .iter()
        .map(|suffix| format!("{}_{}", var_name, suffix))
        .collect()
}

/// Temporal weight of a spatial bin with `count` contributing observations.
pub(crate) fn count_weight(count: f64, weight_coeff: f64) -> f64 {
    if weight_coeff == 1.0 {
        count
    } else {
        count.powf(weight_coeff)
    }
}

// =============================================================================
// Tests
// =============================================================================
