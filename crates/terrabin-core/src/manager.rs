//! Terrabin Bin Manager
//!
//! Binds a variable context, an ordered list of aggregators and an optional
//! post-processor into the bin lifecycle and result API. Every aggregator is
//! assigned a fixed `(offset, len)` region of spatial, temporal and output
//! storage when the manager is built; bins themselves are flat buffers.
//!
//! A manager is immutable once built and can be shared across worker
//! threads. Bins are not synchronized: each bin is mutated by one owner at a
//! time.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::aggregators::{create_aggregator, Aggregator};
use crate::bin::{SpatialBin, TemporalBin};
use crate::context::VariableContext;
use crate::observation::Observation;
use crate::postprocessor::{create_post_processor, PostProcessor};
use crate::vector::{FeatureVector, VectorView, VectorViewMut, WritableVector};
use std::ops::Range;
use terrabin_common::{BinIndex, BinningConfig, BinningError, PostProcessorConfig, Result};

// =============================================================================
// Storage Layout
// =============================================================================

/// One aggregator's window into a flat feature buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Region {
    offset: usize,
    len: usize,
}

impl Region {
    fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// Lay out consecutive regions of the given lengths; returns them and the
/// total width.
fn layout(lengths: impl Iterator<Item = usize>) -> (Vec<Region>, usize) {
    let mut offset = 0;
    let regions = lengths
        .map(|len| {
            let region = Region { offset, len };
            offset += len;
            region
        })
        .collect();
    (regions, offset)
}

/// Reject a bin whose storage was not laid out by this manager.
fn check_width(kind: &str, index: BinIndex, actual: usize, expected: usize) -> Result<()> {
    if actual != expected {
        return Err(BinningError::Usage(format!(
            "{} bin {} has width {}, expected {}",
            kind, index, actual, expected
        )));
    }
    Ok(())
}

// =============================================================================
// Bin Manager
// =============================================================================

/// Orchestrates aggregators over the spatial and temporal bin lifecycle.
#[derive(Debug)]
pub struct BinManager {
    context: VariableContext,
    aggregators: Vec<Box<dyn Aggregator>>,
    spatial_regions: Vec<Region>,
    temporal_regions: Vec<Region>,
    output_regions: Vec<Region>,
    spatial_width: usize,
    temporal_width: usize,
    output_width: usize,
    output_feature_names: Vec<String>,
    post_processor: Option<Box<dyn PostProcessor>>,
}

impl BinManager {
    /// Create a manager without post-processing.
    pub fn new(context: VariableContext, aggregators: Vec<Box<dyn Aggregator>>) -> Self {
        let (spatial_regions, spatial_width) =
            layout(aggregators.iter().map(|a| a.spatial_feature_names().len()));
        let (temporal_regions, temporal_width) =
            layout(aggregators.iter().map(|a| a.temporal_feature_names().len()));
        let (output_regions, output_width) =
            layout(aggregators.iter().map(|a| a.output_feature_names().len()));
        let output_feature_names = aggregators
            .iter()
            .flat_map(|a| a.output_feature_names().iter().cloned())
            .collect();

        tracing::debug!(
            "Created bin manager with {} aggregators (spatial width {}, temporal width {}, output width {})",
            aggregators.len(),
            spatial_width,
            temporal_width,
            output_width
        );

        Self {
            context,
            aggregators,
            spatial_regions,
            temporal_regions,
            output_regions,
            spatial_width,
            temporal_width,
            output_width,
            output_feature_names,
            post_processor: None,
        }
    }

    /// Create a manager whose results pass through the configured
    /// post-processor. Fails if the post-processor selects a feature no
    /// aggregator produces.
    pub fn with_post_processor(
        context: VariableContext,
        aggregators: Vec<Box<dyn Aggregator>>,
        config: &PostProcessorConfig,
    ) -> Result<Self> {
        let mut manager = Self::new(context, aggregators);
        let post_processor = create_post_processor(config, &manager.output_feature_names)?;
        manager.post_processor = Some(post_processor);
        Ok(manager)
    }

    /// Create a manager with a caller-supplied post-processor.
    pub fn with_custom_post_processor(
        context: VariableContext,
        aggregators: Vec<Box<dyn Aggregator>>,
        post_processor: Box<dyn PostProcessor>,
    ) -> Self {
        let mut manager = Self::new(context, aggregators);
        manager.post_processor = Some(post_processor);
        manager
    }

    /// Build the variable context, aggregators and post-processor of a
    /// binning configuration.
    pub fn from_config(config: &BinningConfig) -> Result<Self> {
        config.validate()?;
        let context = VariableContext::new(config.variables.iter().cloned());
        let aggregators = config
            .aggregators
            .iter()
            .map(|aggregator| create_aggregator(aggregator, &context))
            .collect::<Result<Vec<_>>>()?;

        match &config.post_processor {
            Some(pp) => Self::with_post_processor(context, aggregators, pp),
            None => Ok(Self::new(context, aggregators)),
        }
    }

    // -------------------------------------------------------------------------
    // Introspection
    // -------------------------------------------------------------------------

    pub fn variable_context(&self) -> &VariableContext {
        &self.context
    }

    pub fn aggregator_count(&self) -> usize {
        self.aggregators.len()
    }

    pub fn aggregator(&self, index: usize) -> Option<&dyn Aggregator> {
        self.aggregators.get(index).map(|a| a.as_ref())
    }

    pub fn has_post_processor(&self) -> bool {
        self.post_processor.is_some()
    }

    pub fn spatial_feature_count(&self) -> usize {
        self.spatial_width
    }

    pub fn temporal_feature_count(&self) -> usize {
        self.temporal_width
    }

    pub fn output_feature_count(&self) -> usize {
        self.output_width
    }

    pub fn result_feature_count(&self) -> usize {
        self.result_feature_names().len()
    }

    pub fn spatial_feature_names(&self) -> Vec<String> {
        self.aggregators
            .iter()
            .flat_map(|a| a.spatial_feature_names().iter().cloned())
            .collect()
    }

    pub fn temporal_feature_names(&self) -> Vec<String> {
        self.aggregators
            .iter()
            .flat_map(|a| a.temporal_feature_names().iter().cloned())
            .collect()
    }

    /// Concatenated aggregator output feature names, before post-processing.
    pub fn output_feature_names(&self) -> &[String] {
        &self.output_feature_names
    }

    /// Names of the final result features.
    pub fn result_feature_names(&self) -> &[String] {
        match &self.post_processor {
            Some(pp) => pp.output_feature_names(),
            None => &self.output_feature_names,
        }
    }

    // -------------------------------------------------------------------------
    // Spatial Binning
    // -------------------------------------------------------------------------

    pub fn create_spatial_bin(&self, index: BinIndex) -> SpatialBin {
        let mut bin = SpatialBin::new(index, self.spatial_width);
        for (aggregator, region) in self.aggregators.iter().zip(&self.spatial_regions) {
            aggregator.init_spatial(&mut VectorViewMut::new(&mut bin.features[region.range()]));
        }
        bin
    }

    /// Fold one observation into every aggregator region of `bin`.
    pub fn aggregate_spatial_bin(&self, observation: &Observation, bin: &mut SpatialBin) -> Result<()> {
        self.check_spatial(bin)?;
        bin.begin_aggregate()?;
        for (aggregator, region) in self.aggregators.iter().zip(&self.spatial_regions) {
            aggregator.aggregate_spatial(
                observation,
                &mut VectorViewMut::new(&mut bin.features[region.range()]),
            );
        }
        Ok(())
    }

    pub fn complete_spatial_bin(&self, bin: &mut SpatialBin) -> Result<()> {
        self.check_spatial(bin)?;
        bin.begin_complete()?;
        let num_obs = bin.num_obs();
        for (aggregator, region) in self.aggregators.iter().zip(&self.spatial_regions) {
            aggregator.complete_spatial(
                num_obs,
                &mut VectorViewMut::new(&mut bin.features[region.range()]),
            );
        }
        Ok(())
    }

    /// Read-only view of one aggregator's spatial region, or `None` if the
    /// aggregator does not exist or the bin belongs to another manager.
    pub fn spatial_vector<'a>(
        &self,
        bin: &'a SpatialBin,
        aggregator_index: usize,
    ) -> Option<VectorView<'a>> {
        if bin.features.len() != self.spatial_width {
            return None;
        }
        let region = self.spatial_regions.get(aggregator_index)?;
        Some(VectorView::new(&bin.features[region.range()]))
    }

    fn check_spatial(&self, bin: &SpatialBin) -> Result<()> {
        check_width("spatial", bin.index(), bin.features.len(), self.spatial_width)
    }

    // -------------------------------------------------------------------------
    // Temporal Binning
    // -------------------------------------------------------------------------

    pub fn create_temporal_bin(&self, index: BinIndex) -> TemporalBin {
        let mut bin = TemporalBin::new(index, self.temporal_width);
        for (aggregator, region) in self.aggregators.iter().zip(&self.temporal_regions) {
            aggregator.init_temporal(&mut VectorViewMut::new(&mut bin.features[region.range()]));
        }
        bin
    }

    /// Merge a completed spatial bin into `temporal_bin`.
    pub fn aggregate_temporal_bin(
        &self,
        spatial_bin: &SpatialBin,
        temporal_bin: &mut TemporalBin,
    ) -> Result<()> {
        self.check_spatial(spatial_bin)?;
        self.check_temporal(temporal_bin)?;
        temporal_bin.begin_aggregate(spatial_bin)?;
        let num_obs = spatial_bin.num_obs();
        for ((aggregator, spatial_region), temporal_region) in self
            .aggregators
            .iter()
            .zip(&self.spatial_regions)
            .zip(&self.temporal_regions)
        {
            aggregator.aggregate_temporal(
                &VectorView::new(&spatial_bin.features[spatial_region.range()]),
                num_obs,
                &mut VectorViewMut::new(&mut temporal_bin.features[temporal_region.range()]),
            );
        }
        Ok(())
    }

    pub fn complete_temporal_bin(&self, bin: &mut TemporalBin) -> Result<()> {
        self.check_temporal(bin)?;
        bin.begin_complete()?;
        let num_obs = bin.num_obs();
        for (aggregator, region) in self.aggregators.iter().zip(&self.temporal_regions) {
            aggregator.complete_temporal(
                num_obs,
                &mut VectorViewMut::new(&mut bin.features[region.range()]),
            );
        }
        Ok(())
    }

    /// Read-only view of one aggregator's temporal region, or `None` if the
    /// aggregator does not exist or the bin belongs to another manager.
    pub fn temporal_vector<'a>(
        &self,
        bin: &'a TemporalBin,
        aggregator_index: usize,
    ) -> Option<VectorView<'a>> {
        if bin.features.len() != self.temporal_width {
            return None;
        }
        let region = self.temporal_regions.get(aggregator_index)?;
        Some(VectorView::new(&bin.features[region.range()]))
    }

    fn check_temporal(&self, bin: &TemporalBin) -> Result<()> {
        check_width("temporal", bin.index(), bin.features.len(), self.temporal_width)
    }

    // -------------------------------------------------------------------------
    // Results
    // -------------------------------------------------------------------------

    /// Allocate a vector sized to the final result width.
    pub fn create_result_vector(&self) -> FeatureVector {
        FeatureVector::new(self.result_feature_count())
    }

    /// Aggregator outputs of a completed temporal bin, before post-processing.
    pub fn compute_output(&self, temporal_bin: &TemporalBin) -> Result<FeatureVector> {
        if !temporal_bin.is_completed() {
            return Err(BinningError::Usage(format!(
                "temporal bin {} must be completed before results are computed (state: {})",
                temporal_bin.index(),
                temporal_bin.state()
            )));
        }
        self.check_temporal(temporal_bin)?;
        let mut output = FeatureVector::new(self.output_width);
        let values = output.as_mut_slice();
        for ((aggregator, temporal_region), output_region) in self
            .aggregators
            .iter()
            .zip(&self.temporal_regions)
            .zip(&self.output_regions)
        {
            aggregator.compute_output(
                &VectorView::new(&temporal_bin.features[temporal_region.range()]),
                &mut VectorViewMut::new(&mut values[output_region.range()]),
            );
        }
        Ok(output)
    }

    /// Compute the final result features of a completed temporal bin into
    /// `result`, which must have the result width.
    pub fn compute_result(&self, temporal_bin: &TemporalBin, result: &mut dyn WritableVector) -> Result<()> {
        let expected = self.result_feature_count();
        if result.size() != expected {
            return Err(BinningError::Usage(format!(
                "result vector has size {}, expected {}",
                result.size(),
                expected
            )));
        }

        let output = self.compute_output(temporal_bin)?;
        match &self.post_processor {
            Some(pp) => pp.compute(&output, result),
            None => {
                for (i, &value) in output.as_slice().iter().enumerate() {
                    result.set(i, value);
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregators::{AggregatorAverage, AggregatorAverageMl, AggregatorMinMax};
    use crate::vector::Vector;
    use terrabin_common::{AggregatorConfig, BinState};

    fn obs(values: Vec<f64>) -> Observation {
        Observation::new(0.0, 0.0, 0.0, values)
    }

    fn three_aggregators() -> BinManager {
        let ctx = VariableContext::new(["A", "B"]);
        let aggregators: Vec<Box<dyn Aggregator>> = vec![
            Box::new(AggregatorMinMax::new(&ctx, "A").expect("A is defined")),
            Box::new(AggregatorAverage::new(&ctx, "B").expect("B is defined").with_sigma(true)),
            Box::new(AggregatorAverageMl::new(&ctx, "A").expect("A is defined")),
        ];
        BinManager::new(ctx, aggregators)
    }

    #[test]
    fn test_widths_match_declarations() {
        let manager = three_aggregators();
        assert_eq!(manager.aggregator_count(), 3);
        assert_eq!(manager.spatial_feature_count(), 2 + 3 + 3);
        assert_eq!(manager.temporal_feature_count(), 2 + 3 + 3);
        assert_eq!(manager.output_feature_count(), 2 + 2 + 4);
        assert_eq!(manager.spatial_feature_names().len(), manager.spatial_feature_count());
        assert_eq!(manager.temporal_feature_names().len(), manager.temporal_feature_count());
        assert_eq!(manager.create_spatial_bin(0).feature_values().len(), 8);
        assert_eq!(manager.create_temporal_bin(0).feature_values().len(), 8);
        assert_eq!(manager.create_result_vector().size(), 8);
        assert_eq!(
            manager.result_feature_names(),
            [
                "A_min", "A_max", "B_mean", "B_sigma", "A_mean", "A_sigma", "A_median", "A_mode"
            ]
        );
    }

    #[test]
    fn test_regions_initialized_independently() {
        let manager = three_aggregators();
        let bin = manager.create_spatial_bin(1);
        assert_eq!(
            manager.spatial_vector(&bin, 0).expect("region").to_vec(),
            vec![f64::INFINITY, f64::NEG_INFINITY]
        );
        assert_eq!(manager.spatial_vector(&bin, 1).expect("region").to_vec(), vec![0.0, 0.0, 0.0]);
        assert_eq!(manager.spatial_vector(&bin, 2).expect("region").to_vec(), vec![0.0, 0.0, 0.0]);
        assert!(manager.spatial_vector(&bin, 3).is_none());
        assert!(manager.temporal_vector(&manager.create_temporal_bin(1), 3).is_none());
    }

    #[test]
    fn test_observation_count_includes_nan() {
        let manager = three_aggregators();
        let mut bin = manager.create_spatial_bin(0);
        manager.aggregate_spatial_bin(&obs(vec![1.0, 2.0]), &mut bin).expect("open bin");
        manager
            .aggregate_spatial_bin(&obs(vec![f64::NAN, f64::NAN]), &mut bin)
            .expect("open bin");
        manager.aggregate_spatial_bin(&obs(vec![]), &mut bin).expect("open bin");
        assert_eq!(bin.num_obs(), 3);

        manager.complete_spatial_bin(&mut bin).expect("first completion");
        assert_eq!(manager.spatial_vector(&bin, 0).expect("region").to_vec(), vec![1.0, 1.0]);
        assert_eq!(manager.spatial_vector(&bin, 1).expect("region").get(2), 1.0);
    }

    #[test]
    fn test_lifecycle_misuse_is_rejected() {
        let manager = three_aggregators();
        let mut spatial = manager.create_spatial_bin(0);
        let mut temporal = manager.create_temporal_bin(0);

        manager.aggregate_spatial_bin(&obs(vec![1.0, 1.0]), &mut spatial).expect("open bin");
        let err = manager.aggregate_temporal_bin(&spatial, &mut temporal).unwrap_err();
        assert!(err.is_usage_error());

        manager.complete_spatial_bin(&mut spatial).expect("first completion");
        let before = spatial.clone();
        assert!(manager.complete_spatial_bin(&mut spatial).unwrap_err().is_usage_error());
        assert!(manager
            .aggregate_spatial_bin(&obs(vec![5.0, 5.0]), &mut spatial)
            .unwrap_err()
            .is_usage_error());
        assert_eq!(spatial, before);

        manager.aggregate_temporal_bin(&spatial, &mut temporal).expect("open temporal bin");
        let mut result = manager.create_result_vector();
        assert!(manager.compute_result(&temporal, &mut result).unwrap_err().is_usage_error());

        manager.complete_temporal_bin(&mut temporal).expect("first completion");
        assert!(manager.complete_temporal_bin(&mut temporal).unwrap_err().is_usage_error());
        assert!(manager
            .aggregate_temporal_bin(&spatial, &mut temporal)
            .unwrap_err()
            .is_usage_error());
        assert_eq!(temporal.num_obs(), 1);

        let mut wrong_size = FeatureVector::new(3);
        assert!(manager.compute_result(&temporal, &mut wrong_size).unwrap_err().is_usage_error());
        manager.compute_result(&temporal, &mut result).expect("completed bin");
    }

    fn min_max_only() -> BinManager {
        let ctx = VariableContext::new(["A", "B"]);
        let aggregators: Vec<Box<dyn Aggregator>> =
            vec![Box::new(AggregatorMinMax::new(&ctx, "A").expect("A is defined"))];
        BinManager::new(ctx, aggregators)
    }

    #[test]
    fn test_foreign_spatial_bin_rejected() {
        let manager = three_aggregators();
        let other = min_max_only();

        let mut foreign = other.create_spatial_bin(0);
        let err = manager
            .aggregate_spatial_bin(&obs(vec![1.0, 1.0]), &mut foreign)
            .unwrap_err();
        assert!(err.is_usage_error());
        assert_eq!(foreign.num_obs(), 0);
        assert_eq!(foreign.state(), BinState::Created);

        assert!(manager.complete_spatial_bin(&mut foreign).unwrap_err().is_usage_error());
        assert!(!foreign.is_completed());
        assert!(manager.spatial_vector(&foreign, 0).is_none());

        other.complete_spatial_bin(&mut foreign).expect("first completion");
        let mut temporal = manager.create_temporal_bin(0);
        let err = manager.aggregate_temporal_bin(&foreign, &mut temporal).unwrap_err();
        assert!(err.is_usage_error());
        assert_eq!(temporal.num_obs(), 0);
    }

    #[test]
    fn test_foreign_temporal_bin_rejected() {
        let manager = three_aggregators();
        let other = min_max_only();

        let mut spatial = manager.create_spatial_bin(0);
        manager.aggregate_spatial_bin(&obs(vec![1.0, 2.0]), &mut spatial).expect("open bin");
        manager.complete_spatial_bin(&mut spatial).expect("first completion");

        let mut foreign = other.create_temporal_bin(0);
        let err = manager.aggregate_temporal_bin(&spatial, &mut foreign).unwrap_err();
        assert!(err.is_usage_error());
        assert_eq!(foreign.num_obs(), 0);
        assert_eq!(foreign.num_passes(), 0);

        assert!(manager.complete_temporal_bin(&mut foreign).unwrap_err().is_usage_error());
        assert!(!foreign.is_completed());

        other.complete_temporal_bin(&mut foreign).expect("first completion");
        assert!(manager.compute_output(&foreign).unwrap_err().is_usage_error());
        let mut result = manager.create_result_vector();
        assert!(manager.compute_result(&foreign, &mut result).unwrap_err().is_usage_error());
    }

    #[test]
    fn test_from_config() {
        let config = BinningConfig {
            variables: vec!["A".to_string(), "B".to_string()],
            aggregators: vec![AggregatorConfig::min_max("A"), AggregatorConfig::average("B")],
            post_processor: Some(PostProcessorConfig::selection(["B_mean", "A_max"])),
            ..Default::default()
        };
        let manager = BinManager::from_config(&config).expect("valid config");
        assert!(manager.has_post_processor());
        assert_eq!(manager.output_feature_names(), ["A_min", "A_max", "B_mean"]);
        assert_eq!(manager.result_feature_names(), ["B_mean", "A_max"]);
        assert_eq!(manager.aggregator(1).map(|a| a.name()), Some("AVG"));
        assert!(manager.aggregator(2).is_none());

        let bad = BinningConfig {
            aggregators: vec![AggregatorConfig::min_max("C")],
            ..config.clone()
        };
        assert!(BinManager::from_config(&bad).unwrap_err().is_configuration_error());

        let bad_selection = BinningConfig {
            post_processor: Some(PostProcessorConfig::selection(["A_mean"])),
            ..config
        };
        assert!(BinManager::from_config(&bad_selection)
            .unwrap_err()
            .is_configuration_error());
    }
}
