//! End-to-end binning tests
//!
//! Drives the bin manager through complete spatial → temporal → result runs,
//! with and without post-processing.

use terrabin_core::{
    Aggregator, AggregatorAverage, AggregatorAverageMl, AggregatorMinMax, BinManager,
    Observation, PostProcessor, PostProcessorConfig, SpatialBin, TemporalBin, VariableContext,
    Vector, WritableVector,
};

fn obs(value: f64) -> Observation {
    Observation::new(0.0, 0.0, 0.0, vec![value])
}

fn min_max_manager(post_processor: Option<PostProcessorConfig>) -> BinManager {
    let ctx = VariableContext::new(["A"]);
    let aggregators: Vec<Box<dyn Aggregator>> =
        vec![Box::new(AggregatorMinMax::new(&ctx, "A").expect("A is defined"))];
    match post_processor {
        Some(config) => BinManager::with_post_processor(ctx, aggregators, &config)
            .expect("selection names an output feature"),
        None => BinManager::new(ctx, aggregators),
    }
}

/// One completed spatial bin per entry of `passes`, all for cell 0.
fn spatial_bins(manager: &BinManager, passes: &[&[f64]]) -> Vec<SpatialBin> {
    passes
        .iter()
        .map(|values| {
            let mut bin = manager.create_spatial_bin(0);
            for &value in *values {
                manager.aggregate_spatial_bin(&obs(value), &mut bin).expect("open bin");
            }
            manager.complete_spatial_bin(&mut bin).expect("first completion");
            bin
        })
        .collect()
}

fn merge(manager: &BinManager, bins: &[&SpatialBin]) -> TemporalBin {
    let mut tbin = manager.create_temporal_bin(0);
    for sbin in bins {
        manager.aggregate_temporal_bin(sbin, &mut tbin).expect("open temporal bin");
    }
    manager.complete_temporal_bin(&mut tbin).expect("first completion");
    tbin
}

/// Bins 0.2, 0.6 and 0.4 in three separate spatial bins merged into one
/// temporal bin.
fn do_binning(manager: &BinManager) -> TemporalBin {
    let sbins = spatial_bins(manager, &[&[0.2], &[0.6], &[0.4]]);
    let tbin = merge(manager, &sbins.iter().collect::<Vec<_>>());

    assert_eq!(tbin.num_obs(), 3);
    let t_vec = manager.temporal_vector(&tbin, 0).expect("region");
    assert_eq!(t_vec.size(), 2);
    assert!((t_vec.get(0) - 0.2).abs() < 1e-5);
    assert!((t_vec.get(1) - 0.6).abs() < 1e-5);
    tbin
}

fn permutations(n: usize) -> Vec<Vec<usize>> {
    if n == 0 {
        return vec![Vec::new()];
    }
    let mut all = Vec::new();
    for perm in permutations(n - 1) {
        for position in 0..=perm.len() {
            let mut next = perm.clone();
            next.insert(position, n - 1);
            all.push(next);
        }
    }
    all
}

// =============================================================================
// End-to-end Runs
// =============================================================================

#[test]
fn test_binning_without_post_processor() {
    let manager = min_max_manager(None);
    let tbin = do_binning(&manager);
    assert_eq!(tbin.feature_values().len(), 2);

    let mut result = manager.create_result_vector();
    assert_eq!(result.size(), 2);
    manager.compute_result(&tbin, &mut result).expect("completed bin");
    assert_eq!(result.size(), 2);
    assert!((result.get(0) - 0.2).abs() < 1e-4);
    assert!((result.get(1) - 0.6).abs() < 1e-4);

    assert_eq!(manager.result_feature_names(), ["A_min", "A_max"]);
}

#[test]
fn test_binning_with_selection_post_processor() {
    let manager = min_max_manager(Some(PostProcessorConfig::selection(["A_max"])));
    let tbin = do_binning(&manager);
    assert_eq!(tbin.feature_values().len(), 2);

    let mut result = manager.create_result_vector();
    assert_eq!(result.size(), 1);
    manager.compute_result(&tbin, &mut result).expect("completed bin");
    assert!((result.get(0) - 0.6).abs() < 1e-4);

    assert_eq!(manager.result_feature_names(), ["A_max"]);
}

#[test]
fn test_all_nan_observations_yield_nan_features() {
    let manager = min_max_manager(None);
    let sbins = spatial_bins(&manager, &[&[f64::NAN], &[f64::NAN], &[f64::NAN]]);
    let tbin = merge(&manager, &sbins.iter().collect::<Vec<_>>());
    assert_eq!(tbin.num_obs(), 3);

    let mut result = manager.create_result_vector();
    manager.compute_result(&tbin, &mut result).expect("NaN is a value, not an error");
    assert!(result.get(0).is_nan());
    assert!(result.get(1).is_nan());
}

#[test]
fn test_average_weights_passes_by_observation_count() {
    let ctx = VariableContext::new(["A"]);
    let manager = BinManager::new(
        ctx.clone(),
        vec![Box::new(AggregatorAverage::new(&ctx, "A").expect("A is defined")) as Box<dyn Aggregator>],
    );
    let sbins = spatial_bins(&manager, &[&[0.2, 0.4], &[0.5, 0.6, 0.7]]);
    assert_eq!(sbins[0].num_obs(), 2);
    assert!((manager.spatial_vector(&sbins[0], 0).expect("region").get(0) - 0.3).abs() < 1e-12);
    assert!((manager.spatial_vector(&sbins[1], 0).expect("region").get(0) - 0.6).abs() < 1e-12);

    let tbin = merge(&manager, &sbins.iter().collect::<Vec<_>>());
    assert_eq!(tbin.num_obs(), 5);
    assert!((manager.temporal_vector(&tbin, 0).expect("region").get(0) - 0.48).abs() < 1e-12);

    let mut result = manager.create_result_vector();
    manager.compute_result(&tbin, &mut result).expect("completed bin");
    assert!((result.get(0) - 0.48).abs() < 1e-12);
    assert!((result.get(0) - 0.45).abs() > 1e-3);
}

// =============================================================================
// Binning Invariants
// =============================================================================

#[test]
fn test_widths_equal_declared_feature_counts() {
    let ctx = VariableContext::new(["A", "B", "C"]);
    let aggregators: Vec<Box<dyn Aggregator>> = vec![
        Box::new(AggregatorMinMax::new(&ctx, "C").expect("C is defined")),
        Box::new(AggregatorAverageMl::new(&ctx, "B").expect("B is defined")),
        Box::new(AggregatorAverage::new(&ctx, "A").expect("A is defined").with_sigma(true)),
    ];
    let spatial: usize = aggregators.iter().map(|a| a.spatial_feature_names().len()).sum();
    let temporal: usize = aggregators.iter().map(|a| a.temporal_feature_names().len()).sum();
    let output: usize = aggregators.iter().map(|a| a.output_feature_names().len()).sum();

    let manager = BinManager::new(ctx, aggregators);
    assert_eq!(manager.create_spatial_bin(9).feature_values().len(), spatial);
    assert_eq!(manager.create_temporal_bin(9).feature_values().len(), temporal);
    assert_eq!(manager.create_result_vector().size(), output);
    assert_eq!(manager.output_feature_names().len(), output);
}

#[test]
fn test_observation_count_ignores_nan() {
    let manager = min_max_manager(None);
    let mut bin = manager.create_spatial_bin(0);
    for value in [1.0, f64::NAN, 2.0, f64::NAN, f64::NAN] {
        manager.aggregate_spatial_bin(&obs(value), &mut bin).expect("open bin");
    }
    assert_eq!(bin.num_obs(), 5);
}

#[test]
fn test_merge_order_independence() {
    let ctx = VariableContext::new(["A"]);
    let manager = BinManager::new(
        ctx.clone(),
        vec![
            Box::new(AggregatorMinMax::new(&ctx, "A").expect("A is defined")) as Box<dyn Aggregator>,
            Box::new(AggregatorAverage::new(&ctx, "A").expect("A is defined").with_sigma(true)),
        ],
    );
    let sbins = spatial_bins(
        &manager,
        &[&[0.11, 0.52, f64::NAN], &[0.9], &[0.33, 0.27, 0.61, 0.05]],
    );

    let reference = merge(&manager, &sbins.iter().collect::<Vec<_>>());
    for order in permutations(sbins.len()) {
        let ordered: Vec<&SpatialBin> = order.iter().map(|&i| &sbins[i]).collect();
        let tbin = merge(&manager, &ordered);
        assert_eq!(tbin.num_obs(), reference.num_obs());
        for (a, b) in tbin.feature_values().iter().zip(reference.feature_values()) {
            assert!((a - b).abs() < 1e-12, "order {:?}: {} != {}", order, a, b);
        }
    }
}

#[test]
fn test_result_names_match_result_size() {
    let ctx = VariableContext::new(["A", "B"]);
    let aggregators: Vec<Box<dyn Aggregator>> = vec![
        Box::new(AggregatorMinMax::new(&ctx, "A").expect("A is defined")),
        Box::new(AggregatorAverageMl::new(&ctx, "B").expect("B is defined")),
    ];
    let manager = BinManager::new(ctx, aggregators);
    let sbin = {
        let mut bin = manager.create_spatial_bin(0);
        manager
            .aggregate_spatial_bin(&Observation::new(0.0, 0.0, 0.0, vec![1.0, 2.0]), &mut bin)
            .expect("open bin");
        manager.complete_spatial_bin(&mut bin).expect("first completion");
        bin
    };
    let tbin = merge(&manager, &[&sbin]);
    let mut result = manager.create_result_vector();
    manager.compute_result(&tbin, &mut result).expect("completed bin");
    assert_eq!(manager.result_feature_names().len(), result.size());
    assert!((result.get(2) - 2.0).abs() < 1e-9);
}

#[test]
fn test_selection_narrows_any_aggregator_set() {
    let ctx = VariableContext::new(["A", "B"]);
    let aggregators: Vec<Box<dyn Aggregator>> = vec![
        Box::new(AggregatorMinMax::new(&ctx, "A").expect("A is defined")),
        Box::new(AggregatorAverage::new(&ctx, "B").expect("B is defined")),
        Box::new(AggregatorAverageMl::new(&ctx, "B").expect("B is defined")),
    ];
    let manager = BinManager::with_post_processor(
        ctx,
        aggregators,
        &PostProcessorConfig::selection(["A_max"]),
    )
    .expect("A_max is an output feature");

    let mut sbin = manager.create_spatial_bin(0);
    for (a, b) in [(0.2, 1.0), (0.6, 2.0), (0.4, 3.0)] {
        manager
            .aggregate_spatial_bin(&Observation::new(0.0, 0.0, 0.0, vec![a, b]), &mut sbin)
            .expect("open bin");
    }
    manager.complete_spatial_bin(&mut sbin).expect("first completion");
    let tbin = merge(&manager, &[&sbin]);

    let mut result = manager.create_result_vector();
    assert_eq!(result.size(), 1);
    manager.compute_result(&tbin, &mut result).expect("completed bin");
    assert!((result.get(0) - 0.6).abs() < 1e-12);
    assert_eq!(manager.result_feature_names(), ["A_max"]);
}

// =============================================================================
// Configuration Errors
// =============================================================================

#[test]
fn test_unknown_variable_is_configuration_error() {
    let ctx = VariableContext::new(["A"]);
    let err = AggregatorMinMax::new(&ctx, "B").unwrap_err();
    assert!(err.is_configuration_error());
}

#[test]
fn test_unknown_selection_is_configuration_error() {
    let ctx = VariableContext::new(["A"]);
    let aggregators: Vec<Box<dyn Aggregator>> =
        vec![Box::new(AggregatorMinMax::new(&ctx, "A").expect("A is defined"))];
    let err = BinManager::with_post_processor(
        ctx,
        aggregators,
        &PostProcessorConfig::selection(["A_mean"]),
    )
    .unwrap_err();
    assert!(err.is_configuration_error());
}

// =============================================================================
// Custom Post-Processor
// =============================================================================

#[derive(Debug)]
struct Times100 {
    feature_names: Vec<String>,
}

impl PostProcessor for Times100 {
    fn output_feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn compute(&self, output: &dyn Vector, result: &mut dyn WritableVector) {
        for i in 0..output.size() {
            result.set(i, output.get(i) * 100.0);
        }
    }
}

#[test]
fn test_custom_post_processor() {
    let ctx = VariableContext::new(["A"]);
    let aggregators: Vec<Box<dyn Aggregator>> =
        vec![Box::new(AggregatorMinMax::new(&ctx, "A").expect("A is defined"))];
    let manager = BinManager::with_custom_post_processor(
        ctx,
        aggregators,
        Box::new(Times100 {
            feature_names: vec!["A_min_pct".to_string(), "A_max_pct".to_string()],
        }),
    );
    let tbin = do_binning(&manager);

    let mut result = manager.create_result_vector();
    manager.compute_result(&tbin, &mut result).expect("completed bin");
    assert!((result.get(0) - 20.0).abs() < 1e-9);
    assert!((result.get(1) - 60.0).abs() < 1e-9);
    assert_eq!(manager.result_feature_names(), ["A_min_pct", "A_max_pct"]);
}
