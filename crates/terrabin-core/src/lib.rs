//! Terrabin Core - Binning Aggregation Engine
//!
//! Reduces streams of geolocated observations into per-cell statistical
//! summaries. Observations are first folded into spatial bins (one cell, one
//! pass), completed spatial bins are merged into temporal bins (one cell,
//! many passes), and completed temporal bins are rendered into named output
//! features through an optional post-processing stage.
//!
//! Key Features:
//! - Pluggable aggregators (min/max, mean, maximum-likelihood mean)
//! - Flat fixed-width bin storage addressed by per-aggregator regions
//! - Explicit bin lifecycle with misuse rejected as usage errors
//! - Stateless post-processors safe to share across worker threads
//! - Spatial and temporal binner drivers with a per-cell merge lock
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

pub mod aggregators;
pub mod bin;
pub mod binner;
pub mod context;
pub mod manager;
pub mod observation;
pub mod postprocessor;
pub mod vector;

pub use aggregators::{create_aggregator, Aggregator, AggregatorAverage, AggregatorAverageMl, AggregatorMinMax};
pub use bin::{SpatialBin, TemporalBin};
pub use binner::{compute_results, BinIndexer, BinResult, RegularGrid, SpatialBinner, TemporalBinner};
pub use context::VariableContext;
pub use manager::BinManager;
pub use observation::Observation;
pub use postprocessor::{create_post_processor, PostProcessor, Selection};
pub use vector::{FeatureVector, Vector, VectorView, VectorViewMut, WritableVector};

pub use terrabin_common::{
    AggregatorConfig, BinIndex, BinState, BinningConfig, BinningError, PostProcessorConfig, Result,
};
