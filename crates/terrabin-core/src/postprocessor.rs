//! Terrabin Post-Processing
//!
//! Optional last stage of result computation. A post-processor receives the
//! concatenated output features of all aggregators and writes its own,
//! usually smaller, named feature set. Post-processors are shared by every
//! worker computing results, so they hold no mutable state.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::vector::{Vector, WritableVector};
use std::fmt;
use terrabin_common::{BinningError, PostProcessorConfig, Result};

// =============================================================================
// Post-Processor Trait
// =============================================================================

/// Final transform from aggregator outputs to result features.
pub trait PostProcessor: Send + Sync + fmt::Debug {
    /// Names of the produced features; their count is the result width.
    fn output_feature_names(&self) -> &[String];

    /// Fill every slot of `result` from `output`.
    fn compute(&self, output: &dyn Vector, result: &mut dyn WritableVector);
}

/// Build the post-processor described by `config` for a bin manager whose
/// aggregators produce `output_feature_names`.
pub fn create_post_processor(
    config: &PostProcessorConfig,
    output_feature_names: &[String],
) -> Result<Box<dyn PostProcessor>> {
    match config {
        PostProcessorConfig::Selection { variables } => Ok(Box::new(Selection::new(
            variables.clone(),
            output_feature_names,
        )?)),
    }
}

// =============================================================================
// Selection
// =============================================================================

/// Selects named aggregator outputs, in the order they were requested.
#[derive(Debug, Clone)]
pub struct Selection {
    feature_names: Vec<String>,
    source_indices: Vec<usize>,
}

impl Selection {
    pub fn new(feature_names: Vec<String>, output_feature_names: &[String]) -> Result<Self> {
        if feature_names.is_empty() {
            return Err(BinningError::configuration("selection selects no features"));
        }
        let source_indices = feature_names
            .iter()
            .map(|name| {
                output_feature_names
                    .iter()
                    .position(|candidate| candidate == name)
                    .ok_or_else(|| {
                        BinningError::Configuration(format!(
                            "selected feature '{}' is not an output feature (available: {})",
                            name,
                            output_feature_names.join(", ")
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            feature_names,
            source_indices,
        })
    }

    /// Positions of the selected features in the aggregator output vector.
    pub fn source_indices(&self) -> &[usize] {
        &self.source_indices
    }
}

impl PostProcessor for Selection {
    fn output_feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn compute(&self, output: &dyn Vector, result: &mut dyn WritableVector) {
        for (target, &source) in self.source_indices.iter().enumerate() {
            result.set(target, output.get(source));
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
