//! Terrabin Bins
//!
//! Spatial and temporal bin accumulators. A bin is a fixed-width buffer of
//! feature values plus an observation count and a lifecycle state; it knows
//! nothing about the aggregators writing into it. The [`BinManager`] lays out
//! the aggregator regions and drives every state transition.
//!
//! [`BinManager`]: crate::manager::BinManager
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use terrabin_common::{BinIndex, BinState, BinningError, Result};

// =============================================================================
// Spatial Bin
// =============================================================================

/// Accumulator for the observations of one cell during one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialBin {
    index: BinIndex,
    num_obs: u32,
    state: BinState,
    pub(crate) features: Box<[f64]>,
}

impl SpatialBin {
    pub(crate) fn new(index: BinIndex, width: usize) -> Self {
        Self {
            index,
            num_obs: 0,
            state: BinState::Created,
            features: vec![0.0; width].into_boxed_slice(),
        }
    }

    pub fn index(&self) -> BinIndex {
        self.index
    }

    /// Number of observations folded in, including those whose values were
    /// all NaN.
    pub fn num_obs(&self) -> u32 {
        self.num_obs
    }

    pub fn state(&self) -> BinState {
        self.state
    }

    pub fn is_completed(&self) -> bool {
        self.state.is_completed()
    }

    pub fn feature_values(&self) -> &[f64] {
        &self.features
    }

    pub(crate) fn begin_aggregate(&mut self) -> Result<()> {
        ensure_open("spatial", self.index, self.state)?;
        self.state = BinState::Aggregating;
        self.num_obs += 1;
        Ok(())
    }

    pub(crate) fn begin_complete(&mut self) -> Result<()> {
        ensure_open("spatial", self.index, self.state)?;
        self.state = BinState::Completed;
        Ok(())
    }
}

// =============================================================================
// Temporal Bin
// =============================================================================

/// Accumulator merging the spatial bins of one cell across passes.
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalBin {
    index: BinIndex,
    num_obs: u32,
    num_passes: u32,
    state: BinState,
    pub(crate) features: Box<[f64]>,
}

impl TemporalBin {
    pub(crate) fn new(index: BinIndex, width: usize) -> Self {
        Self {
            index,
            num_obs: 0,
            num_passes: 0,
            state: BinState::Created,
            features: vec![0.0; width].into_boxed_slice(),
        }
    }

    pub fn index(&self) -> BinIndex {
        self.index
    }

    /// Sum of the observation counts of every merged spatial bin.
    pub fn num_obs(&self) -> u32 {
        self.num_obs
    }

    /// Number of spatial bins merged in.
    pub fn num_passes(&self) -> u32 {
        self.num_passes
    }

    pub fn state(&self) -> BinState {
        self.state
    }

    pub fn is_completed(&self) -> bool {
        self.state.is_completed()
    }

    pub fn feature_values(&self) -> &[f64] {
        &self.features
    }

    pub(crate) fn begin_aggregate(&mut self, spatial: &SpatialBin) -> Result<()> {
        ensure_open("temporal", self.index, self.state)?;
        if !spatial.is_completed() {
            return Err(BinningError::Usage(format!(
                "spatial bin {} must be completed before it is merged (state: {})",
                spatial.index(),
                spatial.state()
            )));
        }
        self.state = BinState::Aggregating;
        self.num_obs += spatial.num_obs();
        self.num_passes += 1;
        Ok(())
    }

    pub(crate) fn begin_complete(&mut self) -> Result<()> {
        ensure_open("temporal", self.index, self.state)?;
        self.state = BinState::Completed;
        Ok(())
    }
}

fn ensure_open(kind: &str, index: BinIndex, state: BinState) -> Result<()> {
    if state.is_open() {
        Ok(())
    } else {
        Err(BinningError::Usage(format!(
            "{} bin {} is already completed",
            kind, index
        )))
    }
}

// =============================================================================
// Tests
// =============================================================================
