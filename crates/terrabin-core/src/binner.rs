//! Terrabin Binners
//!
//! Drivers that feed the bin manager. The spatial binner folds one pass of
//! observations into spatial bins keyed by the cell index an external
//! indexing scheme assigns; the temporal binner merges completed spatial
//! bins from any number of passes and workers into one temporal bin per
//! cell.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::bin::{SpatialBin, TemporalBin};
use crate::manager::BinManager;
use crate::observation::Observation;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use terrabin_common::{BinIndex, BinningError, Result};

// =============================================================================
// Bin Indexing
// =============================================================================

/// Maps a geographic position to the index of the cell containing it.
pub trait BinIndexer: Send + Sync {
    /// Cell index for the position, or `None` if the position lies outside
    /// the grid.
    fn bin_index(&self, latitude: f64, longitude: f64) -> Option<BinIndex>;
}

impl<F> BinIndexer for F
where
    F: Fn(f64, f64) -> Option<BinIndex> + Send + Sync,
{
    fn bin_index(&self, latitude: f64, longitude: f64) -> Option<BinIndex> {
        self(latitude, longitude)
    }
}

/// Plain latitude/longitude grid of `num_rows` rows and `2 * num_rows`
/// columns. Row 0 starts at the north pole, column 0 at 180°W. Cells are not
/// equal-area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegularGrid {
    num_rows: usize,
}

impl RegularGrid {
    pub fn new(num_rows: usize) -> Result<Self> {
        if num_rows == 0 {
            return Err(BinningError::configuration("grid must have at least one row"));
        }
        Ok(Self { num_rows })
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_cols(&self) -> usize {
        2 * self.num_rows
    }

    pub fn num_bins(&self) -> usize {
        self.num_rows * self.num_cols()
    }

    /// Center latitude and longitude of a cell.
    pub fn center(&self, index: BinIndex) -> Option<(f64, f64)> {
        if index < 0 || index as usize >= self.num_bins() {
            return None;
        }
        let index = index as usize;
        let cell = 180.0 / self.num_rows as f64;
        let row = index / self.num_cols();
        let col = index % self.num_cols();
        Some((
            90.0 - (row as f64 + 0.5) * cell,
            -180.0 + (col as f64 + 0.5) * cell,
        ))
    }
}

impl BinIndexer for RegularGrid {
    fn bin_index(&self, latitude: f64, longitude: f64) -> Option<BinIndex> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }
        let cell = 180.0 / self.num_rows as f64;
        let row = (((90.0 - latitude) / cell) as usize).min(self.num_rows - 1);
        let col = (((longitude + 180.0) / cell) as usize).min(self.num_cols() - 1);
        Some((row * self.num_cols() + col) as BinIndex)
    }
}

// =============================================================================
// Spatial Binner
// =============================================================================

/// Folds one pass of observations into spatial bins.
pub struct SpatialBinner<I: BinIndexer> {
    manager: Arc<BinManager>,
    indexer: I,
    bins: HashMap<BinIndex, SpatialBin>,
    observation_count: u64,
    dropped_count: u64,
}

impl<I: BinIndexer> SpatialBinner<I> {
    pub fn new(manager: Arc<BinManager>, indexer: I) -> Self {
        Self {
            manager,
            indexer,
            bins: HashMap::new(),
            observation_count: 0,
            dropped_count: 0,
        }
    }

    /// Fold one observation into the bin of its cell. Observations outside
    /// the grid are counted and dropped.
    pub fn process_observation(&mut self, observation: &Observation) -> Result<()> {
        self.observation_count += 1;
        let Some(index) = self
            .indexer
            .bin_index(observation.latitude, observation.longitude)
        else {
            self.dropped_count += 1;
            return Ok(());
        };

        let manager = &self.manager;
        let bin = self
            .bins
            .entry(index)
            .or_insert_with(|| manager.create_spatial_bin(index));
        manager.aggregate_spatial_bin(observation, bin)
    }

    pub fn process_observations<'a>(
        &mut self,
        observations: impl IntoIterator<Item = &'a Observation>,
    ) -> Result<()> {
        for observation in observations {
            self.process_observation(observation)?;
        }
        Ok(())
    }

    /// Complete every active bin and hand them over, ordered by index. The
    /// binner is empty afterwards, with its counters reset, and can start the
    /// next pass.
    pub fn complete(&mut self) -> Result<Vec<SpatialBin>> {
        let mut bins: Vec<SpatialBin> = self.bins.drain().map(|(_, bin)| bin).collect();
        bins.sort_by_key(|bin| bin.index());
        for bin in &mut bins {
            self.manager.complete_spatial_bin(bin)?;
        }
        tracing::debug!(
            "Completed {} spatial bins from {} observations ({} dropped)",
            bins.len(),
            self.observation_count,
            self.dropped_count
        );
        self.observation_count = 0;
        self.dropped_count = 0;
        Ok(bins)
    }

    pub fn observation_count(&self) -> u64 {
        self.observation_count
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped_count
    }

    pub fn active_bin_count(&self) -> usize {
        self.bins.len()
    }
}

// =============================================================================
// Temporal Binner
// =============================================================================

/// Merges completed spatial bins into one temporal bin per cell.
///
/// Each cell has its own lock, so workers merging different cells never
/// wait on each other.
pub struct TemporalBinner {
    manager: Arc<BinManager>,
    bins: RwLock<HashMap<BinIndex, Arc<Mutex<TemporalBin>>>>,
}

impl TemporalBinner {
    pub fn new(manager: Arc<BinManager>) -> Self {
        Self {
            manager,
            bins: RwLock::new(HashMap::new()),
        }
    }

    /// Merge one completed spatial bin, creating the temporal bin of its
    /// cell on first use.
    pub fn merge(&self, spatial_bin: &SpatialBin) -> Result<()> {
        let cell = self.cell(spatial_bin.index());
        let mut temporal_bin = cell.lock();
        self.manager.aggregate_temporal_bin(spatial_bin, &mut temporal_bin)
    }

    pub fn merge_all<'a>(&self, spatial_bins: impl IntoIterator<Item = &'a SpatialBin>) -> Result<()> {
        for spatial_bin in spatial_bins {
            self.merge(spatial_bin)?;
        }
        Ok(())
    }

    fn cell(&self, index: BinIndex) -> Arc<Mutex<TemporalBin>> {
        if let Some(cell) = self.bins.read().get(&index) {
            return Arc::clone(cell);
        }
        let mut bins = self.bins.write();
        Arc::clone(
            bins.entry(index)
                .or_insert_with(|| Arc::new(Mutex::new(self.manager.create_temporal_bin(index)))),
        )
    }

    pub fn bin_count(&self) -> usize {
        self.bins.read().len()
    }

    /// Complete every temporal bin and return them ordered by index.
    pub fn complete(self) -> Result<Vec<TemporalBin>> {
        let mut bins: Vec<TemporalBin> = self
            .bins
            .into_inner()
            .into_values()
            .map(|cell| {
                Arc::try_unwrap(cell)
                    .map(Mutex::into_inner)
                    .unwrap_or_else(|cell| cell.lock().clone())
            })
            .collect();
        bins.sort_by_key(|bin| bin.index());
        for bin in &mut bins {
            self.manager.complete_temporal_bin(bin)?;
        }
        tracing::debug!("Completed {} temporal bins", bins.len());
        Ok(bins)
    }
}

// =============================================================================
// Results
// =============================================================================

/// Final result features of one cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinResult {
    pub index: BinIndex,
    pub num_obs: u32,
    pub num_passes: u32,
    pub values: Vec<f64>,
}

/// Compute the result features of completed temporal bins.
pub fn compute_results(manager: &BinManager, bins: &[TemporalBin]) -> Result<Vec<BinResult>> {
    bins.iter()
        .map(|bin| {
            let mut result = manager.create_result_vector();
            manager.compute_result(bin, &mut result)?;
            Ok(BinResult {
                index: bin.index(),
                num_obs: bin.num_obs(),
                num_passes: bin.num_passes(),
                values: result.into_vec(),
            })
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
