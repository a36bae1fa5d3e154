//! Terrabin Config - Configuration Structures
//!
//! Configuration types describing a binning run: the input variables, the
//! ordered aggregator list, the optional post-processing stage and the grid
//! resolution used by the bundled drivers. Supports loading from TOML files
//! and programmatic construction.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::error::{BinningError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

// =============================================================================
// Constants
// =============================================================================

/// Default number of grid rows (roughly 9.28 km cells at the equator).
pub const DEFAULT_NUM_ROWS: usize = 2160;

/// Default exponent applied to a spatial bin's observation count when it is
/// weighted into a temporal mean.
pub const DEFAULT_WEIGHT_COEFF: f64 = 1.0;

// =============================================================================
// Aggregator Configuration
// =============================================================================

/// Configuration for a single aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AggregatorConfig {
    /// Minimum and maximum of one variable.
    MinMax { var_name: String },
    /// Count-weighted arithmetic mean, optionally with its standard deviation.
    Average {
        var_name: String,
        #[serde(default)]
        weight_coeff: Option<f64>,
        #[serde(default)]
        output_sigma: bool,
    },
    /// Maximum-likelihood mean of a log-normally distributed variable.
    AverageMl {
        var_name: String,
        #[serde(default)]
        weight_coeff: Option<f64>,
    },
}

impl AggregatorConfig {
    pub fn min_max(var_name: impl Into<String>) -> Self {
        Self::MinMax {
            var_name: var_name.into(),
        }
    }

    pub fn average(var_name: impl Into<String>) -> Self {
        Self::Average {
            var_name: var_name.into(),
            weight_coeff: None,
            output_sigma: false,
        }
    }

    pub fn average_ml(var_name: impl Into<String>) -> Self {
        Self::AverageMl {
            var_name: var_name.into(),
            weight_coeff: None,
        }
    }

    /// Name of the aggregator kind as written in configuration files.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MinMax { .. } => "min-max",
            Self::Average { .. } => "average",
            Self::AverageMl { .. } => "average-ml",
        }
    }

    /// The input variables this aggregator reads.
    pub fn var_names(&self) -> Vec<&str> {
        match self {
            Self::MinMax { var_name }
            | Self::Average { var_name, .. }
            | Self::AverageMl { var_name, .. } => vec![var_name.as_str()],
        }
    }

    /// Effective temporal weighting exponent.
    pub fn weight_coeff(&self) -> f64 {
        match self {
            Self::MinMax { .. } => DEFAULT_WEIGHT_COEFF,
            Self::Average { weight_coeff, .. } | Self::AverageMl { weight_coeff, .. } => {
                weight_coeff.unwrap_or(DEFAULT_WEIGHT_COEFF)
            }
        }
    }
}

// =============================================================================
// Post-Processor Configuration
// =============================================================================

/// Configuration for the optional post-processing stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PostProcessorConfig {
    /// Select a subset of the aggregators' output features by name.
    Selection { variables: Vec<String> },
}

impl PostProcessorConfig {
    pub fn selection<I, S>(variables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Selection {
            variables: variables.into_iter().map(Into::into).collect(),
        }
    }

    /// Names of the features the post-processor will produce.
    pub fn output_feature_names(&self) -> &[String] {
        match self {
            Self::Selection { variables } => variables,
        }
    }
}

// =============================================================================
// Binning Configuration
// =============================================================================

/// Top-level configuration of a binning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinningConfig {
    #[serde(default = "default_num_rows")]
    pub num_rows: usize,
    pub variables: Vec<String>,
    pub aggregators: Vec<AggregatorConfig>,
    #[serde(default)]
    pub post_processor: Option<PostProcessorConfig>,
}

fn default_num_rows() -> usize {
    DEFAULT_NUM_ROWS
}

impl Default for BinningConfig {
    fn default() -> Self {
        Self {
            num_rows: DEFAULT_NUM_ROWS,
            variables: Vec::new(),
            aggregators: Vec::new(),
            post_processor: None,
        }
    }
}

impl BinningConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| BinningError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML text.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| BinningError::Configuration(e.to_string()))
    }

    /// Check the structural constraints that do not need a variable context.
    pub fn validate(&self) -> Result<()> {
        if self.num_rows == 0 {
            return Err(BinningError::configuration("num_rows must be positive"));
        }
        if self.variables.is_empty() {
            return Err(BinningError::configuration("no variables defined"));
        }
        if self.aggregators.is_empty() {
            return Err(BinningError::configuration("no aggregators defined"));
        }
        for aggregator in &self.aggregators {
            let coeff = aggregator.weight_coeff();
            if !coeff.is_finite() || coeff < 0.0 {
                return Err(BinningError::Configuration(format!(
                    "{} aggregator has invalid weight_coeff {}",
                    aggregator.kind(),
                    coeff
                )));
            }
        }
        if let Some(PostProcessorConfig::Selection { variables }) = &self.post_processor {
            if variables.is_empty() {
                return Err(BinningError::configuration(
                    "selection post-processor selects no features",
                ));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
