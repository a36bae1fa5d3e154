//! Terrabin Common - Shared Types and Utilities
//!
//! Foundational types, error handling, and configuration used across the
//! Terrabin binning components. Provides the core abstractions that keep the
//! aggregation engine, the binner drivers and the command-line tool in step.
//!
//! Key Features:
//! - Unified error type separating configuration from usage errors
//! - Core identifiers and lifecycle states for spatial and temporal bins
//! - Serializable binning configuration with TOML loading
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

pub mod config;
pub mod error;
pub mod types;

pub use config::{AggregatorConfig, BinningConfig, PostProcessorConfig};
pub use error::{BinningError, Result};
pub use types::*;
