//! Terrabin Error - Unified Error Types
//!
//! Error handling for all binning operations. Misconfiguration is reported
//! while a bin manager is being built, before any observation is processed;
//! lifecycle misuse is reported by the offending bin operation. Degenerate
//! numeric input is never an error: it surfaces as a NaN feature value.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Unified error type for all binning operations.
#[derive(Error, Debug)]
pub enum BinningError {
    // Setup errors
    #[error("configuration error: {0}")]
    Configuration(String),

    // Lifecycle errors
    #[error("usage error: {0}")]
    Usage(String),

    // Input errors
    #[error("parse error: {0}")]
    Parse(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Type Aliases
// =============================================================================

/// Result type alias for binning operations.
pub type Result<T> = std::result::Result<T, BinningError>;

// =============================================================================
// Error Classification
// =============================================================================

impl BinningError {
    /// Shorthand for a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Shorthand for a usage error.
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    /// Returns true if this error was raised while setting up a bin manager.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, BinningError::Configuration(_))
    }

    /// Returns true if a bin lifecycle method was invoked out of order.
    pub fn is_usage_error(&self) -> bool {
        matches!(self, BinningError::Usage(_))
    }
}

// =============================================================================
// Tests
// =============================================================================
