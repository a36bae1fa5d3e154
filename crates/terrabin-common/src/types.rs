//! Terrabin Types - Core Data Types
//!
//! Identifiers and lifecycle states shared by spatial and temporal bins.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Identifier Types
// =============================================================================

/// Index of a spatial cell, as produced by an external bin-indexing scheme.
pub type BinIndex = i64;

// =============================================================================
// Bin Lifecycle
// =============================================================================

/// Lifecycle state of a spatial or temporal bin.
///
/// A bin starts `Created`, moves to `Aggregating` on its first fold and ends
/// `Completed`. `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BinState {
    #[default]
    Created,
    Aggregating,
    Completed,
}

impl BinState {
    /// Returns true if the bin may still receive contributions.
    pub fn is_open(&self) -> bool {
        !matches!(self, BinState::Completed)
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, BinState::Completed)
    }
}

impl fmt::Display for BinState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BinState::Created => "created",
            BinState::Aggregating => "aggregating",
            BinState::Completed => "completed",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Tests
// =============================================================================
