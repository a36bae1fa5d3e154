//! Terrabin Variable Context
//!
//! Ordered registry of the input variables an observation carries. The
//! position of a name is the index of its value inside every observation.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use indexmap::IndexSet;
use terrabin_common::{BinningError, Result};

// =============================================================================
// Variable Context
// =============================================================================

/// Immutable, de-duplicated mapping from variable name to value index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableContext {
    names: IndexSet<String>,
}

impl VariableContext {
    /// Build a context from an ordered list of names. A name that appears
    /// more than once keeps the index of its first occurrence.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = IndexSet::new();
        for name in names {
            let name = name.into();
            if set.contains(&name) {
                tracing::debug!("Ignoring duplicate variable definition '{}'", name);
                continue;
            }
            set.insert(name);
        }
        Self { names: set }
    }

    pub fn variable_count(&self) -> usize {
        self.names.len()
    }

    pub fn variable_index(&self, name: &str) -> Option<usize> {
        self.names.get_index_of(name)
    }

    pub fn variable_name(&self, index: usize) -> Option<&str> {
        self.names.get_index(index).map(String::as_str)
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Resolve a variable an aggregator reads, failing if it is undefined.
    pub fn require(&self, name: &str) -> Result<usize> {
        self.variable_index(name).ok_or_else(|| {
            BinningError::Configuration(format!(
                "unknown variable '{}' (defined: {})",
                name,
                self.names.iter().cloned().collect::<Vec<_>>().join(", ")
            ))
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
