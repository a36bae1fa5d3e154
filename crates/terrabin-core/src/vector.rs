//! Terrabin Vector - Fixed-Size Feature Vectors
//!
//! Index-addressed numeric containers used for bin regions, output vectors
//! and post-processor results. A vector's size is fixed when it is created.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use std::fmt;
use std::ops::Index;

// =============================================================================
// Vector Traits
// =============================================================================

/// Read-only view of a fixed-size sequence of feature values.
pub trait Vector {
    /// Number of elements. Never changes for a given instance.
    fn size(&self) -> usize;

    /// Value at `index`. Panics if `index >= size()`.
    fn get(&self, index: usize) -> f64;

    /// Copy the elements into a new `Vec`.
    fn to_vec(&self) -> Vec<f64> {
        (0..self.size()).map(|i| self.get(i)).collect()
    }
}

/// Mutable view of a fixed-size sequence of feature values.
pub trait WritableVector: Vector {
    /// Set the value at `index`. Panics if `index >= size()`.
    fn set(&mut self, index: usize, value: f64);

    /// Set every element to `value`.
    fn fill(&mut self, value: f64) {
        for i in 0..self.size() {
            self.set(i, value);
        }
    }
}

// =============================================================================
// Feature Vector
// =============================================================================

/// Owned, heap-allocated vector with a fixed size.
#[derive(Clone, PartialEq)]
pub struct FeatureVector {
    values: Box<[f64]>,
}

impl FeatureVector {
    /// Create a zero-filled vector of `size` elements.
    pub fn new(size: usize) -> Self {
        Self {
            values: vec![0.0; size].into_boxed_slice(),
        }
    }

    pub fn from_values(values: Vec<f64>) -> Self {
        Self {
            values: values.into_boxed_slice(),
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.values
    }

    pub fn view(&self) -> VectorView<'_> {
        VectorView::new(&self.values)
    }

    pub fn view_mut(&mut self) -> VectorViewMut<'_> {
        VectorViewMut::new(&mut self.values)
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.values.into_vec()
    }
}

impl Vector for FeatureVector {
    fn size(&self) -> usize {
        self.values.len()
    }

    fn get(&self, index: usize) -> f64 {
        self.values[index]
    }
}

impl WritableVector for FeatureVector {
    fn set(&mut self, index: usize, value: f64) {
        self.values[index] = value;
    }
}

impl Index<usize> for FeatureVector {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.values[index]
    }
}

impl fmt::Debug for FeatureVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.values.iter()).finish()
    }
}

// =============================================================================
// Borrowed Views
// =============================================================================

/// Read-only window onto a region of bin storage.
#[derive(Clone, Copy, PartialEq)]
pub struct VectorView<'a> {
    values: &'a [f64],
}

impl<'a> VectorView<'a> {
    pub fn new(values: &'a [f64]) -> Self {
        Self { values }
    }

    pub fn as_slice(&self) -> &'a [f64] {
        self.values
    }
}

impl Vector for VectorView<'_> {
    fn size(&self) -> usize {
        self.values.len()
    }

    fn get(&self, index: usize) -> f64 {
        self.values[index]
    }
}

impl fmt::Debug for VectorView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.values.iter()).finish()
    }
}

/// Mutable window onto a region of bin storage.
pub struct VectorViewMut<'a> {
    values: &'a mut [f64],
}

impl<'a> VectorViewMut<'a> {
    pub fn new(values: &'a mut [f64]) -> Self {
        Self { values }
    }

    pub fn as_slice(&self) -> &[f64] {
        self.values
    }
}

impl Vector for VectorViewMut<'_> {
    fn size(&self) -> usize {
        self.values.len()
    }

    fn get(&self, index: usize) -> f64 {
        self.values[index]
    }
}

impl WritableVector for VectorViewMut<'_> {
    fn set(&mut self, index: usize, value: f64) {
        self.values[index] = value;
    }
}

impl fmt::Debug for VectorViewMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.values.iter()).finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
