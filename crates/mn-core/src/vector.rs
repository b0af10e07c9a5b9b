use serde::{Deserialize, Serialize};

use crate::error::{MnError, Result};

/// Fixed-dimension embedding position.
///
/// Serializes as a flat array of floats. Arithmetic between two vectors
/// requires equal dimension and returns `DimensionMismatch` otherwise.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vector(Vec<f64>);

impl Vector {
    pub fn new(components: Vec<f64>) -> Self {
        Self(components)
    }

    /// Origin of a `dim`-dimensional space.
    pub fn zeros(dim: usize) -> Self {
        Self(vec![0.0; dim])
    }

    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Euclidean norm.
    pub fn norm(&self) -> f64 {
        self.0.iter().map(|c| c * c).sum::<f64>().sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|c| c.is_finite())
    }

    /// Fails unless this vector has exactly `expected` components.
    pub fn check_dim(&self, expected: usize) -> Result<()> {
        if self.dim() != expected {
            return Err(MnError::DimensionMismatch {
                expected,
                actual: self.dim(),
            });
        }
        Ok(())
    }

    /// Element-wise `self - other`.
    pub fn sub(&self, other: &Self) -> Result<Self> {
        other.check_dim(self.dim())?;
        Ok(Self(
            self.0.iter().zip(&other.0).map(|(a, b)| a - b).collect(),
        ))
    }

    /// `self + delta * factor`.
    pub fn scaled_add(&self, delta: &Self, factor: f64) -> Result<Self> {
        delta.check_dim(self.dim())?;
        Ok(Self(
            self.0
                .iter()
                .zip(&delta.0)
                .map(|(a, d)| a + d * factor)
                .collect(),
        ))
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Self) -> Result<f64> {
        Ok(other.sub(self)?.norm())
    }
}

impl From<Vec<f64>> for Vector {
    fn from(components: Vec<f64>) -> Self {
        Self(components)
    }
}
