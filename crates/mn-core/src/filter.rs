//! Velocity-bounded admission filter.
//!
//! Bounds how far the reference state may move in one step. A candidate whose
//! displacement from the reference exceeds `max_velocity` is clipped back onto
//! the sphere of radius `max_velocity` around the reference, direction intact.
//! The clipped-off length is the residual energy; its exponential moving
//! average is the buffer pressure. Pressure and total energy are diagnostics
//! only and never feed back into the admission decision.

use serde::{Deserialize, Serialize};

use crate::error::{MnError, Result};
use crate::vector::Vector;

/// Per-call outcome of [`AdmissionFilter::apply`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterMetrics {
    pub is_clipped: bool,
    /// `magnitude - max_velocity` when clipped, 0 otherwise.
    pub residual_energy: f64,
    /// Smoothed residual energy after this call.
    pub buffer_pressure: f64,
    /// Raw displacement `||candidate - reference||`.
    pub magnitude: f64,
}

/// Mutable diagnostics carried between calls. Exposed for snapshot/restore.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    pub pressure: f64,
    pub total_energy_seen: f64,
}

#[derive(Clone, Debug)]
pub struct AdmissionFilter {
    max_velocity: f64,
    pressure_decay: f64,
    state: FilterState,
}

impl AdmissionFilter {
    /// `max_velocity` must be positive and finite; `pressure_decay` in [0, 1).
    pub fn new(max_velocity: f64, pressure_decay: f64) -> Result<Self> {
        if !(max_velocity.is_finite() && max_velocity > 0.0) {
            return Err(MnError::InvalidConfig(format!(
                "max_velocity must be positive, got {max_velocity}"
            )));
        }
        if !(0.0..1.0).contains(&pressure_decay) {
            return Err(MnError::InvalidConfig(format!(
                "pressure_decay must be in [0, 1), got {pressure_decay}"
            )));
        }
        Ok(Self {
            max_velocity,
            pressure_decay,
            state: FilterState::default(),
        })
    }

    pub fn max_velocity(&self) -> f64 {
        self.max_velocity
    }

    pub fn pressure(&self) -> f64 {
        self.state.pressure
    }

    pub fn total_energy_seen(&self) -> f64 {
        self.state.total_energy_seen
    }

    pub fn state(&self) -> FilterState {
        self.state
    }

    pub fn restore_state(&mut self, state: FilterState) {
        self.state = state;
    }

    /// Move from `reference` toward `candidate`, capped at `max_velocity`.
    ///
    /// Returns the admissible vector (the candidate itself when within the
    /// ceiling) and the metrics for this step. A displacement exactly equal to
    /// `max_velocity` is not clipped.
    pub fn apply(&mut self, reference: &Vector, candidate: &Vector) -> Result<(Vector, FilterMetrics)> {
        if reference.dim() == 0 || candidate.dim() != reference.dim() {
            return Err(MnError::DimensionMismatch {
                expected: reference.dim(),
                actual: candidate.dim(),
            });
        }
        if !reference.is_finite() || !candidate.is_finite() {
            return Err(MnError::NonFiniteVector);
        }

        let delta = candidate.sub(reference)?;
        let magnitude = delta.norm();

        let (output, is_clipped, residual_energy) = if magnitude <= self.max_velocity {
            (candidate.clone(), false, 0.0)
        } else {
            let scale = self.max_velocity / magnitude;
            (
                reference.scaled_add(&delta, scale)?,
                true,
                magnitude - self.max_velocity,
            )
        };

        self.state.pressure =
            self.state.pressure * self.pressure_decay + residual_energy * (1.0 - self.pressure_decay);
        self.state.total_energy_seen += magnitude;

        Ok((
            output,
            FilterMetrics {
                is_clipped,
                residual_energy,
                buffer_pressure: self.state.pressure,
                magnitude,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn filter() -> AdmissionFilter {
        AdmissionFilter::new(1.0, 0.9).unwrap()
    }

    #[test]
    fn test_within_ceiling_passes_through() {
        let mut f = filter();
        let r = Vector::zeros(4);
        let c = Vector::new(vec![0.1, 0.1, 0.1, 0.1]);
        let (out, m) = f.apply(&r, &c).unwrap();
        assert_eq!(out, c);
        assert!(!m.is_clipped);
        assert_eq!(m.residual_energy, 0.0);
        assert_relative_eq!(m.magnitude, 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_over_ceiling_is_clipped_to_max_velocity() {
        let mut f = filter();
        let r = Vector::new(vec![1.0, 1.0]);
        let c = Vector::new(vec![4.0, 5.0]);
        let (out, m) = f.apply(&r, &c).unwrap();
        assert!(m.is_clipped);
        assert_relative_eq!(m.magnitude, 5.0, epsilon = 1e-12);
        assert_relative_eq!(m.residual_energy, 4.0, epsilon = 1e-12);
        assert_relative_eq!(out.as_slice()[0], 1.6, epsilon = 1e-12);
        assert_relative_eq!(out.as_slice()[1], 1.8, epsilon = 1e-12);
        assert_relative_eq!(out.distance(&r).unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_exact_ceiling_not_clipped() {
        let mut f = filter();
        let r = Vector::new(vec![0.5, -2.0]);
        let c = Vector::new(vec![1.5, -2.0]);
        let (_, m) = f.apply(&r, &c).unwrap();
        assert!(!m.is_clipped);
    }

    #[test]
    fn test_pressure_is_moving_average_of_residuals() {
        let mut f = filter();
        let r = Vector::zeros(1);
        let (_, m1) = f.apply(&r, &Vector::new(vec![3.0])).unwrap();
        // 0 * 0.9 + 2.0 * 0.1
        assert_relative_eq!(m1.buffer_pressure, 0.2, epsilon = 1e-12);

        let (_, m2) = f.apply(&r, &Vector::new(vec![0.5])).unwrap();
        assert_relative_eq!(m2.buffer_pressure, 0.18, epsilon = 1e-12);
        assert_relative_eq!(f.pressure(), 0.18, epsilon = 1e-12);
        assert_relative_eq!(f.total_energy_seen(), 3.5, epsilon = 1e-12);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut f = filter();
        let err = f.apply(&Vector::zeros(3), &Vector::zeros(4)).unwrap_err();
        assert!(matches!(err, MnError::DimensionMismatch { expected: 3, actual: 4 }));

        let err = f.apply(&Vector::zeros(0), &Vector::zeros(0)).unwrap_err();
        assert!(matches!(err, MnError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_failed_call_leaves_state_untouched() {
        let mut f = filter();
        let _ = f.apply(&Vector::zeros(2), &Vector::zeros(3));
        let _ = f.apply(&Vector::zeros(1), &Vector::new(vec![f64::NAN]));
        assert_eq!(f.state(), FilterState::default());
    }

    #[test]
    fn test_invalid_construction() {
        assert!(AdmissionFilter::new(0.0, 0.9).is_err());
        assert!(AdmissionFilter::new(-1.0, 0.9).is_err());
        assert!(AdmissionFilter::new(f64::INFINITY, 0.9).is_err());
        assert!(AdmissionFilter::new(1.0, 1.0).is_err());
        assert!(AdmissionFilter::new(1.0, -0.1).is_err());
        assert!(AdmissionFilter::new(1.0, 0.0).is_ok());
    }

    #[test]
    fn test_deterministic() {
        let r = Vector::new(vec![0.2, -0.4, 0.9]);
        let c = Vector::new(vec![3.0, 1.0, -2.0]);
        let mut a = filter();
        let mut b = filter();
        assert_eq!(a.apply(&r, &c).unwrap(), b.apply(&r, &c).unwrap());
    }
}
