use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DIMENSION, DEFAULT_MAX_TOKENS, DEFAULT_MAX_VELOCITY, DEFAULT_PRESSURE_DECAY,
    DEFAULT_PRUNE_THRESHOLD, DENSITY_RATIO, TOKENS_PER_EVENT,
};
use crate::error::{MnError, Result};
use crate::lethe::LetheConfig;

/// Configuration for one memory store.
///
/// Every field has a default, so a partial TOML document such as
/// `dimension = 4` is a complete config.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MnConfig {
    pub dimension: usize,
    pub max_velocity: f64,
    pub pressure_decay: f64,
    pub prune_threshold: f64,
    /// Simulated context window for the density trigger.
    pub max_tokens: usize,
    pub tokens_per_event: usize,
    pub density_ratio: f64,
    pub lethe: LetheConfig,
}

impl Default for MnConfig {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
            max_velocity: DEFAULT_MAX_VELOCITY,
            pressure_decay: DEFAULT_PRESSURE_DECAY,
            prune_threshold: DEFAULT_PRUNE_THRESHOLD,
            max_tokens: DEFAULT_MAX_TOKENS,
            tokens_per_event: TOKENS_PER_EVENT,
            density_ratio: DENSITY_RATIO,
            lethe: LetheConfig::default(),
        }
    }
}

impl MnConfig {
    /// Defaults with a different embedding dimension.
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(MnError::InvalidConfig("dimension must be positive".to_string()));
        }
        if !(self.max_velocity.is_finite() && self.max_velocity > 0.0) {
            return Err(MnError::InvalidConfig(format!(
                "max_velocity must be positive, got {}",
                self.max_velocity
            )));
        }
        if !(0.0..1.0).contains(&self.pressure_decay) {
            return Err(MnError::InvalidConfig(format!(
                "pressure_decay must be in [0, 1), got {}",
                self.pressure_decay
            )));
        }
        if !(self.prune_threshold.is_finite() && self.prune_threshold >= 0.0) {
            return Err(MnError::InvalidConfig(format!(
                "prune_threshold must be non-negative, got {}",
                self.prune_threshold
            )));
        }
        if !(self.density_ratio.is_finite() && self.density_ratio > 0.0) {
            return Err(MnError::InvalidConfig(format!(
                "density_ratio must be positive, got {}",
                self.density_ratio
            )));
        }
        self.lethe.validate()
    }

    /// Whether `event_count` stored events exceed the density budget.
    pub fn density_exceeded(&self, event_count: usize) -> bool {
        let load = event_count.saturating_mul(self.tokens_per_event) as f64;
        load > self.max_tokens as f64 * self.density_ratio
    }
}
