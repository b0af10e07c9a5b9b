//! Forgetting: exponential decay by memory type, and retrieval boosting.
//!
//! weight = exp(-ln2 / half_life * age_hours) * storage_strength
//!
//! Pinned events and identity memories sit outside the curve at weight 1.0.
//! Boosting multiplies storage strength, so frequently retrieved memories rise
//! above the pure decay curve. Growth is geometric and unbounded unless a
//! ceiling is configured.

use serde::{Deserialize, Serialize};

use crate::constants::{BOOST_FACTOR, CONVERSATION_HALF_LIFE_HOURS, FACT_HALF_LIFE_HOURS};
use crate::error::{MnError, Result};
use crate::event::{Event, MemoryType};
use crate::time::now_unix_secs_f64;

/// How a memory type decays.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DecayPolicy {
    Finite { half_life_hours: f64 },
    Permanent,
}

impl DecayPolicy {
    /// ln(2) / half_life, or `None` for permanent memories.
    pub fn decay_constant(self) -> Option<f64> {
        match self {
            Self::Finite { half_life_hours } => Some(std::f64::consts::LN_2 / half_life_hours),
            Self::Permanent => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LetheConfig {
    pub conversation_half_life_hours: f64,
    pub fact_half_life_hours: f64,
    pub boost_factor: f64,
    /// Ceiling on storage strength. `None` leaves boosting unbounded.
    pub max_storage_strength: Option<f64>,
}

impl Default for LetheConfig {
    fn default() -> Self {
        Self {
            conversation_half_life_hours: CONVERSATION_HALF_LIFE_HOURS,
            fact_half_life_hours: FACT_HALF_LIFE_HOURS,
            boost_factor: BOOST_FACTOR,
            max_storage_strength: None,
        }
    }
}

impl LetheConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("conversation_half_life_hours", self.conversation_half_life_hours),
            ("fact_half_life_hours", self.fact_half_life_hours),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(MnError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if !(self.boost_factor.is_finite() && self.boost_factor >= 1.0) {
            return Err(MnError::InvalidConfig(format!(
                "boost_factor must be >= 1.0, got {}",
                self.boost_factor
            )));
        }
        if let Some(cap) = self.max_storage_strength
            && !(cap.is_finite() && cap >= 1.0)
        {
            return Err(MnError::InvalidConfig(format!(
                "max_storage_strength must be >= 1.0, got {cap}"
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct LetheEngine {
    config: LetheConfig,
}

impl LetheEngine {
    pub fn new(config: LetheConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LetheConfig {
        &self.config
    }

    pub fn policy_for(&self, memory_type: MemoryType) -> DecayPolicy {
        match memory_type {
            MemoryType::Conversation => DecayPolicy::Finite {
                half_life_hours: self.config.conversation_half_life_hours,
            },
            MemoryType::Fact => DecayPolicy::Finite {
                half_life_hours: self.config.fact_half_life_hours,
            },
            MemoryType::Identity => DecayPolicy::Permanent,
        }
    }

    /// Relevance of `event` at time `now` (Unix seconds).
    ///
    /// Pinned and permanent events return exactly 1.0. Otherwise the result is
    /// the decay curve scaled by storage strength, and may exceed 1.0 for
    /// boosted events.
    pub fn decay_weight_at(&self, event: &Event, now: f64) -> f64 {
        if event.pinned {
            return 1.0;
        }
        let Some(lambda) = self.policy_for(event.memory_type).decay_constant() else {
            return 1.0;
        };
        (-lambda * event.age_hours(now)).exp() * event.storage_strength
    }

    pub fn decay_weight(&self, event: &Event) -> f64 {
        self.decay_weight_at(event, now_unix_secs_f64())
    }

    /// Retrieval boost: count the retrieval, strengthen storage, touch.
    pub fn boost_at(&self, event: &mut Event, now: f64) {
        event.retrieval_count += 1;
        let boosted = event.storage_strength * self.config.boost_factor;
        event.storage_strength = match self.config.max_storage_strength {
            Some(cap) => boosted.min(cap),
            None => boosted,
        };
        event.last_accessed = now;
    }

    pub fn boost(&self, event: &mut Event) {
        self.boost_at(event, now_unix_secs_f64());
    }

    /// Whether pruning at `threshold` would remove `event`.
    /// Pinned and identity events are never prunable.
    pub fn is_prunable_at(&self, event: &Event, threshold: f64, now: f64) -> bool {
        if event.pinned || self.policy_for(event.memory_type) == DecayPolicy::Permanent {
            return false;
        }
        self.decay_weight_at(event, now) < threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::HOUR_SECS;
    use crate::vector::Vector;
    use approx::assert_relative_eq;

    const NOW: f64 = 1_800_000_000.0;

    fn aged(memory_type: MemoryType, hours: f64) -> Event {
        Event::new(
            "test",
            "content",
            Vector::zeros(4),
            memory_type,
            NOW - hours * HOUR_SECS,
        )
    }

    #[test]
    fn test_fresh_event_has_full_weight() {
        let lethe = LetheEngine::default();
        let e = aged(MemoryType::Conversation, 0.0);
        assert_relative_eq!(lethe.decay_weight_at(&e, NOW), 1.0);
    }

    #[test]
    fn test_half_life_halves_weight() {
        let lethe = LetheEngine::default();
        let conv = aged(MemoryType::Conversation, 24.0);
        let fact = aged(MemoryType::Fact, 720.0);
        assert_relative_eq!(lethe.decay_weight_at(&conv, NOW), 0.5, epsilon = 1e-12);
        assert_relative_eq!(lethe.decay_weight_at(&fact, NOW), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_differential_half_life() {
        let lethe = LetheEngine::default();
        let conv = aged(MemoryType::Conversation, 25.0);
        let fact = aged(MemoryType::Fact, 25.0);
        let wc = lethe.decay_weight_at(&conv, NOW);
        let wf = lethe.decay_weight_at(&fact, NOW);
        assert!(wc < 0.5, "conversation weight {wc}");
        assert!(wf > 0.9, "fact weight {wf}");
    }

    #[test]
    fn test_pinned_never_decays() {
        let lethe = LetheEngine::default();
        let mut e = aged(MemoryType::Conversation, 1000.0);
        e.pin();
        assert_eq!(lethe.decay_weight_at(&e, NOW), 1.0);
    }

    #[test]
    fn test_pinned_ignores_storage_strength() {
        let lethe = LetheEngine::default();
        let mut e = aged(MemoryType::Fact, 10.0);
        e.storage_strength = 3.0;
        e.pin();
        assert_eq!(lethe.decay_weight_at(&e, NOW), 1.0);
    }

    #[test]
    fn test_identity_never_decays() {
        let lethe = LetheEngine::default();
        let e = aged(MemoryType::Identity, 100_000.0);
        assert!(!e.pinned);
        assert_eq!(lethe.decay_weight_at(&e, NOW), 1.0);
        assert_eq!(lethe.policy_for(MemoryType::Identity), DecayPolicy::Permanent);
    }

    #[test]
    fn test_storage_strength_lifts_weight_above_one() {
        let lethe = LetheEngine::default();
        let mut e = aged(MemoryType::Conversation, 1.0);
        e.storage_strength = 2.0;
        assert!(lethe.decay_weight_at(&e, NOW) > 1.0);
    }

    #[test]
    fn test_future_timestamp_treated_as_fresh() {
        let lethe = LetheEngine::default();
        let e = aged(MemoryType::Conversation, -5.0);
        assert_relative_eq!(lethe.decay_weight_at(&e, NOW), 1.0);
    }

    #[test]
    fn test_boost_compounds() {
        let lethe = LetheEngine::default();
        let mut e = aged(MemoryType::Conversation, 0.0);
        for i in 0..5 {
            lethe.boost_at(&mut e, NOW + i as f64);
        }
        assert_eq!(e.retrieval_count, 5);
        assert_relative_eq!(e.storage_strength, 1.1f64.powi(5), epsilon = 1e-12);
        assert_eq!(e.last_accessed, NOW + 4.0);
    }

    #[test]
    fn test_boost_ceiling() {
        let lethe = LetheEngine::new(LetheConfig {
            max_storage_strength: Some(1.5),
            ..LetheConfig::default()
        });
        let mut e = aged(MemoryType::Fact, 0.0);
        for _ in 0..20 {
            lethe.boost_at(&mut e, NOW);
        }
        assert_eq!(e.retrieval_count, 20);
        assert_eq!(e.storage_strength, 1.5);
    }

    #[test]
    fn test_is_prunable() {
        let lethe = LetheEngine::default();
        let weak = aged(MemoryType::Conversation, 100.0);
        let strong = aged(MemoryType::Conversation, 1.0);
        let identity = aged(MemoryType::Identity, 10_000.0);
        let mut pinned = aged(MemoryType::Conversation, 100.0);
        pinned.pin();

        assert!(lethe.is_prunable_at(&weak, 0.2, NOW));
        assert!(!lethe.is_prunable_at(&strong, 0.2, NOW));
        assert!(!lethe.is_prunable_at(&identity, 2.0, NOW));
        assert!(!lethe.is_prunable_at(&pinned, 2.0, NOW));
    }

    #[test]
    fn test_config_validation() {
        assert!(LetheConfig::default().validate().is_ok());
        let bad = LetheConfig {
            fact_half_life_hours: 0.0,
            ..LetheConfig::default()
        };
        assert!(bad.validate().is_err());
        let bad = LetheConfig {
            boost_factor: 0.5,
            ..LetheConfig::default()
        };
        assert!(bad.validate().is_err());
        let bad = LetheConfig {
            max_storage_strength: Some(0.5),
            ..LetheConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
