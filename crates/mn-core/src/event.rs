use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MnError;
use crate::time::HOUR_SECS;
use crate::vector::Vector;

/// What kind of memory an event is. Decides its decay half-life.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryType {
    /// Chat context. Fades within a day.
    #[default]
    Conversation,
    /// Technical knowledge. Lasts about a month.
    Fact,
    /// Never decays.
    Identity,
}

impl MemoryType {
    pub const ALL: [MemoryType; 3] = [Self::Conversation, Self::Fact, Self::Identity];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Conversation => "conversation",
            Self::Fact => "fact",
            Self::Identity => "identity",
        }
    }
}

impl FromStr for MemoryType {
    type Err = MnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conversation" => Ok(Self::Conversation),
            "fact" => Ok(Self::Fact),
            "identity" => Ok(Self::Identity),
            _ => Err(MnError::UnknownMemoryType(s.to_string())),
        }
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An accepted memory.
///
/// Created on successful admission (or as a pinned axiom), mutated only by
/// boosting and pinning, and removed only by pruning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    /// Creation time, Unix seconds.
    pub timestamp: f64,
    pub source: String,
    pub content: String,
    pub vector: Vector,
    pub memory_type: MemoryType,
    pub retrieval_count: u32,
    pub storage_strength: f64,
    /// Last boost (or creation), Unix seconds.
    pub last_accessed: f64,
    pub pinned: bool,
}

impl Event {
    pub fn new(
        source: &str,
        content: &str,
        vector: Vector,
        memory_type: MemoryType,
        now: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: now,
            source: source.to_string(),
            content: content.to_string(),
            vector,
            memory_type,
            retrieval_count: 0,
            storage_strength: 1.0,
            last_accessed: now,
            pinned: false,
        }
    }

    /// Hours since creation. Clock skew never yields a negative age.
    pub fn age_hours(&self, now: f64) -> f64 {
        ((now - self.timestamp) / HOUR_SECS).max(0.0)
    }

    /// Idempotent. There is no reverse operation.
    pub fn pin(&mut self) {
        self.pinned = true;
    }
}
