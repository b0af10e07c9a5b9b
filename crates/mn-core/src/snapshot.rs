//! JSON snapshot format for a whole memory store.
//!
//! Field names are camelCase, vectors are flat float arrays and memory types
//! are their lowercase tags. An exported store imports back into an identical
//! store: same config, reference state, filter diagnostics, noise floor and
//! events (ids included).

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::MnConfig;
use crate::error::MnError;
use crate::event::{Event, MemoryType};
use crate::filter::FilterState;
use crate::memory::MemoryStore;
use crate::time::now_iso8601;
use crate::vector::Vector;

pub const CURRENT_VERSION: &str = "1.0";

// --- Wire format types ---

#[derive(Serialize, Deserialize, Debug)]
pub struct WireSnapshot {
    pub version: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub config: MnConfig,
    pub reference: Vec<f64>,
    #[serde(default)]
    pub filter: WireFilter,
    #[serde(rename = "noiseFloor", default)]
    pub noise_floor: f64,
    #[serde(default)]
    pub events: Vec<WireEvent>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct WireFilter {
    #[serde(default)]
    pub pressure: f64,
    #[serde(rename = "totalEnergySeen", default)]
    pub total_energy_seen: f64,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct WireEvent {
    pub id: String,
    pub timestamp: f64,
    pub source: String,
    pub content: String,
    pub vector: Vec<f64>,
    #[serde(rename = "memoryType", default = "default_memory_type")]
    pub memory_type: String,
    #[serde(rename = "retrievalCount", default)]
    pub retrieval_count: u32,
    #[serde(rename = "storageStrength", default = "default_strength")]
    pub storage_strength: f64,
    #[serde(rename = "lastAccessed", default)]
    pub last_accessed: f64,
    #[serde(default)]
    pub pinned: bool,
}

fn default_memory_type() -> String {
    MemoryType::Conversation.as_str().to_string()
}

fn default_strength() -> f64 {
    1.0
}

#[derive(Debug)]
pub enum SnapshotError {
    Json(serde_json::Error),
    Core(MnError),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::Json(e) => write!(f, "snapshot JSON error: {e}"),
            SnapshotError::Core(e) => write!(f, "snapshot rejected: {e}"),
        }
    }
}

impl std::error::Error for SnapshotError {}

impl From<serde_json::Error> for SnapshotError {
    fn from(e: serde_json::Error) -> Self {
        SnapshotError::Json(e)
    }
}

impl From<MnError> for SnapshotError {
    fn from(e: MnError) -> Self {
        SnapshotError::Core(e)
    }
}

// --- Conversion ---

impl WireSnapshot {
    pub fn from_store(store: &MemoryStore) -> Self {
        let filter = store.filter_state();
        Self {
            version: CURRENT_VERSION.to_string(),
            timestamp: now_iso8601(),
            config: store.config().clone(),
            reference: store.reference().as_slice().to_vec(),
            filter: WireFilter {
                pressure: filter.pressure,
                total_energy_seen: filter.total_energy_seen,
            },
            noise_floor: store.noise_floor(),
            events: store.events().iter().map(domain_event_to_wire).collect(),
        }
    }

    pub fn into_store(self) -> Result<MemoryStore, MnError> {
        let events = self
            .events
            .into_iter()
            .map(wire_event_to_domain)
            .collect::<Result<Vec<_>, _>>()?;
        MemoryStore::from_parts(
            self.config,
            Vector::new(self.reference),
            events,
            FilterState {
                pressure: self.filter.pressure,
                total_energy_seen: self.filter.total_energy_seen,
            },
            self.noise_floor,
        )
    }
}

fn domain_event_to_wire(e: &Event) -> WireEvent {
    WireEvent {
        id: e.id.to_string(),
        timestamp: e.timestamp,
        source: e.source.clone(),
        content: e.content.clone(),
        vector: e.vector.as_slice().to_vec(),
        memory_type: e.memory_type.as_str().to_string(),
        retrieval_count: e.retrieval_count,
        storage_strength: e.storage_strength,
        last_accessed: e.last_accessed,
        pinned: e.pinned,
    }
}

fn wire_event_to_domain(wire: WireEvent) -> Result<Event, MnError> {
    let memory_type: MemoryType = wire.memory_type.parse()?;
    Ok(Event {
        id: Uuid::parse_str(&wire.id)
            .map_err(|e| MnError::InvalidEvent(format!("bad id '{}': {e}", wire.id)))?,
        timestamp: wire.timestamp,
        source: wire.source,
        content: wire.content,
        vector: Vector::new(wire.vector),
        memory_type,
        retrieval_count: wire.retrieval_count,
        storage_strength: wire.storage_strength,
        last_accessed: wire.last_accessed,
        pinned: wire.pinned,
    })
}

/// Serialize a store to the snapshot format.
pub fn export_json(store: &MemoryStore) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&WireSnapshot::from_store(store))
}

/// Rebuild a store from a snapshot.
pub fn import_json(json: &str) -> Result<MemoryStore, SnapshotError> {
    let wire: WireSnapshot = serde_json::from_str(json)?;
    Ok(wire.into_store()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_store() -> MemoryStore {
        let mut s = MemoryStore::new(MnConfig::with_dimension(3)).unwrap();
        s.ingest_typed_at("docs", "gamma", Vector::new(vec![0.1, 0.2, 0.3]), MemoryType::Fact, 1000.0)
            .unwrap();
        s.ingest_typed_at("chat", "panic", Vector::new(vec![9.0, 9.0, 9.0]), MemoryType::Conversation, 1001.0)
            .unwrap();
        let id = s.insert_axiom_at("core", "I persist.", MemoryType::Identity, 1002.0);
        s.boost_at(id, 1003.0).unwrap();
        s
    }

    #[test]
    fn test_roundtrip_is_identical() {
        let s = make_store();
        let json = export_json(&s).unwrap();
        let s2 = import_json(&json).unwrap();

        assert_eq!(s2.config(), s.config());
        assert_eq!(s2.reference(), s.reference());
        assert_eq!(s2.events(), s.events());
        assert_eq!(s2.filter_state(), s.filter_state());
        assert_eq!(s2.noise_floor(), s.noise_floor());
    }

    #[test]
    fn test_version_field() {
        let json = export_json(&make_store()).unwrap();
        let wire: WireSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(wire.version, CURRENT_VERSION);
        assert_eq!(wire.events.len(), 2);
        assert_eq!(wire.events[0].memory_type, "fact");
    }

    #[test]
    fn test_minimal_snapshot_uses_defaults() {
        let json = r#"{
            "version": "1.0",
            "config": {"dimension": 2},
            "reference": [0.5, 0.5],
            "events": [{
                "id": "00000000-0000-0000-0000-000000000001",
                "timestamp": 10.0,
                "source": "chat",
                "content": "hello",
                "vector": [0.5, 0.5]
            }]
        }"#;
        let s = import_json(json).unwrap();
        let e = &s.events()[0];
        assert_eq!(e.memory_type, MemoryType::Conversation);
        assert_eq!(e.storage_strength, 1.0);
        assert!(!e.pinned);
        assert_eq!(s.reference().as_slice(), &[0.5, 0.5]);
    }

    #[test]
    fn test_unknown_memory_type_rejected() {
        let json = r#"{
            "version": "1.0",
            "config": {"dimension": 1},
            "reference": [0.0],
            "events": [{
                "id": "x", "timestamp": 0.0, "source": "s", "content": "c",
                "vector": [0.0], "memoryType": "dream"
            }]
        }"#;
        let err = import_json(json).unwrap_err();
        assert!(matches!(err, SnapshotError::Core(MnError::UnknownMemoryType(_))));
    }

    #[test]
    fn test_dimension_disagreement_rejected() {
        let json = r#"{"version": "1.0", "config": {"dimension": 3}, "reference": [0.0]}"#;
        let err = import_json(json).unwrap_err();
        assert!(matches!(err, SnapshotError::Core(MnError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(import_json("{"), Err(SnapshotError::Json(_))));
    }

    fn snapshot_with_events(events: &str) -> String {
        format!(
            r#"{{"version": "1.0", "config": {{"dimension": 1}}, "reference": [0.0], "events": [{events}]}}"#
        )
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let json = snapshot_with_events(
            r#"{"id": "00000000-0000-0000-0000-000000000001", "timestamp": 0.0,
                "source": "s", "content": "a", "vector": [0.0]},
               {"id": "00000000-0000-0000-0000-000000000001", "timestamp": 0.0,
                "source": "s", "content": "b", "vector": [0.0]}"#,
        );
        let err = import_json(&json).unwrap_err();
        assert!(matches!(err, SnapshotError::Core(MnError::InvalidEvent(_))));
    }

    #[test]
    fn test_non_positive_strength_rejected() {
        for strength in ["0.0", "-3.0"] {
            let json = snapshot_with_events(&format!(
                r#"{{"id": "00000000-0000-0000-0000-000000000001", "timestamp": 0.0,
                    "source": "s", "content": "a", "vector": [0.0],
                    "storageStrength": {strength}}}"#
            ));
            let err = import_json(&json).unwrap_err();
            assert!(
                matches!(err, SnapshotError::Core(MnError::InvalidEvent(_))),
                "strength {strength}"
            );
        }
    }

    #[test]
    fn test_malformed_id_rejected() {
        let json = snapshot_with_events(
            r#"{"id": "not-a-uuid", "timestamp": 0.0, "source": "s", "content": "a", "vector": [0.0]}"#,
        );
        let err = import_json(&json).unwrap_err();
        assert!(matches!(err, SnapshotError::Core(MnError::InvalidEvent(_))));
    }
}
