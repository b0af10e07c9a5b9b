//! The memory store: admission-gated ingest plus decay-driven pruning.
//!
//! Every ingest is judged against the reference state (the last accepted
//! position). Admission is binary: a candidate the filter would have to clip
//! is rejected outright, and the reference state does not move. Accepted
//! candidates become events and the reference state jumps to them.
//!
//! All mutation goes through `&mut self`; callers that share a store across
//! threads wrap the whole store in one lock.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::MnConfig;
use crate::error::{MnError, Result};
use crate::event::{Event, MemoryType};
use crate::filter::{AdmissionFilter, FilterMetrics, FilterState};
use crate::lethe::LetheEngine;
use crate::time::now_unix_secs_f64;
use crate::vector::Vector;

/// Result of one ingest call. Rejection is a normal outcome, not an error.
#[derive(Clone, Debug, PartialEq)]
pub struct IngestOutcome {
    pub accepted: bool,
    /// The filter's admissible vector (clipped when rejected).
    pub vector: Vector,
    pub metrics: FilterMetrics,
    /// Id of the stored event when accepted.
    pub event_id: Option<Uuid>,
    /// The store has grown past its simulated context budget and should be
    /// snapshotted by the caller.
    pub density_exceeded: bool,
}

/// Point-in-time report over the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoreSummary {
    pub events: usize,
    pub pinned: usize,
    /// Contents of pinned events, in insertion order.
    pub axioms: Vec<String>,
    pub noise_floor: f64,
    pub filter_pressure: f64,
    pub total_energy_seen: f64,
    /// Most frequent event source (ties broken alphabetically).
    pub dominant_source: Option<String>,
    pub mean_decay_weight: f64,
}

#[derive(Clone, Debug)]
pub struct MemoryStore {
    config: MnConfig,
    filter: AdmissionFilter,
    lethe: LetheEngine,
    reference: Vector,
    events: Vec<Event>,
    noise_floor: f64,
}

impl MemoryStore {
    /// Empty store with the reference state at the origin.
    pub fn new(config: MnConfig) -> Result<Self> {
        config.validate()?;
        let filter = AdmissionFilter::new(config.max_velocity, config.pressure_decay)?;
        let lethe = LetheEngine::new(config.lethe.clone());
        let reference = Vector::zeros(config.dimension);
        Ok(Self {
            config,
            filter,
            lethe,
            reference,
            events: Vec::new(),
            noise_floor: 0.0,
        })
    }

    /// Rebuild a store from externally captured state.
    pub fn from_parts(
        config: MnConfig,
        reference: Vector,
        events: Vec<Event>,
        filter_state: FilterState,
        noise_floor: f64,
    ) -> Result<Self> {
        let mut store = Self::new(config)?;
        reference.check_dim(store.config.dimension)?;
        if !reference.is_finite() {
            return Err(MnError::NonFiniteVector);
        }
        let mut seen = HashSet::with_capacity(events.len());
        for event in &events {
            store.check_event(event)?;
            if !seen.insert(event.id) {
                return Err(MnError::InvalidEvent(format!("duplicate id {}", event.id)));
            }
        }
        store.reference = reference;
        store.events = events;
        store.filter.restore_state(filter_state);
        store.noise_floor = noise_floor;
        Ok(store)
    }

    // --- Accessors ---

    pub fn config(&self) -> &MnConfig {
        &self.config
    }

    pub fn lethe(&self) -> &LetheEngine {
        &self.lethe
    }

    /// Last accepted position.
    pub fn reference(&self) -> &Vector {
        &self.reference
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn get(&self, id: Uuid) -> Option<&Event> {
        self.events.iter().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn filter_state(&self) -> FilterState {
        self.filter.state()
    }

    /// Buffer pressure recorded at the most recent rejection.
    pub fn noise_floor(&self) -> f64 {
        self.noise_floor
    }

    /// Fields an externally built event must satisfy before the store holds
    /// it. Duplicate ids are checked by the caller.
    fn check_event(&self, event: &Event) -> Result<()> {
        event.vector.check_dim(self.config.dimension)?;
        if !event.vector.is_finite() {
            return Err(MnError::InvalidEvent(format!(
                "event {} has a non-finite vector",
                event.id
            )));
        }
        if !(event.storage_strength.is_finite() && event.storage_strength > 0.0) {
            return Err(MnError::InvalidEvent(format!(
                "event {} has storage strength {}",
                event.id, event.storage_strength
            )));
        }
        if !(event.timestamp.is_finite() && event.last_accessed.is_finite()) {
            return Err(MnError::InvalidEvent(format!(
                "event {} has a non-finite timestamp",
                event.id
            )));
        }
        Ok(())
    }

    fn get_mut(&mut self, id: Uuid) -> Result<&mut Event> {
        self.events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(MnError::EventNotFound(id))
    }

    // --- Ingest ---

    pub fn ingest(&mut self, source: &str, content: &str, vector: Vector) -> Result<IngestOutcome> {
        self.ingest_typed(source, content, vector, MemoryType::Conversation)
    }

    /// Ingest with a textual memory-type tag. Unknown tags fail before the
    /// filter runs.
    pub fn ingest_tagged(
        &mut self,
        source: &str,
        content: &str,
        vector: Vector,
        tag: &str,
    ) -> Result<IngestOutcome> {
        let memory_type: MemoryType = tag.parse()?;
        self.ingest_typed(source, content, vector, memory_type)
    }

    pub fn ingest_typed(
        &mut self,
        source: &str,
        content: &str,
        vector: Vector,
        memory_type: MemoryType,
    ) -> Result<IngestOutcome> {
        self.ingest_typed_at(source, content, vector, memory_type, now_unix_secs_f64())
    }

    pub fn ingest_typed_at(
        &mut self,
        source: &str,
        content: &str,
        vector: Vector,
        memory_type: MemoryType,
        now: f64,
    ) -> Result<IngestOutcome> {
        vector.check_dim(self.config.dimension)?;
        let (admissible, metrics) = self.filter.apply(&self.reference, &vector)?;

        if metrics.is_clipped {
            self.noise_floor = metrics.buffer_pressure;
            return Ok(IngestOutcome {
                accepted: false,
                vector: admissible,
                metrics,
                event_id: None,
                density_exceeded: false,
            });
        }

        let event = Event::new(source, content, admissible.clone(), memory_type, now);
        let id = event.id;
        self.events.push(event);
        self.reference = admissible.clone();

        Ok(IngestOutcome {
            accepted: true,
            vector: admissible,
            metrics,
            event_id: Some(id),
            density_exceeded: self.config.density_exceeded(self.events.len()),
        })
    }

    /// Store a pinned memory directly, bypassing the filter.
    ///
    /// Axioms carry a zero vector and leave the reference state untouched.
    pub fn insert_axiom(&mut self, source: &str, content: &str, memory_type: MemoryType) -> Uuid {
        self.insert_axiom_at(source, content, memory_type, now_unix_secs_f64())
    }

    pub fn insert_axiom_at(
        &mut self,
        source: &str,
        content: &str,
        memory_type: MemoryType,
        now: f64,
    ) -> Uuid {
        let mut event = Event::new(
            source,
            content,
            Vector::zeros(self.config.dimension),
            memory_type,
            now,
        );
        event.pin();
        let id = event.id;
        self.events.push(event);
        id
    }

    /// Append a fully formed event without admission (restore, migration).
    pub fn insert_event(&mut self, event: Event) -> Result<Uuid> {
        self.check_event(&event)?;
        if self.get(event.id).is_some() {
            return Err(MnError::InvalidEvent(format!("duplicate id {}", event.id)));
        }
        let id = event.id;
        self.events.push(event);
        Ok(id)
    }

    // --- Decay ---

    pub fn decay_weight(&self, id: Uuid) -> Result<f64> {
        self.decay_weight_at(id, now_unix_secs_f64())
    }

    pub fn decay_weight_at(&self, id: Uuid, now: f64) -> Result<f64> {
        let event = self.get(id).ok_or(MnError::EventNotFound(id))?;
        Ok(self.lethe.decay_weight_at(event, now))
    }

    pub fn boost(&mut self, id: Uuid) -> Result<&Event> {
        self.boost_at(id, now_unix_secs_f64())
    }

    pub fn boost_at(&mut self, id: Uuid, now: f64) -> Result<&Event> {
        let event = self
            .events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(MnError::EventNotFound(id))?;
        self.lethe.boost_at(event, now);
        Ok(event)
    }

    /// Exempt an event from decay and pruning. Idempotent.
    pub fn pin(&mut self, id: Uuid) -> Result<()> {
        self.get_mut(id)?.pin();
        Ok(())
    }

    /// Remove every prunable event whose weight is below `threshold`.
    /// Returns the number removed.
    pub fn prune(&mut self, threshold: f64) -> usize {
        self.prune_at(threshold, now_unix_secs_f64())
    }

    pub fn prune_default(&mut self) -> usize {
        self.prune(self.config.prune_threshold)
    }

    pub fn prune_at(&mut self, threshold: f64, now: f64) -> usize {
        let before = self.events.len();
        let lethe = &self.lethe;
        self.events
            .retain(|e| !lethe.is_prunable_at(e, threshold, now));
        before - self.events.len()
    }

    // --- Reporting ---

    pub fn summary(&self) -> StoreSummary {
        self.summary_at(now_unix_secs_f64())
    }

    pub fn summary_at(&self, now: f64) -> StoreSummary {
        let axioms: Vec<String> = self
            .events
            .iter()
            .filter(|e| e.pinned)
            .map(|e| e.content.clone())
            .collect();

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for e in &self.events {
            *counts.entry(e.source.as_str()).or_default() += 1;
        }
        // BTreeMap iterates alphabetically; keep the first of equal counts.
        let dominant_source = counts
            .iter()
            .fold(None::<(&str, usize)>, |best, (&src, &n)| match best {
                Some((_, m)) if m >= n => best,
                _ => Some((src, n)),
            })
            .map(|(src, _)| src.to_string());

        let mean_decay_weight = if self.events.is_empty() {
            0.0
        } else {
            self.events
                .iter()
                .map(|e| self.lethe.decay_weight_at(e, now))
                .sum::<f64>()
                / self.events.len() as f64
        };

        StoreSummary {
            events: self.events.len(),
            pinned: axioms.len(),
            axioms,
            noise_floor: self.noise_floor,
            filter_pressure: self.filter.pressure(),
            total_energy_seen: self.filter.total_energy_seen(),
            dominant_source,
            mean_decay_weight,
        }
    }
}
