//! Mnemosyne memory engine.
//!
//! Admits embedding-space events through a velocity-bounded filter and lets
//! stored events fade on type-dependent exponential half-lives. Pinned and
//! identity memories never fade.
//!
//! No I/O: persistence, transport and logging belong to the caller.

pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod filter;
pub mod lethe;
pub mod memory;
pub mod snapshot;
pub mod synthetic;
pub mod time;
pub mod vector;

pub use config::MnConfig;
pub use constants::{
    BOOST_FACTOR, CONVERSATION_HALF_LIFE_HOURS, DEFAULT_DIMENSION, DEFAULT_MAX_VELOCITY,
    DEFAULT_PRUNE_THRESHOLD, EPSILON, FACT_HALF_LIFE_HOURS,
};
pub use error::{MnError, Result};
pub use event::{Event, MemoryType};
pub use filter::{AdmissionFilter, FilterMetrics, FilterState};
pub use lethe::{DecayPolicy, LetheConfig, LetheEngine};
pub use memory::{IngestOutcome, MemoryStore, StoreSummary};
pub use snapshot::{CURRENT_VERSION, SnapshotError, export_json, import_json};
pub use synthetic::random_displacement;
pub use time::{HOUR_SECS, format_timestamp, now_iso8601, now_unix_secs, now_unix_secs_f64};
pub use vector::Vector;
