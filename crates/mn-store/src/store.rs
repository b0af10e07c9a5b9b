use std::path::Path;

use rusqlite::{Connection, params};
use uuid::Uuid;

use mn_core::{Event, FilterState, MemoryStore, MemoryType, MnConfig, Vector};

use crate::error::{Result, StoreError};
use crate::schema;

const KEY_CONFIG: &str = "config";
const KEY_REFERENCE: &str = "reference";
const KEY_FILTER: &str = "filter_state";
const KEY_NOISE_FLOOR: &str = "noise_floor";

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // --- Metadata ---

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        get_metadata_on(&self.conn, key)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        set_metadata_on(&self.conn, key, value)
    }

    pub fn event_count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    // --- Save ---

    /// Replace the persisted state with `memory` in one transaction.
    pub fn save_memory(&self, memory: &MemoryStore) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute("DELETE FROM events", [])?;

        set_metadata_on(&tx, KEY_CONFIG, &to_json(memory.config())?)?;
        set_metadata_on(&tx, KEY_REFERENCE, &to_json(memory.reference())?)?;
        set_metadata_on(&tx, KEY_FILTER, &to_json(&memory.filter_state())?)?;
        set_metadata_on(&tx, KEY_NOISE_FLOOR, &memory.noise_floor().to_string())?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO events (id, position, timestamp, source, content, memory_type,
                                     retrieval_count, storage_strength, last_accessed, pinned, vector)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for (position, event) in memory.events().iter().enumerate() {
                stmt.execute(params![
                    event.id.to_string(),
                    position as i64,
                    event.timestamp,
                    event.source,
                    event.content,
                    event.memory_type.as_str(),
                    event.retrieval_count,
                    event.storage_strength,
                    event.last_accessed,
                    event.pinned as i32,
                    encode_vector(&event.vector),
                ])?;
            }
        }

        tx.commit()?;
        tracing::debug!(events = memory.len(), "saved memory store");
        Ok(())
    }

    // --- Load ---

    /// Load the persisted store. An empty database yields a fresh store built
    /// from `default_config`; otherwise the persisted config wins.
    pub fn load_memory(&self, default_config: &MnConfig) -> Result<MemoryStore> {
        let Some(config_json) = self.get_metadata(KEY_CONFIG)? else {
            return Ok(MemoryStore::new(default_config.clone())?);
        };
        let config: MnConfig = from_json(&config_json, KEY_CONFIG)?;
        if config.dimension != default_config.dimension {
            tracing::warn!(
                stored = config.dimension,
                requested = default_config.dimension,
                "persisted dimension differs from configured dimension; keeping persisted"
            );
        }

        let reference: Vector = match self.get_metadata(KEY_REFERENCE)? {
            Some(json) => from_json(&json, KEY_REFERENCE)?,
            None => Vector::zeros(config.dimension),
        };
        let filter_state: FilterState = match self.get_metadata(KEY_FILTER)? {
            Some(json) => from_json(&json, KEY_FILTER)?,
            None => FilterState::default(),
        };
        let noise_floor = match self.get_metadata(KEY_NOISE_FLOOR)? {
            Some(s) => s
                .parse::<f64>()
                .map_err(|e| StoreError::InvalidData(format!("invalid noise floor '{s}': {e}")))?,
            None => 0.0,
        };

        let events = self.load_events()?;
        Ok(MemoryStore::from_parts(
            config,
            reference,
            events,
            filter_state,
            noise_floor,
        )?)
    }

    fn load_events(&self) -> Result<Vec<Event>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, timestamp, source, content, memory_type, retrieval_count,
                    storage_strength, last_accessed, pinned, vector
             FROM events ORDER BY position",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, u32>(5)?,
                    row.get::<_, f64>(6)?,
                    row.get::<_, f64>(7)?,
                    row.get::<_, i32>(8)? != 0,
                    row.get::<_, Vec<u8>>(9)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(
                |(id, timestamp, source, content, tag, retrieval_count, storage_strength, last_accessed, pinned, blob)|
                 -> Result<Event> {
                    Ok(Event {
                        id: parse_uuid(&id)?,
                        timestamp,
                        source,
                        content,
                        vector: decode_vector(&blob)?,
                        memory_type: tag.parse::<MemoryType>()?,
                        retrieval_count,
                        storage_strength,
                        last_accessed,
                        pinned,
                    })
                },
            )
            .collect()
    }

    // --- Targeted updates (no full rewrite) ---

    /// Persist the mutable fields of one event (boost and pin state).
    pub fn update_event_state(&self, event: &Event) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE events SET retrieval_count = ?1, storage_strength = ?2, last_accessed = ?3, pinned = ?4
             WHERE id = ?5",
            params![
                event.retrieval_count,
                event.storage_strength,
                event.last_accessed,
                event.pinned as i32,
                event.id.to_string(),
            ],
        )?;
        if rows == 0 {
            return Err(StoreError::InvalidData(format!(
                "event not found: {}",
                event.id
            )));
        }
        Ok(())
    }
}

fn get_metadata_on(conn: &Connection, key: &str) -> Result<Option<String>> {
    let mut stmt = conn.prepare("SELECT value FROM metadata WHERE key = ?1")?;
    let mut rows = stmt.query([key])?;
    match rows.next()? {
        Some(row) => Ok(Some(row.get(0)?)),
        None => Ok(None),
    }
}

fn set_metadata_on(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        params![key, value],
    )?;
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| StoreError::InvalidData(format!("JSON encode failed: {e}")))
}

fn from_json<T: serde::de::DeserializeOwned>(json: &str, key: &str) -> Result<T> {
    serde_json::from_str(json).map_err(|e| StoreError::InvalidData(format!("invalid {key}: {e}")))
}

/// Little-endian f64 components, 8 bytes each.
pub fn encode_vector(v: &Vector) -> Vec<u8> {
    v.as_slice().iter().flat_map(|c| c.to_le_bytes()).collect()
}

pub fn decode_vector(blob: &[u8]) -> Result<Vector> {
    if blob.len() % 8 != 0 {
        return Err(StoreError::InvalidData(format!(
            "vector blob length {} is not a multiple of 8",
            blob.len()
        )));
    }
    Ok(Vector::new(
        blob.chunks_exact(8)
            .map(|chunk| {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(chunk);
                f64::from_le_bytes(bytes)
            })
            .collect(),
    ))
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| StoreError::InvalidData(format!("invalid UUID '{s}': {e}")))
}
