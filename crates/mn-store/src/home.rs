use std::path::{Path, PathBuf};
use std::{env, fs};

use mn_core::{IngestOutcome, MemoryStore, MemoryType, MnConfig, Vector};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::shells::ShellArchive;
use crate::store::Store;

/// Config file looked up in the base directory when none is given.
pub const CONFIG_FILE: &str = "mn.toml";

/// Default base directory for all mn storage.
pub fn default_base_dir() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".mnemosyne")
}

/// Sanitize a store name for use as a filename.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Parse a TOML config document. Missing fields take their defaults.
pub fn parse_config(content: &str) -> Result<MnConfig> {
    let config: MnConfig =
        toml::from_str(content).map_err(|e| StoreError::InvalidData(format!("invalid config: {e}")))?;
    config.validate()?;
    Ok(config)
}

/// A named memory store on disk, with its shell archive and config.
///
/// Layout:
/// ```text
/// ~/.mnemosyne/
/// ├── mn.toml
/// ├── stores/<name>.db
/// └── shells/<name>/shell_*.json
/// ```
pub struct MnHome {
    name: String,
    config: MnConfig,
    store: Store,
    shells: ShellArchive,
}

impl MnHome {
    /// Open the store `name` under `base_dir`, creating directories as needed.
    ///
    /// Config comes from `config_path` if given, else `<base>/mn.toml` if it
    /// exists, else defaults.
    pub fn open(name: &str, base_dir: Option<&Path>, config_path: Option<&Path>) -> Result<Self> {
        let base = base_dir.map(PathBuf::from).unwrap_or_else(default_base_dir);
        let name = match sanitize_name(name) {
            n if n.is_empty() => "default".to_string(),
            n => n,
        };

        let stores_dir = base.join("stores");
        fs::create_dir_all(&stores_dir).map_err(|e| {
            StoreError::InvalidData(format!("failed to create {}: {e}", stores_dir.display()))
        })?;

        let config = load_config(&base, config_path)?;
        let store = Store::open(&stores_dir.join(format!("{name}.db")))?;
        let shells = ShellArchive::open(&base.join("shells").join(&name))?;

        tracing::debug!(store = %name, base = %base.display(), "opened mn home");
        Ok(Self {
            name,
            config,
            store,
            shells,
        })
    }

    /// In-memory store and a shell archive in `shell_dir` (for testing).
    pub fn open_in_memory(config: MnConfig, shell_dir: &Path) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            name: "test".to_string(),
            config,
            store: Store::open_in_memory()?,
            shells: ShellArchive::open(shell_dir)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &MnConfig {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn shells(&self) -> &ShellArchive {
        &self.shells
    }

    pub fn load_memory(&self) -> Result<MemoryStore> {
        self.store.load_memory(&self.config)
    }

    pub fn save_memory(&self, memory: &MemoryStore) -> Result<()> {
        self.store.save_memory(memory)
    }

    /// Ingest into the persisted store. Accepted events are saved at once; when
    /// the store crosses its density budget a shell is preserved as well.
    pub fn ingest(
        &self,
        source: &str,
        content: &str,
        vector: Vector,
        memory_type: MemoryType,
    ) -> Result<IngestOutcome> {
        let mut memory = self.load_memory()?;
        let outcome = memory.ingest_typed(source, content, vector, memory_type)?;

        if outcome.accepted {
            tracing::info!(source, magnitude = outcome.metrics.magnitude, "event accepted");
        } else {
            tracing::info!(
                source,
                residual = outcome.metrics.residual_energy,
                pressure = outcome.metrics.buffer_pressure,
                "event rejected: displacement exceeds velocity limit"
            );
        }
        // Rejections still move filter diagnostics and the noise floor.
        self.save_memory(&memory)?;

        if outcome.density_exceeded {
            tracing::warn!(events = memory.len(), "memory density over budget; preserving shell");
            self.shells.preserve(&memory)?;
        }
        Ok(outcome)
    }

    pub fn insert_axiom(&self, source: &str, content: &str, memory_type: MemoryType) -> Result<Uuid> {
        let mut memory = self.load_memory()?;
        let id = memory.insert_axiom(source, content, memory_type);
        self.save_memory(&memory)?;
        Ok(id)
    }

    pub fn boost(&self, id: Uuid) -> Result<f64> {
        let mut memory = self.load_memory()?;
        let event = memory.boost(id)?.clone();
        self.store.update_event_state(&event)?;
        Ok(event.storage_strength)
    }

    pub fn pin(&self, id: Uuid) -> Result<()> {
        let mut memory = self.load_memory()?;
        memory.pin(id)?;
        if let Some(event) = memory.get(id) {
            self.store.update_event_state(event)?;
        }
        Ok(())
    }

    /// Prune the persisted store. Returns the number of events removed.
    pub fn prune(&self, threshold: f64) -> Result<usize> {
        let mut memory = self.load_memory()?;
        let pruned = memory.prune(threshold);
        if pruned > 0 {
            self.save_memory(&memory)?;
        }
        tracing::info!(pruned, remaining = memory.len(), threshold, "prune pass complete");
        Ok(pruned)
    }

    pub fn preserve(&self) -> Result<PathBuf> {
        let memory = self.load_memory()?;
        self.shells.preserve(&memory)
    }

    /// Replace the persisted store with the newest shell. Returns the number of
    /// events restored, or `None` when the archive is empty.
    pub fn restore_latest(&self) -> Result<Option<usize>> {
        let Some(memory) = self.shells.restore_latest()? else {
            return Ok(None);
        };
        self.save_memory(&memory)?;
        Ok(Some(memory.len()))
    }
}

fn load_config(base: &Path, config_path: Option<&Path>) -> Result<MnConfig> {
    let path = match config_path {
        Some(p) => p.to_path_buf(),
        None => {
            let default = base.join(CONFIG_FILE);
            if !default.exists() {
                return Ok(MnConfig::default());
            }
            default
        }
    };
    let content = fs::read_to_string(&path).map_err(|e| {
        StoreError::InvalidData(format!("failed to read config {}: {e}", path.display()))
    })?;
    tracing::debug!(path = %path.display(), "loaded config");
    parse_config(&content)
}
