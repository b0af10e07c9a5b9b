use std::fs;
use std::path::Path;

use mn_core::{MnConfig, export_json, import_json};

use crate::error::{Result, StoreError};
use crate::store::Store;

impl Store {
    /// Replace this store's contents with a JSON snapshot file.
    pub fn import_json_file(&self, path: &Path) -> Result<()> {
        let json = fs::read_to_string(path).map_err(|e| {
            StoreError::InvalidData(format!("failed to read {}: {e}", path.display()))
        })?;
        self.import_json_str(&json)
    }

    pub fn import_json_str(&self, json: &str) -> Result<()> {
        let memory = import_json(json)?;
        self.save_memory(&memory)?;
        tracing::info!(events = memory.len(), "imported snapshot");
        Ok(())
    }

    /// Write this store's contents to a JSON snapshot file.
    pub fn export_json_file(&self, path: &Path, default_config: &MnConfig) -> Result<()> {
        let json = self.export_json_string(default_config)?;
        fs::write(path, json).map_err(|e| {
            StoreError::InvalidData(format!("failed to write {}: {e}", path.display()))
        })
    }

    pub fn export_json_string(&self, default_config: &MnConfig) -> Result<String> {
        let memory = self.load_memory(default_config)?;
        export_json(&memory).map_err(|e| StoreError::InvalidData(format!("JSON export failed: {e}")))
    }
}
