//! Snapshot archive: a directory of timestamped JSON shells.
//!
//! A shell is a full store snapshot written before the working set is
//! compacted. Names sort lexicographically in creation order:
//! `shell_<unix-secs, 12 digits>_<seq, 6 digits>.json`.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use mn_core::{MemoryStore, export_json, import_json, now_unix_secs};

use crate::error::{Result, StoreError};

const PREFIX: &str = "shell_";
const SUFFIX: &str = ".json";

pub struct ShellArchive {
    dir: PathBuf,
}

impl ShellArchive {
    /// Open (and create if needed) an archive directory.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All shells, oldest first.
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        let mut shells: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(PREFIX) && n.ends_with(SUFFIX))
            })
            .collect();
        shells.sort();
        Ok(shells)
    }

    pub fn latest(&self) -> Result<Option<PathBuf>> {
        Ok(self.list()?.pop())
    }

    /// Write a snapshot of `memory` as a new shell.
    pub fn preserve(&self, memory: &MemoryStore) -> Result<PathBuf> {
        let json = export_json(memory)
            .map_err(|e| StoreError::InvalidData(format!("JSON export failed: {e}")))?;
        let secs = now_unix_secs();
        let mut seq = self.list()?.len();

        loop {
            let path = self.dir.join(format!("{PREFIX}{secs:012}_{seq:06}{SUFFIX}"));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(json.as_bytes())?;
                    tracing::info!(path = %path.display(), events = memory.len(), "preserved shell");
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => seq += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Rebuild a store from the newest shell, if any.
    pub fn restore_latest(&self) -> Result<Option<MemoryStore>> {
        let Some(path) = self.latest()? else {
            tracing::info!(dir = %self.dir.display(), "no shells to restore");
            return Ok(None);
        };
        let json = fs::read_to_string(&path)?;
        let memory = import_json(&json)?;
        tracing::info!(path = %path.display(), events = memory.len(), "restored shell");
        Ok(Some(memory))
    }
}
