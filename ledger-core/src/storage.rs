//! Snapshot storage for committed ledger state
//!
//! The committed state is written as a single bincode file under
//! `Config::data_dir`. Writes go to a temporary file first and are renamed
//! into place, so a crash never leaves a half-written snapshot.

use crate::{state::LedgerState, Config, Result};
use std::path::{Path, PathBuf};

/// Snapshot file name
const SNAPSHOT_FILE: &str = "state.bin";

/// File-backed snapshot store
#[derive(Debug, Clone)]
pub struct Storage {
    path: PathBuf,
}

impl Storage {
    /// Open (and create) the data directory
    pub fn open(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        Ok(Self {
            path: config.data_dir.join(SNAPSHOT_FILE),
        })
    }

    /// Snapshot file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the last snapshot, if any
    pub fn load(&self) -> Result<Option<LedgerState>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let bytes = std::fs::read(&self.path)?;
        let state = bincode::deserialize(&bytes)?;
        tracing::info!(path = %self.path.display(), "loaded ledger snapshot");
        Ok(Some(state))
    }

    /// Persist a snapshot atomically
    pub fn save(&self, state: &LedgerState) -> Result<()> {
        let bytes = bincode::serialize(state)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, &bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "saved ledger snapshot");
        Ok(())
    }
}
