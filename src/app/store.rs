//! Durable runtime state.
//!
//! One JSON document holds the daily accounting plus a snapshot of every
//! basket's alert/exec/mute bookkeeping, so dedupe and cooldowns survive a
//! restart. Writes go to a temp file that is then renamed over the target.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::app::state::RuntimeState;
use crate::domain::{BasketKey, BasketRuntime};
use crate::error::Result;

/// What goes to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    pub runtime: RuntimeState,
    #[serde(default)]
    pub baskets: BTreeMap<BasketKey, BasketRuntime>,
}

/// Atomic JSON file store.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored state; `None` when nothing has been written yet.
    #[allow(clippy::result_large_err)]
    pub fn load(&self) -> Result<Option<PersistedState>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// Write the state atomically.
    ///
    /// Creates parent directory if it doesn't exist.
    #[allow(clippy::result_large_err)]
    pub fn save(&self, state: &PersistedState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path)?;

        let cleanup_and_err = |e| {
            let _ = fs::remove_file(&temp_path);
            e
        };

        file.write_all(json.as_bytes()).map_err(cleanup_and_err)?;
        file.sync_all().map_err(cleanup_and_err)?;
        fs::rename(&temp_path, &self.path).map_err(cleanup_and_err)?;

        debug!(path = %self.path.display(), "State persisted");
        Ok(())
    }
}
