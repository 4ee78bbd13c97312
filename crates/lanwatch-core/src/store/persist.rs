// ── Store persistence backends ──
//
// The store persists its full state as one JSON document. Writes are
// atomic (temp file + rename), so a failed persist leaves the previous
// file intact and the commit aborts with no visible partial state.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use super::StoreState;
use crate::error::CoreError;

/// Persistence seam for the snapshot store.
///
/// Implementations must be all-or-nothing: a failed `persist` must not
/// corrupt whatever a later `load` would return.
pub trait StoreBackend: Send + Sync {
    /// Load the persisted state, or `None` when nothing exists yet.
    fn load(&self) -> Result<Option<StoreState>, CoreError>;

    /// Persist the full state atomically.
    fn persist(&self, state: &StoreState) -> Result<(), CoreError>;
}

// ── JSON file backend ───────────────────────────────────────────────

/// Stores the state as a single pretty-printed JSON file.
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn path_str(&self) -> String {
        self.path.display().to_string()
    }
}

impl StoreBackend for JsonFileBackend {
    fn load(&self) -> Result<Option<StoreState>, CoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CoreError::io(self.path_str(), e)),
        };
        let state =
            serde_json::from_slice(&bytes).map_err(|e| CoreError::format(self.path_str(), e))?;
        Ok(Some(state))
    }

    fn persist(&self, state: &StoreState) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| CoreError::io(self.path_str(), e))?;
        }

        let json = serde_json::to_vec_pretty(state)
            .map_err(|e| CoreError::format(self.path_str(), e))?;

        // Write-then-rename keeps the previous file intact on failure.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &json).map_err(|e| CoreError::io(tmp.display().to_string(), e))?;
        fs::rename(&tmp, &self.path).map_err(|e| CoreError::io(self.path_str(), e))?;

        debug!(path = %self.path.display(), bytes = json.len(), "store persisted");
        Ok(())
    }
}

// ── In-memory backend ───────────────────────────────────────────────

/// Keeps the persisted state in memory. Used by tests and ephemeral
/// (no-disk) runs; supports injected persist failures.
#[derive(Default)]
pub struct MemoryBackend {
    persisted: Mutex<Option<StoreState>>,
    fail_next_persist: std::sync::atomic::AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `persist` call fail with a store I/O error.
    pub fn fail_next_persist(&self) {
        self.fail_next_persist
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }
}

impl StoreBackend for MemoryBackend {
    fn load(&self) -> Result<Option<StoreState>, CoreError> {
        Ok(self
            .persisted
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone())
    }

    fn persist(&self, state: &StoreState) -> Result<(), CoreError> {
        if self
            .fail_next_persist
            .swap(false, std::sync::atomic::Ordering::SeqCst)
        {
            return Err(CoreError::io(
                "<memory>",
                std::io::Error::other("injected persist failure"),
            ));
        }
        *self
            .persisted
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(state.clone());
        Ok(())
    }
}
