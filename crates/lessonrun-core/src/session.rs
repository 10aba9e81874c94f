//! Persisted session record for resuming an in-progress attempt.
//!
//! There is at most one live record. Stores never surface failures: an
//! unreadable, unwritable or corrupt blob behaves exactly like "no record",
//! which sends the student back to a fresh start.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Pointer to the question an attempt is currently on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub attempt_code: String,
    /// Identity of the module the attempt belongs to.
    pub module_id: String,
    pub student_name: String,
    pub question_slug: String,
    pub question_index: usize,
}

/// Storage for the single live [`SessionRecord`].
pub trait SessionStore: Send + Sync {
    /// Overwrite any existing record.
    fn save(&self, record: &SessionRecord);

    /// The stored record, only if it belongs to `module_id`.
    fn load(&self, module_id: &str) -> Option<SessionRecord>;

    /// Remove the record unconditionally.
    fn clear(&self);
}

fn decode(blob: &str, module_id: &str) -> Option<SessionRecord> {
    let record: SessionRecord = match serde_json::from_str(blob) {
        Ok(record) => record,
        Err(e) => {
            warn!("discarding corrupt session record: {e}");
            return None;
        }
    };
    if record.module_id != module_id {
        tracing::debug!(
            stored = %record.module_id,
            requested = %module_id,
            "session record belongs to another module"
        );
        return None;
    }
    Some(record)
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

/// Keeps the record as a JSON file, surviving process restarts.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn save(&self, record: &SessionRecord) {
        let blob = match serde_json::to_string_pretty(record) {
            Ok(blob) => blob,
            Err(e) => {
                warn!("failed to encode session record: {e}");
                return;
            }
        };
        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!("failed to create {}: {e}", parent.display());
                return;
            }
        }
        if let Err(e) = std::fs::write(&self.path, blob) {
            warn!("failed to write session record {}: {e}", self.path.display());
        }
    }

    fn load(&self, module_id: &str) -> Option<SessionRecord> {
        let blob = match std::fs::read_to_string(&self.path) {
            Ok(blob) => blob,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("failed to read session record {}: {e}", self.path.display());
                return None;
            }
        };
        decode(&blob, module_id)
    }

    fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("failed to remove session record {}: {e}", self.path.display()),
        }
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Keeps the serialized record in memory. Useful for embedding and tests.
#[derive(Default)]
pub struct MemorySessionStore {
    blob: Mutex<Option<String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored blob verbatim, bypassing serialization.
    pub fn put_raw(&self, blob: &str) {
        if let Ok(mut slot) = self.blob.lock() {
            *slot = Some(blob.to_string());
        }
    }

    /// The record regardless of module, if one is stored and decodes.
    pub fn peek(&self) -> Option<SessionRecord> {
        let slot = self.blob.lock().ok()?;
        serde_json::from_str(slot.as_deref()?).ok()
    }

    pub fn is_empty(&self) -> bool {
        self.blob.lock().map(|slot| slot.is_none()).unwrap_or(true)
    }
}

impl SessionStore for MemorySessionStore {
    fn save(&self, record: &SessionRecord) {
        match (serde_json::to_string(record), self.blob.lock()) {
            (Ok(blob), Ok(mut slot)) => *slot = Some(blob),
            (Err(e), _) => warn!("failed to encode session record: {e}"),
            (_, Err(_)) => warn!("session store lock poisoned; record not saved"),
        }
    }

    fn load(&self, module_id: &str) -> Option<SessionRecord> {
        let slot = self.blob.lock().ok()?;
        decode(slot.as_deref()?, module_id)
    }

    fn clear(&self) {
        if let Ok(mut slot) = self.blob.lock() {
            *slot = None;
        }
    }
}
