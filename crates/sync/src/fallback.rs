//! Local fallback store.
//!
//! A simple id -> record store scoped to the process/session. The engine
//! reads it only when the remote source is unreachable, and writes to it
//! both as a mirror of the last good merged set and as the holding pen
//! for provisional (pending-sync) records.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::SyncError;

/// Key -> structured-value store used when the remote is unavailable.
#[async_trait]
pub trait FallbackStore: Send + Sync {
    /// Read every retained record.
    async fn read_all(&self) -> Result<Vec<Value>, SyncError>;

    /// Persist a record under `id`, replacing any previous value.
    async fn write(&self, id: &str, record: &Value) -> Result<(), SyncError>;

    /// Remove the record stored under `id`, if any.
    async fn remove(&self, id: &str) -> Result<(), SyncError>;
}

/// In-memory session-scoped fallback store.
///
/// The bundled default; callers with durable session storage provide
/// their own [`FallbackStore`] implementation instead.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of retained records.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Whether the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl FallbackStore for MemoryStore {
    async fn read_all(&self) -> Result<Vec<Value>, SyncError> {
        let records = self
            .records
            .lock()
            .map_err(|e| SyncError::SourceUnavailable(format!("fallback store poisoned: {e}")))?;
        Ok(records.values().cloned().collect())
    }

    async fn write(&self, id: &str, record: &Value) -> Result<(), SyncError> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| SyncError::SourceUnavailable(format!("fallback store poisoned: {e}")))?;
        records.insert(id.to_string(), record.clone());
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), SyncError> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| SyncError::SourceUnavailable(format!("fallback store poisoned: {e}")))?;
        records.remove(id);
        Ok(())
    }
}
