//! Dual-source order store.
//!
//! Maintains the authoritative merged view of the order set across the
//! remote source and the local fallback cache, keyed by order identifier.
//! The remote copy wins entirely whenever both sources hold the same
//! identifier - no field-level merging across sources, so callers never
//! observe a hybrid record.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use purestream_core::Order;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::diff::Snapshot;
use crate::error::SyncError;
use crate::fallback::FallbackStore;
use crate::normalize::Normalizer;
use crate::source::RemoteSource;

/// Result of a [`OrderStore::load_all`] refresh.
#[derive(Debug, Clone)]
pub struct LoadReport {
    /// The merged, normalized, reconciled order set.
    pub snapshot: Snapshot,
    /// Present when the refresh degraded to local-only data; describes
    /// why the remote could not be used. Advisory, not fatal.
    pub advisory: Option<String>,
}

/// Result of an [`OrderStore::upsert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The remote confirmed the write.
    Confirmed,
    /// The remote did not confirm; the record is persisted locally and
    /// flagged for retry on the next refresh.
    PendingSync { reason: String },
}

/// Result of an [`OrderStore::remove`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The remote confirmed the delete (or had already forgotten the id).
    Confirmed,
    /// Local removal succeeded but the remote did not confirm.
    RemoteUnconfirmed { reason: String },
}

struct StoreState {
    merged: Snapshot,
    /// Out-of-band pending-sync flags; never part of a canonical order.
    pending_sync: BTreeSet<String>,
}

/// The merged authoritative view over a remote source and a local
/// fallback cache.
///
/// Safe to share between concurrent readers and writers: every
/// `load_all` computes its merge from a consistent read of current
/// state, and writes apply atomically with respect to readers.
pub struct OrderStore {
    remote: Arc<dyn RemoteSource>,
    fallback: Arc<dyn FallbackStore>,
    normalizer: Normalizer,
    state: tokio::sync::RwLock<StoreState>,
}

impl OrderStore {
    /// Create a store over the given sources.
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteSource>, fallback: Arc<dyn FallbackStore>) -> Self {
        Self::with_normalizer(remote, fallback, Normalizer::new(Utc::now()))
    }

    /// Create a store with a caller-configured normalizer.
    #[must_use]
    pub fn with_normalizer(
        remote: Arc<dyn RemoteSource>,
        fallback: Arc<dyn FallbackStore>,
        normalizer: Normalizer,
    ) -> Self {
        Self {
            remote,
            fallback,
            normalizer,
            state: tokio::sync::RwLock::new(StoreState {
                merged: Snapshot::new(),
                pending_sync: BTreeSet::new(),
            }),
        }
    }

    /// Refresh the merged order set.
    ///
    /// Flushes pending-sync records first, then fetches the remote
    /// collection. On remote failure the call degrades to the local
    /// fallback and reports an advisory instead of failing.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::TotalFailure`] only when the remote *and* the
    /// local fallback are unavailable, so callers can tell "no orders"
    /// from "could not determine orders".
    #[instrument(skip(self))]
    pub async fn load_all(&self) -> Result<LoadReport, SyncError> {
        self.flush_pending().await;

        match self.remote.list().await {
            Ok(records) => Ok(self.merge_remote(records).await),
            Err(remote_err) if remote_err.is_degradable() => {
                warn!(error = %remote_err, "remote unavailable; serving local fallback");
                self.load_from_fallback(&remote_err).await
            }
            Err(other) => Err(other),
        }
    }

    /// Write-through upsert.
    ///
    /// The merged set and the fallback cache are always updated; when the
    /// remote does not confirm, the record is flagged pending-sync and
    /// the outcome says so rather than silently dropping the write.
    /// Conflicting upserts for the same id resolve last-write-wins.
    ///
    /// # Errors
    ///
    /// Returns an error only when the order cannot be serialized, which
    /// indicates a bug rather than an environmental failure.
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn upsert(&self, order: Order) -> Result<WriteOutcome, SyncError> {
        let record = serde_json::to_value(&order)
            .map_err(|e| SyncError::MalformedPayload(e.to_string()))?;

        let remote_result = match self.remote.replace(&order.id, &record).await {
            Err(SyncError::NotFound(_)) => self.remote.create(&record).await,
            other => other,
        };

        if let Err(e) = self.fallback.write(&order.id, &record).await {
            warn!(order_id = %order.id, error = %e, "fallback write failed");
        }

        let id = order.id.clone();
        {
            let mut state = self.state.write().await;
            state.merged.insert(id.clone(), order);
            match &remote_result {
                Ok(_) => {
                    state.pending_sync.remove(&id);
                }
                Err(_) => {
                    state.pending_sync.insert(id.clone());
                }
            }
        }

        match remote_result {
            Ok(_) => Ok(WriteOutcome::Confirmed),
            Err(e) => {
                warn!(order_id = %id, error = %e, "remote write unconfirmed; flagged pending-sync");
                Ok(WriteOutcome::PendingSync {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Delete an order everywhere.
    ///
    /// Local removal is never blocked by a remote failure, but the caller
    /// is told when the remote side did not confirm.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: &str) -> RemoveOutcome {
        let remote_result = self.remote.delete(id).await;

        if let Err(e) = self.fallback.remove(id).await {
            warn!(order_id = %id, error = %e, "fallback delete failed");
        }
        {
            let mut state = self.state.write().await;
            state.merged.remove(id);
            state.pending_sync.remove(id);
        }

        match remote_result {
            // Already gone remotely counts as confirmed.
            Ok(()) | Err(SyncError::NotFound(_)) => RemoveOutcome::Confirmed,
            Err(e) => {
                warn!(order_id = %id, error = %e, "remote delete unconfirmed");
                RemoveOutcome::RemoteUnconfirmed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// A consistent copy of the current merged order set.
    pub async fn snapshot(&self) -> Snapshot {
        self.state.read().await.merged.clone()
    }

    /// Identifiers currently flagged pending remote sync.
    pub async fn pending_ids(&self) -> Vec<String> {
        self.state
            .read()
            .await
            .pending_sync
            .iter()
            .cloned()
            .collect()
    }

    /// Retry every pending-sync record against the remote. Best effort;
    /// records that still fail stay flagged for the next refresh.
    async fn flush_pending(&self) {
        let pending: Vec<(String, Order)> = {
            let state = self.state.read().await;
            state
                .pending_sync
                .iter()
                .filter_map(|id| state.merged.get(id).map(|o| (id.clone(), o.clone())))
                .collect()
        };

        for (id, order) in pending {
            let Ok(record) = serde_json::to_value(&order) else {
                continue;
            };
            let result = match self.remote.replace(&id, &record).await {
                Err(SyncError::NotFound(_)) => self.remote.create(&record).await,
                other => other,
            };
            match result {
                Ok(_) => {
                    debug!(order_id = %id, "pending-sync record flushed to remote");
                    self.state.write().await.pending_sync.remove(&id);
                }
                Err(e) => {
                    debug!(order_id = %id, error = %e, "pending-sync flush failed; will retry");
                }
            }
        }
    }

    /// Build the merged set from a successful remote fetch.
    ///
    /// Remote records win by identifier; retained local-only records that
    /// are still awaiting remote sync are carried over. Items and
    /// address are immutable once set: the retained values survive
    /// re-ingestion unless they were absent.
    async fn merge_remote(&self, records: Vec<Value>) -> LoadReport {
        let (retained, pending) = {
            let state = self.state.read().await;
            (state.merged.clone(), state.pending_sync.clone())
        };

        let mut merged = Snapshot::new();
        for record in &records {
            match self.normalizer.normalize(record) {
                Ok(order) => {
                    let order = match retained.get(&order.id) {
                        Some(previous) => merge_preserving(previous, order),
                        None => order,
                    };
                    merged.insert(order.id.clone(), order);
                }
                Err(e) => {
                    // Never fatal to the batch; the record is skipped.
                    warn!(error = %e, "skipping unusable remote record");
                }
            }
        }

        // Orders created while the remote was unreachable have no remote
        // copy yet; dropping them here would lose the write.
        for id in &pending {
            if let Some(order) = retained.get(id) {
                merged.entry(id.clone()).or_insert_with(|| order.clone());
            }
        }

        // Mirror the merged set so a later degraded read has fresh data.
        for (id, order) in &merged {
            if let Ok(record) = serde_json::to_value(order) {
                if let Err(e) = self.fallback.write(id, &record).await {
                    warn!(order_id = %id, error = %e, "fallback mirror write failed");
                    break;
                }
            }
        }

        self.state.write().await.merged = merged.clone();
        LoadReport {
            snapshot: merged,
            advisory: None,
        }
    }

    /// Degraded read path: serve the fallback cache plus anything already
    /// retained in memory.
    async fn load_from_fallback(&self, remote_err: &SyncError) -> Result<LoadReport, SyncError> {
        let records = match self.fallback.read_all().await {
            Ok(records) => records,
            Err(local_err) => {
                return Err(SyncError::TotalFailure {
                    remote: remote_err.to_string(),
                    local: local_err.to_string(),
                });
            }
        };

        let retained = self.state.read().await.merged.clone();
        let mut merged = retained;
        for record in &records {
            match self.normalizer.normalize(record) {
                Ok(order) => {
                    let order = match merged.get(&order.id) {
                        Some(previous) => merge_preserving(previous, order),
                        None => order,
                    };
                    merged.insert(order.id.clone(), order);
                }
                Err(e) => warn!(error = %e, "skipping unusable fallback record"),
            }
        }

        self.state.write().await.merged = merged.clone();
        Ok(LoadReport {
            snapshot: merged,
            advisory: Some(format!("serving locally cached orders: {remote_err}")),
        })
    }
}

/// Apply the re-ingestion mutation rule: status and financials follow the
/// incoming copy, items and address keep their first-seen values.
fn merge_preserving(previous: &Order, mut incoming: Order) -> Order {
    if !previous.items.is_empty() {
        incoming.items = previous.items.clone();
    }
    if !previous.address.is_empty() {
        incoming.address = previous.address.clone();
    }
    incoming
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use serde_json::json;
    use std::sync::Mutex;

    use crate::fallback::MemoryStore;

    /// Scripted remote source: serves a fixed record set, optionally
    /// failing, and records writes.
    #[derive(Default)]
    struct FakeRemote {
        records: Mutex<Vec<Value>>,
        fail: Mutex<bool>,
        writes: Mutex<Vec<String>>,
    }

    impl FakeRemote {
        fn serving(records: Vec<Value>) -> Self {
            Self {
                records: Mutex::new(records),
                ..Self::default()
            }
        }

        fn set_failing(&self, failing: bool) {
            *self.fail.lock().unwrap() = failing;
        }

        fn check(&self) -> Result<(), SyncError> {
            if *self.fail.lock().unwrap() {
                Err(SyncError::SourceUnavailable("scripted outage".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl RemoteSource for FakeRemote {
        async fn list(&self) -> Result<Vec<Value>, SyncError> {
            self.check()?;
            Ok(self.records.lock().unwrap().clone())
        }

        async fn get(&self, id: &str) -> Result<Value, SyncError> {
            self.check()?;
            self.records
                .lock()
                .unwrap()
                .iter()
                .find(|r| r["orderId"] == id || r["id"] == id)
                .cloned()
                .ok_or_else(|| SyncError::NotFound(id.to_string()))
        }

        async fn create(&self, record: &Value) -> Result<Value, SyncError> {
            self.check()?;
            self.records.lock().unwrap().push(record.clone());
            self.writes
                .lock()
                .unwrap()
                .push(record["id"].as_str().unwrap_or_default().to_string());
            Ok(record.clone())
        }

        async fn replace(&self, id: &str, record: &Value) -> Result<Value, SyncError> {
            self.check()?;
            let mut records = self.records.lock().unwrap();
            let existing = records
                .iter_mut()
                .find(|r| r["orderId"] == id || r["id"] == id)
                .ok_or_else(|| SyncError::NotFound(id.to_string()))?;
            *existing = record.clone();
            self.writes.lock().unwrap().push(id.to_string());
            Ok(record.clone())
        }

        async fn patch(&self, id: &str, _patch: &Value) -> Result<Value, SyncError> {
            self.check()?;
            self.get(id).await
        }

        async fn delete(&self, id: &str) -> Result<(), SyncError> {
            self.check()?;
            let mut records = self.records.lock().unwrap();
            let before = records.len();
            records.retain(|r| r["orderId"] != id && r["id"] != id);
            if records.len() == before {
                return Err(SyncError::NotFound(id.to_string()));
            }
            Ok(())
        }
    }

    fn store_over(remote: Arc<FakeRemote>, fallback: Arc<MemoryStore>) -> OrderStore {
        OrderStore::with_normalizer(
            remote,
            fallback,
            Normalizer::new(Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap()),
        )
    }

    fn remote_record(id: &str, status: &str) -> Value {
        json!({
            "orderId": id,
            "status": status,
            "items": [{"name": "RO Unit", "price": 1500}]
        })
    }

    #[tokio::test]
    async fn test_load_all_normalizes_remote_records() {
        let remote = Arc::new(FakeRemote::serving(vec![
            remote_record("ORD-1", "pending"),
            remote_record("ORD-2", "shipped"),
        ]));
        let store = store_over(remote, Arc::new(MemoryStore::new()));

        let report = store.load_all().await.unwrap();
        assert!(report.advisory.is_none());
        assert_eq!(report.snapshot.len(), 2);
        assert_eq!(
            report.snapshot.get("ORD-2").unwrap().status.to_string(),
            "shipped"
        );
    }

    #[tokio::test]
    async fn test_remote_copy_wins_over_fallback() {
        let fallback = Arc::new(MemoryStore::new());
        fallback
            .write("ORD-1", &remote_record("ORD-1", "pending"))
            .await
            .unwrap();
        let remote = Arc::new(FakeRemote::serving(vec![remote_record("ORD-1", "shipped")]));
        let store = store_over(remote, fallback);

        let report = store.load_all().await.unwrap();
        let order = report.snapshot.get("ORD-1").unwrap();
        assert_eq!(order.status.to_string(), "shipped");
    }

    #[tokio::test]
    async fn test_degraded_read_serves_fallback() {
        let fallback = Arc::new(MemoryStore::new());
        fallback
            .write("ORD-1", &remote_record("ORD-1", "pending"))
            .await
            .unwrap();
        let remote = Arc::new(FakeRemote::default());
        remote.set_failing(true);
        let store = store_over(remote, fallback);

        let report = store.load_all().await.unwrap();
        assert!(report.advisory.is_some());
        assert_eq!(report.snapshot.len(), 1);
        assert!(report.snapshot.contains_key("ORD-1"));
    }

    #[tokio::test]
    async fn test_total_failure_is_explicit() {
        struct BrokenFallback;
        #[async_trait]
        impl FallbackStore for BrokenFallback {
            async fn read_all(&self) -> Result<Vec<Value>, SyncError> {
                Err(SyncError::SourceUnavailable("disk gone".to_string()))
            }
            async fn write(&self, _id: &str, _record: &Value) -> Result<(), SyncError> {
                Err(SyncError::SourceUnavailable("disk gone".to_string()))
            }
            async fn remove(&self, _id: &str) -> Result<(), SyncError> {
                Err(SyncError::SourceUnavailable("disk gone".to_string()))
            }
        }

        let remote = Arc::new(FakeRemote::default());
        remote.set_failing(true);
        let store = OrderStore::new(remote, Arc::new(BrokenFallback));

        let err = store.load_all().await.unwrap_err();
        assert!(matches!(err, SyncError::TotalFailure { .. }));
    }

    #[tokio::test]
    async fn test_upsert_write_through() {
        let remote = Arc::new(FakeRemote::serving(vec![]));
        let fallback = Arc::new(MemoryStore::new());
        let store = store_over(Arc::clone(&remote), Arc::clone(&fallback));

        let order = store_order(&store, "ORD-9", "pending").await;
        let outcome = store.upsert(order).await.unwrap();
        assert_eq!(outcome, WriteOutcome::Confirmed);
        assert_eq!(fallback.len(), 1);
        assert!(store.pending_ids().await.is_empty());
        assert!(store.snapshot().await.contains_key("ORD-9"));
    }

    #[tokio::test]
    async fn test_upsert_remote_failure_flags_pending() {
        let remote = Arc::new(FakeRemote::default());
        remote.set_failing(true);
        let fallback = Arc::new(MemoryStore::new());
        let store = store_over(Arc::clone(&remote), Arc::clone(&fallback));

        let order = store_order(&store, "ORD-9", "pending").await;
        let outcome = store.upsert(order).await.unwrap();
        assert!(matches!(outcome, WriteOutcome::PendingSync { .. }));
        // Local state still updated; nothing silently disappears.
        assert_eq!(fallback.len(), 1);
        assert_eq!(store.pending_ids().await, vec!["ORD-9".to_string()]);
        assert!(store.snapshot().await.contains_key("ORD-9"));
    }

    #[tokio::test]
    async fn test_pending_record_flushes_on_next_refresh() {
        let remote = Arc::new(FakeRemote::default());
        remote.set_failing(true);
        let store = store_over(Arc::clone(&remote), Arc::new(MemoryStore::new()));

        let order = store_order(&store, "ORD-9", "pending").await;
        store.upsert(order).await.unwrap();
        assert_eq!(store.pending_ids().await.len(), 1);

        // Remote recovers; the next refresh retries the write.
        remote.set_failing(false);
        let report = store.load_all().await.unwrap();
        assert!(store.pending_ids().await.is_empty());
        assert!(report.snapshot.contains_key("ORD-9"));
        assert!(remote.writes.lock().unwrap().contains(&"ORD-9".to_string()));
    }

    #[tokio::test]
    async fn test_remove_is_never_blocked_by_remote() {
        let remote = Arc::new(FakeRemote::serving(vec![remote_record("ORD-1", "pending")]));
        let fallback = Arc::new(MemoryStore::new());
        let store = store_over(Arc::clone(&remote), Arc::clone(&fallback));
        store.load_all().await.unwrap();

        remote.set_failing(true);
        let outcome = store.remove("ORD-1").await;
        assert!(matches!(outcome, RemoveOutcome::RemoteUnconfirmed { .. }));
        assert!(!store.snapshot().await.contains_key("ORD-1"));
        assert!(fallback.is_empty());
    }

    #[tokio::test]
    async fn test_items_immutable_across_reingestion() {
        let remote = Arc::new(FakeRemote::serving(vec![remote_record("ORD-1", "pending")]));
        let store = store_over(Arc::clone(&remote), Arc::new(MemoryStore::new()));
        store.load_all().await.unwrap();

        // The source rewrites the items; the retained ones must survive.
        *remote.records.lock().unwrap() = vec![json!({
            "orderId": "ORD-1",
            "status": "shipped",
            "items": [{"name": "Different Item", "price": 1}]
        })];
        let report = store.load_all().await.unwrap();
        let order = report.snapshot.get("ORD-1").unwrap();
        assert_eq!(order.status.to_string(), "shipped");
        assert_eq!(order.items.first().unwrap().name, "RO Unit");
    }

    async fn store_order(store: &OrderStore, id: &str, status: &str) -> Order {
        store
            .normalizer
            .normalize(&json!({
                "orderId": id,
                "status": status,
                "items": [{"name": "RO Unit", "price": 1500}]
            }))
            .unwrap()
    }
}
