//! Periodic refresh scheduling.
//!
//! A scheduler drives one view's refresh cadence: on each tick it asks
//! the shared [`OrderStore`] for a fresh merged set, diffs it against the
//! previous snapshot, and forwards the resulting events to the
//! notification sink. Several schedulers (one per view) may poll the
//! same store concurrently.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::diff::{Snapshot, diff_snapshots};
use crate::notify::NotificationSink;
use crate::store::OrderStore;

/// Default refresh cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Handle to a running refresh loop.
///
/// Only the loop body starts refresh cycles, and the cycle is awaited
/// inline: at most one refresh is in flight, and an overdue tick is
/// skipped rather than queued. [`shutdown`](Self::shutdown) lets an
/// in-flight cycle finish but guarantees no further one starts; dropping
/// the handle aborts the task outright so no timer outlives it.
pub struct SyncScheduler {
    handle: Option<JoinHandle<()>>,
    stop: watch::Sender<bool>,
}

impl SyncScheduler {
    /// Spawn a refresh loop over `store`, reporting changes to `sink`.
    ///
    /// The first cycle runs immediately and establishes the baseline
    /// snapshot; it emits no events.
    #[must_use]
    pub fn start(
        store: Arc<OrderStore>,
        sink: Arc<dyn NotificationSink>,
        interval: Duration,
    ) -> Self {
        let (stop, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(store, sink, interval, stop_rx));
        info!(interval_secs = interval.as_secs(), "sync scheduler started");
        Self {
            handle: Some(handle),
            stop,
        }
    }

    /// Stop the loop, letting any in-flight refresh finish.
    ///
    /// When this returns, no further refresh will run.
    pub async fn shutdown(mut self) {
        let _ = self.stop.send(true);
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "sync scheduler task failed during shutdown");
                }
            }
        }
        info!("sync scheduler stopped");
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        // Hard stop for handles dropped without an explicit shutdown.
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn run_loop(
    store: Arc<OrderStore>,
    sink: Arc<dyn NotificationSink>,
    interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    // A tick that fires while a refresh is still running is skipped, not
    // queued; the loop never overlaps cycles.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut previous: Option<Snapshot> = None;
    loop {
        tokio::select! {
            _ = stop_rx.changed() => break,
            _ = ticker.tick() => {}
        }
        if *stop_rx.borrow() {
            break;
        }
        // The refresh is awaited here, not raced against the stop signal:
        // an in-flight cycle always finishes, and a stop takes effect
        // before the next one starts.
        refresh_once(&store, sink.as_ref(), &mut previous).await;
    }
    debug!("sync scheduler loop exited");
}

/// One refresh cycle: load, diff, notify, retain.
async fn refresh_once(
    store: &OrderStore,
    sink: &dyn NotificationSink,
    previous: &mut Option<Snapshot>,
) {
    let report = match store.load_all().await {
        Ok(report) => report,
        Err(e) => {
            // Keep the previous snapshot; a failed cycle must not fake an
            // empty order set into the diff.
            warn!(error = %e, "refresh cycle failed");
            return;
        }
    };
    if let Some(advisory) = &report.advisory {
        debug!(advisory = %advisory, "refresh degraded to local data");
    }

    if let Some(prior) = previous.as_ref() {
        let events = diff_snapshots(prior, &report.snapshot, Utc::now());
        for event in &events {
            sink.notify(event);
        }
        if !events.is_empty() {
            debug!(count = events.len(), "change events delivered");
        }
    }
    *previous = Some(report.snapshot);
}
