//! PureStream order normalization and synchronization engine.
//!
//! Ingests order records of inconsistent shape from a remote source and
//! a local fallback store, reconciles them into the canonical
//! [`purestream_core::Order`] model with derived financial totals, and
//! keeps consuming views consistent with the authoritative source
//! through periodic polling with exactly-once change reporting.
//!
//! # Data flow
//!
//! Raw records (remote source / local fallback) -> [`normalize::Normalizer`]
//! -> canonical orders -> [`reconcile`] (derived totals) ->
//! [`store::OrderStore`] (merged, de-duplicated) ->
//! [`scheduler::SyncScheduler`] (periodic re-fetch) ->
//! [`diff::diff_snapshots`] -> transition events ->
//! [`notify::NotificationSink`].
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use purestream_sync::config::SyncConfig;
//! use purestream_sync::fallback::MemoryStore;
//! use purestream_sync::notify::TracingSink;
//! use purestream_sync::scheduler::SyncScheduler;
//! use purestream_sync::source::HttpRemoteSource;
//! use purestream_sync::store::OrderStore;
//!
//! let config = SyncConfig::from_env()?;
//! let remote = Arc::new(HttpRemoteSource::new(&config.remote_url, config.api_key.clone()));
//! let store = Arc::new(OrderStore::new(remote, Arc::new(MemoryStore::new())));
//!
//! let scheduler = SyncScheduler::start(
//!     Arc::clone(&store),
//!     Arc::new(TracingSink),
//!     config.poll_interval,
//! );
//! // ... later:
//! scheduler.shutdown().await;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod diff;
pub mod error;
pub mod fallback;
pub mod normalize;
pub mod notify;
pub mod raw;
pub mod reconcile;
pub mod scheduler;
pub mod source;
pub mod store;

pub use config::SyncConfig;
pub use diff::{Snapshot, diff_snapshots};
pub use error::{NormalizationError, SyncError};
pub use fallback::{FallbackStore, MemoryStore};
pub use normalize::Normalizer;
pub use notify::{ChannelSink, NotificationSink, TracingSink};
pub use scheduler::SyncScheduler;
pub use source::{HttpRemoteSource, RemoteSource};
pub use store::{LoadReport, OrderStore, RemoveOutcome, WriteOutcome};
