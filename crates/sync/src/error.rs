//! Error taxonomy for the sync engine.
//!
//! The engine degrades rather than fails: a bad record is skipped, an
//! unreachable remote falls back to local data with an advisory, an
//! unconfirmed write is flagged for retry. The only hard failure is
//! [`SyncError::TotalFailure`], which callers must be able to distinguish
//! from "there are no orders".

use thiserror::Error;

/// A raw record that cannot be turned into a canonical order.
///
/// Raised only when a record carries no usable identifier *and* no
/// derivable item data. Partial records (missing customer, malformed
/// prices) normalize with synthesized defaults instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unusable order record: {reason}")]
pub struct NormalizationError {
    /// What made the record unusable.
    pub reason: String,
}

impl NormalizationError {
    pub(crate) fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by the sync engine.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A raw record could not be normalized. Never fatal to a batch; the
    /// record is logged and skipped.
    #[error(transparent)]
    Normalization(#[from] NormalizationError),

    /// The remote source is unreachable or returned a non-success
    /// response. Triggers the fallback-to-local degrade path.
    #[error("remote source unavailable: {0}")]
    SourceUnavailable(String),

    /// The remote responded but the payload could not be parsed as a
    /// record collection. Treated the same as [`Self::SourceUnavailable`].
    #[error("malformed remote payload: {0}")]
    MalformedPayload(String),

    /// An upsert/remove could not be confirmed by the remote. Local state
    /// is still updated and the record flagged pending-sync; retryable on
    /// the next refresh.
    #[error("write not confirmed by remote for order {id}: {reason}")]
    WriteConflict { id: String, reason: String },

    /// The remote reported the record as missing.
    #[error("order not found: {0}")]
    NotFound(String),

    /// Both the remote source and the local fallback failed. The only
    /// fatal outcome of a load; distinguishes "could not determine
    /// orders" from an empty order set.
    #[error("no order source available (remote: {remote}; local: {local})")]
    TotalFailure { remote: String, local: String },
}

impl SyncError {
    /// Whether a `load_all` can degrade to local data after this error.
    #[must_use]
    pub const fn is_degradable(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable(_) | Self::MalformedPayload(_)
        )
    }
}

/// Result type alias for `SyncError`.
pub type Result<T> = std::result::Result<T, SyncError>;
