//! Remote order source protocol.
//!
//! The authoritative store exposes a record-oriented REST interface over
//! a collection of order records keyed by identifier. The engine only
//! assumes JSON-shaped payloads; any superset or subset of the canonical
//! fields is tolerated by the normalizer downstream.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::error;

use crate::error::SyncError;

/// The authoritative remote order collection.
///
/// Implementations map their transport failures onto the engine's
/// taxonomy: unreachable/non-success responses as
/// [`SyncError::SourceUnavailable`], unparseable payloads as
/// [`SyncError::MalformedPayload`], rejected record-level writes as
/// [`SyncError::WriteConflict`].
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fetch every record in the collection.
    async fn list(&self) -> Result<Vec<Value>, SyncError>;

    /// Fetch one record by identifier.
    async fn get(&self, id: &str) -> Result<Value, SyncError>;

    /// Create a new record; returns the stored representation.
    async fn create(&self, record: &Value) -> Result<Value, SyncError>;

    /// Replace the record stored under `id`.
    async fn replace(&self, id: &str, record: &Value) -> Result<Value, SyncError>;

    /// Apply a partial update to the record stored under `id`.
    async fn patch(&self, id: &str, patch: &Value) -> Result<Value, SyncError>;

    /// Delete the record stored under `id`.
    async fn delete(&self, id: &str) -> Result<(), SyncError>;
}

/// REST implementation of [`RemoteSource`].
///
/// Talks to a `{base_url}/orders` collection with optional bearer
/// authentication.
pub struct HttpRemoteSource {
    client: reqwest::Client,
    collection_url: String,
    api_key: Option<SecretString>,
}

impl HttpRemoteSource {
    /// Create a client for the order collection under `base_url`.
    #[must_use]
    pub fn new(base_url: &str, api_key: Option<SecretString>) -> Self {
        Self {
            client: reqwest::Client::new(),
            collection_url: format!("{}/orders", base_url.trim_end_matches('/')),
            api_key,
        }
    }

    fn record_url(&self, id: &str) -> String {
        format!("{}/{id}", self.collection_url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key.expose_secret()),
            None => request,
        }
    }

    /// Send a request and parse the JSON body, mapping failures onto the
    /// engine's error taxonomy. `id` is the record the request targets,
    /// when it targets one.
    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
        id: Option<&str>,
    ) -> Result<Value, SyncError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| SyncError::SourceUnavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SyncError::SourceUnavailable(e.to_string()))?;

        if let Some(err) = status_error(status, id, &body) {
            if matches!(err, SyncError::SourceUnavailable(_)) {
                error!(
                    status = %status,
                    body = %truncate(&body, 500),
                    "remote order source returned non-success status"
                );
            }
            return Err(err);
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).map_err(|e| {
            error!(
                error = %e,
                body = %truncate(&body, 500),
                "failed to parse remote order payload"
            );
            SyncError::MalformedPayload(e.to_string())
        })
    }
}

#[async_trait]
impl RemoteSource for HttpRemoteSource {
    async fn list(&self) -> Result<Vec<Value>, SyncError> {
        let payload = self
            .execute(self.client.get(&self.collection_url), None)
            .await?;
        match payload {
            Value::Array(records) => Ok(records),
            // Some store versions wrap the collection in an envelope.
            Value::Object(mut envelope) => match envelope.remove("orders") {
                Some(Value::Array(records)) => Ok(records),
                _ => Err(SyncError::MalformedPayload(
                    "expected a record collection".to_string(),
                )),
            },
            _ => Err(SyncError::MalformedPayload(
                "expected a record collection".to_string(),
            )),
        }
    }

    async fn get(&self, id: &str) -> Result<Value, SyncError> {
        self.execute(self.client.get(self.record_url(id)), Some(id))
            .await
    }

    async fn create(&self, record: &Value) -> Result<Value, SyncError> {
        self.execute(self.client.post(&self.collection_url).json(record), None)
            .await
    }

    async fn replace(&self, id: &str, record: &Value) -> Result<Value, SyncError> {
        self.execute(self.client.put(self.record_url(id)).json(record), Some(id))
            .await
    }

    async fn patch(&self, id: &str, patch: &Value) -> Result<Value, SyncError> {
        self.execute(self.client.patch(self.record_url(id)).json(patch), Some(id))
            .await
    }

    async fn delete(&self, id: &str) -> Result<(), SyncError> {
        self.execute(self.client.delete(self.record_url(id)), Some(id))
            .await
            .map(|_| ())
    }
}

/// Map a response status onto the error taxonomy. `id` is the record
/// the request targeted, when it targeted one; it keeps `NotFound` and
/// `WriteConflict` tied to the record rather than the response body.
fn status_error(status: reqwest::StatusCode, id: Option<&str>, body: &str) -> Option<SyncError> {
    if status == reqwest::StatusCode::NOT_FOUND {
        return Some(SyncError::NotFound(match id {
            Some(id) => id.to_string(),
            None => truncate(body, 200),
        }));
    }
    if status == reqwest::StatusCode::CONFLICT {
        if let Some(id) = id {
            return Some(SyncError::WriteConflict {
                id: id.to_string(),
                reason: truncate(body, 200),
            });
        }
    }
    if status.is_success() {
        None
    } else {
        Some(SyncError::SourceUnavailable(format!("HTTP {status}")))
    }
}

fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
