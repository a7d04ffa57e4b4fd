//! Engine API client for the container commit operation.
//!
//! # Design
//! `EngineClient` holds a shared transport and an optional pinned API
//! version; it carries no other state between calls. The operation is split
//! the same way as every other endpoint would be:
//!
//! - `build_commit` validates input and produces an `HttpRequest`,
//! - the transport performs the single round-trip,
//! - `parse_commit` turns the `HttpResponse` into a typed result or a
//!   classified `ApiError`.
//!
//! `container_commit` chains the three. Callers that execute I/O themselves
//! can use `build_*`/`parse_*` directly.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{classify_response, ApiError, ErrorKind};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Query};
use crate::reference::Reference;
use crate::transport::{Transport, UreqTransport};
use crate::types::{CommitOptions, CommitResponse};

/// Route of the commit endpoint, before any version prefix.
pub const COMMIT_PATH: &str = "/commit";

/// API version assumed when a daemon does not report one.
pub const FALLBACK_API_VERSION: &str = "1.24";

/// Client for the engine API.
///
/// Cheap to clone; clones share the transport.
#[derive(Clone)]
pub struct EngineClient {
    transport: Arc<dyn Transport>,
    api_version: Option<String>,
}

impl EngineClient {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
            api_version: None,
        }
    }

    /// Client talking HTTP to `config.host`, with the configured version pin.
    pub fn from_config(config: &ClientConfig) -> Self {
        let client = Self::new(UreqTransport::from_config(config));
        match &config.api_version {
            Some(version) => client.with_api_version(version),
            None => client,
        }
    }

    /// Pin an API version. Paths become `/v<version>/...`; a leading `v` is
    /// accepted. A blank version clears the pin.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        let version = version.into();
        let version = version.trim().trim_start_matches('v');
        self.api_version = (!version.is_empty()).then(|| version.to_string());
        self
    }

    pub fn api_version(&self) -> Option<&str> {
        self.api_version.as_deref()
    }

    /// Reconcile the pinned version with the one the daemon reports.
    ///
    /// Without a pin the daemon's version is adopted. A pin is a ceiling, not
    /// a fixed override: the client downgrades to an older daemon version but
    /// never upgrades past the pin.
    pub fn negotiate_api_version(&mut self, server_version: &str) {
        let server_version = server_version.trim().trim_start_matches('v');
        let server_version = if server_version.is_empty() {
            FALLBACK_API_VERSION
        } else {
            server_version
        };

        let downgrade = match &self.api_version {
            None => true,
            Some(current) => compare_versions(server_version, current) == Ordering::Less,
        };
        if downgrade {
            debug!(from = ?self.api_version, to = server_version, "negotiated API version");
            self.api_version = Some(server_version.to_string());
        }
    }

    fn versioned_path(&self, path: &str) -> String {
        match &self.api_version {
            Some(version) => format!("/v{version}{path}"),
            None => path.to_string(),
        }
    }

    pub fn build_commit(
        &self,
        container: &str,
        options: &CommitOptions,
    ) -> Result<HttpRequest, ApiError> {
        let container = validate_id(container)?;

        let mut query = Query::new();
        query.append("container", container);
        query.extend(encode_commit_query(options)?);

        Ok(HttpRequest {
            method: HttpMethod::Post,
            path: self.versioned_path(COMMIT_PATH),
            query,
            headers: Vec::new(),
            body: None,
        })
    }

    pub fn parse_commit(&self, response: HttpResponse) -> Result<CommitResponse, ApiError> {
        decode(response)
    }

    /// Commit `container` into a new image.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty id or bad reference (no request is
    /// sent), `Transport` if the daemon could not be reached, otherwise the
    /// kind derived from the response status.
    #[instrument(skip_all, fields(container = %container.trim()))]
    pub fn container_commit(
        &self,
        container: &str,
        options: &CommitOptions,
    ) -> Result<CommitResponse, ApiError> {
        let request = self.build_commit(container, options)?;
        debug!(path = %request.path, params = request.query.len(), "sending commit request");

        let result = self
            .transport
            .send(&request)
            .map_err(ApiError::from)
            .and_then(|response| self.parse_commit(response));

        match &result {
            Ok(resp) => debug!(id = %resp.id, "container committed"),
            Err(err) => warn!(
                kind = %err.kind(),
                status = ?err.status(),
                error = %err,
                "commit failed"
            ),
        }
        result
    }
}

impl fmt::Debug for EngineClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineClient")
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

/// Reject identifiers that are empty after trimming; return the trimmed id.
pub fn validate_id(id: &str) -> Result<&str, ApiError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ApiError::invalid_argument(
            "invalid container name or ID: value is empty",
        ));
    }
    Ok(id)
}

/// Encode commit options as query parameters, excluding the container id.
///
/// Only fields that carry a value are emitted, except `pause`, which is
/// always sent as `"1"` or `"0"`.
pub fn encode_commit_query(options: &CommitOptions) -> Result<Query, ApiError> {
    let mut query = Query::new();

    if let Some(raw) = non_empty(&options.reference) {
        let reference = Reference::parse_normalized(raw)?;
        if reference.digest().is_some() {
            return Err(ApiError::invalid_argument(
                "refusing to create a tag with a digest reference",
            ));
        }
        query.append("repo", reference.name());
        if let Some(tag) = reference.tag() {
            query.append("tag", tag);
        }
    }
    if let Some(comment) = non_empty(&options.comment) {
        query.append("comment", comment);
    }
    if let Some(author) = non_empty(&options.author) {
        query.append("author", author);
    }
    for change in &options.changes {
        query.append("changes", change.as_str());
    }
    query.append("pause", if options.pause { "1" } else { "0" });

    Ok(query)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Decode a 2xx body as `T`, or classify the failure.
fn decode<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ApiError> {
    if !response.is_success() {
        return Err(classify_response(response.status, &response.body));
    }
    serde_json::from_str(&response.body).map_err(|e| {
        ApiError::new(ErrorKind::Decoding, format!("failed to decode response: {e}"))
            .with_status(response.status)
            .with_source(e)
    })
}

/// Numeric comparison of dot-separated versions; missing or non-numeric
/// components count as zero.
fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |v: &str| -> Vec<u64> { v.split('.').map(|p| p.parse().unwrap_or(0)).collect() };
    let (a, b) = (parse(a), parse(b));
    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}
