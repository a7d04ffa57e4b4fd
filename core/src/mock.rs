//! Deterministic transport for tests.
//!
//! # Design
//! `MockTransport` answers every request with a caller-supplied responder and
//! records what it was sent. Clones share the recording, so a test can keep
//! one handle and give another to the client.
//!
//! # Example
//!
//! ```
//! use engine_client::mock::MockTransport;
//! use engine_client::{CommitOptions, EngineClient};
//!
//! let transport = MockTransport::respond_with(201, r#"{"Id":"sha256:abc"}"#);
//! let client = EngineClient::new(transport.clone());
//!
//! let resp = client.container_commit("web", &CommitOptions::default()).unwrap();
//! assert_eq!(resp.id, "sha256:abc");
//! assert_eq!(transport.requests()[0].query.get("container"), Some("web"));
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{Transport, TransportError};

type Responder = dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync;

/// Mock transport for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping.
#[derive(Clone)]
pub struct MockTransport {
    responder: Arc<Responder>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl MockTransport {
    /// Answer each request by calling `responder`.
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answer every request with the same status and body.
    pub fn respond_with(status: u16, body: impl Into<String>) -> Self {
        let response = HttpResponse::new(status, body);
        Self::new(move |_| Ok(response.clone()))
    }

    /// Fail every request as if the daemon could not be reached.
    pub fn failing(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(move |_| Err(TransportError::new(message.clone())))
    }

    /// Panic if any request is sent. For asserting that validation happens
    /// before I/O.
    pub fn unreachable() -> Self {
        Self::new(|req| panic!("transport must not be invoked, got {} {}", req.method, req.path))
    }

    /// Requests sent so far, oldest first.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockTransport")
            .field("requests", &self.request_count())
            .finish_non_exhaustive()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        (self.responder)(request)
    }
}
