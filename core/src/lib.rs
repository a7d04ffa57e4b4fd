//! Synchronous engine API client core for committing containers to images.
//!
//! # Overview
//! Builds `HttpRequest` values, hands them to an injected [`Transport`], and
//! parses the `HttpResponse` into a typed result or a classified [`ApiError`].
//! The transport is the only component that does I/O, so everything else is
//! deterministic and testable with [`mock::MockTransport`].
//!
//! # Design
//! - `EngineClient` is stateless apart from an optional pinned API version.
//! - Each operation is split into `build_*` (produces a request) and
//!   `parse_*` (consumes a response); `container_commit` chains them through
//!   the transport.
//! - Every failure carries an [`ErrorKind`] from a closed set, so callers
//!   branch on the kind instead of matching message text.
//! - Query parameters are an ordered multi-map so repeated keys survive.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod mock;
pub mod reference;
pub mod transport;
pub mod types;

pub use client::{encode_commit_query, validate_id, EngineClient};
pub use config::ClientConfig;
pub use error::{classify_response, ApiError, ErrorKind};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Query};
pub use reference::{Reference, ReferenceError};
pub use transport::{Transport, TransportError, UreqTransport};
pub use types::{CommitOptions, CommitResponse};
