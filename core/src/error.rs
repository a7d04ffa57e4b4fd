//! Error types for the engine client.
//!
//! # Design
//! Every failure the client can produce collapses into one [`ApiError`]
//! carrying a closed [`ErrorKind`]. Callers branch on the kind; the message is
//! for humans and the boxed source keeps the original cause (a serde error, a
//! transport error, a reference parse error) for logging.
//!
//! Classification happens exactly once, at the boundary where a response or a
//! transport failure first becomes visible: [`classify_response`] for non-2xx
//! statuses and `From<TransportError>` for round-trips that never produced a
//! status.

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

use crate::reference::ReferenceError;
use crate::transport::TransportError;

/// Boxed underlying cause attached to an [`ApiError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The closed set of failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad caller input, detected locally or signalled by a 4xx status.
    InvalidArgument,
    /// 401.
    Unauthenticated,
    /// 403.
    PermissionDenied,
    /// 404.
    NotFound,
    /// 409.
    Conflict,
    /// 412.
    FailedPrecondition,
    /// 5xx without a more specific mapping.
    Internal,
    /// 501.
    NotImplemented,
    /// 503.
    Unavailable,
    /// A status outside the 4xx/5xx ranges that still was not a success.
    Unknown,
    /// A 2xx body that does not match the expected schema.
    Decoding,
    /// No HTTP response was obtained.
    Transport,
}

impl ErrorKind {
    /// Map a non-success HTTP status onto a kind.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => ErrorKind::InvalidArgument,
            401 => ErrorKind::Unauthenticated,
            403 => ErrorKind::PermissionDenied,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::Conflict,
            412 => ErrorKind::FailedPrecondition,
            501 => ErrorKind::NotImplemented,
            503 => ErrorKind::Unavailable,
            402..=499 => ErrorKind::InvalidArgument,
            500..=599 => ErrorKind::Internal,
            _ => ErrorKind::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::FailedPrecondition => "failed_precondition",
            ErrorKind::Internal => "internal",
            ErrorKind::NotImplemented => "not_implemented",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Unknown => "unknown",
            ErrorKind::Decoding => "decoding",
            ErrorKind::Transport => "transport",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified client error: kind, message, optional status and cause.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    status: Option<u16>,
    #[source]
    source: Option<BoxError>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            source: None,
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status of the response that produced this error, if one arrived.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn is_invalid_argument(&self) -> bool {
        self.kind == ErrorKind::InvalidArgument
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    pub fn is_conflict(&self) -> bool {
        self.kind == ErrorKind::Conflict
    }

    pub fn is_internal(&self) -> bool {
        self.kind == ErrorKind::Internal
    }

    pub fn is_unavailable(&self) -> bool {
        self.kind == ErrorKind::Unavailable
    }

    pub fn is_transport(&self) -> bool {
        self.kind == ErrorKind::Transport
    }
}

/// Error payload the daemon sends alongside non-2xx statuses.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: String,
}

/// Classify a non-success response.
///
/// The kind always follows the status. A JSON body with a non-blank
/// `message` replaces the generic status text; empty or non-JSON bodies fall
/// back to it.
pub fn classify_response(status: u16, body: &str) -> ApiError {
    let kind = ErrorKind::from_status(status);
    let message = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .map(|payload| payload.message.trim().to_string())
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| status_message(status));
    ApiError::new(kind, message).with_status(status)
}

fn status_message(status: u16) -> String {
    match reason_phrase(status) {
        Some(reason) => format!("request returned {status} {reason}"),
        None => format!("request returned {status}"),
    }
}

fn reason_phrase(status: u16) -> Option<&'static str> {
    let reason = match status {
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        412 => "Precondition Failed",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => return None,
    };
    Some(reason)
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        ApiError::new(ErrorKind::Transport, format!("error during connect: {err}")).with_source(err)
    }
}

impl From<ReferenceError> for ApiError {
    fn from(err: ReferenceError) -> Self {
        ApiError::invalid_argument(err.to_string()).with_source(err)
    }
}
