//! Request options and response bodies for the commit operation.
//!
//! # Design
//! These types are the client's own view of the wire contract and are defined
//! independently from the mock daemon. Integration tests catch drift between
//! the two.

use serde::{Deserialize, Serialize};

/// Options for committing a container into a new image.
///
/// Every field may be omitted when deserializing; an absent `pause` means
/// the container is paused while it is committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitOptions {
    /// Target `repository[:tag]`. Short names are qualified with the default
    /// registry before being sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Dockerfile-style instructions applied to the new image, in order.
    pub changes: Vec<String>,
    pub pause: bool,
}

impl Default for CommitOptions {
    fn default() -> Self {
        Self {
            reference: None,
            comment: None,
            author: None,
            changes: Vec::new(),
            pause: true,
        }
    }
}

/// Body of a successful commit: the id of the new image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitResponse {
    #[serde(rename = "Id")]
    pub id: String,
}
