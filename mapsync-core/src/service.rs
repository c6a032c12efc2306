//! The remote collaborative mapping service as seen by the sync engine.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::{Element, ElementRef};

/// Identifier assigned to a changeset by the mapping service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChangesetId(pub u64);

impl fmt::Display for ChangesetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed metadata attached to every changeset opened during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangesetMetadata {
    /// Value of the `created_by` tag.
    pub editor: String,
    /// Value of the `comment` tag.
    pub comment: String,
    /// Optional `description` tag.
    pub description: Option<String>,
}

/// A map note ready for submission.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteDraft {
    /// Latitude, WGS84.
    pub lat: f64,
    /// Longitude, WGS84.
    pub lon: f64,
    /// Rendered note body.
    pub text: String,
}

/// Errors returned by [`MappingService::fetch_element`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The element has never existed (HTTP 404).
    #[error("element {element} not found")]
    NotFound {
        /// Requested element.
        element: ElementRef,
    },
    /// The element was deleted (HTTP 410).
    #[error("element {element} is gone")]
    Gone {
        /// Requested element.
        element: ElementRef,
    },
    /// Any other transport, status or decoding failure.
    #[error(transparent)]
    Other(#[from] ServiceError),
}

impl FetchError {
    /// Whether the element's absence already satisfies the intended edit.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Gone { .. })
    }
}

/// Failures reported by a mapping service call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The service answered with an unexpected HTTP status.
    #[error("request to {url} failed with status {status}: {message}")]
    Http {
        /// Fully qualified request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },
    /// The request timed out.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Fully qualified request URL.
        url: String,
        /// Configured timeout.
        timeout_secs: u64,
    },
    /// The request could not be sent or the response not received.
    #[error("network error contacting {url}: {message}")]
    Network {
        /// Fully qualified request URL.
        url: String,
        /// Transport error description.
        message: String,
    },
    /// The response body could not be interpreted.
    #[error("failed to parse response from {url}: {message}")]
    Parse {
        /// Fully qualified request URL.
        url: String,
        /// Decoder error description.
        message: String,
    },
    /// The service rejected the operation without a transport failure.
    #[error("{operation} rejected: {message}")]
    Rejected {
        /// Operation name, e.g. `create changeset`.
        operation: &'static str,
        /// Explanation.
        message: String,
    },
}

/// Operations the sync engine needs from the remote mapping service.
///
/// Calls are awaited one at a time by a single logical thread of control, so
/// implementations need not be `Send`.
#[async_trait(?Send)]
pub trait MappingService {
    /// Fetch the current state of an element.
    async fn fetch_element(&self, element: ElementRef) -> Result<Element, FetchError>;

    /// Open a changeset carrying `metadata`.
    async fn create_changeset(
        &self,
        metadata: &ChangesetMetadata,
    ) -> Result<ChangesetId, ServiceError>;

    /// Upload `element` under an open changeset.
    async fn send_element(
        &self,
        element: &Element,
        changeset: ChangesetId,
    ) -> Result<(), ServiceError>;

    /// Close a changeset. Best-effort: callers only log failures.
    async fn close_changeset(&self, changeset: ChangesetId) -> Result<(), ServiceError>;

    /// Create a standalone map note.
    async fn create_note(&self, note: &NoteDraft) -> Result<(), ServiceError>;
}
