//! Mutation error type for retry classification.

use thiserror::Error;

/// Error returned by a single task mutation (API rejection, network failure,
/// or a missing snapshot entry in merge-update mode). Used so we can classify
/// and decide retries before converting to anyhow at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    /// Remote API rejected the call. `status` carries the HTTP status when the
    /// transport surfaced one; `message` is the error body or reason text.
    #[error("{}", api_message(.status, .message))]
    Api {
        status: Option<u16>,
        message: String,
    },
    /// Network-level failure (DNS, connection reset, timeout).
    #[error("network error: {0}")]
    Network(String),
    /// Merge-update mode could not find the task in the prefetched snapshot.
    /// Never retried.
    #[error("no snapshot entry for task {id}")]
    MissingSnapshot { id: String },
}

fn api_message(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("API error (status {}): {}", code, message),
        None => format!("API error: {}", message),
    }
}

impl MutationError {
    /// HTTP status carried by the error, when the transport surfaced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            MutationError::Api { status, .. } => *status,
            MutationError::Network(_) | MutationError::MissingSnapshot { .. } => None,
        }
    }
}
