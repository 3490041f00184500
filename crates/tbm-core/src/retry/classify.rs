//! Classify mutation errors into retry policy error kinds.

use crate::retry::error::MutationError;
use crate::retry::policy::ErrorKind;

/// Message substrings that mark an error as rate limiting. Matching is
/// case-sensitive, so "rate limit" in lowercase does not count but any
/// message merely mentioning "403" does.
const RATE_LIMIT_MARKERS: &[&str] = &["Rate limit", "429", "403", "quota"];

/// Probe a human-readable error message for rate-limit markers.
pub fn message_is_rate_limited(message: &str) -> bool {
    RATE_LIMIT_MARKERS.iter().any(|m| message.contains(m))
}

/// Classify an HTTP status code for retry decisions.
pub fn status_is_rate_limited(code: u16) -> bool {
    matches!(code, 429 | 403)
}

/// Classify a mutation error into an ErrorKind.
///
/// Pure function of the error value: calling it twice on the same error
/// yields the same kind.
pub fn classify(e: &MutationError) -> ErrorKind {
    match e {
        MutationError::Api { status, message } => {
            if status.map_or(false, status_is_rate_limited) || message_is_rate_limited(message) {
                ErrorKind::RateLimited
            } else {
                ErrorKind::Transient
            }
        }
        MutationError::Network(message) => {
            if message_is_rate_limited(message) {
                ErrorKind::RateLimited
            } else {
                ErrorKind::Transient
            }
        }
        MutationError::MissingSnapshot { .. } => ErrorKind::Fatal,
    }
}
