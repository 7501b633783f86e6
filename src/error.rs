//! Error taxonomy for the guard.
//!
//! Benign conditions (host out of scope, panel not rendered yet) are not
//! errors at all; they surface as [`crate::orchestrator::RunOutcome`]
//! variants.  What remains here either reaches the operator
//! ([`ConfigFetchError`]) or indicates a broken word list.

use thiserror::Error;

/// The configuration document could not be retrieved or parsed.  `Display`
/// yields the localized operator-facing message only; the technical cause
/// is kept separately for logs.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ConfigFetchError {
    message: String,
    detail: String,
}

impl ConfigFetchError {
    pub(crate) fn new(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: detail.into(),
        }
    }

    /// Localized message shown to the operator.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Underlying cause (network error, HTTP status, parse error).
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

/// An element waiter ran out of time.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("element not found for selector '{selector}' after {timeout_ms}ms")]
pub struct NotFoundError {
    pub selector: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Error)]
pub enum GuardError {
    #[error(transparent)]
    ConfigFetch(#[from] ConfigFetchError),
    /// A word list entry is not a valid regular expression.
    #[error("invalid NG word pattern: {0}")]
    Pattern(#[from] regex::Error),
    /// Host or word queries were made before a successful fetch.
    #[error("configuration has not been fetched yet")]
    ConfigNotLoaded,
}
