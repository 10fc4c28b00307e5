//! Error types for the mealplan-extract library.
//!
//! Every failure in the pipeline is a [`MealPlanError`]. The four kinds the
//! pipeline distinguishes for the user are:
//!
//! * [`MealPlanError::Configuration`]: a service credential is missing; no
//!   request was sent.
//! * [`MealPlanError::EmptyResult`]: the parsing service answered but
//!   returned no content.
//! * [`MealPlanError::Upstream`]: transport or remote failure from either
//!   service.
//! * [`MealPlanError::MalformedResponse`]: the language model answered with
//!   something that is not a meal plan. The raw text is kept for diagnostics.
//!
//! Input, configuration and internal variants cover the remaining local
//! failures. [`MealPlanError::kind`] folds every variant into an
//! [`ErrorKind`] so the session state machine can record *what* failed
//! without holding on to the full error.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the mealplan-extract library.
#[derive(Debug, Error)]
pub enum MealPlanError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The uploaded document cannot be processed (empty, wrong type, …).
    #[error("Invalid input '{input}': {reason}")]
    InvalidInput { input: String, reason: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The bytes were read, but they are not a PDF.
    #[error("Document '{name}' is not a valid PDF\nFirst bytes: {magic:?}")]
    NotAPdf { name: String, magic: Vec<u8> },

    // ── Service errors ────────────────────────────────────────────────────
    /// A service credential was not supplied. Raised before any request.
    #[error("{service} is not configured.\n{hint}")]
    Configuration { service: String, hint: String },

    /// The parsing service completed but produced no text.
    #[error("{service} returned no parsed content for this document")]
    EmptyResult { service: String },

    /// Transport error or error status from a remote service.
    #[error("{service} request failed: {message}")]
    Upstream { service: String, message: String },

    /// The language model response is not valid JSON, or not a meal plan.
    ///
    /// `raw` holds the response text exactly as received.
    #[error("Malformed language-model response: {reason}")]
    MalformedResponse { reason: String, raw: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (temp file staging, task join, …).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MealPlanError {
    /// Coarse classification used by [`crate::session::SessionState::Failed`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            MealPlanError::Configuration { .. } | MealPlanError::InvalidConfig(_) => {
                ErrorKind::Configuration
            }
            MealPlanError::EmptyResult { .. } => ErrorKind::EmptyResult,
            MealPlanError::Upstream { .. }
            | MealPlanError::DownloadFailed { .. }
            | MealPlanError::DownloadTimeout { .. } => ErrorKind::Upstream,
            MealPlanError::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            MealPlanError::FileNotFound { .. }
            | MealPlanError::PermissionDenied { .. }
            | MealPlanError::InvalidInput { .. }
            | MealPlanError::NotAPdf { .. } => ErrorKind::InvalidInput,
            MealPlanError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The raw language-model text, when this is a malformed-response error.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            MealPlanError::MalformedResponse { raw, .. } => Some(raw),
            _ => None,
        }
    }

    pub(crate) fn upstream(service: &str, message: impl fmt::Display) -> Self {
        MealPlanError::Upstream {
            service: service.to_string(),
            message: message.to_string(),
        }
    }
}

/// What went wrong, without the details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    Configuration,
    EmptyResult,
    Upstream,
    MalformedResponse,
    InvalidInput,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Configuration => "configuration error",
            ErrorKind::EmptyResult => "empty result",
            ErrorKind::Upstream => "upstream service error",
            ErrorKind::MalformedResponse => "malformed response",
            ErrorKind::InvalidInput => "invalid input",
            ErrorKind::Internal => "internal error",
        };
        f.write_str(s)
    }
}
