//! Error handling for the Musai course pipeline
//!
//! This module provides the error types used across the pipeline and the
//! user-facing error reporting used by the CLI. The error system follows two
//! principles:
//! 1. **Strongly-typed errors** so callers can tell a failed generation from a
//!    degenerate one, or a gated export from a broken store
//! 2. **User-friendly messages** with an explicit retry affordance, because no
//!    generation in this crate is ever retried automatically
//!
//! # Architecture
//!
//! - [`GenerationError`] - failures reported by a [`crate::generation::GenerationService`]
//! - [`MusaiError`] - every failure mode of the pipeline itself
//! - [`ErrorContext`] - wrapper adding suggestions and details for display
//!
//! A cache miss is not an error anywhere in this crate: store reads return
//! `Option` and a `None` simply means "generate it".
//!
//! # Examples
//!
//! ```rust,no_run
//! use musai_course::core::{MusaiError, ErrorContext, user_friendly_error};
//!
//! let error = MusaiError::DraftNotFound { key: "rust%20basics".to_string() };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display(); // colored error with a suggestion to run `musai draft`
//! ```

use colored::Colorize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by the external generation service.
///
/// Every variant is treated the same way by the pipeline: the prior cached
/// state is left untouched and the user is offered a manual retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// The request could not be sent or the connection failed.
    #[error("request to generation service failed: {reason}")]
    Request {
        /// Transport-level failure description
        reason: String,
    },

    /// The service did not answer within the configured timeout.
    #[error("generation service timed out after {0:?}")]
    Timeout(Duration),

    /// The service answered with a non-success HTTP status.
    #[error("generation service returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body (truncated)
        body: String,
    },

    /// The service answered, but the payload could not be understood.
    #[error("generation service returned an invalid response: {reason}")]
    InvalidResponse {
        /// What was wrong with the payload
        reason: String,
    },
}

/// The main error type for pipeline operations
///
/// # Error Categories
///
/// ## Generation
/// - [`Generation`](MusaiError::Generation) - a mandatory generation call failed
/// - [`DegenerateContent`](MusaiError::DegenerateContent) - the call succeeded
///   but produced content below the usefulness floor
/// - [`StaleResponse`](MusaiError::StaleResponse) - the caller went away
///   while the call was outstanding, the response was dropped
/// - [`StillGenerating`](MusaiError::StillGenerating) - another request for
///   the same artifact did not finish within the pending timeout
///
/// ## Course state
/// - [`DraftNotFound`](MusaiError::DraftNotFound), [`LectureNotFound`](MusaiError::LectureNotFound)
/// - [`ExportNotReady`](MusaiError::ExportNotReady) - completeness gate refused
/// - [`InvalidEdit`](MusaiError::InvalidEdit) - an edit could not be applied
/// - [`NoIdentity`](MusaiError::NoIdentity) - the topic normalized to nothing
///
/// ## Environment
/// - [`ConfigError`](MusaiError::ConfigError), [`StoreError`](MusaiError::StoreError)
#[derive(Error, Debug, Clone)]
pub enum MusaiError {
    /// A mandatory generation call failed.
    #[error("Generation failed: {operation}")]
    Generation {
        /// What was being generated (e.g. "course draft for 'rust'")
        operation: String,
        /// Underlying service failure
        #[source]
        source: GenerationError,
    },

    /// Generation succeeded but the result is unusable.
    ///
    /// The existing cached artifact, if any, is kept; regeneration is left to
    /// an explicit user action.
    #[error("Generated content for '{key}' is unusable: {reason}")]
    DegenerateContent {
        /// Identity of the degenerate artifact
        key: String,
        /// Why it was rejected
        reason: String,
    },

    /// The response arrived after the requesting view was closed.
    #[error("Discarded late response for '{key}': the requesting view was closed")]
    StaleResponse {
        /// Identity of the discarded artifact
        key: String,
    },

    /// Export was requested while lectures are still missing.
    #[error("Course is not ready to export: {} lecture(s) missing or too short", missing.len())]
    ExportNotReady {
        /// Titles of the lectures that block the export
        missing: Vec<String>,
    },

    /// Another request for the same artifact is still outstanding.
    #[error("'{key}' is still being generated by another request")]
    StillGenerating {
        /// Identity of the outstanding artifact
        key: String,
    },

    /// An edit could not be applied to the draft.
    #[error("Invalid edit: {reason}")]
    InvalidEdit {
        /// Why the edit was rejected
        reason: String,
    },

    /// No draft is cached for the course.
    #[error("No course draft cached for '{key}'")]
    DraftNotFound {
        /// Course cache key
        key: String,
    },

    /// A lecture index is outside the syllabus.
    #[error("Lecture {index} does not exist (syllabus has {count} entries)")]
    LectureNotFound {
        /// Requested 1-based index
        index: usize,
        /// Number of syllabus entries
        count: usize,
    },

    /// The topic is empty after normalization.
    #[error("Topic is empty after trimming; a course needs a topic")]
    NoIdentity,

    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the problem
        message: String,
    },

    /// The artifact store failed.
    #[error("Artifact store error: {operation} ({path})")]
    StoreError {
        /// Operation that failed
        operation: String,
        /// Path or key involved
        path: String,
    },

    /// Anything else.
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl MusaiError {
    /// Wrap a service failure for the given operation.
    pub fn generation(operation: impl Into<String>, source: GenerationError) -> Self {
        Self::Generation {
            operation: operation.into(),
            source,
        }
    }

    /// True if retrying the same action by hand can reasonably succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Generation { .. }
                | Self::DegenerateContent { .. }
                | Self::StaleResponse { .. }
                | Self::StillGenerating { .. }
        )
    }
}

/// Error context wrapper that provides user-friendly error information
///
/// Suggestions are actionable steps (shown in green), details explain the
/// failure (shown in yellow).
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying pipeline error
    pub error: MusaiError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context without suggestion or details.
    #[must_use]
    pub const fn new(error: MusaiError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    ///
    /// - Error message: red and bold
    /// - Details: yellow
    /// - Suggestion: green
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] suitable for CLI display
///
/// Pipeline errors get tailored suggestions (every generation failure points
/// at the command to re-run by hand). Other errors are reported with their
/// full `anyhow` cause chain.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(musai_error) = error.downcast_ref::<MusaiError>() {
        return create_error_context(musai_error.clone());
    }

    if let Some(generation_error) = error.downcast_ref::<GenerationError>() {
        return create_error_context(MusaiError::generation(
            "request to generation service",
            generation_error.clone(),
        ));
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(MusaiError::ConfigError {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax in ~/.musai/config.toml, or run 'musai config init' to start over");
    }

    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(MusaiError::Other {
        message,
    })
}

/// Map each [`MusaiError`] variant to suggestions and details.
fn create_error_context(error: MusaiError) -> ErrorContext {
    match &error {
        MusaiError::Generation { source, .. } => {
            let details = match source {
                GenerationError::Timeout(_) => {
                    "The workflow backend did not answer in time. Long courses can take several minutes; raise [service] timeout_secs if this keeps happening"
                }
                GenerationError::Status { status, .. } if *status == 401 || *status == 403 => {
                    "The workflow backend rejected the request. Check [service] api_key or MUSAI_API_KEY"
                }
                _ => "Nothing was written to the cache; the previous state is unchanged",
            };
            let source_text = source.to_string();
            ErrorContext::new(error)
                .with_suggestion("Run the same command again to retry; generation is never retried automatically")
                .with_details(format!("{source_text}. {details}"))
        }

        MusaiError::DegenerateContent { .. } => ErrorContext::new(error)
            .with_suggestion("Run 'musai regenerate <topic>' to discard the result and generate again")
            .with_details("The service answered, but with empty or content-free output. It will not be requested again automatically"),

        MusaiError::StaleResponse { .. } => ErrorContext::new(error)
            .with_suggestion("Open the course again to request it anew"),

        MusaiError::StillGenerating { .. } => ErrorContext::new(error)
            .with_suggestion("Wait for the running request to finish, then run the command again")
            .with_details("Only one request per artifact is sent to the workflow backend at a time"),

        MusaiError::ExportNotReady { missing } => {
            let list = missing.iter().map(|t| format!("  - {t}")).collect::<Vec<_>>().join("\n");
            ErrorContext::new(error)
                .with_suggestion("Open each missing lecture with 'musai lecture <topic> <n>', or pass --force to export what exists")
                .with_details(format!("Lectures without usable content:\n{list}"))
        }

        MusaiError::DraftNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Generate the course first with 'musai draft <topic>'"),

        MusaiError::LectureNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Run 'musai status <topic>' to list lecture numbers"),

        MusaiError::NoIdentity => ErrorContext::new(error)
            .with_suggestion("Pass a non-empty topic, e.g. musai draft \"Quantum Physics\""),

        MusaiError::ConfigError { .. } => ErrorContext::new(error)
            .with_suggestion("Run 'musai config show' to inspect the effective configuration"),

        MusaiError::StoreError { .. } => ErrorContext::new(error)
            .with_suggestion("Check that the store directory exists and is writable (see MUSAI_STORE_DIR)"),

        MusaiError::InvalidEdit { .. } | MusaiError::Other { .. } => ErrorContext::new(error),
    }
}
