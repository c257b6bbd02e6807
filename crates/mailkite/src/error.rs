//! Error types for building, rendering and sending emails.

use std::io;

/// Result type alias for mailkite operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Precondition and local failures.
///
/// Provider failures are not errors: they are reported through
/// [`SendResponse::error_messages`](crate::SendResponse::error_messages).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required argument was missing or empty.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A collaborator needed for the operation was not configured.
    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    /// Template rendering failed.
    #[error("Template error: {0}")]
    Template(String),

    /// Filesystem I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Model serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// MIME generation error.
    #[error("MIME error: {0}")]
    Mime(#[from] mailkite_mime::Error),
}

impl Error {
    /// Creates an [`Error::InvalidArgument`].
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Creates an [`Error::Template`].
    #[must_use]
    pub fn template(message: impl ToString) -> Self {
        Self::Template(message.to_string())
    }
}
