//! Error types for the HTTP senders.
//!
//! These never leave a send: they are folded into
//! [`SendResponse::error_messages`](mailkite::SendResponse).

/// Result type alias for HTTP sender internals.
pub type Result<T> = std::result::Result<T, Error>;

/// HTTP sender error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Token endpoint refused the client credentials.
    #[error("{error}: {description}")]
    Token {
        /// Error code (e.g., `invalid_client`).
        error: String,
        /// Human-readable description.
        description: String,
    },

    /// Token endpoint failed without an OAuth error body; holds the body or
    /// the status.
    #[error("Token request failed: {0}")]
    TokenRequest(String),

    /// Attachment content type reqwest will not accept.
    #[error("Invalid content type for {filename}: {content_type}")]
    ContentType {
        /// Attachment file name.
        filename: String,
        /// Rejected content type.
        content_type: String,
    },
}
