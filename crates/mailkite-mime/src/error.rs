//! Errors raised while generating or reading MIME messages.

use std::string::FromUtf8Error;

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures of message generation and parsing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A `Content-Type` value could not be parsed.
    #[error("Malformed content type: {0}")]
    InvalidContentType(String),

    /// Quoted-printable or encoded-word text was malformed.
    #[error("Malformed transfer encoding: {0}")]
    InvalidEncoding(String),

    /// Base64 payload was malformed.
    #[error("Bad base64 payload: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// Decoded header text was not UTF-8.
    #[error("Decoded text is not UTF-8: {0}")]
    Utf8Decode(#[from] FromUtf8Error),

    /// A multipart body has no `boundary` parameter.
    #[error("Multipart body without a boundary")]
    MissingBoundary,

    /// A multipart body is empty or lacks its closing delimiter.
    #[error("Broken multipart body: {0}")]
    InvalidMultipart(String),

    /// The raw message could not be split into headers and body.
    #[error("Unreadable message: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            Error::InvalidContentType("x".into()).to_string(),
            "Malformed content type: x"
        );
        assert_eq!(
            Error::MissingBoundary.to_string(),
            "Multipart body without a boundary"
        );
    }
}
