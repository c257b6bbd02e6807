//! Uniform send result.

/// Error message reported when a send is cancelled before it starts.
pub const CANCELLED_MESSAGE: &str = "Message was cancelled by cancellation token.";

/// Outcome of one send.
///
/// Provider failures are collected in `error_messages`; `data` carries an
/// optional provider specific payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendResponse<T = ()> {
    /// Identifier assigned by the provider, when it returns one.
    pub message_id: Option<String>,
    /// One entry per reported error.
    pub error_messages: Vec<String>,
    /// Provider specific payload.
    pub data: Option<T>,
}

impl<T> Default for SendResponse<T> {
    fn default() -> Self {
        Self {
            message_id: None,
            error_messages: Vec::new(),
            data: None,
        }
    }
}

impl<T> SendResponse<T> {
    /// Creates an empty (successful) response.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Successful response with a message id.
    #[must_use]
    pub fn with_message_id(message_id: impl Into<String>) -> Self {
        Self {
            message_id: Some(message_id.into()),
            ..Self::default()
        }
    }

    /// Failed response with one message.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error_messages: vec![message.into()],
            ..Self::default()
        }
    }

    /// Response for a send whose token was already cancelled.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::failure(CANCELLED_MESSAGE)
    }

    /// True when no errors were reported.
    #[must_use]
    pub fn successful(&self) -> bool {
        self.error_messages.is_empty()
    }

    /// Drops the payload.
    #[must_use]
    pub fn without_data(self) -> SendResponse {
        SendResponse {
            message_id: self.message_id,
            error_messages: self.error_messages,
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successful_when_no_errors() {
        let response: SendResponse = SendResponse::with_message_id("abc");
        assert!(response.successful());
        assert_eq!(response.message_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_cancelled() {
        let response: SendResponse = SendResponse::cancelled();
        assert!(!response.successful());
        assert_eq!(response.error_messages, vec![CANCELLED_MESSAGE]);
    }

    #[test]
    fn test_without_data() {
        let response = SendResponse {
            message_id: Some("id".to_string()),
            error_messages: vec![],
            data: Some(42),
        };
        let plain = response.without_data();
        assert_eq!(plain.message_id.as_deref(), Some("id"));
        assert_eq!(plain.data, None);
    }
}
