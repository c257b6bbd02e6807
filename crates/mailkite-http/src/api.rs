//! Provider response envelopes.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// One error reported by a provider API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Provider error code.
    #[serde(default)]
    pub error_code: Option<String>,
    /// Human-readable message.
    #[serde(default)]
    pub error_message: Option<String>,
    /// Request property the error refers to.
    #[serde(default)]
    pub property_name: Option<String>,
}

impl ApiError {
    /// Error carrying only a message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    /// The message, or the code when the message is blank.
    fn text(&self) -> Option<&str> {
        [&self.error_message, &self.error_code]
            .into_iter()
            .filter_map(Option::as_deref)
            .find(|text| !text.trim().is_empty())
    }
}

/// Parsed provider reply: a typed payload on success, errors otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse<T> {
    /// HTTP status.
    pub status: StatusCode,
    /// Deserialized success body.
    pub data: Option<T>,
    /// Reported errors; empty on success.
    pub errors: Vec<ApiError>,
}

impl<T: DeserializeOwned> ApiResponse<T> {
    /// Reads and parses a response.
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        match response.text().await {
            Ok(body) => Self::from_parts(status, &body),
            Err(err) => Self {
                status,
                data: None,
                errors: vec![ApiError::message(err.to_string())],
            },
        }
    }

    /// Parses a status and body.
    ///
    /// A 2xx body that is not a valid `T` counts as a failure. Failure bodies
    /// are read as a JSON list of [`ApiError`]; when no entry carries a message
    /// or code, the raw body (or the status when the body is empty) becomes
    /// the single error.
    #[must_use]
    pub fn from_parts(status: StatusCode, body: &str) -> Self {
        if status.is_success()
            && let Ok(data) = serde_json::from_str(body)
        {
            return Self {
                status,
                data: Some(data),
                errors: Vec::new(),
            };
        }

        let errors = match serde_json::from_str::<Vec<ApiError>>(body) {
            Ok(errors) if errors.iter().any(|e| e.text().is_some()) => errors,
            _ if body.trim().is_empty() => vec![ApiError::message(status.to_string())],
            _ => vec![ApiError::message(body)],
        };

        Self {
            status,
            data: None,
            errors,
        }
    }
}

impl<T> ApiResponse<T> {
    /// True when no errors were reported.
    #[must_use]
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }

    /// One entry per error: its message, or its code when the message is
    /// blank. Never empty for a failed response.
    #[must_use]
    pub fn error_messages(&self) -> Vec<String> {
        let messages: Vec<String> = self
            .errors
            .iter()
            .filter_map(ApiError::text)
            .map(str::to_string)
            .collect();

        if messages.is_empty() && !self.success() {
            return vec![self.status.to_string()];
        }
        messages
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq, Eq)]
    struct Payload {
        id: String,
    }

    #[test]
    fn test_success_body() {
        let response = ApiResponse::<Payload>::from_parts(StatusCode::OK, r#"{"id":"42"}"#);
        assert!(response.success());
        assert_eq!(response.data.unwrap().id, "42");
    }

    #[test]
    fn test_success_with_unparseable_body() {
        let response = ApiResponse::<Payload>::from_parts(StatusCode::OK, "not json");
        assert!(!response.success());
        assert_eq!(response.error_messages(), vec!["not json"]);
    }

    #[test]
    fn test_error_list() {
        let body = r#"[{"errorCode":"E1","errorMessage":"bad to","propertyName":"to"},{"errorMessage":" "}]"#;
        let response = ApiResponse::<Payload>::from_parts(StatusCode::BAD_REQUEST, body);

        assert_eq!(response.errors.len(), 2);
        assert_eq!(response.errors[0].error_code.as_deref(), Some("E1"));
        assert_eq!(response.errors[0].property_name.as_deref(), Some("to"));
        assert_eq!(response.error_messages(), vec!["bad to"]);
    }

    #[test]
    fn test_falls_back_to_body_then_status() {
        let response =
            ApiResponse::<Payload>::from_parts(StatusCode::UNAUTHORIZED, r#"{"message":"Forbidden"}"#);
        assert_eq!(response.error_messages(), vec![r#"{"message":"Forbidden"}"#]);

        let response = ApiResponse::<Payload>::from_parts(StatusCode::BAD_GATEWAY, "");
        assert_eq!(response.error_messages(), vec!["502 Bad Gateway"]);

        let response = ApiResponse::<Payload>::from_parts(StatusCode::BAD_REQUEST, "[]");
        assert_eq!(response.error_messages(), vec!["[]"]);
    }

    #[test]
    fn test_entries_without_messages_never_read_as_success() {
        let response =
            ApiResponse::<Payload>::from_parts(StatusCode::BAD_REQUEST, r#"[{"errorCode":"E1"}]"#);
        assert!(!response.success());
        assert_eq!(response.error_messages(), vec!["E1"]);

        for body in ["[{}]", r#"[{"errorMessage":" "}]"#] {
            let response = ApiResponse::<Payload>::from_parts(StatusCode::BAD_REQUEST, body);
            assert!(!response.success());
            assert_eq!(response.error_messages(), vec![body]);
        }

        let response = ApiResponse::<Payload> {
            status: StatusCode::CONFLICT,
            data: None,
            errors: vec![ApiError::default()],
        };
        assert_eq!(response.error_messages(), vec!["409 Conflict"]);
    }
}
