//! SendGrid v3 mail send API.

use crate::error::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use mailkite::{
    Address, Attachment, CancellationToken, EmailData, Priority, SendResponse, Sender,
    async_trait, is_cancelled,
};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Default SendGrid API host.
pub const SENDGRID_HOST: &str = "https://api.sendgrid.com";

/// Settings for [`SendGridSender`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SendGridOptions {
    /// API key.
    pub api_key: String,
    /// API host; [`SENDGRID_HOST`] when `None`.
    pub host: Option<String>,
    /// Validate without delivering.
    pub sandbox_mode: bool,
}

impl SendGridOptions {
    /// Options with an API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Enables or disables sandbox mode.
    #[must_use]
    pub const fn with_sandbox_mode(mut self, sandbox_mode: bool) -> Self {
        self.sandbox_mode = sandbox_mode;
        self
    }

    /// Overrides the API host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// `<host>/v3/mail/send`
    #[must_use]
    pub fn send_url(&self) -> String {
        let host = self.host.as_deref().unwrap_or(SENDGRID_HOST);
        format!("{}/v3/mail/send", host.trim_end_matches('/'))
    }
}

/// Headers SendGrid needs to carry a priority. `Normal` adds none.
#[must_use]
pub const fn priority_headers(priority: Priority) -> &'static [(&'static str, &'static str)] {
    match priority {
        Priority::High => &[
            ("Priority", "Urgent"),
            ("Importance", "High"),
            ("X-Priority", "1"),
            ("X-MSMail-Priority", "High"),
        ],
        Priority::Low => &[
            ("Priority", "Non-Urgent"),
            ("Importance", "Low"),
            ("X-Priority", "5"),
            ("X-MSMail-Priority", "Low"),
        ],
        Priority::Normal => &[],
    }
}

#[derive(Debug, Serialize)]
struct EmailAddress<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

impl<'a> From<&'a Address> for EmailAddress<'a> {
    fn from(address: &'a Address) -> Self {
        Self {
            email: address.email(),
            name: address.display_name(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    to: Vec<EmailAddress<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    cc: Vec<EmailAddress<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    bcc: Vec<EmailAddress<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dynamic_template_data: Option<Value>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    content_type: &'static str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct SendGridAttachment<'a> {
    content: String,
    #[serde(rename = "type")]
    content_type: &'a str,
    filename: &'a str,
    disposition: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_id: Option<&'a str>,
}

impl<'a> From<&'a Attachment> for SendGridAttachment<'a> {
    fn from(attachment: &'a Attachment) -> Self {
        Self {
            content: STANDARD.encode(attachment.data()),
            content_type: attachment.content_type(),
            filename: attachment.filename(),
            disposition: if attachment.is_inline() {
                "inline"
            } else {
                "attachment"
            },
            content_id: attachment.content_id(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Toggle {
    enable: bool,
}

#[derive(Debug, Serialize)]
struct MailSettings {
    sandbox_mode: Toggle,
}

#[derive(Debug, Serialize)]
struct Mail<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: EmailAddress<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<EmailAddress<'a>>,
    subject: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    content: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<&'a str, &'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    categories: Vec<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<SendGridAttachment<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    template_id: Option<&'a str>,
    mail_settings: MailSettings,
}

/// Builds the v3 request body.
///
/// With a template the body content is left out and `template_data` becomes
/// the personalization's `dynamic_template_data`.
///
/// # Errors
///
/// Returns [`mailkite::Error::InvalidArgument`] when the from-address is
/// missing.
pub fn build_request(
    email: &EmailData,
    sandbox_mode: bool,
    template: Option<(&str, Value)>,
) -> mailkite::Result<Value> {
    let from = email.sender_address()?;
    let (template_id, template_data) = template.unzip();

    let content = if template_id.is_some() {
        Vec::new()
    } else {
        let bodies = email.bodies();
        let text = bodies.text.map(|value| Content {
            content_type: "text/plain",
            value,
        });
        let html = bodies.html.map(|value| Content {
            content_type: "text/html",
            value,
        });
        text.into_iter().chain(html).collect()
    };

    let mut headers: BTreeMap<&str, &str> = email
        .headers
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    for (name, value) in priority_headers(email.priority) {
        headers.insert(*name, *value);
    }

    let mail = Mail {
        personalizations: vec![Personalization {
            to: email.to.iter().map(EmailAddress::from).collect(),
            cc: email.cc.iter().map(EmailAddress::from).collect(),
            bcc: email.bcc.iter().map(EmailAddress::from).collect(),
            dynamic_template_data: template_data,
        }],
        from: from.into(),
        // Only one reply-to is accepted.
        reply_to: email.reply_to.first().map(EmailAddress::from),
        subject: &email.subject,
        content,
        headers,
        categories: email.tags.iter().map(String::as_str).collect(),
        attachments: email.attachments.iter().map(SendGridAttachment::from).collect(),
        template_id,
        mail_settings: MailSettings {
            sandbox_mode: Toggle {
                enable: sandbox_mode,
            },
        },
    };

    Ok(serde_json::to_value(mail)?)
}

/// Error messages for a failed SendGrid call: the status first, then one per
/// entry of the `errors` array.
#[must_use]
pub fn error_messages(status: StatusCode, body: &str) -> Vec<String> {
    let mut messages = vec![status.to_string()];

    if let Ok(Value::Object(mut envelope)) = serde_json::from_str::<Value>(body)
        && let Some(Value::Array(errors)) = envelope.remove("errors")
    {
        messages.extend(errors.into_iter().map(|error| match error.get("message") {
            Some(Value::String(message)) => message.clone(),
            _ => error.to_string(),
        }));
    }

    messages
}

/// Sends through the SendGrid v3 API.
///
/// Priority is emulated with [`priority_headers`]. The message id comes from
/// the `X-Message-Id` response header.
#[derive(Debug, Clone)]
pub struct SendGridSender {
    options: SendGridOptions,
    client: Client,
}

impl SendGridSender {
    /// Creates a sender with a default HTTP client.
    #[must_use]
    pub fn new(options: SendGridOptions) -> Self {
        Self::with_client(options, Client::new())
    }

    /// Creates a sender with a custom HTTP client.
    #[must_use]
    pub const fn with_client(options: SendGridOptions, client: Client) -> Self {
        Self { options, client }
    }

    /// Settings.
    #[must_use]
    pub const fn options(&self) -> &SendGridOptions {
        &self.options
    }

    /// Sends with a dynamic template instead of the email body.
    ///
    /// # Errors
    ///
    /// Returns [`mailkite::Error::InvalidArgument`] when the from-address is
    /// missing and [`mailkite::Error::Serialization`] when `template_data`
    /// cannot be serialized.
    pub async fn send_with_template<T>(
        &self,
        email: &EmailData,
        template_id: &str,
        template_data: &T,
        token: Option<&CancellationToken>,
    ) -> mailkite::Result<SendResponse>
    where
        T: Serialize + ?Sized + Sync,
    {
        email.sender_address()?;
        if is_cancelled(token) {
            tracing::warn!(sender = "sendgrid", "Send cancelled before request");
            return Ok(SendResponse::cancelled());
        }

        let data = serde_json::to_value(template_data)?;
        let body = build_request(email, self.options.sandbox_mode, Some((template_id, data)))?;
        Ok(self.post(&body, email.recipient_count()).await)
    }

    async fn post(&self, body: &Value, recipients: usize) -> SendResponse {
        match self.try_post(body).await {
            Ok((status, message_id, _)) if status.is_success() => {
                tracing::info!(
                    sender = "sendgrid",
                    message_id = message_id.as_deref().unwrap_or_default(),
                    recipients,
                    "Email sent"
                );
                SendResponse {
                    message_id,
                    ..SendResponse::new()
                }
            }
            Ok((status, message_id, text)) => {
                let error_messages = error_messages(status, &text);
                tracing::warn!(sender = "sendgrid", %status, errors = ?error_messages, "SendGrid rejected the message");
                SendResponse {
                    message_id,
                    error_messages,
                    data: None,
                }
            }
            Err(err) => {
                tracing::warn!(sender = "sendgrid", error = %err, "SendGrid request failed");
                SendResponse::failure(err.to_string())
            }
        }
    }

    async fn try_post(&self, body: &Value) -> Result<(StatusCode, Option<String>, String)> {
        let url = self.options.send_url();
        tracing::debug!(sender = "sendgrid", %url, "POST");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.options.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let message_id = response
            .headers()
            .get("X-Message-Id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = response.text().await?;
        Ok((status, message_id, text))
    }
}

#[async_trait]
impl Sender for SendGridSender {
    async fn send_async(
        &self,
        email: &EmailData,
        token: Option<&CancellationToken>,
    ) -> mailkite::Result<SendResponse> {
        email.sender_address()?;
        if is_cancelled(token) {
            tracing::warn!(sender = "sendgrid", "Send cancelled before request");
            return Ok(SendResponse::cancelled());
        }

        let body = build_request(email, self.options.sandbox_mode, None)?;
        Ok(self.post(&body, email.recipient_count()).await)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn email() -> EmailData {
        EmailData {
            from: Some(Address::with_name("from@test.com", "Sender")),
            to: vec![Address::new("to@test.com")],
            reply_to: vec![Address::new("r1@test.com"), Address::new("r2@test.com")],
            subject: "Report".into(),
            body: "<b>Hi</b>".into(),
            is_html: true,
            plaintext_alternative_body: Some("Hi".into()),
            tags: vec!["weekly".into()],
            ..EmailData::default()
        }
    }

    #[test]
    fn test_request_shape() {
        let mut email = email();
        email.headers.insert("X-Campaign".into(), "42".into());
        email.attachments = vec![
            Attachment::new("a.txt", "text/plain", &b"hey"[..]),
            Attachment::new("logo.png", "image/png", vec![1]).inline(true),
        ];

        let body = build_request(&email, true, None).unwrap();

        assert_eq!(
            body["personalizations"],
            json!([{ "to": [{ "email": "to@test.com" }] }])
        );
        assert_eq!(body["from"], json!({ "email": "from@test.com", "name": "Sender" }));
        assert_eq!(body["reply_to"], json!({ "email": "r1@test.com" }));
        assert_eq!(
            body["content"],
            json!([
                { "type": "text/plain", "value": "Hi" },
                { "type": "text/html", "value": "<b>Hi</b>" }
            ])
        );
        assert_eq!(body["headers"], json!({ "X-Campaign": "42" }));
        assert_eq!(body["categories"], json!(["weekly"]));
        assert_eq!(
            body["attachments"],
            json!([
                { "content": "aGV5", "type": "text/plain", "filename": "a.txt", "disposition": "attachment" },
                { "content": "AQ==", "type": "image/png", "filename": "logo.png", "disposition": "inline", "content_id": "logo.png" }
            ])
        );
        assert_eq!(body["mail_settings"], json!({ "sandbox_mode": { "enable": true } }));
        assert!(body.get("template_id").is_none());
    }

    #[test]
    fn test_priority_headers() {
        let mut email = email();
        email.priority = Priority::High;
        let body = build_request(&email, false, None).unwrap();
        assert_eq!(
            body["headers"],
            json!({
                "Importance": "High",
                "Priority": "Urgent",
                "X-MSMail-Priority": "High",
                "X-Priority": "1"
            })
        );

        email.priority = Priority::Low;
        let body = build_request(&email, false, None).unwrap();
        assert_eq!(body["headers"]["Priority"], "Non-Urgent");
        assert_eq!(body["headers"]["Importance"], "Low");
        assert_eq!(body["headers"]["X-Priority"], "5");
        assert_eq!(body["headers"]["X-MSMail-Priority"], "Low");

        email.priority = Priority::Normal;
        let body = build_request(&email, false, None).unwrap();
        assert!(body.get("headers").is_none());
    }

    #[test]
    fn test_template_request() {
        let body = build_request(&email(), false, Some(("d-123", json!({ "name": "Ann" })))).unwrap();
        assert_eq!(body["template_id"], "d-123");
        assert_eq!(
            body["personalizations"][0]["dynamic_template_data"],
            json!({ "name": "Ann" })
        );
        assert!(body.get("content").is_none());
    }

    #[test]
    fn test_error_messages() {
        let body = r#"{"errors":[{"message":"bad from","field":"from"},{"field":"to"}]}"#;
        assert_eq!(
            error_messages(StatusCode::BAD_REQUEST, body),
            vec![
                "400 Bad Request".to_string(),
                "bad from".to_string(),
                r#"{"field":"to"}"#.to_string()
            ]
        );
        assert_eq!(
            error_messages(StatusCode::UNAUTHORIZED, "nope"),
            vec!["401 Unauthorized".to_string()]
        );
    }

    #[test]
    fn test_send_url() {
        assert_eq!(
            SendGridOptions::new("k").send_url(),
            "https://api.sendgrid.com/v3/mail/send"
        );
        assert_eq!(
            SendGridOptions::new("k").with_host("http://localhost:1/").send_url(),
            "http://localhost:1/v3/mail/send"
        );
    }
}
