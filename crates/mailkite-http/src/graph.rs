//! Microsoft Graph `sendMail` with client-credentials authentication.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Duration, Utc};
use mailkite::{
    Address, Attachment, CancellationToken, EmailData, Priority, SendResponse, Sender,
    async_trait, is_cancelled,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::Mutex;

/// Default identity platform host.
pub const AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Default Graph API host.
pub const GRAPH_ENDPOINT: &str = "https://graph.microsoft.com";

const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Tokens are refreshed this long before they expire.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Settings for [`GraphSender`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphOptions {
    /// Directory (tenant) id.
    pub tenant_id: String,
    /// Application (client) id.
    pub client_id: String,
    /// Client secret.
    pub client_secret: String,
    /// Keep a copy in the sender's Sent Items.
    pub save_sent_items: bool,
    /// Identity host; [`AUTHORITY_HOST`] when `None`.
    pub authority_host: Option<String>,
    /// Graph host; [`GRAPH_ENDPOINT`] when `None`.
    pub graph_endpoint: Option<String>,
}

impl GraphOptions {
    /// Options for an app registration.
    #[must_use]
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            ..Self::default()
        }
    }

    /// Sets whether sent mail is saved.
    #[must_use]
    pub const fn with_save_sent_items(mut self, save: bool) -> Self {
        self.save_sent_items = save;
        self
    }

    /// Points both hosts somewhere else (sovereign clouds, tests).
    #[must_use]
    pub fn with_hosts(
        mut self,
        authority_host: impl Into<String>,
        graph_endpoint: impl Into<String>,
    ) -> Self {
        self.authority_host = Some(authority_host.into());
        self.graph_endpoint = Some(graph_endpoint.into());
        self
    }

    /// `<authority>/<tenant>/oauth2/v2.0/token`
    #[must_use]
    pub fn token_url(&self) -> String {
        let host = self.authority_host.as_deref().unwrap_or(AUTHORITY_HOST);
        format!("{}/{}/oauth2/v2.0/token", host.trim_end_matches('/'), self.tenant_id)
    }

    /// `<graph>/v1.0/users/<user>/sendMail`
    #[must_use]
    pub fn send_mail_url(&self, user: &str) -> String {
        let host = self.graph_endpoint.as_deref().unwrap_or(GRAPH_ENDPOINT);
        format!("{}/v1.0/users/{user}/sendMail", host.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: String,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        self.expires_at
            .is_none_or(|exp| Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS) < exp)
    }
}

/// Sends through Microsoft Graph as the from-address mailbox.
///
/// The app token is cached and shared by all sends on this sender until
/// shortly before it expires. Priority maps to Graph's native `importance`.
/// Only `X-` custom headers are accepted by Graph; others are dropped.
#[derive(Debug)]
pub struct GraphSender {
    options: GraphOptions,
    client: Client,
    token: Mutex<Option<AccessToken>>,
}

impl GraphSender {
    /// Creates a sender with a default HTTP client.
    #[must_use]
    pub fn new(options: GraphOptions) -> Self {
        Self::with_client(options, Client::new())
    }

    /// Creates a sender with a custom HTTP client.
    #[must_use]
    pub fn with_client(options: GraphOptions, client: Client) -> Self {
        Self {
            options,
            client,
            token: Mutex::new(None),
        }
    }

    /// Settings.
    #[must_use]
    pub const fn options(&self) -> &GraphOptions {
        &self.options
    }

    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }

        let url = self.options.token_url();
        tracing::debug!(sender = "graph", %url, "Requesting app token");

        let response = self
            .client
            .post(&url)
            .form(&[
                ("client_id", self.options.client_id.as_str()),
                ("client_secret", self.options.client_secret.as_str()),
                ("scope", GRAPH_SCOPE),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await?;
            return Err(match serde_json::from_str::<TokenErrorResponse>(&text) {
                Ok(error) => Error::Token {
                    error: error.error,
                    description: error.error_description,
                },
                Err(_) if text.trim().is_empty() => Error::TokenRequest(status.to_string()),
                Err(_) => Error::TokenRequest(text),
            });
        }

        let body: TokenResponse = response.json().await?;
        let token = AccessToken {
            value: body.access_token,
            expires_at: body.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
        };
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn post(&self, user: &str, body: &Value) -> Result<std::result::Result<(), String>> {
        let token = self.access_token().await?;
        let url = self.options.send_mail_url(user);
        tracing::debug!(sender = "graph", %url, "POST");

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(Ok(()));
        }

        let status = response.status();
        let text = response.text().await?;
        Ok(Err(error_message(status, &text)))
    }
}

/// Graph `importance` value.
#[must_use]
pub const fn importance(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "high",
        Priority::Normal => "normal",
        Priority::Low => "low",
    }
}

/// `"<code>: <message>"` from a Graph error envelope, else the body or status.
#[must_use]
pub fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    #[derive(Deserialize)]
    struct Envelope {
        error: GraphError,
    }

    #[derive(Deserialize)]
    struct GraphError {
        code: String,
        message: String,
    }

    match serde_json::from_str::<Envelope>(body) {
        Ok(Envelope { error }) => format!("{}: {}", error.code, error.message),
        Err(_) if body.trim().is_empty() => status.to_string(),
        Err(_) => body.to_string(),
    }
}

fn recipients(addresses: &[Address]) -> Vec<Value> {
    addresses
        .iter()
        .filter(|a| !a.email().trim().is_empty())
        .map(recipient)
        .collect()
}

fn recipient(address: &Address) -> Value {
    match address.display_name() {
        Some(name) => json!({ "emailAddress": { "address": address.email(), "name": name } }),
        None => json!({ "emailAddress": { "address": address.email() } }),
    }
}

fn file_attachment(attachment: &Attachment) -> Value {
    let mut value = json!({
        "@odata.type": "#microsoft.graph.fileAttachment",
        "name": attachment.filename(),
        "contentType": attachment.content_type(),
        "contentBytes": STANDARD.encode(attachment.data()),
        "isInline": attachment.is_inline(),
    });
    if let Some(id) = attachment.content_id() {
        value["contentId"] = Value::from(id);
    }
    value
}

/// Builds the `sendMail` request body.
///
/// # Errors
///
/// Returns [`mailkite::Error::InvalidArgument`] when the from-address is
/// missing.
pub fn build_request(email: &EmailData, save_sent_items: bool) -> mailkite::Result<Value> {
    let from = email.sender_address()?;
    let bodies = email.bodies();
    let body = match (bodies.html, bodies.text) {
        (Some(html), _) => json!({ "contentType": "HTML", "content": html }),
        (None, text) => json!({ "contentType": "Text", "content": text.unwrap_or_default() }),
    };

    let mut message = json!({
        "subject": email.subject,
        "body": body,
        "from": recipient(from),
        "toRecipients": recipients(&email.to),
        "ccRecipients": recipients(&email.cc),
        "bccRecipients": recipients(&email.bcc),
        "replyTo": recipients(&email.reply_to),
        "importance": importance(email.priority),
    });

    if !email.tags.is_empty() {
        message["categories"] = json!(email.tags);
    }
    if !email.attachments.is_empty() {
        message["attachments"] = email.attachments.iter().map(file_attachment).collect();
    }

    let headers: Vec<Value> = email
        .headers
        .iter()
        .filter(|(name, _)| name.get(..2).is_some_and(|p| p.eq_ignore_ascii_case("x-")))
        .map(|(name, value)| json!({ "name": name, "value": value }))
        .collect();
    if !headers.is_empty() {
        message["internetMessageHeaders"] = Value::Array(headers);
    }

    Ok(json!({ "message": message, "saveToSentItems": save_sent_items }))
}

#[async_trait]
impl Sender for GraphSender {
    async fn send_async(
        &self,
        email: &EmailData,
        token: Option<&CancellationToken>,
    ) -> mailkite::Result<SendResponse> {
        let from = email.sender_address()?;
        if is_cancelled(token) {
            tracing::warn!(sender = "graph", "Send cancelled before request");
            return Ok(SendResponse::cancelled());
        }

        let body = build_request(email, self.options.save_sent_items)?;
        match self.post(from.email(), &body).await {
            Ok(Ok(())) => {
                tracing::info!(sender = "graph", recipients = email.recipient_count(), "Email sent");
                Ok(SendResponse::new())
            }
            Ok(Err(message)) => {
                tracing::warn!(sender = "graph", error = %message, "Graph rejected the message");
                Ok(SendResponse::failure(message))
            }
            Err(err) => {
                tracing::warn!(sender = "graph", error = %err, "Graph request failed");
                Ok(SendResponse::failure(err.to_string()))
            }
        }
    }
}
