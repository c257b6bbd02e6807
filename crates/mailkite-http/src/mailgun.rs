//! Mailgun messages API.

use crate::api::ApiResponse;
use crate::error::{Error, Result};
use mailkite::{CancellationToken, EmailData, SendResponse, Sender, async_trait, is_cancelled};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

/// Mailgun API region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MailgunRegion {
    /// `api.mailgun.net`
    #[default]
    Usa,
    /// `api.eu.mailgun.net`
    Eu,
}

impl MailgunRegion {
    /// API base URL for the region.
    #[must_use]
    pub const fn base_url(self) -> &'static str {
        match self {
            Self::Usa => "https://api.mailgun.net/v3",
            Self::Eu => "https://api.eu.mailgun.net/v3",
        }
    }
}

/// Settings for [`MailgunSender`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailgunOptions {
    /// Sending domain.
    pub domain_name: String,
    /// Private API key.
    pub api_key: String,
    /// API region.
    pub region: MailgunRegion,
    /// Replaces the region URL (proxies, tests).
    pub base_url: Option<String>,
}

impl MailgunOptions {
    /// Options for a domain in the US region.
    #[must_use]
    pub fn new(domain_name: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            domain_name: domain_name.into(),
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Sets the region.
    #[must_use]
    pub const fn with_region(mut self, region: MailgunRegion) -> Self {
        self.region = region;
        self
    }

    /// Overrides the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// `<base>/<domain>/messages`
    #[must_use]
    pub fn messages_url(&self) -> String {
        let base = self.base_url.as_deref().unwrap_or(self.region.base_url());
        format!("{}/{}/messages", base.trim_end_matches('/'), self.domain_name)
    }
}

/// Success envelope returned by Mailgun.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailgunResponse {
    /// Queued message id.
    #[serde(default)]
    pub id: String,
    /// Status text.
    #[serde(default)]
    pub message: String,
}

/// Sends through the Mailgun messages API as multipart form data.
///
/// Priority has no Mailgun field and is not sent.
#[derive(Debug, Clone)]
pub struct MailgunSender {
    options: MailgunOptions,
    client: Client,
}

impl MailgunSender {
    /// Creates a sender with a default HTTP client.
    #[must_use]
    pub fn new(options: MailgunOptions) -> Self {
        Self::with_client(options, Client::new())
    }

    /// Creates a sender with a custom HTTP client.
    #[must_use]
    pub const fn with_client(options: MailgunOptions, client: Client) -> Self {
        Self { options, client }
    }

    /// Settings.
    #[must_use]
    pub const fn options(&self) -> &MailgunOptions {
        &self.options
    }

    /// Sends and keeps Mailgun's success envelope in `data`.
    ///
    /// # Errors
    ///
    /// Returns [`mailkite::Error::InvalidArgument`] when the from-address is
    /// missing.
    pub async fn send_detailed(
        &self,
        email: &EmailData,
        token: Option<&CancellationToken>,
    ) -> mailkite::Result<SendResponse<MailgunResponse>> {
        email.sender_address()?;
        if is_cancelled(token) {
            tracing::warn!(sender = "mailgun", "Send cancelled before request");
            return Ok(SendResponse::cancelled());
        }

        match self.post(email).await {
            Ok(response) if response.success() => {
                let message_id = response.data.as_ref().map(|d| d.id.clone());
                tracing::info!(
                    sender = "mailgun",
                    message_id = message_id.as_deref().unwrap_or_default(),
                    recipients = email.recipient_count(),
                    "Email sent"
                );
                Ok(SendResponse {
                    message_id,
                    error_messages: Vec::new(),
                    data: response.data,
                })
            }
            Ok(response) => {
                let messages = response.error_messages();
                tracing::warn!(sender = "mailgun", status = %response.status, errors = ?messages, "Mailgun rejected the message");
                Ok(SendResponse {
                    error_messages: messages,
                    ..SendResponse::new()
                })
            }
            Err(err) => {
                tracing::warn!(sender = "mailgun", error = %err, "Mailgun request failed");
                Ok(SendResponse::failure(err.to_string()))
            }
        }
    }

    async fn post(&self, email: &EmailData) -> Result<ApiResponse<MailgunResponse>> {
        let url = self.options.messages_url();
        tracing::debug!(sender = "mailgun", %url, "POST");

        let response = self
            .client
            .post(&url)
            .basic_auth("api", Some(&self.options.api_key))
            .multipart(build_form(email)?)
            .send()
            .await?;

        Ok(ApiResponse::from_response(response).await)
    }
}

/// Multipart form for one email.
///
/// # Errors
///
/// Returns [`Error::ContentType`] if an attachment's content type is not a
/// valid MIME type.
pub fn build_form(email: &EmailData) -> Result<Form> {
    let mut form = Form::new();

    if let Some(from) = &email.from {
        form = form.text("from", from.to_string());
    }
    for (field, addresses) in [("to", &email.to), ("cc", &email.cc), ("bcc", &email.bcc)] {
        for address in addresses {
            form = form.text(field, address.to_string());
        }
    }
    for address in &email.reply_to {
        form = form.text("h:Reply-To", address.to_string());
    }
    form = form.text("subject", email.subject.clone());

    let bodies = email.bodies();
    if let Some(html) = bodies.html {
        form = form.text("html", html.to_string());
    }
    if let Some(text) = bodies.text {
        form = form.text("text", text.to_string());
    }

    for tag in &email.tags {
        form = form.text("o:tag", tag.clone());
    }
    for (key, value) in &email.headers {
        let key = if key.starts_with("h:") {
            key.clone()
        } else {
            format!("h:{key}")
        };
        form = form.text(key, value.clone());
    }

    for attachment in &email.attachments {
        let part = Part::bytes(attachment.data().to_vec())
            .file_name(attachment.filename().to_string())
            .mime_str(attachment.content_type())
            .map_err(|_| Error::ContentType {
                filename: attachment.filename().to_string(),
                content_type: attachment.content_type().to_string(),
            })?;
        let field = if attachment.is_inline() {
            "inline"
        } else {
            "attachment"
        };
        form = form.part(field, part);
    }

    Ok(form)
}

#[async_trait]
impl Sender for MailgunSender {
    async fn send_async(
        &self,
        email: &EmailData,
        token: Option<&CancellationToken>,
    ) -> mailkite::Result<SendResponse> {
        Ok(self.send_detailed(email, token).await?.without_data())
    }
}
