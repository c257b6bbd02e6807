//! [`Sender`] implementations that relay through an SMTP server.

use crate::command::EnvelopeAddress;
use crate::connection::{Client, SmtpStream};
use crate::error::{Error, Result};
use crate::options::{MailtrapOptions, Security, SmtpClientOptions};
use mailkite::mime::{MimeOptions, build_message, message_id};
use mailkite::{
    Address, CancellationToken, EmailData, PickupDirectorySender, SendResponse, Sender,
    async_trait, is_cancelled,
};

/// Delivers emails to an SMTP relay.
///
/// Envelope recipients are to, cc and bcc; the transmitted message carries
/// no `Bcc:` header. Connection, protocol and rejection failures come back as
/// a failed [`SendResponse`] with one message. With
/// [`SmtpClientOptions::pickup_directory`] set, emails are written there
/// instead and no connection is made.
#[derive(Debug, Clone)]
pub struct SmtpSender {
    options: SmtpClientOptions,
}

impl SmtpSender {
    /// Creates a sender.
    #[must_use]
    pub const fn new(options: SmtpClientOptions) -> Self {
        Self { options }
    }

    /// Connection settings.
    #[must_use]
    pub const fn options(&self) -> &SmtpClientOptions {
        &self.options
    }

    async fn deliver<'a>(
        &self,
        from: &Address,
        recipients: impl Iterator<Item = &'a Address>,
        message: &[u8],
    ) -> Result<()> {
        let from = EnvelopeAddress::new(from.email())?;
        let recipients = recipients
            .map(|address| EnvelopeAddress::new(address.email()))
            .collect::<Result<Vec<_>>>()?;
        let (first, rest) = recipients.split_first().ok_or(Error::NoRecipients)?;

        let options = &self.options;
        let stream = SmtpStream::open(&options.server, options.port, options.security).await?;
        let mut client = Client::from_stream(stream)
            .await?
            .ehlo(&options.client_hostname)
            .await?;

        if options.security == Security::StartTls {
            client = client
                .starttls(&options.server, &options.client_hostname)
                .await?;
        }

        let transaction = match &options.credentials {
            Some(credentials) => {
                client
                    .authenticate(options.auth_mechanism, &credentials.user, &credentials.password)
                    .await?
                    .mail_from(from)
                    .await?
            }
            None => client.mail_from(from).await?,
        };

        let mut client = transaction.rcpt_to(first.clone()).await?;
        for recipient in rest {
            client = client.rcpt_to(recipient.clone()).await?;
        }

        client.data().await?.send_message(message).await?.quit().await
    }
}

#[async_trait]
impl Sender for SmtpSender {
    async fn send_async(
        &self,
        email: &EmailData,
        token: Option<&CancellationToken>,
    ) -> mailkite::Result<SendResponse> {
        let from = email.sender_address()?;
        if is_cancelled(token) {
            tracing::warn!(sender = "smtp", "Send cancelled before connecting");
            return Ok(SendResponse::cancelled());
        }

        if let Some(directory) = &self.options.pickup_directory {
            return PickupDirectorySender::new(directory.clone())
                .send_async(email, token)
                .await;
        }

        let message = build_message(email, &MimeOptions::default())?;
        let id = message_id(&message);
        let bytes = message.to_bytes()?;

        match self.deliver(from, email.recipients(), &bytes).await {
            Ok(()) => {
                tracing::info!(
                    sender = "smtp",
                    server = %self.options.server,
                    message_id = id.as_deref().unwrap_or_default(),
                    recipients = email.recipient_count(),
                    "Email sent"
                );
                Ok(SendResponse {
                    message_id: id,
                    ..SendResponse::new()
                })
            }
            Err(err) => {
                tracing::warn!(sender = "smtp", server = %self.options.server, error = %err, "SMTP delivery failed");
                Ok(SendResponse::failure(err.to_string()))
            }
        }
    }
}

/// SMTP sender preset for the Mailtrap sandbox (STARTTLS, AUTH PLAIN).
#[derive(Debug, Clone)]
pub struct MailtrapSender {
    inner: SmtpSender,
}

impl MailtrapSender {
    /// Creates a sender.
    #[must_use]
    pub fn new(options: &MailtrapOptions) -> Self {
        Self {
            inner: SmtpSender::new(options.to_smtp_options()),
        }
    }

    /// Resolved SMTP settings.
    #[must_use]
    pub const fn options(&self) -> &SmtpClientOptions {
        self.inner.options()
    }
}

#[async_trait]
impl Sender for MailtrapSender {
    async fn send_async(
        &self,
        email: &EmailData,
        token: Option<&CancellationToken>,
    ) -> mailkite::Result<SendResponse> {
        self.inner.send_async(email, token).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::options::{MAILTRAP_HOST, MAILTRAP_PORT};

    fn email(to: &str) -> EmailData {
        EmailData {
            from: Some(Address::new("from@test.com")),
            to: vec![Address::new(to)],
            subject: "Hi".into(),
            body: "Body".into(),
            ..EmailData::default()
        }
    }

    #[tokio::test]
    async fn test_invalid_recipient_is_failed_response() {
        let sender = SmtpSender::new(SmtpClientOptions::new("127.0.0.1", Security::None).with_port(1));
        let response = sender.send_async(&email("not-an-address"), None).await.unwrap();

        assert!(!response.successful());
        assert_eq!(
            response.error_messages,
            vec!["Invalid email address: not-an-address".to_string()]
        );
    }

    #[tokio::test]
    async fn test_no_recipients_is_failed_response() {
        let sender = SmtpSender::new(SmtpClientOptions::new("127.0.0.1", Security::None).with_port(1));
        let mut data = email("to@test.com");
        data.to.clear();

        let response = sender.send_async(&data, None).await.unwrap();
        assert_eq!(response.error_messages, vec!["Message has no recipients".to_string()]);
    }

    #[test]
    fn test_pickup_directory_delegation() {
        let dir = tempfile::tempdir().unwrap();
        let sender = SmtpSender::new(
            SmtpClientOptions::new("unreachable.invalid", Security::Tls)
                .with_pickup_directory(dir.path()),
        );

        let response = sender.send(&email("to@test.com"), None).unwrap();
        assert!(response.successful());

        let id = response.message_id.unwrap();
        assert!(dir.path().join(format!("{id}.eml")).exists());
    }

    #[test]
    fn test_mailtrap_sender_options() {
        let sender = MailtrapSender::new(&MailtrapOptions::new("inbox", "pw"));
        assert_eq!(sender.options().server, MAILTRAP_HOST);
        assert_eq!(sender.options().port, MAILTRAP_PORT);
        assert_eq!(sender.options().security, Security::StartTls);
    }
}
