//! Sender that drops `.eml` files into a mail agent's pickup directory.

use crate::data::EmailData;
use crate::error::Result;
use crate::mime::{MimeOptions, build_message};
use crate::response::SendResponse;
use crate::sender::{Sender, is_cancelled};
use async_trait::async_trait;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Writes the full MIME message to `<uuid>.eml` in a directory polled by a
/// mail agent.
///
/// The file includes a `Bcc:` header so the agent can route blind copies.
/// An existing file with the generated name fails the send with
/// [`Error::Io`](crate::Error::Io). The response message id is the uuid.
#[derive(Debug, Clone)]
pub struct PickupDirectorySender {
    directory: PathBuf,
}

impl PickupDirectorySender {
    /// Creates a sender for `directory`.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Pickup directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn prepare(&self, email: &EmailData) -> Result<(String, PathBuf, Vec<u8>)> {
        let message = build_message(
            email,
            &MimeOptions {
                include_bcc: true,
                message_id: None,
            },
        )?;
        let id = Uuid::new_v4().to_string();
        let path = self.directory.join(format!("{id}.eml"));
        Ok((id, path, message.to_bytes()?))
    }
}

#[async_trait]
impl Sender for PickupDirectorySender {
    async fn send_async(
        &self,
        email: &EmailData,
        token: Option<&CancellationToken>,
    ) -> Result<SendResponse> {
        email.sender_address()?;
        if is_cancelled(token) {
            tracing::warn!(sender = "pickup", "Send cancelled before writing");
            return Ok(SendResponse::cancelled());
        }

        let (id, path, bytes) = self.prepare(email)?;
        tokio::fs::create_dir_all(&self.directory).await?;

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        file.write_all(&bytes).await?;
        file.flush().await?;

        tracing::info!(sender = "pickup", message_id = %id, path = %path.display(), "Email written to pickup directory");
        Ok(SendResponse::with_message_id(id))
    }

    fn send(&self, email: &EmailData, token: Option<&CancellationToken>) -> Result<SendResponse> {
        email.sender_address()?;
        if is_cancelled(token) {
            tracing::warn!(sender = "pickup", "Send cancelled before writing");
            return Ok(SendResponse::cancelled());
        }

        let (id, path, bytes) = self.prepare(email)?;
        std::fs::create_dir_all(&self.directory)?;

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)?;
        file.write_all(&bytes)?;

        tracing::info!(sender = "pickup", message_id = %id, path = %path.display(), "Email written to pickup directory");
        Ok(SendResponse::with_message_id(id))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use crate::address::Address;
    use crate::attachment::Attachment;
    use mailkite_mime::Message;

    fn email() -> EmailData {
        EmailData {
            from: Some(Address::new("from@test.com")),
            to: vec![Address::new("to@test.com")],
            bcc: vec![Address::new("hidden@test.com")],
            subject: "Pickup".to_string(),
            body: "<p>See attached</p>".to_string(),
            is_html: true,
            attachments: vec![
                Attachment::new("report.txt", "text/plain", &b"numbers"[..]),
                Attachment::new("logo.png", "image/png", vec![1, 2]).inline(true),
            ],
            ..EmailData::default()
        }
    }

    fn eml_files(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "eml"))
            .collect()
    }

    #[test]
    fn test_send_writes_parseable_eml() {
        let dir = tempfile::tempdir().unwrap();
        let sender = PickupDirectorySender::new(dir.path());

        let response = sender.send(&email(), None).unwrap();
        assert!(response.successful());

        let files = eml_files(dir.path());
        assert_eq!(files.len(), 1);
        let id = response.message_id.unwrap();
        assert_eq!(files[0], dir.path().join(format!("{id}.eml")));

        let message = Message::parse(&std::fs::read(&files[0]).unwrap()).unwrap();
        assert_eq!(message.from(), Some("from@test.com"));
        assert_eq!(message.to(), Some("to@test.com"));
        assert_eq!(message.headers().get("Bcc"), Some("hidden@test.com"));
        assert_eq!(message.subject().as_deref(), Some("Pickup"));
        assert_eq!(message.content_type().unwrap().essence(), "multipart/mixed");

        let attachments = message.attachments();
        assert_eq!(attachments.len(), 2);
        assert_eq!(attachments[0].content_id(), Some("logo.png"));
        assert_eq!(attachments[1].filename().as_deref(), Some("report.txt"));
        assert_eq!(attachments[1].decode_body().unwrap(), b"numbers");
    }

    #[tokio::test]
    async fn test_send_async_writes_eml() {
        let dir = tempfile::tempdir().unwrap();
        let sender = PickupDirectorySender::new(dir.path());

        let response = sender.send_async(&email(), None).await.unwrap();
        assert!(response.successful());
        assert_eq!(eml_files(dir.path()).len(), 1);
    }

    #[test]
    fn test_cancelled_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let sender = PickupDirectorySender::new(dir.path());
        let token = CancellationToken::new();
        token.cancel();

        let response = sender.send(&email(), Some(&token)).unwrap();
        assert!(!response.successful());
        assert_eq!(response.error_messages.len(), 1);
        assert!(eml_files(dir.path()).is_empty());
    }

    #[test]
    fn test_header_with_line_break_is_rejected_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let sender = PickupDirectorySender::new(dir.path());
        let mut data = email();
        data.headers
            .insert("X-Note".to_string(), "hi\r\nBcc: attacker@evil.test".to_string());

        let err = sender.send(&data, None).unwrap_err();
        assert!(matches!(err, crate::Error::InvalidArgument(_)), "{err}");
        assert!(eml_files(dir.path()).is_empty());
    }
}
