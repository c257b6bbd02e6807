//! Sender that dumps emails as plain text files, for development and tests.

use crate::address::Address;
use crate::data::EmailData;
use crate::error::Result;
use crate::response::SendResponse;
use crate::sender::{Sender, is_cancelled};
use async_trait::async_trait;
use chrono::Local;
use rand::Rng;
use std::fmt::Write as _;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

/// Writes one file per send into a directory.
///
/// Files are named `YYYY-MM-DD_HH-MM-SS_<n>` (local time, `n` drawn from
/// `0..1000`). Files are created exclusively: a taken name is never
/// overwritten, another suffix is drawn instead, and once the random draws run
/// out the suffix counts up from 1000. Files contain the address lines, subject, custom headers, a blank line and
/// the raw body. Nothing is delivered.
#[derive(Debug, Clone)]
pub struct SaveToDiskSender {
    directory: PathBuf,
}

impl SaveToDiskSender {
    /// Creates a sender writing into `directory` (created on first send).
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Target directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// File names to try, in order, for a send happening now.
    fn candidates(&self) -> impl Iterator<Item = PathBuf> + '_ {
        let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
        let mut rng = rand::thread_rng();
        let random: Vec<u32> = (0..RANDOM_ATTEMPTS)
            .map(|_| rng.gen_range(0..1000))
            .collect();
        random
            .into_iter()
            .chain(1000..)
            .map(move |n| self.directory.join(format!("{stamp}_{n}")))
    }

    fn create_file(&self) -> Result<(PathBuf, std::fs::File)> {
        for path in self.candidates() {
            let opened = std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path);
            match opened {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e.into()),
            }
        }
        Err(io::Error::from(io::ErrorKind::AlreadyExists).into())
    }

    async fn create_file_async(&self) -> Result<(PathBuf, tokio::fs::File)> {
        for path in self.candidates() {
            let opened = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;
            match opened {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e.into()),
            }
        }
        Err(io::Error::from(io::ErrorKind::AlreadyExists).into())
    }
}

/// Random suffixes tried before counting up.
const RANDOM_ATTEMPTS: usize = 50;

/// Renders the text written by [`SaveToDiskSender`].
#[must_use]
pub fn format_email(email: &EmailData) -> String {
    fn join(addresses: &[Address]) -> String {
        addresses
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }

    let from = email.from.as_ref().map(ToString::to_string).unwrap_or_default();

    let mut out = String::new();
    let _ = writeln!(out, "From: {from}");
    let _ = writeln!(out, "To: {}", join(&email.to));
    let _ = writeln!(out, "Cc: {}", join(&email.cc));
    let _ = writeln!(out, "Bcc: {}", join(&email.bcc));
    let _ = writeln!(out, "ReplyTo: {}", join(&email.reply_to));
    let _ = writeln!(out, "Subject: {}", email.subject);
    for (key, value) in &email.headers {
        let _ = writeln!(out, "{key}:{value}");
    }
    out.push('\n');
    out.push_str(&email.body);
    out
}

#[async_trait]
impl Sender for SaveToDiskSender {
    async fn send_async(
        &self,
        email: &EmailData,
        token: Option<&CancellationToken>,
    ) -> Result<SendResponse> {
        email.sender_address()?;
        if is_cancelled(token) {
            tracing::warn!(sender = "disk", "Send cancelled before writing");
            return Ok(SendResponse::cancelled());
        }

        tokio::fs::create_dir_all(&self.directory).await?;
        let (path, mut file) = self.create_file_async().await?;
        file.write_all(format_email(email).as_bytes()).await?;
        file.flush().await?;

        tracing::info!(sender = "disk", path = %path.display(), "Email saved to disk");
        Ok(SendResponse::new())
    }

    fn send(&self, email: &EmailData, token: Option<&CancellationToken>) -> Result<SendResponse> {
        email.sender_address()?;
        if is_cancelled(token) {
            tracing::warn!(sender = "disk", "Send cancelled before writing");
            return Ok(SendResponse::cancelled());
        }

        std::fs::create_dir_all(&self.directory)?;
        let (path, mut file) = self.create_file()?;
        file.write_all(format_email(email).as_bytes())?;

        tracing::info!(sender = "disk", path = %path.display(), "Email saved to disk");
        Ok(SendResponse::new())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn email() -> EmailData {
        let mut email = EmailData {
            from: Some(Address::with_name("from@test.com", "From")),
            to: vec![Address::new("a@test.com"), Address::with_name("b@test.com", "B")],
            reply_to: vec![Address::new("reply@test.com")],
            subject: "Subject line".to_string(),
            body: "Body\nsecond line".to_string(),
            ..EmailData::default()
        };
        email.headers.insert("X-Test".to_string(), "yes".to_string());
        email
    }

    fn files(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .map(|entries| entries.map(|e| e.unwrap().path()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_format() {
        assert_eq!(
            format_email(&email()),
            concat!(
                "From: From <from@test.com>\n",
                "To: a@test.com,B <b@test.com>\n",
                "Cc: \n",
                "Bcc: \n",
                "ReplyTo: reply@test.com\n",
                "Subject: Subject line\n",
                "X-Test:yes\n",
                "\n",
                "Body\nsecond line"
            )
        );
    }

    #[test]
    fn test_send_writes_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("outbox");
        let sender = SaveToDiskSender::new(&target);

        let response = sender.send(&email(), None).unwrap();
        assert!(response.successful());

        let written = files(&target);
        assert_eq!(written.len(), 1);
        let name = written[0].file_name().unwrap().to_string_lossy().into_owned();
        // YYYY-MM-DD_HH-MM-SS_n
        assert_eq!(name.split('_').count(), 3);
        assert_eq!(std::fs::read_to_string(&written[0]).unwrap(), format_email(&email()));
    }

    #[test]
    fn test_burst_of_sends_keeps_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let sender = SaveToDiskSender::new(dir.path());

        for _ in 0..300 {
            assert!(sender.send(&email(), None).unwrap().successful());
        }

        let written = files(dir.path());
        assert_eq!(written.len(), 300);
        for path in &written {
            assert_eq!(std::fs::read_to_string(path).unwrap(), format_email(&email()));
        }
    }

    #[test]
    fn test_taken_names_are_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let sender = SaveToDiskSender::new(dir.path());
        let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
        for n in 0..1000 {
            std::fs::write(dir.path().join(format!("{stamp}_{n}")), "taken").unwrap();
        }

        sender.send(&email(), None).unwrap();

        let written = files(dir.path());
        assert_eq!(written.len(), 1001);
        let fresh: Vec<_> = written
            .iter()
            .filter(|path| std::fs::read_to_string(path).unwrap() != "taken")
            .collect();
        assert_eq!(fresh.len(), 1);
    }

    #[tokio::test]
    async fn test_async_burst_keeps_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let sender = SaveToDiskSender::new(dir.path());

        for _ in 0..100 {
            assert!(sender.send_async(&email(), None).await.unwrap().successful());
        }
        assert_eq!(files(dir.path()).len(), 100);
    }

    #[tokio::test]
    async fn test_send_async_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let sender = SaveToDiskSender::new(dir.path());

        let response = sender.send_async(&email(), None).await.unwrap();
        assert!(response.successful());
        assert_eq!(files(dir.path()).len(), 1);
    }

    #[test]
    fn test_cancelled_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let sender = SaveToDiskSender::new(dir.path());
        let token = CancellationToken::new();
        token.cancel();

        let response = sender.send(&email(), Some(&token)).unwrap();
        assert_eq!(response.error_messages.len(), 1);
        assert!(files(dir.path()).is_empty());
    }

    #[test]
    fn test_missing_from() {
        let dir = tempfile::tempdir().unwrap();
        let sender = SaveToDiskSender::new(dir.path());
        let mut data = email();
        data.from = None;

        assert!(matches!(sender.send(&data, None), Err(Error::InvalidArgument(_))));
        assert!(files(dir.path()).is_empty());
    }
}
