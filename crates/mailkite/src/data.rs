//! The message data model shared by renderers and senders.

use crate::address::Address;
use crate::attachment::Attachment;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Message priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Priority {
    /// Low priority.
    Low,
    /// Normal priority.
    #[default]
    Normal,
    /// High priority.
    High,
}

/// Everything describing one outbound email before a sender maps it to its
/// wire format.
///
/// Senders only read it, so one value can be sent any number of times.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailData {
    /// Sender address; required when sending.
    pub from: Option<Address>,
    /// `To` recipients.
    pub to: Vec<Address>,
    /// `Cc` recipients.
    pub cc: Vec<Address>,
    /// `Bcc` recipients.
    pub bcc: Vec<Address>,
    /// `Reply-To` addresses.
    pub reply_to: Vec<Address>,
    /// Subject line.
    pub subject: String,
    /// Body (HTML when `is_html` or when a plaintext alternative is set).
    pub body: String,
    /// Plain text alternative to an HTML body.
    pub plaintext_alternative_body: Option<String>,
    /// Whether `body` is HTML.
    pub is_html: bool,
    /// Priority.
    pub priority: Priority,
    /// Attachments in the order they were added.
    pub attachments: Vec<Attachment>,
    /// Custom headers; setting a key again replaces its value.
    pub headers: BTreeMap<String, String>,
    /// Provider specific tags (categories).
    pub tags: Vec<String>,
}

impl EmailData {
    /// Creates an empty message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the from-address, checking the send precondition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if it is missing or has an empty email.
    pub fn sender_address(&self) -> Result<&Address> {
        self.from
            .as_ref()
            .filter(|from| !from.email().trim().is_empty())
            .ok_or_else(|| Error::invalid_argument("from address is required"))
    }

    /// Envelope recipients: to, cc then bcc.
    pub fn recipients(&self) -> impl Iterator<Item = &Address> {
        self.to.iter().chain(&self.cc).chain(&self.bcc)
    }

    /// Number of envelope recipients.
    #[must_use]
    pub fn recipient_count(&self) -> usize {
        self.to.len() + self.cc.len() + self.bcc.len()
    }

    /// HTML and plain text bodies as delivered.
    ///
    /// With a plaintext alternative the body is the HTML part; otherwise
    /// `is_html` decides which slot the body fills.
    #[must_use]
    pub fn bodies(&self) -> Bodies<'_> {
        match &self.plaintext_alternative_body {
            Some(text) => Bodies {
                html: Some(&self.body),
                text: Some(text),
            },
            None if self.is_html => Bodies {
                html: Some(&self.body),
                text: None,
            },
            None => Bodies {
                html: None,
                text: Some(&self.body),
            },
        }
    }

    /// Regular (non-inline) attachments.
    pub fn regular_attachments(&self) -> impl Iterator<Item = &Attachment> {
        self.attachments.iter().filter(|a| !a.is_inline())
    }

    /// Inline attachments.
    pub fn inline_attachments(&self) -> impl Iterator<Item = &Attachment> {
        self.attachments.iter().filter(|a| a.is_inline())
    }
}

/// Body slots resolved from [`EmailData::bodies`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bodies<'a> {
    /// HTML body.
    pub html: Option<&'a str>,
    /// Plain text body.
    pub text: Option<&'a str>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_address_required() {
        let mut data = EmailData::new();
        assert!(matches!(
            data.sender_address(),
            Err(Error::InvalidArgument(_))
        ));

        data.from = Some(Address::new(""));
        assert!(data.sender_address().is_err());

        data.from = Some(Address::new("from@test.com"));
        assert_eq!(data.sender_address().unwrap().email(), "from@test.com");
    }

    #[test]
    fn test_bodies() {
        let mut data = EmailData {
            body: "<b>hi</b>".to_string(),
            is_html: true,
            ..EmailData::default()
        };
        assert_eq!(data.bodies().html, Some("<b>hi</b>"));
        assert_eq!(data.bodies().text, None);

        data.plaintext_alternative_body = Some("hi".to_string());
        assert_eq!(data.bodies().text, Some("hi"));

        data.plaintext_alternative_body = None;
        data.is_html = false;
        assert_eq!(data.bodies().html, None);
        assert_eq!(data.bodies().text, Some("<b>hi</b>"));
    }

    #[test]
    fn test_recipients_order() {
        let data = EmailData {
            to: vec![Address::new("to@test.com")],
            cc: vec![Address::new("cc@test.com")],
            bcc: vec![Address::new("bcc@test.com")],
            ..EmailData::default()
        };
        let emails: Vec<&str> = data.recipients().map(Address::email).collect();
        assert_eq!(emails, vec!["to@test.com", "cc@test.com", "bcc@test.com"]);
        assert_eq!(data.recipient_count(), 3);
    }
}
