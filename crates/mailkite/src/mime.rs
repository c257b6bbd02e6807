//! Mapping of [`EmailData`] onto a MIME message.

use crate::attachment::Attachment;
use crate::data::{EmailData, Priority};
use crate::error::{Error, Result};
use mailkite_mime::{AttachmentPart, Message, MessageBuilder};

/// Headers written for each priority. `Normal` writes none.
#[must_use]
pub const fn priority_headers(priority: Priority) -> &'static [(&'static str, &'static str)] {
    match priority {
        Priority::High => &[
            ("X-Priority", "1"),
            ("Priority", "urgent"),
            ("Importance", "high"),
        ],
        Priority::Low => &[
            ("X-Priority", "5"),
            ("Priority", "non-urgent"),
            ("Importance", "low"),
        ],
        Priority::Normal => &[],
    }
}

/// Options for [`build_message`].
#[derive(Debug, Clone, Default)]
pub struct MimeOptions {
    /// Write a `Bcc:` header (pickup directories); relays use the envelope instead.
    pub include_bcc: bool,
    /// Message-ID without brackets; generated when `None`.
    pub message_id: Option<String>,
}

/// Builds the RFC 5322 message for an email.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`](crate::Error::InvalidArgument) when the
/// from-address is missing, or when an address, the subject, a custom header
/// or an attachment name contains a line break.
pub fn build_message(email: &EmailData, options: &MimeOptions) -> Result<Message> {
    let from = email.sender_address()?;
    check_header_fields(email)?;

    let mut builder = MessageBuilder::new()
        .from(from.to_mailbox())
        .subject(email.subject.clone())
        .bcc_header(options.include_bcc);

    for address in &email.to {
        builder = builder.to(address.to_mailbox());
    }
    for address in &email.cc {
        builder = builder.cc(address.to_mailbox());
    }
    for address in &email.bcc {
        builder = builder.bcc(address.to_mailbox());
    }
    for address in &email.reply_to {
        builder = builder.reply_to(address.to_mailbox());
    }
    if let Some(id) = &options.message_id {
        builder = builder.message_id(id.clone());
    }

    let bodies = email.bodies();
    if let Some(html) = bodies.html {
        builder = builder.html_body(html);
    }
    if let Some(text) = bodies.text {
        builder = builder.text_body(text);
    }

    for (name, value) in priority_headers(email.priority) {
        builder = builder.header(*name, *value);
    }
    for (name, value) in &email.headers {
        builder = builder.header(name.clone(), value.clone());
    }

    for attachment in &email.attachments {
        builder = builder.attach(attachment_part(attachment));
    }

    Ok(builder.build())
}

/// Message-ID of a built message without angle brackets.
#[must_use]
pub fn message_id(message: &Message) -> Option<String> {
    message
        .message_id()
        .map(|id| id.trim().trim_start_matches('<').trim_end_matches('>').to_string())
}

/// Rejects CR or LF in any text that lands in a header line.
fn check_header_fields(email: &EmailData) -> Result<()> {
    let addresses = email
        .from
        .iter()
        .chain(&email.to)
        .chain(&email.cc)
        .chain(&email.bcc)
        .chain(&email.reply_to);
    for address in addresses {
        reject_line_breaks("address", address.email())?;
        if let Some(name) = address.name() {
            reject_line_breaks("display name", name)?;
        }
    }
    reject_line_breaks("subject", &email.subject)?;
    for (name, value) in &email.headers {
        reject_line_breaks("header name", name)?;
        reject_line_breaks(name, value)?;
    }
    for attachment in &email.attachments {
        reject_line_breaks("attachment filename", attachment.filename())?;
        reject_line_breaks("attachment content type", attachment.content_type())?;
        if let Some(id) = attachment.content_id() {
            reject_line_breaks("attachment content id", id)?;
        }
    }
    Ok(())
}

fn reject_line_breaks(field: &str, value: &str) -> Result<()> {
    if value.contains(['\r', '\n']) {
        return Err(Error::invalid_argument(format!(
            "{field} must not contain line breaks: {value:?}"
        )));
    }
    Ok(())
}

fn attachment_part(attachment: &Attachment) -> AttachmentPart {
    AttachmentPart {
        filename: attachment.filename().to_string(),
        content_type: attachment.content_type().to_string(),
        data: attachment.data().to_vec(),
        content_id: attachment.content_id().map(str::to_string),
        inline: attachment.is_inline(),
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

    fn email() -> EmailData {
        EmailData {
            from: Some(Address::with_name("from@test.com", "Sender")),
            to: vec![Address::new("to@test.com")],
            bcc: vec![Address::new("hidden@test.com")],
            subject: "Hello".to_string(),
            body: "<p>Hi</p>".to_string(),
            is_html: true,
            ..EmailData::default()
        }
    }

    #[test]
    fn test_html_only() {
        let message = build_message(&email(), &MimeOptions::default()).unwrap();
        assert_eq!(message.content_type().unwrap().essence(), "text/html");
        assert_eq!(message.html_body().unwrap().as_deref(), Some("<p>Hi</p>"));
        assert!(!message.headers().contains("Bcc"));
    }

    #[test]
    fn test_plaintext_alternative() {
        let mut data = email();
        data.plaintext_alternative_body = Some("Hi".to_string());

        let message = build_message(&data, &MimeOptions::default()).unwrap();
        assert_eq!(
            message.content_type().unwrap().essence(),
            "multipart/alternative"
        );
        assert_eq!(message.text_body().unwrap().as_deref(), Some("Hi"));
        assert_eq!(message.html_body().unwrap().as_deref(), Some("<p>Hi</p>"));
    }

    #[test]
    fn test_priority_headers() {
        let mut data = email();
        data.priority = Priority::High;
        let message = build_message(&data, &MimeOptions::default()).unwrap();
        assert_eq!(message.headers().get("X-Priority"), Some("1"));
        assert_eq!(message.headers().get("Priority"), Some("urgent"));
        assert_eq!(message.headers().get("Importance"), Some("high"));

        data.priority = Priority::Low;
        let message = build_message(&data, &MimeOptions::default()).unwrap();
        assert_eq!(message.headers().get("X-Priority"), Some("5"));
        assert_eq!(message.headers().get("Priority"), Some("non-urgent"));
        assert_eq!(message.headers().get("Importance"), Some("low"));

        data.priority = Priority::Normal;
        let message = build_message(&data, &MimeOptions::default()).unwrap();
        assert!(!message.headers().contains("X-Priority"));
    }

    #[test]
    fn test_bcc_and_message_id_options() {
        let options = MimeOptions {
            include_bcc: true,
            message_id: Some("fixed@test.com".to_string()),
        };
        let message = build_message(&email(), &options).unwrap();
        assert_eq!(message.headers().get("Bcc"), Some("hidden@test.com"));
        assert_eq!(message_id(&message).as_deref(), Some("fixed@test.com"));
    }

    #[test]
    fn test_custom_headers_and_inline_attachment() {
        let mut data = email();
        data.headers.insert("X-Campaign".to_string(), "spring".to_string());
        data.attachments.push(
            Attachment::new("logo.png", "image/png", vec![1, 2, 3]).inline(true),
        );

        let message = build_message(&data, &MimeOptions::default()).unwrap();
        assert_eq!(message.headers().get("X-Campaign"), Some("spring"));
        assert_eq!(
            message.content_type().unwrap().essence(),
            "multipart/related"
        );
        assert_eq!(message.attachments()[0].content_id(), Some("logo.png"));
    }

    #[test]
    fn test_line_breaks_in_header_fields_are_rejected() {
        let mut data = email();
        data.headers.insert("X-Note".to_string(), "hi\r\nBcc: attacker@evil.test".to_string());
        let err = build_message(&data, &MimeOptions::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)), "{err}");

        let mut data = email();
        data.subject = "Hello\nX-Injected: 1".to_string();
        assert!(matches!(
            build_message(&data, &MimeOptions::default()),
            Err(Error::InvalidArgument(_))
        ));

        let mut data = email();
        data.to.push(Address::new("ok@test.com\r\nBcc: attacker@evil.test"));
        assert!(matches!(
            build_message(&data, &MimeOptions::default()),
            Err(Error::InvalidArgument(_))
        ));

        let mut data = email();
        data.reply_to.push(Address::with_name("r@test.com", "Name\rX: y"));
        assert!(matches!(
            build_message(&data, &MimeOptions::default()),
            Err(Error::InvalidArgument(_))
        ));

        let mut data = email();
        data.headers.insert("X-Bad\nName".to_string(), "v".to_string());
        assert!(matches!(
            build_message(&data, &MimeOptions::default()),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_requires_from() {
        let mut data = email();
        data.from = None;
        assert!(build_message(&data, &MimeOptions::default()).is_err());
    }
}
