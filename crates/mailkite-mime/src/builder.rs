//! Message generation.

use crate::content_type::ContentType;
use crate::encoding::{encode_base64_lines, encode_quoted_printable, encode_rfc2047};
use crate::header::Headers;
use crate::message::{Message, Part, TransferEncoding};
use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// A named email address as it appears in a header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    /// Address (`user@example.com`).
    pub email: String,
    /// Optional display name.
    pub name: Option<String>,
}

impl Mailbox {
    /// Creates a mailbox.
    #[must_use]
    pub fn new(email: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            email: email.into(),
            name: name.map(str::to_string),
        }
    }

    /// Domain part of the address, if it has one.
    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        self.email.rsplit_once('@').map(|(_, domain)| domain)
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name.as_deref().filter(|name| !name.is_empty()) {
            Some(name) => {
                let encoded = encode_rfc2047(name, "utf-8");
                if encoded == name {
                    let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
                    write!(f, "\"{escaped}\" <{}>", self.email)
                } else {
                    write!(f, "{encoded} <{}>", self.email)
                }
            }
            None => write!(f, "{}", self.email),
        }
    }
}

/// Attachment content handed to [`MessageBuilder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentPart {
    /// File name shown to the recipient.
    pub filename: String,
    /// MIME type (`image/png`); unparseable values fall back to octet-stream.
    pub content_type: String,
    /// Raw content.
    pub data: Vec<u8>,
    /// Content-ID referenced from HTML (`cid:...`).
    pub content_id: Option<String>,
    /// Inline parts go into the `multipart/related` container.
    pub inline: bool,
}

impl AttachmentPart {
    fn into_part(self) -> Part {
        let filename = encode_rfc2047(&self.filename, "utf-8");
        let disposition = if self.inline { "inline" } else { "attachment" };

        let mut headers = Headers::new();
        headers.add(
            "Content-Type",
            ContentType::for_attachment(&self.content_type, filename.clone()).to_string(),
        );
        headers.add(
            "Content-Disposition",
            format!("{disposition}; filename=\"{filename}\""),
        );
        headers.add(
            "Content-Transfer-Encoding",
            TransferEncoding::Base64.to_string(),
        );
        if let Some(id) = &self.content_id {
            headers.add("Content-ID", format!("<{id}>"));
        }

        Part::single(headers, encode_base64_lines(&self.data).into_bytes())
    }
}

/// Builds RFC 5322 messages.
///
/// The body layout is `mixed(related(alternative(text, html), inline...), attachments...)`,
/// with each container omitted when it would hold a single child.
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    from: Option<Mailbox>,
    to: Vec<Mailbox>,
    cc: Vec<Mailbox>,
    bcc: Vec<Mailbox>,
    reply_to: Vec<Mailbox>,
    subject: Option<String>,
    date: Option<DateTime<Utc>>,
    message_id: Option<String>,
    headers: Vec<(String, String)>,
    text_body: Option<String>,
    html_body: Option<String>,
    attachments: Vec<AttachmentPart>,
    bcc_header: bool,
}

impl MessageBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sender.
    #[must_use]
    pub fn from(mut self, mailbox: Mailbox) -> Self {
        self.from = Some(mailbox);
        self
    }

    /// Adds a `To` recipient.
    #[must_use]
    pub fn to(mut self, mailbox: Mailbox) -> Self {
        self.to.push(mailbox);
        self
    }

    /// Adds a `Cc` recipient.
    #[must_use]
    pub fn cc(mut self, mailbox: Mailbox) -> Self {
        self.cc.push(mailbox);
        self
    }

    /// Adds a `Bcc` recipient. Only written as a header with [`Self::bcc_header`].
    #[must_use]
    pub fn bcc(mut self, mailbox: Mailbox) -> Self {
        self.bcc.push(mailbox);
        self
    }

    /// Adds a `Reply-To` address.
    #[must_use]
    pub fn reply_to(mut self, mailbox: Mailbox) -> Self {
        self.reply_to.push(mailbox);
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the date; defaults to now.
    #[must_use]
    pub const fn date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    /// Sets the Message-ID (without angle brackets); one is generated otherwise.
    #[must_use]
    pub fn message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    /// Adds a custom header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the plain text body.
    #[must_use]
    pub fn text_body(mut self, body: impl Into<String>) -> Self {
        self.text_body = Some(body.into());
        self
    }

    /// Sets the HTML body.
    #[must_use]
    pub fn html_body(mut self, body: impl Into<String>) -> Self {
        self.html_body = Some(body.into());
        self
    }

    /// Adds an attachment.
    #[must_use]
    pub fn attach(mut self, attachment: AttachmentPart) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Writes a `Bcc` header. Off by default since relays deliver from the envelope.
    #[must_use]
    pub const fn bcc_header(mut self, enabled: bool) -> Self {
        self.bcc_header = enabled;
        self
    }

    /// Builds the message.
    #[must_use]
    pub fn build(self) -> Message {
        let mut headers = Headers::new();
        let date = self.date.unwrap_or_else(Utc::now);
        headers.add("Date", date.to_rfc2822());

        if let Some(from) = &self.from {
            headers.add("From", from.to_string());
        }
        add_address_header(&mut headers, "Reply-To", &self.reply_to);
        add_address_header(&mut headers, "To", &self.to);
        add_address_header(&mut headers, "Cc", &self.cc);
        if self.bcc_header {
            add_address_header(&mut headers, "Bcc", &self.bcc);
        }
        if let Some(subject) = &self.subject {
            headers.add("Subject", encode_rfc2047(subject, "utf-8"));
        }

        let message_id = self.message_id.clone().unwrap_or_else(|| {
            let domain = self
                .from
                .as_ref()
                .and_then(Mailbox::domain)
                .unwrap_or("localhost");
            format!("{}@{domain}", Uuid::new_v4().simple())
        });
        headers.add("Message-ID", format!("<{message_id}>"));

        for (name, value) in &self.headers {
            headers.add(name.clone(), value.clone());
        }
        headers.add("MIME-Version", "1.0");

        let root = self.body_tree();
        for (name, value) in root.headers.iter() {
            headers.add(name, value);
        }

        Message::new(Part {
            headers,
            body: root.body,
        })
    }

    fn body_tree(self) -> Part {
        let content = match (self.text_body, self.html_body) {
            (Some(text), Some(html)) => container(
                "alternative",
                vec![
                    text_part(ContentType::text_plain(), &text),
                    text_part(ContentType::text_html(), &html),
                ],
            ),
            (None, Some(html)) => text_part(ContentType::text_html(), &html),
            (Some(text), None) => text_part(ContentType::text_plain(), &text),
            (None, None) => text_part(ContentType::text_plain(), ""),
        };

        let (inline, regular): (Vec<_>, Vec<_>) =
            self.attachments.into_iter().partition(|a| a.inline);

        let content = if inline.is_empty() {
            content
        } else {
            let mut parts = vec![content];
            parts.extend(inline.into_iter().map(AttachmentPart::into_part));
            container("related", parts)
        };

        if regular.is_empty() {
            content
        } else {
            let mut parts = vec![content];
            parts.extend(regular.into_iter().map(AttachmentPart::into_part));
            container("mixed", parts)
        }
    }
}

fn add_address_header(headers: &mut Headers, name: &str, mailboxes: &[Mailbox]) {
    if mailboxes.is_empty() {
        return;
    }
    let value = mailboxes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    headers.add(name, value);
}

fn text_part(content_type: ContentType, text: &str) -> Part {
    let mut headers = Headers::new();
    headers.add("Content-Type", content_type.to_string());
    headers.add(
        "Content-Transfer-Encoding",
        TransferEncoding::QuotedPrintable.to_string(),
    );
    Part::single(headers, encode_quoted_printable(text).into_bytes())
}

fn container(sub_type: &str, parts: Vec<Part>) -> Part {
    let boundary = format!("mailkite-{}", Uuid::new_v4().simple());
    let mut headers = Headers::new();
    headers.add(
        "Content-Type",
        ContentType::multipart(sub_type, boundary).to_string(),
    );
    Part::multipart(headers, parts)
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
    use crate::message::Body;

    fn logo(inline: bool) -> AttachmentPart {
        AttachmentPart {
            filename: "logo.png".to_string(),
            content_type: "image/png".to_string(),
            data: vec![0x89, 0x50, 0x4e, 0x47],
            content_id: inline.then(|| "logo".to_string()),
            inline,
        }
    }

    #[test]
    fn test_mailbox_display() {
        assert_eq!(
            Mailbox::new("bob@example.com", Some("Bob")).to_string(),
            "\"Bob\" <bob@example.com>"
        );
        assert_eq!(
            Mailbox::new("bob@example.com", None).to_string(),
            "bob@example.com"
        );
        assert!(
            Mailbox::new("jose@example.com", Some("José"))
                .to_string()
                .starts_with("=?utf-8?B?")
        );
    }

    #[test]
    fn test_text_only_message() {
        let message = MessageBuilder::new()
            .from(Mailbox::new("sender@example.com", Some("Sender")))
            .to(Mailbox::new("recipient@example.com", None))
            .subject("Test Message")
            .text_body("Hello, World!")
            .build();

        assert_eq!(message.from(), Some("\"Sender\" <sender@example.com>"));
        assert_eq!(message.subject().as_deref(), Some("Test Message"));
        assert_eq!(
            message.content_type().unwrap().essence(),
            "text/plain"
        );
        assert!(message.message_id().unwrap().ends_with("@example.com>"));
        assert_eq!(message.headers().get("MIME-Version"), Some("1.0"));
    }

    #[test]
    fn test_alternative_body() {
        let message = MessageBuilder::new()
            .text_body("Plain")
            .html_body("<h1>Html</h1>")
            .build();

        let ct = message.content_type().unwrap();
        assert_eq!(ct.essence(), "multipart/alternative");
        let parsed = Message::parse(&message.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed.text_body().unwrap().as_deref(), Some("Plain"));
        assert_eq!(parsed.html_body().unwrap().as_deref(), Some("<h1>Html</h1>"));
    }

    #[test]
    fn test_full_structure() {
        let message = MessageBuilder::new()
            .text_body("Plain")
            .html_body("<img src=\"cid:logo\">")
            .attach(logo(true))
            .attach(logo(false))
            .build();

        assert_eq!(
            message.content_type().unwrap().essence(),
            "multipart/mixed"
        );
        let Body::Multipart(parts) = &message.root.body else {
            panic!("expected multipart");
        };
        assert_eq!(parts.len(), 2);
        assert_eq!(
            parts[0].content_type().unwrap().essence(),
            "multipart/related"
        );

        let parsed = Message::parse(&message.to_bytes().unwrap()).unwrap();
        let attachments = parsed.attachments();
        assert_eq!(attachments.len(), 2);
        assert_eq!(attachments[0].content_id(), Some("logo"));
        assert_eq!(attachments[1].content_id(), None);
        assert_eq!(
            attachments[1].decode_body().unwrap(),
            vec![0x89, 0x50, 0x4e, 0x47]
        );
        assert_eq!(attachments[1].filename().as_deref(), Some("logo.png"));
    }

    #[test]
    fn test_bcc_header_opt_in() {
        let base = MessageBuilder::new()
            .to(Mailbox::new("to@example.com", None))
            .bcc(Mailbox::new("hidden@example.com", None));

        assert!(!base.clone().build().headers().contains("Bcc"));
        assert_eq!(
            base.bcc_header(true).build().headers().get("Bcc"),
            Some("hidden@example.com")
        );
    }

    #[test]
    fn test_custom_headers_and_message_id() {
        let message = MessageBuilder::new()
            .message_id("abc@host")
            .header("X-Priority", "1")
            .build();

        assert_eq!(message.message_id(), Some("<abc@host>"));
        assert_eq!(message.headers().get("x-priority"), Some("1"));
    }

    #[test]
    fn test_line_breaks_cannot_add_headers() {
        let message = MessageBuilder::new()
            .from(Mailbox::new("from@test.com", None))
            .to(Mailbox::new("to@test.com\r\nBcc: attacker@evil.test", None))
            .header("X-Note", "hi\r\nReply-To: attacker@evil.test")
            .text_body("Hi")
            .build();

        let raw = message.to_bytes().unwrap();
        let parsed = Message::parse(&raw).unwrap();
        assert!(!parsed.headers().contains("Bcc"));
        assert!(!parsed.headers().contains("Reply-To"));
        assert_eq!(
            parsed.headers().get("X-Note"),
            Some("hi  Reply-To: attacker@evil.test")
        );
    }
}
