//! MIME message structure, serialization and parsing.

use crate::content_type::ContentType;
use crate::encoding::{decode_base64, decode_quoted_printable, decode_rfc2047};
use crate::error::{Error, Result};
use crate::header::Headers;
use std::fmt;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit binary.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses transfer encoding from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit,
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// Body of a message or part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// Leaf content, still in its transfer encoding.
    Single(Vec<u8>),
    /// Nested parts of a multipart entity.
    Multipart(Vec<Part>),
}

/// MIME entity: headers plus a leaf or multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Part body.
    pub body: Body,
}

impl Part {
    /// Creates a leaf part.
    #[must_use]
    pub const fn single(headers: Headers, body: Vec<u8>) -> Self {
        Self {
            headers,
            body: Body::Single(body),
        }
    }

    /// Creates a multipart part. The `Content-Type` header must carry the boundary.
    #[must_use]
    pub const fn multipart(headers: Headers, parts: Vec<Self>) -> Self {
        Self {
            headers,
            body: Body::Multipart(parts),
        }
    }

    /// Gets the content type, defaulting to `text/plain`.
    ///
    /// # Errors
    ///
    /// Returns an error if content type header is invalid.
    pub fn content_type(&self) -> Result<ContentType> {
        self.headers
            .get("content-type")
            .map_or_else(|| Ok(ContentType::text_plain()), ContentType::parse)
    }

    /// Gets the transfer encoding.
    #[must_use]
    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.headers
            .get("content-transfer-encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse)
    }

    /// Returns the nested parts of a multipart entity.
    #[must_use]
    pub fn parts(&self) -> &[Self] {
        match &self.body {
            Body::Multipart(parts) => parts,
            Body::Single(_) => &[],
        }
    }

    /// Returns the attachment filename from `Content-Disposition` or the
    /// `name` content type parameter.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        let raw = self
            .headers
            .get("content-disposition")
            .and_then(|value| header_parameter(value, "filename"))
            .or_else(|| {
                self.headers
                    .get("content-type")
                    .and_then(|value| header_parameter(value, "name"))
            })?;

        Some(decode_rfc2047(&raw).unwrap_or(raw))
    }

    /// Returns the `Content-ID` without angle brackets.
    #[must_use]
    pub fn content_id(&self) -> Option<&str> {
        self.headers
            .get("content-id")
            .map(|id| id.trim().trim_start_matches('<').trim_end_matches('>'))
    }

    /// Returns true if the part is marked as an inline or regular attachment.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.headers.get("content-disposition").is_some_and(|value| {
            let kind = value.split(';').next().unwrap_or_default().trim();
            kind.eq_ignore_ascii_case("attachment") || kind.eq_ignore_ascii_case("inline")
        })
    }

    /// Decodes the body according to the transfer encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails or the part is multipart.
    pub fn decode_body(&self) -> Result<Vec<u8>> {
        let Body::Single(body) = &self.body else {
            return Err(Error::InvalidMultipart(
                "Multipart entities have no leaf body".to_string(),
            ));
        };

        match self.transfer_encoding() {
            TransferEncoding::Base64 => decode_base64(&String::from_utf8_lossy(body)),
            TransferEncoding::QuotedPrintable => {
                decode_quoted_printable(&String::from_utf8_lossy(body))
            }
            _ => Ok(body.clone()),
        }
    }

    /// Gets the decoded body as a string.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding or UTF-8 conversion fails.
    pub fn body_text(&self) -> Result<String> {
        let decoded = self.decode_body()?;
        String::from_utf8(decoded).map_err(Into::into)
    }

    /// Finds the first leaf part (depth first) with the given `type/subtype`
    /// that is not an attachment.
    #[must_use]
    pub fn find_body(&self, essence: &str) -> Option<&Self> {
        match &self.body {
            Body::Single(_) => {
                let matches = self
                    .content_type()
                    .is_ok_and(|ct| ct.essence().eq_ignore_ascii_case(essence));
                (matches && !self.is_attachment()).then_some(self)
            }
            Body::Multipart(parts) => parts.iter().find_map(|part| part.find_body(essence)),
        }
    }

    /// Collects all attachment parts (inline and regular), depth first.
    #[must_use]
    pub fn attachments(&self) -> Vec<&Self> {
        let mut found = Vec::new();
        self.collect_attachments(&mut found);
        found
    }

    fn collect_attachments<'a>(&'a self, found: &mut Vec<&'a Self>) {
        match &self.body {
            Body::Single(_) if self.is_attachment() => found.push(self),
            Body::Single(_) => {}
            Body::Multipart(parts) => {
                for part in parts {
                    part.collect_attachments(found);
                }
            }
        }
    }

    /// Serializes the entity (headers, blank line, body).
    ///
    /// # Errors
    ///
    /// Returns an error if a multipart entity lacks a boundary.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }

    fn write_to(&self, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(self.headers.to_string().as_bytes());
        out.extend_from_slice(b"\r\n");

        match &self.body {
            Body::Single(body) => out.extend_from_slice(body),
            Body::Multipart(parts) => {
                let content_type = self.content_type()?;
                let boundary = content_type.boundary().ok_or(Error::MissingBoundary)?;

                for part in parts {
                    out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
                    part.write_to(out)?;
                    out.extend_from_slice(b"\r\n");
                }
                out.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
            }
        }

        Ok(())
    }

    /// Parses an entity from text.
    ///
    /// # Errors
    ///
    /// Returns an error if a multipart body is malformed.
    pub fn parse(text: &str) -> Result<Self> {
        let (head, body) = split_head_body(text);
        let headers = Headers::parse(head);
        let content_type = headers
            .get("content-type")
            .map_or_else(|| Ok(ContentType::text_plain()), ContentType::parse)?;

        if !content_type.is_multipart() {
            return Ok(Self::single(headers, body.as_bytes().to_vec()));
        }

        let boundary = content_type.boundary().ok_or(Error::MissingBoundary)?;
        let parts = split_multipart(body, boundary)?
            .into_iter()
            .map(Self::parse)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::multipart(headers, parts))
    }
}

/// Top-level MIME message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Root entity; its headers are the message headers.
    pub root: Part,
}

impl Message {
    /// Creates a message from its root entity.
    #[must_use]
    pub const fn new(root: Part) -> Self {
        Self { root }
    }

    /// Message headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.root.headers
    }

    /// Gets the content type.
    ///
    /// # Errors
    ///
    /// Returns an error if content type header is invalid.
    pub fn content_type(&self) -> Result<ContentType> {
        self.root.content_type()
    }

    /// Gets the From header.
    #[must_use]
    pub fn from(&self) -> Option<&str> {
        self.root.headers.get("from")
    }

    /// Gets the To header.
    #[must_use]
    pub fn to(&self) -> Option<&str> {
        self.root.headers.get("to")
    }

    /// Gets the Subject header, decoding RFC 2047 words.
    #[must_use]
    pub fn subject(&self) -> Option<String> {
        self.root
            .headers
            .get("subject")
            .map(|s| decode_rfc2047(s).unwrap_or_else(|_| s.to_string()))
    }

    /// Gets the Message-ID header.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.root.headers.get("message-id")
    }

    /// Decoded `text/plain` body, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails.
    pub fn text_body(&self) -> Result<Option<String>> {
        self.root
            .find_body("text/plain")
            .map(Part::body_text)
            .transpose()
    }

    /// Decoded `text/html` body, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails.
    pub fn html_body(&self) -> Result<Option<String>> {
        self.root
            .find_body("text/html")
            .map(Part::body_text)
            .transpose()
    }

    /// All attachment parts, inline ones included.
    #[must_use]
    pub fn attachments(&self) -> Vec<&Part> {
        self.root.attachments()
    }

    /// Serializes the message.
    ///
    /// # Errors
    ///
    /// Returns an error if a multipart entity lacks a boundary.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.root.to_bytes()
    }

    /// Parses a raw RFC 5322 message.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not UTF-8 or the structure is malformed.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(raw).map_err(|e| Error::Parse(e.to_string()))?;
        Part::parse(text).map(Self::new)
    }
}

fn split_head_body(text: &str) -> (&str, &str) {
    if let Some(body) = text.strip_prefix("\r\n") {
        return ("", body);
    }
    if let Some(body) = text.strip_prefix('\n') {
        return ("", body);
    }
    if let Some(pos) = text.find("\r\n\r\n") {
        return (&text[..pos + 2], &text[pos + 4..]);
    }
    if let Some(pos) = text.find("\n\n") {
        return (&text[..=pos], &text[pos + 2..]);
    }
    (text, "")
}

fn split_multipart<'a>(body: &'a str, boundary: &str) -> Result<Vec<&'a str>> {
    let delimiter = format!("--{boundary}");
    let mut sections = body.split(delimiter.as_str());
    let mut parts = Vec::new();

    // Preamble
    sections.next();

    for section in sections {
        if section.starts_with("--") {
            return Ok(parts);
        }
        let section = section
            .strip_prefix("\r\n")
            .or_else(|| section.strip_prefix('\n'))
            .unwrap_or(section);
        let section = section
            .strip_suffix("\r\n")
            .or_else(|| section.strip_suffix('\n'))
            .unwrap_or(section);
        parts.push(section);
    }

    Err(Error::InvalidMultipart(format!(
        "Missing closing boundary {delimiter}--"
    )))
}

fn header_parameter(value: &str, key: &str) -> Option<String> {
    value.split(';').skip(1).find_map(|param| {
        let (name, val) = param.trim().split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case(key)
            .then(|| val.trim().trim_matches('"').to_string())
    })
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_bytes().map_err(|_| fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(&bytes))
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

    fn leaf(content_type: &str, body: &str) -> Part {
        let mut headers = Headers::new();
        headers.add("Content-Type", content_type);
        Part::single(headers, body.as_bytes().to_vec())
    }

    #[test]
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse("7bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse("BASE64"), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::parse("quoted-printable"),
            TransferEncoding::QuotedPrintable
        );
    }

    #[test]
    fn test_part_body_text_quoted_printable() {
        let mut part = leaf("text/plain; charset=utf-8", "H=C3=A9llo");
        part.headers.add("Content-Transfer-Encoding", "quoted-printable");
        assert_eq!(part.body_text().unwrap(), "Héllo");
    }

    #[test]
    fn test_decode_body_rejects_multipart() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "multipart/mixed; boundary=b");
        let part = Part::multipart(headers, vec![]);
        assert!(part.decode_body().is_err());
    }

    #[test]
    fn test_multipart_serialize_and_parse() {
        let mut headers = Headers::new();
        headers.add("Subject", "Nested");
        headers.add("Content-Type", "multipart/alternative; boundary=alt1");
        let root = Part::multipart(
            headers,
            vec![leaf("text/plain", "Plain"), leaf("text/html", "<b>Html</b>")],
        );
        let message = Message::new(root);

        let raw = message.to_bytes().unwrap();
        let text = String::from_utf8(raw.clone()).unwrap();
        assert!(text.contains("--alt1\r\nContent-Type: text/plain\r\n\r\nPlain\r\n"));
        assert!(text.ends_with("--alt1--\r\n"));

        let parsed = Message::parse(&raw).unwrap();
        assert_eq!(parsed, message);
        assert_eq!(parsed.text_body().unwrap().as_deref(), Some("Plain"));
        assert_eq!(parsed.html_body().unwrap().as_deref(), Some("<b>Html</b>"));
    }

    #[test]
    fn test_parse_missing_closing_boundary() {
        let raw = b"Content-Type: multipart/mixed; boundary=x\r\n\r\n--x\r\n\r\nbody\r\n";
        assert!(matches!(
            Message::parse(raw),
            Err(Error::InvalidMultipart(_))
        ));
    }

    #[test]
    fn test_serialize_without_boundary_fails() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "multipart/mixed");
        let message = Message::new(Part::multipart(headers, vec![leaf("text/plain", "x")]));
        assert!(matches!(message.to_bytes(), Err(Error::MissingBoundary)));
    }

    #[test]
    fn test_attachment_lookup() {
        let mut attachment = leaf("image/png; name=\"logo.png\"", "AAAA");
        attachment
            .headers
            .add("Content-Disposition", "inline; filename=\"logo.png\"");
        attachment.headers.add("Content-ID", "<logo>");

        let mut headers = Headers::new();
        headers.add("Content-Type", "multipart/related; boundary=rel");
        let root = Part::multipart(headers, vec![leaf("text/html", "<img>"), attachment]);

        let attachments = root.attachments();
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].filename().as_deref(), Some("logo.png"));
        assert_eq!(attachments[0].content_id(), Some("logo"));
        assert!(root.find_body("image/png").is_none());
    }

    #[test]
    fn test_parse_single_part_lf_only() {
        let message = Message::parse(b"Subject: Hi\nFrom: a@example.com\n\nBody text").unwrap();
        assert_eq!(message.subject().as_deref(), Some("Hi"));
        assert_eq!(message.from(), Some("a@example.com"));
        assert_eq!(message.text_body().unwrap().as_deref(), Some("Body text"));
    }

    #[test]
    fn test_parse_subject_with_bare_encoded_word_markers() {
        let message = Message::parse(b"Subject: =?=\r\nFrom: a@example.com\r\n\r\nBody").unwrap();
        assert_eq!(message.subject().as_deref(), Some("=?="));
    }
}
