//! `Content-Type` values.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;

/// Characters that force a parameter value into quotes.
const TSPECIALS: &str = "()<>@,;:\\\"/[]?=";

/// A media type with its parameters.
///
/// Type and subtype are stored lowercase when parsed; parameter names are
/// lowercase and kept sorted so generated headers are stable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Top-level type (`text`, `image`, `multipart`).
    pub main_type: String,
    /// Subtype (`plain`, `png`, `related`).
    pub sub_type: String,
    /// Parameters such as `charset`, `boundary` or `name`.
    pub parameters: BTreeMap<String, String>,
}

impl ContentType {
    /// A media type without parameters.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// `text/plain; charset=utf-8`
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain").with_parameter("charset", "utf-8")
    }

    /// `text/html; charset=utf-8`
    #[must_use]
    pub fn text_html() -> Self {
        Self::new("text", "html").with_parameter("charset", "utf-8")
    }

    /// `application/octet-stream`
    #[must_use]
    pub fn octet_stream() -> Self {
        Self::new("application", "octet-stream")
    }

    /// A `multipart/<sub_type>` container with its boundary.
    #[must_use]
    pub fn multipart(sub_type: &str, boundary: impl Into<String>) -> Self {
        Self::new("multipart", sub_type).with_parameter("boundary", boundary)
    }

    /// The type of an attachment part: the declared type when it parses,
    /// otherwise `application/octet-stream`, carrying `name`.
    #[must_use]
    pub fn for_attachment(declared: &str, name: impl Into<String>) -> Self {
        Self::parse(declared)
            .unwrap_or_else(|_| Self::octet_stream())
            .with_parameter("name", name)
    }

    /// Sets a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// `type/subtype` without parameters.
    #[must_use]
    pub fn essence(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// The `charset` parameter.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameters.get("charset").map(String::as_str)
    }

    /// The `boundary` parameter.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameters.get("boundary").map(String::as_str)
    }

    /// True for `multipart/*`.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type.eq_ignore_ascii_case("multipart")
    }

    /// Parses `type/subtype; name=value; name="quoted value"`.
    ///
    /// Semicolons inside quoted values do not split parameters. Parameters
    /// without `=` are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContentType`] when the type or subtype is
    /// missing.
    pub fn parse(s: &str) -> Result<Self> {
        let mut segments = split_parameters(s).into_iter();
        let essence = segments.next().unwrap_or_default();

        let Some((main_type, sub_type)) = essence.split_once('/') else {
            return Err(Error::InvalidContentType(format!("no subtype in {s:?}")));
        };
        let (main_type, sub_type) = (main_type.trim(), sub_type.trim());
        if main_type.is_empty() || sub_type.is_empty() {
            return Err(Error::InvalidContentType(format!("empty type in {s:?}")));
        }

        let parameters = segments
            .filter_map(|segment| {
                let (key, value) = segment.split_once('=')?;
                let value = value.trim();
                let value = value
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .unwrap_or(value);
                Some((key.trim().to_ascii_lowercase(), value.to_string()))
            })
            .collect();

        Ok(Self {
            main_type: main_type.to_ascii_lowercase(),
            sub_type: sub_type.to_ascii_lowercase(),
            parameters,
        })
    }
}

/// Splits on `;` outside double quotes.
fn split_parameters(s: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut quoted = false;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ';' if !quoted => {
                segments.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(s[start..].trim());
    segments
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.main_type, self.sub_type)?;
        for (key, value) in &self.parameters {
            let needs_quotes = value.is_empty()
                || value.contains(|c: char| c.is_whitespace() || TSPECIALS.contains(c));
            if needs_quotes {
                write!(f, "; {key}=\"{value}\"")?;
            } else {
                write!(f, "; {key}={value}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_text_html() {
        let ct = ContentType::text_html();
        assert_eq!(ct.to_string(), "text/html; charset=utf-8");
        assert_eq!(ct.charset(), Some("utf-8"));
    }

    #[test]
    fn test_multipart_related() {
        let ct = ContentType::multipart("related", "b1");
        assert!(ct.is_multipart());
        assert_eq!(ct.boundary(), Some("b1"));
        assert_eq!(ct.to_string(), "multipart/related; boundary=b1");
    }

    #[test]
    fn test_parse_quoted_boundary_with_semicolon() {
        let ct = ContentType::parse("Multipart/Mixed; BOUNDARY=\"a;b=c\"; charset=utf-8").unwrap();
        assert_eq!(ct.essence(), "multipart/mixed");
        assert_eq!(ct.boundary(), Some("a;b=c"));
        assert_eq!(ct.charset(), Some("utf-8"));
    }

    #[test]
    fn test_parse_rejects_missing_subtype() {
        assert!(matches!(
            ContentType::parse("text"),
            Err(Error::InvalidContentType(_))
        ));
        assert!(ContentType::parse("/plain").is_err());
        assert!(ContentType::parse("text/ ").is_err());
    }

    #[test]
    fn test_for_attachment() {
        assert_eq!(
            ContentType::for_attachment("image/png", "logo.png").to_string(),
            "image/png; name=logo.png"
        );
        assert_eq!(
            ContentType::for_attachment("not a type", "my file.bin").to_string(),
            "application/octet-stream; name=\"my file.bin\""
        );
    }
}
