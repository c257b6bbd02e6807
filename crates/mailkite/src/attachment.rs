//! Email attachments.

use crate::error::Result;
use bytes::Bytes;
use std::path::Path;

/// Fallback MIME type for unknown content.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// File attached to an email, either as a download or inline in the HTML body.
///
/// The content is a shared buffer, so cloning an attachment (or the email
/// holding it) does not copy the data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    filename: String,
    content_type: String,
    data: Bytes,
    is_inline: bool,
    content_id: Option<String>,
}

impl Attachment {
    /// Creates a regular (non-inline) attachment.
    #[must_use]
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data: data.into(),
            is_inline: false,
            content_id: None,
        }
    }

    /// Reads an attachment from disk.
    ///
    /// `filename` defaults to the base name of `path`, `content_type` to the
    /// type guessed from the extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn from_path(
        path: impl AsRef<Path>,
        content_type: Option<&str>,
        filename: Option<&str>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;

        let filename = filename.map_or_else(
            || {
                path.file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default()
            },
            str::to_string,
        );
        let content_type = content_type.map_or_else(|| guess_content_type(path), str::to_string);

        Ok(Self::new(filename, content_type, data))
    }

    /// Marks the attachment as inline.
    #[must_use]
    pub const fn inline(mut self, is_inline: bool) -> Self {
        self.is_inline = is_inline;
        self
    }

    /// Sets an explicit Content-ID.
    #[must_use]
    pub fn with_content_id(mut self, content_id: impl Into<String>) -> Self {
        self.content_id = Some(content_id.into());
        self
    }

    /// File name shown to the recipient.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// MIME type.
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Raw content.
    #[must_use]
    pub const fn data(&self) -> &Bytes {
        &self.data
    }

    /// Whether the attachment is referenced from the body.
    #[must_use]
    pub const fn is_inline(&self) -> bool {
        self.is_inline
    }

    /// Content-ID; inline attachments without one use their file name.
    #[must_use]
    pub fn content_id(&self) -> Option<&str> {
        match &self.content_id {
            Some(id) => Some(id),
            None if self.is_inline => Some(&self.filename),
            None => None,
        }
    }
}

/// Guesses a MIME type from a file extension.
#[must_use]
pub fn guess_content_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_content_id_defaults_to_filename_when_inline() {
        let attachment = Attachment::new("logo.png", "image/png", &b"png"[..]).inline(true);
        assert_eq!(attachment.content_id(), Some("logo.png"));

        let attachment = attachment.with_content_id("brand");
        assert_eq!(attachment.content_id(), Some("brand"));
    }

    #[test]
    fn test_content_id_absent_for_regular() {
        let attachment = Attachment::new("report.pdf", "application/pdf", Vec::new());
        assert_eq!(attachment.content_id(), None);
    }

    #[test]
    fn test_from_path_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"hello")
            .unwrap();

        let attachment = Attachment::from_path(&path, None, None).unwrap();
        assert_eq!(attachment.filename(), "notes.txt");
        assert_eq!(attachment.content_type(), "text/plain");
        assert_eq!(attachment.data().as_ref(), b"hello");

        let attachment = Attachment::from_path(&path, Some("text/markdown"), Some("a.md")).unwrap();
        assert_eq!(attachment.filename(), "a.md");
        assert_eq!(attachment.content_type(), "text/markdown");
    }

    #[test]
    fn test_from_path_missing_file() {
        assert!(Attachment::from_path("/definitely/not/here.bin", None, None).is_err());
    }

    #[test]
    fn test_clone_shares_buffer() {
        let attachment = Attachment::new("a.bin", DEFAULT_CONTENT_TYPE, vec![1, 2, 3]);
        let copy = attachment.clone();
        assert_eq!(attachment.data().as_ptr(), copy.data().as_ptr());
    }
}
