//! Fluent email builder.

use crate::address::{Address, IntoAddresses};
use crate::attachment::Attachment;
use crate::data::{EmailData, Priority};
use crate::disk::SaveToDiskSender;
use crate::error::Result;
use crate::renderer::{ReplaceRenderer, TemplateRenderer};
use crate::response::SendResponse;
use crate::sender::Sender;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Renderer used when none is configured.
#[must_use]
pub fn default_renderer() -> Arc<dyn TemplateRenderer> {
    Arc::new(ReplaceRenderer::new())
}

/// Sender used when none is configured: text files in the system temp dir.
#[must_use]
pub fn default_sender() -> Arc<dyn Sender> {
    Arc::new(SaveToDiskSender::new(std::env::temp_dir()))
}

/// Chained builder around an [`EmailData`] with a renderer and a sender.
///
/// ```ignore
/// use mailkite::Email;
///
/// let response = Email::new()
///     .from(("team@example.com", "Team"))
///     .to("a@example.com;b@example.com")
///     .subject("Welcome")
///     .using_template("Hi ##Name##", &serde_json::json!({"Name": "Ann"}), false)?
///     .send(None)?;
/// assert!(response.successful());
/// ```
#[derive(Clone)]
pub struct Email {
    data: EmailData,
    renderer: Arc<dyn TemplateRenderer>,
    sender: Arc<dyn Sender>,
}

impl Default for Email {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Email")
            .field("data", &self.data)
            .finish_non_exhaustive()
    }
}

impl Email {
    /// Creates an empty email with the built-in renderer and sender.
    #[must_use]
    pub fn new() -> Self {
        Self::with_parts(default_renderer(), default_sender())
    }

    /// Creates an empty email with the given renderer and sender.
    #[must_use]
    pub fn with_parts(renderer: Arc<dyn TemplateRenderer>, sender: Arc<dyn Sender>) -> Self {
        Self {
            data: EmailData::default(),
            renderer,
            sender,
        }
    }

    /// The message assembled so far.
    #[must_use]
    pub const fn data(&self) -> &EmailData {
        &self.data
    }

    /// Consumes the builder, returning the message.
    #[must_use]
    pub fn into_data(self) -> EmailData {
        self.data
    }

    /// Renderer in use.
    #[must_use]
    pub const fn renderer(&self) -> &Arc<dyn TemplateRenderer> {
        &self.renderer
    }

    /// Sender in use.
    #[must_use]
    pub const fn sender(&self) -> &Arc<dyn Sender> {
        &self.sender
    }

    /// Sets the sender address.
    #[must_use]
    pub fn from(mut self, address: impl Into<Address>) -> Self {
        self.data.from = Some(address.into());
        self
    }

    /// Adds `To` recipients.
    #[must_use]
    pub fn to(mut self, addresses: impl IntoAddresses) -> Self {
        self.data.to.extend(addresses.into_addresses());
        self
    }

    /// Adds `Cc` recipients.
    #[must_use]
    pub fn cc(mut self, addresses: impl IntoAddresses) -> Self {
        self.data.cc.extend(addresses.into_addresses());
        self
    }

    /// Adds `Bcc` recipients.
    #[must_use]
    pub fn bcc(mut self, addresses: impl IntoAddresses) -> Self {
        self.data.bcc.extend(addresses.into_addresses());
        self
    }

    /// Adds `Reply-To` addresses.
    #[must_use]
    pub fn reply_to(mut self, addresses: impl IntoAddresses) -> Self {
        self.data.reply_to.extend(addresses.into_addresses());
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.data.subject = subject.into();
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>, is_html: bool) -> Self {
        self.data.body = body.into();
        self.data.is_html = is_html;
        self
    }

    /// Sets the plain text alternative; the body is then sent as HTML.
    #[must_use]
    pub fn plaintext_alternative_body(mut self, body: impl Into<String>) -> Self {
        self.data.plaintext_alternative_body = Some(body.into());
        self
    }

    /// Adds an attachment.
    #[must_use]
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.data.attachments.push(attachment);
        self
    }

    /// Adds several attachments.
    #[must_use]
    pub fn attach_many(mut self, attachments: impl IntoIterator<Item = Attachment>) -> Self {
        self.data.attachments.extend(attachments);
        self
    }

    /// Attaches a file from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn attach_from_path(
        self,
        path: impl AsRef<Path>,
        content_type: Option<&str>,
        filename: Option<&str>,
    ) -> Result<Self> {
        let attachment = Attachment::from_path(path, content_type, filename)?;
        Ok(self.attach(attachment))
    }

    /// Sets the priority.
    #[must_use]
    pub const fn priority(mut self, priority: Priority) -> Self {
        self.data.priority = priority;
        self
    }

    /// Marks the email high priority.
    #[must_use]
    pub const fn high_priority(self) -> Self {
        self.priority(Priority::High)
    }

    /// Marks the email normal priority.
    #[must_use]
    pub const fn normal_priority(self) -> Self {
        self.priority(Priority::Normal)
    }

    /// Marks the email low priority.
    #[must_use]
    pub const fn low_priority(self) -> Self {
        self.priority(Priority::Low)
    }

    /// Adds a tag.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.data.tags.push(tag.into());
        self
    }

    /// Sets a custom header, replacing an earlier value for the same key.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.headers.insert(key.into(), value.into());
        self
    }

    /// Uses a specific renderer.
    #[must_use]
    pub fn using_renderer(mut self, renderer: Arc<dyn TemplateRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Uses a specific sender.
    #[must_use]
    pub fn using_sender(mut self, sender: Arc<dyn Sender>) -> Self {
        self.sender = sender;
        self
    }

    /// Renders `template` with `model` into the body.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be serialized or rendering fails.
    pub fn using_template<M: Serialize + ?Sized>(
        mut self,
        template: &str,
        model: &M,
        is_html: bool,
    ) -> Result<Self> {
        let model = serde_json::to_value(model)?;
        let body = self.renderer.render(Some(template), &model, is_html)?;
        self.data.body = body;
        self.data.is_html = is_html;
        Ok(self)
    }

    /// Async variant of [`using_template`](Self::using_template).
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be serialized or rendering fails.
    pub async fn using_template_async<M: Serialize + ?Sized>(
        mut self,
        template: &str,
        model: &M,
        is_html: bool,
    ) -> Result<Self> {
        let model = serde_json::to_value(model)?;
        let body = self
            .renderer
            .render_async(Some(template), &model, is_html)
            .await?;
        self.data.body = body;
        self.data.is_html = is_html;
        Ok(self)
    }

    /// Reads the template from a file and renders it into the body.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or rendering fails.
    pub fn using_template_from_file<M: Serialize + ?Sized>(
        self,
        path: impl AsRef<Path>,
        model: &M,
        is_html: bool,
    ) -> Result<Self> {
        let template = std::fs::read_to_string(path)?;
        self.using_template(&template, model, is_html)
    }

    /// Like [`using_template_from_file`](Self::using_template_from_file) but
    /// prefers `<stem>.<locale>.<ext>` next to `path` when it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if no template file can be read or rendering fails.
    pub fn using_localized_template_from_file<M: Serialize + ?Sized>(
        self,
        path: impl AsRef<Path>,
        model: &M,
        locale: &str,
        is_html: bool,
    ) -> Result<Self> {
        let path = path.as_ref();
        let localized = localized_path(path, locale);
        let chosen = if localized.is_file() {
            localized.as_path()
        } else {
            tracing::debug!(path = %localized.display(), "No localized template, using default");
            path
        };
        self.using_template_from_file(chosen, model, is_html)
    }

    /// Sends the email with the configured sender, blocking until done.
    ///
    /// # Errors
    ///
    /// Returns precondition and local I/O errors from the sender.
    pub fn send(&self, token: Option<&CancellationToken>) -> Result<SendResponse> {
        self.sender.send(&self.data, token)
    }

    /// Sends the email with the configured sender.
    ///
    /// # Errors
    ///
    /// Returns precondition and local I/O errors from the sender.
    pub async fn send_async(&self, token: Option<&CancellationToken>) -> Result<SendResponse> {
        self.sender.send_async(&self.data, token).await
    }
}

/// `templates/welcome.html` + `fr` → `templates/welcome.fr.html`.
fn localized_path(path: &Path, locale: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}.{locale}.{}", ext.to_string_lossy()),
        None => format!("{stem}.{locale}"),
    };
    path.with_file_name(name)
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
    use serde_json::json;

    const FROM: &str = "johno@test.com";

    #[test]
    fn test_fields_are_set() {
        let email = Email::new()
            .from(FROM)
            .to("bob@test.com")
            .subject("sup dawg")
            .body("what be the hipitity hap?", false)
            .reply_to("reply@email.com");

        let data = email.data();
        assert_eq!(data.from.as_ref().unwrap().email(), FROM);
        assert_eq!(data.to[0].email(), "bob@test.com");
        assert_eq!(data.to[0].name(), None);
        assert_eq!(data.subject, "sup dawg");
        assert_eq!(data.body, "what be the hipitity hap?");
        assert_eq!(data.reply_to[0].email(), "reply@email.com");
    }

    #[test]
    fn test_multiple_recipients() {
        let email = Email::new()
            .to("bob@test.com")
            .to("ratface@test.com")
            .cc(vec![Address::new("a@email.com"), Address::new("b@email.com")])
            .bcc(vec!["c@email.com".to_string(), "d@email.com".to_string()])
            .to(["e@email.com", "f@email.com"]);

        assert_eq!(email.data().to.len(), 4);
        assert_eq!(email.data().cc.len(), 2);
        assert_eq!(email.data().bcc.len(), 2);
    }

    #[test]
    fn test_delimited_recipients_with_names() {
        let email = Email::new().to(("james@test.com; john@test.com", "James 1"));
        let to = &email.data().to;
        assert_eq!(to.len(), 2);
        assert_eq!(to[0].name(), Some("James 1"));
        assert_eq!(to[1].name(), Some(""));
    }

    #[test]
    fn test_priority_tags_headers() {
        let email = Email::new()
            .high_priority()
            .tag("welcome")
            .tag("onboarding")
            .header("X-Test", "1")
            .header("X-Test", "2");

        assert_eq!(email.data().priority, Priority::High);
        assert_eq!(email.data().tags, vec!["welcome", "onboarding"]);
        assert_eq!(email.data().headers.get("X-Test").map(String::as_str), Some("2"));
        assert_eq!(email.low_priority().data().priority, Priority::Low);
    }

    #[test]
    fn test_using_template() {
        let email = Email::new()
            .using_template("Hi ##Name##", &json!({"Name": "Ann"}), false)
            .unwrap();
        assert_eq!(email.data().body, "Hi Ann");
        assert!(!email.data().is_html);
    }

    #[derive(Serialize)]
    #[allow(non_snake_case)]
    struct Model {
        Name: Option<String>,
    }

    #[tokio::test]
    async fn test_using_template_async_with_struct_model() {
        let email = Email::new()
            .using_template_async("name: ##Name##", &Model { Name: None }, true)
            .await
            .unwrap();
        assert_eq!(email.data().body, "name: ");
        assert!(email.data().is_html);
    }

    #[test]
    fn test_localized_template_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("welcome.html");
        std::fs::write(&path, "Hello ##Name##").unwrap();
        std::fs::write(dir.path().join("welcome.fr.html"), "Bonjour ##Name##").unwrap();
        let model = json!({"Name": "Ann"});

        let email = Email::new()
            .using_localized_template_from_file(&path, &model, "fr", true)
            .unwrap();
        assert_eq!(email.data().body, "Bonjour Ann");

        let email = Email::new()
            .using_localized_template_from_file(&path, &model, "de", true)
            .unwrap();
        assert_eq!(email.data().body, "Hello Ann");
    }

    #[test]
    fn test_localized_path() {
        assert_eq!(
            localized_path(Path::new("t/welcome.html"), "fr"),
            PathBuf::from("t/welcome.fr.html")
        );
        assert_eq!(
            localized_path(Path::new("t/welcome"), "fr"),
            PathBuf::from("t/welcome.fr")
        );
    }

    #[test]
    fn test_attach_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "a,b").unwrap();

        let email = Email::new()
            .attach_from_path(&path, None, Some("export.csv"))
            .unwrap();
        assert_eq!(email.data().attachments[0].filename(), "export.csv");
        assert_eq!(email.data().attachments[0].content_type(), "text/csv");
    }
}
