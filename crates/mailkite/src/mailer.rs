//! Shared defaults for building emails.

use crate::address::Address;
use crate::builder::{Email, default_renderer, default_sender};
use crate::renderer::TemplateRenderer;
use crate::sender::Sender;
use std::fmt;
use std::sync::Arc;

/// Explicit configuration of default renderer, sender and from-address.
///
/// Emails created with [`Mailer::email`] start from these defaults. A
/// renderer or sender set on the email itself always wins; unset defaults
/// fall back to the built-ins used by [`Email::new`].
#[derive(Clone, Default)]
pub struct Mailer {
    renderer: Option<Arc<dyn TemplateRenderer>>,
    sender: Option<Arc<dyn Sender>>,
    default_from: Option<Address>,
}

impl fmt::Debug for Mailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailer")
            .field("has_renderer", &self.renderer.is_some())
            .field("has_sender", &self.sender.is_some())
            .field("default_from", &self.default_from)
            .finish()
    }
}

impl Mailer {
    /// Creates a mailer with no defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn TemplateRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Sets the default sender.
    #[must_use]
    pub fn with_sender(mut self, sender: Arc<dyn Sender>) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Sets the default from-address.
    #[must_use]
    pub fn with_default_from(mut self, from: impl Into<Address>) -> Self {
        self.default_from = Some(from.into());
        self
    }

    /// Starts a new email with these defaults.
    #[must_use]
    pub fn email(&self) -> Email {
        let renderer = self.renderer.clone().unwrap_or_else(default_renderer);
        let sender = self.sender.clone().unwrap_or_else(default_sender);

        let email = Email::with_parts(renderer, sender);
        match &self.default_from {
            Some(from) => email.from(from.clone()),
            None => email,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::disk::SaveToDiskSender;
    use crate::renderer::ReplaceRenderer;

    #[test]
    fn test_mailer_defaults_apply() {
        let sender: Arc<dyn Sender> = Arc::new(SaveToDiskSender::new("/tmp/mailkite-test"));
        let mailer = Mailer::new()
            .with_sender(Arc::clone(&sender))
            .with_default_from("noreply@test.com");

        let email = mailer.email();
        assert!(Arc::ptr_eq(email.sender(), &sender));
        assert_eq!(email.data().from.as_ref().unwrap().email(), "noreply@test.com");
    }

    #[test]
    fn test_explicit_wins_over_mailer() {
        let mailer_sender: Arc<dyn Sender> = Arc::new(SaveToDiskSender::new("/tmp/a"));
        let explicit: Arc<dyn Sender> = Arc::new(SaveToDiskSender::new("/tmp/b"));
        let renderer: Arc<dyn TemplateRenderer> = Arc::new(ReplaceRenderer::new());

        let email = Mailer::new()
            .with_sender(Arc::clone(&mailer_sender))
            .email()
            .using_sender(Arc::clone(&explicit))
            .using_renderer(Arc::clone(&renderer));

        assert!(Arc::ptr_eq(email.sender(), &explicit));
        assert!(Arc::ptr_eq(email.renderer(), &renderer));
    }

    #[test]
    fn test_unset_defaults_use_builtins() {
        let email = Mailer::new().email();
        assert!(email.data().from.is_none());
        assert!(email.renderer().render(Some("##A##"), &serde_json::json!({"A": 1}), true).is_ok());
    }
}
