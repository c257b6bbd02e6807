//! Connection settings for the SMTP senders.

use crate::extension::AuthMechanism;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Transport security for the SMTP connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Security {
    /// Plain text; only for local relays and tests.
    None,
    /// Implicit TLS from the first byte.
    #[default]
    Tls,
    /// Plain connection upgraded with STARTTLS.
    StartTls,
}

impl Security {
    /// Human-readable name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::None => "None (insecure)",
            Self::Tls => "SSL/TLS",
            Self::StartTls => "STARTTLS",
        }
    }

    /// Conventional submission port for this mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None => 25,
            Self::StartTls => 587,
            Self::Tls => 465,
        }
    }
}

/// Login for the SMTP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// User name.
    pub user: String,
    /// Password.
    pub password: String,
}

impl Credentials {
    /// Creates credentials.
    #[must_use]
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

/// Settings for [`SmtpSender`](crate::SmtpSender).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpClientOptions {
    /// Server host name.
    pub server: String,
    /// Server port.
    pub port: u16,
    /// Transport security.
    pub security: Security,
    /// Login; anonymous submission when `None`.
    pub credentials: Option<Credentials>,
    /// SASL mechanism used with `credentials`.
    pub auth_mechanism: AuthMechanism,
    /// Name sent with EHLO.
    pub client_hostname: String,
    /// Write `.eml` files here instead of connecting.
    pub pickup_directory: Option<PathBuf>,
}

impl Default for SmtpClientOptions {
    fn default() -> Self {
        Self {
            server: "localhost".to_string(),
            port: Security::default().default_port(),
            security: Security::default(),
            credentials: None,
            auth_mechanism: AuthMechanism::default(),
            client_hostname: "localhost".to_string(),
            pickup_directory: None,
        }
    }
}

impl SmtpClientOptions {
    /// Options for `server` using the default port of `security`.
    #[must_use]
    pub fn new(server: impl Into<String>, security: Security) -> Self {
        Self {
            server: server.into(),
            port: security.default_port(),
            security,
            ..Self::default()
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the login.
    #[must_use]
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::new(user, password));
        self
    }

    /// Sets the SASL mechanism.
    #[must_use]
    pub const fn with_auth_mechanism(mut self, mechanism: AuthMechanism) -> Self {
        self.auth_mechanism = mechanism;
        self
    }

    /// Sets the EHLO name.
    #[must_use]
    pub fn with_client_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.client_hostname = hostname.into();
        self
    }

    /// Delivers to a pickup directory instead of the network.
    #[must_use]
    pub fn with_pickup_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.pickup_directory = Some(directory.into());
        self
    }
}

/// Default Mailtrap sandbox host.
pub const MAILTRAP_HOST: &str = "sandbox.smtp.mailtrap.io";

/// Default Mailtrap sandbox port.
pub const MAILTRAP_PORT: u16 = 2525;

/// Settings for [`MailtrapSender`](crate::MailtrapSender).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailtrapOptions {
    /// Inbox user name.
    pub user_name: String,
    /// Inbox password.
    pub password: String,
    /// Host; [`MAILTRAP_HOST`] when `None`.
    pub host: Option<String>,
    /// Port; [`MAILTRAP_PORT`] when `None`.
    pub port: Option<u16>,
}

impl MailtrapOptions {
    /// Options for the default sandbox.
    #[must_use]
    pub fn new(user_name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    /// SMTP settings: STARTTLS with AUTH PLAIN.
    #[must_use]
    pub fn to_smtp_options(&self) -> SmtpClientOptions {
        SmtpClientOptions::new(
            self.host.as_deref().unwrap_or(MAILTRAP_HOST),
            Security::StartTls,
        )
        .with_port(self.port.unwrap_or(MAILTRAP_PORT))
        .with_credentials(self.user_name.clone(), self.password.clone())
        .with_auth_mechanism(AuthMechanism::Plain)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_security_ports_and_names() {
        assert_eq!(Security::default(), Security::Tls);
        assert_eq!(Security::None.default_port(), 25);
        assert_eq!(Security::StartTls.default_port(), 587);
        assert_eq!(Security::Tls.default_port(), 465);
        assert_eq!(Security::StartTls.display_name(), "STARTTLS");
    }

    #[test]
    fn test_smtp_options_builder() {
        let options = SmtpClientOptions::new("smtp.test.com", Security::StartTls)
            .with_credentials("user", "secret")
            .with_auth_mechanism(AuthMechanism::Login);

        assert_eq!(options.port, 587);
        assert_eq!(options.client_hostname, "localhost");
        assert_eq!(options.credentials.unwrap().user, "user");
        assert_eq!(options.auth_mechanism, AuthMechanism::Login);
    }

    #[test]
    fn test_smtp_options_deserialize_with_defaults() {
        let options: SmtpClientOptions =
            serde_json::from_str(r#"{"server":"mail.test.com","security":"None","port":2525}"#)
                .unwrap();
        assert_eq!(options.server, "mail.test.com");
        assert_eq!(options.security, Security::None);
        assert_eq!(options.port, 2525);
        assert!(options.credentials.is_none());
        assert_eq!(options.client_hostname, "localhost");
    }

    #[test]
    fn test_mailtrap_defaults() {
        let smtp = MailtrapOptions::new("inbox", "pw").to_smtp_options();
        assert_eq!(smtp.server, MAILTRAP_HOST);
        assert_eq!(smtp.port, MAILTRAP_PORT);
        assert_eq!(smtp.security, Security::StartTls);
        assert_eq!(smtp.auth_mechanism, AuthMechanism::Plain);
        assert_eq!(smtp.credentials, Some(Credentials::new("inbox", "pw")));
    }

    #[test]
    fn test_mailtrap_overrides() {
        let options = MailtrapOptions {
            host: Some("live.smtp.mailtrap.io".into()),
            port: Some(587),
            ..MailtrapOptions::new("u", "p")
        };
        let smtp = options.to_smtp_options();
        assert_eq!(smtp.server, "live.smtp.mailtrap.io");
        assert_eq!(smtp.port, 587);
    }
}
