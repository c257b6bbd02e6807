//! # mailkite-smtp
//!
//! SMTP delivery for mailkite emails.
//!
//! [`SmtpSender`] relays an email through any SMTP server over plain TCP,
//! implicit TLS or STARTTLS, optionally logging in with AUTH PLAIN or LOGIN.
//! [`MailtrapSender`] is the same sender preconfigured for the Mailtrap
//! sandbox.
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailkite::Email;
//! use mailkite_smtp::{Security, SmtpClientOptions, SmtpSender};
//! use std::sync::Arc;
//!
//! let options = SmtpClientOptions::new("smtp.example.com", Security::StartTls)
//!     .with_credentials("user@example.com", "password");
//!
//! let response = Email::new()
//!     .from("user@example.com")
//!     .to("friend@example.com")
//!     .subject("Hello")
//!     .body("Hi there", false)
//!     .using_sender(Arc::new(SmtpSender::new(options)))
//!     .send_async(None)
//!     .await?;
//! ```
//!
//! ## Connection States
//!
//! The protocol client underneath uses the type-state pattern:
//!
//! ```text
//! ┌──────────────┐
//! │  Connected   │ ─── authenticate() ───→ Authenticated
//! └──────────────┘                               │
//!        │                                       │
//!        └─── mail_from() ───→ MailTransaction ←─┘
//!                                  │
//!                  rcpt_to() ───→ RecipientAdded ─── data() ───→ Data
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod extension;
mod options;
pub mod reply;
mod sender;

pub use command::{Command, EnvelopeAddress};
pub use connection::{
    Authenticated, Client, Connected, Data, MailTransaction, Ready, RecipientAdded, ServerInfo,
    SmtpStream,
};
pub use error::{Error, Result};
pub use extension::{AuthMechanism, Extension};
pub use options::{
    Credentials, MAILTRAP_HOST, MAILTRAP_PORT, MailtrapOptions, Security, SmtpClientOptions,
};
pub use reply::{Reply, ReplyCode};
pub use sender::{MailtrapSender, SmtpSender};
