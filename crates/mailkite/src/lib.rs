//! # mailkite
//!
//! Fluent email composition with pluggable senders and template renderers.
//!
//! ## Features
//!
//! - **Builder**: chain recipients, subject, body, attachments, priority,
//!   tags and headers on an [`Email`]
//! - **Templates**: render bodies through any [`TemplateRenderer`];
//!   [`ReplaceRenderer`] substitutes `##Field##` tokens
//! - **Senders**: deliver through any [`Sender`]; this crate ships
//!   [`SaveToDiskSender`] and [`PickupDirectorySender`], SMTP and HTTP API
//!   senders live in `mailkite-smtp` and `mailkite-http`
//! - **Uniform results**: provider failures come back as
//!   [`SendResponse::error_messages`], never as panics or lost errors
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailkite::{Email, PickupDirectorySender};
//! use std::sync::Arc;
//!
//! let response = Email::new()
//!     .from(("team@example.com", "Team"))
//!     .to("ann@example.com")
//!     .subject("Welcome")
//!     .body("<h1>Hello</h1>", true)
//!     .using_sender(Arc::new(PickupDirectorySender::new("/var/spool/pickup")))
//!     .send(None)?;
//!
//! assert!(response.successful());
//! ```
//!
//! ## Shared defaults
//!
//! A [`Mailer`] holds the renderer, sender and from-address that new emails
//! start with. Anything set on the email itself takes precedence.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod attachment;
mod builder;
mod data;
mod disk;
mod error;
mod mailer;
mod pickup;
mod renderer;
mod response;
mod sender;

pub mod mime;

pub use address::{ADDRESS_SEPARATOR, Address, IntoAddresses, parse_addresses, split_addresses};
pub use attachment::{Attachment, DEFAULT_CONTENT_TYPE, guess_content_type};
pub use builder::{Email, default_renderer, default_sender};
pub use data::{Bodies, EmailData, Priority};
pub use disk::{SaveToDiskSender, format_email};
pub use error::{Error, Result};
pub use mailer::Mailer;
pub use pickup::PickupDirectorySender;
pub use renderer::{ReplaceRenderer, TemplateRenderer, require_inputs};
pub use response::{CANCELLED_MESSAGE, SendResponse};
pub use sender::{Sender, block_on, is_cancelled};

pub use async_trait::async_trait;
pub use tokio_util::sync::CancellationToken;
