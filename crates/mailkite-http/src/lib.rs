//! # mailkite-http
//!
//! Senders for transactional mail HTTP APIs.
//!
//! - [`MailgunSender`]: multipart form POST to the Mailgun messages API
//! - [`SendGridSender`]: JSON POST to the SendGrid v3 API, with dynamic
//!   template support
//! - [`GraphSender`]: Microsoft Graph `sendMail` using an app token obtained
//!   with client credentials
//!
//! Every sender reports HTTP and provider failures as a failed
//! [`SendResponse`](mailkite::SendResponse); only a missing from-address is
//! returned as an error.
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailkite::Email;
//! use mailkite_http::{MailgunOptions, MailgunRegion, MailgunSender};
//! use std::sync::Arc;
//!
//! let sender = MailgunSender::new(
//!     MailgunOptions::new("mg.example.com", "key-123").with_region(MailgunRegion::Eu),
//! );
//!
//! let response = Email::new()
//!     .from("news@mg.example.com")
//!     .to("reader@example.com")
//!     .subject("Issue 12")
//!     .body("<h1>News</h1>", true)
//!     .tag("newsletter")
//!     .using_sender(Arc::new(sender))
//!     .send_async(None)
//!     .await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod api;
mod error;
pub mod graph;
pub mod mailgun;
pub mod sendgrid;

pub use api::{ApiError, ApiResponse};
pub use error::{Error, Result};
pub use graph::{GraphOptions, GraphSender};
pub use mailgun::{MailgunOptions, MailgunRegion, MailgunResponse, MailgunSender};
pub use sendgrid::{SendGridOptions, SendGridSender};
