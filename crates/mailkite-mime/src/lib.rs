//! # mailkite-mime
//!
//! The MIME layer behind the SMTP and pickup-directory senders.
//!
//! [`MessageBuilder`] lays a message out as
//! `mixed(related(alternative(text, html), inline...), attachments...)`,
//! dropping any container that would hold a single child, and stamps `Date`
//! and `Message-ID`. Text bodies are quoted-printable, binary parts base64,
//! non-ASCII headers RFC 2047 encoded words.
//!
//! [`Message::parse`] reads such output back into a part tree, which is how
//! the senders' tests check what went over the wire.
//!
//! ```ignore
//! use mailkite_mime::{Mailbox, Message, MessageBuilder};
//!
//! let message = MessageBuilder::new()
//!     .from(Mailbox::new("team@example.com", Some("Team")))
//!     .to(Mailbox::new("ann@example.com", None))
//!     .subject("Welcome")
//!     .text_body("Hello")
//!     .html_body("<h1>Hello</h1>")
//!     .build();
//!
//! let parsed = Message::parse(&message.to_bytes()?)?;
//! assert_eq!(parsed.subject().as_deref(), Some("Welcome"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod builder;
mod content_type;
mod error;
mod header;
mod message;

pub mod encoding;

pub use builder::{AttachmentPart, Mailbox, MessageBuilder};
pub use content_type::ContentType;
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{Body, Message, Part, TransferEncoding};
