//! # mailkite-tera
//!
//! [Tera](https://keats.github.io/tera/) template renderer for mailkite.
//!
//! ## Features
//!
//! - Nested field access, loops, conditionals and filters
//! - Autoescaping whenever the body is HTML
//! - Layouts: `{% layout "base.html" %}` renders the template, then renders
//!   the named layout with the result under `body`
//! - Layout sources from a directory or from memory via [`FileProvider`]
//!
//! ## Example
//!
//! ```ignore
//! use mailkite::Email;
//! use mailkite_tera::{DirectoryFileProvider, TeraRenderer, TeraRendererOptions};
//! use std::sync::Arc;
//!
//! let renderer = TeraRenderer::new(
//!     TeraRendererOptions::new().with_file_provider(DirectoryFileProvider::new("templates")),
//! );
//!
//! let email = Email::new()
//!     .using_renderer(Arc::new(renderer))
//!     .using_template(
//!         "{% layout \"base.html\" %}<p>Hi {{ name }}</p>",
//!         &serde_json::json!({ "name": "Ann" }),
//!         true,
//!     )?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod layout;
mod provider;
mod renderer;

pub use layout::{LayoutDirective, take_layout};
pub use provider::{DirectoryFileProvider, FileProvider, MemoryFileProvider};
pub use renderer::{BODY_KEY, ContextHook, MAX_LAYOUT_DEPTH, TeraRenderer, TeraRendererOptions};

pub use tera::Context;
