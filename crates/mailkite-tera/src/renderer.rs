//! Tera backed [`TemplateRenderer`].

use crate::layout::take_layout;
use crate::provider::FileProvider;
use mailkite::{Error, Result, TemplateRenderer, async_trait, require_inputs};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tera::{Context, Tera};

/// Deepest allowed chain of layouts.
pub const MAX_LAYOUT_DEPTH: usize = 8;

/// Context key holding the rendered inner template inside a layout.
pub const BODY_KEY: &str = "body";

/// Adds values to every render context.
pub type ContextHook = Arc<dyn Fn(&mut Context) + Send + Sync>;

/// Renderer settings.
#[derive(Clone, Default)]
pub struct TeraRendererOptions {
    /// Source of layouts; required only when a template declares one.
    pub file_provider: Option<Arc<dyn FileProvider>>,
    /// Runs after the model is loaded into the context.
    pub configure_context: Option<ContextHook>,
}

impl TeraRendererOptions {
    /// Options without a file provider or hook.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the layout source.
    #[must_use]
    pub fn with_file_provider(mut self, provider: impl FileProvider + 'static) -> Self {
        self.file_provider = Some(Arc::new(provider));
        self
    }

    /// Sets the context hook.
    #[must_use]
    pub fn with_configure_context<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.configure_context = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for TeraRendererOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TeraRendererOptions")
            .field("file_provider", &self.file_provider.is_some())
            .field("configure_context", &self.configure_context.is_some())
            .finish()
    }
}

/// Renders Tera templates with optional layouts.
///
/// Object models expose their fields at the top level of the context; any
/// other model is available as `model`. Autoescaping is on exactly when the
/// output is HTML.
///
/// A template starting a layout chain with `{% layout "name" %}` is rendered
/// first, then the named layout is read through the file provider and
/// rendered with the same context plus the inner output under `body`. In HTML
/// layouts write `{{ body | safe }}` so the inner markup is not escaped twice.
#[derive(Debug, Clone, Default)]
pub struct TeraRenderer {
    options: TeraRendererOptions,
}

impl TeraRenderer {
    /// Creates a renderer.
    #[must_use]
    pub const fn new(options: TeraRendererOptions) -> Self {
        Self { options }
    }

    /// Settings.
    #[must_use]
    pub const fn options(&self) -> &TeraRendererOptions {
        &self.options
    }

    fn context(&self, model: &Value) -> Result<Context> {
        let mut context = if model.is_object() {
            Context::from_value(model.clone()).map_err(template_error)?
        } else {
            let mut context = Context::new();
            context.insert("model", model);
            context
        };

        if let Some(hook) = &self.options.configure_context {
            hook(&mut context);
        }
        Ok(context)
    }
}

#[async_trait]
impl TemplateRenderer for TeraRenderer {
    fn render(&self, template: Option<&str>, model: &Value, is_html: bool) -> Result<String> {
        let template = require_inputs(template, model)?;
        let mut context = self.context(model)?;
        let mut current = template.to_string();
        let mut depth = 0;

        while let Some(directive) = take_layout(&current) {
            depth += 1;
            if depth > MAX_LAYOUT_DEPTH {
                return Err(Error::template(format!(
                    "layouts nested deeper than {MAX_LAYOUT_DEPTH}"
                )));
            }
            let provider = self.options.file_provider.as_ref().ok_or_else(|| {
                Error::MissingDependency(format!(
                    "a file provider is required to load layout \"{}\"",
                    directive.name
                ))
            })?;

            let body = render_source(&directive.source, &context, is_html)?;
            tracing::debug!(layout = %directive.name, depth, "Applying layout");
            current = provider.read(&directive.name)?;
            context.insert(BODY_KEY, &body);
        }

        render_source(&current, &context, is_html)
    }
}

fn render_source(source: &str, context: &Context, is_html: bool) -> Result<String> {
    Tera::one_off(source, context, is_html).map_err(template_error)
}

/// Flattens Tera's error chain; its `Display` only shows the outer message.
fn template_error(err: tera::Error) -> Error {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(&err);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    Error::template(message)
}
