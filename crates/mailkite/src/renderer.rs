//! Template rendering.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;

/// Turns a template and a model into body text.
///
/// Models arrive as `serde_json` values so the trait stays object safe; the
/// builder serializes any `Serialize` model before calling it. Rendering is a
/// pure function of its inputs.
#[async_trait]
pub trait TemplateRenderer: Send + Sync {
    /// Renders `template` with `model`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the template is `None` or the
    /// model is `null`, and renderer specific errors otherwise.
    fn render(&self, template: Option<&str>, model: &Value, is_html: bool) -> Result<String>;

    /// Async variant of [`render`](Self::render) with identical output.
    ///
    /// # Errors
    ///
    /// Same as [`render`](Self::render).
    async fn render_async(
        &self,
        template: Option<&str>,
        model: &Value,
        is_html: bool,
    ) -> Result<String> {
        self.render(template, model, is_html)
    }
}

/// Checks the arguments every renderer rejects and returns the template.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] for a missing template or `null` model.
pub fn require_inputs<'a>(template: Option<&'a str>, model: &Value) -> Result<&'a str> {
    let template = template.ok_or_else(|| Error::invalid_argument("template is required"))?;
    if model.is_null() {
        return Err(Error::invalid_argument("model is required"));
    }
    Ok(template)
}

/// Replaces `##Field##` tokens with the model's top-level field values.
///
/// No escaping, nesting or control flow. Strings are inserted as-is, `null`
/// becomes empty and other values use their JSON text. Tokens naming no field
/// stay as written, and inserted values are never expanded again.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplaceRenderer;

impl ReplaceRenderer {
    /// Creates the renderer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TemplateRenderer for ReplaceRenderer {
    fn render(&self, template: Option<&str>, model: &Value, _is_html: bool) -> Result<String> {
        let template = require_inputs(template, model)?;
        let Value::Object(fields) = model else {
            return Ok(template.to_string());
        };

        // One pass over the template: inserted values are never scanned again.
        let mut output = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find("##") {
            output.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let field = after
                .find("##")
                .and_then(|end| fields.get(&after[..end]).map(|value| (end, value)));
            match field {
                Some((end, value)) => {
                    push_value(&mut output, value);
                    rest = &after[end + 2..];
                }
                None => {
                    output.push('#');
                    rest = &rest[start + 1..];
                }
            }
        }
        output.push_str(rest);

        Ok(output)
    }
}

fn push_value(output: &mut String, value: &Value) {
    match value {
        Value::Null => {}
        Value::String(s) => output.push_str(s),
        other => output.push_str(&other.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_replaces_field() {
        let renderer = ReplaceRenderer::new();
        let output = renderer
            .render(Some("this is name: ##Name##"), &json!({"Name": "james"}), true)
            .unwrap();
        assert_eq!(output, "this is name: james");
    }

    #[test]
    fn test_null_field_becomes_empty() {
        let output = ReplaceRenderer
            .render(Some("this is name: ##Name##"), &json!({"Name": null}), true)
            .unwrap();
        assert_eq!(output, "this is name: ");
    }

    #[test]
    fn test_every_occurrence_and_scalars() {
        let output = ReplaceRenderer
            .render(
                Some("##N## x ##N##, age ##Age##, ok ##Ok## ##Missing##"),
                &json!({"N": "a", "Age": 30, "Ok": true}),
                false,
            )
            .unwrap();
        assert_eq!(output, "a x a, age 30, ok true ##Missing##");
    }

    #[test]
    fn test_inserted_values_are_not_expanded() {
        let model = json!({"A": "##B##", "B": "b", "Z": "##A##"});
        let output = ReplaceRenderer
            .render(Some("##A## ##B## ##Z##"), &model, true)
            .unwrap();
        assert_eq!(output, "##B## b ##A##");
    }

    #[test]
    fn test_stray_markers_stay_literal() {
        let model = json!({"N": "a"});
        assert_eq!(ReplaceRenderer.render(Some("###N##"), &model, true).unwrap(), "#a");
        assert_eq!(ReplaceRenderer.render(Some("## ##N## ##"), &model, true).unwrap(), "## a ##");
        assert_eq!(ReplaceRenderer.render(Some("##N"), &model, true).unwrap(), "##N");
    }

    #[test]
    fn test_rendering_twice_is_identical() {
        let model = json!({"Name": "Zoë", "Count": 3, "Items": ["a", "b"], "Empty": null});
        let template = "<p>##Name## has ##Count## (##Items##)##Empty##</p>";
        let first = ReplaceRenderer.render(Some(template), &model, true).unwrap();
        let second = ReplaceRenderer.render(Some(template), &model, true).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, r#"<p>Zoë has 3 (["a","b"])</p>"#);
    }

    #[test]
    fn test_rejects_missing_template_or_model() {
        assert!(matches!(
            ReplaceRenderer.render(None, &json!({"Name": "x"}), true),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            ReplaceRenderer.render(Some("t"), &Value::Null, true),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_async_matches_sync() {
        let model = json!({"Name": "james"});
        let sync = ReplaceRenderer.render(Some("##Name##!"), &model, true).unwrap();
        let async_output = ReplaceRenderer
            .render_async(Some("##Name##!"), &model, true)
            .await
            .unwrap();
        assert_eq!(sync, async_output);
    }
}
