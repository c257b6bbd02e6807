//! The `{% layout "name" %}` directive.

/// A template split from its layout directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutDirective {
    /// Layout name, as passed to the file provider.
    pub name: String,
    /// Template source without the directive.
    pub source: String,
}

/// Finds the first layout directive in `source`.
///
/// The name may be single or double quoted and whitespace control markers
/// (`{%-`, `-%}`) are accepted. Returns `None` when there is no directive.
#[must_use]
pub fn take_layout(source: &str) -> Option<LayoutDirective> {
    let mut from = 0;
    while let Some(offset) = source[from..].find("{%") {
        let start = from + offset;
        if let Some((name, len)) = parse_directive(&source[start..]) {
            let mut stripped = String::with_capacity(source.len() - len);
            stripped.push_str(&source[..start]);
            stripped.push_str(&source[start + len..]);
            return Some(LayoutDirective {
                name: name.to_string(),
                source: stripped,
            });
        }
        from = start + 2;
    }
    None
}

/// Parses a directive at the start of `tag`, returning the name and the
/// directive's length in bytes.
fn parse_directive(tag: &str) -> Option<(&str, usize)> {
    let rest = tag.strip_prefix("{%")?;
    let rest = rest.strip_prefix('-').unwrap_or(rest);
    let rest = rest.trim_start().strip_prefix("layout")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start();

    let quote = rest.chars().next().filter(|c| matches!(c, '"' | '\''))?;
    let rest = &rest[1..];
    let close = rest.find(quote)?;
    let name = &rest[..close];
    if name.trim().is_empty() {
        return None;
    }

    let rest = rest[close + 1..].trim_start();
    let rest = rest.strip_prefix('-').unwrap_or(rest);
    let rest = rest.strip_prefix("%}")?;
    Some((name, tag.len() - rest.len()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_double_quoted() {
        let directive = take_layout("{% layout \"base.html\" %}\n<p>Hi</p>").unwrap();
        assert_eq!(directive.name, "base.html");
        assert_eq!(directive.source, "\n<p>Hi</p>");
    }

    #[test]
    fn test_single_quoted_with_trim_markers() {
        let directive = take_layout("before{%- layout 'layouts/mail.html' -%}after").unwrap();
        assert_eq!(directive.name, "layouts/mail.html");
        assert_eq!(directive.source, "beforeafter");
    }

    #[test]
    fn test_other_tags_are_skipped() {
        let source = "{% if x %}a{% endif %}{%layout   \"l\"%}";
        let directive = take_layout(source).unwrap();
        assert_eq!(directive.name, "l");
        assert_eq!(directive.source, "{% if x %}a{% endif %}");
    }

    #[test]
    fn test_not_a_directive() {
        assert_eq!(take_layout("<p>{{ name }}</p>"), None);
        assert_eq!(take_layout("{% layouts \"x\" %}"), None);
        assert_eq!(take_layout("{% layout x %}"), None);
        assert_eq!(take_layout("{% layout \"\" %}"), None);
        assert_eq!(take_layout("{% layout \"x\""), None);
    }
}
