// ABOUTME: Minimal named-substitution template engine.
// ABOUTME: Renders the build recipe and nginx site fragments; no conditionals or loops.

use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("unterminated placeholder starting at byte {0}")]
    Unterminated(usize),

    #[error("unknown placeholder: '{0}'")]
    UnknownPlaceholder(String),
}

/// Substitute `{{name}}` placeholders in `template` with values from `vars`.
///
/// Placeholders must match a key exactly; an unknown placeholder is an error
/// rather than silently passing through, so a typo in a template fails fast.
pub fn render(template: &str, vars: &BTreeMap<&str, String>) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut consumed = 0usize;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            return Err(TemplateError::Unterminated(consumed + start));
        };
        let name = after_open[..end].trim();
        match vars.get(name) {
            Some(value) => out.push_str(value),
            None => return Err(TemplateError::UnknownPlaceholder(name.to_string())),
        }
        consumed += start + 2 + end + 2;
        rest = &after_open[end + 2..];
    }

    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&'static str, &str)]) -> BTreeMap<&'static str, String> {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn substitutes_named_placeholders() {
        let result = render(
            "server {{containerName}}:{{appPort}};",
            &vars(&[("containerName", "myblog-staging-b"), ("appPort", "3000")]),
        )
        .unwrap();
        assert_eq!(result, "server myblog-staging-b:3000;");
    }

    #[test]
    fn tolerates_whitespace_inside_braces() {
        let result = render("{{ domain }}", &vars(&[("domain", "example.com")])).unwrap();
        assert_eq!(result, "example.com");
    }

    #[test]
    fn repeated_placeholders_render_each_time() {
        let result = render("{{x}}-{{x}}", &vars(&[("x", "a")])).unwrap();
        assert_eq!(result, "a-a");
    }

    #[test]
    fn unknown_placeholder_is_an_error() {
        let err = render("{{nope}}", &vars(&[])).unwrap_err();
        assert!(matches!(err, TemplateError::UnknownPlaceholder(name) if name == "nope"));
    }

    #[test]
    fn unterminated_placeholder_is_an_error() {
        assert!(matches!(
            render("{{oops", &vars(&[])),
            Err(TemplateError::Unterminated(0))
        ));
    }

    #[test]
    fn text_without_placeholders_passes_through() {
        let result = render("listen 80;", &vars(&[])).unwrap();
        assert_eq!(result, "listen 80;");
    }
}
