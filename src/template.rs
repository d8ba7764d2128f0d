//! The template substitution stage of the rendering pipeline. Templates use
//! the Go `text/template` syntax implemented by [`gtmpl`], e.g.
//! `{{.site.url}}` or `{{.post.title}}`.

use gtmpl_value::Value;
use std::fmt;

/// Renders `template` with `bindings` as the root (`.`) value.
pub fn render(template: &str, bindings: Value) -> Result<String> {
    gtmpl::template(template, bindings).map_err(|e| Error(e.to_string()))
}

/// The result of a fallible template operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Returned when a template can't be parsed or executed against its bindings.
#[derive(Clone, Debug, PartialEq)]
pub struct Error(pub String);

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "rendering template: {}", self.0)
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;

    fn bindings() -> Value {
        let mut site = HashMap::new();
        site.insert("url".to_owned(), Value::from("//localhost"));
        let mut root = HashMap::new();
        root.insert("site".to_owned(), Value::Object(site));
        Value::Object(root)
    }

    #[test]
    fn test_render_field() -> Result<()> {
        assert_eq!(
            render("<p>{{.site.url}}</p>", bindings())?,
            "<p>//localhost</p>"
        );
        Ok(())
    }

    #[test]
    fn test_plain_text_untouched() -> Result<()> {
        let html = "<a id=\"more\">&nbsp;</a>";
        assert_eq!(render(html, bindings())?, html);
        Ok(())
    }

    #[test]
    fn test_malformed_template_is_an_error() {
        assert!(render("{{.site.url", bindings()).is_err());
    }
}
