//! The markup conversion stage of the rendering pipeline.

use pulldown_cmark::{html, Options, Parser};

/// Converts markdown to HTML. Trailing whitespace is trimmed from the result
/// so that a single paragraph renders as `<p>...</p>`.
pub fn to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, Parser::new_ext(markdown, options));
    out.truncate(out.trim_end().len());
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_paragraph() {
        assert_eq!(to_html("hello *world*\n"), "<p>hello <em>world</em></p>");
    }

    #[test]
    fn test_empty() {
        assert_eq!(to_html(""), "");
    }

    #[test]
    fn test_template_actions_survive() {
        // Template actions must come through the converter untouched.
        assert_eq!(
            to_html("{{.site.url}} and {{.post.title}}"),
            "<p>{{.site.url}} and {{.post.title}}</p>"
        );
    }

    #[test]
    fn test_inline_html_passes_through() {
        let html = to_html("a\n<a id=\"more\"></a>\nb");
        assert!(html.starts_with("<p>a"));
        assert!(html.contains("<a id=\"more\"></a>"));
        assert!(html.ends_with("b</p>"));
    }

    #[test]
    fn test_strikethrough_and_tables() {
        assert_eq!(to_html("~~gone~~"), "<p><del>gone</del></p>");
        let table = to_html("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(table.starts_with("<table>"));
    }
}
