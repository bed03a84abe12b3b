use once_cell::sync::Lazy;
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

/// Class prefix on every highlighted span; keeps syntect's scope names from
/// colliding with page classes like `text` or `message`.
pub const HIGHLIGHT_CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "hl-" };

static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);

/// Turns raw code into the HTML placed inside its `<code>` element.
pub trait CodeHighlighter {
    fn highlight(&self, language: Option<&str>, code: &str) -> String;
}

/// Class-based highlighting; colors come from the theme stylesheet.
#[derive(Clone, Copy, Debug, Default)]
pub struct SyntectHighlighter;

impl CodeHighlighter for SyntectHighlighter {
    fn highlight(&self, language: Option<&str>, code: &str) -> String {
        let syntax = language
            .and_then(|token| SYNTAX_SET.find_syntax_by_token(token))
            .unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text());

        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &SYNTAX_SET, HIGHLIGHT_CLASS_STYLE);
        for line in LinesWithEndings::from(code) {
            if let Err(err) = generator.parse_html_for_line_which_includes_newline(line) {
                tracing::debug!(%err, language, "highlighting failed, using plain code");
                return escape_html(code);
            }
        }
        generator.finalize()
    }
}

/// No decoration beyond escaping.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainHighlighter;

impl CodeHighlighter for PlainHighlighter {
    fn highlight(&self, _language: Option<&str>, code: &str) -> String {
        escape_html(code)
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_round_trips() {
        let raw = r#"if a < b && c > "d" { &x }"#;
        assert_eq!(unescape_html(&escape_html(raw)), raw);
        assert_eq!(unescape_html("&amp;lt;"), "&lt;");
    }

    #[test]
    fn syntect_output_keeps_code_text() {
        let html = SyntectHighlighter.highlight(Some("py"), "def f(x):\n    return x < 1\n");
        assert!(html.contains("hl-"));
        assert!(html.contains("&lt;"));
        assert!(!html.contains("x < 1"));
    }

    #[test]
    fn unknown_language_is_plain_text() {
        let html = SyntectHighlighter.highlight(Some("no-such-lang"), "a < b");
        assert!(html.contains("a &lt; b"));
    }
}
