use super::highlight::{CodeHighlighter, unescape_html};
use super::{CodeBlock, RenderedHtml};

pub const COPY_BUTTON_CLASS: &str = "copy-btn";
const COPY_BUTTON_MARKER: &str = "class=\"copy-btn\"";
const HIGHLIGHTED_ATTR: &str = "data-highlighted";

/// Post-process rendered HTML: give every `<pre><code>` block one copy control
/// and highlight its code.
///
/// Idempotent: a block that already has a control keeps it, and a code element
/// already marked highlighted is not submitted again.
pub fn decorate(html: &str, highlighter: &dyn CodeHighlighter) -> RenderedHtml {
    let mut out = String::with_capacity(html.len() + 256);
    let mut code_blocks = Vec::new();
    let mut rest = html;

    while let Some(start) = find_pre_open(rest) {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let Some(close) = tail.find("</pre>") else {
            out.push_str(tail);
            rest = "";
            break;
        };
        decorate_block(&tail[..close], highlighter, &mut out, &mut code_blocks);
        out.push_str("</pre>");
        rest = &tail[close + "</pre>".len()..];
    }
    out.push_str(rest);

    RenderedHtml {
        html: out,
        code_blocks,
    }
}

pub fn copy_button_html(index: usize) -> String {
    format!(
        r#"<button class="{COPY_BUTTON_CLASS}" type="button" data-copy-index="{index}" title="Copy code"><span class="copy-text">Copy</span></button>"#
    )
}

/// Count of copy controls present in `html`.
pub fn count_copy_controls(html: &str) -> usize {
    html.matches(COPY_BUTTON_MARKER).count()
}

fn find_pre_open(html: &str) -> Option<usize> {
    let mut offset = 0;
    while let Some(found) = html[offset..].find("<pre") {
        let at = offset + found;
        match html.as_bytes().get(at + 4) {
            Some(b'>') | Some(b' ') => return Some(at),
            _ => offset = at + 4,
        }
    }
    None
}

/// `block` spans from `<pre` up to, not including, `</pre>`.
fn decorate_block(
    block: &str,
    highlighter: &dyn CodeHighlighter,
    out: &mut String,
    code_blocks: &mut Vec<CodeBlock>,
) {
    let Some(code_at) = block.find("<code") else {
        out.push_str(block);
        return;
    };
    let (head, code_el) = block.split_at(code_at);
    let Some(open_end) = code_el.find('>') else {
        out.push_str(block);
        return;
    };
    let open_tag = &code_el[..open_end];
    let rest = &code_el[open_end + 1..];
    let (inner, after) = match rest.rfind("</code>") {
        Some(pos) => rest.split_at(pos),
        None => (rest, ""),
    };

    let code = unescape_html(&strip_tags(inner));
    let language = language_of(open_tag);

    out.push_str(head);
    if !head.contains(COPY_BUTTON_MARKER) {
        out.push_str(&copy_button_html(code_blocks.len()));
    }

    if has_attribute(open_tag, HIGHLIGHTED_ATTR) {
        out.push_str(open_tag);
        out.push('>');
        out.push_str(inner);
    } else {
        out.push_str(open_tag);
        out.push_str(" data-highlighted=\"yes\">");
        out.push_str(&highlighter.highlight(language.as_deref(), &code));
    }
    out.push_str(after);

    code_blocks.push(CodeBlock { language, code });
}

/// True when `name` is an attribute of `tag` itself, not text inside a quoted value.
fn has_attribute(tag: &str, name: &str) -> bool {
    let mut bare = String::with_capacity(tag.len());
    let mut quote = None;
    for ch in tag.chars() {
        match quote {
            Some(open) if ch == open => quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                bare.push(' ');
            }
            None => bare.push(ch),
        }
    }
    bare.split(|c: char| c.is_whitespace() || c == '=')
        .any(|token| token == name)
}

fn language_of(open_tag: &str) -> Option<String> {
    let start = open_tag.find("language-")? + "language-".len();
    let lang: String = open_tag[start..]
        .chars()
        .take_while(|c| !matches!(c, '"' | '\'' | ' '))
        .collect();
    (!lang.is_empty()).then_some(lang)
}

fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::highlight::PlainHighlighter;
    use std::cell::Cell;

    #[derive(Default)]
    struct CountingHighlighter {
        calls: Cell<usize>,
    }

    impl CodeHighlighter for CountingHighlighter {
        fn highlight(&self, _language: Option<&str>, code: &str) -> String {
            self.calls.set(self.calls.get() + 1);
            format!("<span class=\"hl\">{}</span>", crate::render::highlight::escape_html(code))
        }
    }

    const TWO_BLOCKS: &str = "<p>a</p>\n<pre><code class=\"language-py\">x = 1 &lt; 2\n</code></pre>\n<ul>\n<li>\n<pre><code>plain\n</code></pre>\n</li>\n</ul>\n";

    #[test]
    fn inserts_one_control_per_block_and_records_raw_code() {
        let highlighter = CountingHighlighter::default();
        let rendered = decorate(TWO_BLOCKS, &highlighter);

        assert_eq!(count_copy_controls(&rendered.html), 2);
        assert_eq!(highlighter.calls.get(), 2);
        assert_eq!(rendered.code_blocks.len(), 2);
        assert_eq!(rendered.code_blocks[0].language.as_deref(), Some("py"));
        assert_eq!(rendered.code_blocks[0].code, "x = 1 < 2\n");
        assert_eq!(rendered.code_blocks[1].language, None);
        assert!(rendered.html.contains("<pre><button class=\"copy-btn\""));
        assert!(rendered.html.contains("data-copy-index=\"1\""));
    }

    #[test]
    fn second_pass_adds_nothing() {
        let highlighter = CountingHighlighter::default();
        let once = decorate(TWO_BLOCKS, &highlighter);
        let twice = decorate(&once.html, &highlighter);

        assert_eq!(twice.html, once.html);
        assert_eq!(highlighter.calls.get(), 2);
        assert_eq!(twice.code_blocks, once.code_blocks);
    }

    #[test]
    fn marker_word_in_fence_info_still_gets_highlighted() {
        let highlighter = CountingHighlighter::default();
        let html = crate::render::markdown_to_html("```data-highlighted\nx = 1\n```");
        assert!(html.contains("language-data-highlighted"));

        let rendered = decorate(&html, &highlighter);
        assert_eq!(highlighter.calls.get(), 1);
        assert!(rendered.html.contains(" data-highlighted=\"yes\">"));
        assert_eq!(rendered.code_blocks[0].language.as_deref(), Some("data-highlighted"));

        let again = decorate(&rendered.html, &highlighter);
        assert_eq!(highlighter.calls.get(), 1);
        assert_eq!(again.html, rendered.html);
    }

    #[test]
    fn attribute_check_ignores_quoted_values() {
        assert!(has_attribute(r#"<code class="language-py" data-highlighted="yes""#, HIGHLIGHTED_ATTR));
        assert!(!has_attribute(r#"<code class="language-data-highlighted""#, HIGHLIGHTED_ATTR));
        assert!(!has_attribute(r#"<code title='data-highlighted'"#, HIGHLIGHTED_ATTR));
    }

    #[test]
    fn html_without_code_blocks_is_untouched() {
        let html = "<p>preface <code>inline</code></p>\n<blockquote><p>q</p></blockquote>\n";
        let rendered = decorate(html, &PlainHighlighter);
        assert_eq!(rendered.html, html);
        assert!(rendered.code_blocks.is_empty());
    }

    #[test]
    fn unterminated_pre_is_left_as_is() {
        let html = "<pre><code>never closed";
        assert_eq!(decorate(html, &PlainHighlighter).html, html);
    }

    #[test]
    fn preformatted_lookalike_tags_are_ignored() {
        let html = "<preview>x</preview>";
        assert_eq!(decorate(html, &PlainHighlighter).html, html);
    }
}
