//! Render pipeline: markdown to HTML, then code-block decoration.
//!
//! Every call renders the full text from scratch. Markdown constructs such as
//! an unclosed fence only resolve once more text is known, so HTML from an
//! earlier partial render is never reused.
pub mod copy;
pub mod decorate;
pub mod highlight;

use comrak::{Options, markdown_to_html as comrak_to_html};

pub use copy::{COPIED_FEEDBACK, ClipboardError, ClipboardSink, CopyControl, SystemClipboard};
pub use decorate::{count_copy_controls, decorate};
pub use highlight::{CodeHighlighter, PlainHighlighter, SyntectHighlighter};

/// A fenced or indented code block found in rendered output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeBlock {
    pub language: Option<String>,
    /// Unescaped text, as placed on the clipboard.
    pub code: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderedHtml {
    pub html: String,
    pub code_blocks: Vec<CodeBlock>,
}

impl RenderedHtml {
    pub fn copy_control_count(&self) -> usize {
        count_copy_controls(&self.html)
    }
}

fn markdown_options() -> Options<'static> {
    let mut options = Options::default();
    options.extension.table = true;
    options.extension.footnotes = true;
    options.extension.strikethrough = true;
    options.extension.tasklist = true;
    options.extension.autolink = true;
    // Model output is untrusted: raw HTML is shown as text, never injected.
    options.render.unsafe_ = false;
    options.render.escape = true;
    options
}

pub fn markdown_to_html(md: &str) -> String {
    comrak_to_html(md, &markdown_options())
}

pub struct RenderPipeline {
    highlighter: Box<dyn CodeHighlighter>,
}

impl Default for RenderPipeline {
    fn default() -> Self {
        Self::new(Box::new(SyntectHighlighter))
    }
}

impl RenderPipeline {
    pub fn new(highlighter: Box<dyn CodeHighlighter>) -> Self {
        Self { highlighter }
    }

    pub fn render(&self, text: &str) -> RenderedHtml {
        decorate(&markdown_to_html(text), self.highlighter.as_ref())
    }
}

impl std::fmt::Debug for RenderPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPipeline").finish_non_exhaustive()
    }
}
