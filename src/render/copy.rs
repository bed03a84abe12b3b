use std::time::{Duration, Instant};

/// How long a copy control stays in its "copied" state.
pub const COPIED_FEEDBACK: Duration = Duration::from_millis(1500);

pub const COPY_LABEL: &str = "Copy";
pub const COPIED_LABEL: &str = "Copied!";

#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("Clipboard unavailable: {0}")]
    Unavailable(String),

    #[error("Clipboard write failed: {0}")]
    WriteFailed(String),
}

/// Destination for copied code.
pub trait ClipboardSink {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// The OS clipboard.
#[derive(Debug, Default)]
pub struct SystemClipboard;

#[cfg(not(target_arch = "wasm32"))]
impl ClipboardSink for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
        clipboard
            .set_text(text.to_string())
            .map_err(|e| ClipboardError::WriteFailed(e.to_string()))
    }
}

#[cfg(target_arch = "wasm32")]
impl ClipboardSink for SystemClipboard {
    fn set_text(&mut self, _text: &str) -> Result<(), ClipboardError> {
        // The browser clipboard is async and owned by the page; the web view copies there.
        Err(ClipboardError::Unavailable(
            "no native clipboard in the browser".to_string(),
        ))
    }
}

/// State of one code block's copy control.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CopyControl {
    copied_until: Option<Instant>,
}

impl CopyControl {
    /// Copy `code` and enter the "copied" state. Failures are logged and leave
    /// the control unchanged.
    pub fn activate(&mut self, code: &str, clipboard: &mut dyn ClipboardSink, now: Instant) -> bool {
        match clipboard.set_text(code) {
            Ok(()) => {
                self.copied_until = Some(now + COPIED_FEEDBACK);
                true
            }
            Err(err) => {
                tracing::warn!(%err, "copy to clipboard failed");
                false
            }
        }
    }

    /// Mark as copied without touching a clipboard (the browser already did it).
    pub fn mark_copied(&mut self, now: Instant) {
        self.copied_until = Some(now + COPIED_FEEDBACK);
    }

    pub fn is_copied(&self, now: Instant) -> bool {
        matches!(self.copied_until, Some(until) if now < until)
    }

    pub fn label(&self, now: Instant) -> &'static str {
        if self.is_copied(now) {
            COPIED_LABEL
        } else {
            COPY_LABEL
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct MemoryClipboard {
        contents: Option<String>,
        fail: bool,
    }

    impl ClipboardSink for MemoryClipboard {
        fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
            if self.fail {
                return Err(ClipboardError::WriteFailed("denied".into()));
            }
            self.contents = Some(text.to_string());
            Ok(())
        }
    }

    #[test]
    fn copied_state_reverts_after_feedback_window() {
        let start = Instant::now();
        let mut clipboard = MemoryClipboard::default();
        let mut control = CopyControl::default();

        assert_eq!(control.label(start), COPY_LABEL);
        assert!(control.activate("print(1)", &mut clipboard, start));
        assert_eq!(clipboard.contents.as_deref(), Some("print(1)"));
        assert_eq!(control.label(start + Duration::from_millis(1499)), COPIED_LABEL);
        assert_eq!(control.label(start + COPIED_FEEDBACK), COPY_LABEL);
    }

    #[test]
    fn clipboard_failure_keeps_idle_state() {
        let now = Instant::now();
        let mut clipboard = MemoryClipboard {
            fail: true,
            ..Default::default()
        };
        let mut control = CopyControl::default();
        assert!(!control.activate("x", &mut clipboard, now));
        assert!(!control.is_copied(now));
    }
}
