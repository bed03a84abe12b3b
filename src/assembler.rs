//! Stream assembler: turns an ordered fragment sequence into one assistant message.
//!
//! ```text
//! Idle ──begin──▶ Pending ──Content──▶ Streaming ──End──▶ Finalized
//!                    │  └─────End (no message)────────────▶ Finalized
//!                    └──Failed──▶ Failed ◀──Failed── Streaming
//! ```
//!
//! The assembler is the only writer of the in-flight message. The log and the
//! render pipeline are handed in by reference on every transition.

use crate::conversation::{ConversationLog, EntryId, Message};
use crate::render::RenderPipeline;
use crate::transport::Fragment;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum StreamState {
    #[default]
    Idle,
    /// Placeholder shown, no content yet.
    Pending { placeholder: EntryId },
    /// `text` is everything received so far and is never empty.
    Streaming { message: EntryId, text: String },
    Finalized,
    Failed(String),
}

impl StreamState {
    pub fn is_active(&self) -> bool {
        matches!(self, StreamState::Pending { .. } | StreamState::Streaming { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            StreamState::Idle => "idle",
            StreamState::Pending { .. } => "pending",
            StreamState::Streaming { .. } => "streaming",
            StreamState::Finalized => "finalized",
            StreamState::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("a reply is already in progress")]
pub struct Busy;

#[derive(Debug, Default)]
pub struct StreamAssembler {
    state: StreamState,
}

impl StreamAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &StreamState {
        &self.state
    }

    /// Input is accepted exactly when no reply is pending or streaming.
    pub fn input_enabled(&self) -> bool {
        !self.state.is_active()
    }

    /// Text accumulated for the in-flight reply, if any.
    pub fn accumulated_text(&self) -> Option<&str> {
        match &self.state {
            StreamState::Streaming { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn begin(&mut self, log: &mut ConversationLog) -> Result<(), Busy> {
        if self.state.is_active() {
            return Err(Busy);
        }
        let placeholder = log.show_placeholder();
        self.state = StreamState::Pending { placeholder };
        Ok(())
    }

    /// Apply one fragment. Returns `false` when the fragment was ignored because
    /// no reply is in flight.
    pub fn on_fragment(
        &mut self,
        fragment: Fragment,
        log: &mut ConversationLog,
        pipeline: &RenderPipeline,
    ) -> bool {
        match fragment {
            Fragment::Content(piece) => self.on_content(&piece, log, pipeline),
            Fragment::End => self.finish(log),
            Fragment::Failed(message) => self.on_transport_error(&message, log, pipeline),
        }
    }

    fn on_content(&mut self, piece: &str, log: &mut ConversationLog, pipeline: &RenderPipeline) -> bool {
        if piece.is_empty() {
            return self.state.is_active();
        }
        match &mut self.state {
            StreamState::Pending { placeholder } => {
                let placeholder = *placeholder;
                let message = Message::assistant(piece, pipeline.render(piece));
                match log.replace_pending(placeholder, message) {
                    Ok(id) => {
                        self.state = StreamState::Streaming {
                            message: id,
                            text: piece.to_string(),
                        };
                    }
                    Err(err) => {
                        tracing::warn!(%err, "lost the reply placeholder; appending instead");
                        let id = log.append(Message::assistant(piece, pipeline.render(piece)));
                        self.state = StreamState::Streaming {
                            message: id,
                            text: piece.to_string(),
                        };
                    }
                }
                true
            }
            StreamState::Streaming { message, text } => {
                text.push_str(piece);
                let rendered = pipeline.render(text);
                if let Err(err) = log
                    .append_text(*message, piece)
                    .and_then(|()| log.set_rendered(*message, rendered))
                {
                    tracing::warn!(%err, "reply message rejected update");
                }
                true
            }
            other => {
                tracing::debug!(state = other.name(), "ignoring content outside an active reply");
                false
            }
        }
    }

    /// Terminal signal. With no content received the placeholder just goes away.
    pub fn finish(&mut self, log: &mut ConversationLog) -> bool {
        match std::mem::take(&mut self.state) {
            StreamState::Pending { placeholder } => {
                if let Err(err) = log.remove_placeholder(placeholder) {
                    tracing::warn!(%err, "placeholder already gone");
                }
                tracing::info!("reply ended without content");
                self.state = StreamState::Finalized;
                true
            }
            StreamState::Streaming { message, text } => {
                if let Err(err) = log.finalize(message) {
                    tracing::warn!(%err, "reply message could not be finalized");
                }
                tracing::info!(chars = text.chars().count(), "reply finalized");
                self.state = StreamState::Finalized;
                true
            }
            other => {
                tracing::debug!(state = other.name(), "ignoring end of stream");
                self.state = other;
                false
            }
        }
    }

    /// Channel or start failure. Partial content is kept and the error text is
    /// appended; with no content yet, the error becomes the whole message.
    pub fn on_transport_error(
        &mut self,
        error: &str,
        log: &mut ConversationLog,
        pipeline: &RenderPipeline,
    ) -> bool {
        match std::mem::take(&mut self.state) {
            StreamState::Pending { placeholder } => {
                let message = Message::assistant(error, pipeline.render(error));
                let id = match log.replace_pending(placeholder, message) {
                    Ok(id) => id,
                    Err(err) => {
                        tracing::warn!(%err, "lost the reply placeholder; appending instead");
                        log.append(Message::assistant(error, pipeline.render(error)))
                    }
                };
                if let Err(err) = log.finalize(id) {
                    tracing::warn!(%err, "error message could not be finalized");
                }
                self.state = StreamState::Failed(error.to_string());
                true
            }
            StreamState::Streaming { message, mut text } => {
                let suffix = format!("\n\n{error}");
                text.push_str(&suffix);
                let rendered = pipeline.render(&text);
                if let Err(err) = log
                    .append_text(message, &suffix)
                    .and_then(|()| log.set_rendered(message, rendered))
                    .and_then(|()| log.finalize(message))
                {
                    tracing::warn!(%err, "reply message rejected error suffix");
                }
                self.state = StreamState::Failed(error.to_string());
                true
            }
            other => {
                tracing::debug!(state = other.name(), %error, "ignoring transport error");
                self.state = other;
                false
            }
        }
    }
}
