//! One chat: the conversation log, the assembler for the in-flight reply and
//! the render pipeline, plus the loop that feeds a transport's fragments in.

use crate::assembler::StreamAssembler;
use crate::conversation::{ConversationLog, EntryId, Message};
use crate::render::{ClipboardSink, CopyControl, RenderPipeline};
use crate::transport::{CONNECTION_LOST, ChatTransport, Fragment};
use std::collections::HashMap;
use std::time::Instant;

pub const WELCOME_MESSAGE: &str = "Hi! I'm your coding assistant. Use the **Prompts** button to save and reuse your favourite requests.";

/// What an exchange reports back to its session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExchangeEvent {
    /// The start call failed; no stream was opened.
    StartFailed(String),
    Fragment(Fragment),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("Nothing to send")]
    Empty,
    #[error("Wait for the current reply to finish")]
    Busy,
}

/// Inline form of a start failure.
pub fn start_failure_text(message: &str) -> String {
    format!("**Error:** {message}")
}

#[derive(Debug)]
pub struct ChatSession {
    log: ConversationLog,
    assembler: StreamAssembler,
    pipeline: RenderPipeline,
    copy_controls: HashMap<(EntryId, usize), CopyControl>,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new(RenderPipeline::default())
    }
}

impl ChatSession {
    pub fn new(pipeline: RenderPipeline) -> Self {
        let mut log = ConversationLog::new();
        let mut welcome = Message::assistant(WELCOME_MESSAGE, pipeline.render(WELCOME_MESSAGE));
        welcome.finalize_in_place();
        log.append(welcome);
        Self {
            log,
            assembler: StreamAssembler::new(),
            pipeline,
            copy_controls: HashMap::new(),
        }
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn assembler(&self) -> &StreamAssembler {
        &self.assembler
    }

    pub fn input_enabled(&self) -> bool {
        self.assembler.input_enabled()
    }

    pub fn take_scroll_request(&mut self) -> Option<std::time::Duration> {
        self.log.take_scroll_request()
    }

    /// Record the user's message and show the typing placeholder.
    ///
    /// Returns the trimmed prompt to hand to the transport.
    pub fn submit(&mut self, text: &str) -> Result<String, SubmitError> {
        let prompt = text.trim();
        if prompt.is_empty() {
            return Err(SubmitError::Empty);
        }
        if !self.assembler.input_enabled() {
            return Err(SubmitError::Busy);
        }
        self.log.append(Message::user(prompt));
        self.assembler
            .begin(&mut self.log)
            .map_err(|_| SubmitError::Busy)?;
        Ok(prompt.to_string())
    }

    pub fn handle(&mut self, event: ExchangeEvent) -> bool {
        match event {
            ExchangeEvent::StartFailed(message) => self.assembler.on_transport_error(
                &start_failure_text(&message),
                &mut self.log,
                &self.pipeline,
            ),
            ExchangeEvent::Fragment(fragment) => {
                self.assembler
                    .on_fragment(fragment, &mut self.log, &self.pipeline)
            }
        }
    }

    /// Submit `text` and drive the whole reply from `transport`.
    pub async fn send<T>(&mut self, transport: &T, text: &str) -> Result<(), SubmitError>
    where
        T: ChatTransport + ?Sized,
    {
        let prompt = self.submit(text)?;
        drive_exchange(transport, &prompt, |event| {
            self.handle(event);
        })
        .await;
        Ok(())
    }

    /// Copy code block `index` of message `id` to `clipboard`.
    pub fn copy_code_block(
        &mut self,
        id: EntryId,
        index: usize,
        clipboard: &mut dyn ClipboardSink,
        now: Instant,
    ) -> bool {
        let Some(code) = self.code_block_text(id, index) else {
            tracing::debug!(%id, index, "no code block to copy");
            return false;
        };
        self.copy_controls
            .entry((id, index))
            .or_default()
            .activate(&code, clipboard, now)
    }

    /// Enter the copied state for a block the page already copied itself.
    pub fn mark_copied(&mut self, id: EntryId, index: usize, now: Instant) {
        if self.code_block_text(id, index).is_some() {
            self.copy_controls
                .entry((id, index))
                .or_default()
                .mark_copied(now);
        }
    }

    pub fn copy_label(&self, id: EntryId, index: usize, now: Instant) -> &'static str {
        self.copy_controls
            .get(&(id, index))
            .copied()
            .unwrap_or_default()
            .label(now)
    }

    pub fn code_block_text(&self, id: EntryId, index: usize) -> Option<String> {
        let rendered = self.log.message(id)?.rendered()?;
        rendered.code_blocks.get(index).map(|block| block.code.clone())
    }
}

/// Start a job for `prompt` and report everything that happens to `on_event`,
/// ending with exactly one terminal event. The channel is closed on return.
pub async fn drive_exchange<T, F>(transport: &T, prompt: &str, mut on_event: F)
where
    T: ChatTransport + ?Sized,
    F: FnMut(ExchangeEvent),
{
    let (job, mut source) = match transport.start_and_stream(prompt).await {
        Ok(started) => started,
        Err(err) => {
            tracing::warn!(%err, "could not start reply");
            on_event(ExchangeEvent::StartFailed(err.to_string()));
            return;
        }
    };

    let mut terminated = false;
    while let Some(fragment) = source.next_fragment().await {
        let terminal = fragment.is_terminal();
        on_event(ExchangeEvent::Fragment(fragment));
        if terminal {
            terminated = true;
            break;
        }
    }
    source.close();

    if !terminated {
        tracing::warn!(job = %job, "stream closed without a terminal fragment");
        on_event(ExchangeEvent::Fragment(Fragment::Failed(
            CONNECTION_LOST.to_string(),
        )));
    }
    tracing::info!(job = %job, "stream closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::PlainHighlighter;

    fn session() -> ChatSession {
        ChatSession::new(RenderPipeline::new(Box::new(PlainHighlighter)))
    }

    #[test]
    fn starts_with_a_finalized_welcome() {
        let session = session();
        let messages: Vec<&Message> = session.log().messages().collect();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text(), WELCOME_MESSAGE);
        assert!(messages[0].is_finalized());
        assert!(session.input_enabled());
    }

    #[test]
    fn submit_rejects_blank_and_busy() {
        let mut session = session();
        assert_eq!(session.submit("  \n"), Err(SubmitError::Empty));
        assert_eq!(session.submit(" hello ").unwrap(), "hello");
        assert!(!session.input_enabled());
        assert_eq!(session.submit("again"), Err(SubmitError::Busy));
        assert_eq!(session.log().messages().count(), 2);
    }

    #[test]
    fn start_failure_becomes_inline_error() {
        let mut session = session();
        session.submit("hello").unwrap();
        session.handle(ExchangeEvent::StartFailed("rate limited".into()));

        let last = session.log().messages().last().unwrap();
        assert_eq!(last.text(), "**Error:** rate limited");
        assert!(last.rendered().unwrap().html.contains("<strong>Error:</strong>"));
        assert!(session.input_enabled());
        assert!(!session.log().has_placeholder());
    }
}
