//! End-to-end reply flows: a scripted transport feeding a chat session.

use async_trait::async_trait;
use futures::stream;
use std::cell::RefCell;
use streamdesk::assembler::StreamState;
use streamdesk::conversation::{Entry, Message};
use streamdesk::render::{PlainHighlighter, RenderPipeline};
use streamdesk::session::{ChatSession, ExchangeEvent, drive_exchange};
use streamdesk::transport::{
    CONNECTION_LOST, ChatTransport, Fragment, FragmentSource, JobHandle, TransportError,
};

/// Replies with a canned start result and a canned event-stream body.
struct ScriptedTransport {
    start: RefCell<Option<Result<JobHandle, TransportError>>>,
    chunks: Vec<Result<String, String>>,
    prompts: RefCell<Vec<String>>,
}

impl ScriptedTransport {
    fn streaming(chunks: &[&str]) -> Self {
        Self {
            start: RefCell::new(Some(Ok(JobHandle::new("job-1")))),
            chunks: chunks.iter().map(|c| Ok(c.to_string())).collect(),
            prompts: RefCell::new(Vec::new()),
        }
    }

    fn with_error(mut self, error: &str) -> Self {
        self.chunks.push(Err(error.to_string()));
        self
    }

    fn rejecting(message: &str) -> Self {
        Self {
            start: RefCell::new(Some(Err(TransportError::Rejected(message.to_string())))),
            chunks: Vec::new(),
            prompts: RefCell::new(Vec::new()),
        }
    }
}

#[async_trait(?Send)]
impl ChatTransport for ScriptedTransport {
    async fn start_job(&self, prompt: &str) -> Result<JobHandle, TransportError> {
        self.prompts.borrow_mut().push(prompt.to_string());
        self.start
            .borrow_mut()
            .take()
            .unwrap_or_else(|| Err(TransportError::InvalidResponse("started twice".into())))
    }

    async fn subscribe(&self, _job: &JobHandle) -> FragmentSource {
        FragmentSource::from_byte_stream(stream::iter(self.chunks.clone()))
    }
}

fn content(text: &str) -> String {
    format!("data: {}\n\n", serde_json::json!({ "content": text }))
}

const END: &str = "data: <END>\n\n";

fn session() -> ChatSession {
    ChatSession::new(RenderPipeline::new(Box::new(PlainHighlighter)))
}

fn last_message(session: &ChatSession) -> &Message {
    session.log().messages().last().expect("at least one message")
}

mod happy_path {
    use super::*;

    #[tokio::test]
    async fn hello_streams_into_one_reply() {
        let transport = ScriptedTransport::streaming(&[&content("Hi"), &content(" there"), END]);
        let mut session = session();

        session.send(&transport, "hello").await.unwrap();

        assert_eq!(transport.prompts.borrow().as_slice(), ["hello"]);
        let texts: Vec<&str> = session.log().messages().map(|m| m.text()).collect();
        assert_eq!(texts.len(), 3);
        assert_eq!(texts[1], "hello");
        assert_eq!(texts[2], "Hi there");

        let reply = last_message(&session);
        assert!(reply.is_finalized());
        assert!(reply.rendered().unwrap().html.contains("Hi there"));
        assert!(session.input_enabled());
        assert_eq!(session.assembler().state(), &StreamState::Finalized);
        assert_eq!(session.log().open_message_count(), 0);
    }

    #[tokio::test]
    async fn finalized_text_is_the_concatenation_of_chunks() {
        let pieces = ["The ", "quick ", "brown ", "fox", " é", "\n\n- item"];
        let mut body: Vec<String> = pieces.iter().map(|p| content(p)).collect();
        body.push(END.to_string());
        let refs: Vec<&str> = body.iter().map(String::as_str).collect();
        let transport = ScriptedTransport::streaming(&refs);
        let mut session = session();

        session.send(&transport, "go").await.unwrap();

        assert_eq!(last_message(&session).text(), pieces.concat());
    }

    #[tokio::test]
    async fn chunks_split_across_reads_still_assemble() {
        let whole = format!("{}{}{}", content("ab"), content("cd"), END);
        let (left, right) = whole.split_at(7);
        let transport = ScriptedTransport::streaming(&[left, right]);
        let mut session = session();

        session.send(&transport, "split").await.unwrap();

        assert_eq!(last_message(&session).text(), "abcd");
    }

    #[tokio::test]
    async fn end_without_content_creates_no_reply() {
        let transport = ScriptedTransport::streaming(&[END]);
        let mut session = session();

        session.send(&transport, "anything?").await.unwrap();

        assert_eq!(last_message(&session).text(), "anything?");
        assert!(!session.log().has_placeholder());
        assert!(session.input_enabled());
    }

    #[tokio::test]
    async fn copy_controls_match_code_blocks_on_every_update() {
        let mut session = session();
        session.submit("code please").unwrap();
        let pieces = ["Here:\n\n```rust\nfn ", "main() {}\n```\n", "\nand\n\n```", "sh\nls\n```"];
        for piece in pieces {
            session.handle(ExchangeEvent::Fragment(Fragment::Content(piece.to_string())));
            let rendered = last_message(&session).rendered().unwrap().clone();
            assert_eq!(rendered.copy_control_count(), rendered.code_blocks.len());
        }
        session.handle(ExchangeEvent::Fragment(Fragment::End));

        let rendered = last_message(&session).rendered().unwrap();
        assert_eq!(rendered.code_blocks.len(), 2);
        assert_eq!(rendered.code_blocks[1].code, "ls\n");
    }
}

mod failures {
    use super::*;

    #[tokio::test]
    async fn start_failure_shows_inline_error() {
        let transport = ScriptedTransport::rejecting("rate limited");
        let mut session = session();

        session.send(&transport, "hello").await.unwrap();

        let reply = last_message(&session);
        assert!(reply.text().contains("rate limited"));
        assert!(reply.text().starts_with("**Error:**"));
        assert!(reply.is_finalized());
        assert!(session.input_enabled());
        assert!(matches!(session.assembler().state(), StreamState::Failed(_)));
    }

    #[tokio::test]
    async fn blank_prompt_never_reaches_transport() {
        let transport = ScriptedTransport::streaming(&[END]);
        let mut session = session();

        assert!(session.send(&transport, "   ").await.is_err());
        assert!(transport.prompts.borrow().is_empty());
        assert_eq!(session.log().len(), 1);
    }

    #[tokio::test]
    async fn channel_error_keeps_partial_code_and_appends_notice() {
        let transport =
            ScriptedTransport::streaming(&[&content("```py\ncode")]).with_error("connection reset");
        let mut session = session();

        session.send(&transport, "write code").await.unwrap();

        let reply = last_message(&session);
        assert_eq!(reply.text(), format!("```py\ncode\n\n{CONNECTION_LOST}"));
        assert!(reply.is_finalized());
        let rendered = reply.rendered().unwrap();
        assert_eq!(rendered.copy_control_count(), 1);
        assert!(session.input_enabled());
    }

    #[tokio::test]
    async fn server_closing_early_fails_the_reply() {
        let transport = ScriptedTransport::streaming(&[&content("partial")]);
        let mut session = session();

        session.send(&transport, "x").await.unwrap();

        assert_eq!(
            last_message(&session).text(),
            format!("partial\n\n{CONNECTION_LOST}")
        );
    }

    #[tokio::test]
    async fn failure_before_any_content_becomes_the_reply() {
        let transport = ScriptedTransport::streaming(&[]).with_error("refused");
        let mut session = session();

        session.send(&transport, "x").await.unwrap();

        let reply = last_message(&session);
        assert_eq!(reply.text(), CONNECTION_LOST);
        assert!(!session.log().has_placeholder());
    }

    #[tokio::test]
    async fn session_expired_payload_fails_with_its_message() {
        let expired = "data: {\"error\":\"Session expired\"}\n\n";
        let transport = ScriptedTransport::streaming(&[&content("a"), expired, &content("b")]);
        let mut session = session();

        session.send(&transport, "x").await.unwrap();

        assert_eq!(last_message(&session).text(), "a\n\nSession expired");
    }

    #[tokio::test]
    async fn malformed_payloads_do_not_interrupt() {
        let transport = ScriptedTransport::streaming(&[
            "data: not json\n\n",
            &content("ok"),
            "data: {\"content\":42}\n\n",
            END,
        ]);
        let mut session = session();

        session.send(&transport, "x").await.unwrap();

        assert_eq!(last_message(&session).text(), "ok");
        assert!(last_message(&session).is_finalized());
    }
}

mod event_stream {
    use super::*;

    #[tokio::test]
    async fn exchange_reports_exactly_one_terminal_event() {
        let transport = ScriptedTransport::streaming(&[&content("a"), END, &content("late")]);
        let mut events = Vec::new();

        drive_exchange(&transport, "x", |event| events.push(event)).await;

        assert_eq!(
            events,
            vec![
                ExchangeEvent::Fragment(Fragment::Content("a".into())),
                ExchangeEvent::Fragment(Fragment::End),
            ]
        );
    }

    #[tokio::test]
    async fn input_is_disabled_only_while_a_reply_is_open() {
        let mut session = session();
        assert!(session.input_enabled());

        session.submit("x").unwrap();
        assert!(!session.input_enabled());
        assert!(matches!(
            session.log().entries().last().map(|(_, entry)| entry),
            Some(Entry::Placeholder)
        ));

        session.handle(ExchangeEvent::Fragment(Fragment::Content("y".into())));
        assert!(!session.input_enabled());

        session.handle(ExchangeEvent::Fragment(Fragment::End));
        assert!(session.input_enabled());

        assert!(!session.handle(ExchangeEvent::Fragment(Fragment::Content("z".into()))));
        assert_eq!(last_message(&session).text(), "y");
    }
}
