//! Transport adapter: starts a generation job and subscribes to its push channel.
//!
//! - `http` - reqwest implementation against the chat server
//! - `sse` - incremental event-stream parser and payload decoding
//! - `source` - the lazy, cancelable fragment sequence handed to the assembler
mod http;
pub mod source;
pub mod sse;

use async_trait::async_trait;

pub use http::{HttpTransport, parse_start_response};
pub use source::FragmentSource;

/// Literal data value the server sends to end a stream cleanly.
pub const END_SENTINEL: &str = "<END>";
/// Shown when the push channel dies before the sentinel.
pub const CONNECTION_LOST: &str = "Connection to the server was lost.";
/// Used when a failed start call carries no `error` field.
pub const START_FAILED_FALLBACK: &str = "API request failed";

/// One unit delivered by a [`FragmentSource`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fragment {
    /// A text delta to append to the reply.
    Content(String),
    /// Clean end of stream.
    End,
    /// Synthetic fragment produced when the channel fails.
    Failed(String),
}

impl Fragment {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Fragment::Content(_))
    }
}

/// Server-issued id tying a start request to its stream subscription.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Prompt is empty")]
    EmptyPrompt,

    /// Non-2xx start call; carries the server's message or the fallback.
    #[error("{0}")]
    Rejected(String),

    #[error("Network error. Check your connection.")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected response from server: {0}")]
    InvalidResponse(String),
}

/// Trims the prompt and rejects it when nothing is left.
pub fn validate_prompt(prompt: &str) -> Result<&str, TransportError> {
    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        Err(TransportError::EmptyPrompt)
    } else {
        Ok(trimmed)
    }
}

/// Boundary to the generation backend.
///
/// Single-threaded by contract: the returned source is driven on the UI executor,
/// so nothing here is required to be `Send`.
#[async_trait(?Send)]
pub trait ChatTransport {
    /// Request/response call that creates a generation job.
    async fn start_job(&self, prompt: &str) -> Result<JobHandle, TransportError>;

    /// Open the push channel for `job`. Connection problems surface as a
    /// `Fragment::Failed` from the returned source, never as an error here.
    async fn subscribe(&self, job: &JobHandle) -> FragmentSource;

    async fn start_and_stream(
        &self,
        prompt: &str,
    ) -> Result<(JobHandle, FragmentSource), TransportError> {
        let prompt = validate_prompt(prompt)?;
        let job = self.start_job(prompt).await?;
        tracing::info!(job = %job, "generation job started");
        let source = self.subscribe(&job).await;
        Ok((job, source))
    }
}
