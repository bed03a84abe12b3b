//! Prompt library: a local cache of reusable prompts mirrored from the server's
//! `/prompts` collection.
//!
//! The cache only changes after the server confirms. Failures are logged and
//! leave it untouched.

use crate::config::Config;
use crate::types::PromptEntry;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

/// Characters of a prompt shown in the delete confirmation.
pub const DELETE_PREVIEW_CHARS: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("Prompt is empty")]
    Empty,

    #[error("Prompt already saved")]
    Duplicate,

    #[error("Server returned {0}")]
    Status(u16),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Server-side prompt collection.
#[async_trait(?Send)]
pub trait PromptBackend {
    async fn list(&self) -> Result<Vec<String>, PromptError>;
    async fn create(&self, text: &str) -> Result<(), PromptError>;
    async fn delete(&self, text: &str) -> Result<(), PromptError>;
}

pub struct HttpPromptBackend {
    client: Client,
    config: Config,
}

impl HttpPromptBackend {
    pub fn new(config: Config) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[derive(Serialize)]
struct PromptBody<'a> {
    text: &'a str,
}

fn check_status(response: &reqwest::Response) -> Result<(), PromptError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(PromptError::Status(status.as_u16()))
    }
}

#[async_trait(?Send)]
impl PromptBackend for HttpPromptBackend {
    async fn list(&self) -> Result<Vec<String>, PromptError> {
        let response = self
            .client
            .get(self.config.endpoint("/prompts"))
            .send()
            .await?;
        check_status(&response)?;
        Ok(response.json::<Vec<String>>().await?)
    }

    async fn create(&self, text: &str) -> Result<(), PromptError> {
        let response = self
            .client
            .post(self.config.endpoint("/prompts"))
            .json(&PromptBody { text })
            .send()
            .await?;
        check_status(&response)
    }

    async fn delete(&self, text: &str) -> Result<(), PromptError> {
        let response = self
            .client
            .delete(self.config.endpoint("/prompts"))
            .json(&PromptBody { text })
            .send()
            .await?;
        check_status(&response)
    }
}

pub async fn fetch_prompts(backend: &dyn PromptBackend) -> Result<Vec<String>, PromptError> {
    backend.list().await.inspect_err(|err| {
        tracing::warn!(%err, "failed to load prompts");
    })
}

pub async fn save_prompt(backend: &dyn PromptBackend, text: &str) -> Result<(), PromptError> {
    backend.create(text).await.inspect_err(|err| {
        tracing::warn!(%err, "failed to save prompt");
    })
}

/// Cached copy of the server's prompts plus the panel's open state.
///
/// Network calls never hold the cache: callers run `fetch_prompts`,
/// `save_prompt` or `PendingDeletion::send` first and then apply the result to
/// the live value, so overlapping requests each land their own change.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PromptLibrary {
    entries: Vec<PromptEntry>,
    open: bool,
}

impl PromptLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[PromptEntry] {
        &self.entries
    }

    pub fn contains(&self, text: &str) -> bool {
        self.entries.iter().any(|entry| entry.text == text)
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    /// Show or hide the library panel; returns the new state.
    pub fn toggle(&mut self) -> bool {
        self.set_open(!self.open);
        self.open
    }

    /// Refresh the cache from the server. On failure the cache is left as is.
    pub async fn load(&mut self, backend: &dyn PromptBackend) -> Result<(), PromptError> {
        let texts = fetch_prompts(backend).await?;
        self.apply_loaded(texts);
        Ok(())
    }

    pub async fn add(&mut self, backend: &dyn PromptBackend, text: &str) -> Result<(), PromptError> {
        let text = self.check_new(text)?;
        save_prompt(backend, &text).await?;
        self.apply_added(&text);
        Ok(())
    }

    /// Trimmed text ready to save, or why it can't be.
    pub fn check_new(&self, text: &str) -> Result<String, PromptError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PromptError::Empty);
        }
        if self.contains(text) {
            return Err(PromptError::Duplicate);
        }
        Ok(text.to_string())
    }

    /// Take the server's list as the new order. Entries saved while the list
    /// was in flight are kept at the end.
    pub fn apply_loaded(&mut self, texts: Vec<String>) {
        let mut entries: Vec<PromptEntry> = Vec::with_capacity(texts.len());
        for text in texts {
            if !entries.iter().any(|entry| entry.text == text) {
                entries.push(PromptEntry::new(text));
            }
        }
        for entry in self.entries.drain(..) {
            if !entries.iter().any(|kept| kept.text == entry.text) {
                entries.push(entry);
            }
        }
        self.entries = entries;
        tracing::debug!(count = self.entries.len(), "prompts loaded");
    }

    /// Record a prompt the server accepted. Returns false if it was already cached.
    pub fn apply_added(&mut self, text: &str) -> bool {
        if self.contains(text) {
            return false;
        }
        self.entries.push(PromptEntry::new(text));
        true
    }

    /// Drop a prompt the server deleted. Returns false if it wasn't cached.
    pub fn apply_removed(&mut self, text: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.text != text);
        self.entries.len() != before
    }

    /// First step of a delete; nothing changes until the returned value is confirmed.
    pub fn request_delete(&self, text: &str) -> PendingDeletion {
        PendingDeletion {
            text: text.to_string(),
        }
    }

    /// Composer text for a chosen prompt. Closes the panel.
    pub fn prompt_for_input(&mut self, text: &str) -> String {
        self.open = false;
        format!("{text} ")
    }
}

/// A delete awaiting the user's yes or no.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingDeletion {
    text: String,
}

impl PendingDeletion {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn preview(&self) -> String {
        let mut chars = self.text.chars();
        let head: String = chars.by_ref().take(DELETE_PREVIEW_CHARS).collect();
        if chars.next().is_some() {
            format!("{head}...")
        } else {
            head
        }
    }

    pub async fn confirm(
        self,
        library: &mut PromptLibrary,
        backend: &dyn PromptBackend,
    ) -> Result<(), PromptError> {
        self.send(backend).await?;
        library.apply_removed(&self.text);
        Ok(())
    }

    /// The server half of `confirm`; the caller applies the removal afterwards.
    pub async fn send(&self, backend: &dyn PromptBackend) -> Result<(), PromptError> {
        backend.delete(&self.text).await.inspect_err(|err| {
            tracing::warn!(%err, "failed to delete prompt");
        })
    }

    pub fn cancel(self) {
        tracing::debug!("prompt deletion cancelled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_long_prompts() {
        let library = PromptLibrary::new();
        let long = "x".repeat(60);
        assert_eq!(library.request_delete(&long).preview(), format!("{}...", "x".repeat(50)));
        assert_eq!(library.request_delete("short").preview(), "short");
        let exact = "é".repeat(50);
        assert_eq!(library.request_delete(&exact).preview(), exact);
    }

    #[test]
    fn load_result_keeps_entries_saved_meanwhile() {
        let mut library = PromptLibrary::new();
        assert!(library.apply_added("mine"));
        library.apply_loaded(vec!["a".into(), "mine".into(), "b".into()]);
        let texts: Vec<&str> = library.entries().iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, ["a", "mine", "b"]);

        library.apply_loaded(vec!["a".into()]);
        let texts: Vec<&str> = library.entries().iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, ["a", "mine", "b"]);
    }

    #[test]
    fn applying_is_idempotent() {
        let mut library = PromptLibrary::new();
        assert!(library.apply_added("x"));
        assert!(!library.apply_added("x"));
        assert!(library.apply_removed("x"));
        assert!(!library.apply_removed("x"));
        assert!(library.entries().is_empty());
    }

    #[test]
    fn chosen_prompt_gets_trailing_space_and_closes_panel() {
        let mut library = PromptLibrary::new();
        assert!(library.toggle());
        assert_eq!(library.prompt_for_input("Explain this"), "Explain this ");
        assert!(!library.is_open());
    }
}
