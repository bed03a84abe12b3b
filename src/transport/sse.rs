use serde::Deserialize;

use super::{END_SENTINEL, Fragment};

/// Incremental parser for `text/event-stream` bodies.
///
/// Bytes may split anywhere, including inside a UTF-8 sequence; only complete
/// lines are decoded.
#[derive(Debug, Default)]
pub struct SseParser {
    pending: Vec<u8>,
    data_acc: Option<String>,
}

impl SseParser {
    /// Feed raw bytes and drain the data payloads of every event completed by them.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let mut line = String::from_utf8_lossy(&raw[..raw.len() - 1]).into_owned();
            if line.ends_with('\r') {
                line.pop();
            }

            if line.is_empty() {
                if let Some(data) = self.data_acc.take() {
                    events.push(data);
                }
                continue;
            }

            // Comments and non-data fields (event:, id:, retry:) carry nothing we use.
            if let Some(rest) = line.strip_prefix("data:") {
                let value = rest.strip_prefix(' ').unwrap_or(rest);
                match &mut self.data_acc {
                    Some(existing) => {
                        existing.push('\n');
                        existing.push_str(value);
                    }
                    None => self.data_acc = Some(value.to_string()),
                }
            }
        }

        events
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.data_acc.is_none()
    }
}

#[derive(Deserialize)]
struct StreamPayload {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Decode one event's data into a fragment.
///
/// Returns `None` for payloads that carry nothing to show, including
/// malformed ones, which are dropped without surfacing an error.
pub fn decode_event(data: &str) -> Option<Fragment> {
    let trimmed = data.trim();
    if trimmed == END_SENTINEL {
        return Some(Fragment::End);
    }

    match serde_json::from_str::<StreamPayload>(trimmed) {
        Ok(StreamPayload {
            error: Some(message),
            ..
        }) if !message.is_empty() => Some(Fragment::Failed(message)),
        Ok(StreamPayload {
            content: Some(piece),
            ..
        }) if !piece.is_empty() => Some(Fragment::Content(piece)),
        Ok(_) => None,
        Err(err) => {
            tracing::debug!(%err, payload = trimmed, "discarding malformed stream payload");
            None
        }
    }
}
