use std::collections::VecDeque;
use std::fmt::Display;

use futures::StreamExt;
use futures::stream::{LocalBoxStream, Stream};

use super::sse::{SseParser, decode_event};
use super::{CONNECTION_LOST, Fragment};

type ByteChannel = LocalBoxStream<'static, Result<Vec<u8>, String>>;

/// Lazy, single-consumer sequence of fragments read from one push channel.
///
/// The sequence ends after the first terminal fragment (`End` or `Failed`);
/// the channel is closed on that path, on [`FragmentSource::close`], and on drop.
/// A closed source never reopens.
pub struct FragmentSource {
    channel: Option<ByteChannel>,
    parser: SseParser,
    ready: VecDeque<Fragment>,
}

impl FragmentSource {
    /// Wrap an open event-stream body.
    pub fn from_byte_stream<S, B, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<B, E>> + 'static,
        B: AsRef<[u8]>,
        E: Display,
    {
        let channel = stream
            .map(|item| item.map(|bytes| bytes.as_ref().to_vec()).map_err(|e| e.to_string()))
            .boxed_local();
        Self {
            channel: Some(channel),
            parser: SseParser::default(),
            ready: VecDeque::new(),
        }
    }

    /// A source whose channel could not be opened: yields one failure, then ends.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            channel: None,
            parser: SseParser::default(),
            ready: VecDeque::from([Fragment::Failed(message.into())]),
        }
    }

    pub fn is_open(&self) -> bool {
        self.channel.is_some()
    }

    /// Cancel the subscription. Anything not yet delivered is dropped.
    pub fn close(&mut self) {
        self.ready.clear();
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.channel.take().is_some() {
            tracing::debug!("stream channel closed");
        }
    }

    /// Next fragment in arrival order, or `None` once the sequence is over.
    pub async fn next_fragment(&mut self) -> Option<Fragment> {
        loop {
            if let Some(fragment) = self.ready.pop_front() {
                return Some(fragment);
            }

            let channel = self.channel.as_mut()?;
            match channel.next().await {
                Some(Ok(bytes)) => {
                    for data in self.parser.feed(&bytes) {
                        let Some(fragment) = decode_event(&data) else {
                            continue;
                        };
                        let terminal = fragment.is_terminal();
                        self.ready.push_back(fragment);
                        if terminal {
                            self.shutdown();
                            break;
                        }
                    }
                }
                Some(Err(err)) => {
                    tracing::warn!(%err, "stream channel error");
                    self.shutdown();
                    self.ready.push_back(Fragment::Failed(CONNECTION_LOST.to_string()));
                }
                None => {
                    tracing::warn!("stream closed by server before end sentinel");
                    self.shutdown();
                    self.ready.push_back(Fragment::Failed(CONNECTION_LOST.to_string()));
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) async fn collect_all(mut self) -> Vec<Fragment> {
        let mut out = Vec::new();
        while let Some(fragment) = self.next_fragment().await {
            out.push(fragment);
        }
        out
    }
}

impl Drop for FragmentSource {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for FragmentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentSource")
            .field("open", &self.is_open())
            .field("queued", &self.ready.len())
            .finish()
    }
}
