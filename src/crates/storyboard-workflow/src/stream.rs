//! Streaming generation adapter
//!
//! Consumes the fragment stream of a streaming generation call and reduces
//! it to exactly one [`StreamOutcome`]:
//!
//! - [`StreamOutcome::Complete`] - done sentinel seen, or the stream simply ended
//! - [`StreamOutcome::Error`] - the transport failed
//! - [`StreamOutcome::Cancelled`] - the caller's [`CancellationToken`] fired
//!
//! Malformed individual fragments are skipped. Accumulated text is pushed to
//! an optional progress callback after every fragment.
//!
//! ```rust,ignore
//! let cancel = CancellationToken::new();
//! let outcome = StreamConsumer::new(cancel.clone())
//!     .on_progress(|text| println!("{} chars so far", text.len()))
//!     .consume(stream)
//!     .await;
//! ```

use futures::stream::Stream;
use futures::StreamExt;
use std::pin::Pin;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// One item from a streaming generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFragment {
    Text(String),
    /// Explicit end-of-stream sentinel
    Done,
}

/// Problems with individual fragments
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FragmentError {
    /// The fragment could not be parsed; consumption continues
    #[error("Malformed fragment: {0}")]
    Parse(String),

    /// The underlying transport failed; consumption stops
    #[error("Stream transport failed: {0}")]
    Transport(String),
}

pub type FragmentStream =
    Pin<Box<dyn Stream<Item = std::result::Result<StreamFragment, FragmentError>> + Send>>;

/// Terminal result of consuming a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    Complete(String),
    Error(String),
    Cancelled,
}

impl StreamOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, StreamOutcome::Complete(_))
    }
}

/// Accumulates streamed text
#[derive(Debug, Clone, Default)]
pub struct TokenBuffer {
    buffer: String,
    chunk_count: usize,
    skipped: usize,
    finished: bool,
}

impl TokenBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_chunk(&mut self, chunk: &str) {
        self.buffer.push_str(chunk);
        self.chunk_count += 1;
    }

    pub fn skip(&mut self) {
        self.skipped += 1;
    }

    pub fn finish(&mut self) {
        self.finished = true;
    }

    pub fn content(&self) -> &str {
        &self.buffer
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Number of malformed fragments that were skipped
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn into_string(self) -> String {
        self.buffer
    }
}

type ProgressFn = Box<dyn FnMut(&str) + Send>;

/// Cancellable consumer of a [`FragmentStream`]
pub struct StreamConsumer {
    cancel: CancellationToken,
    on_progress: Option<ProgressFn>,
}

impl StreamConsumer {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            on_progress: None,
        }
    }

    /// Receive the accumulated text after every accepted fragment
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.on_progress = Some(Box::new(callback));
        self
    }

    /// Drive the stream to a terminal outcome
    pub async fn consume(mut self, mut stream: FragmentStream) -> StreamOutcome {
        let mut buffer = TokenBuffer::new();

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!(chunks = buffer.chunk_count(), "Stream cancelled");
                    return StreamOutcome::Cancelled;
                }
                item = stream.next() => item,
            };

            match next {
                Some(Ok(StreamFragment::Text(text))) => {
                    buffer.add_chunk(&text);
                    if let Some(callback) = self.on_progress.as_mut() {
                        callback(buffer.content());
                    }
                }
                Some(Ok(StreamFragment::Done)) | None => {
                    buffer.finish();
                    debug!(
                        chunks = buffer.chunk_count(),
                        skipped = buffer.skipped(),
                        "Stream complete"
                    );
                    return StreamOutcome::Complete(buffer.into_string());
                }
                Some(Err(FragmentError::Parse(reason))) => {
                    warn!(reason = %reason, "Skipping malformed stream fragment");
                    buffer.skip();
                }
                Some(Err(FragmentError::Transport(reason))) => {
                    warn!(reason = %reason, "Stream transport failed");
                    return StreamOutcome::Error(reason);
                }
            }
        }
    }
}
