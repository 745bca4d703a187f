//! Server-sent event decoding, independent of any provider
//!
//! Framing is handled by `eventsource-stream`; this module adds typed
//! payload decoding, the `[DONE]` sentinel and detection of a source that
//! closes in the middle of an event.

use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::Poll;

use eventsource_stream::{EventStreamError, Eventsource};
use futures_util::stream::{self, BoxStream};
use futures_util::{Stream, StreamExt};
use serde::de::DeserializeOwned;

use crate::error::LlmError;

/// Data payload that ends an OpenAI-style stream
const DONE_SENTINEL: &str = "[DONE]";

/// Decode an SSE byte stream into typed payloads
///
/// Yields one item per non-empty `data` event, in order, and ends on the
/// `[DONE]` sentinel or when the source closes on an event boundary. A
/// transport failure, an undecodable payload, or a source that closes
/// mid-event produces exactly one `Err` after the well-formed prefix.
pub fn decode_events<T, S, B, E>(provider: &str, source: S) -> BoxStream<'static, Result<T, LlmError>>
where
    T: DeserializeOwned + Send + 'static,
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let boundary = Arc::new(BoundaryState::default());

    let mut tracker = BoundaryTracker::default();
    let feed = Arc::clone(&boundary);
    let tracked = source.map(move |chunk| {
        if let Ok(bytes) = &chunk {
            tracker.feed(bytes.as_ref());
            feed.mid_event.store(tracker.is_mid_event(), Ordering::Release);
        }
        chunk
    });

    let closed = Arc::clone(&boundary);
    let end_marker = stream::poll_fn(move |_| {
        closed.source_closed.store(true, Ordering::Release);
        Poll::Ready(None)
    });

    let decoder = Decoder {
        events: tracked.chain(end_marker).eventsource().boxed(),
        boundary,
        provider: provider.to_owned(),
        _payload: PhantomData,
    };

    stream::unfold(Some(decoder), |decoder| async move {
        let mut decoder = decoder?;
        let item = decoder.next_item().await?;
        let next = item.is_ok().then_some(decoder);
        Some((item, next))
    })
    .boxed()
}

type EventResult<E> = Result<eventsource_stream::Event, EventStreamError<E>>;

struct Decoder<T, E> {
    events: BoxStream<'static, EventResult<E>>,
    boundary: Arc<BoundaryState>,
    provider: String,
    _payload: PhantomData<fn() -> T>,
}

impl<T, E> Decoder<T, E>
where
    T: DeserializeOwned,
    E: std::fmt::Display,
{
    /// Next payload, or `None` when the stream ended cleanly
    async fn next_item(&mut self) -> Option<Result<T, LlmError>> {
        loop {
            let Some(event) = self.events.next().await else {
                return self.boundary.is_truncated().then(|| Err(self.truncated()));
            };

            let event = match event {
                Ok(event) => event,
                Err(EventStreamError::Transport(e)) => {
                    tracing::error!(provider = %self.provider, error = %e, "event stream transport failed");
                    return Some(Err(LlmError::transport(&self.provider, e)));
                }
                Err(e) => return Some(Err(LlmError::decode(&self.provider, e))),
            };

            // an event flushed after the source closed without a blank line is partial
            if self.boundary.is_truncated() {
                return Some(Err(self.truncated()));
            }

            let data = event.data.trim();
            if data.is_empty() {
                continue;
            }
            if data == DONE_SENTINEL {
                return None;
            }

            return Some(serde_json::from_str::<T>(data).map_err(|e| {
                tracing::debug!(provider = %self.provider, error = %e, data = %data, "undecodable stream event");
                LlmError::decode(&self.provider, e)
            }));
        }
    }

    fn truncated(&self) -> LlmError {
        tracing::warn!(provider = %self.provider, "event stream closed mid-event");
        LlmError::decode(&self.provider, "event stream closed in the middle of an event")
    }
}

#[derive(Default)]
struct BoundaryState {
    mid_event: AtomicBool,
    source_closed: AtomicBool,
}

impl BoundaryState {
    fn is_truncated(&self) -> bool {
        self.source_closed.load(Ordering::Acquire) && self.mid_event.load(Ordering::Acquire)
    }
}

/// Line-level scanner that knows whether the bytes seen so far end on an
/// event boundary (a blank line)
#[derive(Default)]
struct BoundaryTracker {
    line_has_content: bool,
    event_pending: bool,
    after_cr: bool,
}

impl BoundaryTracker {
    fn feed(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            match byte {
                b'\n' if self.after_cr => self.after_cr = false,
                b'\n' => self.end_line(),
                b'\r' => {
                    self.end_line();
                    self.after_cr = true;
                }
                _ => {
                    self.after_cr = false;
                    self.line_has_content = true;
                }
            }
        }
    }

    fn end_line(&mut self) {
        self.event_pending = self.line_has_content;
        self.line_has_content = false;
    }

    const fn is_mid_event(&self) -> bool {
        self.event_pending || self.line_has_content
    }
}
