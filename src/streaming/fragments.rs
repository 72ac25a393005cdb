//! Lazy, single-pass sequence of text fragments
//!
//! [`FragmentStream`] owns the response body. Fragments come out strictly
//! in arrival order. Dropping the stream (or calling [`FragmentStream::release`])
//! closes the transport, so a consumer that stops early or races the
//! stream against a cancellation signal never leaks the connection.

use crate::errors::{MatchError, Result};
use crate::streaming::parser::SseLineParser;
use crate::telemetry::{TelemetryCollector, TelemetryEvent};
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

/// Boxed transport body
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Text fragments decoded from an event-stream body
pub struct FragmentStream {
    /// `None` once the body ended, failed, or was released
    body: Option<ByteStream>,
    parser: SseLineParser,
    pending: VecDeque<String>,
    delivered: String,
    opened_at: Instant,
    telemetry: Option<TelemetryCollector>,
}

impl FragmentStream {
    /// Wrap any chunked byte stream
    pub fn new<S>(body: S) -> Self
    where
        S: Stream<Item = Result<Bytes>> + Send + 'static,
    {
        Self {
            body: Some(Box::pin(body)),
            parser: SseLineParser::new(),
            pending: VecDeque::new(),
            delivered: String::new(),
            opened_at: Instant::now(),
            telemetry: None,
        }
    }

    /// Stream the body of an accepted HTTP response
    pub fn from_response(response: reqwest::Response) -> Self {
        Self::new(response.bytes_stream().map(|chunk| chunk.map_err(MatchError::Http)))
    }

    /// Report fragment and lifecycle events to a collector
    pub fn with_telemetry(mut self, telemetry: TelemetryCollector) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Concatenation of every fragment yielded so far
    pub fn delivered(&self) -> &str {
        &self.delivered
    }

    /// Close the transport now; the stream yields nothing afterwards
    pub fn release(&mut self) {
        if self.body.take().is_some() {
            tracing::debug!(delivered = self.delivered.len(), "fragment stream released early");
        }
        self.pending.clear();
    }

    /// Drive the stream to its end and return the full text
    pub async fn collect_text(mut self) -> Result<String> {
        while let Some(fragment) = self.next().await {
            fragment?;
        }
        Ok(std::mem::take(&mut self.delivered))
    }

    fn emit(&self, event: TelemetryEvent) {
        if let Some(telemetry) = &self.telemetry {
            telemetry.record(event);
        }
    }

    fn deliver(&mut self, fragment: String) -> String {
        if self.delivered.is_empty() {
            self.emit(TelemetryEvent::FirstFragment {
                latency_ms: self.opened_at.elapsed().as_millis() as u64,
            });
        }
        self.emit(TelemetryEvent::FragmentReceived {
            chars: fragment.chars().count(),
        });
        self.delivered.push_str(&fragment);
        fragment
    }
}

impl Stream for FragmentStream {
    type Item = Result<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(fragment) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(this.deliver(fragment))));
            }

            let Some(body) = this.body.as_mut() else {
                return Poll::Ready(None);
            };

            match body.as_mut().poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(chunk))) => {
                    let fragments = this.parser.add_bytes(&chunk);
                    this.pending.extend(fragments);
                }
                Poll::Ready(Some(Err(e))) => {
                    this.body = None;
                    let reason = e.to_string();
                    tracing::warn!(
                        partial_chars = this.delivered.chars().count(),
                        error = %reason,
                        "stream interrupted"
                    );
                    this.emit(TelemetryEvent::StreamInterrupted {
                        partial_chars: this.delivered.chars().count(),
                        reason: reason.clone(),
                    });
                    return Poll::Ready(Some(Err(MatchError::StreamInterrupted {
                        partial: this.delivered.clone(),
                        reason,
                    })));
                }
                Poll::Ready(None) => {
                    this.body = None;
                    if let Some(fragment) = this.parser.finish() {
                        this.pending.push_back(fragment);
                    }
                    let total_chars = this.delivered.chars().count()
                        + this.pending.iter().map(|f| f.chars().count()).sum::<usize>();
                    tracing::debug!(total_chars, "stream completed");
                    this.emit(TelemetryEvent::StreamCompleted {
                        total_chars,
                        duration_ms: this.opened_at.elapsed().as_millis() as u64,
                    });
                }
            }
        }
    }
}

impl std::fmt::Debug for FragmentStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentStream")
            .field("open", &self.body.is_some())
            .field("pending", &self.pending.len())
            .field("delivered_chars", &self.delivered.chars().count())
            .finish()
    }
}
