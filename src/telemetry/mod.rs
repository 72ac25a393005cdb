//! Telemetry for streaming exchanges
//!
//! Collects stream lifecycle events so the chat front-end can report how
//! much text arrived and how many replies were cut short.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Interruption reasons kept for the summary
pub const MAX_RECENT_INTERRUPTIONS: usize = 5;

/// Telemetry event types
#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    /// Request accepted and the response body is streaming
    StreamOpened { model: String },
    /// First text fragment of a stream
    FirstFragment { latency_ms: u64 },
    FragmentReceived { chars: usize },
    StreamCompleted {
        total_chars: usize,
        duration_ms: u64,
    },
    StreamInterrupted {
        partial_chars: usize,
        reason: String,
    },
}

/// Aggregated statistics
#[derive(Debug, Clone, Default)]
pub struct StreamStats {
    pub streams_opened: usize,
    pub streams_completed: usize,
    pub streams_interrupted: usize,
    pub fragments_received: usize,
    pub chars_received: usize,
    /// Latency of the most recent first fragment
    pub last_first_fragment_ms: Option<u64>,
    /// Duration of the most recent completed stream
    pub last_reply_ms: Option<u64>,
}

/// Telemetry collector, cheap to clone and shareable with streams
///
/// Events are folded into [`StreamStats`] as they arrive; only the last
/// few interruption reasons are retained.
#[derive(Debug, Clone)]
pub struct TelemetryCollector {
    stats: Arc<Mutex<StreamStats>>,
    interruptions: Arc<Mutex<VecDeque<String>>>,
    start_time: Instant,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl TelemetryCollector {
    /// Create a new telemetry collector
    pub fn new() -> Self {
        Self {
            stats: Arc::new(Mutex::new(StreamStats::default())),
            interruptions: Arc::new(Mutex::new(VecDeque::with_capacity(MAX_RECENT_INTERRUPTIONS))),
            start_time: Instant::now(),
        }
    }

    /// Record an event
    pub fn record(&self, event: TelemetryEvent) {
        let mut stats = lock(&self.stats);
        match event {
            TelemetryEvent::StreamOpened { model } => {
                stats.streams_opened += 1;
                tracing::trace!(%model, "stream opened");
            }
            TelemetryEvent::FirstFragment { latency_ms, .. } => {
                stats.last_first_fragment_ms = Some(latency_ms);
            }
            TelemetryEvent::FragmentReceived { chars, .. } => {
                stats.fragments_received += 1;
                stats.chars_received += chars;
            }
            TelemetryEvent::StreamCompleted { total_chars, duration_ms } => {
                stats.streams_completed += 1;
                stats.last_reply_ms = Some(duration_ms);
                tracing::trace!(total_chars, duration_ms, "stream completed");
            }
            TelemetryEvent::StreamInterrupted { partial_chars, reason } => {
                stats.streams_interrupted += 1;
                tracing::trace!(partial_chars, %reason, "stream interrupted");
                drop(stats);

                let mut recent = lock(&self.interruptions);
                if recent.len() == MAX_RECENT_INTERRUPTIONS {
                    recent.pop_front();
                }
                recent.push_back(reason);
            }
        }
    }

    /// Get current statistics
    pub fn get_stats(&self) -> StreamStats {
        lock(&self.stats).clone()
    }

    /// Get elapsed time since start
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Most recent interruption reasons, oldest first
    pub fn recent_interruptions(&self) -> Vec<String> {
        lock(&self.interruptions).iter().cloned().collect()
    }

    /// Share of finished streams that ran to completion
    pub fn completion_rate(&self) -> f64 {
        let stats = lock(&self.stats);
        let total = stats.streams_completed + stats.streams_interrupted;
        if total == 0 {
            1.0
        } else {
            stats.streams_completed as f64 / total as f64
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Simple telemetry display
pub struct TelemetryDisplay {
    collector: TelemetryCollector,
}

impl TelemetryDisplay {
    pub fn new(collector: TelemetryCollector) -> Self {
        Self { collector }
    }

    /// Display summary statistics
    pub fn display_summary(&self) {
        let stats = self.collector.get_stats();
        let elapsed = self.collector.elapsed();

        println!("\nSession Summary");
        println!("─────────────────────────────────────");
        println!("Duration:          {:.1}s", elapsed.as_secs_f64());
        println!("Replies streamed:  {}", stats.streams_opened);
        println!("Fragments:         {}", stats.fragments_received);
        println!("Characters:        {}", stats.chars_received);
        println!("Interrupted:       {}", stats.streams_interrupted);
        println!("Completion rate:   {:.1}%", self.collector.completion_rate() * 100.0);
        if let Some(ms) = stats.last_first_fragment_ms {
            println!("First fragment:    {}ms (last reply)", ms);
        }
        if let Some(ms) = stats.last_reply_ms {
            println!("Reply time:        {}ms (last reply)", ms);
        }
        for reason in self.collector.recent_interruptions() {
            println!("  cut short: {}", reason);
        }
        println!();
    }
}
