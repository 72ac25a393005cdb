//! Multi-turn conversation over a completion backend
//!
//! History grows in exactly two ways:
//! - `bootstrap` seeds it with the analysis prompt and the model's record
//! - each `send` appends a user turn, and a model turn once the reply
//!   streams to completion
//!
//! A reply that is interrupted or cancelled leaves only the user turn
//! behind. At most one reply is in flight per session; the guard is held
//! by [`PendingReply`] and released when it is finished, cancelled, or
//! dropped.

use crate::errors::{MatchError, Result};
use crate::session::state::{SessionEvent, SessionState};
use crate::session::SessionConfig;
use crate::streaming::{CompletionBackend, FragmentStream, GeminiClient};
use crate::types::{AnalysisResult, Turn};
use futures_util::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Chat session with ordered, append-only history
pub struct ConversationSession<B = GeminiClient> {
    id: Uuid,
    config: SessionConfig,
    backend: B,
    history: Vec<Turn>,
    /// Uninitialized or Ready; Streaming is derived from `in_flight`
    state: SessionState,
    in_flight: Arc<AtomicBool>,
    last_reply_interrupted: bool,
}

impl ConversationSession<GeminiClient> {
    /// Create session against the hosted API
    pub fn new(config: SessionConfig) -> Result<Self> {
        let backend = GeminiClient::new(config.clone())?;
        Ok(Self::with_backend(config, backend))
    }
}

impl<B: CompletionBackend> ConversationSession<B> {
    /// Create session over any backend
    pub fn with_backend(config: SessionConfig, backend: B) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            backend,
            history: Vec::new(),
            state: SessionState::Uninitialized,
            in_flight: Arc::new(AtomicBool::new(false)),
            last_reply_interrupted: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Ordered turns so far
    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn turn_count(&self) -> usize {
        self.history.len()
    }

    /// Current state; Streaming while a [`PendingReply`] is alive
    pub fn state(&self) -> SessionState {
        if self.in_flight.load(Ordering::Acquire) {
            SessionState::Streaming
        } else {
            self.state
        }
    }

    /// Whether the most recent reply ended without a model turn
    pub fn last_reply_interrupted(&self) -> bool {
        self.last_reply_interrupted
    }

    /// The synthetic prompt turn, once bootstrapped
    pub fn bootstrap_prompt(&self) -> Option<&str> {
        self.history.first().map(|turn| turn.content.as_str())
    }

    /// Seed history with the analysis prompt and the model's prior record
    pub fn bootstrap(&mut self, prompt: &str, prior: &AnalysisResult) -> Result<()> {
        let next = self.state().transition(SessionEvent::Bootstrap)?;
        let prior_json = prior.to_compact_json()?;

        self.history.push(Turn::user(prompt));
        self.history.push(Turn::model(prior_json));
        self.state = next;

        tracing::info!(session = %self.id, model = %self.backend.model(), "session bootstrapped");
        Ok(())
    }

    /// Record a user message and open the reply stream
    ///
    /// Fails with `SessionBusy`, leaving history untouched, while another
    /// reply is unresolved. If the stream cannot be opened, or the returned
    /// future is dropped first, the user turn stays recorded and the
    /// session is Ready again.
    pub async fn send(&mut self, text: &str) -> Result<PendingReply> {
        self.state().transition(SessionEvent::Send)?;

        let text = text.trim();
        if text.is_empty() {
            return Err(MatchError::MissingInput("message is empty".to_string()));
        }

        self.history.push(Turn::user(text));
        // Stays set if this future is dropped before the stream opens
        self.last_reply_interrupted = true;
        let guard = BusyGuard::acquire(self.in_flight.clone());

        tracing::debug!(session = %self.id, turns = self.turn_count(), "sending message");

        match self.backend.stream_chat(&self.history).await {
            Ok(stream) => {
                self.last_reply_interrupted = false;
                Ok(PendingReply {
                    stream,
                    session_id: self.id,
                    user_turn: self.history.len() - 1,
                    _guard: guard,
                })
            }
            Err(e) => {
                tracing::warn!(session = %self.id, error = %e, "failed to open reply stream");
                Err(e)
            }
        }
    }

    /// Drain the reply and append the model turn
    ///
    /// On interruption the partial text is returned inside
    /// `StreamInterrupted` and history keeps only the user turn.
    pub async fn finish(&mut self, mut reply: PendingReply) -> Result<String> {
        self.check_owned(&reply)?;

        while let Some(fragment) = reply.stream.next().await {
            if let Err(e) = fragment {
                self.last_reply_interrupted = true;
                return Err(e);
            }
        }

        let text = reply.stream.delivered().to_string();
        if text.is_empty() {
            self.last_reply_interrupted = true;
            return Err(MatchError::EmptyResponse);
        }

        if self.history.len() != reply.user_turn + 1 {
            return Err(MatchError::InvalidTransition {
                from: format!("{:?}", self.state()),
                event: "ReplyResolved (history moved)".to_string(),
            });
        }

        self.history.push(Turn::model(text.clone()));
        tracing::debug!(session = %self.id, chars = text.len(), "reply recorded");
        Ok(text)
    }

    /// End the reply early, returning what arrived; nothing is appended
    pub fn cancel(&mut self, mut reply: PendingReply) -> Result<String> {
        self.check_owned(&reply)?;

        reply.stream.release();
        self.last_reply_interrupted = true;
        tracing::debug!(session = %self.id, "reply cancelled");
        Ok(reply.stream.delivered().to_string())
    }

    /// Send a message, passing each fragment to `on_fragment` as it arrives
    pub async fn send_and_collect<F>(&mut self, text: &str, mut on_fragment: F) -> Result<String>
    where
        F: FnMut(&str),
    {
        let mut reply = self.send(text).await?;

        while let Some(fragment) = reply.next_fragment().await {
            match fragment {
                Ok(fragment) => on_fragment(&fragment),
                Err(e) => {
                    self.last_reply_interrupted = true;
                    return Err(e);
                }
            }
        }

        self.finish(reply).await
    }

    fn check_owned(&self, reply: &PendingReply) -> Result<()> {
        if reply.session_id != self.id {
            return Err(MatchError::InvalidTransition {
                from: format!("{:?}", self.state()),
                event: "ReplyResolved (foreign reply)".to_string(),
            });
        }
        self.state().transition(SessionEvent::ReplyResolved).map(|_| ())
    }
}

/// Clears the in-flight flag on every exit path
#[derive(Debug)]
struct BusyGuard {
    flag: Arc<AtomicBool>,
}

impl BusyGuard {
    fn acquire(flag: Arc<AtomicBool>) -> Self {
        flag.store(true, Ordering::Release);
        Self { flag }
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Reply being streamed for the latest user turn
///
/// Yields fragments in arrival order. Dropping it closes the transport
/// and frees the session for the next message.
#[derive(Debug)]
pub struct PendingReply {
    stream: FragmentStream,
    session_id: Uuid,
    user_turn: usize,
    _guard: BusyGuard,
}

impl PendingReply {
    /// Next fragment, `None` at end of stream
    pub async fn next_fragment(&mut self) -> Option<Result<String>> {
        self.stream.next().await
    }

    /// Text received so far
    pub fn partial(&self) -> &str {
        self.stream.delivered()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Role, WireContent};
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures_util::stream;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    type Script = Vec<Result<Bytes>>;

    /// Backend replaying canned bodies and recording every request
    #[derive(Default)]
    struct ScriptedBackend {
        scripts: Mutex<VecDeque<Result<Script>>>,
        requests: Mutex<Vec<Vec<WireContent>>>,
    }

    impl ScriptedBackend {
        fn replying(replies: &[&str]) -> Self {
            let backend = Self::default();
            for reply in replies {
                backend.push(Ok(vec![Ok(Bytes::from(event(reply)))]));
            }
            backend
        }

        fn push(&self, script: Result<Script>) {
            self.scripts.lock().unwrap().push_back(script);
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        fn model(&self) -> &str {
            "scripted"
        }

        async fn open(&self, contents: Vec<WireContent>) -> Result<FragmentStream> {
            self.requests.lock().unwrap().push(contents);
            let script = self
                .scripts
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))?;
            Ok(FragmentStream::new(stream::iter(script)))
        }
    }

    fn event(text: &str) -> String {
        format!(
            "data: {}\n",
            serde_json::json!({"candidates":[{"content":{"parts":[{"text": text}]}}]})
        )
    }

    fn prior() -> AnalysisResult {
        AnalysisResult {
            match_score: 78,
            key_matching_skills: vec!["Rust".to_string()],
            missing_critical_skills: vec!["AWS".to_string()],
            improvement_tips: vec!["Lead with impact".to_string()],
            summary: "Good fit.".to_string(),
        }
    }

    fn session(backend: ScriptedBackend) -> ConversationSession<ScriptedBackend> {
        let mut session =
            ConversationSession::with_backend(SessionConfig::new("key", "scripted"), backend);
        session.bootstrap("ANALYZE THIS", &prior()).unwrap();
        session
    }

    #[test]
    fn test_bootstrap_seeds_two_turns() {
        let session = session(ScriptedBackend::default());
        assert_eq!(session.turn_count(), 2);
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.history()[0], Turn::user("ANALYZE THIS"));
        assert_eq!(session.history()[1].role, Role::Model);
        assert!(session.history()[1].content.contains("\"matchScore\":78"));
        assert_eq!(session.bootstrap_prompt(), Some("ANALYZE THIS"));
    }

    #[test]
    fn test_double_bootstrap_rejected() {
        let mut session = session(ScriptedBackend::default());
        let err = session.bootstrap("again", &prior()).unwrap_err();
        assert!(matches!(err, MatchError::InvalidTransition { .. }));
        assert_eq!(session.turn_count(), 2);
    }

    #[tokio::test]
    async fn test_send_before_bootstrap_rejected() {
        let mut session = ConversationSession::with_backend(
            SessionConfig::new("key", "scripted"),
            ScriptedBackend::replying(&["hi"]),
        );
        let err = session.send("hello").await.unwrap_err();
        assert!(matches!(err, MatchError::InvalidTransition { .. }));
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_sequential_sends_append_in_order() {
        let mut session = session(ScriptedBackend::replying(&["r1", "r2"]));

        assert_eq!(session.send_and_collect("a", |_| {}).await.unwrap(), "r1");
        assert_eq!(session.send_and_collect("b", |_| {}).await.unwrap(), "r2");

        assert_eq!(
            &session.history()[2..],
            &[
                Turn::user("a"),
                Turn::model("r1"),
                Turn::user("b"),
                Turn::model("r2"),
            ]
        );
    }

    #[tokio::test]
    async fn test_full_history_is_sent() {
        let mut session = session(ScriptedBackend::replying(&["r1", "r2"]));
        session.send_and_collect("a", |_| {}).await.unwrap();
        session.send_and_collect("b", |_| {}).await.unwrap();

        let requests = session.backend().requests.lock().unwrap();
        assert_eq!(requests[0].len(), 3);
        assert_eq!(requests[1].len(), 5);
        assert_eq!(requests[1][4].parts[0].text, "b");
        assert_eq!(requests[1][1].role, Some(Role::Model));
    }

    #[tokio::test]
    async fn test_send_while_streaming_is_busy() {
        let mut session = session(ScriptedBackend::replying(&["first", "second"]));

        let reply = session.send("a").await.unwrap();
        assert_eq!(session.state(), SessionState::Streaming);
        let before = session.history().to_vec();

        let err = session.send("b").await.unwrap_err();
        assert!(matches!(err, MatchError::SessionBusy));
        assert_eq!(session.history(), before.as_slice());

        assert_eq!(session.finish(reply).await.unwrap(), "first");
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.turn_count(), 4);
    }

    #[tokio::test]
    async fn test_interrupted_reply_keeps_partial_and_user_turn() {
        let backend = ScriptedBackend::default();
        backend.push(Ok(vec![
            Ok(Bytes::from(event("Hel"))),
            Ok(Bytes::from(event("lo"))),
            Err(MatchError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "body closed early",
            ))),
        ]));
        let mut session = session(backend);

        let mut seen = Vec::new();
        let err = session
            .send_and_collect("a", |f| seen.push(f.to_string()))
            .await
            .unwrap_err();

        assert_eq!(seen, vec!["Hel", "lo"]);
        match err {
            MatchError::StreamInterrupted { partial, .. } => assert_eq!(partial, "Hello"),
            other => panic!("expected StreamInterrupted, got {:?}", other),
        }
        assert_eq!(session.turn_count(), 3);
        assert_eq!(session.history().last(), Some(&Turn::user("a")));
        assert_eq!(session.state(), SessionState::Ready);
        assert!(session.last_reply_interrupted());
    }

    #[tokio::test]
    async fn test_open_failure_keeps_user_turn() {
        let backend = ScriptedBackend::default();
        backend.push(Err(MatchError::InvalidCredentials("bad key".to_string())));
        let mut session = session(backend);

        let err = session.send("a").await.unwrap_err();
        assert!(matches!(err, MatchError::InvalidCredentials(_)));
        assert_eq!(session.turn_count(), 3);
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_cancel_returns_partial() {
        let backend = ScriptedBackend::default();
        backend.push(Ok(vec![
            Ok(Bytes::from(event("one "))),
            Ok(Bytes::from(event("two"))),
        ]));
        let mut session = session(backend);

        let mut reply = session.send("a").await.unwrap();
        assert_eq!(reply.next_fragment().await.unwrap().unwrap(), "one ");
        assert_eq!(reply.partial(), "one ");
        let partial = session.cancel(reply).unwrap();

        assert_eq!(partial, "one ");
        assert_eq!(session.turn_count(), 3);
        assert_eq!(session.state(), SessionState::Ready);
        assert!(session.last_reply_interrupted());
    }

    #[tokio::test]
    async fn test_cancel_rejects_reply_from_other_session() {
        let mut owner = session(ScriptedBackend::replying(&["theirs"]));
        let mut other = session(ScriptedBackend::replying(&["ours"]));

        let reply = owner.send("a").await.unwrap();
        let err = other.cancel(reply).unwrap_err();

        assert!(matches!(err, MatchError::InvalidTransition { .. }));
        assert!(!other.last_reply_interrupted());
        assert_eq!(other.turn_count(), 2);
        assert_eq!(owner.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_dropped_reply_frees_session() {
        let mut session = session(ScriptedBackend::replying(&["ignored", "kept"]));

        drop(session.send("a").await.unwrap());
        assert_eq!(session.state(), SessionState::Ready);

        assert_eq!(session.send_and_collect("b", |_| {}).await.unwrap(), "kept");
        assert_eq!(session.history().last(), Some(&Turn::model("kept")));
    }

    /// Backend whose stream never opens
    struct StalledBackend;

    #[async_trait]
    impl CompletionBackend for StalledBackend {
        fn model(&self) -> &str {
            "stalled"
        }

        async fn open(&self, _contents: Vec<WireContent>) -> Result<FragmentStream> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_abandoned_send_frees_session() {
        let mut session =
            ConversationSession::with_backend(SessionConfig::new("key", "stalled"), StalledBackend);
        session.bootstrap("ANALYZE THIS", &prior()).unwrap();

        let attempt =
            tokio::time::timeout(std::time::Duration::from_millis(20), session.send("a")).await;
        assert!(attempt.is_err());

        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.history().last(), Some(&Turn::user("a")));
        assert!(session.last_reply_interrupted());
    }

    #[tokio::test]
    async fn test_empty_reply_not_recorded() {
        let mut session = session(ScriptedBackend::default());
        let err = session.send_and_collect("a", |_| {}).await.unwrap_err();
        assert!(matches!(err, MatchError::EmptyResponse));
        assert_eq!(session.turn_count(), 3);
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let mut session = session(ScriptedBackend::replying(&["x"]));
        let err = session.send("   ").await.unwrap_err();
        assert!(matches!(err, MatchError::MissingInput(_)));
        assert_eq!(session.turn_count(), 2);
    }
}
