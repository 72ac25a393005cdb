//! Completion backend seam
//!
//! The session talks to the generation service through this trait so a
//! scripted backend can stand in for the network.

use crate::errors::Result;
use crate::streaming::fragments::FragmentStream;
use crate::streaming::parser::parse_analysis;
use crate::types::{AnalysisResult, Turn, WireContent};
use async_trait::async_trait;

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Model id requests are sent to
    fn model(&self) -> &str;

    /// Open a stream for the given request contents
    ///
    /// Non-success statuses and send failures are reported here, before
    /// any fragment exists.
    async fn open(&self, contents: Vec<WireContent>) -> Result<FragmentStream>;

    /// Stream a reply to the full ordered history
    async fn stream_chat(&self, history: &[Turn]) -> Result<FragmentStream> {
        let contents = history.iter().map(Turn::to_wire).collect();
        self.open(contents).await
    }

    /// Single-turn request whose reply is parsed as an analysis record
    async fn request_once(&self, prompt: &str) -> Result<AnalysisResult> {
        let text = self
            .open(vec![WireContent::prompt(prompt)])
            .await?
            .collect_text()
            .await?;
        tracing::debug!(chars = text.len(), "analysis stream collected");
        parse_analysis(&text)
    }
}
