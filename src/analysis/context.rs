//! Persisted analysis context
//!
//! The last analysis (both source texts and the record) is written to the
//! state directory so `chat` can start without re-running it.

use crate::analysis::prompt::build_analysis_prompt;
use crate::errors::{MatchError, Result};
use crate::session::ConversationSession;
use crate::streaming::CompletionBackend;
use crate::types::AnalysisResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name inside the state directory
pub const CONTEXT_FILE_NAME: &str = "last_analysis.json";

/// Inputs and outcome of one analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatContext {
    pub resume_text: String,
    pub job_description: String,
    pub analysis: AnalysisResult,
    pub model_id: String,
    pub analyzed_at: DateTime<Utc>,
}

impl ChatContext {
    pub fn new(
        resume_text: impl Into<String>,
        job_description: impl Into<String>,
        analysis: AnalysisResult,
        model_id: impl Into<String>,
    ) -> Self {
        Self {
            resume_text: resume_text.into(),
            job_description: job_description.into(),
            analysis,
            model_id: model_id.into(),
            analyzed_at: Utc::now(),
        }
    }

    /// Default location under a state directory
    pub fn path_in(state_dir: &Path) -> PathBuf {
        state_dir.join(CONTEXT_FILE_NAME)
    }

    /// Prompt that produced this analysis
    pub fn prompt(&self) -> String {
        build_analysis_prompt(&self.resume_text, &self.job_description)
    }

    /// Seed a fresh session with this analysis exchange
    pub fn bootstrap_session<B: CompletionBackend>(
        &self,
        session: &mut ConversationSession<B>,
    ) -> Result<()> {
        session.bootstrap(&self.prompt(), &self.analysis)
    }

    /// Save context to disk
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;

        tracing::debug!(path = %path.display(), "analysis context saved");
        Ok(())
    }

    /// Load context from disk
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(MatchError::MissingInput(format!(
                "no saved analysis at {}; run `jobmatch analyze` first",
                path.display()
            )));
        }

        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> ChatContext {
        ChatContext::new(
            "Backend engineer",
            "Platform team",
            AnalysisResult {
                match_score: 64,
                key_matching_skills: vec!["SQL".to_string()],
                missing_critical_skills: vec![],
                improvement_tips: vec![],
                summary: "Decent.".to_string(),
            },
            "gemini-1.5-pro",
        )
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = ChatContext::path_in(&dir.path().join("state"));
        let context = sample();

        context.save(&path).unwrap();
        let loaded = ChatContext::load(&path).unwrap();

        assert_eq!(loaded, context);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = ChatContext::load(&ChatContext::path_in(dir.path())).unwrap_err();
        assert!(matches!(err, MatchError::MissingInput(_)));
    }

    #[test]
    fn test_load_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = ChatContext::path_in(dir.path());
        fs::write(&path, "{not json").unwrap();

        let err = ChatContext::load(&path).unwrap_err();
        assert!(matches!(err, MatchError::Serialization(_)));
    }

    #[test]
    fn test_prompt_matches_analysis_prompt() {
        let context = sample();
        assert_eq!(
            context.prompt(),
            build_analysis_prompt("Backend engineer", "Platform team")
        );
    }
}
