//! Analysis prompt contract
//!
//! The prompt embeds both source texts, each cut to [`MAX_SOURCE_CHARS`]
//! characters, and asks for a bare JSON object. The reply parser tolerates
//! fences and prose anyway, so the instruction is a preference rather than
//! a guarantee.

use crate::errors::{MatchError, Result};
use crate::streaming::CompletionBackend;
use crate::types::AnalysisResult;

/// Character budget per embedded source text
pub const MAX_SOURCE_CHARS: usize = 30_000;

/// First assistant line shown when a chat opens
pub const WELCOME_MESSAGE: &str = "I've analyzed your fit for this role. What would you like to know? \
I can help rewrite sections, explain gaps, or prepare for interviews.";

/// Prefix of `text` holding at most `max` characters
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Build the one-shot analysis prompt
///
/// Chat sessions rebuild the same prompt for their bootstrap turn, so the
/// output depends only on the two inputs.
pub fn build_analysis_prompt(resume: &str, job_description: &str) -> String {
    format!(
        r#"Role: You are an expert applicant tracking system (ATS) and career coach.

Task: Evaluate how well the candidate's RESUME fits the JOB DESCRIPTION.

RESUME:
"{resume}"

JOB DESCRIPTION:
"{job}"

Output format: JSON only, exactly this shape:
{{
    "matchScore": number (0-100),
    "keyMatchingSkills": ["skill1", "skill2"],
    "missingCriticalSkills": ["skill1", "skill2"],
    "improvementTips": ["tip1", "tip2", "tip3"],
    "summary": "1-2 sentence verdict."
}}
Do not wrap the JSON in markdown code fences. Return the raw JSON object and nothing else."#,
        resume = truncate_chars(resume, MAX_SOURCE_CHARS),
        job = truncate_chars(job_description, MAX_SOURCE_CHARS),
    )
}

/// Run a one-shot analysis
///
/// Any failure aborts the analysis; there is no partial record.
pub async fn analyze<B>(backend: &B, resume: &str, job_description: &str) -> Result<AnalysisResult>
where
    B: CompletionBackend + ?Sized,
{
    if resume.trim().is_empty() {
        return Err(MatchError::MissingInput("resume content is missing".to_string()));
    }

    let prompt = build_analysis_prompt(resume, job_description);
    tracing::info!(
        model = %backend.model(),
        resume_chars = resume.chars().count(),
        job_chars = job_description.chars().count(),
        "running analysis"
    );

    let result = backend.request_once(&prompt).await?;
    tracing::info!(score = result.match_score, "analysis complete");
    Ok(result)
}
