//! Structured analysis record returned by a one-shot analysis

use serde::{Deserialize, Deserializer, Serialize};

/// Fit assessment between a resume and a job description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// 0-100, out-of-range values are clamped on parse
    #[serde(deserialize_with = "clamped_score")]
    pub match_score: u8,

    #[serde(default)]
    pub key_matching_skills: Vec<String>,

    #[serde(default)]
    pub missing_critical_skills: Vec<String>,

    #[serde(default)]
    pub improvement_tips: Vec<String>,

    pub summary: String,
}

impl AnalysisResult {
    /// Single-line JSON used as the model turn when seeding a chat
    pub fn to_compact_json(&self) -> crate::errors::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Models occasionally emit `87.5` or `120`; keep the record usable
fn clamped_score<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    if raw.is_nan() {
        return Err(serde::de::Error::custom("matchScore is not a number"));
    }
    Ok(raw.round().clamp(0.0, 100.0) as u8)
}
