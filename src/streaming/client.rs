//! Generative-language API streaming client
//!
//! Provides incremental text delivery from the hosted generation service:
//! - HTTPS POST to `{endpoint}?alt=sse&key={apiKey}`
//! - Body: `{"contents": [{"role", "parts": [{"text"}]}]}`
//! - Response: server-sent events, one text delta per `data:` line
//!
//! Only a connect timeout is configured. A stalled upstream suspends the
//! caller until it resumes or the caller drops the stream.

use crate::errors::{MatchError, Result};
use crate::streaming::backend::CompletionBackend;
use crate::streaming::fragments::FragmentStream;
use crate::telemetry::{TelemetryCollector, TelemetryEvent};
use crate::types::WireContent;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default streaming endpoint; `{MODEL}` is replaced by the model id
pub const DEFAULT_ENDPOINT_TEMPLATE: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/{MODEL}:streamGenerateContent";

/// Default model
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";

/// Placeholder substituted in the endpoint template
pub const MODEL_PLACEHOLDER: &str = "{MODEL}";

/// Connection establishment timeout (no overall request timeout)
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Credentials, model and endpoint for one client or session
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_key: String,
    pub model_id: String,
    pub endpoint_template: String,
}

impl ClientConfig {
    /// Configuration against the default endpoint
    pub fn new(api_key: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model_id: model_id.into(),
            endpoint_template: DEFAULT_ENDPOINT_TEMPLATE.to_string(),
        }
    }

    pub fn with_endpoint_template(mut self, template: impl Into<String>) -> Self {
        self.endpoint_template = template.into();
        self
    }

    /// Streaming endpoint for the configured model
    pub fn endpoint(&self) -> String {
        self.endpoint_template.replace(MODEL_PLACEHOLDER, &self.model_id)
    }

    /// Model listing URL, derived from the endpoint template
    pub fn models_url(&self) -> String {
        let marker = format!("/{}", MODEL_PLACEHOLDER);
        match self.endpoint_template.find(&marker) {
            Some(pos) => self.endpoint_template[..pos].to_string(),
            None => DEFAULT_ENDPOINT_TEMPLATE
                .split(&marker)
                .next()
                .unwrap_or_default()
                .to_string(),
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("model_id", &self.model_id)
            .field("endpoint_template", &self.endpoint_template)
            .finish()
    }
}

/// Streaming client for the hosted generation API
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    config: ClientConfig,
    telemetry: Option<TelemetryCollector>,
}

impl GeminiClient {
    /// Create client; fails fast on an empty key
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(MatchError::MissingInput("API key is missing".to_string()));
        }

        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(MatchError::Http)?;

        Ok(Self {
            http,
            config,
            telemetry: None,
        })
    }

    /// Record stream events to a collector
    pub fn with_telemetry(mut self, telemetry: TelemetryCollector) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Get current configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// List models usable for text generation
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = self.config.models_url();
        tracing::debug!(%url, "listing models");

        let response = self
            .http
            .get(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .send()
            .await?;
        let response = error_for_status(response).await?;

        let listing: ModelsResponse = response
            .json()
            .await
            .map_err(|e| MatchError::MalformedPayload(format!("Failed to parse models: {}", e)))?;

        Ok(select_generation_models(listing.models))
    }
}

#[async_trait]
impl CompletionBackend for GeminiClient {
    fn model(&self) -> &str {
        &self.config.model_id
    }

    async fn open(&self, contents: Vec<WireContent>) -> Result<FragmentStream> {
        let url = self.config.endpoint();
        tracing::info!(model = %self.config.model_id, turns = contents.len(), "opening stream");

        let response = self
            .http
            .post(&url)
            .query(&[("alt", "sse"), ("key", self.config.api_key.as_str())])
            .json(&GenerateRequest { contents })
            .send()
            .await?;
        let response = error_for_status(response).await?;

        let stream = FragmentStream::from_response(response);
        Ok(match &self.telemetry {
            Some(telemetry) => {
                telemetry.record(TelemetryEvent::StreamOpened {
                    model: self.config.model_id.clone(),
                });
                stream.with_telemetry(telemetry.clone())
            }
            None => stream,
        })
    }
}

/// Turn a non-success response into the matching error
async fn error_for_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorEnvelope>(&body)
        .ok()
        .map(|envelope| envelope.error)
        .unwrap_or_default();

    let err = classify_status(status.as_u16(), detail);
    tracing::warn!(status = status.as_u16(), error = %err, "request rejected");
    Err(err)
}

/// Map an HTTP status and error body to the error taxonomy
pub(crate) fn classify_status(status: u16, detail: ErrorDetail) -> MatchError {
    let message = detail
        .message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("API Error: {}", status));

    let auth_status = matches!(
        detail.status.as_deref(),
        Some("UNAUTHENTICATED") | Some("PERMISSION_DENIED")
    );
    // The hosted API answers 400 for a key it does not recognize
    let bad_key = status == 400 && message.to_lowercase().contains("api key");

    if status == 401 || status == 403 || auth_status || bad_key {
        MatchError::InvalidCredentials(message)
    } else {
        MatchError::UpstreamError { status, message }
    }
}

/// Keep generation-capable gemini models, newest names first
pub(crate) fn select_generation_models(models: Vec<RawModel>) -> Vec<ModelInfo> {
    let mut selected: Vec<ModelInfo> = models
        .into_iter()
        .filter(|m| {
            m.name.contains("gemini")
                && m.supported_generation_methods
                    .iter()
                    .any(|method| method == "generateContent")
        })
        .map(|m| {
            let name = m.name.trim_start_matches("models/").to_string();
            ModelInfo {
                display_name: m.display_name.unwrap_or_else(|| name.clone()),
                name,
            }
        })
        .collect();

    selected.sort_by(|a, b| b.name.cmp(&a.name));
    selected
}

/// Generation request body
#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<WireContent>,
}

/// Error body returned by the API
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorDetail {
    pub message: Option<String>,
    pub status: Option<String>,
}

/// Models list response
#[derive(Debug, Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    models: Vec<RawModel>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawModel {
    pub name: String,
    pub display_name: Option<String>,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

/// Model available for selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Id without the `models/` prefix, e.g. `gemini-1.5-pro`
    pub name: String,
    pub display_name: String,
}
