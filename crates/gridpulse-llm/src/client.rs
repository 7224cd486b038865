// Gemini streaming client using reqwest-eventsource.
//
// Calls `models/{model}:streamGenerateContent?alt=sse` and concatenates the
// text parts of every streamed chunk into one response string. Callers see a
// single `generate` call through the `GenerativeModel` trait.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest_eventsource::{Event, RequestBuilderExt};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use gridpulse_core::config::{Config, LlmConfig};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM not configured")]
    Disabled,

    #[error("API returned status {0}")]
    Status(u16),

    #[error("network error: {0}")]
    Transport(String),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("prompt blocked: {0}")]
    Blocked(String),

    #[error("model returned no text")]
    EmptyResponse,
}

// ---------------------------------------------------------------------------
// Request and trait
// ---------------------------------------------------------------------------

/// One generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// Attach the web-search grounding tool.
    pub grounding: bool,
}

impl GenerationRequest {
    /// A request using the sampling settings from config.
    pub fn from_config(prompt: String, config: &LlmConfig) -> Self {
        Self {
            prompt,
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            grounding: config.grounding,
        }
    }
}

#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Generate a complete text response. Truncated output is still returned;
    /// only transport failures and empty responses are errors.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError>;
}

// ---------------------------------------------------------------------------
// GeminiClient
// ---------------------------------------------------------------------------

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    api_base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, config: &LlmConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            api_key,
            model: config.model.clone(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.api_base_url, self.model
        )
    }
}

/// Request body for `streamGenerateContent`.
pub(crate) fn request_body(request: &GenerationRequest) -> Value {
    let mut body = serde_json::json!({
        "contents": [{ "role": "user", "parts": [{ "text": request.prompt }] }],
        "generationConfig": {
            "temperature": request.temperature,
            "maxOutputTokens": request.max_output_tokens,
        }
    });
    if request.grounding {
        body["tools"] = serde_json::json!([{ "google_search": {} }]);
    }
    body
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        if self.api_key.is_empty() {
            return Err(LlmError::Disabled);
        }

        let builder = self
            .http
            .post(self.stream_url())
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&request_body(request));

        let mut es = builder
            .eventsource()
            .map_err(|e| LlmError::Stream(format!("failed to create event source: {e}")))?;

        let mut full_text = String::new();
        let mut finish_reason: Option<String> = None;

        while let Some(event) = es.next().await {
            match event {
                Ok(Event::Open) => {
                    debug!(model = %self.model, "SSE connection opened");
                }
                Ok(Event::Message(msg)) => {
                    if let Some(reason) = parse_block_reason(&msg.data) {
                        es.close();
                        return Err(LlmError::Blocked(reason));
                    }
                    if let Some(text) = parse_chunk_text(&msg.data) {
                        full_text.push_str(&text);
                    }
                    if let Some(reason) = parse_finish_reason(&msg.data) {
                        finish_reason = Some(reason);
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => {
                    debug!("stream ended");
                    break;
                }
                Err(err) => {
                    es.close();
                    if full_text.is_empty() {
                        warn!(?err, "SSE stream error");
                        return Err(map_stream_error(err));
                    }
                    // Keep what arrived; the caller repairs partial JSON.
                    warn!(
                        ?err,
                        chars = full_text.len(),
                        "SSE stream broke off, keeping partial text"
                    );
                    break;
                }
            }
        }
        es.close();

        match finish_reason.as_deref() {
            Some("MAX_TOKENS") => warn!(
                max_output_tokens = request.max_output_tokens,
                "response truncated at output token limit"
            ),
            Some(reason) => debug!(reason, "generation finished"),
            None => debug!("stream closed without finish reason"),
        }

        if full_text.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        info!(chars = full_text.len(), "generation complete");
        Ok(full_text)
    }
}

// ---------------------------------------------------------------------------
// LlmClient wrapper
// ---------------------------------------------------------------------------

/// Either an active Gemini client or disabled for lack of an API key.
pub enum LlmClient {
    Active(GeminiClient),
    Disabled,
}

impl LlmClient {
    /// `Active` when a non-empty Gemini key is configured, `Disabled`
    /// otherwise.
    pub fn from_config(config: &Config, http: reqwest::Client) -> Self {
        match &config.credentials.gemini_api_key {
            Some(key) if !key.is_empty() => {
                LlmClient::Active(GeminiClient::new(key.clone(), &config.llm, http))
            }
            _ => LlmClient::Disabled,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, LlmClient::Active(_))
    }
}

#[async_trait]
impl GenerativeModel for LlmClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        match self {
            LlmClient::Active(client) => client.generate(request).await,
            LlmClient::Disabled => Err(LlmError::Disabled),
        }
    }
}

// ---------------------------------------------------------------------------
// SSE JSON parsing helpers
// ---------------------------------------------------------------------------

/// Concatenate the text parts of the first candidate. Thought parts are
/// skipped.
///
/// Expected shape: `{ "candidates": [{ "content": { "parts": [{ "text": "..." }] } }] }`
pub(crate) fn parse_chunk_text(data: &str) -> Option<String> {
    let v: Value = serde_json::from_str(data).ok()?;
    let parts = v
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter(|p| !p.get("thought").and_then(Value::as_bool).unwrap_or(false))
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Extract `finishReason` from the first candidate.
pub(crate) fn parse_finish_reason(data: &str) -> Option<String> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("candidates")?
        .get(0)?
        .get("finishReason")?
        .as_str()
        .map(|s| s.to_string())
}

/// Extract `promptFeedback.blockReason`, present when the prompt is refused.
pub(crate) fn parse_block_reason(data: &str) -> Option<String> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("promptFeedback")?
        .get("blockReason")?
        .as_str()
        .map(|s| s.to_string())
}

fn map_stream_error(err: reqwest_eventsource::Error) -> LlmError {
    match err {
        reqwest_eventsource::Error::InvalidStatusCode(status, _response) => {
            LlmError::Status(status.as_u16())
        }
        reqwest_eventsource::Error::Transport(e) => LlmError::Transport(e.to_string()),
        other => LlmError::Stream(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
