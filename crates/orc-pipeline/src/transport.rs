//! Gemini transport - HTTP client for the generateContent API
//!
//! The gateway decides which key to use and when to retry; the transport
//! does exactly one HTTP round trip per call. A trait seam keeps the
//! pipeline testable with an in-memory transport.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Gemini API base URL
const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Default model ID
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default sampling temperature; low for extraction accuracy
pub const DEFAULT_TEMPERATURE: f64 = 0.1;

/// Default per-call timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Document attached inline to a model call
#[derive(Debug, Clone)]
pub struct InlineDocument {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// One model call: an instruction, optionally grounded in a document
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub instruction: String,
    pub document: Option<InlineDocument>,
}

impl ModelRequest {
    pub fn text(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            document: None,
        }
    }

    pub fn with_document(instruction: impl Into<String>, document: InlineDocument) -> Self {
        Self {
            instruction: instruction.into(),
            document: Some(document),
        }
    }
}

/// Transport-level failure, before retry classification
#[derive(Debug, Clone)]
pub struct TransportError {
    /// HTTP status, when the server replied at all
    pub status: Option<u16>,
    pub message: String,
}

impl TransportError {
    /// Rate-limit signal: HTTP 429, or a message mentioning 429 or quota.
    pub fn is_rate_limit(&self) -> bool {
        if self.status == Some(429) {
            return true;
        }
        let lower = self.message.to_lowercase();
        lower.contains("429") || lower.contains("quota")
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {}: {}", status, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for TransportError {}

/// One model round trip with a specific key
#[async_trait]
pub trait ModelTransport: Send + Sync {
    async fn generate(
        &self,
        api_key: &str,
        request: &ModelRequest,
    ) -> std::result::Result<String, TransportError>;
}

/// Gemini generateContent request
#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f64,
}

/// Gemini generateContent response
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Gemini transport over reqwest
#[derive(Clone)]
pub struct GeminiTransport {
    http_client: reqwest::Client,
    model: String,
    temperature: f64,
    timeout: Duration,
}

impl GeminiTransport {
    pub fn new() -> Self {
        Self {
            http_client: reqwest::Client::new(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the model ID
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn build_body(&self, request: &ModelRequest) -> GenerateContentRequest {
        let mut parts = Vec::new();
        if let Some(doc) = &request.document {
            parts.push(Part {
                text: None,
                inline_data: Some(InlineData {
                    mime_type: doc.mime_type.clone(),
                    data: BASE64.encode(&doc.data),
                }),
            });
        }
        parts.push(Part {
            text: Some(request.instruction.clone()),
            inline_data: None,
        });
        GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts,
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        }
    }
}

impl Default for GeminiTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GeminiTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiTransport")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl ModelTransport for GeminiTransport {
    async fn generate(
        &self,
        api_key: &str,
        request: &ModelRequest,
    ) -> std::result::Result<String, TransportError> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            GEMINI_API_URL, self.model, api_key
        );
        let body = self.build_body(request);

        let response = self
            .http_client
            .post(&url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError {
                status: None,
                message: if e.is_timeout() {
                    format!("request timed out after {}s", self.timeout.as_secs())
                } else {
                    format!("request failed: {}", e)
                },
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TransportError {
                status: Some(status.as_u16()),
                message: error_text,
            });
        }

        let completion: GenerateContentResponse =
            response.json().await.map_err(|e| TransportError {
                status: None,
                message: format!("failed to parse model response: {}", e),
            })?;

        let text: String = completion
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(TransportError {
                status: None,
                message: "model returned no text candidates".to_string(),
            });
        }

        Ok(text)
    }
}
