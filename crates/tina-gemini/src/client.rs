//! Gemini client
//!
//! Sends the trimmed history followed by the stage instruction as the final
//! user message, and returns the text of the first candidate.

use async_trait::async_trait;
use tracing::debug;

use tina_core::{GenerationError, GenerationRequest, Role, TextGenerator};

use crate::types::{
    Content, GenerateContentRequest, GenerateContentResponse, Part, WireGenerationConfig,
};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-lite";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

pub struct GeminiClient {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Build the request body for the API
    pub fn build_request_body(request: &GenerationRequest) -> GenerateContentRequest {
        let mut contents: Vec<Content> = request
            .history
            .iter()
            .map(|turn| Content {
                role: Some(
                    match turn.role {
                        Role::User => "user",
                        Role::Assistant => "model",
                    }
                    .to_string(),
                ),
                parts: vec![Part {
                    text: Some(turn.text.clone()),
                }],
            })
            .collect();

        contents.push(Content {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: Some(request.instruction.clone()),
            }],
        });

        let config = &request.config;
        let generation_config = if config.max_output_tokens.is_some() || config.temperature.is_some()
        {
            Some(WireGenerationConfig {
                max_output_tokens: config.max_output_tokens,
                temperature: config.temperature,
            })
        } else {
            None
        };

        GenerateContentRequest {
            contents,
            generation_config,
        }
    }

    /// Pull the reply text out of a response
    pub fn parse_response(response: &GenerateContentResponse) -> Result<String, GenerationError> {
        let candidate = response.candidates.first().ok_or_else(|| {
            let reason = response
                .prompt_feedback
                .as_ref()
                .and_then(|f| f.block_reason.clone())
                .unwrap_or_else(|| "no candidates".to_string());
            GenerationError::MalformedResponse(reason)
        })?;

        let text: String = candidate
            .content
            .iter()
            .flat_map(|content| content.parts.iter())
            .filter_map(|part| part.text.as_deref())
            .collect();

        if text.is_empty() {
            return Err(GenerationError::MalformedResponse(format!(
                "empty candidate (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        Ok(text)
    }
}

/// Map a non-success HTTP status to a generation error
pub fn parse_http_error(status: u16, body: &str) -> GenerationError {
    match status {
        401 | 403 => GenerationError::Authentication(format!("gemini: HTTP {}", status)),
        429 => GenerationError::RateLimited(body.to_string()),
        _ => GenerationError::Backend {
            status,
            message: body.to_string(),
        },
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let body = Self::build_request_body(&request);
        debug!(
            model = %self.config.model,
            turns = request.history.len(),
            "Sending generateContent request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body_text = response
            .text()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        if status != 200 {
            return Err(parse_http_error(status, &body_text));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body_text)
            .map_err(|e| GenerationError::MalformedResponse(format!("Failed to parse response: {}", e)))?;

        Self::parse_response(&parsed)
    }
}
