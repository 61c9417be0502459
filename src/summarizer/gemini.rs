//! Gemini `generateContent` client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::SummarizerConfig;
use crate::sources::SourceError;
use crate::summarizer::{ChatTurn, TextGenerator};
use crate::utils::{error_for_status, HttpClient};

/// Generative-text client for the Gemini REST API
#[derive(Clone)]
pub struct GeminiClient {
    client: Arc<HttpClient>,
    endpoint: String,
    model: String,
    temperature: f32,
    api_key: String,
}

impl GeminiClient {
    /// Create a client from the `[summarizer]` section and an API key
    pub fn new(config: &SummarizerConfig, api_key: impl Into<String>, client: Arc<HttpClient>) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            api_key: api_key.into(),
        }
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn id(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, turns: &[ChatTurn]) -> Result<String, SourceError> {
        let request = GenerateRequest {
            contents: turns
                .iter()
                .map(|turn| Content {
                    role: Some(turn.role),
                    parts: vec![Part {
                        text: Some(turn.text.clone()),
                    }],
                })
                .collect(),
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        tracing::debug!(model = %self.model, turns = turns.len(), "Requesting completion");

        let response = self
            .client
            .client()
            .post(self.generate_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to reach Gemini: {}", e)))?;

        let response = error_for_status("Gemini", response).await?;
        let body: GenerateResponse = response.json().await?;

        body.into_text()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<crate::summarizer::Role>,

    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,

    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,

    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate
    fn into_text(self) -> Result<String, SourceError> {
        let block_reason = self
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "none".to_string());

        let candidate = self.candidates.into_iter().next().ok_or_else(|| {
            SourceError::Api(format!(
                "Gemini returned no candidates (block reason: {})",
                block_reason
            ))
        })?;

        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(SourceError::Api(format!(
                "Gemini candidate has no text (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        Ok(text)
    }
}
