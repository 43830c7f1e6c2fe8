use std::env;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::GenerationError;

#[derive(Clone, Debug)]
pub struct GenAiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl GenAiConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("MENTOR_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url =
            env::var("MENTOR_AI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let model = env::var("MENTOR_AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
        Some(Self {
            base_url,
            api_key,
            model,
        })
    }
}

/// Chat-completions client used for all content generation.
///
/// Constructed without an API key the client is disabled: every request
/// returns `GenerationError::Disabled` and callers degrade instead of
/// failing to start.
#[derive(Clone)]
pub struct GenAiClient {
    client: Client,
    config: Option<GenAiConfig>,
}

impl GenAiClient {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(GenAiConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<GenAiConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Generate text from a prompt.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` when the client is disabled, the request
    /// fails, or the response is empty.
    pub async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let config = self.config.as_ref().ok_or(GenerationError::Disabled)?;

        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        let payload = ChatRequest {
            model: config.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt.to_string(),
            }],
            temperature: 0.2,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GenerationError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(GenerationError::EmptyResponse)?;

        debug!(model = %config.model, chars = content.len(), "generation round trip");
        Ok(content.trim().to_string())
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}
