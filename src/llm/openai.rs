//! OpenAI-compatible HTTP client
//!
//! Talks to `/chat/completions`, `/embeddings` and `/models` on any server
//! speaking the OpenAI wire format, which includes a local Ollama.

use crate::common::error::{FlowError, FlowResult};
use crate::config::LlmConfig;
use crate::llm::LanguageModel;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";
pub const OLLAMA_CHAT_MODEL: &str = "mistral";
const OLLAMA_API_KEY: &str = "ollama";
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f64>,
}

/// Remove markdown code fences that local models wrap around JSON
pub fn strip_code_fences(content: &str) -> String {
    if content.contains("```") {
        content.replace("```json", "").replace("```", "")
    } else {
        content.to_string()
    }
}

/// Blocking client for an OpenAI-style endpoint
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: Url,
    api_key: String,
    chat_model: String,
    embedding_model: String,
    label: &'static str,
}

impl OpenAiClient {
    /// Client for api.openai.com, or `config.base_url` when set
    pub fn openai(config: &LlmConfig) -> FlowResult<Self> {
        let base = config.base_url.as_deref().unwrap_or(OPENAI_BASE_URL);
        Self::new(
            base,
            config.api_key.clone().unwrap_or_default(),
            config.chat_model.clone(),
            config.embedding_model.clone(),
            config.timeout_secs,
            "openai",
        )
    }

    /// Client for a local Ollama server serving the `mistral` chat model
    pub fn ollama(config: &LlmConfig) -> FlowResult<Self> {
        let base = config.base_url.as_deref().unwrap_or(OLLAMA_BASE_URL);
        Self::new(
            base,
            OLLAMA_API_KEY.to_string(),
            OLLAMA_CHAT_MODEL.to_string(),
            config.embedding_model.clone(),
            config.timeout_secs,
            "ollama",
        )
    }

    fn new(
        base: &str,
        api_key: String,
        chat_model: String,
        embedding_model: String,
        timeout_secs: u64,
        label: &'static str,
    ) -> FlowResult<Self> {
        // Url::join drops the last segment unless the base ends with '/'
        let normalized = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{}/", base)
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| FlowError::Config(format!("Invalid base URL '{}': {}", base, e)))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url,
            api_key,
            chat_model,
            embedding_model,
            label,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> FlowResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| FlowError::Config(format!("Invalid endpoint '{}': {}", path, e)))
    }

    /// Whether the server answers `GET /models`
    pub fn probe(&self) -> bool {
        let Ok(url) = self.endpoint("models") else {
            return false;
        };
        match self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .timeout(PROBE_TIMEOUT)
            .send()
        {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                debug!(backend = self.label, status = %response.status(), "model server probe rejected");
                false
            }
            Err(e) => {
                debug!(backend = self.label, error = %e, "model server unreachable");
                false
            }
        }
    }
}

impl LanguageModel for OpenAiClient {
    fn name(&self) -> &str {
        self.label
    }

    fn structured_completion(&self, prompt: &str) -> FlowResult<serde_json::Value> {
        let body = json!({
            "model": self.chat_model,
            "messages": [{ "role": "user", "content": prompt }],
            "response_format": { "type": "json_object" },
        });
        let response: ChatResponse = self
            .client
            .post(self.endpoint("chat/completions")?)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()?
            .error_for_status()?
            .json()?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| FlowError::Model("completion has no content".to_string()))?;

        serde_json::from_str(&strip_code_fences(&content)).map_err(|e| {
            if self.label == "ollama" {
                warn!(model = %self.chat_model, "local model replied with invalid JSON; is the model pulled?");
            }
            FlowError::Model(format!("completion is not valid JSON: {}", e))
        })
    }

    fn embed(&self, text: &str) -> FlowResult<Vec<f64>> {
        let body = json!({ "model": self.embedding_model, "input": text });
        let response: EmbeddingResponse = self
            .client
            .post(self.endpoint("embeddings")?)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()?
            .error_for_status()?
            .json()?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| FlowError::Model("embedding response is empty".to_string()))
    }
}
