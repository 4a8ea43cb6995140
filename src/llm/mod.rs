//! Language model collaborators
//!
//! Everything the verification pipeline needs from a model goes through
//! [`LanguageModel`]: JSON-shaped chat completions and text embeddings.
//! [`connect`] picks a backend from configuration.

pub mod mock;
pub mod openai;

pub use mock::MockModel;
pub use openai::{strip_code_fences, OpenAiClient};

use crate::common::error::{FlowError, FlowResult};
use crate::config::{LlmConfig, Provider};
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{info, warn};

/// A chat/embedding model
pub trait LanguageModel: Debug + Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &str;

    /// Send `prompt` and parse the reply as a JSON document
    fn structured_completion(&self, prompt: &str) -> FlowResult<serde_json::Value>;

    fn embed(&self, text: &str) -> FlowResult<Vec<f64>>;
}

/// Build the model selected by `config`.
///
/// `Provider::Auto` tries OpenAI when an API key is configured, then a
/// local Ollama server if one answers, then falls back to [`MockModel`].
pub fn connect(config: &LlmConfig) -> FlowResult<Arc<dyn LanguageModel>> {
    let model: Arc<dyn LanguageModel> = match config.provider {
        Provider::Mock => Arc::new(MockModel::new(config.embedding_dim)),
        Provider::OpenAi => {
            if config.api_key.is_none() {
                return Err(FlowError::Config(
                    "provider 'openai' requires an API key".to_string(),
                ));
            }
            Arc::new(OpenAiClient::openai(config)?)
        }
        Provider::Ollama => Arc::new(OpenAiClient::ollama(config)?),
        Provider::Auto => {
            if config.api_key.is_some() {
                Arc::new(OpenAiClient::openai(config)?)
            } else {
                let local = OpenAiClient::ollama(config)?;
                if local.probe() {
                    Arc::new(local)
                } else {
                    warn!("no API key and no local model server, using mock model");
                    Arc::new(MockModel::new(config.embedding_dim))
                }
            }
        }
    };
    info!(backend = model.name(), "language model selected");
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_mock() {
        let config = LlmConfig {
            provider: Provider::Mock,
            embedding_dim: 8,
            ..Default::default()
        };
        let model = connect(&config).unwrap();
        assert_eq!(model.name(), "mock");
        assert_eq!(model.embed("anything").unwrap(), vec![0.1; 8]);
    }

    #[test]
    fn test_openai_requires_key() {
        let config = LlmConfig {
            provider: Provider::OpenAi,
            ..Default::default()
        };
        assert!(matches!(connect(&config), Err(FlowError::Config(_))));
    }
}
