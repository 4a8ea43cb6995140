//! Pipeline configuration
//!
//! Settings come from three layers, later ones winning: built-in defaults,
//! an optional JSON file, then environment variables. The binary applies
//! command-line flags on top.

use crate::common::constants::{
    DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_WINDOW, DEFAULT_EMBEDDING_DIM, DEFAULT_TOP_K,
};
use crate::common::error::{FlowError, FlowResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;
use url::Url;

pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_PROVIDER: &str = "CLAIMFLOW_PROVIDER";
pub const ENV_BASE_URL: &str = "CLAIMFLOW_BASE_URL";

/// Which language model backend to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// OpenAI when a key is set, else a local Ollama server if reachable, else the mock
    #[default]
    Auto,
    #[value(name = "openai")]
    OpenAi,
    Ollama,
    Mock,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Provider::Auto => "auto",
            Provider::OpenAi => "openai",
            Provider::Ollama => "ollama",
            Provider::Mock => "mock",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Provider {
    type Err = FlowError;

    fn from_str(s: &str) -> FlowResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Provider::Auto),
            "openai" => Ok(Provider::OpenAi),
            "ollama" => Ok(Provider::Ollama),
            "mock" => Ok(Provider::Mock),
            other => Err(FlowError::Config(format!("Unknown provider '{}'", other))),
        }
    }
}

/// Language model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: Provider,
    /// API key; never written back out
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Overrides the provider's endpoint
    pub base_url: Option<String>,
    pub chat_model: String,
    pub embedding_model: String,
    /// Length of every embedding vector, including fallbacks
    pub embedding_dim: usize,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Auto,
            api_key: None,
            base_url: None,
            chat_model: "gpt-4o".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            timeout_secs: 60,
        }
    }
}

/// Settings for one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding `novels/` and `backstories/`
    pub data_dir: PathBuf,
    pub output_path: PathBuf,
    /// Evidence chunks retrieved per claim
    pub top_k: usize,
    /// Chunk size in tokens
    pub chunk_window: usize,
    pub chunk_overlap: usize,
    pub parallel_join: bool,
    pub llm: LlmConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_path: PathBuf::from("results").join("output_results.csv"),
            top_k: DEFAULT_TOP_K,
            chunk_window: DEFAULT_CHUNK_WINDOW,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            parallel_join: false,
            llm: LlmConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file; absent keys keep their defaults
    pub fn load(path: impl AsRef<Path>) -> FlowResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            FlowError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: PipelineConfig = serde_json::from_str(&text)?;
        debug!(path = %path.display(), "loaded configuration file");
        Ok(config)
    }

    /// Overlay settings from the process environment
    pub fn apply_env(&mut self) -> FlowResult<()> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    fn apply_vars<F>(&mut self, lookup: F) -> FlowResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_API_KEY).filter(|k| !k.is_empty()) {
            self.llm.api_key = Some(key);
        }
        if let Some(provider) = lookup(ENV_PROVIDER) {
            self.llm.provider = provider.parse()?;
        }
        if let Some(url) = lookup(ENV_BASE_URL).filter(|u| !u.is_empty()) {
            self.llm.base_url = Some(url);
        }
        Ok(())
    }

    pub fn validate(&self) -> FlowResult<()> {
        if self.top_k == 0 {
            return Err(FlowError::Config("top_k must be at least 1".to_string()));
        }
        if self.chunk_overlap >= self.chunk_window {
            return Err(FlowError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_window ({})",
                self.chunk_overlap, self.chunk_window
            )));
        }
        if self.llm.embedding_dim == 0 {
            return Err(FlowError::Config("embedding_dim must be positive".to_string()));
        }
        if let Some(base) = &self.llm.base_url {
            Url::parse(base)
                .map_err(|e| FlowError::Config(format!("Invalid base_url '{}': {}", base, e)))?;
        }
        Ok(())
    }

    pub fn novels_dir(&self) -> PathBuf {
        self.data_dir.join("novels")
    }

    pub fn backstories_dir(&self) -> PathBuf {
        self.data_dir.join("backstories")
    }
}
