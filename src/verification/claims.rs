//! Claim extraction from backstories

use crate::llm::LanguageModel;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::warn;

/// Splits a backstory into standalone, checkable claims
pub trait ClaimExtractor: Debug + Send + Sync {
    /// Claims in the order they were found; may be empty
    fn extract(&self, backstory: &str) -> Vec<String>;
}

/// Asks a language model for the claims
#[derive(Debug, Clone)]
pub struct LlmClaimExtractor {
    model: Arc<dyn LanguageModel>,
}

impl LlmClaimExtractor {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub fn prompt(backstory: &str) -> String {
        format!(
            "You are an expert literary analyst.\n\
             Analyze the character backstory below and extract a list of atomic, verifiable \
             claims about the character's past, beliefs, or actions.\n\
             Each claim should be a standalone sentence that can be checked against a novel's \
             text for consistency.\n\
             Return a JSON object with a single key \"claims\" containing a list of strings.\n\
             Example: {{ \"claims\": [\"Born in 1990\", \"Hates broccoli\", \"Worked as a spy\"] }}\n\n\
             Backstory:\n{}",
            backstory
        )
    }
}

impl ClaimExtractor for LlmClaimExtractor {
    fn extract(&self, backstory: &str) -> Vec<String> {
        let reply = match self.model.structured_completion(&Self::prompt(backstory)) {
            Ok(reply) => reply,
            Err(e) => {
                warn!(backend = self.model.name(), error = %e, "claim extraction failed");
                return Vec::new();
            }
        };
        match reply.get("claims").and_then(|claims| claims.as_array()) {
            Some(claims) => claims
                .iter()
                .filter_map(|claim| claim.as_str())
                .map(str::to_string)
                .collect(),
            None => {
                warn!(backend = self.model.name(), "claim extraction reply has no 'claims' list");
                Vec::new()
            }
        }
    }
}
