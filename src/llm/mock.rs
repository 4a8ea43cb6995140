//! Deterministic offline model
//!
//! Answers the two prompt families the pipeline sends by looking for their
//! marker phrases. The same prompt always yields the same reply.

use crate::common::error::{FlowError, FlowResult};
use crate::llm::LanguageModel;
use serde_json::json;

/// Phrase that identifies a claim-extraction prompt
pub const CLAIMS_MARKER: &str = "extract a list of atomic";
/// Phrase that identifies a consistency-check prompt
pub const CONSISTENCY_MARKER: &str = "consistency checker";
/// Label preceding the backstory text in a claim-extraction prompt
pub const BACKSTORY_LABEL: &str = "Backstory:";

const MAX_MOCK_CLAIMS: usize = 3;
const HASHED_PREFIX_CHARS: usize = 500;

#[derive(Debug, Clone)]
pub struct MockModel {
    dimension: usize,
}

impl MockModel {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn claims_reply(prompt: &str) -> serde_json::Value {
        let Some(start) = prompt.find(BACKSTORY_LABEL) else {
            return json!({ "claims": ["Mock claim: Backstory extraction failed."] });
        };
        let backstory = prompt[start + BACKSTORY_LABEL.len()..].trim();
        let sentences: Vec<&str> = backstory
            .split('.')
            .map(str::trim)
            .filter(|s| s.chars().count() > 10)
            .take(MAX_MOCK_CLAIMS)
            .collect();
        if sentences.is_empty() {
            json!({ "claims": ["Mock claim from empty backstory"] })
        } else {
            json!({ "claims": sentences })
        }
    }

    fn consistency_reply(prompt: &str) -> serde_json::Value {
        let hash: u64 = prompt
            .chars()
            .take(HASHED_PREFIX_CHARS)
            .map(|c| c as u64)
            .sum();
        if hash % 3 == 0 {
            json!({
                "status": "contradiction",
                "reasoning": "Mock analysis: Detected a logical conflict in the narrative based on input hash.",
                "evidence_quote": "Mock evidence quote derived from text."
            })
        } else {
            json!({
                "status": "consistent",
                "reasoning": "Mock analysis: The claim aligns with the retrieved context.",
                "evidence_quote": null
            })
        }
    }
}

impl LanguageModel for MockModel {
    fn name(&self) -> &str {
        "mock"
    }

    fn structured_completion(&self, prompt: &str) -> FlowResult<serde_json::Value> {
        let lower = prompt.to_lowercase();
        if lower.contains(CLAIMS_MARKER) {
            Ok(Self::claims_reply(prompt))
        } else if lower.contains(CONSISTENCY_MARKER) {
            Ok(Self::consistency_reply(prompt))
        } else {
            Err(FlowError::Model("mock model has no reply for this prompt".to_string()))
        }
    }

    fn embed(&self, _text: &str) -> FlowResult<Vec<f64>> {
        Ok(vec![0.1; self.dimension])
    }
}
