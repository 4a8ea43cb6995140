//! Per-claim verdicts and the verifiers that produce them

use crate::common::error::{FlowError, FlowResult};
use crate::llm::LanguageModel;
use crate::types::{Row, Value};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::sync::Arc;
use tracing::warn;

/// Outcome of checking one claim against its evidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictStatus {
    Consistent,
    Contradiction,
    #[default]
    Neutral,
}

impl VerdictStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictStatus::Consistent => "consistent",
            VerdictStatus::Contradiction => "contradiction",
            VerdictStatus::Neutral => "neutral",
        }
    }

    /// Unrecognised labels count as neutral
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "consistent" => VerdictStatus::Consistent,
            "contradiction" => VerdictStatus::Contradiction,
            _ => VerdictStatus::Neutral,
        }
    }
}

impl fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub status: VerdictStatus,
    pub reasoning: String,
    pub evidence_quote: Option<String>,
}

impl Verdict {
    pub fn new(status: VerdictStatus, reasoning: impl Into<String>) -> Self {
        Self {
            status,
            reasoning: reasoning.into(),
            evidence_quote: None,
        }
    }

    pub fn with_quote(mut self, quote: impl Into<String>) -> Self {
        self.evidence_quote = Some(quote.into());
        self
    }

    /// Lenient read of a model reply; missing fields become defaults
    pub fn from_json(json: &serde_json::Value) -> Self {
        Self {
            status: json
                .get("status")
                .and_then(|s| s.as_str())
                .map(VerdictStatus::parse)
                .unwrap_or_default(),
            reasoning: json
                .get("reasoning")
                .and_then(|r| r.as_str())
                .unwrap_or_default()
                .to_string(),
            evidence_quote: json
                .get("evidence_quote")
                .and_then(|q| q.as_str())
                .map(str::to_string),
        }
    }

    /// Struct value with `status`, `reasoning` and `evidence_quote` fields
    pub fn to_value(&self) -> Value {
        Value::Struct(
            Row::new()
                .with("status", self.status.as_str())
                .with("reasoning", self.reasoning.as_str())
                .with("evidence_quote", self.evidence_quote.clone()),
        )
    }

    pub fn from_value(value: &Value) -> FlowResult<Self> {
        let row = value.try_as_struct()?;
        let text = |name: &str| -> FlowResult<Option<String>> {
            match row.get(name) {
                None | Some(Value::Null) => Ok(None),
                Some(v) => Ok(Some(v.try_as_str()?.to_string())),
            }
        };
        let status = text("status")?.ok_or_else(|| {
            FlowError::InvalidValue("verdict is missing its 'status' field".to_string())
        })?;
        Ok(Self {
            status: VerdictStatus::parse(&status),
            reasoning: text("reasoning")?.unwrap_or_default(),
            evidence_quote: text("evidence_quote")?,
        })
    }
}

/// Judges a claim against retrieved evidence chunks
pub trait ClaimVerifier: Debug + Send + Sync {
    fn verify(&self, claim: &str, evidence: &[String]) -> Verdict;
}

/// Asks a language model whether the evidence supports the claim
#[derive(Debug, Clone)]
pub struct LlmVerifier {
    model: Arc<dyn LanguageModel>,
}

impl LlmVerifier {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub fn prompt(claim: &str, evidence: &[String]) -> String {
        format!(
            "You are a consistency checker for a novel.\n\n\
             Claim to Verify: \"{}\"\n\n\
             Excerpts from the Novel:\n{}\n\n\
             Task:\n\
             Determine if the Claim is consistent with, contradicted by, or irrelevant to the \
             provided Excerpts.\n\
             - If EXPLICITLY contradicted, status is \"contradiction\".\n\
             - If supported or consistent, status is \"consistent\".\n\
             - If the excerpts don't mention anything relevant, status is \"neutral\".\n\n\
             Return a JSON object:\n\
             {{\n  \"status\": \"consistent\" | \"contradiction\" | \"neutral\",\n  \
             \"reasoning\": \"Brief explanation citing specific parts of the text if applicable.\",\n  \
             \"evidence_quote\": \"Direct quote from the text if a contradiction or strong support is found, else null.\"\n}}",
            claim,
            evidence.join("\n---\n")
        )
    }
}

impl ClaimVerifier for LlmVerifier {
    fn verify(&self, claim: &str, evidence: &[String]) -> Verdict {
        match self.model.structured_completion(&Self::prompt(claim, evidence)) {
            Ok(reply) => Verdict::from_json(&reply),
            Err(e) => {
                warn!(backend = self.model.name(), error = %e, "claim analysis failed");
                Verdict::new(VerdictStatus::Neutral, "LLM Analysis Failed")
            }
        }
    }
}

/// Word pairs that cannot both describe the same character
pub const ANTONYM_PAIRS: [(&str, &str); 5] = [
    ("pacifist", "fighter"),
    ("vegetarian", "meat"),
    ("teetotaler", "drank"),
    ("never", "always"),
    ("hated", "loved"),
];

/// Keyword verifier that needs no model.
///
/// Flags a contradiction when the claim contains one word of an antonym pair
/// and the evidence contains the other. Matching is case-insensitive
/// substring search.
#[derive(Debug, Clone, Default)]
pub struct RuleBasedVerifier;

impl RuleBasedVerifier {
    pub fn new() -> Self {
        Self
    }
}

impl ClaimVerifier for RuleBasedVerifier {
    fn verify(&self, claim: &str, evidence: &[String]) -> Verdict {
        let evidence = evidence.join(" ").to_lowercase();
        let claim = claim.to_lowercase();

        for (a, b) in ANTONYM_PAIRS {
            for (in_claim, in_evidence) in [(a, b), (b, a)] {
                if claim.contains(in_claim) && evidence.contains(in_evidence) {
                    return Verdict::new(
                        VerdictStatus::Contradiction,
                        format!(
                            "Behavioral Contradiction detected: Claim mentions '{}' but Evidence mentions '{}'.",
                            in_claim, in_evidence
                        ),
                    )
                    .with_quote(format!("...{}...", in_evidence));
                }
            }
        }
        Verdict::new(
            VerdictStatus::Neutral,
            "No explicit rule-based contradiction found.",
        )
    }
}
