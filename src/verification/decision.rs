//! Story-level decision from per-claim verdicts

use crate::types::Value;
use crate::verification::verdict::{Verdict, VerdictStatus};
use serde::Serialize;

/// Label for a backstory that agrees with its novel
pub const CONSISTENT: i64 = 1;
/// Label for a backstory contradicted by its novel
pub const CONTRADICTED: i64 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub prediction: i64,
    pub rationale: String,
}

impl Decision {
    /// Two-element tuple `(prediction, rationale)`
    pub fn to_value(&self) -> Value {
        Value::List(vec![
            Value::Integer(self.prediction),
            Value::Varchar(self.rationale.clone()),
        ])
    }
}

/// Collapse verdicts into one decision.
///
/// Any contradiction wins and is cited (the first one found). Otherwise the
/// story is consistent, with a stronger rationale when at least one claim
/// was positively supported.
pub fn aggregate(verdicts: &[Verdict]) -> Decision {
    if let Some(primary) = verdicts
        .iter()
        .find(|v| v.status == VerdictStatus::Contradiction)
    {
        return Decision {
            prediction: CONTRADICTED,
            rationale: format!(
                "Contradiction detected: {} (Evidence: {})",
                primary.reasoning,
                primary.evidence_quote.as_deref().unwrap_or("None")
            ),
        };
    }

    let rationale = if verdicts.iter().any(|v| v.status == VerdictStatus::Consistent) {
        "Backstory is consistent with retrieved narrative events."
    } else {
        "No explicit contradictions found in narrative."
    };
    Decision {
        prediction: CONSISTENT,
        rationale: rationale.to_string(),
    }
}
