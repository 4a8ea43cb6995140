//! Narrative consistency checking built on the dataflow engine
//!
//! Collaborator traits ([`ClaimExtractor`], [`Embedder`], [`ClaimVerifier`])
//! keep model access out of the dataflow; [`ConsistencyPipeline`] wires them
//! together.

pub mod chunker;
pub mod claims;
pub mod decision;
pub mod embedding;
pub mod flow;
pub mod verdict;

pub use chunker::chunk_text;
pub use claims::{ClaimExtractor, LlmClaimExtractor};
pub use decision::{aggregate, Decision};
pub use embedding::{Embedder, LlmEmbedder};
pub use flow::{ConsistencyPipeline, Evaluation, RunReport};
pub use verdict::{ClaimVerifier, LlmVerifier, RuleBasedVerifier, Verdict, VerdictStatus};
