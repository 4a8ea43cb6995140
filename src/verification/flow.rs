//! Backstory consistency pipeline
//!
//! Wires the collaborators into a dataflow over two directories:
//!
//! ```text
//! novels/      -> story_id, text -> chunks (flatten) -> chunk vectors ----+
//!                                                                         | top-k join
//! backstories/ -> story_id, text -> claims (flatten) -> claim vectors ----+
//!   -> same-story filter -> group (story, claim) -> verdict
//!   -> group (story) -> decision -> story_id, prediction, rationale -> CSV
//! ```

use crate::common::constants::{SOURCE_DATA_FIELD, SOURCE_PATH_FIELD};
use crate::common::error::{FlowError, FlowResult};
use crate::config::PipelineConfig;
use crate::execution::{KnnJoin, ParallelContext};
use crate::expression::{apply, col, lit, ScalarFunction};
use crate::io::{CsvSink, DirectorySource};
use crate::llm::LanguageModel;
use crate::table::{Reducer, Table};
use crate::types::Value;
use crate::verification::chunker::chunk_text;
use crate::verification::claims::{ClaimExtractor, LlmClaimExtractor};
use crate::verification::decision::aggregate;
use crate::verification::embedding::{Embedder, LlmEmbedder};
use crate::verification::verdict::{ClaimVerifier, LlmVerifier, RuleBasedVerifier, Verdict};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Prefix applied to novel-side fields after the join
pub const NOVEL_PREFIX: &str = "novel";

/// Only files with this extension are read as novels or backstories
pub const STORY_EXTENSION: &str = "txt";

/// `story_01.txt` -> `story_01`
pub fn novel_story_id(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `story_01_backstory.txt` -> `story_01`
pub fn backstory_story_id(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().replace("_backstory", "").replace(".txt", ""))
        .unwrap_or_default()
}

fn arg<'a>(args: &'a [Value], index: usize, function: &str) -> FlowResult<&'a Value> {
    args.get(index).ok_or_else(|| {
        FlowError::InvalidArgument(format!(
            "{} expects at least {} argument(s), got {}",
            function,
            index + 1,
            args.len()
        ))
    })
}

fn text_list(value: &Value) -> FlowResult<Vec<String>> {
    value
        .try_as_list()?
        .iter()
        .map(|v| v.try_as_str().map(str::to_string))
        .collect()
}

/// Output of one evaluation: the result table plus any files that could not
/// be read on the way in
#[derive(Debug)]
pub struct Evaluation {
    pub results: Table,
    pub source_failures: Vec<FlowError>,
}

#[derive(Debug)]
pub struct RunReport {
    pub evaluation: Evaluation,
    pub rows_written: usize,
}

#[derive(Debug, Clone)]
pub struct ConsistencyPipeline {
    config: PipelineConfig,
    extractor: Arc<dyn ClaimExtractor>,
    embedder: Arc<dyn Embedder>,
    verifier: Arc<dyn ClaimVerifier>,
}

impl ConsistencyPipeline {
    pub fn new(
        config: PipelineConfig,
        extractor: Arc<dyn ClaimExtractor>,
        embedder: Arc<dyn Embedder>,
        verifier: Arc<dyn ClaimVerifier>,
    ) -> Self {
        Self {
            config,
            extractor,
            embedder,
            verifier,
        }
    }

    /// All collaborators backed by `model`; `rules` swaps in the keyword
    /// verifier for claim analysis
    pub fn from_model(config: PipelineConfig, model: Arc<dyn LanguageModel>, rules: bool) -> Self {
        let verifier: Arc<dyn ClaimVerifier> = if rules {
            Arc::new(RuleBasedVerifier::new())
        } else {
            Arc::new(LlmVerifier::new(model.clone()))
        };
        let embedder = Arc::new(LlmEmbedder::new(model.clone(), config.llm.embedding_dim));
        Self::new(
            config,
            Arc::new(LlmClaimExtractor::new(model)),
            embedder,
            verifier,
        )
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn chunk_function(&self) -> ScalarFunction {
        let (window, overlap) = (self.config.chunk_window, self.config.chunk_overlap);
        ScalarFunction::new("chunk_text", move |args| {
            let text = arg(args, 0, "chunk_text")?.try_as_str()?;
            Ok(Value::from(chunk_text(text, window, overlap)?))
        })
    }

    fn embed_function(&self) -> ScalarFunction {
        let embedder = self.embedder.clone();
        ScalarFunction::new("embed", move |args| {
            let text = arg(args, 0, "embed")?.try_as_str()?;
            Ok(Value::from(embedder.embed(text)))
        })
        .non_deterministic()
    }

    fn claims_function(&self) -> ScalarFunction {
        let extractor = self.extractor.clone();
        ScalarFunction::new("extract_claims", move |args| {
            let text = arg(args, 0, "extract_claims")?.try_as_str()?;
            Ok(Value::from(extractor.extract(text)))
        })
        .non_deterministic()
    }

    fn verify_function(&self) -> ScalarFunction {
        let verifier = self.verifier.clone();
        ScalarFunction::new("analyze_claim", move |args| {
            let claim = arg(args, 0, "analyze_claim")?.try_as_str()?;
            let chunks = text_list(arg(args, 1, "analyze_claim")?)?;
            Ok(verifier.verify(claim, &chunks).to_value())
        })
        .non_deterministic()
    }

    fn decide_function() -> ScalarFunction {
        ScalarFunction::new("aggregate_decision", |args| {
            let verdicts = arg(args, 0, "aggregate_decision")?
                .try_as_list()?
                .iter()
                .map(Verdict::from_value)
                .collect::<FlowResult<Vec<_>>>()?;
            Ok(aggregate(&verdicts).to_value())
        })
    }

    fn read_stories(
        dir: &Path,
        story_id: fn(&str) -> String,
        failures: &mut Vec<FlowError>,
    ) -> FlowResult<Table> {
        let scan = DirectorySource::new(dir).with_extension(STORY_EXTENSION).scan();
        failures.extend(scan.failures);
        let id = ScalarFunction::new("story_id", move |args| {
            let path = arg(args, 0, "story_id")?.try_as_str()?;
            Ok(Value::from(story_id(path)))
        });
        scan.table.select([
            ("story_id", apply(id, vec![col(SOURCE_PATH_FIELD)])),
            ("text", col(SOURCE_DATA_FIELD).method("decode", vec![lit("utf-8")])),
        ])
    }

    /// Build the result table without writing it
    pub fn evaluate(&self) -> FlowResult<Evaluation> {
        let mut source_failures = Vec::new();

        let novels = Self::read_stories(
            &self.config.novels_dir(),
            novel_story_id,
            &mut source_failures,
        )?;
        let novel_chunks = novels
            .select([
                ("story_id", col("story_id")),
                ("chunk", apply(self.chunk_function(), vec![col("text")])),
            ])?
            .flatten(&col("chunk"))?;
        let novel_vectors = novel_chunks.select([
            ("story_id", col("story_id")),
            ("chunk", col("chunk")),
            ("vector", apply(self.embed_function(), vec![col("chunk")])),
        ])?;
        info!(
            novels = novels.len(),
            chunks = novel_vectors.len(),
            "novels indexed"
        );

        let backstories = Self::read_stories(
            &self.config.backstories_dir(),
            backstory_story_id,
            &mut source_failures,
        )?;
        let claims = backstories
            .select([
                ("story_id", col("story_id")),
                ("claim", apply(self.claims_function(), vec![col("text")])),
            ])?
            .flatten(&col("claim"))?;
        let claim_vectors = claims.select([
            ("story_id", col("story_id")),
            ("claim", col("claim")),
            ("vector", apply(self.embed_function(), vec![col("claim")])),
        ])?;
        info!(
            backstories = backstories.len(),
            claims = claim_vectors.len(),
            "claims extracted"
        );

        let parallel = if self.config.parallel_join {
            ParallelContext::from_system()
        } else {
            ParallelContext::single_threaded()
        };
        let matches = KnnJoin::new(col("vector"), col("vector"), self.config.top_k)
            .with_prefix(NOVEL_PREFIX)
            .with_parallelism(parallel)
            .execute(&claim_vectors, &novel_vectors)?
            .filter(&col("story_id").eq(col("novel_story_id")))?;

        let claim_analyses = matches
            .groupby(vec![col("story_id"), col("claim")])?
            .reduce([("relevant_chunks", Reducer::tuple(col("novel_chunk")))])?
            .select([
                ("story_id", col("story_id")),
                ("claim", col("claim")),
                (
                    "analysis",
                    apply(
                        self.verify_function(),
                        vec![col("claim"), col("relevant_chunks")],
                    ),
                ),
            ])?;

        let results = claim_analyses
            .groupby(vec![col("story_id")])?
            .reduce([("all_analyses", Reducer::tuple(col("analysis")))])?
            .select([
                ("story_id", col("story_id")),
                (
                    "decision",
                    apply(Self::decide_function(), vec![col("all_analyses")]),
                ),
            ])?
            .select([
                ("story_id", col("story_id")),
                ("prediction", col("decision").method("get", vec![lit(0)])),
                ("rationale", col("decision").method("get", vec![lit(1)])),
            ])?;

        info!(
            verified_claims = claim_analyses.len(),
            stories = results.len(),
            "stories decided"
        );
        Ok(Evaluation {
            results,
            source_failures,
        })
    }

    /// Evaluate and write the results to the configured CSV path
    pub fn run(&self) -> FlowResult<RunReport> {
        let evaluation = self.evaluate()?;
        let rows_written = CsvSink::new(&self.config.output_path).write(&evaluation.results)?;
        Ok(RunReport {
            evaluation,
            rows_written,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_story_ids() {
        assert_eq!(novel_story_id("/data/novels/story_01.txt"), "story_01");
        assert_eq!(
            backstory_story_id("/data/backstories/story_01_backstory.txt"),
            "story_01"
        );
        assert_eq!(backstory_story_id("plain.txt"), "plain");
        assert_eq!(novel_story_id(""), "");
    }

    #[test]
    fn test_scalar_helpers() {
        assert!(matches!(
            arg(&[], 0, "f"),
            Err(FlowError::InvalidArgument(_))
        ));
        let list = Value::from(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(text_list(&list).unwrap(), vec!["a", "b"]);
        assert!(text_list(&Value::from(vec![1.0])).is_err());
    }
}
