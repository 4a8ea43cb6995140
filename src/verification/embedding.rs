//! Text embeddings for the similarity join

use crate::llm::LanguageModel;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::warn;

/// Maps text to a fixed-length vector
pub trait Embedder: Debug + Send + Sync {
    /// Always returns exactly `dimension()` components
    fn embed(&self, text: &str) -> Vec<f64>;

    fn dimension(&self) -> usize;
}

/// Embeds through a language model, substituting a zero vector when the
/// model fails or answers with the wrong length
#[derive(Debug, Clone)]
pub struct LlmEmbedder {
    model: Arc<dyn LanguageModel>,
    dimension: usize,
}

impl LlmEmbedder {
    pub fn new(model: Arc<dyn LanguageModel>, dimension: usize) -> Self {
        Self { model, dimension }
    }
}

impl Embedder for LlmEmbedder {
    fn embed(&self, text: &str) -> Vec<f64> {
        match self.model.embed(text) {
            Ok(vector) if vector.len() == self.dimension => vector,
            Ok(vector) => {
                warn!(
                    expected = self.dimension,
                    actual = vector.len(),
                    "embedding has unexpected dimension, using zero vector"
                );
                vec![0.0; self.dimension]
            }
            Err(e) => {
                warn!(backend = self.model.name(), error = %e, "embedding failed, using zero vector");
                vec![0.0; self.dimension]
            }
        }
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockModel;

    #[test]
    fn test_mock_embedding() {
        let embedder = LlmEmbedder::new(Arc::new(MockModel::new(3)), 3);
        assert_eq!(embedder.embed("text"), vec![0.1, 0.1, 0.1]);
        assert_eq!(embedder.dimension(), 3);
    }

    #[test]
    fn test_wrong_dimension_falls_back() {
        let embedder = LlmEmbedder::new(Arc::new(MockModel::new(2)), 5);
        assert_eq!(embedder.embed("text"), vec![0.0; 5]);
    }
}
