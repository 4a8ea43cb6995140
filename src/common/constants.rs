//! Constants used throughout claimflow

/// Separator between segments of a dotted field path
pub const FIELD_PATH_SEPARATOR: &str = ".";

/// Added to the norm product in cosine similarity so all-zero vectors do not divide by zero
pub const SIMILARITY_EPSILON: f64 = 1e-9;

/// Default number of neighbours kept per left row by the similarity join
pub const DEFAULT_TOP_K: usize = 5;

/// Minimum number of left rows before the similarity join fans out to the thread pool
pub const PARALLEL_JOIN_THRESHOLD: usize = 64;

/// Default chunk window, in tokens
pub const DEFAULT_CHUNK_WINDOW: usize = 500;

/// Default overlap between consecutive chunks, in tokens
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

/// Approximate number of words per token used by the word-based chunker
pub const WORDS_PER_TOKEN: f64 = 0.75;

/// Dimensionality of the default embedding model
pub const DEFAULT_EMBEDDING_DIM: usize = 1536;

/// Field names produced by the directory source
pub const SOURCE_PATH_FIELD: &str = "path";
pub const SOURCE_DATA_FIELD: &str = "data";
pub const SOURCE_CREATED_FIELD: &str = "created_at";
pub const SOURCE_MODIFIED_FIELD: &str = "modified_at";
