// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// Every failure the core can raise. All of them are fatal:
// nothing here is retried and no partial result is kept.
//
// The application and CLI layers wrap these in anyhow with
// extra context; the core layers return them directly so
// tests can match on the exact variant.

use std::path::PathBuf;

use thiserror::Error;

pub type TranslateResult<T> = Result<T, TranslateError>;

#[derive(Debug, Error)]
pub enum TranslateError {
    /// A line in an id file held something other than a token id
    #[error("{stream} line {line}: '{token}' is not a token id")]
    Parse {
        stream: &'static str,
        line:   usize,
        token:  String,
    },

    /// Every bucket was empty when the sampler was built
    #[error("no training examples in any of the {buckets} buckets")]
    InsufficientData { buckets: usize },

    /// The decoder produced an id the target vocabulary does not know
    #[error("id {id} is outside the target vocabulary (size {size})")]
    VocabularyLookup { id: u32, size: usize },

    /// A checkpoint exists but cannot be read back
    #[error("cannot load checkpoint '{}': {reason}", path.display())]
    CheckpointLoad { path: PathBuf, reason: String },

    #[error("cannot save checkpoint '{}': {reason}", path.display())]
    CheckpointSave { path: PathBuf, reason: String },

    #[error("no bucket accepts a source sequence of {length} tokens")]
    NoBucket { length: usize },

    #[error("bucket {bucket_id} does not exist ({buckets} buckets configured)")]
    UnknownBucket { bucket_id: usize, buckets: usize },

    #[error("bucket {bucket_id} has no examples to draw a batch from")]
    EmptyBucket { bucket_id: usize },

    #[error("vocabulary error: {0}")]
    Vocabulary(String),

    #[error("model error: {0}")]
    Model(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl TranslateError {
    pub fn vocabulary(msg: impl Into<String>) -> Self {
        Self::Vocabulary(msg.into())
    }

    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }
}
