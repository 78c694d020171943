//! Error types shared by training, artifact handling, and the verdict store.
//!
//! Inference (`DecisionEngine::assess`) never returns these: extraction is total,
//! model failures fall back to heuristics, and sink failures are only logged.

use crate::model::ModelFamily;

/// Result type alias using the crate's [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("crypto error: {0}")]
    Crypto(String),

    /// A stored row decrypted fine but a column does not parse back
    #[error("corrupt stored record: {0}")]
    CorruptRecord(String),

    #[error("lexicon error: {0}")]
    Lexicon(String),

    /// Dataset cannot be balanced, split, or cross-validated
    #[error("invalid dataset: {0}")]
    InvalidDataset(String),

    /// A single estimator fit failed (bad hyperparameters, degenerate fold)
    #[error("training error: {0}")]
    Training(String),

    /// Every candidate family failed during selection
    #[error("no viable model: {}", format_failures(.failures))]
    NoViableModel { failures: Vec<(ModelFamily, String)> },

    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("artifact integrity check failed: {0}")]
    ArtifactIntegrity(String),
}

impl Error {
    pub fn training(msg: impl Into<String>) -> Self {
        Self::Training(msg.into())
    }

    pub fn invalid_dataset(msg: impl Into<String>) -> Self {
        Self::InvalidDataset(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::ModelUnavailable(msg.into())
    }
}

fn format_failures(failures: &[(ModelFamily, String)]) -> String {
    if failures.is_empty() {
        return "no candidate families declared".to_string();
    }
    failures
        .iter()
        .map(|(family, err)| format!("{}: {}", family, err))
        .collect::<Vec<_>>()
        .join("; ")
}
