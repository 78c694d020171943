//! URL Sentinel: malicious-URL assessment.
//!
//! Modular structure:
//! - [`features`] — URL → fixed, named, versioned feature vector
//! - [`heuristics`] — Ordered rule table (whitelist, hard flags, fallback)
//! - [`training`] — Labeling, class balancing, cross-validated model selection
//! - [`model`] — Random forest / logistic regression, artifact, swappable model slot
//! - [`decision`] — Inference state machine producing one verdict per URL
//! - [`storage`] — Encrypted SQLite verdict history
//! - [`logging`] — Structured JSON logging

pub mod config;
pub mod decision;
pub mod error;
pub mod features;
pub mod heuristics;
pub mod logging;
pub mod model;
pub mod storage;
pub mod training;

pub use config::SentinelConfig;
pub use decision::{AssessmentContext, DecisionEngine, Verdict, VerdictReason, VerdictSink};
pub use error::{Error, Result};
pub use features::{FeatureExtractor, FeatureVector, Lexicon};
pub use heuristics::HeuristicEngine;
pub use logging::StructuredLogger;
pub use model::{ModelSlot, TrainedModel};
pub use storage::VerdictStore;
pub use training::{train, DatasetBalancer, ModelSelector, RawLabeledUrl};
