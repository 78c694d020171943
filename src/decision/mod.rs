//! Inference-time decisions: the verdict type, the sink seam, and the orchestrating engine.

mod engine;
mod verdict;

pub use engine::DecisionEngine;
pub use verdict::{AssessmentContext, Verdict, VerdictReason, VerdictSink};
