//! Verdict record, caller context, and the sink that persists them.

use crate::error::Result;
use crate::features::FeatureVector;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Which stage of the pipeline produced the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerdictReason {
    Whitelist,
    Heuristic,
    Model,
    FallbackHeuristic,
}

impl VerdictReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictReason::Whitelist => "whitelist",
            VerdictReason::Heuristic => "heuristic",
            VerdictReason::Model => "model",
            VerdictReason::FallbackHeuristic => "fallback-heuristic",
        }
    }

    /// Stored when the caller gives no status message of its own.
    pub fn default_message(&self) -> &'static str {
        match self {
            VerdictReason::Whitelist => "Known safe domain",
            VerdictReason::Heuristic => "Suspicious patterns detected",
            VerdictReason::Model => "Classifier prediction",
            VerdictReason::FallbackHeuristic => "Model unavailable; heuristic fallback",
        }
    }
}

impl fmt::Display for VerdictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerdictReason {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "whitelist" => Ok(VerdictReason::Whitelist),
            "heuristic" => Ok(VerdictReason::Heuristic),
            "model" => Ok(VerdictReason::Model),
            "fallback-heuristic" => Ok(VerdictReason::FallbackHeuristic),
            other => Err(format!("unknown verdict reason {:?}", other)),
        }
    }
}

/// Final answer of one assessment run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub id: Uuid,
    pub url: String,
    pub is_malicious: bool,
    /// In `[0, 1]`
    pub confidence: f64,
    pub reason: VerdictReason,
    /// Rule that fired, for whitelist and heuristic verdicts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    pub features: FeatureVector,
    pub assessed_at: DateTime<Utc>,
}

/// Caller-supplied details recorded next to a verdict.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssessmentContext {
    pub client_id: Option<String>,
    pub status_message: Option<String>,
}

impl AssessmentContext {
    pub fn for_client(client_id: impl Into<String>) -> Self {
        Self {
            client_id: Some(client_id.into()),
            status_message: None,
        }
    }

    pub fn status_for(&self, verdict: &Verdict) -> String {
        self.status_message
            .clone()
            .unwrap_or_else(|| verdict.reason.default_message().to_string())
    }
}

/// Destination for completed assessments. Failures never change the verdict.
pub trait VerdictSink: Send + Sync {
    fn record(&self, verdict: &Verdict, context: &AssessmentContext) -> Result<()>;
}
