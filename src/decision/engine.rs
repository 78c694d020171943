//! Inference orchestrator. One run per URL through a fixed sequence of stages:
//! features, whitelist, hard flags, model, and the heuristic fallback when no model answers.

use super::verdict::{AssessmentContext, Verdict, VerdictReason, VerdictSink};
use crate::config::SentinelConfig;
use crate::features::{FeatureExtractor, FeatureVector, Lexicon};
use crate::heuristics::{HeuristicEngine, HeuristicVerdict};
use crate::model::ModelSlot;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Answer carried into [`Stage::Done`].
#[derive(Debug, Clone, PartialEq)]
struct Outcome {
    is_malicious: bool,
    confidence: f64,
    reason: VerdictReason,
    rule: Option<String>,
}

impl From<HeuristicVerdict> for Outcome {
    fn from(v: HeuristicVerdict) -> Self {
        Self {
            is_malicious: v.is_malicious,
            confidence: v.confidence,
            reason: v.reason,
            rule: v.rule,
        }
    }
}

/// Pipeline states. Transitions only move forward; `Done` is terminal.
#[derive(Debug)]
enum Stage {
    Start,
    Features,
    Whitelist(FeatureVector),
    Heuristic(FeatureVector),
    Model(FeatureVector),
    ModelUnavailable(FeatureVector, String),
    FallbackHeuristic(FeatureVector),
    Done(Outcome, FeatureVector),
}

pub struct DecisionEngine {
    extractor: FeatureExtractor,
    heuristics: HeuristicEngine,
    model: Arc<ModelSlot>,
    sink: Option<Arc<dyn VerdictSink>>,
}

impl DecisionEngine {
    pub fn new(extractor: FeatureExtractor, heuristics: HeuristicEngine, model: Arc<ModelSlot>) -> Self {
        Self {
            extractor,
            heuristics,
            model,
            sink: None,
        }
    }

    /// Extractor and rule engine share one lexicon.
    pub fn from_config(config: &SentinelConfig, lexicon: Arc<Lexicon>, model: Arc<ModelSlot>) -> Self {
        Self::new(
            FeatureExtractor::new(lexicon.clone()),
            HeuristicEngine::new(config.heuristics.clone(), lexicon),
            model,
        )
    }

    pub fn with_sink(mut self, sink: Arc<dyn VerdictSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn model_slot(&self) -> &Arc<ModelSlot> {
        &self.model
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    pub fn assess(&self, url: &str) -> Verdict {
        self.assess_with_context(url, &AssessmentContext::default())
    }

    /// Always returns exactly one verdict. A failing sink is logged and ignored.
    pub fn assess_with_context(&self, url: &str, context: &AssessmentContext) -> Verdict {
        let verdict = self.run(url);
        debug!(
            url,
            malicious = verdict.is_malicious,
            confidence = verdict.confidence,
            reason = %verdict.reason,
            "url assessed"
        );
        if let Some(sink) = &self.sink {
            if let Err(e) = sink.record(&verdict, context) {
                warn!(url, error = %e, "failed to record verdict");
            }
        }
        verdict
    }

    fn run(&self, url: &str) -> Verdict {
        let mut stage = Stage::Start;
        loop {
            stage = match stage {
                Stage::Start => Stage::Features,
                Stage::Features => Stage::Whitelist(self.extractor.extract(url)),
                Stage::Whitelist(features) => match self.heuristics.check_whitelist(url, &features) {
                    Some(v) => Stage::Done(v.into(), features),
                    None => Stage::Heuristic(features),
                },
                Stage::Heuristic(features) => match self.heuristics.check_hard_flags(url, &features) {
                    Some(v) => Stage::Done(v.into(), features),
                    None => Stage::Model(features),
                },
                Stage::Model(features) => self.model_stage(features),
                Stage::ModelUnavailable(features, cause) => {
                    debug!(url, cause = %cause, "model unavailable; using heuristic fallback");
                    Stage::FallbackHeuristic(features)
                }
                Stage::FallbackHeuristic(features) => {
                    let v = self.heuristics.fallback(url, &features);
                    Stage::Done(v.into(), features)
                }
                Stage::Done(outcome, features) => {
                    return Verdict {
                        id: Uuid::new_v4(),
                        url: url.to_string(),
                        is_malicious: outcome.is_malicious,
                        confidence: outcome.confidence.clamp(0.0, 1.0),
                        reason: outcome.reason,
                        rule: outcome.rule,
                        features,
                        assessed_at: Utc::now(),
                    }
                }
            };
        }
    }

    fn model_stage(&self, features: FeatureVector) -> Stage {
        let model = match self.model.current() {
            Some(m) => m,
            None => return Stage::ModelUnavailable(features, "no model loaded".to_string()),
        };
        match model.predict(&features) {
            Ok((is_malicious, confidence)) => Stage::Done(
                Outcome {
                    is_malicious,
                    confidence,
                    reason: VerdictReason::Model,
                    rule: None,
                },
                features,
            ),
            Err(e) => {
                warn!(family = %model.family, error = %e, "model prediction failed");
                Stage::ModelUnavailable(features, e.to_string())
            }
        }
    }
}
