//! Sentinel configuration. Missing or unreadable files fall back to defaults.

use crate::model::{ClassWeight, ForestParams, HyperParams, LogisticParams};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelConfig {
    /// Data directory (verdict database, trained models)
    pub data_dir: PathBuf,
    /// Trained model artifact loaded at startup
    pub model_path: PathBuf,
    /// Optional lexicon override; built-in lists are used when absent
    pub lexicon_path: Option<PathBuf>,
    /// Heuristic override thresholds
    pub heuristics: HeuristicsConfig,
    /// Balancing, cross-validation, and hyperparameter grids
    pub training: TrainingConfig,
    /// Verdict persistence
    pub store: StoreConfig,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicsConfig {
    /// Confidence attached to whitelist and hard-flag verdicts
    pub override_confidence: f64,
    /// Confidence attached to fallback verdicts when no model is usable
    pub fallback_confidence: f64,
    /// URLs longer than this (in characters) are flagged
    pub max_url_length: usize,
    /// Hard flag when `suspicious_word_count` exceeds this
    pub hard_word_limit: f64,
    /// Fallback flag when `suspicious_word_count` exceeds this
    pub fallback_word_limit: f64,
    /// Case-insensitive terms that flag a URL wherever they appear
    pub sensitive_terms: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub seed: u64,
    /// Per-class size after balancing, as a share of the majority class
    pub balance_ratio: f64,
    pub folds: usize,
    /// Stratified share held out for the final evaluation
    pub holdout_fraction: f64,
    pub forest: ForestGrid,
    pub logistic: LogisticGrid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestGrid {
    pub n_estimators: Vec<usize>,
    pub max_depth: Vec<Option<usize>>,
    pub min_samples_split: Vec<usize>,
    pub min_samples_leaf: Vec<usize>,
    pub class_weight: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticGrid {
    pub c: Vec<f64>,
    pub max_iter: Vec<usize>,
    pub class_weight: Vec<ClassWeight>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub enabled: bool,
    /// Database file; defaults to `<data_dir>/url_checks.db`
    pub path: Option<PathBuf>,
    /// Environment variable holding the client-id encryption secret
    pub secret_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".url-sentinel"),
            model_path: PathBuf::from("models/best_model.json"),
            lexicon_path: None,
            heuristics: HeuristicsConfig::default(),
            training: TrainingConfig::default(),
            store: StoreConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for HeuristicsConfig {
    fn default() -> Self {
        Self {
            override_confidence: 0.95,
            fallback_confidence: 0.7,
            max_url_length: 100,
            hard_word_limit: 2.0,
            fallback_word_limit: 1.0,
            sensitive_terms: vec!["admin".into(), "password".into(), "login".into()],
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            balance_ratio: 0.75,
            folds: 5,
            holdout_fraction: 0.2,
            forest: ForestGrid::default(),
            logistic: LogisticGrid::default(),
        }
    }
}

impl Default for ForestGrid {
    fn default() -> Self {
        Self {
            n_estimators: vec![100],
            max_depth: vec![Some(30)],
            min_samples_split: vec![2],
            min_samples_leaf: vec![1],
            class_weight: vec![[1.0, 2.0]],
        }
    }
}

impl Default for LogisticGrid {
    fn default() -> Self {
        Self {
            c: vec![0.01, 0.1, 1.0],
            max_iter: vec![1000],
            class_weight: vec![ClassWeight::Balanced],
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
            secret_env: "URL_SENTINEL_STORE_SECRET".to_string(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl ForestGrid {
    /// Cartesian product in declaration order.
    pub fn expand(&self) -> Vec<HyperParams> {
        let mut out = Vec::new();
        for &n_estimators in &self.n_estimators {
            for &max_depth in &self.max_depth {
                for &min_samples_split in &self.min_samples_split {
                    for &min_samples_leaf in &self.min_samples_leaf {
                        for &class_weight in &self.class_weight {
                            out.push(HyperParams::RandomForest(ForestParams {
                                n_estimators,
                                max_depth,
                                min_samples_split,
                                min_samples_leaf,
                                class_weight,
                            }));
                        }
                    }
                }
            }
        }
        out
    }
}

impl LogisticGrid {
    /// Cartesian product in declaration order.
    pub fn expand(&self) -> Vec<HyperParams> {
        let mut out = Vec::new();
        for &c in &self.c {
            for &max_iter in &self.max_iter {
                for &class_weight in &self.class_weight {
                    out.push(HyperParams::LogisticRegression(LogisticParams {
                        c,
                        max_iter,
                        class_weight,
                    }));
                }
            }
        }
        out
    }
}

impl SentinelConfig {
    /// Load from JSON file if present; otherwise return default
    pub fn load(path: &std::path::Path) -> Self {
        if path.exists() {
            if let Ok(data) = std::fs::read_to_string(path) {
                match serde_json::from_str::<SentinelConfig>(&data) {
                    Ok(c) => return c,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "invalid config; using defaults")
                    }
                }
            }
        }
        Self::default()
    }

    pub fn store_path(&self) -> PathBuf {
        self.store
            .path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("url_checks.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grids_expand_in_order() {
        let cfg = TrainingConfig::default();
        assert_eq!(cfg.forest.expand().len(), 1);
        let lr = cfg.logistic.expand();
        assert_eq!(lr.len(), 3);
        match &lr[0] {
            HyperParams::LogisticRegression(p) => assert_eq!(p.c, 0.01),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let c: SentinelConfig =
            serde_json::from_str(r#"{"heuristics": {"max_url_length": 80}}"#).unwrap();
        assert_eq!(c.heuristics.max_url_length, 80);
        assert_eq!(c.heuristics.override_confidence, 0.95);
        assert_eq!(c.training.folds, 5);
    }
}
