//! Offline training: labeled URLs → features → balanced set → model selection → artifact.

mod balance;
pub mod cv;
mod metrics;
mod select;

pub use balance::{BalancedDataset, DatasetBalancer};
pub use metrics::{weighted_f1, ClassMetrics, ClassificationReport};
pub use select::{Candidate, FamilyReport, GridPoint, ModelSelector, SelectionReport};

use crate::config::TrainingConfig;
use crate::error::{Error, Result};
use crate::features::{FeatureExtractor, FeatureVector, FEATURE_COUNT};
use crate::model::TrainedModel;
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// One row of the raw corpus: a URL and its free-text category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawLabeledUrl {
    pub url: String,
    #[serde(rename = "type", alias = "category")]
    pub category: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledExample {
    pub features: FeatureVector,
    /// 0 = benign, 1 = malicious
    pub label: usize,
}

/// Map a corpus category to a label; unknown categories are `None`.
pub fn label_for_category(category: &str) -> Option<usize> {
    match category.trim().to_ascii_lowercase().as_str() {
        "benign" => Some(0),
        "phishing" | "malicious" | "defacement" | "malware" => Some(1),
        _ => None,
    }
}

/// Extract features for every mappable row; unmapped rows are dropped.
pub fn label_examples(extractor: &FeatureExtractor, raw: &[RawLabeledUrl]) -> Vec<LabeledExample> {
    let kept: Vec<(&str, usize)> = raw
        .iter()
        .filter_map(|r| label_for_category(&r.category).map(|l| (r.url.as_str(), l)))
        .collect();
    let dropped = raw.len() - kept.len();
    if dropped > 0 {
        warn!(dropped, "rows with unmapped categories dropped");
    }
    let urls: Vec<&str> = kept.iter().map(|(u, _)| *u).collect();
    extractor
        .extract_batch(&urls)
        .into_iter()
        .zip(kept)
        .map(|(features, (_, label))| LabeledExample { features, label })
        .collect()
}

/// Feature matrix plus labels, row-aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub x: Array2<f64>,
    pub y: Vec<usize>,
}

impl Dataset {
    pub fn from_examples(examples: &[LabeledExample]) -> Self {
        let mut x = Array2::zeros((examples.len(), FEATURE_COUNT));
        for (mut row, e) in x.axis_iter_mut(Axis(0)).zip(examples) {
            for (dst, src) in row.iter_mut().zip(e.features.as_slice()) {
                *dst = *src;
            }
        }
        Self {
            x,
            y: examples.iter().map(|e| e.label).collect(),
        }
    }

    pub fn subset(&self, rows: &[usize]) -> Self {
        Self {
            x: self.x.select(Axis(0), rows),
            y: rows.iter().map(|&i| self.y[i]).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }
}

impl From<&BalancedDataset> for Dataset {
    fn from(balanced: &BalancedDataset) -> Self {
        Dataset::from_examples(&balanced.examples)
    }
}

/// Everything a training run produces.
#[derive(Debug, Clone)]
pub struct TrainingRun {
    pub model: TrainedModel,
    pub selection: SelectionReport,
    /// Winner scored on the stratified holdout; `None` when no holdout was configured
    pub evaluation: Option<ClassificationReport>,
    pub balanced_counts: [usize; 2],
    pub dropped_rows: usize,
}

/// Full pipeline: label + extract, balance, hold out, select, evaluate.
pub fn train(
    raw: &[RawLabeledUrl],
    extractor: &FeatureExtractor,
    config: &TrainingConfig,
) -> Result<TrainingRun> {
    let examples = label_examples(extractor, raw);
    let dropped_rows = raw.len() - examples.len();
    if examples.is_empty() {
        return Err(Error::invalid_dataset("no labeled rows"));
    }

    let balanced = DatasetBalancer::from_config(config).balance(examples)?;
    let balanced_counts = balanced.class_counts();
    let data = Dataset::from(&balanced);

    let (fit_data, holdout) = if config.holdout_fraction > 0.0 {
        let (train_rows, test_rows) =
            cv::stratified_holdout(&data.y, config.holdout_fraction, config.seed)?;
        (data.subset(&train_rows), Some(data.subset(&test_rows)))
    } else {
        (data, None)
    };
    info!(
        train_rows = fit_data.len(),
        holdout_rows = holdout.as_ref().map_or(0, |h| h.len()),
        "training split ready"
    );

    let (model, selection) = ModelSelector::from_config(config).select(&fit_data)?;

    let evaluation = holdout
        .map(|test| evaluate(&model, &test))
        .transpose()?;
    if let Some(report) = &evaluation {
        info!(
            accuracy = report.accuracy,
            weighted_f1 = report.weighted_f1,
            "holdout evaluation"
        );
    }

    Ok(TrainingRun {
        model,
        selection,
        evaluation,
        balanced_counts,
        dropped_rows,
    })
}

/// Score a trained model on labeled rows.
pub fn evaluate(model: &TrainedModel, data: &Dataset) -> Result<ClassificationReport> {
    let predictions = data
        .x
        .rows()
        .into_iter()
        .map(|row| model.estimator.predict(&row.to_vec()))
        .collect::<Result<Vec<_>>>()?;
    Ok(ClassificationReport::from_predictions(&data.y, &predictions))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_mapping() {
        assert_eq!(label_for_category("benign"), Some(0));
        assert_eq!(label_for_category(" Phishing "), Some(1));
        assert_eq!(label_for_category("defacement"), Some(1));
        assert_eq!(label_for_category("malware"), Some(1));
        assert_eq!(label_for_category("spam"), None);
    }

    #[test]
    fn unmapped_rows_are_dropped() {
        let raw = vec![
            RawLabeledUrl {
                url: "http://a.com".into(),
                category: "benign".into(),
            },
            RawLabeledUrl {
                url: "http://b.com".into(),
                category: "unknown".into(),
            },
        ];
        let rows = label_examples(&FeatureExtractor::default(), &raw);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].label, 0);
    }

    #[test]
    fn raw_rows_parse_from_corpus_json() {
        let r: RawLabeledUrl =
            serde_json::from_str(r#"{"url": "http://x.io", "type": "phishing"}"#).unwrap();
        assert_eq!(r.category, "phishing");
    }

    #[test]
    fn dataset_subset_keeps_alignment() {
        let ex = FeatureExtractor::default();
        let examples: Vec<LabeledExample> = ["a", "bb", "ccc"]
            .iter()
            .enumerate()
            .map(|(i, u)| LabeledExample {
                features: ex.extract(u),
                label: i % 2,
            })
            .collect();
        let data = Dataset::from_examples(&examples);
        assert_eq!(data.x.dim(), (3, FEATURE_COUNT));
        let sub = data.subset(&[2, 0]);
        assert_eq!(sub.y, vec![0, 0]);
        assert_eq!(sub.x[[0, 0]], 3.0);
    }
}
