//! Classifier families, the trained-model artifact, and the shared model slot.
//! Input: one row of [`FEATURE_COUNT`](crate::features::FEATURE_COUNT) f64 values.
//! Output: `[p(benign), p(malicious)]`.

mod artifact;
mod forest;
mod logistic;
mod slot;

pub use artifact::{TrainedModel, ARTIFACT_FORMAT, ARTIFACT_MAGIC};
pub use forest::{DecisionTree, RandomForest};
pub use logistic::LogisticRegression;
pub use slot::ModelSlot;

use crate::error::{Error, Result};
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    RandomForest,
    LogisticRegression,
}

impl ModelFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFamily::RandomForest => "random_forest",
            ModelFamily::LogisticRegression => "logistic_regression",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassWeight {
    Uniform,
    /// `n_samples / (n_classes * class_count)`
    Balanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Per-class sample weight, indexed by label
    pub class_weight: [f64; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogisticParams {
    /// Inverse L2 regularization strength
    pub c: f64,
    pub max_iter: usize,
    pub class_weight: ClassWeight,
}

/// One point of a hyperparameter grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum HyperParams {
    RandomForest(ForestParams),
    LogisticRegression(LogisticParams),
}

impl HyperParams {
    pub fn family(&self) -> ModelFamily {
        match self {
            HyperParams::RandomForest(_) => ModelFamily::RandomForest,
            HyperParams::LogisticRegression(_) => ModelFamily::LogisticRegression,
        }
    }
}

impl fmt::Display for HyperParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HyperParams::RandomForest(p) => write!(
                f,
                "n_estimators={} max_depth={:?} min_samples_split={} min_samples_leaf={} class_weight={:?}",
                p.n_estimators, p.max_depth, p.min_samples_split, p.min_samples_leaf, p.class_weight
            ),
            HyperParams::LogisticRegression(p) => write!(
                f,
                "C={} max_iter={} class_weight={:?}",
                p.c, p.max_iter, p.class_weight
            ),
        }
    }
}

/// A fitted model of any family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    RandomForest(RandomForest),
    LogisticRegression(LogisticRegression),
}

impl Estimator {
    pub fn fit(params: &HyperParams, x: ArrayView2<'_, f64>, y: &[usize], seed: u64) -> Result<Self> {
        check_training_set(x, y)?;
        Ok(match params {
            HyperParams::RandomForest(p) => Estimator::RandomForest(RandomForest::fit(p, x, y, seed)?),
            HyperParams::LogisticRegression(p) => {
                Estimator::LogisticRegression(LogisticRegression::fit(p, x, y)?)
            }
        })
    }

    pub fn n_features(&self) -> usize {
        match self {
            Estimator::RandomForest(m) => m.n_features(),
            Estimator::LogisticRegression(m) => m.n_features(),
        }
    }

    pub fn predict_proba(&self, row: &[f64]) -> Result<[f64; 2]> {
        if row.len() != self.n_features() {
            return Err(Error::unavailable(format!(
                "estimator expects {} features, got {}",
                self.n_features(),
                row.len()
            )));
        }
        let p = match self {
            Estimator::RandomForest(m) => m.predict_proba(row),
            Estimator::LogisticRegression(m) => m.predict_proba(row),
        };
        if !(p[0].is_finite() && p[1].is_finite()) {
            return Err(Error::unavailable("estimator produced non-finite probabilities"));
        }
        Ok(p)
    }

    /// Predicted label; ties go to the benign class.
    pub fn predict(&self, row: &[f64]) -> Result<usize> {
        let p = self.predict_proba(row)?;
        Ok(if p[1] > p[0] { 1 } else { 0 })
    }
}

fn check_training_set(x: ArrayView2<'_, f64>, y: &[usize]) -> Result<()> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(Error::training("empty training matrix"));
    }
    if x.nrows() != y.len() {
        return Err(Error::training(format!(
            "{} rows but {} labels",
            x.nrows(),
            y.len()
        )));
    }
    if let Some(bad) = y.iter().find(|&&l| l > 1) {
        return Err(Error::training(format!("label {} is not binary", bad)));
    }
    if !y.contains(&0) || !y.contains(&1) {
        return Err(Error::training("training set must contain both classes"));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(Error::training("training matrix contains non-finite values"));
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn rejects_single_class() {
        let x = Array2::<f64>::zeros((4, 2));
        let params = HyperParams::LogisticRegression(LogisticParams {
            c: 1.0,
            max_iter: 10,
            class_weight: ClassWeight::Uniform,
        });
        let err = Estimator::fit(&params, x.view(), &[0, 0, 0, 0], 1).unwrap_err();
        assert!(matches!(err, Error::Training(_)));
    }

    #[test]
    fn wrong_width_is_unavailable() {
        let (x, y) = test_data::blobs(20, 3);
        let params = HyperParams::LogisticRegression(LogisticParams {
            c: 1.0,
            max_iter: 50,
            class_weight: ClassWeight::Uniform,
        });
        let est = Estimator::fit(&params, x.view(), &y, 1).unwrap();
        assert!(matches!(est.predict_proba(&[0.0; 2]), Err(Error::ModelUnavailable(_))));
    }

    #[test]
    fn hyperparams_serialize_with_family_tag() {
        let p = HyperParams::RandomForest(ForestParams {
            n_estimators: 3,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            class_weight: [1.0, 2.0],
        });
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains(r#""family":"random_forest""#));
        assert_eq!(serde_json::from_str::<HyperParams>(&json).unwrap(), p);
        assert_eq!(p.family().to_string(), "random_forest");
    }
}
