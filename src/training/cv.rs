//! Deterministic stratified splits and k-fold cross-validation.

use super::metrics::weighted_f1;
use super::Dataset;
use crate::error::{Error, Result};
use crate::model::{Estimator, HyperParams};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Stratified k-fold without shuffling: each class's rows are dealt round-robin to
/// folds in their original order.
pub fn stratified_k_fold(y: &[usize], k: usize) -> Result<Vec<Fold>> {
    if k < 2 {
        return Err(Error::invalid_dataset(format!("need at least 2 folds, got {}", k)));
    }
    let mut tests: Vec<Vec<usize>> = vec![Vec::new(); k];
    for class in 0..2 {
        let members: Vec<usize> = (0..y.len()).filter(|&i| y[i] == class).collect();
        if members.len() < k {
            return Err(Error::invalid_dataset(format!(
                "class {} has {} rows, fewer than {} folds",
                class,
                members.len(),
                k
            )));
        }
        for (pos, idx) in members.into_iter().enumerate() {
            tests[pos % k].push(idx);
        }
    }
    Ok(tests
        .into_iter()
        .map(|mut test| {
            test.sort_unstable();
            let mut in_test = vec![false; y.len()];
            for &i in &test {
                in_test[i] = true;
            }
            let train = (0..y.len()).filter(|&i| !in_test[i]).collect();
            Fold { train, test }
        })
        .collect())
}

/// Seeded stratified split; returns `(train, test)` row indices, both sorted.
pub fn stratified_holdout(y: &[usize], fraction: f64, seed: u64) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(fraction > 0.0 && fraction < 1.0) {
        return Err(Error::invalid_dataset(format!(
            "holdout fraction must be within (0, 1), got {}",
            fraction
        )));
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let (mut train, mut test) = (Vec::new(), Vec::new());
    for class in 0..2 {
        let mut members: Vec<usize> = (0..y.len()).filter(|&i| y[i] == class).collect();
        if members.len() < 2 {
            return Err(Error::invalid_dataset(format!(
                "class {} needs at least 2 rows for a holdout split",
                class
            )));
        }
        members.shuffle(&mut rng);
        let n_test = ((members.len() as f64 * fraction).round() as usize).clamp(1, members.len() - 1);
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }
    train.sort_unstable();
    test.sort_unstable();
    Ok((train, test))
}

/// Per-fold weighted-F1 scores for one hyperparameter setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvScores {
    pub scores: Vec<f64>,
}

impl CvScores {
    pub fn mean(&self) -> f64 {
        if self.scores.is_empty() {
            return 0.0;
        }
        self.scores.iter().sum::<f64>() / self.scores.len() as f64
    }

    /// Population standard deviation.
    pub fn std(&self) -> f64 {
        if self.scores.is_empty() {
            return 0.0;
        }
        let m = self.mean();
        let var = self.scores.iter().map(|s| (s - m).powi(2)).sum::<f64>() / self.scores.len() as f64;
        var.sqrt()
    }
}

/// Fit on each fold's train rows and score weighted F1 on its test rows.
pub fn fold_score(params: &HyperParams, data: &Dataset, fold: &Fold, seed: u64) -> Result<f64> {
    let train = data.subset(&fold.train);
    let estimator = Estimator::fit(params, train.x.view(), &train.y, seed)?;
    let test = data.subset(&fold.test);
    let predictions = test
        .x
        .rows()
        .into_iter()
        .map(|row| estimator.predict(&row.to_vec()))
        .collect::<Result<Vec<_>>>()?;
    Ok(weighted_f1(&test.y, &predictions))
}

pub fn cross_validate(params: &HyperParams, data: &Dataset, folds: &[Fold], seed: u64) -> Result<CvScores> {
    let scores = folds
        .par_iter()
        .map(|fold| fold_score(params, data, fold, seed))
        .collect::<Result<Vec<_>>>()?;
    Ok(CvScores { scores })
}
