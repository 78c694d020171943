//! Model selection: exhaustive grid search per family with stratified k-fold CV scored by
//! weighted F1, a stability re-run of each family's best setting, and a deterministic pick.

use super::cv::{cross_validate, fold_score, stratified_k_fold, Fold};
use super::Dataset;
use crate::config::TrainingConfig;
use crate::error::{Error, Result};
use crate::model::{Estimator, HyperParams, ModelFamily, TrainedModel};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// One model family and the grid to search for it.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub family: ModelFamily,
    pub grid: Vec<HyperParams>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    pub params: HyperParams,
    pub mean_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyReport {
    pub family: ModelFamily,
    pub best_params: HyperParams,
    /// Stability re-run of the best setting
    pub cv_mean: f64,
    pub cv_std: f64,
    pub grid: Vec<GridPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionReport {
    pub winner: ModelFamily,
    pub families: Vec<FamilyReport>,
    /// Families excluded because a fit failed
    pub failures: Vec<(ModelFamily, String)>,
}

struct Survivor {
    report: FamilyReport,
    estimator: Estimator,
}

pub struct ModelSelector {
    candidates: Vec<Candidate>,
    folds: usize,
    seed: u64,
}

impl ModelSelector {
    pub fn new(candidates: Vec<Candidate>, folds: usize, seed: u64) -> Self {
        Self {
            candidates,
            folds,
            seed,
        }
    }

    /// Random forest first, then logistic regression; declaration order breaks ties.
    pub fn from_config(config: &TrainingConfig) -> Self {
        Self::new(
            vec![
                Candidate {
                    family: ModelFamily::RandomForest,
                    grid: config.forest.expand(),
                },
                Candidate {
                    family: ModelFamily::LogisticRegression,
                    grid: config.logistic.expand(),
                },
            ],
            config.folds,
            config.seed,
        )
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn select(&self, data: &Dataset) -> Result<(TrainedModel, SelectionReport)> {
        let folds = stratified_k_fold(&data.y, self.folds)?;

        // every (family, setting, fold) fit is independent
        let n_folds = folds.len();
        let jobs: Vec<(usize, usize, usize)> = self
            .candidates
            .iter()
            .enumerate()
            .flat_map(|(c, cand)| {
                (0..cand.grid.len()).flat_map(move |p| (0..n_folds).map(move |f| (c, p, f)))
            })
            .collect();
        let scores: Vec<Result<f64>> = jobs
            .par_iter()
            .map(|&(c, p, f)| fold_score(&self.candidates[c].grid[p], data, &folds[f], self.seed))
            .collect();

        let searched: Vec<std::result::Result<Vec<GridPoint>, String>> = self
            .candidates
            .iter()
            .enumerate()
            .map(|(c, cand)| self.collect_grid(c, cand, &jobs, &scores))
            .collect();

        let outcomes: Vec<std::result::Result<Survivor, String>> = self
            .candidates
            .par_iter()
            .zip(searched)
            .map(|(cand, grid)| self.finish_family(cand, grid?, data, &folds))
            .collect();

        let mut survivors = Vec::new();
        let mut failures = Vec::new();
        for (cand, outcome) in self.candidates.iter().zip(outcomes) {
            match outcome {
                Ok(s) => {
                    info!(
                        family = %cand.family,
                        params = %s.report.best_params,
                        cv_mean = s.report.cv_mean,
                        cv_std = s.report.cv_std,
                        "family evaluated"
                    );
                    survivors.push(s);
                }
                Err(e) => {
                    warn!(family = %cand.family, error = %e, "family excluded from selection");
                    failures.push((cand.family, e));
                }
            }
        }

        let winner = pick_winner(&survivors).ok_or_else(|| Error::NoViableModel {
            failures: failures.clone(),
        })?;
        let best = &survivors[winner];
        info!(
            family = %best.report.family,
            params = %best.report.best_params,
            cv_mean = best.report.cv_mean,
            "model selected"
        );
        let model = TrainedModel::new(
            best.report.best_params,
            best.report.cv_mean,
            best.report.cv_std,
            best.estimator.clone(),
        );
        let report = SelectionReport {
            winner: best.report.family,
            families: survivors.into_iter().map(|s| s.report).collect(),
            failures,
        };
        Ok((model, report))
    }

    /// Mean fold score per grid point, or the first fit error of the family.
    fn collect_grid(
        &self,
        c: usize,
        cand: &Candidate,
        jobs: &[(usize, usize, usize)],
        scores: &[Result<f64>],
    ) -> std::result::Result<Vec<GridPoint>, String> {
        if cand.grid.is_empty() {
            return Err("empty hyperparameter grid".to_string());
        }
        if let Some(bad) = cand.grid.iter().find(|p| p.family() != cand.family) {
            return Err(format!("grid contains {} parameters", bad.family()));
        }
        let mut sums = vec![0.0; cand.grid.len()];
        for (&(jc, p, _), score) in jobs.iter().zip(scores) {
            if jc != c {
                continue;
            }
            match score {
                Ok(s) => sums[p] += s,
                Err(e) => return Err(e.to_string()),
            }
        }
        let k = (jobs.iter().filter(|j| j.0 == c).count() / cand.grid.len()) as f64;
        Ok(cand
            .grid
            .iter()
            .zip(sums)
            .map(|(params, sum)| GridPoint {
                params: *params,
                mean_score: sum / k,
            })
            .collect())
    }

    /// Best grid point (first on ties), its stability CV, and the refit on all rows.
    fn finish_family(
        &self,
        cand: &Candidate,
        grid: Vec<GridPoint>,
        data: &Dataset,
        folds: &[Fold],
    ) -> std::result::Result<Survivor, String> {
        let mut best = &grid[0];
        for point in &grid[1..] {
            if point.mean_score > best.mean_score {
                best = point;
            }
        }
        let params = best.params;
        let stability = cross_validate(&params, data, folds, self.seed).map_err(|e| e.to_string())?;
        let estimator =
            Estimator::fit(&params, data.x.view(), &data.y, self.seed).map_err(|e| e.to_string())?;
        Ok(Survivor {
            report: FamilyReport {
                family: cand.family,
                best_params: params,
                cv_mean: stability.mean(),
                cv_std: stability.std(),
                grid,
            },
            estimator,
        })
    }
}

/// Highest mean; ties broken by lower std, then declaration order.
fn pick_winner(survivors: &[Survivor]) -> Option<usize> {
    let mut winner: Option<usize> = None;
    for (i, s) in survivors.iter().enumerate() {
        let better = match winner {
            None => true,
            Some(w) => {
                let cur = &survivors[w].report;
                s.report.cv_mean > cur.cv_mean
                    || (s.report.cv_mean == cur.cv_mean && s.report.cv_std < cur.cv_std)
            }
        };
        if better {
            winner = Some(i);
        }
    }
    winner
}
