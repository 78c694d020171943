//! Bagged CART ensemble. Each tree is grown on a bootstrap sample with Gini impurity,
//! class-weighted, drawing `sqrt(n_features)` candidate features per split.

use super::ForestParams;
use crate::error::{Error, Result};
use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
enum Node {
    Leaf {
        proba: [f64; 2],
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    pub fn predict_proba(&self, row: &[f64]) -> [f64; 2] {
        let mut i = 0;
        loop {
            match &self.nodes[i] {
                Node::Leaf { proba } => return *proba,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => i = if row[*feature] <= *threshold { *left } else { *right },
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], i: usize) -> usize {
            match &nodes[i] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn fit(params: &ForestParams, x: ArrayView2<'_, f64>, y: &[usize], seed: u64) -> Result<Self> {
        if params.n_estimators == 0 {
            return Err(Error::training("n_estimators must be at least 1"));
        }
        if params.min_samples_split < 2 || params.min_samples_leaf < 1 {
            return Err(Error::training(
                "min_samples_split must be >= 2 and min_samples_leaf >= 1",
            ));
        }
        if params.class_weight.iter().any(|w| !(w.is_finite() && *w > 0.0)) {
            return Err(Error::training("class weights must be positive"));
        }

        let n = x.nrows();
        let max_features = ((x.ncols() as f64).sqrt() as usize).max(1);
        let trees = (0..params.n_estimators)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(t as u64));
                let mut counts = vec![0u32; n];
                for _ in 0..n {
                    counts[rng.gen_range(0..n)] += 1;
                }
                let samples: Vec<usize> = (0..n).filter(|&i| counts[i] > 0).collect();
                let weights: Vec<f64> = (0..n)
                    .map(|i| counts[i] as f64 * params.class_weight[y[i]])
                    .collect();
                let mut builder = TreeBuilder {
                    x,
                    y,
                    weights: &weights,
                    params,
                    max_features,
                    rng,
                    nodes: Vec::new(),
                };
                builder.grow(samples, 0);
                DecisionTree {
                    nodes: builder.nodes,
                }
            })
            .collect();

        Ok(Self {
            n_features: x.ncols(),
            trees,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Mean of per-tree leaf distributions.
    pub fn predict_proba(&self, row: &[f64]) -> [f64; 2] {
        let mut acc = [0.0; 2];
        for tree in &self.trees {
            let p = tree.predict_proba(row);
            acc[0] += p[0];
            acc[1] += p[1];
        }
        let k = self.trees.len().max(1) as f64;
        [acc[0] / k, acc[1] / k]
    }
}

#[derive(Debug, Clone, Copy)]
struct Split {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

struct TreeBuilder<'a, 'x> {
    x: ArrayView2<'x, f64>,
    y: &'a [usize],
    weights: &'a [f64],
    params: &'a ForestParams,
    max_features: usize,
    rng: StdRng,
    nodes: Vec<Node>,
}

fn gini(w: [f64; 2]) -> f64 {
    let total = w[0] + w[1];
    if total <= 0.0 {
        return 0.0;
    }
    let (p0, p1) = (w[0] / total, w[1] / total);
    1.0 - p0 * p0 - p1 * p1
}

fn normalize(w: [f64; 2]) -> [f64; 2] {
    let total = w[0] + w[1];
    if total <= 0.0 {
        [0.5, 0.5]
    } else {
        [w[0] / total, w[1] / total]
    }
}

impl TreeBuilder<'_, '_> {
    fn class_totals(&self, samples: &[usize]) -> [f64; 2] {
        let mut t = [0.0; 2];
        for &i in samples {
            t[self.y[i]] += self.weights[i];
        }
        t
    }

    fn grow(&mut self, samples: Vec<usize>, depth: usize) -> usize {
        let totals = self.class_totals(&samples);
        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf {
            proba: normalize(totals),
        });

        let depth_left = self.params.max_depth.map_or(true, |m| depth < m);
        let pure = totals[0] <= 0.0 || totals[1] <= 0.0;
        if !depth_left || pure || samples.len() < self.params.min_samples_split {
            return idx;
        }
        let Some(split) = self.best_split(&samples, totals) else {
            return idx;
        };

        let x = self.x;
        let (left, right): (Vec<usize>, Vec<usize>) = samples
            .into_iter()
            .partition(|&i| x[[i, split.feature]] <= split.threshold);
        let left = self.grow(left, depth + 1);
        let right = self.grow(right, depth + 1);
        self.nodes[idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        idx
    }

    /// Lowest weighted child impurity over the candidate features. Features beyond
    /// `max_features` are only visited while no valid split has been found.
    fn best_split(&mut self, samples: &[usize], totals: [f64; 2]) -> Option<Split> {
        let x = self.x;
        let min_leaf = self.params.min_samples_leaf;
        let parent = gini(totals) * (totals[0] + totals[1]);

        let mut features: Vec<usize> = (0..x.ncols()).collect();
        features.shuffle(&mut self.rng);

        let mut order = samples.to_vec();
        let n = order.len();
        let mut best: Option<Split> = None;
        for (visited, &f) in features.iter().enumerate() {
            if visited >= self.max_features && best.is_some() {
                break;
            }
            order.sort_by(|&a, &b| x[[a, f]].total_cmp(&x[[b, f]]));
            let mut left = [0.0; 2];
            for k in 0..n - 1 {
                let i = order[k];
                left[self.y[i]] += self.weights[i];
                let (v, next) = (x[[i, f]], x[[order[k + 1], f]]);
                if v >= next || k + 1 < min_leaf || n - (k + 1) < min_leaf {
                    continue;
                }
                let right = [totals[0] - left[0], totals[1] - left[1]];
                let impurity =
                    gini(left) * (left[0] + left[1]) + gini(right) * (right[0] + right[1]);
                if best.map_or(true, |b| impurity < b.impurity) {
                    let mid = v + (next - v) / 2.0;
                    best = Some(Split {
                        feature: f,
                        threshold: if mid < next { mid } else { v },
                        impurity,
                    });
                }
            }
        }
        best.filter(|b| b.impurity < parent - 1e-12)
    }
}
