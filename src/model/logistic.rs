//! L2-regularized logistic regression on standardized inputs, fitted by full-batch
//! gradient descent. Objective: `mean(w_i * logloss_i) + |coef|^2 / (2 * C * n)`.

use super::{ClassWeight, LogisticParams};
use crate::error::{Error, Result};
use ndarray::{Array1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

const LEARNING_RATE: f64 = 0.1;
const GRADIENT_TOL: f64 = 1e-5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    mean: Vec<f64>,
    scale: Vec<f64>,
    coef: Vec<f64>,
    intercept: f64,
    n_iter: usize,
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl LogisticRegression {
    pub fn fit(params: &LogisticParams, x: ArrayView2<'_, f64>, y: &[usize]) -> Result<Self> {
        if !(params.c.is_finite() && params.c > 0.0) {
            return Err(Error::training(format!("C must be positive, got {}", params.c)));
        }
        if params.max_iter == 0 {
            return Err(Error::training("max_iter must be at least 1"));
        }

        let n = x.nrows() as f64;
        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| Error::training("empty training matrix"))?;
        let scale = x.std_axis(Axis(0), 0.0).mapv(|s| if s > 0.0 { s } else { 1.0 });
        let z = (&x - &mean) / &scale;

        let targets: Array1<f64> = y.iter().map(|&l| l as f64).collect();
        let sample_weight: Array1<f64> = match params.class_weight {
            ClassWeight::Uniform => Array1::ones(y.len()),
            ClassWeight::Balanced => {
                let positives = targets.sum();
                let counts = [n - positives, positives];
                y.iter().map(|&l| n / (2.0 * counts[l])).collect()
            }
        };

        let mut coef = Array1::<f64>::zeros(x.ncols());
        let mut intercept = 0.0;
        let mut n_iter = 0;
        for _ in 0..params.max_iter {
            n_iter += 1;
            let proba = (z.dot(&coef) + intercept).mapv(sigmoid);
            let residual = (&proba - &targets) * &sample_weight;
            let grad_coef = z.t().dot(&residual) / n + &coef / (params.c * n);
            let grad_intercept = residual.sum() / n;

            coef.scaled_add(-LEARNING_RATE, &grad_coef);
            intercept -= LEARNING_RATE * grad_intercept;

            let max_grad = grad_coef
                .iter()
                .fold(grad_intercept.abs(), |m, g| m.max(g.abs()));
            if max_grad < GRADIENT_TOL {
                break;
            }
        }
        if !(intercept.is_finite() && coef.iter().all(|c| c.is_finite())) {
            return Err(Error::training("logistic regression diverged"));
        }

        Ok(Self {
            mean: mean.to_vec(),
            scale: scale.to_vec(),
            coef: coef.to_vec(),
            intercept,
            n_iter,
        })
    }

    pub fn n_features(&self) -> usize {
        self.coef.len()
    }

    /// Iterations run before convergence or `max_iter`.
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    pub fn predict_proba(&self, row: &[f64]) -> [f64; 2] {
        let logit = row
            .iter()
            .zip(&self.mean)
            .zip(&self.scale)
            .zip(&self.coef)
            .map(|(((v, m), s), w)| (v - m) / s * w)
            .sum::<f64>()
            + self.intercept;
        let p = sigmoid(logit);
        [1.0 - p, p]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_data::blobs;
    use ndarray::array;

    fn params(c: f64) -> LogisticParams {
        LogisticParams {
            c,
            max_iter: 500,
            class_weight: ClassWeight::Balanced,
        }
    }

    #[test]
    fn separates_blobs() {
        let (x, y) = blobs(40, 3);
        let m = LogisticRegression::fit(&params(1.0), x.view(), &y).unwrap();
        for (i, row) in x.rows().into_iter().enumerate() {
            let p = m.predict_proba(row.as_slice().unwrap());
            assert_eq!(if p[1] > p[0] { 1 } else { 0 }, y[i]);
        }
    }

    #[test]
    fn stronger_regularization_shrinks_coefficients() {
        let (x, y) = blobs(40, 3);
        let loose = LogisticRegression::fit(&params(1.0), x.view(), &y).unwrap();
        let tight = LogisticRegression::fit(&params(0.01), x.view(), &y).unwrap();
        let norm = |m: &LogisticRegression| m.coef.iter().map(|c| c * c).sum::<f64>();
        assert!(norm(&tight) < norm(&loose));
    }

    #[test]
    fn constant_column_does_not_divide_by_zero() {
        let x = array![[1.0, 0.0], [1.0, 1.0], [1.0, 2.0], [1.0, 3.0]];
        let m = LogisticRegression::fit(&params(1.0), x.view(), &[0, 0, 1, 1]).unwrap();
        let p = m.predict_proba(&[1.0, 3.0]);
        assert!(p[1] > 0.5);
    }

    #[test]
    fn iterations_are_capped_by_max_iter() {
        let (x, y) = blobs(20, 3);
        let p = LogisticParams {
            max_iter: 3,
            ..params(1.0)
        };
        let m = LogisticRegression::fit(&p, x.view(), &y).unwrap();
        assert!((1..=3).contains(&m.n_iter()));
        let full = LogisticRegression::fit(&params(1.0), x.view(), &y).unwrap();
        assert!(full.n_iter() <= 500);
    }

    #[test]
    fn rejects_bad_c() {
        let (x, y) = blobs(10, 2);
        assert!(LogisticRegression::fit(&params(0.0), x.view(), &y).is_err());
    }
}
