//! Binary classification metrics: per-class precision/recall/F1, support-weighted F1,
//! confusion matrix.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    /// Indexed by label: 0 = benign, 1 = malicious
    pub classes: [ClassMetrics; 2],
    pub accuracy: f64,
    pub weighted_f1: f64,
    /// `confusion[actual][predicted]`
    pub confusion: [[usize; 2]; 2],
}

fn safe_div(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

impl ClassificationReport {
    pub fn from_predictions(y_true: &[usize], y_pred: &[usize]) -> Self {
        let mut confusion = [[0usize; 2]; 2];
        for (&t, &p) in y_true.iter().zip(y_pred) {
            confusion[t.min(1)][p.min(1)] += 1;
        }
        let mut classes = [ClassMetrics::default(); 2];
        for (c, m) in classes.iter_mut().enumerate() {
            let tp = confusion[c][c] as f64;
            let predicted = (confusion[0][c] + confusion[1][c]) as f64;
            let support = confusion[c][0] + confusion[c][1];
            m.precision = safe_div(tp, predicted);
            m.recall = safe_div(tp, support as f64);
            m.f1 = safe_div(2.0 * m.precision * m.recall, m.precision + m.recall);
            m.support = support;
        }
        let total = classes[0].support + classes[1].support;
        let weighted_f1 = safe_div(
            classes.iter().map(|m| m.f1 * m.support as f64).sum(),
            total as f64,
        );
        Self {
            classes,
            accuracy: safe_div((confusion[0][0] + confusion[1][1]) as f64, total as f64),
            weighted_f1,
            confusion,
        }
    }
}

/// Support-weighted mean of per-class F1.
pub fn weighted_f1(y_true: &[usize], y_pred: &[usize]) -> f64 {
    ClassificationReport::from_predictions(y_true, y_pred).weighted_f1
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>12} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        for (name, m) in ["benign", "malicious"].iter().zip(&self.classes) {
            writeln!(
                f,
                "{:>12} {:>9.4} {:>9.4} {:>9.4} {:>9}",
                name, m.precision, m.recall, m.f1, m.support
            )?;
        }
        writeln!(f, "{:>12} {:>29.4}", "accuracy", self.accuracy)?;
        writeln!(f, "{:>12} {:>29.4}", "weighted f1", self.weighted_f1)?;
        write!(
            f,
            "confusion [[tn={} fp={}] [fn={} tp={}]]",
            self.confusion[0][0], self.confusion[0][1], self.confusion[1][0], self.confusion[1][1]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_predictions() {
        let y = [0, 1, 1, 0];
        let r = ClassificationReport::from_predictions(&y, &y);
        assert_eq!(r.accuracy, 1.0);
        assert_eq!(r.weighted_f1, 1.0);
        assert_eq!(r.confusion, [[2, 0], [0, 2]]);
    }

    #[test]
    fn weighted_by_support() {
        // class 0: tp=3 fp=1 fn=0 -> p=0.75 r=1 f1=6/7; class 1: tp=1 fp=0 fn=1 -> p=1 r=0.5 f1=2/3
        let y_true = [0, 0, 0, 1, 1];
        let y_pred = [0, 0, 0, 0, 1];
        let r = ClassificationReport::from_predictions(&y_true, &y_pred);
        let expected = (3.0 * (6.0 / 7.0) + 2.0 * (2.0 / 3.0)) / 5.0;
        assert!((r.weighted_f1 - expected).abs() < 1e-12);
        assert_eq!(r.classes[1].support, 2);
        assert_eq!(r.confusion[1][0], 1);
    }

    #[test]
    fn never_predicted_class_scores_zero_not_nan() {
        let r = ClassificationReport::from_predictions(&[0, 1], &[0, 0]);
        assert_eq!(r.classes[1].precision, 0.0);
        assert_eq!(r.classes[1].f1, 0.0);
        assert!(r.weighted_f1.is_finite());
        assert!(!r.to_string().is_empty());
    }
}
