//! Class balancing: downsample benign rows without replacement and upsample malicious
//! rows with replacement to the same target size, then shuffle. Seeded throughout.

use super::LabeledExample;
use crate::config::TrainingConfig;
use crate::error::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::{index, SliceRandom};
use rand::{Rng, SeedableRng};
use tracing::info;

/// Balanced rows in shuffled order. Upsampled rows may repeat.
#[derive(Debug, Clone)]
pub struct BalancedDataset {
    pub examples: Vec<LabeledExample>,
}

impl BalancedDataset {
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// `[benign, malicious]` row counts
    pub fn class_counts(&self) -> [usize; 2] {
        let malicious = self.examples.iter().filter(|e| e.label == 1).count();
        [self.examples.len() - malicious, malicious]
    }
}

#[derive(Debug, Clone)]
pub struct DatasetBalancer {
    /// Per-class target as a share of the majority (label 0) count
    ratio: f64,
    seed: u64,
}

impl DatasetBalancer {
    pub fn new(ratio: f64, seed: u64) -> Self {
        Self { ratio, seed }
    }

    pub fn from_config(config: &TrainingConfig) -> Self {
        Self::new(config.balance_ratio, config.seed)
    }

    /// Each class ends up with `floor(ratio * |label 0|)` rows.
    pub fn target_size(&self, majority: usize) -> usize {
        (majority as f64 * self.ratio) as usize
    }

    pub fn balance(&self, examples: Vec<LabeledExample>) -> Result<BalancedDataset> {
        if !(self.ratio > 0.0 && self.ratio <= 1.0) {
            return Err(Error::invalid_dataset(format!(
                "balance ratio must be within (0, 1], got {}",
                self.ratio
            )));
        }
        let (minority, majority): (Vec<_>, Vec<_>) =
            examples.into_iter().partition(|e| e.label == 1);
        if minority.is_empty() {
            return Err(Error::invalid_dataset("no malicious rows to balance against"));
        }
        let target = self.target_size(majority.len());
        if target == 0 {
            return Err(Error::invalid_dataset(format!(
                "{} benign rows leave an empty target size",
                majority.len()
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut balanced: Vec<LabeledExample> = index::sample(&mut rng, majority.len(), target)
            .into_iter()
            .map(|i| majority[i].clone())
            .collect();

        let mut rng = StdRng::seed_from_u64(self.seed);
        balanced.extend((0..target).map(|_| minority[rng.gen_range(0..minority.len())].clone()));

        let mut rng = StdRng::seed_from_u64(self.seed);
        balanced.shuffle(&mut rng);

        info!(
            benign_in = majority.len(),
            malicious_in = minority.len(),
            per_class = target,
            "dataset balanced"
        );
        Ok(BalancedDataset { examples: balanced })
    }
}
