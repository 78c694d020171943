//! Shared, swappable reference to the active model. Readers clone an `Arc` and never
//! observe a half-replaced model; replacement swaps the pointer under a write lock.

use super::TrainedModel;
use crate::error::Result;
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct ModelSlot {
    current: RwLock<Option<Arc<TrainedModel>>>,
}

impl ModelSlot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_model(model: TrainedModel) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(model))),
        }
    }

    /// Load from path. If the artifact is missing or invalid the slot starts empty and
    /// inference runs heuristic-only.
    pub fn load_from(path: &Path) -> Self {
        match TrainedModel::load(path) {
            Ok(model) => {
                info!(path = %path.display(), family = %model.family, "model loaded");
                Self::with_model(model)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "model unavailable; heuristic fallback only");
                Self::empty()
            }
        }
    }

    pub fn current(&self) -> Option<Arc<TrainedModel>> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.current().is_some()
    }

    /// Swap in a new model, returning the previous one.
    pub fn replace(&self, model: TrainedModel) -> Option<Arc<TrainedModel>> {
        self.swap(Some(Arc::new(model)))
    }

    /// Load a new artifact and swap it in; on error the current model stays active.
    pub fn reload(&self, path: &Path) -> Result<()> {
        let model = TrainedModel::load(path)?;
        info!(path = %path.display(), family = %model.family, "model reloaded");
        self.replace(model);
        Ok(())
    }

    pub fn clear(&self) -> Option<Arc<TrainedModel>> {
        self.swap(None)
    }

    fn swap(&self, next: Option<Arc<TrainedModel>>) -> Option<Arc<TrainedModel>> {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *guard, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FEATURE_COUNT;
    use crate::model::test_data::blobs;
    use crate::model::{ClassWeight, Estimator, HyperParams, LogisticParams};

    fn model() -> TrainedModel {
        let (x, y) = blobs(20, FEATURE_COUNT);
        let params = HyperParams::LogisticRegression(LogisticParams {
            c: 1.0,
            max_iter: 100,
            class_weight: ClassWeight::Uniform,
        });
        let est = Estimator::fit(&params, x.view(), &y, 42).unwrap();
        TrainedModel::new(params, 1.0, 0.0, est)
    }

    #[test]
    fn missing_artifact_gives_empty_slot() {
        let slot = ModelSlot::load_from(Path::new("nonexistent-model.json"));
        assert!(!slot.is_loaded());
    }

    #[test]
    fn failed_reload_keeps_state() {
        let slot = ModelSlot::empty();
        assert!(slot.reload(Path::new("nonexistent-model.json")).is_err());
        assert!(slot.current().is_none());
        assert!(slot.clear().is_none());
    }

    #[test]
    fn reload_swaps_in_saved_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let saved = model();
        saved.save(&path).unwrap();

        let slot = ModelSlot::empty();
        slot.reload(&path).unwrap();
        assert!(slot.is_loaded());
        let held = slot.current().unwrap();
        assert_eq!(held.estimator, saved.estimator);

        // a later failed reload leaves the loaded model in place
        assert!(slot.reload(&dir.path().join("absent.json")).is_err());
        assert!(Arc::ptr_eq(&held, &slot.current().unwrap()));
        assert!(slot.clear().is_some());
        assert!(!slot.is_loaded());
    }
}
