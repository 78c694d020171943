//! Trained-model artifact: header line (magic, format, payload digest) + JSON payload.
//! Writes go through a temp file in the target directory and an atomic rename, so a
//! failed training run never leaves a file that `load` would accept.

use super::{Estimator, HyperParams, ModelFamily};
use crate::error::{Error, Result};
use crate::features::{layout_fingerprint, FeatureVector, FEATURE_VERSION};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::Path;

pub const ARTIFACT_MAGIC: &str = "url-sentinel-model";
pub const ARTIFACT_FORMAT: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct ArtifactHeader {
    magic: String,
    format: u32,
    sha256: String,
}

/// The selected estimator plus what is needed to audit and validate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub family: ModelFamily,
    pub params: HyperParams,
    pub cv_mean: f64,
    pub cv_std: f64,
    pub feature_version: u32,
    pub layout_fingerprint: String,
    pub trained_at: DateTime<Utc>,
    pub estimator: Estimator,
}

fn digest(payload: &[u8]) -> String {
    BASE64.encode(Sha256::digest(payload))
}

impl TrainedModel {
    pub fn new(params: HyperParams, cv_mean: f64, cv_std: f64, estimator: Estimator) -> Self {
        Self {
            family: params.family(),
            params,
            cv_mean,
            cv_std,
            feature_version: FEATURE_VERSION,
            layout_fingerprint: layout_fingerprint(),
            trained_at: Utc::now(),
            estimator,
        }
    }

    /// `[p(benign), p(malicious)]` for one feature vector.
    pub fn predict_proba(&self, features: &FeatureVector) -> Result<[f64; 2]> {
        self.check_layout()?;
        self.estimator.predict_proba(features.as_slice())
    }

    /// Predicted class and its probability (the max class probability).
    pub fn predict(&self, features: &FeatureVector) -> Result<(bool, f64)> {
        let p = self.predict_proba(features)?;
        let malicious = p[1] > p[0];
        Ok((malicious, p[0].max(p[1])))
    }

    fn check_layout(&self) -> Result<()> {
        if self.feature_version != FEATURE_VERSION || self.layout_fingerprint != layout_fingerprint() {
            return Err(Error::unavailable(format!(
                "model built for feature layout v{}, runtime is v{}",
                self.feature_version, FEATURE_VERSION
            )));
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let payload = serde_json::to_vec(self)?;
        let header = serde_json::to_string(&ArtifactHeader {
            magic: ARTIFACT_MAGIC.to_string(),
            format: ARTIFACT_FORMAT,
            sha256: digest(&payload),
        })?;

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => std::path::PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(header.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.write_all(&payload)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;
        tracing::info!(path = %path.display(), family = %self.family, "model artifact written");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let split = data
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| Error::ArtifactIntegrity("missing header line".into()))?;
        let (header, payload) = (&data[..split], &data[split + 1..]);
        let header: ArtifactHeader = serde_json::from_slice(header)
            .map_err(|e| Error::ArtifactIntegrity(format!("bad header: {}", e)))?;
        if header.magic != ARTIFACT_MAGIC {
            return Err(Error::ArtifactIntegrity(format!("unexpected magic {:?}", header.magic)));
        }
        if header.format != ARTIFACT_FORMAT {
            return Err(Error::ArtifactIntegrity(format!(
                "unsupported format {}",
                header.format
            )));
        }
        if digest(payload) != header.sha256 {
            return Err(Error::ArtifactIntegrity("payload digest mismatch".into()));
        }
        let model: TrainedModel = serde_json::from_slice(payload)?;
        model.check_layout()?;
        Ok(model)
    }
}
