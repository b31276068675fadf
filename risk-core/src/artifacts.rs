use std::path::Path;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::info;

use crate::{
    error::Result,
    scoring::{FeatureScaler, RiskClassifier, RiskScorer},
};

/// File name of the fitted scaler inside the model directory.
pub const SCALER_FILE: &str = "scaler.json";
/// File name of the fitted classifier inside the model directory.
pub const MODEL_FILE: &str = "model.json";

/// The two fitted artifacts the tabular scoring path depends on.
///
/// Produced offline by the trainer, consumed read-only at service startup.
/// A load failure of either file leaves the service in its degraded
/// "model unavailable" state; it is never recovered per-request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifacts {
    pub scaler: FeatureScaler,
    pub classifier: RiskClassifier,
}

impl ModelArtifacts {
    /// Load both artifacts from `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        let scaler = read_json(&dir.join(SCALER_FILE))?;
        let classifier = read_json(&dir.join(MODEL_FILE))?;
        info!(dir = %dir.display(), "loaded scoring artifacts");

        Ok(Self { scaler, classifier })
    }

    /// Persist both artifacts into `dir`, creating the directory if needed.
    pub fn persist(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        write_json(&dir.join(SCALER_FILE), &self.scaler)?;
        write_json(&dir.join(MODEL_FILE), &self.classifier)?;
        info!(dir = %dir.display(), "persisted scoring artifacts");

        Ok(())
    }

    pub fn into_scorer(self) -> RiskScorer {
        RiskScorer::new(self.scaler, self.classifier)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}
