//! Model export and serialization module
//!
//! A logged model is a directory holding:
//! - `MLmodel`: YAML descriptor read by the tracking UI
//! - `model.json`: the fitted forest plus the feature schema it expects

mod mlmodel;

pub use mlmodel::{FlavorSpec, MlModel, FLAVOR_NAME};

use crate::error::{LegendaryError, Result};
use crate::preprocessing::FeatureSelector;
use crate::training::{ForestConfig, RandomForestClassifier};
use chrono::{DateTime, Utc};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

/// File name of the serialized model inside the artifact directory
pub const MODEL_FILE: &str = "model.json";

/// File name of the descriptor inside the artifact directory
pub const MLMODEL_FILE: &str = "MLmodel";

/// Serialized model plus the schema needed to score a dataframe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Crate version that wrote the artifact
    pub format_version: String,
    /// Feature columns, in the order the forest expects
    pub feature_names: Vec<String>,
    /// Label column the model predicts
    pub label: String,
    /// Hyper-parameters the forest was trained with
    pub config: ForestConfig,
    pub created_at: DateTime<Utc>,
    pub model: RandomForestClassifier,
}

impl ModelArtifact {
    pub fn new(
        model: RandomForestClassifier,
        feature_names: Vec<String>,
        label: impl Into<String>,
        config: ForestConfig,
    ) -> Self {
        Self {
            format_version: env!("CARGO_PKG_VERSION").to_string(),
            feature_names,
            label: label.into(),
            config,
            created_at: Utc::now(),
            model,
        }
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self> {
        let artifact: Self = serde_json::from_slice(bytes)?;
        if !artifact.model.is_fitted() {
            return Err(LegendaryError::ModelNotFitted);
        }
        if artifact.model.n_features() != artifact.feature_names.len() {
            return Err(LegendaryError::ShapeError {
                expected: format!("{} feature names", artifact.model.n_features()),
                actual: format!("{} feature names", artifact.feature_names.len()),
            });
        }
        Ok(artifact)
    }

    /// Score a dataframe; columns are picked by name so extra columns
    /// (including the label) are ignored
    pub fn predict(&self, df: &DataFrame) -> Result<Vec<bool>> {
        let x = FeatureSelector::new()
            .with_label(&self.label)
            .features(df, &self.feature_names)?;
        self.model
            .predict_bool(&x)
            .map_err(|e| LegendaryError::InferenceError(e.to_string()))
    }

    /// Descriptor written next to the model file
    pub fn mlmodel(&self, run_id: &str, artifact_path: &str) -> MlModel {
        MlModel::new(run_id, artifact_path, self)
    }
}
