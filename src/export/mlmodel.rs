//! `MLmodel` descriptor

use super::{ModelArtifact, MODEL_FILE};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Flavor key under which the forest is described
pub const FLAVOR_NAME: &str = "legendary_forest";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlavorSpec {
    pub model_file: String,
    pub format_version: String,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub features: Vec<String>,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlModel {
    pub artifact_path: String,
    pub run_id: String,
    pub utc_time_created: String,
    pub flavors: BTreeMap<String, FlavorSpec>,
}

impl MlModel {
    pub fn new(run_id: &str, artifact_path: &str, artifact: &ModelArtifact) -> Self {
        let flavor = FlavorSpec {
            model_file: MODEL_FILE.to_string(),
            format_version: artifact.format_version.clone(),
            n_estimators: artifact.config.n_estimators,
            max_depth: artifact.config.max_depth,
            min_samples_split: artifact.config.min_samples_split,
            features: artifact.feature_names.clone(),
            label: artifact.label.clone(),
        };

        let mut flavors = BTreeMap::new();
        flavors.insert(FLAVOR_NAME.to_string(), flavor);

        Self {
            artifact_path: artifact_path.to_string(),
            run_id: run_id.to_string(),
            utc_time_created: artifact
                .created_at
                .format("%Y-%m-%d %H:%M:%S%.6f")
                .to_string(),
            flavors,
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Model file named by our flavor, if present
    pub fn model_file(&self) -> Option<&str> {
        self.flavors.get(FLAVOR_NAME).map(|f| f.model_file.as_str())
    }
}
