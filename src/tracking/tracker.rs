//! Experiment tracker
//!
//! Thin stateful layer over a [`TrackingStore`]: remembers the active
//! experiment and hands out [`ActiveRun`] handles that log against it.

use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;

use super::config::TrackingConfig;
use super::mlflow::MlflowClient;
use super::storage::LocalStorage;
use super::store::TrackingStore;
use super::{join_uri, ModelUri, RunInfo, RunStatus};
use crate::error::{LegendaryError, Result};
use crate::export::{MlModel, ModelArtifact, MLMODEL_FILE, MODEL_FILE};

/// Experiment tracker
pub struct ExperimentTracker {
    store: Arc<dyn TrackingStore>,
    experiment: Option<(String, String)>,
}

impl ExperimentTracker {
    pub fn new(store: Arc<dyn TrackingStore>) -> Self {
        Self {
            store,
            experiment: None,
        }
    }

    /// Pick a store from a tracking URI: `http(s)://` talks to an MLflow
    /// server, `file:` URIs and bare paths use [`LocalStorage`]
    pub fn from_uri(uri: &str, config: &TrackingConfig) -> Result<Self> {
        let store: Arc<dyn TrackingStore> = if uri.starts_with("http://") || uri.starts_with("https://") {
            Arc::new(MlflowClient::new(uri, config)?)
        } else {
            let path = uri
                .strip_prefix("file://")
                .or_else(|| uri.strip_prefix("file:"))
                .unwrap_or(uri);
            if path.is_empty() {
                return Err(LegendaryError::ConfigError("empty tracking URI".to_string()));
            }
            Arc::new(LocalStorage::new(PathBuf::from(path))?)
        };

        tracing::debug!(store = %store.describe(), "Tracking store ready");
        Ok(Self::new(store))
    }

    pub fn store(&self) -> &Arc<dyn TrackingStore> {
        &self.store
    }

    /// Make `name` the active experiment, creating it if needed
    pub async fn set_experiment(&mut self, name: &str) -> Result<String> {
        let experiment_id = self.store.get_or_create_experiment(name).await?;
        tracing::info!(experiment = name, experiment_id = %experiment_id, "Active experiment set");
        self.experiment = Some((name.to_string(), experiment_id.clone()));
        Ok(experiment_id)
    }

    /// Name and id of the active experiment
    pub fn experiment(&self) -> Option<(&str, &str)> {
        self.experiment
            .as_ref()
            .map(|(name, id)| (name.as_str(), id.as_str()))
    }

    /// Start a new run in the active experiment
    pub async fn start_run(&self, run_name: &str) -> Result<ActiveRun> {
        let (_, experiment_id) = self.experiment.as_ref().ok_or_else(|| {
            LegendaryError::ConfigError("no active experiment; call set_experiment first".to_string())
        })?;

        let info = self.store.create_run(experiment_id, run_name).await?;
        tracing::info!(run_id = %info.run_id, run_name = run_name, "Run started");

        Ok(ActiveRun {
            store: Arc::clone(&self.store),
            info,
        })
    }

    /// Resolve a registered model version and load its artifact
    pub async fn load_model(&self, uri: &ModelUri) -> Result<ModelArtifact> {
        let source = self
            .store
            .get_model_version_download_uri(&uri.name, &uri.version)
            .await?;
        tracing::info!(model = %uri, source = %source, "Downloading model");

        // Older artifacts may name a different model file in their descriptor
        let model_file = match self.store.download_artifact(&source, MLMODEL_FILE).await {
            Ok(bytes) => {
                let yaml = String::from_utf8_lossy(&bytes);
                MlModel::from_yaml(&yaml)?
                    .model_file()
                    .unwrap_or(MODEL_FILE)
                    .to_string()
            }
            Err(e) => {
                tracing::warn!(error = %e, "No MLmodel descriptor, assuming {}", MODEL_FILE);
                MODEL_FILE.to_string()
            }
        };

        let bytes = self.store.download_artifact(&source, &model_file).await?;
        ModelArtifact::from_json_bytes(&bytes)
    }
}

/// Handle on a run in `RUNNING` state
pub struct ActiveRun {
    store: Arc<dyn TrackingStore>,
    info: RunInfo,
}

impl ActiveRun {
    pub fn info(&self) -> &RunInfo {
        &self.info
    }

    pub fn run_id(&self) -> &str {
        &self.info.run_id
    }

    pub async fn log_param(&self, key: &str, value: impl Display) -> Result<()> {
        self.store
            .log_param(&self.info.run_id, key, &value.to_string())
            .await
    }

    pub async fn log_metric(&self, key: &str, value: f64) -> Result<()> {
        self.store.log_metric(&self.info.run_id, key, value, 0).await
    }

    /// Upload the model and its descriptor under `artifact_path`;
    /// returns the artifact URI of the logged model
    pub async fn log_model(&self, artifact: &ModelArtifact, artifact_path: &str) -> Result<String> {
        let mlmodel = artifact.mlmodel(&self.info.run_id, artifact_path);

        self.store
            .upload_artifact(
                &self.info,
                artifact_path,
                MLMODEL_FILE,
                mlmodel.to_yaml()?.into_bytes(),
            )
            .await?;
        self.store
            .upload_artifact(&self.info, artifact_path, MODEL_FILE, artifact.to_json_bytes()?)
            .await?;

        let uri = join_uri(&self.info.artifact_uri, artifact_path);
        tracing::info!(artifact_uri = %uri, "Model logged");
        Ok(uri)
    }

    /// Register the model logged under `artifact_path` as a new version of `name`
    pub async fn register_model(&self, name: &str, artifact_path: &str) -> Result<ModelUri> {
        let source = join_uri(&self.info.artifact_uri, artifact_path);
        let version = self
            .store
            .create_model_version(name, &source, &self.info.run_id)
            .await?;
        let uri = ModelUri::new(name, version);
        tracing::info!(model = %uri, "Model version created");
        Ok(uri)
    }

    pub async fn finish(self) -> Result<()> {
        self.end(RunStatus::Finished).await
    }

    pub async fn fail(self) -> Result<()> {
        self.end(RunStatus::Failed).await
    }

    async fn end(self, status: RunStatus) -> Result<()> {
        self.store.set_terminated(&self.info.run_id, status).await?;
        tracing::info!(run_id = %self.info.run_id, status = %status, "Run ended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::{ForestConfig, RandomForestClassifier};
    use ndarray::array;

    fn tracker(dir: &std::path::Path) -> ExperimentTracker {
        let uri = format!("file://{}", dir.display());
        ExperimentTracker::from_uri(&uri, &TrackingConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_start_run_requires_experiment() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = tracker(dir.path());
        assert!(matches!(
            tracker.start_run("orphan").await,
            Err(LegendaryError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_log_register_and_load_model() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = tracker(dir.path());
        tracker.set_experiment("pokemon").await.unwrap();
        assert_eq!(tracker.experiment().map(|(name, _)| name), Some("pokemon"));

        let x = array![[1.0], [2.0], [8.0], [9.0]];
        let y = array![0, 0, 1, 1];
        let config = ForestConfig::default().with_n_estimators(3);
        let mut forest = RandomForestClassifier::from_config(&config);
        forest.fit(&x, &y).unwrap();
        let artifact = ModelArtifact::new(forest, vec!["hp".to_string()], "legendary", config);

        let run = tracker.start_run("unit").await.unwrap();
        run.log_param("n_estimator", 3).await.unwrap();
        run.log_metric("model_accuracy", 1.0).await.unwrap();
        let logged = run.log_model(&artifact, "model").await.unwrap();
        assert!(logged.ends_with("/model"));
        let uri = run.register_model("pokemon", "model").await.unwrap();
        assert_eq!(uri.to_string(), "models:/pokemon/1");
        run.finish().await.unwrap();

        let loaded = tracker.load_model(&uri).await.unwrap();
        assert_eq!(loaded.feature_names, vec!["hp"]);
        assert_eq!(loaded.model.n_trees(), 3);
    }

    #[test]
    fn test_empty_uri_is_rejected() {
        assert!(ExperimentTracker::from_uri("file:", &TrackingConfig::default()).is_err());
    }
}
