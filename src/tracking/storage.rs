//! Local file-system tracking store
//!
//! Layout under the base directory:
//! - `experiments.json`: experiments with their runs, params and metrics
//! - `models.json`: registered models and their versions
//! - `<experiment_id>/<run_id>/artifacts/...`: run artifacts

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::store::TrackingStore;
use super::{join_uri, now_millis, ArtifactLocation, RunInfo, RunStatus};
use crate::error::{LegendaryError, Result};

const RESOURCE_DOES_NOT_EXIST: &str = "RESOURCE_DOES_NOT_EXIST";

/// Experiment record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experiment {
    pub experiment_id: String,
    pub name: String,
    pub created_at: i64,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub runs: Vec<Run>,
}

/// Run record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub run_name: String,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub status: RunStatus,
    pub artifact_uri: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
    #[serde(default)]
    pub artifacts: Vec<String>,
}

/// Registered model with its versions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredModel {
    pub name: String,
    pub created_at: i64,
    #[serde(default)]
    pub versions: Vec<ModelVersionEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelVersionEntry {
    pub version: String,
    pub source: String,
    pub run_id: String,
    pub created_at: i64,
}

/// Local file system storage backend
#[derive(Debug)]
pub struct LocalStorage {
    base_dir: PathBuf,
    // serialises read-modify-write cycles on the JSON files
    lock: Mutex<()>,
}

impl LocalStorage {
    /// Create a new local storage backend, creating the directory if needed
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;
        let base_dir = base_dir.canonicalize()?;
        Ok(Self {
            base_dir,
            lock: Mutex::new(()),
        })
    }

    fn experiments_file(&self) -> PathBuf {
        self.base_dir.join("experiments.json")
    }

    fn models_file(&self) -> PathBuf {
        self.base_dir.join("models.json")
    }

    fn run_artifact_dir(&self, experiment_id: &str, run_id: &str) -> PathBuf {
        self.base_dir.join(experiment_id).join(run_id).join("artifacts")
    }

    /// All experiments currently stored
    pub fn load_experiments(&self) -> Result<Vec<Experiment>> {
        read_json_or_default(&self.experiments_file())
    }

    /// All registered models currently stored
    pub fn load_models(&self) -> Result<Vec<RegisteredModel>> {
        read_json_or_default(&self.models_file())
    }

    /// Look up a run by id
    pub fn get_run(&self, run_id: &str) -> Result<Run> {
        self.load_experiments()?
            .into_iter()
            .flat_map(|e| e.runs)
            .find(|r| r.run_id == run_id)
            .ok_or_else(|| not_found(format!("run '{}'", run_id)))
    }

    fn update_experiments<T>(&self, f: impl FnOnce(&mut Vec<Experiment>) -> Result<T>) -> Result<T> {
        let _guard = self.lock.lock();
        let mut experiments = self.load_experiments()?;
        let out = f(&mut experiments)?;
        write_json(&self.experiments_file(), &experiments)?;
        Ok(out)
    }

    fn update_run<T>(&self, run_id: &str, f: impl FnOnce(&mut Run) -> T) -> Result<T> {
        self.update_experiments(|experiments| {
            let run = experiments
                .iter_mut()
                .flat_map(|e| e.runs.iter_mut())
                .find(|r| r.run_id == run_id)
                .ok_or_else(|| not_found(format!("run '{}'", run_id)))?;
            Ok(f(run))
        })
    }

    fn update_models<T>(&self, f: impl FnOnce(&mut Vec<RegisteredModel>) -> Result<T>) -> Result<T> {
        let _guard = self.lock.lock();
        let mut models = self.load_models()?;
        let out = f(&mut models)?;
        write_json(&self.models_file(), &models)?;
        Ok(out)
    }
}

#[async_trait]
impl TrackingStore for LocalStorage {
    async fn get_or_create_experiment(&self, name: &str) -> Result<String> {
        self.update_experiments(|experiments| {
            if let Some(exp) = experiments.iter().find(|e| e.name == name) {
                return Ok(exp.experiment_id.clone());
            }
            let experiment_id = experiments.len().to_string();
            tracing::info!(experiment = name, experiment_id = %experiment_id, "Creating experiment");
            experiments.push(Experiment {
                experiment_id: experiment_id.clone(),
                name: name.to_string(),
                created_at: now_millis(),
                tags: BTreeMap::new(),
                runs: Vec::new(),
            });
            Ok(experiment_id)
        })
    }

    async fn create_run(&self, experiment_id: &str, run_name: &str) -> Result<RunInfo> {
        let run_id = uuid::Uuid::new_v4().simple().to_string();
        let artifact_dir = self.run_artifact_dir(experiment_id, &run_id);
        fs::create_dir_all(&artifact_dir)?;
        let artifact_uri = format!("file://{}", artifact_dir.display());
        let start_time = now_millis();

        self.update_experiments(|experiments| {
            let exp = experiments
                .iter_mut()
                .find(|e| e.experiment_id == experiment_id)
                .ok_or_else(|| not_found(format!("experiment '{}'", experiment_id)))?;
            exp.runs.push(Run {
                run_id: run_id.clone(),
                run_name: run_name.to_string(),
                start_time,
                end_time: None,
                status: RunStatus::Running,
                artifact_uri: artifact_uri.clone(),
                params: BTreeMap::new(),
                metrics: BTreeMap::new(),
                artifacts: Vec::new(),
            });
            Ok(())
        })?;

        Ok(RunInfo {
            run_id,
            experiment_id: experiment_id.to_string(),
            run_name: run_name.to_string(),
            artifact_uri,
            status: RunStatus::Running,
            start_time,
        })
    }

    async fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.update_run(run_id, |run| {
            run.params.insert(key.to_string(), value.to_string());
        })
    }

    async fn log_metric(&self, run_id: &str, key: &str, value: f64, _step: i64) -> Result<()> {
        self.update_run(run_id, |run| {
            run.metrics.insert(key.to_string(), value);
        })
    }

    async fn upload_artifact(
        &self,
        run: &RunInfo,
        artifact_path: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<()> {
        let relative = format!("{}/{}", artifact_path.trim_matches('/'), file_name);
        let path = match ArtifactLocation::parse(&run.artifact_uri)?.join(&relative) {
            ArtifactLocation::Local(path) => path,
            ArtifactLocation::Proxied(_) => {
                return Err(LegendaryError::UnsupportedArtifactUri(run.artifact_uri.clone()))
            }
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;

        self.update_run(&run.run_id, |r| {
            if !r.artifacts.contains(&relative) {
                r.artifacts.push(relative.clone());
            }
        })
    }

    async fn set_terminated(&self, run_id: &str, status: RunStatus) -> Result<()> {
        self.update_run(run_id, |run| {
            run.status = status;
            run.end_time = Some(now_millis());
        })
    }

    async fn create_model_version(&self, name: &str, source: &str, run_id: &str) -> Result<String> {
        self.update_models(|models| {
            let idx = match models.iter().position(|m| m.name == name) {
                Some(idx) => idx,
                None => {
                    tracing::info!(model = name, "Registered new model");
                    models.push(RegisteredModel {
                        name: name.to_string(),
                        created_at: now_millis(),
                        versions: Vec::new(),
                    });
                    models.len() - 1
                }
            };
            let model = &mut models[idx];
            let version = (model.versions.len() + 1).to_string();
            model.versions.push(ModelVersionEntry {
                version: version.clone(),
                source: source.to_string(),
                run_id: run_id.to_string(),
                created_at: now_millis(),
            });
            Ok(version)
        })
    }

    async fn get_model_version_download_uri(&self, name: &str, version: &str) -> Result<String> {
        self.load_models()?
            .into_iter()
            .find(|m| m.name == name)
            .and_then(|m| m.versions.into_iter().find(|v| v.version == version))
            .map(|v| v.source)
            .ok_or_else(|| not_found(format!("model version '{}' of '{}'", version, name)))
    }

    async fn download_artifact(&self, artifact_uri: &str, file_name: &str) -> Result<Vec<u8>> {
        match ArtifactLocation::parse(artifact_uri)?.join(file_name) {
            ArtifactLocation::Local(path) => fs::read(&path).map_err(|e| {
                not_found(format!("artifact {}: {}", join_uri(artifact_uri, file_name), e))
            }),
            ArtifactLocation::Proxied(_) => Err(LegendaryError::UnsupportedArtifactUri(
                artifact_uri.to_string(),
            )),
        }
    }

    fn describe(&self) -> String {
        format!("file://{}", self.base_dir.display())
    }
}

fn not_found(what: String) -> LegendaryError {
    LegendaryError::tracking(RESOURCE_DOES_NOT_EXIST, format!("{} not found", what))
}

fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    // readers never see a partially written file
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_experiment_is_created_once() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).unwrap();

        let first = storage.get_or_create_experiment("pokemon").await.unwrap();
        let again = storage.get_or_create_experiment("pokemon").await.unwrap();
        let other = storage.get_or_create_experiment("digimon").await.unwrap();

        assert_eq!(first, again);
        assert_ne!(first, other);
        assert_eq!(storage.load_experiments().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_run_lifecycle_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).unwrap();
        let exp = storage.get_or_create_experiment("pokemon").await.unwrap();

        let run = storage.create_run(&exp, "baseline").await.unwrap();
        storage.log_param(&run.run_id, "n_estimator", "10").await.unwrap();
        storage.log_metric(&run.run_id, "model_accuracy", 0.95, 0).await.unwrap();
        storage
            .upload_artifact(&run, "model", "model.json", b"{}".to_vec())
            .await
            .unwrap();
        storage.set_terminated(&run.run_id, RunStatus::Finished).await.unwrap();

        // re-open from disk
        let reopened = LocalStorage::new(dir.path()).unwrap();
        let stored = reopened.get_run(&run.run_id).unwrap();
        assert_eq!(stored.run_name, "baseline");
        assert_eq!(stored.status, RunStatus::Finished);
        assert!(stored.end_time.is_some());
        assert_eq!(stored.params["n_estimator"], "10");
        assert_eq!(stored.metrics["model_accuracy"], 0.95);
        assert_eq!(stored.artifacts, vec!["model/model.json"]);

        let bytes = reopened
            .download_artifact(&join_uri(&run.artifact_uri, "model"), "model.json")
            .await
            .unwrap();
        assert_eq!(bytes, b"{}");
    }

    #[tokio::test]
    async fn test_model_versions_increment() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).unwrap();

        let v1 = storage.create_model_version("pokemon", "file:///a", "r1").await.unwrap();
        let v2 = storage.create_model_version("pokemon", "file:///b", "r2").await.unwrap();
        assert_eq!((v1.as_str(), v2.as_str()), ("1", "2"));

        let uri = storage.get_model_version_download_uri("pokemon", "2").await.unwrap();
        assert_eq!(uri, "file:///b");

        let missing = storage.get_model_version_download_uri("pokemon", "3").await;
        assert_eq!(
            missing.unwrap_err().tracking_code(),
            Some(RESOURCE_DOES_NOT_EXIST)
        );
    }

    #[tokio::test]
    async fn test_logging_to_unknown_run_fails() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).unwrap();
        assert!(storage.log_param("nope", "k", "v").await.is_err());
    }

    #[test]
    fn test_missing_files_load_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("fresh")).unwrap();
        assert!(storage.load_experiments().unwrap().is_empty());
        assert!(storage.load_models().unwrap().is_empty());
    }
}
