//! Storage-agnostic tracking interface

use super::{RunInfo, RunStatus};
use crate::error::Result;
use async_trait::async_trait;

/// Backend that records experiments, runs and registered models
#[async_trait]
pub trait TrackingStore: Send + Sync {
    /// Look up an experiment by name, creating it when missing; returns its id
    async fn get_or_create_experiment(&self, name: &str) -> Result<String>;

    /// Start a new run in `RUNNING` state
    async fn create_run(&self, experiment_id: &str, run_name: &str) -> Result<RunInfo>;

    async fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()>;

    async fn log_metric(&self, run_id: &str, key: &str, value: f64, step: i64) -> Result<()>;

    /// Store `content` as `<run artifacts>/<artifact_path>/<file_name>`
    async fn upload_artifact(
        &self,
        run: &RunInfo,
        artifact_path: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<()>;

    /// Close a run with a terminal status
    async fn set_terminated(&self, run_id: &str, status: RunStatus) -> Result<()>;

    /// Register `source` as a new version of model `name`; returns the version
    async fn create_model_version(&self, name: &str, source: &str, run_id: &str) -> Result<String>;

    /// Artifact URI of a registered model version
    async fn get_model_version_download_uri(&self, name: &str, version: &str) -> Result<String>;

    /// Read `<artifact_uri>/<file_name>`
    async fn download_artifact(&self, artifact_uri: &str, file_name: &str) -> Result<Vec<u8>>;

    /// Human-readable location, for logs
    fn describe(&self) -> String;
}
