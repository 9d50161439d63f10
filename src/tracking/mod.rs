//! Experiment tracking
//!
//! Runs, parameters, metrics and model artifacts are recorded through a
//! [`TrackingStore`]. Two stores are provided:
//! - [`MlflowClient`] talks to an MLflow tracking server over REST
//! - [`LocalStorage`] keeps everything in a directory on disk

mod config;
mod mlflow;
mod storage;
mod store;
mod tracker;

pub use config::{TrackingAuth, TrackingConfig, ENV_TRACKING_URI};
pub use mlflow::MlflowClient;
pub use storage::{Experiment, LocalStorage, ModelVersionEntry, RegisteredModel, Run};
pub use store::TrackingStore;
pub use tracker::{ActiveRun, ExperimentTracker};

use crate::error::{LegendaryError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Lifecycle state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
    Killed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "RUNNING",
            RunStatus::Finished => "FINISHED",
            RunStatus::Failed => "FAILED",
            RunStatus::Killed => "KILLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Finished | RunStatus::Failed | RunStatus::Killed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a run as returned by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: String,
    pub experiment_id: String,
    pub run_name: String,
    pub artifact_uri: String,
    pub status: RunStatus,
    pub start_time: i64,
}

/// `models:/<name>/<version>` reference to a registered model version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelUri {
    pub name: String,
    pub version: String,
}

impl ModelUri {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    pub fn parse(uri: &str) -> Result<Self> {
        let rest = uri.strip_prefix("models:/").ok_or_else(|| {
            LegendaryError::ConfigError(format!("not a models:/ URI: {}", uri))
        })?;
        match rest.trim_matches('/').rsplit_once('/') {
            Some((name, version)) if !name.is_empty() && !version.is_empty() => {
                Ok(Self::new(name, version))
            }
            _ => Err(LegendaryError::ConfigError(format!(
                "expected models:/<name>/<version>, got {}",
                uri
            ))),
        }
    }
}

impl fmt::Display for ModelUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "models:/{}/{}", self.name, self.version)
    }
}

/// Where an artifact URI points to
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactLocation {
    /// Served by the tracking server's artifact proxy, relative path
    Proxied(String),
    /// Directory on the local file system
    Local(PathBuf),
}

impl ArtifactLocation {
    /// Classify an artifact URI
    pub fn parse(uri: &str) -> Result<Self> {
        if let Some(rest) = uri.strip_prefix("mlflow-artifacts:") {
            // mlflow-artifacts://host:port/path or mlflow-artifacts:/path
            let path = match rest.strip_prefix("//") {
                Some(with_host) => with_host.split_once('/').map_or("", |(_, p)| p),
                None => rest,
            };
            return Ok(ArtifactLocation::Proxied(path.trim_matches('/').to_string()));
        }
        if let Some(rest) = uri.strip_prefix("file://") {
            return Ok(ArtifactLocation::Local(PathBuf::from(rest)));
        }
        if let Some(rest) = uri.strip_prefix("file:") {
            return Ok(ArtifactLocation::Local(PathBuf::from(rest)));
        }
        if uri.starts_with('/') {
            return Ok(ArtifactLocation::Local(PathBuf::from(uri)));
        }
        Err(LegendaryError::UnsupportedArtifactUri(uri.to_string()))
    }

    /// Append a relative path
    pub fn join(&self, relative: &str) -> Self {
        let relative = relative.trim_matches('/');
        match self {
            ArtifactLocation::Proxied(base) if base.is_empty() => {
                ArtifactLocation::Proxied(relative.to_string())
            }
            ArtifactLocation::Proxied(base) => ArtifactLocation::Proxied(format!("{}/{}", base, relative)),
            ArtifactLocation::Local(base) => ArtifactLocation::Local(base.join(relative)),
        }
    }
}

/// Join an artifact URI with a relative path, keeping its scheme
pub fn join_uri(base: &str, relative: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), relative.trim_matches('/'))
}

/// Milliseconds since the Unix epoch
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_uri_parse() {
        let uri = ModelUri::parse("models:/pokemon/4").unwrap();
        assert_eq!(uri, ModelUri::new("pokemon", "4"));
        assert_eq!(uri.to_string(), "models:/pokemon/4");

        assert!(ModelUri::parse("runs:/abc/model").is_err());
        assert!(ModelUri::parse("models:/pokemon").is_err());
        assert!(ModelUri::parse("models:/pokemon/").is_err());
    }

    #[test]
    fn test_artifact_location_parse() {
        assert_eq!(
            ArtifactLocation::parse("mlflow-artifacts:/1/abc/artifacts").unwrap(),
            ArtifactLocation::Proxied("1/abc/artifacts".to_string())
        );
        assert_eq!(
            ArtifactLocation::parse("mlflow-artifacts://tracking:5000/1/abc/artifacts").unwrap(),
            ArtifactLocation::Proxied("1/abc/artifacts".to_string())
        );
        assert_eq!(
            ArtifactLocation::parse("file:///tmp/mlruns/0/abc/artifacts").unwrap(),
            ArtifactLocation::Local(PathBuf::from("/tmp/mlruns/0/abc/artifacts"))
        );
        assert!(matches!(
            ArtifactLocation::parse("s3://bucket/0/abc/artifacts"),
            Err(LegendaryError::UnsupportedArtifactUri(_))
        ));
    }

    #[test]
    fn test_artifact_location_join() {
        let loc = ArtifactLocation::Proxied("1/abc/artifacts".to_string()).join("/model/");
        assert_eq!(loc, ArtifactLocation::Proxied("1/abc/artifacts/model".to_string()));
        assert_eq!(join_uri("file:///x/artifacts/", "model"), "file:///x/artifacts/model");
    }

    #[test]
    fn test_run_status_wire_format() {
        assert_eq!(serde_json::to_string(&RunStatus::Finished).unwrap(), "\"FINISHED\"");
        assert_eq!(RunStatus::Failed.to_string(), "FAILED");
        assert!(!RunStatus::Running.is_terminal());
    }
}
