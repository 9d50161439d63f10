//! MLflow REST client

use super::config::{TrackingAuth, TrackingConfig};
use super::store::TrackingStore;
use super::{now_millis, ArtifactLocation, RunInfo, RunStatus};
use crate::error::{LegendaryError, Result};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

const API: &str = "api/2.0/mlflow";
const ARTIFACTS_API: &str = "api/2.0/mlflow-artifacts/artifacts";

const RESOURCE_DOES_NOT_EXIST: &str = "RESOURCE_DOES_NOT_EXIST";
const RESOURCE_ALREADY_EXISTS: &str = "RESOURCE_ALREADY_EXISTS";

/// Client for an MLflow tracking server
#[derive(Debug, Clone)]
pub struct MlflowClient {
    base_url: String,
    auth: TrackingAuth,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExperimentEnvelope {
    experiment: ExperimentBody,
}

#[derive(Debug, Deserialize)]
struct ExperimentBody {
    experiment_id: String,
}

#[derive(Debug, Deserialize)]
struct CreateExperimentResponse {
    experiment_id: String,
}

#[derive(Debug, Deserialize)]
struct RunEnvelope {
    run: RunBody,
}

#[derive(Debug, Deserialize)]
struct RunBody {
    info: RunInfoBody,
}

#[derive(Debug, Deserialize)]
struct RunInfoBody {
    run_id: String,
    experiment_id: String,
    #[serde(default)]
    run_name: Option<String>,
    artifact_uri: String,
    status: RunStatus,
    #[serde(default)]
    start_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ModelVersionEnvelope {
    model_version: ModelVersionBody,
}

#[derive(Debug, Deserialize)]
struct ModelVersionBody {
    version: String,
}

#[derive(Debug, Deserialize)]
struct DownloadUriResponse {
    artifact_uri: String,
}

impl MlflowClient {
    /// Create a client for the server at `base_url`
    pub fn new(base_url: &str, config: &TrackingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("legendary/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth: config.auth.clone(),
            client,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match &self.auth {
            TrackingAuth::None => builder,
            TrackingAuth::Bearer(token) => builder.bearer_auth(token),
            TrackingAuth::Basic { username, password } => builder.basic_auth(username, Some(password)),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<T> {
        let response = self
            .request(Method::GET, &format!("{}/{}", API, endpoint))
            .query(query)
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn post_json<T: DeserializeOwned>(&self, endpoint: &str, body: serde_json::Value) -> Result<T> {
        let response = self
            .request(Method::POST, &format!("{}/{}", API, endpoint))
            .json(&body)
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn post_ok(&self, endpoint: &str, body: serde_json::Value) -> Result<()> {
        let _: serde_json::Value = self.post_json(endpoint, body).await?;
        Ok(())
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let (code, message) = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(ErrorBody {
                error_code: Some(code),
                message,
            }) => (code, message.unwrap_or_default()),
            _ => (format!("HTTP_{}", status.as_u16()), text),
        };
        Err(LegendaryError::tracking(code, message))
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
        let response = Self::check(response).await?;
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(serde_json::from_str("{}")?);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn proxied_path(&self, artifact_uri: &str, relative: &str) -> Result<ArtifactLocation> {
        Ok(ArtifactLocation::parse(artifact_uri)?.join(relative))
    }
}

#[async_trait]
impl TrackingStore for MlflowClient {
    async fn get_or_create_experiment(&self, name: &str) -> Result<String> {
        let lookup: Result<ExperimentEnvelope> = self
            .get_json("experiments/get-by-name", &[("experiment_name", name)])
            .await;

        match lookup {
            Ok(envelope) => Ok(envelope.experiment.experiment_id),
            Err(e) if e.tracking_code() == Some(RESOURCE_DOES_NOT_EXIST) => {
                tracing::info!(experiment = name, "Creating experiment");
                let created: CreateExperimentResponse = self
                    .post_json("experiments/create", json!({ "name": name }))
                    .await?;
                Ok(created.experiment_id)
            }
            Err(e) => Err(e),
        }
    }

    async fn create_run(&self, experiment_id: &str, run_name: &str) -> Result<RunInfo> {
        let start_time = now_millis();
        let envelope: RunEnvelope = self
            .post_json(
                "runs/create",
                json!({
                    "experiment_id": experiment_id,
                    "run_name": run_name,
                    "start_time": start_time,
                    "tags": [
                        { "key": "mlflow.runName", "value": run_name },
                        { "key": "mlflow.source.name", "value": "legendary" },
                        { "key": "mlflow.source.type", "value": "LOCAL" }
                    ]
                }),
            )
            .await?;

        let info = envelope.run.info;
        Ok(RunInfo {
            run_id: info.run_id,
            experiment_id: info.experiment_id,
            run_name: info.run_name.unwrap_or_else(|| run_name.to_string()),
            artifact_uri: info.artifact_uri,
            status: info.status,
            start_time: info.start_time.unwrap_or(start_time),
        })
    }

    async fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.post_ok(
            "runs/log-parameter",
            json!({ "run_id": run_id, "key": key, "value": value }),
        )
        .await
    }

    async fn log_metric(&self, run_id: &str, key: &str, value: f64, step: i64) -> Result<()> {
        self.post_ok(
            "runs/log-metric",
            json!({
                "run_id": run_id,
                "key": key,
                "value": value,
                "timestamp": now_millis(),
                "step": step
            }),
        )
        .await
    }

    async fn upload_artifact(
        &self,
        run: &RunInfo,
        artifact_path: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<()> {
        let relative = format!("{}/{}", artifact_path.trim_matches('/'), file_name);
        match self.proxied_path(&run.artifact_uri, &relative)? {
            ArtifactLocation::Proxied(path) => {
                let response = self
                    .request(Method::PUT, &format!("{}/{}", ARTIFACTS_API, path))
                    .body(content)
                    .send()
                    .await?;
                Self::check(response).await?;
                Ok(())
            }
            ArtifactLocation::Local(path) => {
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&path, content).await?;
                Ok(())
            }
        }
    }

    async fn set_terminated(&self, run_id: &str, status: RunStatus) -> Result<()> {
        self.post_ok(
            "runs/update",
            json!({ "run_id": run_id, "status": status, "end_time": now_millis() }),
        )
        .await
    }

    async fn create_model_version(&self, name: &str, source: &str, run_id: &str) -> Result<String> {
        match self
            .post_ok("registered-models/create", json!({ "name": name }))
            .await
        {
            Ok(()) => tracing::info!(model = name, "Registered new model"),
            Err(e) if e.tracking_code() == Some(RESOURCE_ALREADY_EXISTS) => {}
            Err(e) => return Err(e),
        }

        let envelope: ModelVersionEnvelope = self
            .post_json(
                "model-versions/create",
                json!({ "name": name, "source": source, "run_id": run_id }),
            )
            .await?;
        Ok(envelope.model_version.version)
    }

    async fn get_model_version_download_uri(&self, name: &str, version: &str) -> Result<String> {
        let response: DownloadUriResponse = self
            .get_json(
                "model-versions/get-download-uri",
                &[("name", name), ("version", version)],
            )
            .await?;
        Ok(response.artifact_uri)
    }

    async fn download_artifact(&self, artifact_uri: &str, file_name: &str) -> Result<Vec<u8>> {
        match self.proxied_path(artifact_uri, file_name)? {
            ArtifactLocation::Proxied(path) => {
                let response = self
                    .request(Method::GET, &format!("{}/{}", ARTIFACTS_API, path))
                    .send()
                    .await?;
                let response = Self::check(response).await?;
                Ok(response.bytes().await?.to_vec())
            }
            ArtifactLocation::Local(path) => Ok(tokio::fs::read(&path).await?),
        }
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}
