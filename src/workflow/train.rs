//! Training pipeline

use super::{DEFAULT_DATA_URL, MODEL_ARTIFACT_PATH};
use crate::error::{LegendaryError, Result};
use crate::export::ModelArtifact;
use crate::preprocessing::{FeatureSelector, PreparedData};
use crate::tracking::{ActiveRun, ExperimentTracker, ModelUri};
use crate::training::{fit_and_evaluate, ForestConfig, TrainingReport};
use crate::utils::DataLoader;

#[derive(Debug, Clone)]
pub struct TrainSettings {
    pub experiment_name: String,
    pub run_name: String,
    pub data_url: String,
    pub forest: ForestConfig,
    pub selector: FeatureSelector,
    /// Register the logged model under this name
    pub register_as: Option<String>,
}

impl TrainSettings {
    pub fn new(experiment_name: impl Into<String>) -> Self {
        Self {
            experiment_name: experiment_name.into(),
            run_name: "default".to_string(),
            data_url: DEFAULT_DATA_URL.to_string(),
            forest: ForestConfig::default(),
            selector: FeatureSelector::default(),
            register_as: None,
        }
    }

    pub fn with_run_name(mut self, run_name: impl Into<String>) -> Self {
        self.run_name = run_name.into();
        self
    }

    pub fn with_data_url(mut self, data_url: impl Into<String>) -> Self {
        self.data_url = data_url.into();
        self
    }

    pub fn with_forest(mut self, forest: ForestConfig) -> Self {
        self.forest = forest;
        self
    }

    pub fn with_register_as(mut self, name: impl Into<String>) -> Self {
        self.register_as = Some(name.into());
        self
    }
}

/// What a finished training run produced
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub experiment_id: String,
    pub run_id: String,
    pub report: TrainingReport,
    /// Artifact URI of the logged model
    pub model_uri: String,
    pub registered: Option<ModelUri>,
}

impl TrainOutcome {
    pub fn accuracy(&self) -> f64 {
        self.report.accuracy
    }
}

/// Load data, then fit, score and log a forest inside a fresh run.
///
/// Once the run has started, any failure marks it `FAILED` before the error
/// is returned.
pub async fn run_workflow(
    settings: &TrainSettings,
    tracker: &mut ExperimentTracker,
) -> Result<TrainOutcome> {
    settings.forest.validate()?;

    let df = DataLoader::new().load_csv(&settings.data_url).await?;
    let data = settings.selector.prepare(&df)?;
    tracing::info!(
        n_samples = data.n_samples(),
        n_features = data.n_features(),
        "Training data prepared"
    );

    let experiment_id = tracker.set_experiment(&settings.experiment_name).await?;
    let run = tracker.start_run(&settings.run_name).await?;

    match train_in_run(settings, &run, data).await {
        Ok((report, model_uri, registered)) => {
            let run_id = run.run_id().to_string();
            run.finish().await?;
            Ok(TrainOutcome {
                experiment_id,
                run_id,
                report,
                model_uri,
                registered,
            })
        }
        Err(e) => {
            tracing::error!(run_id = %run.run_id(), error = %e, "Training run failed");
            if let Err(end_err) = run.fail().await {
                tracing::warn!(error = %end_err, "Could not mark run as failed");
            }
            Err(e)
        }
    }
}

async fn train_in_run(
    settings: &TrainSettings,
    run: &ActiveRun,
    data: PreparedData,
) -> Result<(TrainingReport, String, Option<ModelUri>)> {
    let config = settings.forest.clone();
    let feature_names = data.feature_names.clone();

    // CPU-bound; keep it off the async workers
    let (forest, report) = tokio::task::spawn_blocking(move || fit_and_evaluate(&data, &config))
        .await
        .map_err(|e| LegendaryError::TrainingError(format!("training task panicked: {}", e)))??;

    let forest_config = &settings.forest;
    run.log_param("data_url", &settings.data_url).await?;
    run.log_param("n_estimator", forest_config.n_estimators).await?;
    run.log_param("max_depth", max_depth_param(forest_config.max_depth)).await?;
    run.log_param("min_samples_split", forest_config.min_samples_split).await?;
    run.log_metric("model_accuracy", report.accuracy).await?;

    let artifact = ModelArtifact::new(
        forest,
        feature_names,
        settings.selector.label(),
        forest_config.clone(),
    );
    let model_uri = run.log_model(&artifact, MODEL_ARTIFACT_PATH).await?;

    let registered = match &settings.register_as {
        Some(name) => Some(run.register_model(name, MODEL_ARTIFACT_PATH).await?),
        None => None,
    };

    Ok((report, model_uri, registered))
}

fn max_depth_param(max_depth: Option<usize>) -> String {
    max_depth.map_or_else(|| "None".to_string(), |d| d.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = TrainSettings::new("pokemon");
        assert_eq!(settings.run_name, "default");
        assert_eq!(settings.data_url, DEFAULT_DATA_URL);
        assert_eq!(settings.forest.n_estimators, 10);
        assert!(settings.register_as.is_none());
    }

    #[test]
    fn test_max_depth_param() {
        assert_eq!(max_depth_param(Some(5)), "5");
        assert_eq!(max_depth_param(None), "None");
    }

    #[tokio::test]
    async fn test_missing_data_fails_before_any_run() {
        let dir = tempfile::tempdir().unwrap();
        let uri = format!("file://{}", dir.path().display());
        let mut tracker =
            ExperimentTracker::from_uri(&uri, &crate::tracking::TrackingConfig::default()).unwrap();

        let settings = TrainSettings::new("pokemon")
            .with_data_url(dir.path().join("missing.csv").display().to_string());
        assert!(run_workflow(&settings, &mut tracker).await.is_err());
        assert!(tracker.experiment().is_none());
    }
}
