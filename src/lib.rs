//! legendary - random-forest pipeline for legendary Pokémon
//!
//! Trains a classifier that predicts whether a Pokémon is legendary, records
//! the run on an MLflow-compatible tracking server, and loads registered
//! model versions back for prediction.
//!
//! # Modules
//!
//! - [`utils`] - CSV loading from URLs or local paths
//! - [`preprocessing`] - Feature and label selection
//! - [`training`] - Decision trees, random forests, splitting, evaluation
//! - [`export`] - Model artifact and `MLmodel` descriptor
//! - [`tracking`] - Tracking stores (MLflow REST, local files) and runs
//! - [`workflow`] - The train and fetch pipelines
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Data + models
pub mod utils;
pub mod preprocessing;
pub mod training;
pub mod export;

// Tracking + pipelines
pub mod tracking;
pub mod workflow;
pub mod cli;

pub use error::{LegendaryError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{LegendaryError, Result};

    // Data
    pub use crate::utils::DataLoader;
    pub use crate::preprocessing::{FeatureSelector, PreparedData};

    // Training
    pub use crate::training::{
        fit_and_evaluate, train_test_split, ConfusionMatrix, DecisionTreeClassifier, ForestConfig,
        RandomForestClassifier, TrainingReport,
    };

    // Export
    pub use crate::export::{MlModel, ModelArtifact};

    // Experiment tracking
    pub use crate::tracking::{
        ActiveRun, ExperimentTracker, LocalStorage, MlflowClient, ModelUri, RunStatus, TrackingConfig,
        TrackingStore,
    };

    // Pipelines
    pub use crate::workflow::{
        prepare_sample_data, run_workflow, test_model, FetchOutcome, FetchSettings, TrainOutcome,
        TrainSettings,
    };
}
