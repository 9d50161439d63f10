//! Model training module
//!
//! Provides the classifier used by the training workflow:
//! - Gini decision trees and bagged random forests
//! - Seeded train/test splitting
//! - Confusion-matrix based evaluation

mod config;
pub mod decision_tree;
pub mod metrics;
pub mod random_forest;
pub mod split;

pub use config::{ForestConfig, MaxFeatures};
pub use decision_tree::{DecisionTreeClassifier, TreeNode};
pub use metrics::ConfusionMatrix;
pub use random_forest::RandomForestClassifier;
pub use split::{train_test_split, TrainTestSplit};

use crate::error::{LegendaryError, Result};
use crate::preprocessing::PreparedData;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Outcome of fitting and evaluating a forest on a held-out split
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub accuracy: f64,
    pub confusion_matrix: ConfusionMatrix,
    pub n_train: usize,
    pub n_test: usize,
    pub training_time_secs: f64,
}

/// Split prepared data, fit a forest on the training side and score it on
/// the test side
pub fn fit_and_evaluate(
    data: &PreparedData,
    config: &ForestConfig,
) -> Result<(RandomForestClassifier, TrainingReport)> {
    config.validate()?;
    let start = Instant::now();

    let split = train_test_split(&data.features, &data.labels, config.train_size, config.random_state)?;

    let mut forest = RandomForestClassifier::from_config(config);
    forest.fit(&split.x_train, &split.y_train)?;

    let predictions = forest.predict(&split.x_test)?;
    let confusion_matrix = ConfusionMatrix::from_labels(&split.y_test, &predictions);
    let accuracy = confusion_matrix.accuracy().ok_or_else(|| {
        LegendaryError::ComputationError("accuracy of an empty confusion matrix".to_string())
    })?;

    let report = TrainingReport {
        accuracy,
        confusion_matrix,
        n_train: split.x_train.nrows(),
        n_test: split.x_test.nrows(),
        training_time_secs: start.elapsed().as_secs_f64(),
    };

    tracing::info!(
        accuracy = report.accuracy,
        n_train = report.n_train,
        n_test = report.n_test,
        elapsed_secs = report.training_time_secs,
        "Random forest evaluated"
    );

    Ok((forest, report))
}
