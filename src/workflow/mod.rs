//! End-to-end pipelines
//!
//! - [`train`]: load the dataset, fit and score a forest, log everything to
//!   the tracking store
//! - [`fetch`]: pull a registered model back and score a few sample rows

pub mod fetch;
pub mod train;

pub use fetch::{prepare_sample_data, test_model, FetchOutcome, FetchSettings};
pub use train::{run_workflow, TrainOutcome, TrainSettings};

/// Public CSV the pipelines default to
pub const DEFAULT_DATA_URL: &str =
    "https://minio.lab.sspcloud.fr/pengfei/sspcloud-demo/pokemon-cleaned.csv";

/// Artifact path the model is logged under inside a run
pub const MODEL_ARTIFACT_PATH: &str = "model";
