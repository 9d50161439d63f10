//! Error types for the legendary pipeline

use thiserror::Error;

/// Result type alias for legendary operations
pub type Result<T> = std::result::Result<T, LegendaryError>;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum LegendaryError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Inference error: {0}")]
    InferenceError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Tracking server error ({code}): {message}")]
    TrackingError { code: String, message: String },

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported artifact location: {0}")]
    UnsupportedArtifactUri(String),

    #[error("Thread pool error: {0}")]
    ThreadPoolError(String),

    #[error("Computation error: {0}")]
    ComputationError(String),
}

impl LegendaryError {
    /// Build a tracking error from an MLflow error code and message
    pub fn tracking(code: impl Into<String>, message: impl Into<String>) -> Self {
        LegendaryError::TrackingError {
            code: code.into(),
            message: message.into(),
        }
    }

    /// MLflow error code, if this is a tracking error
    pub fn tracking_code(&self) -> Option<&str> {
        match self {
            LegendaryError::TrackingError { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }
}

impl From<polars::error::PolarsError> for LegendaryError {
    fn from(err: polars::error::PolarsError) -> Self {
        LegendaryError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for LegendaryError {
    fn from(err: serde_json::Error) -> Self {
        LegendaryError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for LegendaryError {
    fn from(err: serde_yaml::Error) -> Self {
        LegendaryError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for LegendaryError {
    fn from(err: reqwest::Error) -> Self {
        LegendaryError::HttpError(err.to_string())
    }
}
