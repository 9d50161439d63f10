//! Tracking client configuration

use crate::error::{LegendaryError, Result};
use std::time::Duration;

pub const ENV_TRACKING_URI: &str = "MLFLOW_TRACKING_URI";
pub const ENV_TRACKING_TOKEN: &str = "MLFLOW_TRACKING_TOKEN";
pub const ENV_TRACKING_USERNAME: &str = "MLFLOW_TRACKING_USERNAME";
pub const ENV_TRACKING_PASSWORD: &str = "MLFLOW_TRACKING_PASSWORD";
pub const ENV_REQUEST_TIMEOUT: &str = "MLFLOW_HTTP_REQUEST_TIMEOUT";

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Credentials sent with every request
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TrackingAuth {
    #[default]
    None,
    Bearer(String),
    Basic { username: String, password: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackingConfig {
    pub auth: TrackingAuth,
    pub timeout: Duration,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            auth: TrackingAuth::None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl TrackingConfig {
    /// Read credentials and timeout from the `MLFLOW_*` environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let auth = if let Some(token) = non_empty(ENV_TRACKING_TOKEN) {
            TrackingAuth::Bearer(token)
        } else if let Some(username) = non_empty(ENV_TRACKING_USERNAME) {
            let password = non_empty(ENV_TRACKING_PASSWORD).ok_or_else(|| {
                LegendaryError::ConfigError(format!(
                    "{} is set but {} is missing",
                    ENV_TRACKING_USERNAME, ENV_TRACKING_PASSWORD
                ))
            })?;
            TrackingAuth::Basic { username, password }
        } else {
            TrackingAuth::None
        };

        let timeout = match non_empty(ENV_REQUEST_TIMEOUT) {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| LegendaryError::InvalidParameter {
                    name: ENV_REQUEST_TIMEOUT.to_string(),
                    value: raw.clone(),
                    reason: "expected whole seconds".to_string(),
                })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self { auth, timeout })
    }

    pub fn with_auth(mut self, auth: TrackingAuth) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
