//! Training configuration

use crate::error::{LegendaryError, Result};
use serde::{Deserialize, Serialize};

/// Strategy for the number of features tried at each split
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Log2 of n_features
    Log2,
    /// Fraction of n_features
    Fraction(f64),
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

impl MaxFeatures {
    /// Resolve to a concrete feature count (at least 1)
    pub fn resolve(&self, n_features: usize) -> usize {
        match *self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().ceil() as usize,
            MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
            MaxFeatures::Fixed(n) => n,
            MaxFeatures::All => n_features,
        }
        .clamp(1, n_features.max(1))
    }
}

/// Random forest hyper-parameters plus the evaluation split
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree (`None` grows until pure)
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node
    pub min_samples_split: usize,
    /// Minimum samples in a leaf
    pub min_samples_leaf: usize,
    /// Features considered per split
    pub max_features: MaxFeatures,
    /// Bootstrap sampling per tree
    pub bootstrap: bool,
    /// Worker threads used to fit trees
    pub n_jobs: usize,
    /// Seed for bootstrap, feature sampling and the train/test split
    pub random_state: u64,
    /// Fraction of rows used for training
    pub train_size: f64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 10,
            max_depth: Some(5),
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            n_jobs: 2,
            random_state: 0,
            train_size: 0.8,
        }
    }
}

impl ForestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_train_size(mut self, train_size: f64) -> Self {
        self.train_size = train_size;
        self
    }

    /// Reject parameter values the forest cannot be fitted with
    pub fn validate(&self) -> Result<()> {
        let invalid = |name: &str, value: String, reason: &str| {
            Err(LegendaryError::InvalidParameter {
                name: name.to_string(),
                value,
                reason: reason.to_string(),
            })
        };

        if self.n_estimators == 0 {
            return invalid("n_estimators", "0".into(), "must be at least 1");
        }
        if self.max_depth == Some(0) {
            return invalid("max_depth", "0".into(), "must be at least 1");
        }
        if self.min_samples_split < 2 {
            return invalid(
                "min_samples_split",
                self.min_samples_split.to_string(),
                "must be at least 2",
            );
        }
        if self.min_samples_leaf == 0 {
            return invalid("min_samples_leaf", "0".into(), "must be at least 1");
        }
        if self.n_jobs == 0 {
            return invalid("n_jobs", "0".into(), "must be at least 1");
        }
        if !(self.train_size > 0.0 && self.train_size < 1.0) {
            return invalid(
                "train_size",
                self.train_size.to_string(),
                "must be strictly between 0 and 1",
            );
        }
        if let MaxFeatures::Fraction(f) = self.max_features {
            if !(f > 0.0 && f <= 1.0) {
                return invalid("max_features", f.to_string(), "fraction must be in (0, 1]");
            }
        }
        Ok(())
    }
}
