//! Random forest classifier

use super::config::{ForestConfig, MaxFeatures};
use super::decision_tree::{argmax_rows, DecisionTreeClassifier};
use crate::error::{LegendaryError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Bagged ensemble of Gini decision trees
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    trees: Vec<DecisionTreeClassifier>,
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features drawn per split
    pub max_features: MaxFeatures,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Worker threads used for fitting and prediction
    pub n_jobs: usize,
    /// Random state
    pub random_state: u64,
    n_features: usize,
    n_classes: usize,
    feature_importances: Option<Array1<f64>>,
}

impl Default for RandomForestClassifier {
    fn default() -> Self {
        Self::from_config(&ForestConfig::default())
    }
}

impl RandomForestClassifier {
    /// Create an unfitted forest with `n_estimators` trees and default settings
    pub fn new(n_estimators: usize) -> Self {
        Self::from_config(&ForestConfig::default().with_n_estimators(n_estimators))
    }

    /// Create an unfitted forest from a training config
    pub fn from_config(config: &ForestConfig) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators: config.n_estimators,
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            min_samples_leaf: config.min_samples_leaf,
            max_features: config.max_features,
            bootstrap: config.bootstrap,
            n_jobs: config.n_jobs,
            random_state: config.random_state,
            n_features: 0,
            n_classes: 0,
            feature_importances: None,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    fn thread_pool(&self) -> Result<rayon::ThreadPool> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.n_jobs.max(1))
            .thread_name(|i| format!("forest-worker-{}", i))
            .build()
            .map_err(|e| LegendaryError::ThreadPoolError(e.to_string()))
    }

    /// Fit the forest to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>) -> Result<&mut Self> {
        let n_samples = x.nrows();

        if n_samples != y.len() {
            return Err(LegendaryError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(LegendaryError::TrainingError(
                "cannot fit a forest on zero samples".to_string(),
            ));
        }
        if self.n_estimators == 0 {
            return Err(LegendaryError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        self.n_features = x.ncols();
        self.n_classes = y.iter().max().map_or(0, |&m| m + 1).max(2);
        let max_features = self.max_features.resolve(self.n_features);
        let n_classes = self.n_classes;

        tracing::debug!(
            n_estimators = self.n_estimators,
            n_samples,
            n_features = self.n_features,
            max_features,
            n_jobs = self.n_jobs,
            "Fitting random forest"
        );

        let pool = self.thread_pool()?;
        let trees: Vec<DecisionTreeClassifier> = pool.install(|| {
            (0..self.n_estimators)
                .into_par_iter()
                .map(|tree_idx| -> Result<DecisionTreeClassifier> {
                    let seed = self.random_state.wrapping_add(tree_idx as u64);
                    let mut rng = ChaCha8Rng::seed_from_u64(seed);

                    let mut tree = DecisionTreeClassifier::new()
                        .with_min_samples_split(self.min_samples_split)
                        .with_min_samples_leaf(self.min_samples_leaf)
                        .with_max_features(max_features)
                        .with_random_state(rng.gen());
                    if let Some(d) = self.max_depth {
                        tree = tree.with_max_depth(d);
                    }

                    if self.bootstrap {
                        let sample_indices: Vec<usize> =
                            (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();
                        let x_boot = x.select(Axis(0), &sample_indices);
                        let y_boot = y.select(Axis(0), &sample_indices);
                        tree.fit_with_classes(&x_boot, &y_boot, n_classes)?;
                    } else {
                        tree.fit_with_classes(x, y, n_classes)?;
                    }

                    Ok(tree)
                })
                .collect::<Result<Vec<_>>>()
        })?;

        self.trees = trees;
        self.compute_feature_importances();

        Ok(self)
    }

    fn compute_feature_importances(&mut self) {
        let mut total_importances = vec![0.0; self.n_features];

        for tree in &self.trees {
            if let Some(imp) = tree.feature_importances() {
                for (total, &val) in total_importances.iter_mut().zip(imp.iter()) {
                    *total += val;
                }
            }
        }

        let total: f64 = total_importances.iter().sum();
        if total > 0.0 {
            for imp in &mut total_importances {
                *imp /= total;
            }
        }

        self.feature_importances = Some(Array1::from_vec(total_importances));
    }

    /// Mean class probability over all trees
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.trees.is_empty() {
            return Err(LegendaryError::ModelNotFitted);
        }

        let pool = self.thread_pool()?;
        let per_tree: Vec<Array2<f64>> = pool.install(|| {
            self.trees
                .par_iter()
                .map(|tree| tree.predict_proba(x))
                .collect::<Result<Vec<_>>>()
        })?;

        let mut proba: Array2<f64> = Array2::zeros((x.nrows(), self.n_classes));
        for p in &per_tree {
            proba += p;
        }
        proba /= per_tree.len() as f64;
        Ok(proba)
    }

    /// Predicted class ids
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        let proba = self.predict_proba(x)?;
        Ok(argmax_rows(&proba))
    }

    /// Predicted booleans (class 1 is `true`)
    pub fn predict_bool(&self, x: &Array2<f64>) -> Result<Vec<bool>> {
        Ok(self.predict(x)?.iter().map(|&c| c == 1).collect())
    }

    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }
}
