//! Feature selection for the legendary classifier
//!
//! Mirrors the dataframe preparation the model is trained on: drop the label
//! and leakage-prone columns, then keep only numeric/boolean columns.

use super::{columns_to_array2, is_feature_dtype, labels_from_column, EXCLUDED_COLUMNS, LABEL_COLUMN};
use crate::error::{LegendaryError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Model-ready view of a dataframe
#[derive(Debug, Clone)]
pub struct PreparedData {
    /// Feature matrix (rows × features)
    pub features: Array2<f64>,
    /// Class ids (0 = normal, 1 = legendary)
    pub labels: Array1<usize>,
    /// Feature column names, in matrix order
    pub feature_names: Vec<String>,
}

impl PreparedData {
    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }
}

/// Selects label and feature columns from a dataframe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSelector {
    label: String,
    excluded: Vec<String>,
}

impl Default for FeatureSelector {
    fn default() -> Self {
        Self {
            label: LABEL_COLUMN.to_string(),
            excluded: EXCLUDED_COLUMNS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl FeatureSelector {
    /// Create a selector with the default label and exclusions
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the label column
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Replace the excluded columns
    pub fn with_excluded<I, S>(mut self, excluded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded = excluded.into_iter().map(Into::into).collect();
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Names of the columns used as features, in dataframe order
    pub fn feature_names(&self, df: &DataFrame) -> Vec<String> {
        df.get_columns()
            .iter()
            .filter(|col| {
                let name = col.name().as_str();
                name != self.label
                    && !self.excluded.iter().any(|e| e == name)
                    && is_feature_dtype(col.dtype())
            })
            .map(|col| col.name().to_string())
            .collect()
    }

    /// Build features and labels from a dataframe
    pub fn prepare(&self, df: &DataFrame) -> Result<PreparedData> {
        let feature_names = self.feature_names(df);
        if feature_names.is_empty() {
            return Err(LegendaryError::DataError(
                "no numeric feature columns left after selection".to_string(),
            ));
        }

        let labels = labels_from_column(df, &self.label)?;
        let features = columns_to_array2(df, &feature_names)?;

        tracing::debug!(
            n_samples = features.nrows(),
            n_features = features.ncols(),
            features = ?feature_names,
            "Prepared features"
        );

        Ok(PreparedData {
            features,
            labels,
            feature_names,
        })
    }

    /// Labels only
    pub fn labels(&self, df: &DataFrame) -> Result<Array1<usize>> {
        labels_from_column(df, &self.label)
    }

    /// Extract a fixed, ordered list of feature columns, e.g. the columns a
    /// loaded model was trained on
    pub fn features(&self, df: &DataFrame, names: &[String]) -> Result<Array2<f64>> {
        if let Some(name) = names.iter().find(|n| **n == self.label) {
            return Err(LegendaryError::InvalidParameter {
                name: "features".to_string(),
                value: name.clone(),
                reason: "label column cannot be used as a feature".to_string(),
            });
        }
        columns_to_array2(df, names)
    }
}
