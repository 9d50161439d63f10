//! Data preprocessing module
//!
//! Turns the raw Pokémon dataframe into model inputs:
//! - label extraction from the boolean `legendary` column
//! - removal of the label and leakage-prone columns (`generation`, `total`)
//! - selection of numeric and boolean feature columns

pub mod feature_selection;

pub use feature_selection::{FeatureSelector, PreparedData};

use crate::error::{LegendaryError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;

/// Default label column
pub const LABEL_COLUMN: &str = "legendary";

/// Columns dropped before modelling in addition to the label
pub const EXCLUDED_COLUMNS: [&str; 2] = ["generation", "total"];

/// Whether a column can be used as a model feature
pub fn is_feature_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Boolean
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Extract named columns into a row-major `Array2<f64>`.
///
/// Booleans become 0/1 and missing values become 0.0.
pub fn columns_to_array2(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = col_names.len();

    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|col_name| {
            let column = df
                .column(col_name)
                .map_err(|_| LegendaryError::FeatureNotFound(col_name.clone()))?;
            let column_f64 = column
                .cast(&DataType::Float64)
                .map_err(|e| LegendaryError::DataError(format!("{}: {}", col_name, e)))?;
            let values: Vec<f64> = column_f64
                .f64()
                .map_err(|e| LegendaryError::DataError(e.to_string()))?
                .into_iter()
                .map(|v| v.unwrap_or(0.0))
                .collect();
            Ok(values)
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| col_refs[c][r]))
}

/// Parse a boolean label column into class ids (false = 0, true = 1).
///
/// Accepts polars booleans, `true`/`false`/`1`/`0` strings in any case, and
/// numeric 0/1 columns.
pub fn labels_from_column(df: &DataFrame, label: &str) -> Result<Array1<usize>> {
    let column = df
        .column(label)
        .map_err(|_| LegendaryError::FeatureNotFound(label.to_string()))?;

    let invalid = |row: usize, value: String| {
        LegendaryError::DataError(format!(
            "label column '{}' has non-boolean value {} at row {}",
            label, value, row
        ))
    };

    let labels: Vec<usize> = match column.dtype() {
        DataType::Boolean => column
            .bool()
            .map_err(|e| LegendaryError::DataError(e.to_string()))?
            .into_iter()
            .enumerate()
            .map(|(row, v)| match v {
                Some(flag) => Ok(flag as usize),
                None => Err(invalid(row, "null".to_string())),
            })
            .collect::<Result<_>>()?,
        DataType::String => column
            .str()
            .map_err(|e| LegendaryError::DataError(e.to_string()))?
            .into_iter()
            .enumerate()
            .map(|(row, v)| match v.map(|s| s.trim().to_ascii_lowercase()) {
                Some(s) if s == "true" || s == "1" => Ok(1),
                Some(s) if s == "false" || s == "0" => Ok(0),
                Some(s) => Err(invalid(row, format!("'{}'", s))),
                None => Err(invalid(row, "null".to_string())),
            })
            .collect::<Result<_>>()?,
        _ => column
            .cast(&DataType::Float64)
            .map_err(|e| LegendaryError::DataError(e.to_string()))?
            .f64()
            .map_err(|e| LegendaryError::DataError(e.to_string()))?
            .into_iter()
            .enumerate()
            .map(|(row, v)| match v {
                Some(x) if x == 0.0 => Ok(0),
                Some(x) if x == 1.0 => Ok(1),
                Some(x) => Err(invalid(row, x.to_string())),
                None => Err(invalid(row, "null".to_string())),
            })
            .collect::<Result<_>>()?,
    };

    Ok(Array1::from_vec(labels))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_to_array2_casts_bools_and_fills_nulls() {
        let df = df!(
            "hp" => &[Some(45i64), None],
            "mega" => &[true, false]
        )
        .unwrap();

        let x = columns_to_array2(&df, &["hp".to_string(), "mega".to_string()]).unwrap();
        assert_eq!(x.shape(), &[2, 2]);
        assert_eq!(x[[0, 0]], 45.0);
        assert_eq!(x[[1, 0]], 0.0);
        assert_eq!(x[[0, 1]], 1.0);
    }

    #[test]
    fn test_labels_from_bool_column() {
        let df = df!("legendary" => &[false, true, true]).unwrap();
        let y = labels_from_column(&df, "legendary").unwrap();
        assert_eq!(y.to_vec(), vec![0, 1, 1]);
    }

    #[test]
    fn test_labels_from_string_column() {
        let df = df!("legendary" => &["True", "false", "TRUE"]).unwrap();
        let y = labels_from_column(&df, "legendary").unwrap();
        assert_eq!(y.to_vec(), vec![1, 0, 1]);
    }

    #[test]
    fn test_labels_reject_garbage() {
        let df = df!("legendary" => &["yes", "no"]).unwrap();
        assert!(labels_from_column(&df, "legendary").is_err());

        let df = df!("legendary" => &[0.0, 2.0]).unwrap();
        assert!(labels_from_column(&df, "legendary").is_err());
    }

    #[test]
    fn test_missing_label_column() {
        let df = df!("hp" => &[1.0]).unwrap();
        assert!(matches!(
            labels_from_column(&df, "legendary"),
            Err(LegendaryError::FeatureNotFound(_))
        ));
    }
}
