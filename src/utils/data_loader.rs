//! Data loading utilities
//!
//! Reads the Pokémon CSV either from an HTTP(S) location or from the local
//! file system and hands back a polars `DataFrame`.

use crate::error::{LegendaryError, Result};
use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;
use std::time::{Duration, Instant};

/// Data loader for remote and local CSV files
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Drop the leading index column after parsing
    index_col: bool,
    /// Rows used for schema inference
    infer_schema_length: usize,
    /// Timeout for remote fetches
    timeout: Duration,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self {
            index_col: true,
            infer_schema_length: 1000,
            timeout: Duration::from_secs(60),
        }
    }

    /// Treat the first column as an index and drop it
    pub fn with_index_col(mut self, index_col: bool) -> Self {
        self.index_col = index_col;
        self
    }

    /// Set the number of rows used for schema inference
    pub fn with_infer_schema_length(mut self, n: usize) -> Self {
        self.infer_schema_length = n.max(1);
        self
    }

    /// Set the timeout for remote fetches
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load a CSV from a URL or a path
    pub async fn load_csv(&self, location: &str) -> Result<DataFrame> {
        let start = Instant::now();

        let bytes = match self.read_bytes(location).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(
                    location,
                    error = %e,
                    "Unable to read data from the given location, check your data location"
                );
                return Err(e);
            }
        };

        let df = self.parse_csv(bytes)?;
        tracing::info!(
            location,
            rows = df.height(),
            cols = df.width(),
            elapsed = ?start.elapsed(),
            "Loaded dataset"
        );
        Ok(df)
    }

    /// Parse CSV bytes into a DataFrame
    pub fn parse_csv(&self, bytes: Vec<u8>) -> Result<DataFrame> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()
            .map_err(|e| LegendaryError::DataError(e.to_string()))?;

        if self.index_col {
            drop_index_column(df)
        } else {
            Ok(df)
        }
    }

    async fn read_bytes(&self, location: &str) -> Result<Vec<u8>> {
        if is_remote(location) {
            let client = reqwest::Client::builder()
                .timeout(self.timeout)
                .build()?;
            let response = client.get(location).send().await?;
            if !response.status().is_success() {
                return Err(LegendaryError::DataError(format!(
                    "GET {} returned {}",
                    location,
                    response.status()
                )));
            }
            Ok(response.bytes().await?.to_vec())
        } else {
            let path = location.strip_prefix("file://").unwrap_or(location);
            tokio::fs::read(Path::new(path))
                .await
                .map_err(|e| LegendaryError::DataError(format!("{}: {}", path, e)))
        }
    }
}

fn is_remote(location: &str) -> bool {
    let lower = location.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn drop_index_column(df: DataFrame) -> Result<DataFrame> {
    if df.width() == 0 {
        return Err(LegendaryError::DataError(
            "CSV has no columns to use as an index".to_string(),
        ));
    }

    let keep: Vec<String> = df
        .get_column_names()
        .into_iter()
        .skip(1)
        .map(|s| s.to_string())
        .collect();

    df.select(keep)
        .map_err(|e| LegendaryError::DataError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = ",name,hp,attack,legendary\n\
                       0,Bulbasaur,45,49,False\n\
                       1,Mewtwo,106,110,True\n";

    #[test]
    fn test_parse_drops_index_column() {
        let df = DataLoader::new().parse_csv(CSV.as_bytes().to_vec()).unwrap();

        assert_eq!(df.height(), 2);
        let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["name", "hp", "attack", "legendary"]);
    }

    #[test]
    fn test_parse_keeps_index_when_disabled() {
        let df = DataLoader::new()
            .with_index_col(false)
            .parse_csv(CSV.as_bytes().to_vec())
            .unwrap();

        assert_eq!(df.width(), 5);
    }

    #[test]
    fn test_is_remote() {
        assert!(is_remote("https://example.com/data.csv"));
        assert!(is_remote("HTTP://example.com/data.csv"));
        assert!(!is_remote("/tmp/data.csv"));
        assert!(!is_remote("file:///tmp/data.csv"));
    }

    #[tokio::test]
    async fn test_load_missing_file_is_an_error() {
        let result = DataLoader::new().load_csv("/definitely/not/here.csv").await;
        assert!(matches!(result, Err(LegendaryError::DataError(_))));
    }

    #[tokio::test]
    async fn test_load_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pokemon.csv");
        std::fs::write(&path, CSV).unwrap();

        let df = DataLoader::new()
            .load_csv(path.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(df.height(), 2);
    }
}
