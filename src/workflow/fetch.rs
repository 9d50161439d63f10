//! Fetch a registered model and score sample rows

use super::DEFAULT_DATA_URL;
use crate::error::{LegendaryError, Result};
use crate::preprocessing::FeatureSelector;
use crate::tracking::{ExperimentTracker, ModelUri};
use crate::utils::DataLoader;
use polars::prelude::*;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Registered model name; the experiment name by convention
    pub model_name: String,
    pub model_version: String,
    pub data_url: String,
    /// Rows sampled per class
    pub samples: usize,
    /// Sampling seed; random when unset
    pub seed: Option<u64>,
    pub selector: FeatureSelector,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            model_name: "pokemon".to_string(),
            model_version: "4".to_string(),
            data_url: DEFAULT_DATA_URL.to_string(),
            samples: 5,
            seed: None,
            selector: FeatureSelector::default(),
        }
    }
}

impl FetchSettings {
    pub fn model_uri(&self) -> ModelUri {
        ModelUri::new(&self.model_name, &self.model_version)
    }
}

/// Predictions for the two sampled groups
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub model_uri: ModelUri,
    pub legendary_predictions: Vec<bool>,
    pub normal_predictions: Vec<bool>,
}

/// Sample up to `n` legendary and `n` normal rows.
///
/// Both samples have the label, the excluded columns and non-numeric columns
/// removed. A class with fewer than `n` rows contributes all of them.
pub fn prepare_sample_data(
    df: &DataFrame,
    selector: &FeatureSelector,
    n: usize,
    seed: Option<u64>,
) -> Result<(DataFrame, DataFrame)> {
    let labels = selector.labels(df)?;
    let (legendary_rows, normal_rows): (Vec<usize>, Vec<usize>) =
        (0..labels.len()).partition(|&i| labels[i] == 1);

    let seed = seed.unwrap_or_else(|| rand::thread_rng().gen());
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let feature_names = selector.feature_names(df);
    if feature_names.is_empty() {
        return Err(LegendaryError::DataError(
            "no numeric feature columns left after selection".to_string(),
        ));
    }

    let legendary = sample_rows(df, &legendary_rows, n, &mut rng)?.select(feature_names.clone())?;
    let normal = sample_rows(df, &normal_rows, n, &mut rng)?.select(feature_names)?;

    tracing::debug!(
        legendary = legendary.height(),
        normal = normal.height(),
        seed,
        "Sampled rows"
    );
    Ok((legendary, normal))
}

fn sample_rows(df: &DataFrame, rows: &[usize], n: usize, rng: &mut ChaCha8Rng) -> Result<DataFrame> {
    let amount = n.min(rows.len());
    let picked: Vec<IdxSize> = index::sample(rng, rows.len(), amount)
        .into_iter()
        .map(|i| rows[i] as IdxSize)
        .collect();
    let idx = IdxCa::from_vec("idx".into(), picked);
    Ok(df.take(&idx)?)
}

/// Load the dataset, fetch the model and predict both samples
pub async fn test_model(settings: &FetchSettings, tracker: &ExperimentTracker) -> Result<FetchOutcome> {
    let df = DataLoader::new().load_csv(&settings.data_url).await?;
    let (legendary_sample, normal_sample) =
        prepare_sample_data(&df, &settings.selector, settings.samples, settings.seed)?;

    let model_uri = settings.model_uri();
    let model = tracker.load_model(&model_uri).await?;

    let legendary_predictions = model.predict(&legendary_sample)?;
    let normal_predictions = model.predict(&normal_sample)?;

    Ok(FetchOutcome {
        model_uri,
        legendary_predictions,
        normal_predictions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pokemon_df() -> DataFrame {
        df!(
            "name" => &["Mew", "Mewtwo", "Pidgey", "Rattata", "Zubat", "Onix"],
            "hp" => &[100i64, 106, 40, 30, 40, 35],
            "attack" => &[100.0, 110.0, 45.0, 56.0, 45.0, 45.0],
            "total" => &[600i64, 680, 251, 253, 245, 385],
            "generation" => &[1i64, 1, 1, 1, 1, 1],
            "legendary" => &[true, true, false, false, false, false]
        )
        .unwrap()
    }

    #[test]
    fn test_samples_are_capped_by_class_size() {
        let selector = FeatureSelector::default();
        let (legendary, normal) = prepare_sample_data(&pokemon_df(), &selector, 3, Some(7)).unwrap();

        assert_eq!(legendary.height(), 2);
        assert_eq!(normal.height(), 3);
        let names: Vec<String> = normal
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(names, vec!["hp", "attack"]);
    }

    #[test]
    fn test_sampling_is_seeded() {
        let selector = FeatureSelector::default();
        let (_, a) = prepare_sample_data(&pokemon_df(), &selector, 2, Some(11)).unwrap();
        let (_, b) = prepare_sample_data(&pokemon_df(), &selector, 2, Some(11)).unwrap();
        assert!(a.equals(&b));
    }

    #[test]
    fn test_legendary_sample_only_holds_legendary_rows() {
        let selector = FeatureSelector::default();
        let (legendary, _) = prepare_sample_data(&pokemon_df(), &selector, 5, None).unwrap();
        let hp = legendary.column("hp").unwrap().i64().unwrap();
        assert!(hp.into_no_null_iter().all(|v| v >= 100));
    }
}
