//! Integration test: dataset loading and feature preparation

use legendary::preprocessing::{FeatureSelector, EXCLUDED_COLUMNS, LABEL_COLUMN};
use legendary::utils::DataLoader;
use polars::prelude::*;

const POKEMON_CSV: &str = "\
,name,type1,type2,total,hp,attack,defense,sp_attack,sp_defense,speed,generation,legendary
0,Bulbasaur,grass,poison,318,45,49,49,65,65,45,1,False
1,Charmander,fire,,309,39,52,43,60,50,65,1,False
2,Mewtwo,psychic,,680,106,110,90,154,90,130,1,True
3,Lugia,psychic,flying,680,106,90,130,90,154,110,2,True
4,Pidgey,normal,flying,251,40,45,40,35,35,56,1,False
";

async fn load(csv: &str) -> DataFrame {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pokemon.csv");
    std::fs::write(&path, csv).unwrap();
    DataLoader::new()
        .load_csv(path.to_str().unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_index_column_is_dropped() {
    let df = load(POKEMON_CSV).await;
    assert_eq!(df.height(), 5);
    assert_eq!(df.get_column_names()[0].as_str(), "name");
}

#[tokio::test]
async fn test_prepared_features_exclude_label_and_leaky_columns() {
    let df = load(POKEMON_CSV).await;
    let prepared = FeatureSelector::default().prepare(&df).unwrap();

    assert!(!prepared.feature_names.iter().any(|n| n == LABEL_COLUMN));
    for excluded in EXCLUDED_COLUMNS {
        assert!(!prepared.feature_names.iter().any(|n| n == excluded));
    }
    for text_column in ["name", "type1", "type2"] {
        assert!(!prepared.feature_names.iter().any(|n| n == text_column));
    }
    assert_eq!(
        prepared.feature_names,
        vec!["hp", "attack", "defense", "sp_attack", "sp_defense", "speed"]
    );
    assert_eq!(prepared.labels.to_vec(), vec![0, 0, 1, 1, 0]);
}

#[tokio::test]
async fn test_custom_label_is_never_a_feature() {
    let df = load(POKEMON_CSV).await;
    let selector = FeatureSelector::new().with_label("speed");
    let names = selector.feature_names(&df);

    assert!(!names.iter().any(|n| n == "speed"));
    assert!(!names.iter().any(|n| n == "total"));
    assert!(!names.iter().any(|n| n == "generation"));
}

#[tokio::test]
async fn test_missing_label_column_is_an_error() {
    let df = load(",hp,attack\n0,45,49\n1,39,52\n").await;
    assert!(FeatureSelector::default().prepare(&df).is_err());
}

#[tokio::test]
async fn test_unreadable_location_is_an_error() {
    let result = DataLoader::new()
        .load_csv("/definitely/not/here/pokemon.csv")
        .await;
    assert!(result.is_err());
}
