//! Integration test: forest training and evaluation

use legendary::preprocessing::FeatureSelector;
use legendary::training::{
    fit_and_evaluate, train_test_split, ConfusionMatrix, DecisionTreeClassifier, ForestConfig,
    RandomForestClassifier,
};
use ndarray::{array, Array1, Array2};
use polars::prelude::*;

fn pokemon_df() -> DataFrame {
    let n = 40;
    let mut hp = Vec::with_capacity(n);
    let mut attack = Vec::with_capacity(n);
    let mut speed = Vec::with_capacity(n);
    let mut legendary = Vec::with_capacity(n);

    for i in 0..n {
        let is_legendary = i % 4 == 0;
        let base = if is_legendary { 100.0 } else { 50.0 };
        hp.push(base + (i % 7) as f64);
        attack.push(base + (i % 5) as f64 * 2.0);
        speed.push(40.0 + (i % 11) as f64 * 3.0);
        legendary.push(is_legendary);
    }

    df!(
        "hp" => &hp,
        "attack" => &attack,
        "speed" => &speed,
        "total" => &hp,
        "generation" => &vec![1i64; n],
        "legendary" => &legendary
    )
    .unwrap()
}

#[test]
fn test_diagonal_confusion_matrix_accuracy_is_one() {
    let cm = ConfusionMatrix::from_counts(array![[25, 0], [0, 7]]);
    assert_eq!(cm.accuracy(), Some(1.0));
}

#[test]
fn test_off_diagonal_confusion_matrix_accuracy_is_zero() {
    let cm = ConfusionMatrix::from_counts(array![[0, 4], [9, 0]]);
    assert_eq!(cm.accuracy(), Some(0.0));
}

#[test]
fn test_empty_confusion_matrix_has_no_accuracy() {
    let cm = ConfusionMatrix::from_labels(&Array1::from(vec![]), &Array1::from(vec![]));
    assert_eq!(cm.accuracy(), None);
}

#[test]
fn test_fit_and_evaluate_on_separable_data() {
    let prepared = FeatureSelector::default().prepare(&pokemon_df()).unwrap();
    let (forest, report) = fit_and_evaluate(&prepared, &ForestConfig::default()).unwrap();

    assert_eq!(report.n_train + report.n_test, 40);
    assert_eq!(report.n_test, 8);
    assert!(report.accuracy >= 0.75, "accuracy was {}", report.accuracy);
    assert_eq!(report.confusion_matrix.total(), 8);
    assert_eq!(forest.n_trees(), 10);
    assert_eq!(forest.n_features(), 3);
}

#[test]
fn test_same_seed_gives_same_model() {
    let prepared = FeatureSelector::default().prepare(&pokemon_df()).unwrap();
    let config = ForestConfig::default().with_n_estimators(7).with_random_state(42);

    let (a, report_a) = fit_and_evaluate(&prepared, &config).unwrap();
    let (b, report_b) = fit_and_evaluate(&prepared, &config.clone().with_n_jobs(1)).unwrap();

    assert_eq!(report_a.accuracy, report_b.accuracy);
    assert_eq!(
        a.predict_proba(&prepared.features).unwrap(),
        b.predict_proba(&prepared.features).unwrap()
    );
}

#[test]
fn test_invalid_config_is_rejected() {
    let prepared = FeatureSelector::default().prepare(&pokemon_df()).unwrap();
    let config = ForestConfig::default().with_min_samples_split(1);
    assert!(fit_and_evaluate(&prepared, &config).is_err());
}

#[test]
fn test_split_sizes() {
    let x = Array2::from_shape_fn((10, 2), |(i, j)| (i * 2 + j) as f64);
    let y = Array1::from_iter((0..10).map(|i| i % 2));
    let split = train_test_split(&x, &y, 0.8, 0).unwrap();

    assert_eq!(split.x_train.nrows(), 8);
    assert_eq!(split.x_test.nrows(), 2);
    assert_eq!(split.y_train.len(), 8);
    assert_eq!(split.y_test.len(), 2);
}

#[test]
fn test_decision_tree_respects_max_depth() {
    let x = Array2::from_shape_fn((32, 1), |(i, _)| i as f64);
    let y = Array1::from_iter((0..32).map(|i| (i / 4) % 2));

    let mut tree = DecisionTreeClassifier::new().with_max_depth(2);
    tree.fit(&x, &y).unwrap();
    // levels are counted from the root, leaves sit at depth 2
    assert!(tree.get_depth() <= 3);
    assert!(tree.get_n_leaves() <= 4);
}

#[test]
fn test_unfitted_forest_cannot_predict() {
    let forest = RandomForestClassifier::new(3);
    assert!(forest.predict(&array![[1.0, 2.0]]).is_err());
}
