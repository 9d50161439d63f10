use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use legendary::training::{ForestConfig, RandomForestClassifier};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn create_classification_data(n_rows: usize, n_features: usize) -> (Array2<f64>, Array1<usize>) {
    let mut rng = ChaCha8Rng::seed_from_u64(40);

    let x = Array2::from_shape_fn((n_rows, n_features), |_| rng.gen::<f64>() * 100.0);
    // Label rows whose first two features are both high
    let y = x
        .rows()
        .into_iter()
        .map(|row| usize::from(row[0] + row[1] > 120.0))
        .collect();

    (x, y)
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    group.sample_size(10); // Fewer samples for training benchmarks

    for n_rows in [800, 5000, 20000].iter() {
        let (x, y) = create_classification_data(*n_rows, 8);

        for n_jobs in [1, 2, 4] {
            let config = ForestConfig::default().with_n_jobs(n_jobs);
            group.bench_with_input(
                BenchmarkId::new(format!("fit_jobs_{}", n_jobs), n_rows),
                &(&x, &y),
                |b, (x, y)| {
                    b.iter(|| {
                        let mut forest = RandomForestClassifier::from_config(&config);
                        forest.fit(black_box(x), black_box(y)).unwrap();
                    })
                },
            );
        }
    }

    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let mut group = c.benchmark_group("prediction");

    // Train model once
    let (train_x, train_y) = create_classification_data(5000, 8);
    let mut forest = RandomForestClassifier::from_config(&ForestConfig::default());
    forest.fit(&train_x, &train_y).unwrap();

    for n_rows in [10, 1000, 10000].iter() {
        let (test_x, _) = create_classification_data(*n_rows, 8);

        group.bench_with_input(BenchmarkId::new("predict", n_rows), &test_x, |b, x| {
            b.iter(|| forest.predict(black_box(x)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_training, bench_prediction);
criterion_main!(benches);
