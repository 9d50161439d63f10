//! Shuffled train/test split

use crate::error::{LegendaryError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Result of a train/test split
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<usize>,
    pub y_test: Array1<usize>,
}

/// Shuffle rows with a seeded RNG and split them.
///
/// The test side gets `ceil(n * (1 - train_size))` rows; the rest train.
pub fn train_test_split(
    x: &Array2<f64>,
    y: &Array1<usize>,
    train_size: f64,
    seed: u64,
) -> Result<TrainTestSplit> {
    let n = x.nrows();
    if n != y.len() {
        return Err(LegendaryError::ShapeError {
            expected: format!("y length = {}", n),
            actual: format!("y length = {}", y.len()),
        });
    }
    if !(train_size > 0.0 && train_size < 1.0) {
        return Err(LegendaryError::InvalidParameter {
            name: "train_size".to_string(),
            value: train_size.to_string(),
            reason: "must be strictly between 0 and 1".to_string(),
        });
    }

    let n_test = (n as f64 * (1.0 - train_size)).ceil() as usize;
    let n_train = n.saturating_sub(n_test);
    if n_test == 0 || n_train == 0 {
        return Err(LegendaryError::DataError(format!(
            "cannot split {} rows with train_size {}: one side would be empty",
            n, train_size
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(n_test);

    Ok(TrainTestSplit {
        x_train: x.select(Axis(0), train_idx),
        x_test: x.select(Axis(0), test_idx),
        y_train: y.select(Axis(0), train_idx),
        y_test: y.select(Axis(0), test_idx),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(n: usize) -> (Array2<f64>, Array1<usize>) {
        let x = Array2::from_shape_fn((n, 2), |(r, c)| (r * 10 + c) as f64);
        let y = Array1::from_shape_fn(n, |r| r % 2);
        (x, y)
    }

    #[test]
    fn test_split_sizes() {
        let (x, y) = data(11);
        let split = train_test_split(&x, &y, 0.8, 0).unwrap();

        // ceil(11 * 0.2) = 3
        assert_eq!(split.x_test.nrows(), 3);
        assert_eq!(split.x_train.nrows(), 8);
        assert_eq!(split.y_test.len(), 3);
        assert_eq!(split.y_train.len(), 8);
    }

    #[test]
    fn test_split_is_a_partition_and_rows_stay_aligned() {
        let (x, y) = data(20);
        let split = train_test_split(&x, &y, 0.8, 7).unwrap();

        let mut seen: Vec<usize> = split
            .x_train
            .rows()
            .into_iter()
            .chain(split.x_test.rows())
            .map(|row| (row[0] / 10.0) as usize)
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..20).collect::<Vec<_>>());

        for (row, &label) in split.x_train.rows().into_iter().zip(split.y_train.iter()) {
            assert_eq!((row[0] / 10.0) as usize % 2, label);
        }
    }

    #[test]
    fn test_split_is_deterministic() {
        let (x, y) = data(30);
        let a = train_test_split(&x, &y, 0.8, 0).unwrap();
        let b = train_test_split(&x, &y, 0.8, 0).unwrap();
        assert_eq!(a.x_test, b.x_test);
        assert_eq!(a.y_train, b.y_train);
    }

    #[test]
    fn test_split_rejects_degenerate_inputs() {
        let (x, y) = data(1);
        assert!(train_test_split(&x, &y, 0.8, 0).is_err());

        let (x, y) = data(10);
        assert!(train_test_split(&x, &y, 1.5, 0).is_err());
        assert!(train_test_split(&x, &y.slice(ndarray::s![..5]).to_owned(), 0.8, 0).is_err());
    }
}
