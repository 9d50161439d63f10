//! Classification metrics

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Square table of actual (rows) versus predicted (columns) labels.
///
/// Rows and columns are indexed by the sorted union of labels seen in
/// either vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    labels: Vec<usize>,
    counts: Array2<u64>,
}

impl ConfusionMatrix {
    /// Count actual/predicted label pairs
    pub fn from_labels(y_true: &Array1<usize>, y_pred: &Array1<usize>) -> Self {
        let mut labels: Vec<usize> = y_true.iter().chain(y_pred.iter()).copied().collect();
        labels.sort_unstable();
        labels.dedup();

        let mut counts = Array2::zeros((labels.len(), labels.len()));
        for (t, p) in y_true.iter().zip(y_pred.iter()) {
            // both present in `labels` by construction
            if let (Ok(i), Ok(j)) = (labels.binary_search(t), labels.binary_search(p)) {
                counts[[i, j]] += 1;
            }
        }

        Self { labels, counts }
    }

    /// Wrap a precomputed square count table
    pub fn from_counts(counts: Array2<u64>) -> Self {
        let labels = (0..counts.nrows()).collect();
        Self { labels, counts }
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn counts(&self) -> &Array2<u64> {
        &self.counts
    }

    /// Sum of the diagonal (correct predictions)
    pub fn trace(&self) -> u64 {
        self.counts.diag().sum()
    }

    /// Sum of every cell
    pub fn total(&self) -> u64 {
        self.counts.sum()
    }

    /// trace / total, `None` when the matrix is empty
    pub fn accuracy(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        Some(self.trace() as f64 / total as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_all_mass_on_diagonal_is_perfect() {
        let cm = ConfusionMatrix::from_counts(array![[12, 0], [0, 3]]);
        assert_eq!(cm.accuracy(), Some(1.0));
    }

    #[test]
    fn test_no_mass_on_diagonal_is_zero() {
        let cm = ConfusionMatrix::from_counts(array![[0, 4], [9, 0]]);
        assert_eq!(cm.accuracy(), Some(0.0));
    }

    #[test]
    fn test_empty_matrix_has_no_accuracy() {
        let cm = ConfusionMatrix::from_labels(&array![], &array![]);
        assert_eq!(cm.total(), 0);
        assert_eq!(cm.accuracy(), None);

        let cm = ConfusionMatrix::from_counts(Array2::zeros((2, 2)));
        assert_eq!(cm.accuracy(), None);
    }

    #[test]
    fn test_from_labels() {
        let y_true = array![0, 0, 1, 1, 0];
        let y_pred = array![0, 1, 1, 0, 0];
        let cm = ConfusionMatrix::from_labels(&y_true, &y_pred);

        assert_eq!(cm.labels(), &[0, 1]);
        assert_eq!(cm.counts(), &array![[2, 1], [1, 1]]);
        assert_eq!(cm.trace(), 3);
        assert_eq!(cm.total(), 5);
        assert!((cm.accuracy().unwrap() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_single_observed_class() {
        let y = array![1, 1, 1];
        let cm = ConfusionMatrix::from_labels(&y, &y);
        assert_eq!(cm.labels(), &[1]);
        assert_eq!(cm.counts().shape(), &[1, 1]);
        assert_eq!(cm.accuracy(), Some(1.0));
    }
}
