//! Stratified k-fold splitting used by the grid search

use crate::config::constants::MODEL_TRAINER_CV_FOLDS;
use crate::error::{PipelineError, Result};
use ndarray::Array1;

/// One fold: held-out rows plus the rest, both ascending
#[derive(Debug, Clone, PartialEq)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Stratified k-fold without shuffling
///
/// Fold sizes per class come from dealing the class-sorted labels across the
/// folds; each class then fills its folds with its rows in order, so every
/// test fold holds a contiguous run of each class. Classes are ranked by
/// first appearance. This reproduces scikit-learn's `StratifiedKFold` with
/// `shuffle=False`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossValidator {
    n_splits: usize,
}

impl Default for CrossValidator {
    fn default() -> Self {
        Self::new(MODEL_TRAINER_CV_FOLDS)
    }
}

impl CrossValidator {
    pub fn new(n_splits: usize) -> Self {
        Self { n_splits }
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Every row lands in exactly one test fold
    pub fn split(&self, y: &Array1<f64>) -> Result<Vec<CVSplit>> {
        let k = self.n_splits;
        if k < 2 {
            return Err(PipelineError::Config(format!("n_splits must be at least 2, got {}", k)));
        }
        if y.len() < k {
            return Err(PipelineError::FitFailure(format!(
                "{} rows cannot fill {} folds",
                y.len(),
                k
            )));
        }

        let fold_of = Self::assign_folds(y, k);
        Ok((0..k)
            .map(|fold_idx| {
                let (test_indices, train_indices) =
                    (0..fold_of.len()).partition(|&row| fold_of[row] == fold_idx);
                CVSplit {
                    train_indices,
                    test_indices,
                    fold_idx,
                }
            })
            .collect())
    }

    /// Fold number per row
    fn assign_folds(y: &Array1<f64>, k: usize) -> Vec<usize> {
        let mut seen: Vec<i64> = Vec::new();
        let codes: Vec<usize> = y
            .iter()
            .map(|&v| {
                let label = v.round() as i64;
                let known = seen.iter().position(|&c| c == label);
                known.unwrap_or_else(|| {
                    seen.push(label);
                    seen.len() - 1
                })
            })
            .collect();

        // allocation[fold][class]
        let mut sorted = codes.clone();
        sorted.sort_unstable();
        let mut allocation = vec![vec![0usize; seen.len()]; k];
        for (pos, &class) in sorted.iter().enumerate() {
            allocation[pos % k][class] += 1;
        }

        // (current fold, rows already placed there) per class
        let mut cursor = vec![(0usize, 0usize); seen.len()];
        codes
            .iter()
            .map(|&class| {
                let (fold, placed) = &mut cursor[class];
                while *placed == allocation[*fold][class] {
                    *fold += 1;
                    *placed = 0;
                }
                *placed += 1;
                *fold
            })
            .collect()
    }
}
