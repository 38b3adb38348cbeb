//! KNN-based imputation

use crate::error::{PipelineError, Result};
use crate::imputation::{is_missing, Imputer, ImputerParams, WeightScheme};
use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// KNN-based imputer
///
/// Each missing cell is filled from the `n_neighbors` nearest fit rows that
/// have that feature present. Distances ignore coordinates missing on either
/// side and are rescaled by the share of coordinates present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KNNImputer {
    /// Number of neighbors
    n_neighbors: usize,
    /// Weights for averaging
    weights: WeightScheme,
    /// Extra missing marker besides NaN
    missing_value: Option<f64>,
    /// Fit rows, with every missing marker normalized to NaN
    fit_data: Option<Array2<f64>>,
    /// Per-feature means over present fit values, used when no donor exists
    feature_means: Option<Array1<f64>>,
}

impl KNNImputer {
    /// Create new KNN imputer
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors: n_neighbors.max(1),
            weights: WeightScheme::Uniform,
            missing_value: None,
            fit_data: None,
            feature_means: None,
        }
    }

    pub fn from_params(params: &ImputerParams) -> Self {
        Self::new(params.n_neighbors)
            .with_weights(params.weights)
            .with_missing_value(params.missing_value)
    }

    /// Set weighting scheme
    pub fn with_weights(mut self, weights: WeightScheme) -> Self {
        self.weights = weights;
        self
    }

    /// Set the extra missing marker
    pub fn with_missing_value(mut self, marker: Option<f64>) -> Self {
        self.missing_value = marker;
        self
    }

    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    pub fn is_fitted(&self) -> bool {
        self.fit_data.is_some()
    }

    pub fn n_features(&self) -> Option<usize> {
        self.fit_data.as_ref().map(|d| d.ncols())
    }

    /// NaN-aware euclidean distance; `None` when no coordinate is shared.
    fn distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> Option<f64> {
        let n_features = a.len();
        let mut present = 0usize;
        let mut accum = 0.0f64;

        for (&ai, &bi) in a.iter().zip(b.iter()) {
            if ai.is_nan() || bi.is_nan() {
                continue;
            }
            present += 1;
            let d = ai - bi;
            accum += d * d;
        }

        if present == 0 {
            return None;
        }
        Some((accum * n_features as f64 / present as f64).sqrt())
    }

    /// Impute a single cell from the (distance, donor) candidates
    fn impute_value(&self, data: &Array2<f64>, means: &Array1<f64>, donors: &[(f64, usize)], feature_idx: usize) -> f64 {
        if donors.is_empty() {
            let mean = means[feature_idx];
            return if mean.is_nan() { 0.0 } else { mean };
        }

        match self.weights {
            WeightScheme::Uniform => {
                let sum: f64 = donors.iter().map(|&(_, idx)| data[[idx, feature_idx]]).sum();
                sum / donors.len() as f64
            }
            WeightScheme::Distance => {
                // Exact matches take all the weight
                let exact: Vec<usize> = donors
                    .iter()
                    .filter(|(d, _)| *d == 0.0)
                    .map(|&(_, idx)| idx)
                    .collect();
                if !exact.is_empty() {
                    let sum: f64 = exact.iter().map(|&idx| data[[idx, feature_idx]]).sum();
                    return sum / exact.len() as f64;
                }

                let mut weighted_sum = 0.0;
                let mut weight_sum = 0.0;
                for &(dist, idx) in donors {
                    let weight = 1.0 / dist;
                    weighted_sum += data[[idx, feature_idx]] * weight;
                    weight_sum += weight;
                }
                weighted_sum / weight_sum
            }
        }
    }

    fn impute_row(&self, data: &Array2<f64>, means: &Array1<f64>, row: ArrayView1<f64>) -> Vec<(usize, f64)> {
        let normalized: Array1<f64> = row.mapv(|v| if is_missing(v, self.missing_value) { f64::NAN } else { v });

        let distances: Vec<Option<f64>> = data
            .rows()
            .into_iter()
            .map(|fit_row| Self::distance(normalized.view(), fit_row))
            .collect();

        let mut filled = Vec::new();
        for (j, &v) in normalized.iter().enumerate() {
            if !v.is_nan() {
                continue;
            }

            let mut donors: Vec<(f64, usize)> = distances
                .iter()
                .enumerate()
                .filter_map(|(i, d)| match d {
                    Some(dist) if !data[[i, j]].is_nan() => Some((*dist, i)),
                    _ => None,
                })
                .collect();
            // Stable sort keeps lower row indices first among equal distances
            donors.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
            donors.truncate(self.n_neighbors);

            filled.push((j, self.impute_value(data, means, &donors, j)));
        }
        filled
    }
}

impl Default for KNNImputer {
    fn default() -> Self {
        Self::from_params(&ImputerParams::default())
    }
}

impl Imputer for KNNImputer {
    fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        if x.nrows() == 0 {
            return Err(PipelineError::EmptySplit(
                "cannot fit KNN imputer on zero rows".to_string(),
            ));
        }

        let marker = self.missing_value;
        let data = x.mapv(|v| if is_missing(v, marker) { f64::NAN } else { v });

        let means: Array1<f64> = data
            .columns()
            .into_iter()
            .map(|col| {
                let (sum, count) = col
                    .iter()
                    .filter(|v| !v.is_nan())
                    .fold((0.0, 0usize), |(s, c), &v| (s + v, c + 1));
                if count == 0 { f64::NAN } else { sum / count as f64 }
            })
            .collect();

        self.fit_data = Some(data);
        self.feature_means = Some(means);
        Ok(())
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (data, means) = match (&self.fit_data, &self.feature_means) {
            (Some(d), Some(m)) => (d, m),
            _ => return Err(PipelineError::ModelNotFitted),
        };

        if x.ncols() != data.ncols() {
            return Err(PipelineError::Shape {
                expected: format!("{} features", data.ncols()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let marker = self.missing_value;
        let rows_with_gaps: Vec<usize> = x
            .rows()
            .into_iter()
            .enumerate()
            .filter(|(_, row)| row.iter().any(|&v| is_missing(v, marker)))
            .map(|(i, _)| i)
            .collect();

        let fills: Vec<(usize, Vec<(usize, f64)>)> = rows_with_gaps
            .par_iter()
            .map(|&i| (i, self.impute_row(data, means, x.row(i))))
            .collect();

        let mut result = x.clone();
        for (i, cells) in fills {
            for (j, value) in cells {
                result[[i, j]] = value;
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_knn_imputer_basic() {
        let data = Array2::from_shape_vec(
            (6, 2),
            vec![
                1.0, 10.0,
                2.0, 20.0,
                3.0, 30.0,
                4.0, 40.0,
                f64::NAN, 25.0, // Missing first feature
                2.5, f64::NAN, // Missing second feature
            ],
        ).unwrap();

        let mut imputer = KNNImputer::new(3);
        let result = imputer.fit_transform(&data).unwrap();

        assert!(!result.iter().any(|&v| v.is_nan()));
        assert!(result[[4, 0]] >= 1.0 && result[[4, 0]] <= 4.0);
        assert!(result[[5, 1]] >= 10.0 && result[[5, 1]] <= 40.0);
    }

    #[test]
    fn test_uniform_average_of_nearest() {
        let train = array![[0.0, 0.0], [1.0, 10.0], [2.0, 20.0], [10.0, 100.0]];
        let mut imputer = KNNImputer::new(2);
        imputer.fit(&train).unwrap();

        let test = array![[1.5, f64::NAN]];
        let out = imputer.transform(&test).unwrap();
        // nearest donors are rows 1 and 2
        assert!((out[[0, 1]] - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_complete_data_is_unchanged() {
        let train = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let test = array![[7.0, 8.0], [-1.0, 0.0]];
        let mut imputer = KNNImputer::new(3);
        let train_out = imputer.fit_transform(&train).unwrap();

        assert_eq!(train_out, train);
        assert_eq!(imputer.transform(&test).unwrap(), test);
    }

    #[test]
    fn test_falls_back_to_mean_without_donors() {
        // feature 1 is present in the fit data but the test row shares no coordinate
        let train = array![[1.0, 2.0], [3.0, 4.0]];
        let mut imputer = KNNImputer::new(3);
        imputer.fit(&train).unwrap();

        let out = imputer.transform(&array![[f64::NAN, f64::NAN]]).unwrap();
        assert!((out[[0, 0]] - 2.0).abs() < 1e-12);
        assert!((out[[0, 1]] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_distance_weights_prefer_close_rows() {
        let data = array![
            [0.0, 0.0],
            [1.0, 1.0],
            [2.0, 2.0],
            [3.0, 3.0],
            [0.1, f64::NAN],
        ];

        let mut imputer = KNNImputer::new(3).with_weights(WeightScheme::Distance);
        let result = imputer.fit_transform(&data).unwrap();

        assert!(result[[4, 1]].abs() < 1.0);
    }

    #[test]
    fn test_custom_marker() {
        let train = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0]];
        let mut imputer = KNNImputer::new(1).with_missing_value(Some(-999.0));
        imputer.fit(&train).unwrap();

        let out = imputer.transform(&array![[2.1, -999.0]]).unwrap();
        assert_eq!(out[[0, 1]], 2.0);
    }

    #[test]
    fn test_not_fitted_and_shape_errors() {
        let imputer = KNNImputer::new(3);
        assert!(matches!(
            imputer.transform(&array![[1.0]]),
            Err(PipelineError::ModelNotFitted)
        ));

        let mut imputer = KNNImputer::new(3);
        imputer.fit(&array![[1.0, 2.0]]).unwrap();
        assert!(matches!(
            imputer.transform(&array![[1.0]]),
            Err(PipelineError::Shape { .. })
        ));
    }

    #[test]
    fn test_empty_fit_fails() {
        let mut imputer = KNNImputer::new(3);
        let empty = Array2::<f64>::zeros((0, 4));
        assert!(matches!(imputer.fit(&empty), Err(PipelineError::EmptySplit(_))));
    }
}
