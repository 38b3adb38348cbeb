//! Missing value imputation
//!
//! Imputers are fit on training features only and then reused, unchanged,
//! for every split they transform.

mod knn;

pub use knn::KNNImputer;

use crate::config::constants::DATA_TRANSFORMATION_N_NEIGHBORS;
use crate::error::Result;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Trait for imputers
pub trait Imputer: Send + Sync {
    /// Fit the imputer on data with missing values
    fn fit(&mut self, x: &Array2<f64>) -> Result<()>;

    /// Transform data by imputing missing values
    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>>;

    /// Fit and transform in one step
    fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}

/// Neighbor weighting used when averaging donor values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightScheme {
    Uniform,
    Distance,
}

/// Parameters of the KNN imputer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImputerParams {
    pub n_neighbors: usize,
    pub weights: WeightScheme,
    /// Extra numeric marker treated as missing; NaN is always missing.
    pub missing_value: Option<f64>,
}

impl Default for ImputerParams {
    fn default() -> Self {
        Self {
            n_neighbors: DATA_TRANSFORMATION_N_NEIGHBORS,
            weights: WeightScheme::Uniform,
            missing_value: None,
        }
    }
}

/// Check if value is missing under an optional sentinel marker
#[inline]
pub fn is_missing(v: f64, marker: Option<f64>) -> bool {
    v.is_nan() || marker.map_or(false, |m| v == m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_missing() {
        assert!(is_missing(f64::NAN, None));
        assert!(!is_missing(0.0, None));
        assert!(is_missing(-999.0, Some(-999.0)));
        assert!(is_missing(f64::NAN, Some(-999.0)));
        assert!(!is_missing(1.0, Some(-999.0)));
    }

    #[test]
    fn test_params_from_yaml_defaults() {
        let params: ImputerParams = serde_yaml::from_str("weights: distance").unwrap();
        assert_eq!(params.n_neighbors, 3);
        assert_eq!(params.weights, WeightScheme::Distance);
        assert_eq!(params.missing_value, None);
    }
}
