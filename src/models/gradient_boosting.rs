//! Log-loss gradient boosting for binary labels
//!
//! The ensemble starts from the prior log-odds. Each round fits a shallow
//! regression tree to the residuals `y - p` of an optional row subsample,
//! then shifts the log-odds of every row by `learning_rate` times that
//! tree's output.

use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use super::decision_tree::DecisionTree;
use super::{check_binary_labels, check_training_set, normalize_in_place, sigmoid};
use crate::error::{PipelineError, Result};

/// Hyperparameters for [`GradientBoostingClassifier`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingConfig {
    pub n_estimators: usize,
    /// Shrinkage applied to each tree's output
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Fraction of rows each tree is fitted on, in (0, 1]
    pub subsample: f64,
    pub random_state: Option<u64>,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
            subsample: 1.0,
            random_state: None,
        }
    }
}

fn invalid(name: &str, value: f64, reason: &str) -> PipelineError {
    PipelineError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

impl GradientBoostingConfig {
    fn validate(&self) -> Result<()> {
        if self.subsample <= 0.0 || self.subsample > 1.0 || self.subsample.is_nan() {
            return Err(invalid("subsample", self.subsample, "must be in (0, 1]"));
        }
        if self.learning_rate <= 0.0 || self.learning_rate.is_nan() {
            return Err(invalid("learning_rate", self.learning_rate, "must be positive"));
        }
        Ok(())
    }

    /// Rows for one round: all of them, or a sorted random subset of at least two
    fn draw_rows(&self, n: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
        if self.subsample >= 1.0 {
            return (0..n).collect();
        }
        let take = ((n as f64 * self.subsample).ceil() as usize).clamp(2, n);
        let mut rows = rand::seq::index::sample(rng, n, take).into_vec();
        rows.sort_unstable();
        rows
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    config: GradientBoostingConfig,
    prior_log_odds: f64,
    stages: Vec<DecisionTree>,
    importances: Vec<f64>,
}

impl Default for GradientBoostingClassifier {
    fn default() -> Self {
        Self::new(GradientBoostingConfig::default())
    }
}

impl GradientBoostingClassifier {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            prior_log_odds: 0.0,
            stages: Vec::new(),
            importances: Vec::new(),
        }
    }

    pub fn config(&self) -> &GradientBoostingConfig {
        &self.config
    }

    fn stage_tree(&self) -> DecisionTree {
        DecisionTree::new_regressor()
            .with_max_depth(self.config.max_depth)
            .with_min_samples_leaf(self.config.min_samples_leaf)
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.config.validate()?;
        check_training_set("gradient boosting", x, y, 2)?;
        check_binary_labels("gradient boosting", y)?;

        let positive_rate = y.mean().unwrap_or(0.5).clamp(1e-10, 1.0 - 1e-10);
        self.prior_log_odds = (positive_rate / (1.0 - positive_rate)).ln();

        let mut rng = self
            .config
            .random_state
            .map_or_else(Xoshiro256PlusPlus::from_entropy, Xoshiro256PlusPlus::seed_from_u64);

        let mut scores = Array1::from_elem(x.nrows(), self.prior_log_odds);
        let mut importances = vec![0.0; x.ncols()];
        let mut stages = Vec::with_capacity(self.config.n_estimators);

        for _ in 0..self.config.n_estimators {
            let residuals = y - &scores.mapv(sigmoid);
            let rows = self.config.draw_rows(x.nrows(), &mut rng);

            let mut tree = self.stage_tree();
            tree.fit(&x.select(Axis(0), &rows), &residuals.select(Axis(0), &rows))?;
            scores.scaled_add(self.config.learning_rate, &tree.predict(x)?);

            if let Some(imp) = tree.feature_importances() {
                importances.iter_mut().zip(imp.iter()).for_each(|(a, v)| *a += v);
            }
            stages.push(tree);
        }

        normalize_in_place(&mut importances);
        self.stages = stages;
        self.importances = importances;
        Ok(())
    }

    /// Raw ensemble log-odds per row
    fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.stages.is_empty() && self.config.n_estimators > 0 {
            return Err(PipelineError::ModelNotFitted);
        }
        let mut scores = Array1::from_elem(x.nrows(), self.prior_log_odds);
        for tree in &self.stages {
            scores.scaled_add(self.config.learning_rate, &tree.predict(x)?);
        }
        Ok(scores)
    }

    /// Positive-class probability per row
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.decision_function(x)?.mapv(sigmoid))
    }

    /// Label 1 where the log-odds are positive
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.decision_function(x)?.mapv(|s| if s > 0.0 { 1.0 } else { 0.0 }))
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 100 rows on a diagonal line, positive once x0 + x1 passes 10
    fn diagonal() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((100, 2), |(i, j)| (2 * i + j) as f64 * 0.1);
        let y = x.map_axis(Axis(1), |row| if row.sum() > 10.0 { 1.0 } else { 0.0 });
        (x, y)
    }

    fn accuracy(model: &GradientBoostingClassifier, x: &Array2<f64>, y: &Array1<f64>) -> f64 {
        let pred = model.predict(x).unwrap();
        pred.iter().zip(y.iter()).filter(|(p, t)| p == t).count() as f64 / y.len() as f64
    }

    #[test]
    fn test_learns_diagonal_boundary() {
        let (x, y) = diagonal();
        let mut model = GradientBoostingClassifier::new(GradientBoostingConfig {
            n_estimators: 50,
            random_state: Some(42),
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();

        assert_eq!(model.stages.len(), 50);
        let acc = accuracy(&model, &x, &y);
        assert!(acc > 0.9, "accuracy {}", acc);

        let proba = model.predict_proba(&x).unwrap();
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_subsample_still_moves_every_row() {
        let (x, y) = diagonal();
        let mut model = GradientBoostingClassifier::new(GradientBoostingConfig {
            n_estimators: 30,
            learning_rate: 0.5,
            subsample: 0.6,
            random_state: Some(1),
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();

        let acc = accuracy(&model, &x, &y);
        assert!(acc > 0.9, "accuracy {}", acc);
    }

    #[test]
    fn test_draw_rows() {
        let config = GradientBoostingConfig { subsample: 0.25, ..Default::default() };
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        let rows = config.draw_rows(20, &mut rng);
        assert_eq!(rows.len(), 5);
        assert!(rows.windows(2).all(|w| w[0] < w[1]));

        let tiny = config.draw_rows(3, &mut rng);
        assert_eq!(tiny.len(), 2);
    }

    #[test]
    fn test_feature_importances_sum_to_one() {
        let (x, y) = diagonal();
        let mut model = GradientBoostingClassifier::new(GradientBoostingConfig {
            n_estimators: 5,
            random_state: Some(0),
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();

        let sum: f64 = model.feature_importances().iter().sum();
        assert!((sum - 1.0).abs() < 0.01, "importances sum to {}", sum);
    }

    #[test]
    fn test_rejects_bad_input() {
        let (x, _) = diagonal();
        let mut model = GradientBoostingClassifier::default();
        assert!(matches!(
            model.fit(&x, &Array1::from_elem(100, 2.0)),
            Err(PipelineError::FitFailure(_))
        ));
        assert!(matches!(model.predict(&x), Err(PipelineError::ModelNotFitted)));

        for config in [
            GradientBoostingConfig { subsample: 0.0, ..Default::default() },
            GradientBoostingConfig { learning_rate: 0.0, ..Default::default() },
        ] {
            let mut model = GradientBoostingClassifier::new(config);
            assert!(matches!(
                model.fit(&x, &Array1::zeros(100)),
                Err(PipelineError::InvalidParameter { .. })
            ));
        }
    }
}
