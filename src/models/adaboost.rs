//! AdaBoost (Adaptive Boosting) implementation
//!
//! SAMME boosting over decision stumps, weighting misclassified samples more
//! heavily in subsequent rounds.

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A single decision stump: splits on one feature at one threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Stump {
    feature_index: usize,
    threshold: f64,
    /// Class index when feature <= threshold
    left: usize,
    /// Class index when feature > threshold
    right: usize,
}

impl Stump {
    fn predict_sample(&self, sample: ArrayView1<f64>) -> usize {
        if sample[self.feature_index] <= self.threshold {
            self.left
        } else {
            self.right
        }
    }
}

/// AdaBoost Classifier (SAMME variant, supports multi-class)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaBoostClassifier {
    pub n_estimators: usize,
    pub learning_rate: f64,
    stumps: Vec<Stump>,
    alphas: Vec<f64>,
    classes: Vec<f64>,
    n_features: usize,
}

impl Default for AdaBoostClassifier {
    fn default() -> Self {
        Self::new(50, 1.0)
    }
}

impl AdaBoostClassifier {
    pub fn new(n_estimators: usize, learning_rate: f64) -> Self {
        Self {
            n_estimators,
            learning_rate,
            stumps: Vec::new(),
            alphas: Vec::new(),
            classes: Vec::new(),
            n_features: 0,
        }
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn is_fitted(&self) -> bool {
        !self.stumps.is_empty()
    }

    /// Number of stumps kept after early stopping
    #[cfg(test)]
    fn n_stumps(&self) -> usize {
        self.stumps.len()
    }

    /// Find the stump with the lowest weighted error, one sorted sweep per feature
    fn fit_stump(x: &Array2<f64>, labels: &[usize], weights: &Array1<f64>, n_classes: usize) -> Stump {
        let mut total = vec![0.0; n_classes];
        for (&c, &w) in labels.iter().zip(weights.iter()) {
            total[c] += w;
        }
        let total_weight: f64 = total.iter().sum();
        let majority = argmax(&total);

        // Constant stump as the baseline
        let mut best_stump = Stump {
            feature_index: 0,
            threshold: f64::INFINITY,
            left: majority,
            right: majority,
        };
        let mut best_error = total_weight - total[majority];

        for f in 0..x.ncols() {
            let col = x.column(f);
            let mut order: Vec<usize> = (0..x.nrows()).collect();
            order.sort_by(|&a, &b| col[a].partial_cmp(&col[b]).unwrap_or(Ordering::Equal));

            let mut left = vec![0.0; n_classes];
            for pos in 0..order.len().saturating_sub(1) {
                let i = order[pos];
                left[labels[i]] += weights[i];

                let (v, next) = (col[i], col[order[pos + 1]]);
                if v >= next {
                    continue;
                }

                let right: Vec<f64> = total.iter().zip(left.iter()).map(|(t, l)| t - l).collect();
                let left_label = argmax(&left);
                let right_label = argmax(&right);
                let error = total_weight - left[left_label] - right[right_label];

                if error < best_error - 1e-15 {
                    best_error = error;
                    best_stump = Stump {
                        feature_index: f,
                        threshold: (v + next) / 2.0,
                        left: left_label,
                        right: right_label,
                    };
                }
            }
        }
        best_stump
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        super::check_training_set("AdaBoost", x, y, 1)?;
        let n_samples = x.nrows();
        if self.n_estimators == 0 {
            return Err(PipelineError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "need at least one boosting round".to_string(),
            });
        }
        if !(self.learning_rate > 0.0) {
            return Err(PipelineError::InvalidParameter {
                name: "learning_rate".to_string(),
                value: self.learning_rate.to_string(),
                reason: "must be positive".to_string(),
            });
        }

        let (classes, labels) = super::encode_classes(y);
        let n_classes = classes.len();

        self.classes = classes;
        self.n_features = x.ncols();
        self.stumps.clear();
        self.alphas.clear();

        let mut weights = Array1::from_elem(n_samples, 1.0 / n_samples as f64);

        for _round in 0..self.n_estimators {
            let stump = Self::fit_stump(x, &labels, &weights, n_classes);

            let missed: Vec<bool> = x
                .rows()
                .into_iter()
                .zip(labels.iter())
                .map(|(row, &c)| stump.predict_sample(row) != c)
                .collect();
            let error: f64 = missed
                .iter()
                .zip(weights.iter())
                .filter(|(&m, _)| m)
                .map(|(_, &w)| w)
                .sum::<f64>() / weights.sum();

            // A perfect stump settles the ensemble
            if error <= 0.0 || n_classes < 2 {
                self.stumps.push(stump);
                self.alphas.push(1.0);
                break;
            }

            // No better than chance
            if error >= 1.0 - 1.0 / n_classes as f64 {
                if self.stumps.is_empty() {
                    return Err(PipelineError::FitFailure(
                        "AdaBoost base stump is no better than random guessing".to_string()
                    ));
                }
                break;
            }

            let alpha = self.learning_rate
                * (((1.0 - error) / error).ln() + (n_classes as f64 - 1.0).ln());

            for (w, &m) in weights.iter_mut().zip(missed.iter()) {
                if m {
                    *w *= alpha.exp();
                }
            }
            let w_sum = weights.sum();
            if w_sum > 0.0 {
                weights /= w_sum;
            }

            self.stumps.push(stump);
            self.alphas.push(alpha);
        }

        Ok(self)
    }

    /// Weighted vote per class, one row per sample
    fn decision_scores(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted() {
            return Err(PipelineError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(PipelineError::Shape {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let mut scores = Array2::zeros((x.nrows(), self.classes.len()));
        for (i, row) in x.rows().into_iter().enumerate() {
            for (stump, &alpha) in self.stumps.iter().zip(self.alphas.iter()) {
                scores[[i, stump.predict_sample(row)]] += alpha;
            }
        }
        Ok(scores)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let scores = self.decision_scores(x)?;
        Ok(scores
            .rows()
            .into_iter()
            .map(|row| self.classes[argmax(row.as_slice().unwrap_or(&[]))])
            .collect())
    }

    /// Feature importances from weighted stump feature usage
    pub fn feature_importances(&self) -> Option<Array1<f64>> {
        if !self.is_fitted() || self.n_features == 0 {
            return None;
        }
        let mut importances = vec![0.0f64; self.n_features];
        for (stump, &alpha) in self.stumps.iter().zip(self.alphas.iter()) {
            if stump.threshold.is_finite() {
                importances[stump.feature_index] += alpha.abs();
            }
        }
        super::normalize_in_place(&mut importances);
        Some(Array1::from_vec(importances))
    }
}

/// Index of the largest value; the first one wins ties
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn accuracy(pred: &Array1<f64>, y: &Array1<f64>) -> f64 {
        pred.iter().zip(y.iter()).filter(|(p, a)| p == a).count() as f64 / y.len() as f64
    }

    #[test]
    fn test_adaboost_binary() {
        let x = array![
            [1.0, 2.0], [2.0, 3.0], [3.0, 4.0],
            [6.0, 7.0], [7.0, 8.0], [8.0, 9.0],
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let mut model = AdaBoostClassifier::new(10, 1.0);
        model.fit(&x, &y).unwrap();

        assert!(model.is_fitted());
        // Perfect first stump stops boosting
        assert_eq!(model.n_stumps(), 1);
        assert_eq!(accuracy(&model.predict(&x).unwrap(), &y), 1.0);
    }

    #[test]
    fn test_adaboost_combines_stumps() {
        // Interval class: needs more than one stump
        let x = array![[0.0], [1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0], [8.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0];
        let mut model = AdaBoostClassifier::new(3, 1.0);
        model.fit(&x, &y).unwrap();

        assert!(model.n_stumps() > 1);
        assert_eq!(accuracy(&model.predict(&x).unwrap(), &y), 1.0);
    }

    #[test]
    fn test_single_class() {
        let x = array![[1.0], [2.0]];
        let y = array![1.0, 1.0];
        let mut model = AdaBoostClassifier::default();
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&array![[10.0]]).unwrap(), array![1.0]);
    }

    #[test]
    fn test_not_fitted() {
        let model = AdaBoostClassifier::default();
        assert!(matches!(model.predict(&array![[1.0]]), Err(PipelineError::ModelNotFitted)));
    }
}
