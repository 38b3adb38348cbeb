//! Evaluation metrics for binary classification

use crate::artifact::ClassificationMetricArtifact;
use crate::error::{PipelineError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label counted as the positive class
pub const POSITIVE_LABEL: f64 = 1.0;

/// Metric used to score a refit model on the held-out split
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMetric {
    /// Coefficient of determination of the predicted labels
    #[default]
    R2,
    Accuracy,
    F1,
}

impl ScoreMetric {
    pub fn score(self, y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
        match self {
            ScoreMetric::R2 => r2_score(y_true, y_pred),
            ScoreMetric::Accuracy => accuracy(y_true, y_pred),
            ScoreMetric::F1 => Ok(get_classification_score(y_true, y_pred)?.f1_score),
        }
    }
}

impl fmt::Display for ScoreMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreMetric::R2 => write!(f, "r2"),
            ScoreMetric::Accuracy => write!(f, "accuracy"),
            ScoreMetric::F1 => write!(f, "f1"),
        }
    }
}

fn check_lengths(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(PipelineError::Shape {
            expected: format!("{} predictions", y_true.len()),
            actual: format!("{} predictions", y_pred.len()),
        });
    }
    if y_true.is_empty() {
        return Err(PipelineError::EmptySplit(
            "cannot score an empty set of predictions".to_string()
        ));
    }
    Ok(())
}

/// Confusion counts (tp, fp, tn, fn) for the positive label
fn confusion_counts(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> (usize, usize, usize, usize) {
    let mut tp = 0;
    let mut fp = 0;
    let mut tn = 0;
    let mut fn_ = 0;

    for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
        match (t == POSITIVE_LABEL, p == POSITIVE_LABEL) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (false, false) => tn += 1,
            (true, false) => fn_ += 1,
        }
    }

    (tp, fp, tn, fn_)
}

/// Fraction of exact label matches
pub fn accuracy(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let correct = y_true.iter().zip(y_pred.iter()).filter(|(t, p)| t == p).count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// R-squared; a constant target scores 1.0 on a perfect fit and 0.0 otherwise
pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;

    let mean = y_true.mean().unwrap_or(0.0);
    let ss_res: f64 = y_true.iter().zip(y_pred.iter()).map(|(t, p)| (t - p).powi(2)).sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}

/// F1, precision and recall of the positive label; an undefined ratio is 0.0
pub fn get_classification_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<ClassificationMetricArtifact> {
    check_lengths(y_true, y_pred)?;

    let (tp, fp, _, fn_) = confusion_counts(y_true, y_pred);

    let precision = if tp + fp > 0 { tp as f64 / (tp + fp) as f64 } else { 0.0 };
    let recall = if tp + fn_ > 0 { tp as f64 / (tp + fn_) as f64 } else { 0.0 };
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    Ok(ClassificationMetricArtifact {
        f1_score: f1,
        precision_score: precision,
        recall_score: recall,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classification_score() {
        let y_true = array![1.0, 1.0, 1.0, 0.0, 0.0];
        let y_pred = array![1.0, 1.0, 0.0, 1.0, 0.0];

        let m = get_classification_score(&y_true, &y_pred).unwrap();
        assert!((m.precision_score - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.recall_score - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.f1_score - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_division_is_zero() {
        let y_true = array![0.0, 0.0];
        let y_pred = array![0.0, 0.0];

        let m = get_classification_score(&y_true, &y_pred).unwrap();
        assert_eq!(m.f1_score, 0.0);
        assert_eq!(m.precision_score, 0.0);
        assert_eq!(m.recall_score, 0.0);
    }

    #[test]
    fn test_r2_on_labels() {
        let y_true = array![0.0, 1.0, 1.0, 0.0];
        assert_eq!(r2_score(&y_true, &y_true).unwrap(), 1.0);
        // one miss: ss_res = 1, ss_tot = 1
        assert_eq!(r2_score(&y_true, &array![1.0, 1.0, 1.0, 0.0]).unwrap(), 0.0);
        assert_eq!(r2_score(&array![1.0, 1.0], &array![1.0, 0.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_score_metric() {
        let y_true = array![0.0, 1.0, 1.0, 0.0];
        let y_pred = array![0.0, 1.0, 0.0, 0.0];
        assert_eq!(ScoreMetric::Accuracy.score(&y_true, &y_pred).unwrap(), 0.75);
        assert_eq!(ScoreMetric::default(), ScoreMetric::R2);
        assert_eq!(ScoreMetric::R2.to_string(), "r2");
    }

    #[test]
    fn test_length_mismatch_and_empty() {
        assert!(accuracy(&array![1.0], &array![1.0, 0.0]).is_err());
        assert!(matches!(
            r2_score(&Array1::zeros(0), &Array1::zeros(0)),
            Err(PipelineError::EmptySplit(_))
        ));
    }
}
