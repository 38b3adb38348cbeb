//! Candidate classifiers and model selection
//!
//! Five classifier families are available. Each is described by a
//! [`CandidateGrid`] of hyperparameter values, searched with stratified
//! cross-validation, refit on the whole training split and scored on the
//! held-out split.

mod adaboost;
mod cross_validation;
mod decision_tree;
mod estimator;
mod gradient_boosting;
mod grid;
mod logistic;
mod metrics;
mod random_forest;
mod search;

pub use adaboost::AdaBoostClassifier;
pub use cross_validation::{CVSplit, CrossValidator};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use estimator::NetworkModel;
pub use gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};
pub use grid::{default_candidates, CandidateGrid, ModelParams};
pub use logistic::LogisticRegression;
pub use metrics::{accuracy, get_classification_score, r2_score, ScoreMetric, POSITIVE_LABEL};
pub use random_forest::{MaxFeatures, RandomForest};
pub use search::{
    evaluate_models, grid_search, GridSearchResult, ModelFailure, ModelReport,
    ModelScore, SearchSettings, SelectedModel,
};

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classifier family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModelKind {
    #[serde(rename = "Random Forest")]
    RandomForest,
    #[serde(rename = "Decision Tree")]
    DecisionTree,
    #[serde(rename = "Gradient Boosting")]
    GradientBoosting,
    #[serde(rename = "Logistic Regression")]
    LogisticRegression,
    #[serde(rename = "AdaBoost")]
    AdaBoost,
}

impl ModelKind {
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::RandomForest => "Random Forest",
            ModelKind::DecisionTree => "Decision Tree",
            ModelKind::GradientBoosting => "Gradient Boosting",
            ModelKind::LogisticRegression => "Logistic Regression",
            ModelKind::AdaBoost => "AdaBoost",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A classifier from one of the candidate families
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Classifier {
    RandomForest(RandomForest),
    DecisionTree(DecisionTree),
    GradientBoosting(GradientBoostingClassifier),
    LogisticRegression(LogisticRegression),
    AdaBoost(AdaBoostClassifier),
}

impl Classifier {
    pub fn kind(&self) -> ModelKind {
        match self {
            Classifier::RandomForest(_) => ModelKind::RandomForest,
            Classifier::DecisionTree(_) => ModelKind::DecisionTree,
            Classifier::GradientBoosting(_) => ModelKind::GradientBoosting,
            Classifier::LogisticRegression(_) => ModelKind::LogisticRegression,
            Classifier::AdaBoost(_) => ModelKind::AdaBoost,
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        match self {
            Classifier::RandomForest(m) => m.fit(x, y).map(|_| ()),
            Classifier::DecisionTree(m) => m.fit(x, y).map(|_| ()),
            Classifier::GradientBoosting(m) => m.fit(x, y),
            Classifier::LogisticRegression(m) => m.fit(x, y).map(|_| ()),
            Classifier::AdaBoost(m) => m.fit(x, y).map(|_| ()),
        }
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            Classifier::RandomForest(m) => m.predict(x),
            Classifier::DecisionTree(m) => m.predict(x),
            Classifier::GradientBoosting(m) => m.predict(x),
            Classifier::LogisticRegression(m) => m.predict(x),
            Classifier::AdaBoost(m) => m.predict(x),
        }
    }
}

/// Row/label agreement plus a minimum row count, shared by every `fit`
pub(crate) fn check_training_set(
    model: &str,
    x: &Array2<f64>,
    y: &Array1<f64>,
    min_rows: usize,
) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(PipelineError::Shape {
            expected: format!("{} labels", x.nrows()),
            actual: format!("{} labels", y.len()),
        });
    }
    if x.nrows() < min_rows {
        return Err(PipelineError::FitFailure(format!(
            "{} needs {} or more rows, got {}",
            model,
            min_rows,
            x.nrows()
        )));
    }
    Ok(())
}

/// Reject anything other than 0/1 labels
pub(crate) fn check_binary_labels(model: &str, y: &Array1<f64>) -> Result<()> {
    match y.iter().find(|&&v| v != 0.0 && v != 1.0) {
        Some(bad) => Err(PipelineError::FitFailure(format!(
            "{} only handles 0/1 labels, saw {}",
            model, bad
        ))),
        None => Ok(()),
    }
}

/// Scale to unit sum; an all-zero vector stays zero
pub(crate) fn normalize_in_place(values: &mut [f64]) {
    let sum: f64 = values.iter().sum();
    if sum > 0.0 {
        values.iter_mut().for_each(|v| *v /= sum);
    }
}

/// Sorted distinct labels plus each row's position in that list
pub(crate) fn encode_classes(y: &Array1<f64>) -> (Vec<f64>, Vec<usize>) {
    let mut classes = y.to_vec();
    classes.sort_by(f64::total_cmp);
    classes.dedup();
    let codes = y
        .iter()
        .map(|v| classes.partition_point(|c| c < v))
        .collect();
    (classes, codes)
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}
