//! Hyperparameter grids for the candidate families

use super::{
    AdaBoostClassifier, Classifier, Criterion, DecisionTree, GradientBoostingClassifier,
    GradientBoostingConfig, LogisticRegression, ModelKind, RandomForest,
};
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Candidate family with the values to search for each hyperparameter
///
/// An empty list leaves that hyperparameter at the estimator default.
/// Expansion follows field order with the last field varying fastest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum CandidateGrid {
    RandomForest {
        #[serde(default)]
        n_estimators: Vec<usize>,
    },
    DecisionTree {
        #[serde(default)]
        criterion: Vec<Criterion>,
    },
    GradientBoosting {
        #[serde(default)]
        learning_rate: Vec<f64>,
        #[serde(default)]
        n_estimators: Vec<usize>,
        #[serde(default)]
        subsample: Vec<f64>,
    },
    LogisticRegression {
        #[serde(default)]
        alpha: Vec<f64>,
    },
    AdaBoost {
        #[serde(default)]
        learning_rate: Vec<f64>,
        #[serde(default)]
        n_estimators: Vec<usize>,
    },
}

/// One concrete hyperparameter combination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModelParams {
    RandomForest { n_estimators: usize },
    DecisionTree { criterion: Criterion },
    GradientBoosting { learning_rate: f64, n_estimators: usize, subsample: f64 },
    LogisticRegression { alpha: f64 },
    AdaBoost { learning_rate: f64, n_estimators: usize },
}

fn or_default<T: Clone>(values: &[T], default: T) -> Vec<T> {
    if values.is_empty() {
        vec![default]
    } else {
        values.to_vec()
    }
}

impl CandidateGrid {
    pub fn kind(&self) -> ModelKind {
        match self {
            CandidateGrid::RandomForest { .. } => ModelKind::RandomForest,
            CandidateGrid::DecisionTree { .. } => ModelKind::DecisionTree,
            CandidateGrid::GradientBoosting { .. } => ModelKind::GradientBoosting,
            CandidateGrid::LogisticRegression { .. } => ModelKind::LogisticRegression,
            CandidateGrid::AdaBoost { .. } => ModelKind::AdaBoost,
        }
    }

    /// Reject values that would not give a binary classifier
    pub fn validate(&self) -> Result<()> {
        if let CandidateGrid::DecisionTree { criterion } = self {
            if let Some(bad) = criterion.iter().find(|c| !c.is_classification()) {
                return Err(PipelineError::Config(format!(
                    "{:?} is a regression criterion and cannot be used for {}",
                    bad,
                    self.kind()
                )));
            }
        }
        Ok(())
    }

    /// Every combination of the listed values
    pub fn expand(&self) -> Vec<ModelParams> {
        match self {
            CandidateGrid::RandomForest { n_estimators } => {
                or_default(n_estimators, RandomForest::default().n_estimators)
                    .into_iter()
                    .map(|n_estimators| ModelParams::RandomForest { n_estimators })
                    .collect()
            }
            CandidateGrid::DecisionTree { criterion } => {
                or_default(criterion, Criterion::Gini)
                    .into_iter()
                    .map(|criterion| ModelParams::DecisionTree { criterion })
                    .collect()
            }
            CandidateGrid::GradientBoosting { learning_rate, n_estimators, subsample } => {
                let defaults = GradientBoostingConfig::default();
                let mut combos = Vec::new();
                for &lr in &or_default(learning_rate, defaults.learning_rate) {
                    for &n in &or_default(n_estimators, defaults.n_estimators) {
                        for &s in &or_default(subsample, defaults.subsample) {
                            combos.push(ModelParams::GradientBoosting {
                                learning_rate: lr,
                                n_estimators: n,
                                subsample: s,
                            });
                        }
                    }
                }
                combos
            }
            CandidateGrid::LogisticRegression { alpha } => {
                or_default(alpha, LogisticRegression::default().alpha)
                    .into_iter()
                    .map(|alpha| ModelParams::LogisticRegression { alpha })
                    .collect()
            }
            CandidateGrid::AdaBoost { learning_rate, n_estimators } => {
                let defaults = AdaBoostClassifier::default();
                let mut combos = Vec::new();
                for &lr in &or_default(learning_rate, defaults.learning_rate) {
                    for &n in &or_default(n_estimators, defaults.n_estimators) {
                        combos.push(ModelParams::AdaBoost { learning_rate: lr, n_estimators: n });
                    }
                }
                combos
            }
        }
    }
}

impl ModelParams {
    pub fn kind(&self) -> ModelKind {
        match self {
            ModelParams::RandomForest { .. } => ModelKind::RandomForest,
            ModelParams::DecisionTree { .. } => ModelKind::DecisionTree,
            ModelParams::GradientBoosting { .. } => ModelKind::GradientBoosting,
            ModelParams::LogisticRegression { .. } => ModelKind::LogisticRegression,
            ModelParams::AdaBoost { .. } => ModelKind::AdaBoost,
        }
    }

    /// Unfitted classifier for this combination
    pub fn build(&self, seed: u64) -> Classifier {
        match *self {
            ModelParams::RandomForest { n_estimators } => Classifier::RandomForest(
                RandomForest::new(n_estimators).with_random_state(seed),
            ),
            ModelParams::DecisionTree { criterion } => Classifier::DecisionTree(
                DecisionTree::new_classifier()
                    .with_criterion(criterion)
                    .with_random_state(seed),
            ),
            ModelParams::GradientBoosting { learning_rate, n_estimators, subsample } => {
                Classifier::GradientBoosting(GradientBoostingClassifier::new(GradientBoostingConfig {
                    n_estimators,
                    learning_rate,
                    subsample,
                    random_state: Some(seed),
                    ..Default::default()
                }))
            }
            ModelParams::LogisticRegression { alpha } => {
                Classifier::LogisticRegression(LogisticRegression::new().with_alpha(alpha))
            }
            ModelParams::AdaBoost { learning_rate, n_estimators } => {
                Classifier::AdaBoost(AdaBoostClassifier::new(n_estimators, learning_rate))
            }
        }
    }
}

impl fmt::Display for ModelParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelParams::RandomForest { n_estimators } => write!(f, "n_estimators={}", n_estimators),
            ModelParams::DecisionTree { criterion } => write!(f, "criterion={:?}", criterion),
            ModelParams::GradientBoosting { learning_rate, n_estimators, subsample } => write!(
                f,
                "learning_rate={}, n_estimators={}, subsample={}",
                learning_rate, n_estimators, subsample
            ),
            ModelParams::LogisticRegression { alpha } => write!(f, "alpha={}", alpha),
            ModelParams::AdaBoost { learning_rate, n_estimators } => {
                write!(f, "learning_rate={}, n_estimators={}", learning_rate, n_estimators)
            }
        }
    }
}

/// The stock candidate set searched when no configuration overrides it
pub fn default_candidates() -> Vec<CandidateGrid> {
    vec![
        CandidateGrid::RandomForest {
            n_estimators: vec![8, 16, 32, 128, 256],
        },
        CandidateGrid::DecisionTree {
            criterion: vec![Criterion::Gini, Criterion::Entropy, Criterion::LogLoss],
        },
        CandidateGrid::GradientBoosting {
            learning_rate: vec![0.1, 0.01, 0.05, 0.001],
            n_estimators: vec![8, 16, 32, 64, 128, 256],
            subsample: vec![0.6, 0.7, 0.75, 0.85, 0.9],
        },
        CandidateGrid::LogisticRegression { alpha: vec![] },
        CandidateGrid::AdaBoost {
            learning_rate: vec![0.1, 0.01, 0.001],
            n_estimators: vec![8, 16, 32, 64, 128, 256],
        },
    ]
}
