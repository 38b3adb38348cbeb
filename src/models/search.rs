//! Grid search with cross-validation and best-model selection

use super::{
    CVSplit, CandidateGrid, Classifier, CrossValidator, ModelKind, ModelParams,
    ScoreMetric,
};
use crate::config::constants::{DEFAULT_RANDOM_SEED, MODEL_TRAINER_CV_FOLDS};
use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Knobs shared by every family's search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Number of stratified folds
    pub cv_folds: usize,
    /// Metric for the held-out split
    pub metric: ScoreMetric,
    /// Seed passed to stochastic estimators
    pub seed: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            cv_folds: MODEL_TRAINER_CV_FOLDS,
            metric: ScoreMetric::default(),
            seed: DEFAULT_RANDOM_SEED,
        }
    }
}

/// Outcome of searching one family's grid
#[derive(Debug, Clone, PartialEq)]
pub struct GridSearchResult {
    pub best_params: ModelParams,
    /// Mean fold accuracy of the best combination
    pub best_cv_score: f64,
    /// Mean fold accuracy per combination in grid order; `None` when a fold failed
    pub cv_scores: Vec<(ModelParams, Option<f64>)>,
}

/// Held-out result for one family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelScore {
    pub model: ModelKind,
    pub score: f64,
    pub cv_score: f64,
    pub best_params: ModelParams,
}

/// A family that produced no usable model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFailure {
    pub model: ModelKind,
    pub reason: String,
}

/// Per-family scores in candidate order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelReport {
    pub metric: ScoreMetric,
    pub scores: Vec<ModelScore>,
    pub failures: Vec<ModelFailure>,
}

impl ModelReport {
    pub fn score(&self, model: ModelKind) -> Option<f64> {
        self.scores.iter().find(|s| s.model == model).map(|s| s.score)
    }

    /// Position of the highest held-out score; the earliest family wins ties
    pub fn best_index(&self) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (idx, entry) in self.scores.iter().enumerate() {
            if best.map_or(true, |b| entry.score > self.scores[b].score) {
                best = Some(idx);
            }
        }
        best
    }

    pub fn best(&self) -> Option<&ModelScore> {
        self.best_index().map(|idx| &self.scores[idx])
    }
}

/// The refit winner
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedModel {
    pub kind: ModelKind,
    pub params: ModelParams,
    pub score: f64,
    pub model: Classifier,
}

fn fold_accuracy(params: &ModelParams, x: &Array2<f64>, y: &Array1<f64>, split: &CVSplit, seed: u64) -> Result<f64> {
    let x_train = x.select(Axis(0), &split.train_indices);
    let y_train = y.select(Axis(0), &split.train_indices);
    let x_test = x.select(Axis(0), &split.test_indices);
    let y_test = y.select(Axis(0), &split.test_indices);

    let mut model = params.build(seed);
    model.fit(&x_train, &y_train)?;
    let predictions = model.predict(&x_test)?;
    super::accuracy(&y_test, &predictions)
}

/// Score every combination of `grid` on the given folds by mean accuracy.
///
/// A combination with any failing fold is skipped; the search fails only
/// when no combination survives. The first combination wins ties.
pub fn grid_search(
    grid: &CandidateGrid,
    x: &Array2<f64>,
    y: &Array1<f64>,
    folds: &[CVSplit],
    seed: u64,
) -> Result<GridSearchResult> {
    let combos = grid.expand();
    let n_folds = folds.len();

    let fold_scores: Vec<Result<f64>> = (0..combos.len() * n_folds)
        .into_par_iter()
        .map(|job| fold_accuracy(&combos[job / n_folds], x, y, &folds[job % n_folds], seed))
        .collect();

    let mut cv_scores = Vec::with_capacity(combos.len());
    let mut best: Option<(usize, f64)> = None;
    let mut last_error = None;

    for (idx, params) in combos.iter().enumerate() {
        let scores = &fold_scores[idx * n_folds..(idx + 1) * n_folds];
        let mut sum = 0.0;
        let mut failed = false;
        for score in scores {
            match score {
                Ok(s) => sum += s,
                Err(e) => {
                    failed = true;
                    last_error = Some(e.to_string());
                }
            }
        }

        if failed || n_folds == 0 {
            debug!(model = %grid.kind(), params = %params, "combination failed during cross-validation");
            cv_scores.push((params.clone(), None));
            continue;
        }

        let mean = sum / n_folds as f64;
        if best.map_or(true, |(_, b)| mean > b) {
            best = Some((idx, mean));
        }
        cv_scores.push((params.clone(), Some(mean)));
    }

    let (best_idx, best_cv_score) = best.ok_or_else(|| {
        PipelineError::FitFailure(format!(
            "every {} combination failed: {}",
            grid.kind(),
            last_error.unwrap_or_else(|| "no folds".to_string())
        ))
    })?;

    Ok(GridSearchResult {
        best_params: combos[best_idx].clone(),
        best_cv_score,
        cv_scores,
    })
}

fn check_candidates(candidates: &[CandidateGrid]) -> Result<()> {
    if candidates.is_empty() {
        return Err(PipelineError::Config("candidate set is empty".to_string()));
    }
    let mut seen = BTreeSet::new();
    for grid in candidates {
        grid.validate()?;
        if !seen.insert(grid.kind()) {
            return Err(PipelineError::Config(format!(
                "{} appears more than once in the candidate set",
                grid.kind()
            )));
        }
    }
    Ok(())
}

fn search_and_refit(
    grid: &CandidateGrid,
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    x_test: &Array2<f64>,
    y_test: &Array1<f64>,
    folds: &[CVSplit],
    settings: &SearchSettings,
) -> Result<(ModelScore, Classifier)> {
    let search = grid_search(grid, x_train, y_train, folds, settings.seed)?;

    let mut model = search.best_params.build(settings.seed);
    model.fit(x_train, y_train)?;
    let predictions = model.predict(x_test)?;
    let score = settings.metric.score(y_test, &predictions)?;

    Ok((
        ModelScore {
            model: grid.kind(),
            score,
            cv_score: search.best_cv_score,
            best_params: search.best_params,
        },
        model,
    ))
}

/// Search every candidate family, refit each family's best combination on
/// the full training split and score it on the test split.
///
/// A failing family is recorded in the report and skipped.
pub fn evaluate_models(
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    x_test: &Array2<f64>,
    y_test: &Array1<f64>,
    candidates: &[CandidateGrid],
    settings: &SearchSettings,
) -> Result<(ModelReport, SelectedModel)> {
    check_candidates(candidates)?;

    if x_test.nrows() == 0 {
        return Err(PipelineError::EmptySplit("test split has no rows".to_string()));
    }

    let folds = CrossValidator::new(settings.cv_folds).split(y_train)?;

    let mut report = ModelReport {
        metric: settings.metric,
        scores: Vec::new(),
        failures: Vec::new(),
    };
    let mut fitted: Vec<Classifier> = Vec::new();

    for grid in candidates {
        info!(model = %grid.kind(), combinations = grid.expand().len(), "searching candidate grid");
        match search_and_refit(grid, x_train, y_train, x_test, y_test, &folds, settings) {
            Ok((score, model)) => {
                info!(
                    model = %score.model,
                    cv_score = score.cv_score,
                    score = score.score,
                    params = %score.best_params,
                    "candidate family scored"
                );
                report.scores.push(score);
                fitted.push(model);
            }
            Err(e) => {
                warn!(model = %grid.kind(), error = %e, "candidate family failed");
                report.failures.push(ModelFailure {
                    model: grid.kind(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let best_idx = report.best_index().ok_or_else(|| {
        let reasons: Vec<String> = report
            .failures
            .iter()
            .map(|f| format!("{}: {}", f.model, f.reason))
            .collect();
        PipelineError::FitFailure(format!("every candidate family failed ({})", reasons.join("; ")))
    })?;

    let best = &report.scores[best_idx];
    let selected = SelectedModel {
        kind: best.model,
        params: best.best_params.clone(),
        score: best.score,
        model: fitted.swap_remove(best_idx),
    };

    Ok((report, selected))
}
