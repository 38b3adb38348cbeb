//! Model trainer: search every candidate family, keep the best, persist the bundle

use crate::artifact::{ClassificationMetricArtifact, DataTransformationArtifact, ModelTrainerArtifact};
use crate::config::ModelTrainerConfig;
use crate::error::{PipelineError, Result};
use crate::imputation::KNNImputer;
use crate::models::{
    evaluate_models, get_classification_score, ModelKind, ModelParams, ModelReport, NetworkModel,
};
use crate::utils::{load_object, save_object, write_json};
use ndarray::{s, Array1, Array2};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

pub struct ModelTrainer {
    transformation: DataTransformationArtifact,
    config: ModelTrainerConfig,
}

/// Contents of the JSON model report
#[derive(Debug, Serialize)]
struct TrainingReport<'a> {
    best_model: ModelKind,
    best_params: &'a ModelParams,
    best_score: f64,
    train_metric: ClassificationMetricArtifact,
    test_metric: ClassificationMetricArtifact,
    #[serde(flatten)]
    report: &'a ModelReport,
}

/// Split a transformed array into features and the trailing label column
pub fn split_features_labels(arr: &Array2<f64>) -> Result<(Array2<f64>, Array1<f64>)> {
    if arr.ncols() < 2 {
        return Err(PipelineError::Shape {
            expected: "at least one feature column and a label column".to_string(),
            actual: format!("{} columns", arr.ncols()),
        });
    }
    let last = arr.ncols() - 1;
    Ok((arr.slice(s![.., ..last]).to_owned(), arr.column(last).to_owned()))
}

impl ModelTrainer {
    pub fn new(transformation: DataTransformationArtifact, config: ModelTrainerConfig) -> Self {
        Self {
            transformation,
            config,
        }
    }

    fn load_split(path: &Path) -> Result<(Array2<f64>, Array1<f64>)> {
        let arr: Array2<f64> = load_object(path)?;
        split_features_labels(&arr)
    }

    /// Warn, or fail when enforced, on a weak or overfit winner
    fn check_quality(&self, train: &ClassificationMetricArtifact, test: &ClassificationMetricArtifact) -> Result<()> {
        let mut problems = Vec::new();

        if test.f1_score < self.config.expected_score {
            problems.push(format!(
                "test f1 {:.4} is below the expected {:.4}",
                test.f1_score, self.config.expected_score
            ));
        }

        let gap = (train.f1_score - test.f1_score).abs();
        if gap > self.config.overfitting_threshold {
            problems.push(format!(
                "train/test f1 gap {:.4} exceeds {:.4}",
                gap, self.config.overfitting_threshold
            ));
        }

        if problems.is_empty() {
            return Ok(());
        }
        for problem in &problems {
            warn!(problem = %problem, "model quality check");
        }
        if self.config.enforce_quality_gate {
            return Err(PipelineError::FitFailure(problems.join("; ")));
        }
        Ok(())
    }

    pub fn train_model(
        &self,
        x_train: &Array2<f64>,
        y_train: &Array1<f64>,
        x_test: &Array2<f64>,
        y_test: &Array1<f64>,
    ) -> Result<ModelTrainerArtifact> {
        let (report, selected) = evaluate_models(
            x_train,
            y_train,
            x_test,
            y_test,
            &self.config.candidates,
            &self.config.search,
        )?;
        info!(
            model = %selected.kind,
            params = %selected.params,
            score = selected.score,
            metric = %report.metric,
            "selected best model"
        );

        let train_metric = get_classification_score(y_train, &selected.model.predict(x_train)?)?;
        let test_metric = get_classification_score(y_test, &selected.model.predict(x_test)?)?;
        info!(train = %train_metric, test = %test_metric, "classification metrics");

        self.check_quality(&train_metric, &test_metric)?;

        let preprocessor: KNNImputer = load_object(&self.transformation.transformed_object_file_path)?;
        let bundle = NetworkModel::new(preprocessor, selected.model);

        save_object(&self.config.trained_model_file_path, &bundle)?;
        save_object(&self.config.final_model_file_path, bundle.model())?;
        write_json(
            &self.config.report_file_path,
            &TrainingReport {
                best_model: selected.kind,
                best_params: &selected.params,
                best_score: selected.score,
                train_metric,
                test_metric,
                report: &report,
            },
        )?;
        info!(path = %self.config.trained_model_file_path.display(), "saved model bundle");

        Ok(ModelTrainerArtifact {
            trained_model_file_path: self.config.trained_model_file_path.clone(),
            model_report_file_path: self.config.report_file_path.clone(),
            best_model: selected.kind,
            best_params: selected.params,
            best_score: selected.score,
            train_metric_artifact: train_metric,
            test_metric_artifact: test_metric,
        })
    }

    pub fn initiate_model_trainer(&self) -> Result<ModelTrainerArtifact> {
        info!("starting model trainer");

        let (x_train, y_train) = Self::load_split(&self.transformation.transformed_train_file_path)?;
        let (x_test, y_test) = Self::load_split(&self.transformation.transformed_test_file_path)?;

        if x_train.ncols() != x_test.ncols() {
            return Err(PipelineError::Shape {
                expected: format!("{} test features", x_train.ncols()),
                actual: format!("{} test features", x_test.ncols()),
            });
        }

        self.train_model(&x_train, &y_train, &x_test, &y_test)
    }
}
