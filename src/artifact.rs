//! Records handed from one stage to the next

use crate::models::{ModelKind, ModelParams};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataIngestionArtifact {
    pub trained_file_path: PathBuf,
    pub test_file_path: PathBuf,
}

/// Validation outcome; the `invalid_*` paths are never populated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataValidationArtifact {
    /// True when neither a schema mismatch nor drift was seen
    pub validation_status: bool,
    pub valid_train_file_path: PathBuf,
    pub valid_test_file_path: PathBuf,
    pub invalid_train_file_path: Option<PathBuf>,
    pub invalid_test_file_path: Option<PathBuf>,
    pub drift_report_file_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTransformationArtifact {
    pub transformed_object_file_path: PathBuf,
    pub transformed_train_file_path: PathBuf,
    pub transformed_test_file_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetricArtifact {
    pub f1_score: f64,
    pub precision_score: f64,
    pub recall_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelTrainerArtifact {
    pub trained_model_file_path: PathBuf,
    pub model_report_file_path: PathBuf,
    pub best_model: ModelKind,
    pub best_params: ModelParams,
    pub best_score: f64,
    pub train_metric_artifact: ClassificationMetricArtifact,
    pub test_metric_artifact: ClassificationMetricArtifact,
}

impl fmt::Display for DataIngestionArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "train: {}, test: {}",
            self.trained_file_path.display(),
            self.test_file_path.display()
        )
    }
}

impl fmt::Display for DataValidationArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "status: {}, drift report: {}",
            if self.validation_status { "valid" } else { "issues found" },
            self.drift_report_file_path.display()
        )
    }
}

impl fmt::Display for DataTransformationArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "preprocessor: {}, train: {}, test: {}",
            self.transformed_object_file_path.display(),
            self.transformed_train_file_path.display(),
            self.transformed_test_file_path.display()
        )
    }
}

impl fmt::Display for ClassificationMetricArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "f1={:.4} precision={:.4} recall={:.4}",
            self.f1_score, self.precision_score, self.recall_score
        )
    }
}

impl fmt::Display for ModelTrainerArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) score={:.4}, train [{}], test [{}], saved to {}",
            self.best_model,
            self.best_params,
            self.best_score,
            self.train_metric_artifact,
            self.test_metric_artifact,
            self.trained_model_file_path.display()
        )
    }
}
