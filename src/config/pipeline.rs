//! Run configuration loaded from YAML

use super::constants::*;
use crate::error::{PipelineError, Result};
use crate::imputation::ImputerParams;
use crate::models::{default_candidates, CandidateGrid, ScoreMetric, SearchSettings};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Where the raw records come from and how they are split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionSettings {
    pub database_name: String,
    pub collection_name: String,
    /// Share of rows held out for testing
    pub test_ratio: f64,
    /// String cell values read as missing
    pub missing_tokens: Vec<String>,
    /// Seed for the train/test shuffle
    pub seed: u64,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            database_name: DATA_INGESTION_DATABASE_NAME.to_string(),
            collection_name: DATA_INGESTION_COLLECTION_NAME.to_string(),
            test_ratio: DATA_INGESTION_TRAIN_TEST_SPLIT_RATIO,
            missing_tokens: DATA_INGESTION_MISSING_TOKENS.iter().map(|t| t.to_string()).collect(),
            seed: DEFAULT_RANDOM_SEED,
        }
    }
}

/// Schema and drift checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    pub schema_path: PathBuf,
    /// A column drifts when its p-value falls below this
    pub drift_threshold: f64,
    /// Fail the run when a split's column count differs from the schema
    pub enforce_schema: bool,
    /// Fail the run when any column drifts
    pub enforce_drift_gate: bool,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            schema_path: PathBuf::from(SCHEMA_FILE_PATH),
            drift_threshold: DATA_VALIDATION_DRIFT_THRESHOLD,
            enforce_schema: false,
            enforce_drift_gate: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformationSettings {
    pub target_column: String,
    pub imputer: ImputerParams,
}

impl Default for TransformationSettings {
    fn default() -> Self {
        Self {
            target_column: TARGET_COLUMN.to_string(),
            imputer: ImputerParams::default(),
        }
    }
}

/// Model search and the quality gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerSettings {
    pub candidates: Vec<CandidateGrid>,
    pub cv_folds: usize,
    pub metric: ScoreMetric,
    /// Minimum acceptable held-out score
    pub expected_score: f64,
    /// Largest tolerated gap between train and test F1
    pub overfitting_threshold: f64,
    /// Turn quality-gate warnings into errors
    pub enforce_quality_gate: bool,
    pub seed: u64,
}

impl Default for TrainerSettings {
    fn default() -> Self {
        Self {
            candidates: default_candidates(),
            cv_folds: MODEL_TRAINER_CV_FOLDS,
            metric: ScoreMetric::default(),
            expected_score: MODEL_TRAINER_EXPECTED_SCORE,
            overfitting_threshold: MODEL_TRAINER_OVER_FITTING_UNDER_FITTING_THRESHOLD,
            enforce_quality_gate: false,
            seed: DEFAULT_RANDOM_SEED,
        }
    }
}

impl TrainerSettings {
    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            cv_folds: self.cv_folds,
            metric: self.metric,
            seed: self.seed,
        }
    }
}

/// Remote mirror for artifacts and the final model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSettings {
    pub bucket: String,
}

/// Complete run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub artifact_root: PathBuf,
    pub final_model_dir: PathBuf,
    pub log_dir: PathBuf,
    pub ingestion: IngestionSettings,
    pub validation: ValidationSettings,
    pub transformation: TransformationSettings,
    pub trainer: TrainerSettings,
    pub sync: Option<SyncSettings>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            artifact_root: PathBuf::from(ARTIFACT_DIR),
            final_model_dir: PathBuf::from(SAVED_MODEL_DIR),
            log_dir: PathBuf::from(LOG_DIR),
            ingestion: IngestionSettings::default(),
            validation: ValidationSettings::default(),
            transformation: TransformationSettings::default(),
            trainer: TrainerSettings::default(),
            sync: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(raw)
            .map_err(|e| PipelineError::Config(format!("invalid pipeline config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML config file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_yaml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        let ratio = self.ingestion.test_ratio;
        if !(ratio > 0.0 && ratio < 1.0) {
            return Err(PipelineError::Config(format!(
                "ingestion.test_ratio must be in (0, 1), got {}", ratio
            )));
        }

        let threshold = self.validation.drift_threshold;
        if !(threshold > 0.0 && threshold < 1.0) {
            return Err(PipelineError::Config(format!(
                "validation.drift_threshold must be in (0, 1), got {}", threshold
            )));
        }

        if self.transformation.target_column.is_empty() {
            return Err(PipelineError::Config("transformation.target_column is empty".to_string()));
        }

        if self.transformation.imputer.n_neighbors == 0 {
            return Err(PipelineError::Config(
                "transformation.imputer.n_neighbors must be at least 1".to_string()
            ));
        }

        if self.trainer.cv_folds < 2 {
            return Err(PipelineError::Config(format!(
                "trainer.cv_folds must be at least 2, got {}", self.trainer.cv_folds
            )));
        }

        if self.trainer.candidates.is_empty() {
            return Err(PipelineError::Config("trainer.candidates is empty".to_string()));
        }

        let mut seen = BTreeSet::new();
        for grid in &self.trainer.candidates {
            grid.validate()?;
            if !seen.insert(grid.kind()) {
                return Err(PipelineError::Config(format!(
                    "trainer.candidates lists {} more than once", grid.kind()
                )));
            }
        }

        if let Some(sync) = &self.sync {
            if sync.bucket.trim().is_empty() {
                return Err(PipelineError::Config("sync.bucket is empty".to_string()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelKind;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ingestion.test_ratio, 0.2);
        assert_eq!(config.trainer.candidates.len(), 5);
        assert_eq!(config.transformation.target_column, "Result");
        assert!(config.sync.is_none());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
ingestion:
  test_ratio: 0.25
validation:
  enforce_drift_gate: true
trainer:
  metric: accuracy
  candidates:
    - model: decision_tree
      criterion: [entropy]
sync:
  bucket: netsec-artifacts
"#;
        let config = PipelineConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.ingestion.test_ratio, 0.25);
        assert_eq!(config.ingestion.collection_name, "NetworkData");
        assert!(config.validation.enforce_drift_gate);
        assert!(!config.validation.enforce_schema);
        assert_eq!(config.trainer.metric, ScoreMetric::Accuracy);
        assert_eq!(config.trainer.candidates[0].kind(), ModelKind::DecisionTree);
        assert_eq!(config.trainer.cv_folds, 3);
        assert_eq!(config.sync.unwrap().bucket, "netsec-artifacts");
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            PipelineConfig::from_yaml_str("ingestion: {test_ratio: 1.5}"),
            Err(PipelineError::Config(_))
        ));
        assert!(PipelineConfig::from_yaml_str("trainer: {cv_folds: 1}").is_err());
        assert!(PipelineConfig::from_yaml_str("trainer: {candidates: []}").is_err());
        assert!(PipelineConfig::from_yaml_str(
            "trainer: {candidates: [{model: ada_boost}, {model: ada_boost}]}"
        ).is_err());
        assert!(PipelineConfig::from_yaml_str("trainer: [not, a, map]").is_err());
        assert!(matches!(
            PipelineConfig::from_yaml_str(
                "trainer: {candidates: [{model: decision_tree, criterion: [m_s_e]}]}"
            ),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = PipelineConfig::load(Path::new("/nonexistent/pipeline.yaml")).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}
