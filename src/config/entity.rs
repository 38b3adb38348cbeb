//! Per-run paths and the settings each stage receives

use super::constants::*;
use super::pipeline::PipelineConfig;
use crate::imputation::ImputerParams;
use crate::models::{CandidateGrid, SearchSettings};
use chrono::{DateTime, TimeZone};
use std::fmt::Display;
use std::path::PathBuf;

/// Identifies one training run and its output roots
#[derive(Debug, Clone, PartialEq)]
pub struct RunContext {
    pub pipeline_name: String,
    /// Formatted as `%m_%d_%Y_%H_%M_%S`
    pub timestamp: String,
    /// `<artifact_root>/<timestamp>`
    pub artifact_dir: PathBuf,
    pub final_model_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl RunContext {
    pub fn new<Tz>(config: &PipelineConfig, now: DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let timestamp = now.format(TIMESTAMP_FORMAT).to_string();
        Self {
            pipeline_name: PIPELINE_NAME.to_string(),
            artifact_dir: config.artifact_root.join(&timestamp),
            final_model_dir: config.final_model_dir.clone(),
            log_dir: config.log_dir.clone(),
            timestamp,
        }
    }

    /// Context stamped with the local wall clock
    pub fn now(config: &PipelineConfig) -> Self {
        Self::new(config, chrono::Local::now())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataIngestionConfig {
    pub data_ingestion_dir: PathBuf,
    pub feature_store_file_path: PathBuf,
    pub training_file_path: PathBuf,
    pub testing_file_path: PathBuf,
    pub train_test_split_ratio: f64,
    pub database_name: String,
    pub collection_name: String,
    pub missing_tokens: Vec<String>,
    pub seed: u64,
}

impl DataIngestionConfig {
    pub fn new(ctx: &RunContext, config: &PipelineConfig) -> Self {
        let data_ingestion_dir = ctx.artifact_dir.join(DATA_INGESTION_DIR_NAME);
        let ingested_dir = data_ingestion_dir.join(DATA_INGESTION_INGESTED_DIR);
        Self {
            feature_store_file_path: data_ingestion_dir
                .join(DATA_INGESTION_FEATURE_STORE_DIR)
                .join(FILE_NAME),
            training_file_path: ingested_dir.join(TRAIN_FILE_NAME),
            testing_file_path: ingested_dir.join(TEST_FILE_NAME),
            train_test_split_ratio: config.ingestion.test_ratio,
            database_name: config.ingestion.database_name.clone(),
            collection_name: config.ingestion.collection_name.clone(),
            missing_tokens: config.ingestion.missing_tokens.clone(),
            seed: config.ingestion.seed,
            data_ingestion_dir,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataValidationConfig {
    pub data_validation_dir: PathBuf,
    pub valid_train_file_path: PathBuf,
    pub valid_test_file_path: PathBuf,
    pub drift_report_file_path: PathBuf,
    pub schema_file_path: PathBuf,
    pub drift_threshold: f64,
    pub enforce_schema: bool,
    pub enforce_drift_gate: bool,
}

impl DataValidationConfig {
    pub fn new(ctx: &RunContext, config: &PipelineConfig) -> Self {
        let data_validation_dir = ctx.artifact_dir.join(DATA_VALIDATION_DIR_NAME);
        let valid_dir = data_validation_dir.join(DATA_VALIDATION_VALID_DIR);
        Self {
            valid_train_file_path: valid_dir.join(TRAIN_FILE_NAME),
            valid_test_file_path: valid_dir.join(TEST_FILE_NAME),
            drift_report_file_path: data_validation_dir
                .join(DATA_VALIDATION_DRIFT_REPORT_DIR)
                .join(DATA_VALIDATION_DRIFT_REPORT_FILE_NAME),
            schema_file_path: config.validation.schema_path.clone(),
            drift_threshold: config.validation.drift_threshold,
            enforce_schema: config.validation.enforce_schema,
            enforce_drift_gate: config.validation.enforce_drift_gate,
            data_validation_dir,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataTransformationConfig {
    pub data_transformation_dir: PathBuf,
    pub transformed_train_file_path: PathBuf,
    pub transformed_test_file_path: PathBuf,
    pub transformed_object_file_path: PathBuf,
    /// Copy of the fitted imputer outside the run directory
    pub final_preprocessor_file_path: PathBuf,
    pub target_column: String,
    pub imputer: ImputerParams,
}

impl DataTransformationConfig {
    pub fn new(ctx: &RunContext, config: &PipelineConfig) -> Self {
        let data_transformation_dir = ctx.artifact_dir.join(DATA_TRANSFORMATION_DIR_NAME);
        let data_dir = data_transformation_dir.join(DATA_TRANSFORMATION_TRANSFORMED_DATA_DIR);
        Self {
            transformed_train_file_path: data_dir.join(DATA_TRANSFORMATION_TRAIN_FILE_NAME),
            transformed_test_file_path: data_dir.join(DATA_TRANSFORMATION_TEST_FILE_NAME),
            transformed_object_file_path: data_transformation_dir
                .join(DATA_TRANSFORMATION_TRANSFORMED_OBJECT_DIR)
                .join(PREPROCESSING_OBJECT_FILE_NAME),
            final_preprocessor_file_path: ctx.final_model_dir.join(SAVED_PREPROCESSOR_FILE_NAME),
            target_column: config.transformation.target_column.clone(),
            imputer: config.transformation.imputer.clone(),
            data_transformation_dir,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelTrainerConfig {
    pub model_trainer_dir: PathBuf,
    pub trained_model_file_path: PathBuf,
    pub report_file_path: PathBuf,
    /// Copy of the bare classifier outside the run directory
    pub final_model_file_path: PathBuf,
    pub candidates: Vec<CandidateGrid>,
    pub search: SearchSettings,
    pub expected_score: f64,
    pub overfitting_threshold: f64,
    pub enforce_quality_gate: bool,
}

impl ModelTrainerConfig {
    pub fn new(ctx: &RunContext, config: &PipelineConfig) -> Self {
        let model_trainer_dir = ctx.artifact_dir.join(MODEL_TRAINER_DIR_NAME);
        let trainer = &config.trainer;
        Self {
            trained_model_file_path: model_trainer_dir
                .join(MODEL_TRAINER_TRAINED_MODEL_DIR)
                .join(MODEL_TRAINER_TRAINED_MODEL_NAME),
            report_file_path: model_trainer_dir.join(MODEL_TRAINER_REPORT_FILE_NAME),
            final_model_file_path: ctx.final_model_dir.join(SAVED_MODEL_FILE_NAME),
            candidates: trainer.candidates.clone(),
            search: trainer.search_settings(),
            expected_score: trainer.expected_score,
            overfitting_threshold: trainer.overfitting_threshold,
            enforce_quality_gate: trainer.enforce_quality_gate,
            model_trainer_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::path::Path;

    fn context() -> RunContext {
        let now = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 2).unwrap();
        RunContext::new(&PipelineConfig::default(), now)
    }

    #[test]
    fn test_timestamped_artifact_dir() {
        let ctx = context();
        assert_eq!(ctx.timestamp, "03_07_2024_09_05_02");
        assert_eq!(ctx.artifact_dir, Path::new("Artifacts/03_07_2024_09_05_02"));
        assert_eq!(ctx.final_model_dir, Path::new("final_model"));
    }

    #[test]
    fn test_stage_paths() {
        let ctx = context();
        let config = PipelineConfig::default();
        let root = Path::new("Artifacts/03_07_2024_09_05_02");

        let ingestion = DataIngestionConfig::new(&ctx, &config);
        assert_eq!(
            ingestion.feature_store_file_path,
            root.join("data_ingestion/feature_store/phisingData.csv")
        );
        assert_eq!(ingestion.training_file_path, root.join("data_ingestion/ingested/train.csv"));

        let validation = DataValidationConfig::new(&ctx, &config);
        assert_eq!(
            validation.drift_report_file_path,
            root.join("data_validation/drift_report/report.yaml")
        );

        let transformation = DataTransformationConfig::new(&ctx, &config);
        assert_eq!(
            transformation.transformed_object_file_path,
            root.join("data_transformation/transformed_object/preprocessing.bin")
        );
        assert_eq!(transformation.final_preprocessor_file_path, Path::new("final_model/preprocessor.bin"));

        let trainer = ModelTrainerConfig::new(&ctx, &config);
        assert_eq!(trainer.trained_model_file_path, root.join("model_trainer/trained_model/model.bin"));
        assert_eq!(trainer.search.cv_folds, 3);
    }
}
