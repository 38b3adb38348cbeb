//! Default names, paths and thresholds for a training run

pub const TARGET_COLUMN: &str = "Result";
pub const PIPELINE_NAME: &str = "NetworkSecurity";
pub const ARTIFACT_DIR: &str = "Artifacts";
pub const LOG_DIR: &str = "logs";
pub const TIMESTAMP_FORMAT: &str = "%m_%d_%Y_%H_%M_%S";

pub const FILE_NAME: &str = "phisingData.csv";
pub const TRAIN_FILE_NAME: &str = "train.csv";
pub const TEST_FILE_NAME: &str = "test.csv";
pub const SCHEMA_FILE_PATH: &str = "data_schema/schema.yaml";

pub const SAVED_MODEL_DIR: &str = "final_model";
pub const SAVED_MODEL_FILE_NAME: &str = "model.bin";
pub const SAVED_PREPROCESSOR_FILE_NAME: &str = "preprocessor.bin";

// Ingestion
pub const DATA_INGESTION_COLLECTION_NAME: &str = "NetworkData";
pub const DATA_INGESTION_DATABASE_NAME: &str = "NetworkSecurityDatabase";
pub const DATA_INGESTION_DIR_NAME: &str = "data_ingestion";
pub const DATA_INGESTION_FEATURE_STORE_DIR: &str = "feature_store";
pub const DATA_INGESTION_INGESTED_DIR: &str = "ingested";
pub const DATA_INGESTION_TRAIN_TEST_SPLIT_RATIO: f64 = 0.2;
pub const DATA_INGESTION_MISSING_TOKENS: &[&str] = &["na"];
pub const DATA_INGESTION_IDENTITY_FIELD: &str = "_id";

// Validation
pub const DATA_VALIDATION_DIR_NAME: &str = "data_validation";
pub const DATA_VALIDATION_VALID_DIR: &str = "validated";
pub const DATA_VALIDATION_DRIFT_REPORT_DIR: &str = "drift_report";
pub const DATA_VALIDATION_DRIFT_REPORT_FILE_NAME: &str = "report.yaml";
pub const DATA_VALIDATION_DRIFT_THRESHOLD: f64 = 0.05;

// Transformation
pub const DATA_TRANSFORMATION_DIR_NAME: &str = "data_transformation";
pub const DATA_TRANSFORMATION_TRANSFORMED_DATA_DIR: &str = "transformed";
pub const DATA_TRANSFORMATION_TRANSFORMED_OBJECT_DIR: &str = "transformed_object";
pub const DATA_TRANSFORMATION_TRAIN_FILE_NAME: &str = "train.bin";
pub const DATA_TRANSFORMATION_TEST_FILE_NAME: &str = "test.bin";
pub const PREPROCESSING_OBJECT_FILE_NAME: &str = "preprocessing.bin";
pub const DATA_TRANSFORMATION_N_NEIGHBORS: usize = 3;
pub const NEGATIVE_CLASS_LABEL: f64 = -1.0;

// Model trainer
pub const MODEL_TRAINER_DIR_NAME: &str = "model_trainer";
pub const MODEL_TRAINER_TRAINED_MODEL_DIR: &str = "trained_model";
pub const MODEL_TRAINER_TRAINED_MODEL_NAME: &str = "model.bin";
pub const MODEL_TRAINER_REPORT_FILE_NAME: &str = "model_report.json";
pub const MODEL_TRAINER_EXPECTED_SCORE: f64 = 0.6;
pub const MODEL_TRAINER_OVER_FITTING_UNDER_FITTING_THRESHOLD: f64 = 0.05;
pub const MODEL_TRAINER_CV_FOLDS: usize = 3;

pub const DEFAULT_RANDOM_SEED: u64 = 42;
