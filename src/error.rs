//! Error types for the training pipeline

use std::fmt;
use std::panic::Location;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Empty split: {0}")]
    EmptySplit(String),

    #[error("Fit failure: {0}")]
    FitFailure(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Data drift detected in columns: {}", .0.join(", "))]
    Drift(Vec<String>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },
}

/// Discriminant of [`PipelineError`], so callers can branch on the failure
/// class without matching on messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connection,
    SchemaMismatch,
    EmptySplit,
    FitFailure,
    Serialization,
    Config,
    Data,
    Drift,
    Io,
    Shape,
    ModelNotFitted,
    InvalidParameter,
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Connection(_) => ErrorKind::Connection,
            PipelineError::SchemaMismatch(_) => ErrorKind::SchemaMismatch,
            PipelineError::EmptySplit(_) => ErrorKind::EmptySplit,
            PipelineError::FitFailure(_) => ErrorKind::FitFailure,
            PipelineError::Serialization(_) => ErrorKind::Serialization,
            PipelineError::Config(_) => ErrorKind::Config,
            PipelineError::Data(_) => ErrorKind::Data,
            PipelineError::Drift(_) => ErrorKind::Drift,
            PipelineError::Io(_) => ErrorKind::Io,
            PipelineError::Shape { .. } => ErrorKind::Shape,
            PipelineError::ModelNotFitted => ErrorKind::ModelNotFitted,
            PipelineError::InvalidParameter { .. } => ErrorKind::InvalidParameter,
        }
    }
}

impl From<polars::error::PolarsError> for PipelineError {
    fn from(err: polars::error::PolarsError) -> Self {
        PipelineError::Data(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for PipelineError {
    fn from(err: serde_yaml::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for PipelineError {
    fn from(err: bincode::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for PipelineError {
    fn from(err: ndarray::ShapeError) -> Self {
        PipelineError::Shape {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

impl From<mongodb::error::Error> for PipelineError {
    fn from(err: mongodb::error::Error) -> Self {
        PipelineError::Connection(err.to_string())
    }
}

/// Pipeline stage identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ingestion,
    Validation,
    Transformation,
    ModelTrainer,
    Sync,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Ingestion => "data ingestion",
            Stage::Validation => "data validation",
            Stage::Transformation => "data transformation",
            Stage::ModelTrainer => "model trainer",
            Stage::Sync => "artifact sync",
        };
        f.write_str(name)
    }
}

/// A stage error annotated with the stage and the call site that surfaced it.
#[derive(Debug, Error)]
#[error("{stage} failed at [{}] line [{}]: {source}", .location.file(), .location.line())]
pub struct StageFailure {
    pub stage: Stage,
    pub location: &'static Location<'static>,
    #[source]
    pub source: PipelineError,
}

impl StageFailure {
    #[track_caller]
    pub fn new(stage: Stage, source: PipelineError) -> Self {
        Self {
            stage,
            location: Location::caller(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

/// Attach a stage to a fallible result, recording the caller's location.
pub trait StageContext<T> {
    fn in_stage(self, stage: Stage) -> std::result::Result<T, StageFailure>;
}

impl<T> StageContext<T> for Result<T> {
    #[track_caller]
    fn in_stage(self, stage: Stage) -> std::result::Result<T, StageFailure> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(StageFailure::new(stage, err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::Data("test error".to_string());
        assert_eq!(err.to_string(), "Data error: test error");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PipelineError = io_err.into();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_drift_lists_columns() {
        let err = PipelineError::Drift(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "Data drift detected in columns: a, b");
    }

    #[test]
    fn test_stage_failure_records_location() {
        let result: Result<()> = Err(PipelineError::EmptySplit("no rows".into()));
        let failure = result.in_stage(Stage::Validation).unwrap_err();

        assert_eq!(failure.kind(), ErrorKind::EmptySplit);
        assert_eq!(failure.stage, Stage::Validation);
        assert!(failure.location.file().ends_with("error.rs"));
        let msg = failure.to_string();
        assert!(msg.starts_with("data validation failed at ["));
        assert!(msg.contains("no rows"));
    }
}
