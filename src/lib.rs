//! Netsec Trainer - offline training pipeline for phishing-traffic classifiers
//!
//! Records are pulled from a document store and pass through four stages,
//! each handing an artifact to the next:
//!
//! 1. [`components::DataIngestion`] - snapshot the collection and split it
//! 2. [`components::DataValidation`] - column count and per-column KS drift
//! 3. [`components::DataTransformation`] - label normalisation and KNN imputation
//! 4. [`components::ModelTrainer`] - grid search across five classifier families
//!
//! [`pipeline::TrainingPipeline`] runs them in order inside one timestamped
//! run directory.
//!
//! # Modules
//!
//! ## Pipeline
//! - [`components`] - the four stages
//! - [`pipeline`] - orchestration and artifact sync
//! - [`artifact`] - stage outputs
//!
//! ## Building blocks
//! - [`drift`] - two-sample Kolmogorov-Smirnov drift test
//! - [`imputation`] - KNN imputer
//! - [`models`] - classifiers, grids, cross-validation and metrics
//! - [`store`] - document store access
//!
//! ## Support
//! - [`config`], [`error`], [`logging`], [`utils`], [`cli`]

pub mod error;
pub mod config;
pub mod artifact;

// Data access
pub mod store;
pub mod utils;

// Building blocks
pub mod drift;
pub mod imputation;
pub mod models;

// Stages
pub mod components;
pub mod pipeline;

// Entry points
pub mod cli;
pub mod logging;

pub use error::{PipelineError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{ErrorKind, PipelineError, Result, Stage, StageFailure};

    pub use crate::config::{PipelineConfig, RunContext, Schema};

    pub use crate::artifact::{
        ClassificationMetricArtifact, DataIngestionArtifact, DataTransformationArtifact,
        DataValidationArtifact, ModelTrainerArtifact,
    };

    pub use crate::components::{DataIngestion, DataTransformation, DataValidation, ModelTrainer};
    pub use crate::pipeline::{ArtifactSync, PipelineOutcome, TrainingPipeline};

    pub use crate::store::{Document, DocumentSink, DocumentSource, InMemoryStore, MongoStore};

    pub use crate::drift::{DriftDetector, DriftReport, KolmogorovSmirnovTest};
    pub use crate::imputation::{Imputer, KNNImputer};
    pub use crate::models::{CandidateGrid, Classifier, ModelKind, ModelParams, NetworkModel, ScoreMetric};
}
