//! Configuration: constants, the YAML run config, the column schema and the
//! per-stage settings derived from them.

pub mod constants;
mod entity;
mod pipeline;
mod schema;

pub use entity::{
    DataIngestionConfig, DataTransformationConfig, DataValidationConfig, ModelTrainerConfig,
    RunContext,
};
pub use pipeline::{
    IngestionSettings, PipelineConfig, SyncSettings, TrainerSettings, TransformationSettings,
    ValidationSettings,
};
pub use schema::{Schema, SchemaColumn};
