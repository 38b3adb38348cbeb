//! End-to-end training run

mod sync;

pub use sync::{ArtifactSync, AwsCliSync, LocalSync};

use crate::artifact::{
    DataIngestionArtifact, DataTransformationArtifact, DataValidationArtifact, ModelTrainerArtifact,
};
use crate::components::{DataIngestion, DataTransformation, DataValidation, ModelTrainer};
use crate::config::{
    DataIngestionConfig, DataTransformationConfig, DataValidationConfig, ModelTrainerConfig,
    PipelineConfig, RunContext,
};
use crate::error::{Stage, StageContext, StageFailure};
use crate::store::DocumentSource;
use tracing::info;

type StageResult<T> = std::result::Result<T, StageFailure>;

/// Every artifact of a finished run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    pub ingestion: DataIngestionArtifact,
    pub validation: DataValidationArtifact,
    pub transformation: DataTransformationArtifact,
    pub trainer: ModelTrainerArtifact,
}

/// Runs ingestion, validation, transformation and model training in order
pub struct TrainingPipeline<'a> {
    config: PipelineConfig,
    context: RunContext,
    source: &'a dyn DocumentSource,
    sync: Option<Box<dyn ArtifactSync>>,
}

impl<'a> TrainingPipeline<'a> {
    /// A `sync` section in the config enables `aws s3 sync` after the run
    pub fn new(config: PipelineConfig, context: RunContext, source: &'a dyn DocumentSource) -> Self {
        let sync = config
            .sync
            .as_ref()
            .map(|s| Box::new(AwsCliSync::new(s.bucket.clone())) as Box<dyn ArtifactSync>);
        Self {
            config,
            context,
            source,
            sync,
        }
    }

    /// Replace the post-run sync target
    pub fn with_sync(mut self, sync: Box<dyn ArtifactSync>) -> Self {
        self.sync = Some(sync);
        self
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    pub fn start_data_ingestion(&self) -> StageResult<DataIngestionArtifact> {
        let config = DataIngestionConfig::new(&self.context, &self.config);
        DataIngestion::new(config, self.source)
            .initiate_data_ingestion()
            .in_stage(Stage::Ingestion)
    }

    pub fn start_data_validation(&self, ingestion: DataIngestionArtifact) -> StageResult<DataValidationArtifact> {
        let config = DataValidationConfig::new(&self.context, &self.config);
        DataValidation::new(ingestion, config)
            .and_then(|validation| validation.initiate_data_validation())
            .in_stage(Stage::Validation)
    }

    pub fn start_data_transformation(
        &self,
        validation: DataValidationArtifact,
    ) -> StageResult<DataTransformationArtifact> {
        let config = DataTransformationConfig::new(&self.context, &self.config);
        DataTransformation::new(validation, config)
            .initiate_data_transformation()
            .in_stage(Stage::Transformation)
    }

    pub fn start_model_trainer(&self, transformation: DataTransformationArtifact) -> StageResult<ModelTrainerArtifact> {
        let config = ModelTrainerConfig::new(&self.context, &self.config);
        ModelTrainer::new(transformation, config)
            .initiate_model_trainer()
            .in_stage(Stage::ModelTrainer)
    }

    /// Mirror the run directory and the final model directory
    pub fn sync_outputs(&self) -> StageResult<()> {
        let Some(sync) = &self.sync else {
            return Ok(());
        };
        let ts = &self.context.timestamp;
        sync.sync_folder(&self.context.artifact_dir, &format!("artifact/{}", ts))
            .in_stage(Stage::Sync)?;
        sync.sync_folder(&self.context.final_model_dir, &format!("final_model/{}", ts))
            .in_stage(Stage::Sync)
    }

    pub fn run_pipeline(&self) -> StageResult<PipelineOutcome> {
        info!(
            pipeline = %self.context.pipeline_name,
            run = %self.context.timestamp,
            artifact_dir = %self.context.artifact_dir.display(),
            "starting training pipeline"
        );

        let ingestion = self.start_data_ingestion()?;
        info!(artifact = %ingestion, "data ingestion completed");

        let validation = self.start_data_validation(ingestion.clone())?;
        info!(artifact = %validation, "data validation completed");

        let transformation = self.start_data_transformation(validation.clone())?;
        info!(artifact = %transformation, "data transformation completed");

        let trainer = self.start_model_trainer(transformation.clone())?;
        info!(artifact = %trainer, "model training completed");

        self.sync_outputs()?;

        Ok(PipelineOutcome {
            ingestion,
            validation,
            transformation,
            trainer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::store::InMemoryStore;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    #[test]
    fn test_empty_collection_fails_in_ingestion() {
        let dir = TempDir::new().unwrap();
        let mut config = PipelineConfig::default();
        config.artifact_root = dir.path().join("Artifacts");
        config.final_model_dir = dir.path().join("final_model");
        let ctx = RunContext::new(&config, Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap());

        let store = InMemoryStore::new();
        let failure = TrainingPipeline::new(config, ctx, &store).run_pipeline().unwrap_err();

        assert_eq!(failure.stage, Stage::Ingestion);
        assert_eq!(failure.kind(), ErrorKind::EmptySplit);
        assert!(failure.to_string().starts_with("data ingestion failed at ["));
    }

    #[test]
    fn test_no_sync_configured_is_a_no_op() {
        let config = PipelineConfig::default();
        let ctx = RunContext::new(&config, Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap());
        let store = InMemoryStore::new();
        assert!(TrainingPipeline::new(config, ctx, &store).sync_outputs().is_ok());
    }
}
