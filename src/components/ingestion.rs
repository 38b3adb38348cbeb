//! Data ingestion: document store -> feature store snapshot -> train/test CSV

use crate::artifact::DataIngestionArtifact;
use crate::config::constants::DATA_INGESTION_IDENTITY_FIELD;
use crate::config::DataIngestionConfig;
use crate::error::{PipelineError, Result};
use crate::store::DocumentSource;
use crate::utils::{documents_to_frame, train_test_split, write_csv};
use polars::prelude::*;
use tracing::{debug, info};

pub struct DataIngestion<'a> {
    config: DataIngestionConfig,
    source: &'a dyn DocumentSource,
}

impl<'a> DataIngestion<'a> {
    pub fn new(config: DataIngestionConfig, source: &'a dyn DocumentSource) -> Self {
        Self { config, source }
    }

    pub fn config(&self) -> &DataIngestionConfig {
        &self.config
    }

    /// Pull the whole collection as a numeric table
    pub fn export_collection_as_dataframe(&self) -> Result<DataFrame> {
        let documents = self
            .source
            .fetch_all(&self.config.database_name, &self.config.collection_name)?;

        if documents.is_empty() {
            return Err(PipelineError::EmptySplit(format!(
                "collection {}.{} has no records",
                self.config.database_name, self.config.collection_name
            )));
        }

        let df = documents_to_frame(
            &documents,
            DATA_INGESTION_IDENTITY_FIELD,
            &self.config.missing_tokens,
        )?;
        debug!(rows = df.height(), columns = df.width(), "normalized records");
        Ok(df)
    }

    /// Write the full table to the feature store
    pub fn export_data_into_feature_store(&self, df: &mut DataFrame) -> Result<()> {
        write_csv(df, &self.config.feature_store_file_path)?;
        info!(path = %self.config.feature_store_file_path.display(), "wrote feature store snapshot");
        Ok(())
    }

    /// Shuffle-split the table; nothing is written here
    pub fn split_data_as_train_test(&self, df: &DataFrame) -> Result<(DataFrame, DataFrame)> {
        let (train, test) =
            train_test_split(df, self.config.train_test_split_ratio, self.config.seed)?;
        info!(
            train_rows = train.height(),
            test_rows = test.height(),
            ratio = self.config.train_test_split_ratio,
            "performed train test split"
        );
        Ok((train, test))
    }

    pub fn initiate_data_ingestion(&self) -> Result<DataIngestionArtifact> {
        info!(
            database = %self.config.database_name,
            collection = %self.config.collection_name,
            "starting data ingestion"
        );

        let mut df = self.export_collection_as_dataframe()?;
        let (mut train, mut test) = self.split_data_as_train_test(&df)?;

        self.export_data_into_feature_store(&mut df)?;
        write_csv(&mut train, &self.config.training_file_path)?;
        write_csv(&mut test, &self.config.testing_file_path)?;

        Ok(DataIngestionArtifact {
            trained_file_path: self.config.training_file_path.clone(),
            test_file_path: self.config.testing_file_path.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PipelineConfig, RunContext};
    use crate::store::{Document, InMemoryStore};
    use crate::utils::{column_names, read_csv};
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> DataIngestionConfig {
        let mut pipeline = PipelineConfig::default();
        pipeline.artifact_root = dir.path().join("Artifacts");
        let ctx = RunContext::new(&pipeline, Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap());
        DataIngestionConfig::new(&ctx, &pipeline)
    }

    fn records(n: usize) -> Vec<Document> {
        (0..n)
            .map(|i| {
                json!({
                    "_id": format!("id{}", i),
                    "having_IP_Address": if i % 2 == 0 { json!(1) } else { json!(-1) },
                    "URL_Length": if i % 5 == 0 { json!("na") } else { json!(0) },
                    "Result": if i % 3 == 0 { -1 } else { 1 },
                })
                .as_object()
                .cloned()
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_ingestion_writes_snapshot_and_splits() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let store = InMemoryStore::with_collection(&config.database_name, &config.collection_name, records(50));

        let artifact = DataIngestion::new(config.clone(), &store)
            .initiate_data_ingestion()
            .unwrap();

        let snapshot = read_csv(&config.feature_store_file_path).unwrap();
        assert_eq!(snapshot.height(), 50);
        assert_eq!(column_names(&snapshot), vec!["having_IP_Address", "URL_Length", "Result"]);
        assert_eq!(snapshot.column("URL_Length").unwrap().null_count(), 10);

        let train = read_csv(&artifact.trained_file_path).unwrap();
        let test = read_csv(&artifact.test_file_path).unwrap();
        assert_eq!(train.height(), 40);
        assert_eq!(test.height(), 10);
        assert_eq!(column_names(&train), column_names(&test));
    }

    #[test]
    fn test_empty_collection() {
        let dir = TempDir::new().unwrap();
        let store = InMemoryStore::new();
        let result = DataIngestion::new(config(&dir), &store).initiate_data_ingestion();
        assert!(matches!(result, Err(PipelineError::EmptySplit(_))));
    }

    #[test]
    fn test_too_few_rows_leaves_no_files() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let store = InMemoryStore::with_collection(&config.database_name, &config.collection_name, records(1));

        let result = DataIngestion::new(config.clone(), &store).initiate_data_ingestion();
        assert!(matches!(result, Err(PipelineError::EmptySplit(_))));
        assert!(!config.training_file_path.exists());
        assert!(!config.feature_store_file_path.exists());
    }
}
