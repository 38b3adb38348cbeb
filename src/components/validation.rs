//! Data validation: column count against the schema and per-column drift

use crate::artifact::{DataIngestionArtifact, DataValidationArtifact};
use crate::config::{DataValidationConfig, Schema};
use crate::drift::{DriftDetector, DriftReport, DriftResult, KolmogorovSmirnovTest};
use crate::error::{PipelineError, Result};
use crate::utils::{column_names, ensure_parent, present_values, read_csv, write_yaml};
use polars::prelude::*;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

pub struct DataValidation {
    ingestion: DataIngestionArtifact,
    config: DataValidationConfig,
    schema: Schema,
}

impl DataValidation {
    /// Load the schema named in `config`
    pub fn new(ingestion: DataIngestionArtifact, config: DataValidationConfig) -> Result<Self> {
        let schema = Schema::load(&config.schema_file_path)?;
        Ok(Self::with_schema(ingestion, config, schema))
    }

    pub fn with_schema(ingestion: DataIngestionArtifact, config: DataValidationConfig, schema: Schema) -> Self {
        Self {
            ingestion,
            config,
            schema,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// True when the table has exactly as many columns as the schema declares
    pub fn validate_number_of_columns(&self, df: &DataFrame) -> bool {
        let expected = self.schema.column_count();
        info!(required = expected, actual = df.width(), "checking column count");
        df.width() == expected
    }

    /// KS-test every train column against the same test column
    ///
    /// Columns are visited in train order. Nulls are dropped first; a column
    /// with no values on either side is reported as not drifted.
    pub fn detect_dataset_drift(&self, base: &DataFrame, current: &DataFrame) -> Result<DriftReport> {
        let base_names = column_names(base);
        let current_names = column_names(current);

        let missing: Vec<&String> = base_names
            .iter()
            .filter(|n| !current_names.contains(n))
            .chain(current_names.iter().filter(|n| !base_names.contains(n)))
            .collect();
        if !missing.is_empty() {
            let listed: Vec<&str> = missing.iter().map(|s| s.as_str()).collect();
            return Err(PipelineError::SchemaMismatch(format!(
                "columns not shared by train and test: {}",
                listed.join(", ")
            )));
        }

        let test = KolmogorovSmirnovTest::new(self.config.drift_threshold);
        let mut report = DriftReport::new();

        for name in &base_names {
            let reference = present_values(base, name)?;
            let sample = present_values(current, name)?;

            let result = if reference.is_empty() || sample.is_empty() {
                warn!(column = %name, "column has no values on one side, skipping drift test");
                DriftResult {
                    drift_detected: false,
                    statistic: 0.0,
                    p_value: 1.0,
                    threshold: test.threshold(),
                }
            } else {
                test.detect(&reference, &sample)?
            };

            if result.drift_detected {
                warn!(column = %name, p_value = result.p_value, "drift detected");
            }
            report.push(name.as_str(), &result);
        }

        Ok(report)
    }

    fn copy_valid(from: &Path, to: &Path) -> Result<()> {
        ensure_parent(to)?;
        fs::copy(from, to)?;
        Ok(())
    }

    pub fn initiate_data_validation(&self) -> Result<DataValidationArtifact> {
        info!("starting data validation");

        let train = read_csv(&self.ingestion.trained_file_path)?;
        let test = read_csv(&self.ingestion.test_file_path)?;

        if test.height() == 0 {
            return Err(PipelineError::EmptySplit("test split has no rows".to_string()));
        }

        let mut schema_ok = true;
        for (split, df) in [("train", &train), ("test", &test)] {
            if !self.validate_number_of_columns(df) {
                schema_ok = false;
                warn!(
                    split,
                    expected = self.schema.column_count(),
                    actual = df.width(),
                    "column count does not match schema"
                );
            }
        }

        let report = self.detect_dataset_drift(&train, &test)?;
        write_yaml(&self.config.drift_report_file_path, &report)?;

        let drift_free = report.is_healthy();
        info!(
            columns = report.len(),
            drifted = report.drifted_columns().len(),
            path = %self.config.drift_report_file_path.display(),
            "wrote drift report"
        );

        if self.config.enforce_schema && !schema_ok {
            return Err(PipelineError::SchemaMismatch(format!(
                "expected {} columns, got {} (train) and {} (test)",
                self.schema.column_count(),
                train.width(),
                test.width()
            )));
        }
        if self.config.enforce_drift_gate && !drift_free {
            return Err(PipelineError::Drift(report.drifted_columns()));
        }

        Self::copy_valid(&self.ingestion.trained_file_path, &self.config.valid_train_file_path)?;
        Self::copy_valid(&self.ingestion.test_file_path, &self.config.valid_test_file_path)?;

        Ok(DataValidationArtifact {
            validation_status: schema_ok && drift_free,
            valid_train_file_path: self.config.valid_train_file_path.clone(),
            valid_test_file_path: self.config.valid_test_file_path.clone(),
            invalid_train_file_path: None,
            invalid_test_file_path: None,
            drift_report_file_path: self.config.drift_report_file_path.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchemaColumn;
    use crate::utils::write_csv;
    use tempfile::TempDir;

    fn schema(names: &[&str]) -> Schema {
        Schema::new(
            names
                .iter()
                .map(|n| SchemaColumn {
                    name: n.to_string(),
                    dtype: "int64".to_string(),
                })
                .collect(),
        )
    }

    struct Fixture {
        _dir: TempDir,
        ingestion: DataIngestionArtifact,
        config: DataValidationConfig,
    }

    fn fixture(mut train: DataFrame, mut test: DataFrame) -> Fixture {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let ingestion = DataIngestionArtifact {
            trained_file_path: root.join("ingested/train.csv"),
            test_file_path: root.join("ingested/test.csv"),
        };
        write_csv(&mut train, &ingestion.trained_file_path).unwrap();
        write_csv(&mut test, &ingestion.test_file_path).unwrap();

        let config = DataValidationConfig {
            data_validation_dir: root.join("data_validation"),
            valid_train_file_path: root.join("data_validation/validated/train.csv"),
            valid_test_file_path: root.join("data_validation/validated/test.csv"),
            drift_report_file_path: root.join("data_validation/drift_report/report.yaml"),
            schema_file_path: root.join("schema.yaml"),
            drift_threshold: 0.05,
            enforce_schema: false,
            enforce_drift_gate: false,
        };
        Fixture {
            _dir: dir,
            ingestion,
            config,
        }
    }

    fn same_split() -> (DataFrame, DataFrame) {
        let a: Vec<i64> = (0..40).map(|i| i % 4).collect();
        let r: Vec<i64> = (0..40).map(|i| if i % 2 == 0 { 1 } else { -1 }).collect();
        (
            df!("a" => a.clone(), "Result" => r.clone()).unwrap(),
            df!("a" => a, "Result" => r).unwrap(),
        )
    }

    #[test]
    fn test_validate_number_of_columns() {
        let (train, test) = same_split();
        let fx = fixture(train.clone(), test);
        let validation = DataValidation::with_schema(fx.ingestion, fx.config, schema(&["a", "Result"]));

        assert!(validation.validate_number_of_columns(&train));
        assert!(!validation.validate_number_of_columns(&train.select(["a"]).unwrap()));
        let wider = train.hstack(&[Column::new("b".into(), vec![0i64; 40])]).unwrap();
        assert!(!validation.validate_number_of_columns(&wider));
    }

    #[test]
    fn test_identical_splits_are_valid() {
        let (train, test) = same_split();
        let fx = fixture(train, test);
        let config = fx.config.clone();
        let validation = DataValidation::with_schema(fx.ingestion, fx.config, schema(&["a", "Result"]));

        let artifact = validation.initiate_data_validation().unwrap();
        assert!(artifact.validation_status);
        assert!(artifact.invalid_train_file_path.is_none());
        assert!(config.valid_train_file_path.exists());
        assert!(config.valid_test_file_path.exists());

        let yaml = fs::read_to_string(&config.drift_report_file_path).unwrap();
        let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed["a"]["p_value"].as_f64(), Some(1.0));
        assert_eq!(parsed["a"]["drift_status"].as_bool(), Some(false));
        assert!(yaml.find("a:").unwrap() < yaml.find("Result:").unwrap());
    }

    #[test]
    fn test_disjoint_ranges_drift_but_still_copy() {
        let train = df!("a" => (0..=10i64).collect::<Vec<_>>()).unwrap();
        let test = df!("a" => (1000..=1010i64).collect::<Vec<_>>()).unwrap();
        let fx = fixture(train, test);
        let config = fx.config.clone();
        let validation = DataValidation::with_schema(fx.ingestion, fx.config, schema(&["a"]));

        let artifact = validation.initiate_data_validation().unwrap();
        assert!(!artifact.validation_status);
        assert!(config.valid_test_file_path.exists());
    }

    #[test]
    fn test_drift_gate() {
        let train = df!("a" => (0..=10i64).collect::<Vec<_>>()).unwrap();
        let test = df!("a" => (1000..=1010i64).collect::<Vec<_>>()).unwrap();
        let mut fx = fixture(train, test);
        fx.config.enforce_drift_gate = true;
        let config = fx.config.clone();
        let validation = DataValidation::with_schema(fx.ingestion, fx.config, schema(&["a"]));

        match validation.initiate_data_validation() {
            Err(PipelineError::Drift(columns)) => assert_eq!(columns, vec!["a".to_string()]),
            other => panic!("expected drift error, got {:?}", other),
        }
        assert!(config.drift_report_file_path.exists());
        assert!(!config.valid_train_file_path.exists());
    }

    #[test]
    fn test_column_count_is_soft_unless_enforced() {
        let (train, test) = same_split();
        let fx = fixture(train.clone(), test.clone());
        let validation = DataValidation::with_schema(fx.ingestion, fx.config, schema(&["a", "b", "Result"]));
        assert!(!validation.initiate_data_validation().unwrap().validation_status);

        let mut fx = fixture(train, test);
        fx.config.enforce_schema = true;
        let validation = DataValidation::with_schema(fx.ingestion, fx.config, schema(&["a", "b", "Result"]));
        assert!(matches!(
            validation.initiate_data_validation(),
            Err(PipelineError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_unshared_column_is_an_error() {
        let train = df!("a" => [1i64, 2], "b" => [1i64, 2]).unwrap();
        let test = df!("a" => [1i64, 2]).unwrap();
        let fx = fixture(train, test);
        let validation = DataValidation::with_schema(fx.ingestion, fx.config, schema(&["a", "b"]));
        assert!(matches!(
            validation.initiate_data_validation(),
            Err(PipelineError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_all_null_column_is_not_drift() {
        let train = df!("a" => [Some(1i64), Some(2), Some(3)], "n" => [None::<i64>, None, None]).unwrap();
        let test = df!("a" => [Some(1i64), Some(2), Some(3)], "n" => [Some(5i64), None, None]).unwrap();
        let fx = fixture(train.clone(), test.clone());
        let validation = DataValidation::with_schema(fx.ingestion, fx.config, schema(&["a", "n"]));

        let report = validation.detect_dataset_drift(&train, &test).unwrap();
        let entry = report.get("n").unwrap();
        assert_eq!(entry.p_value, 1.0);
        assert!(!entry.drift_detected);
    }

    #[test]
    fn test_empty_test_split() {
        let train = df!("a" => [1i64, 2]).unwrap();
        let test = df!("a" => Vec::<i64>::new()).unwrap();
        let fx = fixture(train, test);
        let validation = DataValidation::with_schema(fx.ingestion, fx.config, schema(&["a"]));
        assert!(matches!(
            validation.initiate_data_validation(),
            Err(PipelineError::EmptySplit(_))
        ));
    }

    #[test]
    fn test_missing_schema_file() {
        let (train, test) = same_split();
        let fx = fixture(train, test);
        assert!(matches!(
            DataValidation::new(fx.ingestion, fx.config),
            Err(PipelineError::Config(_))
        ));
    }
}
