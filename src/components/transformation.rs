//! Data transformation: label normalisation and KNN imputation

use crate::artifact::{DataTransformationArtifact, DataValidationArtifact};
use crate::config::constants::NEGATIVE_CLASS_LABEL;
use crate::config::DataTransformationConfig;
use crate::error::{PipelineError, Result};
use crate::imputation::{Imputer, KNNImputer};
use crate::utils::{column_names, frame_to_array, read_csv, save_object, target_array};
use ndarray::{concatenate, Array1, Array2, Axis};
use polars::prelude::*;
use tracing::{debug, info};

pub struct DataTransformation {
    validation: DataValidationArtifact,
    config: DataTransformationConfig,
}

/// Map the negative-class marker to 0, leaving other labels alone
pub fn normalize_labels(y: &Array1<f64>) -> Array1<f64> {
    y.mapv(|v| if v == NEGATIVE_CLASS_LABEL { 0.0 } else { v })
}

impl DataTransformation {
    pub fn new(validation: DataValidationArtifact, config: DataTransformationConfig) -> Self {
        Self { validation, config }
    }

    /// Imputer configured from the stage settings, unfitted
    pub fn get_data_transformer_object(&self) -> KNNImputer {
        KNNImputer::from_params(&self.config.imputer)
    }

    /// Train columns other than the target, in order
    fn feature_columns(&self, train: &DataFrame, test: &DataFrame) -> Result<Vec<String>> {
        let target = &self.config.target_column;
        for (split, df) in [("train", train), ("test", test)] {
            if df.column(target).is_err() {
                return Err(PipelineError::Config(format!(
                    "target column '{}' not found in {} split",
                    target, split
                )));
            }
        }

        Ok(column_names(train).into_iter().filter(|c| c != target).collect())
    }

    fn split_features_target(&self, df: &DataFrame, features: &[String]) -> Result<(Array2<f64>, Array1<f64>)> {
        let x = frame_to_array(df, features)?;
        let y = target_array(df, &self.config.target_column)?;
        if let Some(row) = y.iter().position(|v| v.is_nan()) {
            return Err(PipelineError::Data(format!(
                "row {} has no '{}' label",
                row, self.config.target_column
            )));
        }
        Ok((x, normalize_labels(&y)))
    }

    fn with_target(x: Array2<f64>, y: Array1<f64>) -> Result<Array2<f64>> {
        let y_col = y.insert_axis(Axis(1));
        Ok(concatenate(Axis(1), &[x.view(), y_col.view()])?)
    }

    pub fn initiate_data_transformation(&self) -> Result<DataTransformationArtifact> {
        info!("starting data transformation");

        let train = read_csv(&self.validation.valid_train_file_path)?;
        let test = read_csv(&self.validation.valid_test_file_path)?;

        if train.height() == 0 {
            return Err(PipelineError::EmptySplit("train split has no rows".to_string()));
        }

        let features = self.feature_columns(&train, &test)?;
        let (x_train, y_train) = self.split_features_target(&train, &features)?;
        let (x_test, y_test) = self.split_features_target(&test, &features)?;

        let mut imputer = self.get_data_transformer_object();
        let x_train = imputer.fit_transform(&x_train)?;
        let x_test = imputer.transform(&x_test)?;
        debug!(
            features = features.len(),
            n_neighbors = imputer.n_neighbors(),
            "fitted imputer on train features"
        );

        let train_arr = Self::with_target(x_train, y_train)?;
        let test_arr = Self::with_target(x_test, y_test)?;

        save_object(&self.config.transformed_train_file_path, &train_arr)?;
        save_object(&self.config.transformed_test_file_path, &test_arr)?;
        save_object(&self.config.transformed_object_file_path, &imputer)?;
        save_object(&self.config.final_preprocessor_file_path, &imputer)?;

        info!(
            train_shape = ?train_arr.dim(),
            test_shape = ?test_arr.dim(),
            "wrote transformed arrays"
        );

        Ok(DataTransformationArtifact {
            transformed_object_file_path: self.config.transformed_object_file_path.clone(),
            transformed_train_file_path: self.config.transformed_train_file_path.clone(),
            transformed_test_file_path: self.config.transformed_test_file_path.clone(),
        })
    }
}
