//! Deployable bundle of preprocessor and classifier

use super::{Classifier, ModelKind};
use crate::error::Result;
use crate::imputation::{Imputer, KNNImputer};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Fitted imputer paired with the selected classifier
///
/// Raw feature rows go in, predicted labels come out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkModel {
    preprocessor: KNNImputer,
    model: Classifier,
}

impl NetworkModel {
    pub fn new(preprocessor: KNNImputer, model: Classifier) -> Self {
        Self { preprocessor, model }
    }

    pub fn preprocessor(&self) -> &KNNImputer {
        &self.preprocessor
    }

    pub fn model(&self) -> &Classifier {
        &self.model
    }

    pub fn kind(&self) -> ModelKind {
        self.model.kind()
    }

    /// Impute missing cells, then classify
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let x_transformed = self.preprocessor.transform(x)?;
        self.model.predict(&x_transformed)
    }
}
