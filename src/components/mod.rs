//! The four training stages
//!
//! Each stage takes the previous stage's artifact plus its own config and
//! returns exactly one artifact for the next.

mod ingestion;
mod trainer;
mod transformation;
mod validation;

pub use ingestion::DataIngestion;
pub use trainer::{split_features_labels, ModelTrainer};
pub use transformation::{normalize_labels, DataTransformation};
pub use validation::DataValidation;
