//! Expected column layout of the source table

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One declared column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaColumn {
    pub name: String,
    pub dtype: String,
}

/// On-disk form: `columns` is a list of single-entry `{name: dtype}` maps.
/// Other keys, such as a `numerical_columns` list, are ignored.
#[derive(Debug, Deserialize)]
struct SchemaFile {
    columns: Vec<BTreeMap<String, String>>,
}

/// Ordered column schema, loaded once per validation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<SchemaColumn>,
}

impl Schema {
    pub fn new(columns: Vec<SchemaColumn>) -> Self {
        Self { columns }
    }

    /// Parse a schema from YAML text
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let file: SchemaFile = serde_yaml::from_str(raw)
            .map_err(|e| PipelineError::Config(format!("invalid schema: {}", e)))?;

        let mut columns = Vec::with_capacity(file.columns.len());
        for entry in file.columns {
            if entry.len() != 1 {
                return Err(PipelineError::Config(format!(
                    "schema column entries must have exactly one key, got {}",
                    entry.len()
                )));
            }
            for (name, dtype) in entry {
                columns.push(SchemaColumn { name, dtype });
            }
        }

        if columns.is_empty() {
            return Err(PipelineError::Config("schema declares no columns".to_string()));
        }

        Ok(Self { columns })
    }

    /// Load a schema file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("cannot read schema {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn columns(&self) -> &[SchemaColumn] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}
