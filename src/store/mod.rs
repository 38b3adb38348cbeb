//! Document store access
//!
//! Raw records are flat JSON objects keyed by column name. Ingestion reads
//! them through [`DocumentSource`]; the `push-data` command writes them
//! through [`DocumentSink`].

mod memory;
mod mongo;

pub use memory::InMemoryStore;
pub use mongo::MongoStore;

use crate::error::Result;
use crate::utils::read_csv;
use polars::prelude::*;
use serde_json::{Map, Number, Value};
use std::path::Path;

/// One raw record
pub type Document = Map<String, Value>;

/// Reads every record of a collection
pub trait DocumentSource: Send + Sync {
    fn fetch_all(&self, database: &str, collection: &str) -> Result<Vec<Document>>;
}

/// Appends records to a collection
pub trait DocumentSink: Send + Sync {
    /// Returns the number of inserted records
    fn insert_many(&self, database: &str, collection: &str, documents: Vec<Document>) -> Result<usize>;
}

fn column_values(column: &Column) -> Result<Vec<Value>> {
    let dtype = column.dtype();
    let values = if dtype.is_integer() {
        column
            .cast(&DataType::Int64)?
            .i64()?
            .into_iter()
            .map(|v| v.map_or(Value::Null, Value::from))
            .collect()
    } else if dtype.is_float() {
        column
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.and_then(Number::from_f64).map_or(Value::Null, Value::Number))
            .collect()
    } else if matches!(dtype, DataType::Boolean) {
        column
            .bool()?
            .into_iter()
            .map(|v| v.map_or(Value::Null, Value::Bool))
            .collect()
    } else {
        column
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .map(|v| v.map_or(Value::Null, |s| Value::String(s.to_string())))
            .collect()
    };
    Ok(values)
}

/// Turn every CSV row into a record, keeping the header order
pub fn csv_to_documents(path: &Path) -> Result<Vec<Document>> {
    let df = read_csv(path)?;
    let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    let columns: Vec<Vec<Value>> = df
        .get_columns()
        .iter()
        .map(column_values)
        .collect::<Result<_>>()?;

    let documents = (0..df.height())
        .map(|row| {
            names
                .iter()
                .zip(columns.iter())
                .map(|(name, values)| (name.clone(), values[row].clone()))
                .collect::<Document>()
        })
        .collect();

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_csv_to_documents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "b,a,label\n1,0.5,-1\n-1,,1\n").unwrap();

        let docs = csv_to_documents(&path).unwrap();
        assert_eq!(docs.len(), 2);

        let keys: Vec<&String> = docs[0].keys().collect();
        assert_eq!(keys, vec!["b", "a", "label"]);
        assert_eq!(docs[0]["b"], Value::from(1));
        assert_eq!(docs[0]["a"], Value::from(0.5));
        assert_eq!(docs[1]["a"], Value::Null);
        assert_eq!(docs[1]["label"], Value::from(1));
    }
}
