//! File helpers: CSV tables, binary objects and text reports

use crate::error::{PipelineError, Result};
use polars::prelude::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Create the parent directory of `path` if needed
pub fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Read a CSV file with a header row; empty cells become nulls
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    let file = File::open(path)
        .map_err(|e| PipelineError::Data(format!("cannot open {}: {}", path.display(), e)))?;

    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .into_reader_with_file_handle(file)
        .finish()
        .map_err(|e| PipelineError::Data(format!("cannot parse {}: {}", path.display(), e)))
}

/// Write a DataFrame as CSV with a header row, creating directories
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(df)?;
    Ok(())
}

/// Persist any serializable value in binary form
pub fn save_object<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(writer, value)?;
    Ok(())
}

/// Load a value written by [`save_object`]
pub fn load_object<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(bincode::deserialize_from(reader)?)
}

pub fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let text = serde_yaml::to_string(value)?;
    fs::write(path, text)?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};
    use tempfile::TempDir;

    #[test]
    fn test_csv_round_trip_keeps_nulls() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/table.csv");

        let mut df = df!(
            "a" => [Some(1i64), None, Some(3)],
            "b" => [0.5, 1.5, 2.5]
        ).unwrap();
        write_csv(&mut df, &path).unwrap();

        let back = read_csv(&path).unwrap();
        assert_eq!(back.shape(), (3, 2));
        assert_eq!(back.column("a").unwrap().null_count(), 1);
        let names: Vec<&str> = back.get_column_names().iter().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_object_round_trip_keeps_nan() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("arr.bin");
        let arr = array![[1.0, f64::NAN], [3.0, 4.0]];

        save_object(&path, &arr).unwrap();
        let back: Array2<f64> = load_object(&path).unwrap();
        assert_eq!(back[[0, 0]], 1.0);
        assert!(back[[0, 1]].is_nan());
        assert_eq!(back.dim(), (2, 2));
    }

    #[test]
    fn test_missing_files() {
        assert!(matches!(
            read_csv(Path::new("/nonexistent/x.csv")),
            Err(PipelineError::Data(_))
        ));
        assert!(load_object::<Vec<f64>>(Path::new("/nonexistent/x.bin")).is_err());
    }

    #[test]
    fn test_text_reports() {
        let dir = TempDir::new().unwrap();
        let yaml_path = dir.path().join("r/report.yaml");
        let json_path = dir.path().join("r/report.json");

        write_yaml(&yaml_path, &vec!["x", "y"]).unwrap();
        write_json(&json_path, &serde_json::json!({"score": 0.5})).unwrap();

        assert!(fs::read_to_string(yaml_path).unwrap().contains("- x"));
        assert!(fs::read_to_string(json_path).unwrap().contains("\"score\": 0.5"));
    }
}
