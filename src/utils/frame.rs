//! Conversions between raw records, DataFrames and ndarray matrices

use crate::error::{PipelineError, Result};
use crate::store::Document;
use ndarray::{Array1, Array2};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::Value;

fn cell_value(value: Option<&Value>, column: &str, missing_tokens: &[String]) -> Result<Option<f64>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::Bool(b)) => Ok(Some(if *b { 1.0 } else { 0.0 })),
        Some(Value::String(s)) => {
            if missing_tokens.iter().any(|t| t.eq_ignore_ascii_case(s.trim())) {
                return Ok(None);
            }
            s.trim().parse::<f64>().map(Some).map_err(|_| {
                PipelineError::Data(format!("column '{}' holds non-numeric value '{}'", column, s))
            })
        }
        Some(other) => Err(PipelineError::Data(format!(
            "column '{}' holds unsupported value {}",
            column, other
        ))),
    }
}

/// Build a numeric table from records
///
/// Columns appear in first-seen key order and `drop_field` is skipped.
/// Missing keys, nulls and missing tokens become nulls. A column whose
/// present values are all integral is stored as Int64, otherwise Float64.
pub fn documents_to_frame(documents: &[Document], drop_field: &str, missing_tokens: &[String]) -> Result<DataFrame> {
    let mut names: Vec<String> = Vec::new();
    for doc in documents {
        for key in doc.keys() {
            if key != drop_field && !names.iter().any(|n| n == key) {
                names.push(key.clone());
            }
        }
    }

    let mut columns = Vec::with_capacity(names.len());
    for name in &names {
        let values: Vec<Option<f64>> = documents
            .iter()
            .map(|doc| cell_value(doc.get(name), name, missing_tokens))
            .collect::<Result<_>>()?;

        let integral = values
            .iter()
            .flatten()
            .all(|v| v.fract() == 0.0 && v.abs() < i64::MAX as f64);

        let series = if integral {
            let ints: Vec<Option<i64>> = values.iter().map(|v| v.map(|x| x as i64)).collect();
            Series::new(name.as_str().into(), ints)
        } else {
            Series::new(name.as_str().into(), values)
        };
        columns.push(Column::from(series));
    }

    Ok(DataFrame::new(columns)?)
}

/// Extract named columns into a row-major matrix; nulls become NaN
pub fn frame_to_array(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|name| column_f64(df, name))
        .collect::<Result<_>>()?;

    Ok(Array2::from_shape_fn((n_rows, col_names.len()), |(r, c)| col_data[c][r]))
}

/// One column as f64 values with nulls as NaN
pub fn column_f64(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| PipelineError::SchemaMismatch(format!("column '{}' not found", name)))?;
    let cast = column.cast(&DataType::Float64)?;
    Ok(cast.f64()?.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

/// Non-null values of a column
pub fn present_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    Ok(column_f64(df, name)?.into_iter().filter(|v| !v.is_nan()).collect())
}

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

/// Column vector of the target
pub fn target_array(df: &DataFrame, name: &str) -> Result<Array1<f64>> {
    Ok(Array1::from_vec(column_f64(df, name)?))
}

/// Seeded shuffle split; the test side gets `ceil(test_ratio * rows)` rows
pub fn train_test_split(df: &DataFrame, test_ratio: f64, seed: u64) -> Result<(DataFrame, DataFrame)> {
    let n = df.height();
    let n_test = (test_ratio * n as f64).ceil() as usize;
    let n_train = n.saturating_sub(n_test);

    if n_test == 0 || n_train == 0 {
        return Err(PipelineError::EmptySplit(format!(
            "{} rows with test ratio {} leave an empty split",
            n, test_ratio
        )));
    }

    let mut indices: Vec<IdxSize> = (0..n as IdxSize).collect();
    indices.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));

    let test_idx = IdxCa::from_vec("idx".into(), indices[..n_test].to_vec());
    let train_idx = IdxCa::from_vec("idx".into(), indices[n_test..].to_vec());

    Ok((df.take(&train_idx)?, df.take(&test_idx)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_documents_to_frame() {
        let docs = vec![
            doc(json!({"_id": "a1", "x": 1, "y": 0.5, "Result": -1})),
            doc(json!({"_id": "a2", "x": "na", "y": 1.5, "Result": 1})),
            doc(json!({"_id": "a3", "y": "2.5", "Result": 1, "z": 7})),
        ];

        let df = documents_to_frame(&docs, "_id", &["na".to_string()]).unwrap();
        assert_eq!(column_names(&df), vec!["x", "y", "Result", "z"]);
        assert_eq!(df.column("x").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("y").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("x").unwrap().null_count(), 2);
        assert_eq!(df.column("z").unwrap().null_count(), 2);
    }

    #[test]
    fn test_non_numeric_string_is_rejected() {
        let docs = vec![doc(json!({"x": "abc"}))];
        assert!(matches!(
            documents_to_frame(&docs, "_id", &[]),
            Err(PipelineError::Data(_))
        ));
    }

    #[test]
    fn test_frame_to_array_nulls_are_nan() {
        let df = df!(
            "a" => [Some(1i64), None],
            "b" => [2.0, 3.0]
        ).unwrap();
        let arr = frame_to_array(&df, &["b".to_string(), "a".to_string()]).unwrap();
        assert_eq!(arr[[0, 0]], 2.0);
        assert_eq!(arr[[0, 1]], 1.0);
        assert!(arr[[1, 1]].is_nan());
        assert_eq!(present_values(&df, "a").unwrap(), vec![1.0]);
    }

    #[test]
    fn test_missing_column() {
        let df = df!("a" => [1.0]).unwrap();
        assert!(matches!(
            frame_to_array(&df, &["b".to_string()]),
            Err(PipelineError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_split_sizes_and_determinism() {
        let df = df!("a" => (0..10i64).collect::<Vec<_>>()).unwrap();
        let (train, test) = train_test_split(&df, 0.25, 42).unwrap();
        assert_eq!(train.height(), 7);
        assert_eq!(test.height(), 3);

        let (train2, _) = train_test_split(&df, 0.25, 42).unwrap();
        assert!(train.equals(&train2));

        let mut all = present_values(&train, "a").unwrap();
        all.extend(present_values(&test, "a").unwrap());
        all.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(all, (0..10).map(f64::from).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_too_small() {
        let df = df!("a" => [1i64]).unwrap();
        assert!(matches!(train_test_split(&df, 0.2, 42), Err(PipelineError::EmptySplit(_))));
    }
}
