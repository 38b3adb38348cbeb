//! Drift detection module
//!
//! Compares the train and test splits column by column and collects the
//! outcome into a [`DriftReport`].

mod ks;

pub use ks::KolmogorovSmirnovTest;

use crate::error::Result;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};

/// Drift detection result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftResult {
    /// Whether drift was detected
    pub drift_detected: bool,
    /// Test statistic
    pub statistic: f64,
    /// P-value of the test
    pub p_value: f64,
    /// Threshold used for detection
    pub threshold: f64,
}

/// Trait for drift detectors
pub trait DriftDetector: Send + Sync {
    /// Detect drift between reference and test samples
    fn detect(&self, reference: &[f64], test: &[f64]) -> Result<DriftResult>;

    /// Get the threshold used for detection
    fn threshold(&self) -> f64;
}

/// Outcome for one shared column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDrift {
    pub column: String,
    pub p_value: f64,
    pub drift_detected: bool,
}

impl Serialize for ColumnDrift {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ColumnDrift", 2)?;
        state.serialize_field("p_value", &self.p_value)?;
        state.serialize_field("drift_status", &self.drift_detected)?;
        state.end()
    }
}

/// Per-column drift report, in train column order
///
/// Serializes as an ordered mapping `column -> {p_value, drift_status}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriftReport {
    entries: Vec<ColumnDrift>,
}

impl DriftReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, column: impl Into<String>, result: &DriftResult) {
        self.entries.push(ColumnDrift {
            column: column.into(),
            p_value: result.p_value,
            drift_detected: result.drift_detected,
        });
    }

    pub fn entries(&self) -> &[ColumnDrift] {
        &self.entries
    }

    pub fn get(&self, column: &str) -> Option<&ColumnDrift> {
        self.entries.iter().find(|e| e.column == column)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when no column drifted
    pub fn is_healthy(&self) -> bool {
        self.entries.iter().all(|e| !e.drift_detected)
    }

    pub fn drifted_columns(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.drift_detected)
            .map(|e| e.column.clone())
            .collect()
    }
}

impl Serialize for DriftReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.column, entry)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(p_value: f64, drift: bool) -> DriftResult {
        DriftResult {
            drift_detected: drift,
            statistic: 0.0,
            p_value,
            threshold: 0.05,
        }
    }

    #[test]
    fn test_report_verdict() {
        let mut report = DriftReport::new();
        assert!(report.is_empty());
        assert!(report.is_healthy());

        report.push("a", &result(0.9, false));
        assert!(report.is_healthy());

        report.push("b", &result(0.01, true));
        assert!(!report.is_healthy());
        assert_eq!(report.drifted_columns(), vec!["b".to_string()]);
        assert_eq!(report.get("a").unwrap().p_value, 0.9);
    }

    #[test]
    fn test_report_yaml_keeps_order() {
        let mut report = DriftReport::new();
        report.push("zeta", &result(0.5, false));
        report.push("alpha", &result(0.01, true));

        let yaml = serde_yaml::to_string(&report).unwrap();
        let zeta = yaml.find("zeta").unwrap();
        let alpha = yaml.find("alpha").unwrap();
        assert!(zeta < alpha);
        assert!(yaml.contains("drift_status: true"));

        let value: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(value["alpha"]["p_value"].as_f64(), Some(0.01));
    }
}
