//! Regression model adapter.
//!
//! The model itself is trained elsewhere; this module only evaluates it.
//! [`Predictor`] pairs a loaded model with the feature order it was
//! trained on and maps named rows onto that order.

pub mod artifact;

use std::fmt;

use serde::Serialize;

use crate::error::{IpmError, Result};
use crate::series::FeatureSource;

/// A pre-trained regression model over an ordered feature vector.
pub trait RegressionModel: fmt::Debug + Send + Sync {
    /// Predicts one value from features given in training order.
    fn predict_one(&self, features: &[f64]) -> f64;

    /// Predicts a batch of rows, each in training order.
    fn predict(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|row| self.predict_one(row)).collect()
    }
}

/// A loaded model together with its required feature order.
///
/// Immutable once built; shared by reference for the life of the process.
#[derive(Debug)]
pub struct Predictor {
    model: Box<dyn RegressionModel>,
    feature_names: Vec<String>,
}

impl Predictor {
    /// Wraps a model with the feature order recorded at training time.
    ///
    /// # Errors
    ///
    /// Returns `ModelUnavailable` if `feature_names` is empty.
    pub fn new(model: Box<dyn RegressionModel>, feature_names: Vec<String>) -> Result<Self> {
        if feature_names.is_empty() {
            return Err(IpmError::ModelUnavailable {
                reason: "model carries no feature names".to_string(),
            });
        }
        Ok(Self {
            model,
            feature_names,
        })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Predicts the composite indicator for every row.
    ///
    /// All rows are checked before the model runs, so a schema failure
    /// never yields partial output. Extra fields on a row are ignored.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` naming every feature missing from any row and
    /// `ModelUnavailable` if the model does not return one value per row.
    pub fn predict<R: FeatureSource>(&self, rows: &[R]) -> Result<Vec<f64>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut matrix = Vec::with_capacity(rows.len());
        let mut missing: Vec<String> = Vec::new();
        for row in rows {
            let mut ordered = Vec::with_capacity(self.feature_names.len());
            for name in &self.feature_names {
                match row.feature(name) {
                    Some(value) => ordered.push(value),
                    None => {
                        if !missing.contains(name) {
                            missing.push(name.clone());
                        }
                    }
                }
            }
            matrix.push(ordered);
        }

        if !missing.is_empty() {
            // Report in training order regardless of which row hit it first.
            missing.sort_by_key(|m| self.feature_names.iter().position(|f| f == m));
            return Err(IpmError::SchemaError { missing });
        }

        let scores = self.model.predict(&matrix);
        if scores.len() != rows.len() {
            return Err(IpmError::ModelUnavailable {
                reason: format!(
                    "model returned {} predictions for {} rows",
                    scores.len(),
                    rows.len()
                ),
            });
        }
        Ok(scores)
    }

    /// Predicts a single row.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` if the row lacks a required feature.
    pub fn predict_one<R: FeatureSource>(&self, row: &R) -> Result<f64> {
        let values = self.predict(std::slice::from_ref(row))?;
        Ok(values[0])
    }
}

/// Categorical band of a composite indicator value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IpmStatus {
    /// Below 60.
    Low,
    /// 60 up to 70.
    Medium,
    /// 70 up to 80.
    High,
    /// 80 and above.
    VeryHigh,
}

impl IpmStatus {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            IpmStatus::VeryHigh
        } else if score >= 70.0 {
            IpmStatus::High
        } else if score >= 60.0 {
            IpmStatus::Medium
        } else {
            IpmStatus::Low
        }
    }
}

impl fmt::Display for IpmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            IpmStatus::Low => "low",
            IpmStatus::Medium => "medium",
            IpmStatus::High => "high",
            IpmStatus::VeryHigh => "very high",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::series::{Components, Observation};

    /// Sums its inputs; makes column order observable.
    #[derive(Debug)]
    struct Weighted(Vec<f64>);

    impl RegressionModel for Weighted {
        fn predict_one(&self, features: &[f64]) -> f64 {
            features.iter().zip(&self.0).map(|(x, w)| x * w).sum()
        }
    }

    struct MapRow(HashMap<&'static str, f64>);

    impl FeatureSource for MapRow {
        fn feature(&self, name: &str) -> Option<f64> {
            self.0.get(name).copied()
        }
    }

    fn predictor(names: &[&str], weights: Vec<f64>) -> Predictor {
        Predictor::new(
            Box::new(Weighted(weights)),
            names.iter().map(|s| s.to_string()).collect(),
        )
        .expect("predictor should build")
    }

    #[test]
    fn empty_feature_list_is_model_unavailable() {
        let err = Predictor::new(Box::new(Weighted(vec![])), vec![]).unwrap_err();
        assert_eq!(err.kind(), "ModelUnavailable");
    }

    #[test]
    fn reorders_features_to_training_order() {
        let p = predictor(&["RLS", "UHH"], vec![1.0, 100.0]);
        let row = MapRow(HashMap::from([("UHH", 2.0), ("RLS", 3.0), ("extra", 9.0)]));
        assert_eq!(p.predict(&[row]).unwrap(), vec![203.0]);
    }

    #[test]
    fn missing_feature_is_schema_error_without_prediction() {
        let p = predictor(
            &["UHH", "HLS", "RLS", "Pengeluaran", "Tahun"],
            vec![1.0; 5],
        );
        let complete = MapRow(HashMap::from([
            ("UHH", 70.0),
            ("HLS", 13.0),
            ("RLS", 9.0),
            ("Pengeluaran", 10.0),
            ("Tahun", 2020.0),
        ]));
        let partial = MapRow(HashMap::from([
            ("UHH", 70.0),
            ("HLS", 13.0),
            ("Pengeluaran", 10.0),
            ("Tahun", 2020.0),
        ]));
        let err = p.predict(&[complete, partial]).unwrap_err();
        assert_eq!(
            err,
            IpmError::SchemaError {
                missing: vec!["RLS".to_string()]
            }
        );
    }

    #[test]
    fn observation_rows_feed_the_model() {
        let p = predictor(&["Tahun", "UHH"], vec![0.0, 1.0]);
        let o = Observation::new(2022, Components::new(71.25, 13.0, 9.0, 11_000.0));
        assert_eq!(p.predict_one(&o).unwrap(), 71.25);
    }

    #[test]
    fn empty_batch_returns_empty() {
        let p = predictor(&["UHH"], vec![1.0]);
        let rows: Vec<Observation> = Vec::new();
        assert!(p.predict(&rows).unwrap().is_empty());
    }

    /// Drops the last row of every batch.
    #[derive(Debug)]
    struct ShortBatch;

    impl RegressionModel for ShortBatch {
        fn predict_one(&self, features: &[f64]) -> f64 {
            features[0]
        }

        fn predict(&self, rows: &[Vec<f64>]) -> Vec<f64> {
            rows.iter().skip(1).map(|row| self.predict_one(row)).collect()
        }
    }

    #[test]
    fn short_model_output_is_model_unavailable() {
        let p = Predictor::new(Box::new(ShortBatch), vec!["UHH".to_string()]).unwrap();
        let rows = vec![
            MapRow(HashMap::from([("UHH", 70.0)])),
            MapRow(HashMap::from([("UHH", 71.0)])),
        ];
        let err = p.predict(&rows).unwrap_err();
        assert_eq!(err.kind(), "ModelUnavailable");
        assert!(err.to_string().contains("1 predictions for 2 rows"));

        let err = p.predict_one(&rows[0]).unwrap_err();
        assert_eq!(err.kind(), "ModelUnavailable");
    }

    #[test]
    fn status_bands() {
        assert_eq!(IpmStatus::from_score(82.1), IpmStatus::VeryHigh);
        assert_eq!(IpmStatus::from_score(80.0), IpmStatus::VeryHigh);
        assert_eq!(IpmStatus::from_score(72.0), IpmStatus::High);
        assert_eq!(IpmStatus::from_score(60.0), IpmStatus::Medium);
        assert_eq!(IpmStatus::from_score(59.99), IpmStatus::Low);
    }
}
