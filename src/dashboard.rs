//! Dashboard facade over the loaded model and historical dataset.
//!
//! Both resources are loaded once at startup and injected here. A missing
//! model disables prediction, a missing dataset disables historical views,
//! and neither failure affects the other.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::batch::{BatchOutcome, ForecastTarget, forecast_batch};
use crate::config::AppConfig;
use crate::error::{IpmError, Result};
use crate::forecast::{Extrapolator, ForecastRow};
use crate::io::table::{NumberFormat, RawTable};
use crate::model::artifact::load_predictor;
use crate::model::{IpmStatus, Predictor};
use crate::series::{Observation, PREDICTED_COLUMN, Record, RegionSeries};

/// Result of a single manual prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    /// Predicted composite indicator.
    pub ipm: f64,
    /// Status band of the prediction.
    pub status: IpmStatus,
}

/// National mean of the observed composite for one year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YearSummary {
    #[serde(rename = "Tahun")]
    pub year: i32,
    /// Mean composite over regions that reported one.
    #[serde(rename = "IPM")]
    pub mean_ipm: f64,
    /// Number of regions contributing to the mean.
    pub regions: usize,
}

/// Read-only application state for one process.
#[derive(Debug)]
pub struct Dashboard {
    predictor: Result<Predictor>,
    history: Result<Vec<Record>>,
    upload_format: NumberFormat,
    upload_delimiter: u8,
}

impl Dashboard {
    /// Builds a dashboard from already-loaded resources.
    pub fn new(predictor: Result<Predictor>, history: Result<Vec<Record>>) -> Self {
        Self {
            predictor,
            history,
            upload_format: NumberFormat::INDONESIAN,
            upload_delimiter: b',',
        }
    }

    /// Sets how uploaded tables are parsed.
    pub fn with_upload_format(mut self, format: NumberFormat, delimiter: u8) -> Self {
        self.upload_format = format;
        self.upload_delimiter = delimiter;
        self
    }

    /// Loads the model and historical dataset named in `config`.
    ///
    /// Load failures are logged and kept; the matching operations report
    /// them when called.
    pub fn open(config: &AppConfig) -> Self {
        let predictor = load_predictor(&config.paths.model);
        if let Err(e) = &predictor {
            warn!(error = %e, "prediction disabled");
        }

        let history = load_history(
            &config.paths.history,
            config.history.number_format(),
            config.history.delimiter_byte(),
        );
        match &history {
            Ok(records) => info!(rows = records.len(), "loaded historical data"),
            Err(e) => warn!(error = %e, "historical views disabled"),
        }

        Self::new(predictor, history).with_upload_format(
            config.upload.number_format(),
            config.upload.delimiter_byte(),
        )
    }

    /// The loaded model.
    ///
    /// # Errors
    ///
    /// Returns `ModelUnavailable` if the model failed to load.
    pub fn predictor(&self) -> Result<&Predictor> {
        self.predictor.as_ref().map_err(Clone::clone)
    }

    /// The historical records.
    ///
    /// # Errors
    ///
    /// Returns `DataUnavailable` if the dataset failed to load.
    pub fn history(&self) -> Result<&[Record]> {
        self.history.as_deref().map_err(Clone::clone)
    }

    pub fn upload_format(&self) -> (NumberFormat, u8) {
        (self.upload_format, self.upload_delimiter)
    }

    /// Predicts the composite for manually entered values.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for out-of-range values, `ModelUnavailable`
    /// without a model, and `SchemaError` if the model needs other features.
    pub fn predict_single(&self, input: &Observation) -> Result<Prediction> {
        validate_manual_input(input)?;
        let ipm = self.predictor()?.predict_one(input)?;
        Ok(Prediction {
            ipm,
            status: IpmStatus::from_score(ipm),
        })
    }

    /// Sorted region names in the historical dataset.
    ///
    /// # Errors
    ///
    /// Returns `DataUnavailable` without historical data.
    pub fn regions(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .history()?
            .iter()
            .filter_map(|r| r.region.clone())
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// All historical observations of one region.
    ///
    /// # Errors
    ///
    /// Returns `DataUnavailable` without historical data and
    /// `UnknownRegion` if no row names `region`.
    pub fn region_history(&self, region: &str) -> Result<RegionSeries> {
        let observations: Vec<Observation> = self
            .history()?
            .iter()
            .filter(|r| r.region.as_deref() == Some(region))
            .map(|r| r.observation)
            .collect();
        if observations.is_empty() {
            return Err(IpmError::UnknownRegion {
                region: region.to_string(),
            });
        }
        RegionSeries::new(region, observations)
    }

    /// Mean observed composite per year across regions.
    ///
    /// # Errors
    ///
    /// Returns `DataUnavailable` without historical data.
    pub fn national_summary(&self) -> Result<Vec<YearSummary>> {
        let mut by_year: BTreeMap<i32, (f64, usize)> = BTreeMap::new();
        for record in self.history()? {
            if let Some(ipm) = record.observation.composite {
                let entry = by_year.entry(record.observation.year).or_default();
                entry.0 += ipm;
                entry.1 += 1;
            }
        }
        Ok(by_year
            .into_iter()
            .map(|(year, (sum, n))| YearSummary {
                year,
                mean_ipm: sum / n as f64,
                regions: n,
            })
            .collect())
    }

    /// Actual and forecast rows for one historical region.
    ///
    /// # Errors
    ///
    /// Returns `ModelUnavailable`, `DataUnavailable`, `UnknownRegion`, or
    /// `InsufficientHistory` when the region cannot be extrapolated.
    pub fn forecast_region(
        &self,
        region: &str,
        horizon: u32,
        method: Extrapolator,
    ) -> Result<Vec<ForecastRow>> {
        let predictor = self.predictor()?;
        let series = self.region_history(region)?;
        let records: Vec<Record> = series
            .observations()
            .iter()
            .map(|o| Record {
                region: Some(region.to_string()),
                observation: *o,
            })
            .collect();
        let mut outcome = forecast_batch(
            &records,
            ForecastTarget::Horizon(horizon),
            method,
            predictor,
        )?;
        match outcome.skipped.pop() {
            Some(err) => Err(err),
            None => Ok(outcome.rows),
        }
    }

    /// Runs the batch forecaster over `records`.
    ///
    /// # Errors
    ///
    /// Returns `ModelUnavailable` without a model; otherwise as
    /// [`forecast_batch`].
    pub fn forecast_records(
        &self,
        records: &[Record],
        target: ForecastTarget,
        method: Extrapolator,
    ) -> Result<BatchOutcome> {
        forecast_batch(records, target, method, self.predictor()?)
    }

    /// Forecasts every historical region to `target`.
    ///
    /// # Errors
    ///
    /// Returns `ModelUnavailable` or `DataUnavailable` when a resource is missing.
    pub fn forecast_history(
        &self,
        target: ForecastTarget,
        method: Extrapolator,
    ) -> Result<BatchOutcome> {
        let predictor = self.predictor()?;
        forecast_batch(self.history()?, target, method, predictor)
    }

    /// Parses uploaded CSV text into records using the upload format.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` or `SchemaError` for malformed uploads.
    pub fn parse_upload(&self, reader: impl std::io::Read) -> Result<Vec<Record>> {
        RawTable::from_reader(reader, self.upload_delimiter)?.records(self.upload_format)
    }

    /// Appends a predicted composite column to an uploaded table.
    ///
    /// Other columns are kept as uploaded. Nothing is predicted unless
    /// every row supplies every model feature.
    ///
    /// # Errors
    ///
    /// Returns `ModelUnavailable`, `SchemaError` naming the missing
    /// columns, or `ParseError` for non-numeric feature cells.
    pub fn fill_predictions(&self, table: &RawTable) -> Result<RawTable> {
        let predictor = self.predictor()?;
        let rows = table.feature_rows(predictor.feature_names(), self.upload_format)?;
        let scores = predictor.predict(&rows)?;
        let cells: Vec<String> = scores.iter().map(|s| format!("{s:.4}")).collect();
        info!(rows = cells.len(), "filled predictions");
        Ok(table.with_column(PREDICTED_COLUMN, &cells))
    }
}

/// Loads the historical dataset.
///
/// # Errors
///
/// Returns `DataUnavailable` wrapping any read, schema, or parse failure.
pub fn load_history(path: &Path, format: NumberFormat, delimiter: u8) -> Result<Vec<Record>> {
    let unavailable = |reason: String| IpmError::DataUnavailable { reason };
    let file = File::open(path)
        .map_err(|e| unavailable(format!("cannot read \"{}\": {e}", path.display())))?;
    RawTable::from_reader(file, delimiter)
        .and_then(|t| t.records(format))
        .map_err(|e| unavailable(format!("\"{}\": {e}", path.display())))
}

/// Checks manual entries against the accepted input ranges.
///
/// # Errors
///
/// Returns `InvalidInput` naming the first out-of-range field.
pub fn validate_manual_input(input: &Observation) -> Result<()> {
    let c = &input.components;
    let checks: [(&str, f64, f64, f64); 5] = [
        ("Tahun", f64::from(input.year), 2000.0, 2100.0),
        ("UHH", c.life_expectancy, 40.0, 90.0),
        ("HLS", c.expected_schooling, 0.0, 25.0),
        ("RLS", c.mean_schooling, 0.0, 25.0),
        ("Pengeluaran", c.expenditure, 0.0, f64::MAX),
    ];
    for (field, value, lo, hi) in checks {
        if !(lo..=hi).contains(&value) {
            let message = if hi == f64::MAX {
                format!("must be >= {lo}, got {value}")
            } else {
                format!("must be in [{lo}, {hi}], got {value}")
            };
            return Err(IpmError::InvalidInput {
                field: field.to_string(),
                message,
            });
        }
    }
    Ok(())
}
