//! Component extrapolation strategies.
//!
//! Two linear strategies project the four components past the last
//! observed year:
//!
//! - [`Extrapolator::Drift`]: closed-form two-point slope, every step
//!   measured from the original last value.
//! - [`Extrapolator::GrowthMeanDiff`]: mean year-over-year delta, each
//!   step chained from the previous projected value.
//!
//! Projected components are never negative. The composite indicator is
//! model-predicted and left unclamped.

pub mod drift;
pub mod growth;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{IpmError, Result};
use crate::model::Predictor;
use crate::series::{Components, ProjectedYear, RegionSeries, YEAR_COLUMN};

pub use drift::{drift_forecast, drift_forecast_to_year, drift_projection};
pub use growth::{growth_forecast, growth_projection, mean_diff};

/// The year `step` years after `year`.
///
/// # Errors
///
/// Returns `InvalidInput` if the result does not fit an `i32`.
pub(crate) fn year_after(year: i32, step: u32) -> Result<i32> {
    year.checked_add_unsigned(step)
        .ok_or_else(|| IpmError::InvalidInput {
            field: YEAR_COLUMN.to_string(),
            message: format!("year {year} + {step} is out of range"),
        })
}

/// Whether a row was observed or synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Actual,
    Forecast,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Actual => f.write_str("actual"),
            Origin::Forecast => f.write_str("forecast"),
        }
    }
}

/// One output row: year, components, and the composite indicator.
///
/// Built once with its final composite and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRow {
    #[serde(rename = "Cakupan")]
    pub region: String,
    #[serde(rename = "Tahun")]
    pub year: i32,
    #[serde(flatten)]
    pub components: Components,
    #[serde(rename = "IPM")]
    pub composite: f64,
    /// True when `composite` came from the model rather than the input.
    pub predicted: bool,
    pub origin: Origin,
}

impl ForecastRow {
    pub(crate) fn forecast(region: &str, projected: ProjectedYear, composite: f64) -> Self {
        Self {
            region: region.to_string(),
            year: projected.year,
            components: projected.components,
            composite,
            predicted: true,
            origin: Origin::Forecast,
        }
    }
}

/// Extrapolation strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Extrapolator {
    /// Two-point slope, non-compounding.
    #[default]
    #[serde(rename = "drift")]
    Drift,
    /// Mean year-over-year delta, compounding.
    #[serde(rename = "growth")]
    GrowthMeanDiff,
}

impl Extrapolator {
    /// Names accepted by [`FromStr`].
    pub const NAMES: &[&str] = &["drift", "growth"];

    pub fn name(self) -> &'static str {
        match self {
            Extrapolator::Drift => "drift",
            Extrapolator::GrowthMeanDiff => "growth",
        }
    }

    /// Projects all four components `horizon` years past the last observation.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientHistory` if any component has fewer than two points.
    pub fn project(self, region: &RegionSeries, horizon: u32) -> Result<Vec<ProjectedYear>> {
        match self {
            Extrapolator::Drift => drift_projection(region, horizon),
            Extrapolator::GrowthMeanDiff => growth_projection(region, horizon),
        }
    }

    /// Projects and scores `horizon` future years as `Forecast` rows.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientHistory` for short series and `SchemaError` if
    /// the model needs a feature the projection cannot supply.
    pub fn forecast(
        self,
        region: &RegionSeries,
        horizon: u32,
        predictor: &Predictor,
    ) -> Result<Vec<ForecastRow>> {
        let projected = self.project(region, horizon)?;
        let scores = predictor.predict(&projected)?;
        Ok(projected
            .into_iter()
            .zip(scores)
            .map(|(p, score)| ForecastRow::forecast(region.region(), p, score))
            .collect())
    }
}

impl fmt::Display for Extrapolator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Extrapolator {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drift" => Ok(Extrapolator::Drift),
            "growth" | "mean_diff" => Ok(Extrapolator::GrowthMeanDiff),
            other => Err(format!(
                "unknown method \"{other}\", available: {}",
                Self::NAMES.join(", ")
            )),
        }
    }
}
