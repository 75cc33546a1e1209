//! Multi-region batch forecasting.
//!
//! Groups records by region, extrapolates each region to the requested
//! target, fills every missing composite with one batch model call, and
//! returns actual and forecast rows in region/year order.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::config::MAX_HORIZON;
use crate::error::{IpmError, Result};
use crate::forecast::{Extrapolator, ForecastRow, Origin};
use crate::model::Predictor;
use crate::series::{MAX_YEAR, MIN_YEAR, Observation, ProjectedYear, Record, RegionSeries};

/// Region name used when the input carries no region identifier.
pub const SYNTHETIC_REGION: &str = "(all)";

/// How far each region is projected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastTarget {
    /// Project through this calendar year.
    Year(i32),
    /// Project this many years past each region's last observation.
    Horizon(u32),
}

impl ForecastTarget {
    /// Number of years to project past `last_year`; zero if already reached.
    pub fn horizon_from(self, last_year: i32) -> u32 {
        match self {
            ForecastTarget::Year(target) => {
                u32::try_from(i64::from(target) - i64::from(last_year)).unwrap_or(0)
            }
            ForecastTarget::Horizon(h) => h,
        }
    }

    /// Checks the target year or horizon against the accepted range.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a year outside `MIN_YEAR..=MAX_YEAR` or a
    /// horizon above [`MAX_HORIZON`].
    pub fn validate(self) -> Result<()> {
        match self {
            ForecastTarget::Year(year) if !(MIN_YEAR..=MAX_YEAR).contains(&year) => {
                Err(IpmError::InvalidInput {
                    field: "target_year".to_string(),
                    message: format!("must be in [{MIN_YEAR}, {MAX_YEAR}], got {year}"),
                })
            }
            ForecastTarget::Horizon(h) if h > MAX_HORIZON => Err(IpmError::InvalidInput {
                field: "horizon".to_string(),
                message: format!("must be at most {MAX_HORIZON}, got {h}"),
            }),
            _ => Ok(()),
        }
    }
}

/// Output of one batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    /// Actual and forecast rows, ordered by region then year.
    pub rows: Vec<ForecastRow>,
    /// Regions whose extrapolation failed; their actual rows are still in `rows`.
    pub skipped: Vec<IpmError>,
}

impl BatchOutcome {
    pub fn forecast_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.origin == Origin::Forecast)
            .count()
    }
}

/// A row whose composite may still need predicting.
enum Pending {
    Actual(Observation),
    Forecast(ProjectedYear),
}

impl Pending {
    fn year(&self) -> i32 {
        match self {
            Pending::Actual(o) => o.year,
            Pending::Forecast(p) => p.year,
        }
    }

    fn as_projected(&self) -> ProjectedYear {
        match self {
            Pending::Actual(o) => ProjectedYear {
                year: o.year,
                components: o.components,
            },
            Pending::Forecast(p) => *p,
        }
    }

    fn known_composite(&self) -> Option<f64> {
        match self {
            Pending::Actual(o) => o.composite,
            Pending::Forecast(_) => None,
        }
    }
}

/// Partitions records by region, sorted by region name and year.
///
/// Records without a region identifier fall into [`SYNTHETIC_REGION`].
///
/// # Errors
///
/// Returns `ParseError` if a region repeats a year.
pub fn partition_regions(records: &[Record]) -> Result<Vec<RegionSeries>> {
    let mut groups: BTreeMap<&str, Vec<Observation>> = BTreeMap::new();
    for record in records {
        let region = record.region.as_deref().unwrap_or(SYNTHETIC_REGION);
        groups.entry(region).or_default().push(record.observation);
    }
    groups
        .into_iter()
        .map(|(region, observations)| RegionSeries::new(region, observations))
        .collect()
}

/// Forecasts every region in `records` to `target`.
///
/// Actual rows are passed through with their components untouched; their
/// composite is copied when present and predicted otherwise. A region
/// with too little history keeps its actual rows, gets no forecast rows,
/// and is listed in [`BatchOutcome::skipped`].
///
/// # Errors
///
/// Returns `InvalidInput` for an out-of-range target or projected year,
/// `ParseError` for a repeated region-year, `SchemaError` if the model
/// needs a feature the rows cannot supply, and `ModelUnavailable` if the
/// model returns the wrong number of scores. Each aborts the whole batch.
pub fn forecast_batch(
    records: &[Record],
    target: ForecastTarget,
    method: Extrapolator,
    predictor: &Predictor,
) -> Result<BatchOutcome> {
    target.validate()?;
    let regions = partition_regions(records)?;

    let mut pending: Vec<(String, Pending)> = Vec::with_capacity(records.len());
    let mut skipped = Vec::new();

    for region in &regions {
        let name = region.region();
        for o in region.observations() {
            pending.push((name.to_string(), Pending::Actual(*o)));
        }

        let horizon = target.horizon_from(region.last_year());
        if horizon == 0 {
            continue;
        }
        match method.project(region, horizon) {
            Ok(projected) => {
                debug!(region = name, horizon, %method, "extrapolated region");
                pending.extend(
                    projected
                        .into_iter()
                        .map(|p| (name.to_string(), Pending::Forecast(p))),
                );
            }
            Err(err @ IpmError::InsufficientHistory { .. }) => {
                warn!(region = name, error = %err, "skipping region forecast");
                skipped.push(err);
            }
            Err(err) => return Err(err),
        }
    }

    let to_score: Vec<ProjectedYear> = pending
        .iter()
        .filter(|(_, p)| p.known_composite().is_none())
        .map(|(_, p)| p.as_projected())
        .collect();
    let mut scores = predictor.predict(&to_score)?.into_iter();

    let mut rows = Vec::with_capacity(pending.len());
    for (region, p) in pending {
        let (composite, predicted) = match p.known_composite() {
            Some(value) => (value, false),
            None => {
                let score = scores.next().ok_or_else(|| IpmError::ModelUnavailable {
                    reason: format!("model returned too few predictions for {} rows", to_score.len()),
                })?;
                (score, true)
            }
        };
        let origin = match p {
            Pending::Actual(_) => Origin::Actual,
            Pending::Forecast(_) => Origin::Forecast,
        };
        let year = p.year();
        rows.push(ForecastRow {
            region,
            year,
            components: p.as_projected().components,
            composite,
            predicted,
            origin,
        });
    }

    let outcome = BatchOutcome { rows, skipped };
    info!(
        regions = regions.len(),
        rows = outcome.rows.len(),
        forecast_rows = outcome.forecast_count(),
        predicted = to_score.len(),
        skipped = outcome.skipped.len(),
        "batch forecast complete"
    );
    Ok(outcome)
}
