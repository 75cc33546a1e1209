//! Growth method: repeated application of the mean year-over-year delta.
//!
//! Unlike drift, each projected year is derived from the previous
//! projected year, so the four components advance in lockstep and the
//! chain carries any clamping forward.

use crate::error::Result;
use crate::model::Predictor;
use crate::series::{Component, ComponentSeries, Components, ProjectedYear, RegionSeries};

use super::{Extrapolator, ForecastRow, year_after};

/// Mean of consecutive differences `v[i] - v[i-1]`.
///
/// # Errors
///
/// Returns `InsufficientHistory` if the series has fewer than two points.
pub fn mean_diff(series: &ComponentSeries) -> Result<f64> {
    if series.len() < 2 {
        return Err(series.insufficient());
    }
    let diffs: f64 = series.points().windows(2).map(|w| w[1].1 - w[0].1).sum();
    Ok(diffs / (series.len() - 1) as f64)
}

/// Chains the mean delta of every component forward `horizon` years.
///
/// # Errors
///
/// Returns `InsufficientHistory` for the first component with fewer than
/// two points and `InvalidInput` if a projected year overflows.
pub fn growth_projection(region: &RegionSeries, horizon: u32) -> Result<Vec<ProjectedYear>> {
    let mut deltas = [0.0; 4];
    for component in Component::ALL {
        deltas[component.index()] = mean_diff(&region.component_series(component))?;
    }

    let last = region.last();
    let mut previous = ProjectedYear {
        year: last.year,
        components: last.components,
    };
    let mut out = Vec::with_capacity(horizon as usize);
    for _ in 0..horizon {
        let next = ProjectedYear {
            year: year_after(previous.year, 1)?,
            components: Components::from_fn(|c| {
                (previous.components.get(c) + deltas[c.index()]).max(0.0)
            }),
        };
        out.push(next);
        previous = next;
    }
    Ok(out)
}

/// Projects `horizon` years by the growth method and scores each year.
///
/// # Errors
///
/// Returns `InsufficientHistory` for short series and `SchemaError` if the
/// model requires a feature the projection cannot supply.
pub fn growth_forecast(
    region: &RegionSeries,
    horizon: u32,
    predictor: &Predictor,
) -> Result<Vec<ForecastRow>> {
    Extrapolator::GrowthMeanDiff.forecast(region, horizon, predictor)
}
