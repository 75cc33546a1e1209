//! Drift method: `y(T+h) = y(T) + h * (y(T) - y(1)) / (T - 1)`.

use super::year_after;
use crate::error::Result;
use crate::series::{Component, ComponentSeries, Components, ProjectedYear, RegionSeries};

/// Two-point slope between the first and last observation.
fn slope(series: &ComponentSeries) -> f64 {
    let (_, first) = series.first();
    let (_, last) = series.last();
    (last - first) / (series.len() - 1) as f64
}

/// Projects a series `horizon` years past its last observed year.
///
/// Every step is measured from the original last value, so steps do not
/// compound. Values are clamped at zero.
///
/// # Errors
///
/// Returns `InsufficientHistory` if the series has fewer than two points
/// and `InvalidInput` if a projected year overflows.
pub fn drift_forecast(series: &ComponentSeries, horizon: u32) -> Result<Vec<(i32, f64)>> {
    if series.len() < 2 {
        return Err(series.insufficient());
    }
    let slope = slope(series);
    let (last_year, last_value) = series.last();
    (1..=horizon)
        .map(|h| {
            let year = year_after(last_year, h)?;
            let value = (last_value + f64::from(h) * slope).max(0.0);
            Ok((year, value))
        })
        .collect()
}

/// Projects a single value at `target_year`.
///
/// A target at or before the last observed year returns the last value
/// unchanged, as does a single-point series (naive fallback).
pub fn drift_forecast_to_year(series: &ComponentSeries, target_year: i32) -> f64 {
    let (last_year, last_value) = series.last();
    let h = i64::from(target_year) - i64::from(last_year);
    if h <= 0 || series.len() < 2 {
        return last_value;
    }
    (last_value + h as f64 * slope(series)).max(0.0)
}

/// Applies [`drift_forecast`] to each component independently and joins
/// the results by year.
///
/// # Errors
///
/// Returns `InsufficientHistory` for the first component with fewer than
/// two points and `InvalidInput` if a projected year overflows.
pub fn drift_projection(region: &RegionSeries, horizon: u32) -> Result<Vec<ProjectedYear>> {
    let mut per_component = Vec::with_capacity(Component::ALL.len());
    for component in Component::ALL {
        let points = drift_forecast(&region.component_series(component), horizon)?;
        per_component.push(points);
    }

    // Every component shares the region's years.
    Ok((0..horizon as usize)
        .map(|i| ProjectedYear {
            year: per_component[0][i].0,
            components: Components::from_fn(|c| per_component[c.index()][i].1),
        })
        .collect())
}
