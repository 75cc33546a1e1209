//! Typed data model: components, observations, and per-region series.
//!
//! Rows are validated once at ingestion and then handled as these strict
//! records; nothing downstream re-checks column presence.

use std::fmt;

use serde::Serialize;

use crate::error::{IpmError, Result};

/// Column holding the observation year.
pub const YEAR_COLUMN: &str = "Tahun";
/// Column holding the region identifier.
pub const REGION_COLUMN: &str = "Cakupan";
/// Column holding the observed composite indicator.
pub const COMPOSITE_COLUMN: &str = "IPM";
/// Column appended by mass prediction.
pub const PREDICTED_COLUMN: &str = "IPM_Prediksi";

/// Earliest year accepted from tables and as a forecast target.
pub const MIN_YEAR: i32 = 1900;
/// Latest year accepted from tables and as a forecast target.
pub const MAX_YEAR: i32 = 2100;

/// One of the four measured components of the composite indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Component {
    /// Life expectancy at birth (years).
    LifeExpectancy,
    /// Expected years of schooling.
    ExpectedSchooling,
    /// Mean years of schooling.
    MeanSchooling,
    /// Adjusted per-capita expenditure.
    Expenditure,
}

impl Component {
    /// All components in canonical column order.
    pub const ALL: [Component; 4] = [
        Component::LifeExpectancy,
        Component::ExpectedSchooling,
        Component::MeanSchooling,
        Component::Expenditure,
    ];

    /// Canonical column name used in tables and model features.
    pub fn column(self) -> &'static str {
        match self {
            Component::LifeExpectancy => "UHH",
            Component::ExpectedSchooling => "HLS",
            Component::MeanSchooling => "RLS",
            Component::Expenditure => "Pengeluaran",
        }
    }

    /// Position in [`Component::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Looks up a component by column name, ignoring case and surrounding whitespace.
    pub fn from_column(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.column().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// The four component values of one region-year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Components {
    #[serde(rename = "UHH")]
    pub life_expectancy: f64,
    #[serde(rename = "HLS")]
    pub expected_schooling: f64,
    #[serde(rename = "RLS")]
    pub mean_schooling: f64,
    #[serde(rename = "Pengeluaran")]
    pub expenditure: f64,
}

impl Components {
    pub fn new(
        life_expectancy: f64,
        expected_schooling: f64,
        mean_schooling: f64,
        expenditure: f64,
    ) -> Self {
        Self {
            life_expectancy,
            expected_schooling,
            mean_schooling,
            expenditure,
        }
    }

    /// Builds a record by evaluating `f` for each component.
    pub fn from_fn(mut f: impl FnMut(Component) -> f64) -> Self {
        Self {
            life_expectancy: f(Component::LifeExpectancy),
            expected_schooling: f(Component::ExpectedSchooling),
            mean_schooling: f(Component::MeanSchooling),
            expenditure: f(Component::Expenditure),
        }
    }

    pub fn get(&self, component: Component) -> f64 {
        match component {
            Component::LifeExpectancy => self.life_expectancy,
            Component::ExpectedSchooling => self.expected_schooling,
            Component::MeanSchooling => self.mean_schooling,
            Component::Expenditure => self.expenditure,
        }
    }
}

/// Anything that can supply model features by column name.
///
/// The regression adapter asks for each required feature in training
/// order; `None` marks the feature as missing.
pub trait FeatureSource {
    fn feature(&self, name: &str) -> Option<f64>;
}

/// Resolves a canonical feature name against a year and component record.
fn year_component_feature(year: i32, components: &Components, name: &str) -> Option<f64> {
    if name.trim().eq_ignore_ascii_case(YEAR_COLUMN) {
        return Some(f64::from(year));
    }
    Component::from_column(name).map(|c| components.get(c))
}

/// One observed row: year, components, and the composite if it was supplied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub year: i32,
    pub components: Components,
    pub composite: Option<f64>,
}

impl Observation {
    pub fn new(year: i32, components: Components) -> Self {
        Self {
            year,
            components,
            composite: None,
        }
    }

    pub fn with_composite(mut self, composite: f64) -> Self {
        self.composite = Some(composite);
        self
    }
}

impl FeatureSource for Observation {
    fn feature(&self, name: &str) -> Option<f64> {
        year_component_feature(self.year, &self.components, name)
    }
}

/// Projected components for one future year, before scoring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedYear {
    pub year: i32,
    pub components: Components,
}

impl FeatureSource for ProjectedYear {
    fn feature(&self, name: &str) -> Option<f64> {
        year_component_feature(self.year, &self.components, name)
    }
}

/// One parsed table row with its optional region identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub region: Option<String>,
    pub observation: Observation,
}

/// Ordered yearly values of one component for one region.
///
/// Years are strictly increasing and at least one point exists.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentSeries {
    region: String,
    component: Component,
    points: Vec<(i32, f64)>,
}

impl ComponentSeries {
    /// Builds a series, sorting points by year.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientHistory` when `points` is empty and `ParseError`
    /// when a year appears more than once.
    pub fn new(
        region: impl Into<String>,
        component: Component,
        mut points: Vec<(i32, f64)>,
    ) -> Result<Self> {
        let region = region.into();
        if points.is_empty() {
            return Err(IpmError::InsufficientHistory {
                region,
                component: component.to_string(),
                observed: 0,
            });
        }
        points.sort_by_key(|&(year, _)| year);
        if let Some(w) = points.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(IpmError::parse(
                None,
                format!(
                    "region \"{region}\" has more than one {component} value for year {}",
                    w[0].0
                ),
            ));
        }
        Ok(Self {
            region,
            component,
            points,
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn component(&self) -> Component {
        self.component
    }

    pub fn points(&self) -> &[(i32, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false; a series holds at least one point.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> (i32, f64) {
        self.points[0]
    }

    pub fn last(&self) -> (i32, f64) {
        self.points[self.points.len() - 1]
    }

    pub(crate) fn insufficient(&self) -> IpmError {
        IpmError::InsufficientHistory {
            region: self.region.clone(),
            component: self.component.to_string(),
            observed: self.points.len(),
        }
    }
}

/// All observations of one region, sorted by year.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionSeries {
    region: String,
    observations: Vec<Observation>,
}

impl RegionSeries {
    /// Builds a region series, sorting observations by year.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientHistory` for an empty region and `ParseError`
    /// when a year appears more than once.
    pub fn new(region: impl Into<String>, mut observations: Vec<Observation>) -> Result<Self> {
        let region = region.into();
        if observations.is_empty() {
            return Err(IpmError::InsufficientHistory {
                region,
                component: YEAR_COLUMN.to_string(),
                observed: 0,
            });
        }
        observations.sort_by_key(|o| o.year);
        if let Some(w) = observations.windows(2).find(|w| w[0].year == w[1].year) {
            return Err(IpmError::parse(
                None,
                format!(
                    "region \"{region}\" has more than one row for year {}",
                    w[0].year
                ),
            ));
        }
        Ok(Self {
            region,
            observations,
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn last(&self) -> &Observation {
        &self.observations[self.observations.len() - 1]
    }

    pub fn last_year(&self) -> i32 {
        self.last().year
    }

    /// Extracts one component as its own series.
    pub fn component_series(&self, component: Component) -> ComponentSeries {
        ComponentSeries {
            region: self.region.clone(),
            component,
            points: self
                .observations
                .iter()
                .map(|o| (o.year, o.components.get(component)))
                .collect(),
        }
    }
}
