//! API request and response types.
//!
//! Field names follow the column headers of the CSV exports.

use serde::{Deserialize, Serialize};

use crate::forecast::ForecastRow;
use crate::series::{Components, Observation};

/// Manual input for `POST /predict`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PredictRequest {
    #[serde(rename = "Tahun")]
    pub year: i32,
    #[serde(rename = "UHH")]
    pub life_expectancy: f64,
    #[serde(rename = "HLS")]
    pub expected_schooling: f64,
    #[serde(rename = "RLS")]
    pub mean_schooling: f64,
    #[serde(rename = "Pengeluaran")]
    pub expenditure: f64,
}

impl From<PredictRequest> for Observation {
    fn from(r: PredictRequest) -> Self {
        Observation::new(
            r.year,
            Components::new(
                r.life_expectancy,
                r.expected_schooling,
                r.mean_schooling,
                r.expenditure,
            ),
        )
    }
}

/// Query parameters for `GET /forecast`.
#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    /// Region name as it appears in the historical data.
    pub region: String,
    /// Years past the last observation; config default when absent.
    pub horizon: Option<u32>,
    /// `drift` or `growth`; config default when absent.
    pub method: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegionsResponse {
    pub regions: Vec<String>,
}

/// Actual and forecast rows for one region.
#[derive(Debug, Serialize)]
pub struct ForecastResponse {
    pub region: String,
    pub horizon: u32,
    pub method: &'static str,
    pub rows: Vec<ForecastRow>,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
    /// Stable error kind, e.g. `UnknownRegion`.
    pub kind: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_request_uses_column_names() {
        let json = r#"{"Tahun":2024,"UHH":73.5,"HLS":13.1,"RLS":9.2,"Pengeluaran":12000000}"#;
        let req: PredictRequest = serde_json::from_str(json).expect("valid request");
        let obs = Observation::from(req);
        assert_eq!(obs.year, 2024);
        assert_eq!(obs.components.mean_schooling, 9.2);
        assert_eq!(obs.composite, None);
    }

    #[test]
    fn predict_request_rejects_unknown_fields() {
        let json = r#"{"Tahun":2024,"UHH":73.5,"HLS":13.1,"RLS":9.2,"Pengeluaran":1,"IPM":70}"#;
        assert!(serde_json::from_str::<PredictRequest>(json).is_err());
    }

    #[test]
    fn forecast_row_serializes_with_column_names() {
        let row = ForecastRow {
            region: "Aceh".to_string(),
            year: 2025,
            components: Components::new(71.0, 14.0, 9.5, 10_500.0),
            composite: 72.25,
            predicted: true,
            origin: crate::forecast::Origin::Forecast,
        };
        let json = serde_json::to_value(&row).expect("serializable");
        assert_eq!(json["Cakupan"], "Aceh");
        assert_eq!(json["Tahun"], 2025);
        assert_eq!(json["UHH"], 71.0);
        assert_eq!(json["IPM"], 72.25);
        assert_eq!(json["origin"], "forecast");
    }
}
