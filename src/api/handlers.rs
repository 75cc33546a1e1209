//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::AppState;
use super::types::{ErrorResponse, ForecastQuery, ForecastResponse, PredictRequest, RegionsResponse};
use crate::config::MAX_HORIZON;
use crate::dashboard::{Prediction, YearSummary};
use crate::error::IpmError;
use crate::forecast::Extrapolator;

/// Handler error rendered as `{ "error", "kind" }` JSON.
pub struct ApiError(IpmError);

impl From<IpmError> for ApiError {
    fn from(e: IpmError) -> Self {
        Self(e)
    }
}

fn status_for(err: &IpmError) -> StatusCode {
    match err {
        IpmError::InvalidInput { .. } | IpmError::ParseError { .. } => StatusCode::BAD_REQUEST,
        IpmError::UnknownRegion { .. } => StatusCode::NOT_FOUND,
        IpmError::SchemaError { .. } | IpmError::InsufficientHistory { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        IpmError::ModelUnavailable { .. } | IpmError::DataUnavailable { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.0.to_string(),
            kind: self.0.kind(),
        };
        (status_for(&self.0), Json(body)).into_response()
    }
}

/// `GET /regions` → 200 + sorted region names
pub async fn get_regions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RegionsResponse>, ApiError> {
    let regions = state.dashboard.regions()?;
    Ok(Json(RegionsResponse { regions }))
}

/// `GET /summary` → 200 + `Vec<YearSummary>`
pub async fn get_summary(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<YearSummary>>, ApiError> {
    Ok(Json(state.dashboard.national_summary()?))
}

/// Returns actual and forecast rows for one region.
///
/// `GET /forecast?region=Aceh&horizon=5&method=growth` → 200 + `ForecastResponse`
/// `GET /forecast?region=Aceh&horizon=99` → 400
/// `GET /forecast?region=Nowhere` → 404
pub async fn get_forecast(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ForecastQuery>,
) -> Result<Json<ForecastResponse>, ApiError> {
    let horizon = query.horizon.unwrap_or(state.config.forecast.horizon);
    if horizon == 0 || horizon > MAX_HORIZON {
        return Err(IpmError::InvalidInput {
            field: "horizon".to_string(),
            message: format!("must be in [1, {MAX_HORIZON}], got {horizon}"),
        }
        .into());
    }
    let method = match query.method.as_deref() {
        Some(name) => name
            .parse::<Extrapolator>()
            .map_err(|message| IpmError::InvalidInput {
                field: "method".to_string(),
                message,
            })?,
        None => state.config.forecast.extrapolator(),
    };

    let rows = state
        .dashboard
        .forecast_region(&query.region, horizon, method)?;
    Ok(Json(ForecastResponse {
        region: query.region,
        horizon,
        method: method.name(),
        rows,
    }))
}

/// `POST /predict` with a `PredictRequest` body → 200 + `Prediction`
pub async fn post_predict(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<Prediction>, ApiError> {
    let prediction = state.dashboard.predict_single(&request.into())?;
    Ok(Json(prediction))
}
