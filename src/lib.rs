//! Human Development Index (IPM) prediction and forecasting.
//!
//! Predicts the composite index from its four components with a
//! pre-trained model, extrapolates component series per region, and
//! scores the projected years.

#[cfg(feature = "api")]
pub mod api;
pub mod batch;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod forecast;
pub mod io;
/// Model artifact loading and the predictor wrapper.
pub mod model;
pub mod series;
