//! Error kinds surfaced by prediction and forecasting operations.

use thiserror::Error;

/// Errors raised by one prediction or forecasting invocation.
///
/// Every variant carries the offending identifiers (column names, region,
/// line number) so callers can report them without exposing the underlying
/// I/O or parser error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IpmError {
    /// The regression model artifact is missing or could not be decoded.
    #[error("model unavailable: {reason}")]
    ModelUnavailable { reason: String },

    /// The historical dataset is missing or could not be read.
    #[error("historical data unavailable: {reason}")]
    DataUnavailable { reason: String },

    /// One or more required feature columns are absent.
    #[error("missing required columns: [{}]", .missing.join(", "))]
    SchemaError { missing: Vec<String> },

    /// A component series is too short to extrapolate.
    #[error(
        "region \"{region}\": {component} needs at least 2 observed years to extrapolate, got {observed}"
    )]
    InsufficientHistory {
        region: String,
        component: String,
        observed: usize,
    },

    /// A table or value could not be parsed.
    #[error("parse error{}: {message}", line_suffix(.line))]
    ParseError { line: Option<u64>, message: String },

    /// The requested region does not exist in the loaded data.
    #[error("unknown region \"{region}\"")]
    UnknownRegion { region: String },

    /// A manually entered value is outside its accepted range.
    #[error("invalid input for {field}: {message}")]
    InvalidInput { field: String, message: String },
}

impl IpmError {
    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ModelUnavailable { .. } => "ModelUnavailable",
            Self::DataUnavailable { .. } => "DataUnavailable",
            Self::SchemaError { .. } => "SchemaError",
            Self::InsufficientHistory { .. } => "InsufficientHistory",
            Self::ParseError { .. } => "ParseError",
            Self::UnknownRegion { .. } => "UnknownRegion",
            Self::InvalidInput { .. } => "InvalidInput",
        }
    }

    pub(crate) fn parse(line: Option<u64>, message: impl Into<String>) -> Self {
        Self::ParseError {
            line,
            message: message.into(),
        }
    }
}

fn line_suffix(line: &Option<u64>) -> String {
    line.map(|l| format!(" at line {l}")).unwrap_or_default()
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, IpmError>;
