//! TOML-based application configuration.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::batch::ForecastTarget;
use crate::forecast::Extrapolator;
use crate::io::table::NumberFormat;
use crate::series::{MAX_YEAR, MIN_YEAR};

/// Longest projection the forecast views accept.
pub const MAX_HORIZON: u32 = 15;

/// Top-level configuration parsed from TOML.
///
/// All fields have defaults. Load from TOML with
/// [`AppConfig::from_toml_file`] or use [`AppConfig::default`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Model artifact and historical dataset locations.
    #[serde(default)]
    pub paths: PathsConfig,
    /// Default forecasting parameters.
    #[serde(default)]
    pub forecast: ForecastConfig,
    /// Format of user-uploaded tables.
    #[serde(default = "TableFormatConfig::upload")]
    pub upload: TableFormatConfig,
    /// Format of the historical dataset.
    #[serde(default)]
    pub history: TableFormatConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            forecast: ForecastConfig::default(),
            upload: TableFormatConfig::upload(),
            history: TableFormatConfig::default(),
        }
    }
}

/// Model artifact and historical dataset locations.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// JSON model artifact.
    pub model: PathBuf,
    /// Historical dataset CSV.
    pub history: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            model: PathBuf::from("model_ipm.json"),
            history: PathBuf::from("data_ipm.csv"),
        }
    }
}

/// Default forecasting parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForecastConfig {
    /// Extrapolation method: `"drift"` or `"growth"`.
    pub method: String,
    /// Years to project past the last observation (1..=15).
    pub horizon: u32,
    /// Calendar year to project through; overrides `horizon` for batches.
    pub target_year: Option<i32>,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            method: "drift".to_string(),
            horizon: 5,
            target_year: None,
        }
    }
}

impl ForecastConfig {
    /// Parsed method, falling back to drift for invalid names.
    ///
    /// Call [`AppConfig::validate`] first to reject invalid names.
    pub fn extrapolator(&self) -> Extrapolator {
        self.method.parse().unwrap_or_default()
    }

    /// Batch target: `target_year` when set, else `horizon`.
    pub fn target(&self) -> ForecastTarget {
        match self.target_year {
            Some(year) => ForecastTarget::Year(year),
            None => ForecastTarget::Horizon(self.horizon),
        }
    }
}

/// Delimiter and number separators of a CSV table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableFormatConfig {
    /// Field delimiter (one ASCII character).
    pub delimiter: String,
    /// Decimal separator (one character).
    pub decimal: String,
    /// Thousands separator (one character, or empty for none).
    pub thousands: String,
}

impl Default for TableFormatConfig {
    fn default() -> Self {
        Self {
            delimiter: ",".to_string(),
            decimal: ".".to_string(),
            thousands: String::new(),
        }
    }
}

impl TableFormatConfig {
    /// Upload default: comma decimals and dot thousands.
    pub fn upload() -> Self {
        Self {
            delimiter: ",".to_string(),
            decimal: ",".to_string(),
            thousands: ".".to_string(),
        }
    }

    /// Delimiter byte; `,` if the setting is invalid.
    pub fn delimiter_byte(&self) -> u8 {
        single_char(&self.delimiter)
            .filter(char::is_ascii)
            .map_or(b',', |c| c as u8)
    }

    /// Number format; standard if the separators are invalid.
    pub fn number_format(&self) -> NumberFormat {
        NumberFormat {
            decimal: single_char(&self.decimal).unwrap_or('.'),
            thousands: single_char(&self.thousands),
        }
    }

    /// True when an unquoted decimal number would split across columns.
    pub fn delimiter_is_decimal(&self) -> bool {
        self.delimiter == self.decimal
    }

    fn validate(&self, section: &str, errors: &mut Vec<ConfigError>) {
        if single_char(&self.delimiter).is_none_or(|c| !c.is_ascii()) {
            errors.push(ConfigError {
                field: format!("{section}.delimiter"),
                message: format!("must be one ASCII character, got \"{}\"", self.delimiter),
            });
        }
        if single_char(&self.decimal).is_none() {
            errors.push(ConfigError {
                field: format!("{section}.decimal"),
                message: format!("must be one character, got \"{}\"", self.decimal),
            });
        }
        if !self.thousands.is_empty() && single_char(&self.thousands).is_none() {
            errors.push(ConfigError {
                field: format!("{section}.thousands"),
                message: format!("must be empty or one character, got \"{}\"", self.thousands),
            });
        }
        if self.thousands == self.decimal {
            errors.push(ConfigError {
                field: format!("{section}.thousands"),
                message: "must differ from the decimal separator".into(),
            });
        }
    }
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"forecast.horizon"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl AppConfig {
    /// Parses a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "config".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let f = &self.forecast;

        if f.method.parse::<Extrapolator>().is_err() {
            errors.push(ConfigError {
                field: "forecast.method".into(),
                message: format!(
                    "must be one of {}, got \"{}\"",
                    Extrapolator::NAMES.join(", "),
                    f.method
                ),
            });
        }
        if f.horizon == 0 || f.horizon > MAX_HORIZON {
            errors.push(ConfigError {
                field: "forecast.horizon".into(),
                message: format!("must be in [1, {MAX_HORIZON}]"),
            });
        }

        if let Some(year) = f
            .target_year
            .filter(|y| !(MIN_YEAR..=MAX_YEAR).contains(y))
        {
            errors.push(ConfigError {
                field: "forecast.target_year".into(),
                message: format!("must be in [{MIN_YEAR}, {MAX_YEAR}], got {year}"),
            });
        }

        self.upload.validate("upload", &mut errors);
        self.history.validate("history", &mut errors);

        errors
    }

    /// Settings that load but are likely to misread files.
    ///
    /// A table whose delimiter equals its decimal separator only parses
    /// when every decimal number is quoted.
    pub fn warnings(&self) -> Vec<ConfigError> {
        [("upload", &self.upload), ("history", &self.history)]
            .into_iter()
            .filter(|(_, t)| t.delimiter_is_decimal())
            .map(|(section, t)| ConfigError {
                field: format!("{section}.delimiter"),
                message: format!(
                    "\"{}\" is also the decimal separator; quote decimal values or set delimiter = \";\"",
                    t.delimiter
                ),
            })
            .collect()
    }
}
