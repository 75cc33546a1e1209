use std::env;
use std::path::PathBuf;

use crate::batch::ForecastTarget;
use crate::forecast::Extrapolator;
use crate::series::{Components, MAX_YEAR, MIN_YEAR, Observation};

#[derive(Debug)]
pub struct CliOptions {
    pub config: Option<PathBuf>,
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Score one manually entered observation.
    Predict(Observation),
    /// Extrapolate one historical region.
    Forecast {
        region: String,
        horizon: Option<u32>,
        method: Option<Extrapolator>,
        out: Option<PathBuf>,
    },
    /// Forecast every region of an uploaded table, or the historical data.
    Batch {
        input: Option<PathBuf>,
        target: Option<ForecastTarget>,
        method: Option<Extrapolator>,
        out: Option<PathBuf>,
    },
    /// Append predicted composites to an uploaded table.
    Fill { input: PathBuf, out: Option<PathBuf> },
    /// National yearly means and region list.
    Summary,
    #[cfg(feature = "api")]
    Serve { port: u16 },
    Help,
}

pub fn parse_args() -> Result<CliOptions, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_args_from(&args)
}

fn parse_args_from(args: &[String]) -> Result<CliOptions, String> {
    let mut config = None;
    let mut rest = args;
    while let Some(first) = rest.first() {
        match first.as_str() {
            "--config" => {
                let path = rest.next_or_err(1, "missing value for --config (expected a TOML path)")?;
                if config.replace(PathBuf::from(path)).is_some() {
                    return Err("--config provided more than once".to_string());
                }
                rest = &rest[2..];
            }
            "--help" | "-h" => {
                return Ok(CliOptions {
                    config,
                    command: Command::Help,
                });
            }
            _ => break,
        }
    }

    let (name, options) = rest
        .split_first()
        .ok_or_else(|| "missing command (try --help)".to_string())?;
    let command = match name.as_str() {
        "predict" => parse_predict(options)?,
        "forecast" => parse_forecast(options)?,
        "batch" => parse_batch(options)?,
        "fill" => parse_fill(options)?,
        "summary" => {
            if let Some(extra) = options.first() {
                return Err(format!("unknown argument: {extra}"));
            }
            Command::Summary
        }
        #[cfg(feature = "api")]
        "serve" => parse_serve(options)?,
        "help" => Command::Help,
        other => return Err(format!("unknown command: {other}")),
    };
    Ok(CliOptions { config, command })
}

/// Walks `--flag value` pairs, handing each to `apply`.
fn for_each_flag(
    args: &[String],
    mut apply: impl FnMut(&str, &str) -> Result<(), String>,
) -> Result<(), String> {
    let mut i = 0usize;
    while i < args.len() {
        let flag = args[i].as_str();
        if !flag.starts_with("--") {
            return Err(format!("unknown argument: {flag}"));
        }
        let value = args.next_or_err(i + 1, &format!("missing value for {flag}"))?;
        apply(flag, value)?;
        i += 2;
    }
    Ok(())
}

fn set_once<T>(slot: &mut Option<T>, flag: &str, value: T) -> Result<(), String> {
    if slot.replace(value).is_some() {
        return Err(format!("{flag} provided more than once"));
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("{flag} value \"{value}\" is not a valid number"))
}

fn parse_method(value: &str) -> Result<Extrapolator, String> {
    value.parse()
}

fn parse_predict(args: &[String]) -> Result<Command, String> {
    let mut year: Option<i32> = None;
    let mut values: [Option<f64>; 4] = [None; 4];
    for_each_flag(args, |flag, value| match flag {
        "--tahun" => set_once(&mut year, flag, parse_number(flag, value)?),
        "--uhh" => set_once(&mut values[0], flag, parse_number(flag, value)?),
        "--hls" => set_once(&mut values[1], flag, parse_number(flag, value)?),
        "--rls" => set_once(&mut values[2], flag, parse_number(flag, value)?),
        "--pengeluaran" => set_once(&mut values[3], flag, parse_number(flag, value)?),
        other => Err(format!("unknown argument: {other}")),
    })?;

    let names = ["--uhh", "--hls", "--rls", "--pengeluaran"];
    let mut missing: Vec<&str> = Vec::new();
    if year.is_none() {
        missing.push("--tahun");
    }
    missing.extend(
        names
            .iter()
            .zip(values.iter())
            .filter(|(_, v)| v.is_none())
            .map(|(n, _)| *n),
    );
    if !missing.is_empty() {
        return Err(format!("predict requires {}", missing.join(", ")));
    }

    let [uhh, hls, rls, pengeluaran] = values.map(|v| v.unwrap_or_default());
    Ok(Command::Predict(Observation::new(
        year.unwrap_or_default(),
        Components::new(uhh, hls, rls, pengeluaran),
    )))
}

fn parse_forecast(args: &[String]) -> Result<Command, String> {
    let mut region = None;
    let mut horizon: Option<u32> = None;
    let mut method = None;
    let mut out = None;
    for_each_flag(args, |flag, value| match flag {
        "--region" => set_once(&mut region, flag, value.to_string()),
        "--horizon" => set_once(&mut horizon, flag, parse_number(flag, value)?),
        "--method" => set_once(&mut method, flag, parse_method(value)?),
        "--out" => set_once(&mut out, flag, PathBuf::from(value)),
        other => Err(format!("unknown argument: {other}")),
    })?;
    let region = region.ok_or_else(|| "forecast requires --region".to_string())?;
    Ok(Command::Forecast {
        region,
        horizon,
        method,
        out,
    })
}

fn parse_batch(args: &[String]) -> Result<Command, String> {
    let mut input = None;
    let mut year: Option<i32> = None;
    let mut horizon: Option<u32> = None;
    let mut method = None;
    let mut out = None;
    for_each_flag(args, |flag, value| match flag {
        "--input" => set_once(&mut input, flag, PathBuf::from(value)),
        "--target-year" => set_once(&mut year, flag, parse_number(flag, value)?),
        "--horizon" => set_once(&mut horizon, flag, parse_number(flag, value)?),
        "--method" => set_once(&mut method, flag, parse_method(value)?),
        "--out" => set_once(&mut out, flag, PathBuf::from(value)),
        other => Err(format!("unknown argument: {other}")),
    })?;
    let target = match (year, horizon) {
        (Some(_), Some(_)) => {
            return Err(
                "arguments `--target-year` and `--horizon` are mutually exclusive; choose one"
                    .to_string(),
            );
        }
        (Some(y), None) if !(MIN_YEAR..=MAX_YEAR).contains(&y) => {
            return Err(format!(
                "--target-year must be in [{MIN_YEAR}, {MAX_YEAR}], got {y}"
            ));
        }
        (Some(y), None) => Some(ForecastTarget::Year(y)),
        (None, Some(h)) => Some(ForecastTarget::Horizon(h)),
        (None, None) => None,
    };
    Ok(Command::Batch {
        input,
        target,
        method,
        out,
    })
}

fn parse_fill(args: &[String]) -> Result<Command, String> {
    let mut input = None;
    let mut out = None;
    for_each_flag(args, |flag, value| match flag {
        "--input" => set_once(&mut input, flag, PathBuf::from(value)),
        "--out" => set_once(&mut out, flag, PathBuf::from(value)),
        other => Err(format!("unknown argument: {other}")),
    })?;
    let input = input.ok_or_else(|| "fill requires --input".to_string())?;
    Ok(Command::Fill { input, out })
}

#[cfg(feature = "api")]
fn parse_serve(args: &[String]) -> Result<Command, String> {
    let mut port: Option<u16> = None;
    for_each_flag(args, |flag, value| match flag {
        "--port" => set_once(&mut port, flag, parse_number(flag, value)?),
        other => Err(format!("unknown argument: {other}")),
    })?;
    Ok(Command::Serve {
        port: port.unwrap_or(3000),
    })
}

trait SliceArgExt {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String>;
}

impl SliceArgExt for [String] {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String> {
        self.get(index)
            .map(String::as_str)
            .ok_or_else(|| err.to_string())
    }
}

pub fn print_usage() {
    eprintln!("ipm-forecast: Human Development Index prediction and forecasting");
    eprintln!();
    eprintln!("Usage: ipm-forecast [--config <path>] <command> [options]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  predict --tahun <y> --uhh <v> --hls <v> --rls <v> --pengeluaran <v>");
    eprintln!("  forecast --region <name> [--horizon <n>] [--method drift|growth] [--out <csv>]");
    eprintln!(
        "  batch [--input <csv>] [--target-year <y> | --horizon <n>] [--method drift|growth] [--out <csv>]"
    );
    eprintln!("  fill --input <csv> [--out <csv>]");
    eprintln!("  summary");
    #[cfg(feature = "api")]
    eprintln!("  serve [--port <u16>]");
    eprintln!();
    eprintln!("Without --input, batch forecasts the historical dataset.");
    eprintln!("Uploads default to `,` decimals; if numbers are unquoted, set");
    eprintln!("delimiter = \";\" under [upload] in the config file.");
    eprintln!("Set RUST_LOG (e.g. RUST_LOG=debug) to control log output.");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_predict_command() {
        let opts = parse_args_from(&args(&[
            "predict",
            "--tahun",
            "2024",
            "--uhh",
            "73.5",
            "--hls",
            "13.1",
            "--rls",
            "9.2",
            "--pengeluaran",
            "12000000",
        ]))
        .expect("parse should succeed");
        let Command::Predict(obs) = opts.command else {
            panic!("expected predict command");
        };
        assert_eq!(obs.year, 2024);
        assert_eq!(obs.components.life_expectancy, 73.5);
        assert_eq!(obs.components.expenditure, 12_000_000.0);
    }

    #[test]
    fn predict_reports_every_missing_flag() {
        let err = parse_args_from(&args(&["predict", "--uhh", "70"])).unwrap_err();
        assert_eq!(err, "predict requires --tahun, --hls, --rls, --pengeluaran");
    }

    #[test]
    fn config_precedes_command() {
        let opts = parse_args_from(&args(&["--config", "ipm.toml", "summary"]))
            .expect("parse should succeed");
        assert_eq!(
            opts.config.as_deref().and_then(|p| p.to_str()),
            Some("ipm.toml")
        );
        assert_eq!(opts.command, Command::Summary);
    }

    #[test]
    fn parses_forecast_options() {
        let opts = parse_args_from(&args(&[
            "forecast",
            "--region",
            "Kota Bandung",
            "--horizon",
            "7",
            "--method",
            "growth",
        ]))
        .expect("parse should succeed");
        assert_eq!(
            opts.command,
            Command::Forecast {
                region: "Kota Bandung".to_string(),
                horizon: Some(7),
                method: Some(Extrapolator::GrowthMeanDiff),
                out: None,
            }
        );
    }

    #[test]
    fn forecast_requires_region() {
        assert!(parse_args_from(&args(&["forecast", "--horizon", "3"])).is_err());
    }

    #[test]
    fn batch_target_flags_are_exclusive() {
        let err = parse_args_from(&args(&[
            "batch",
            "--target-year",
            "2030",
            "--horizon",
            "3",
        ]))
        .unwrap_err();
        assert!(err.contains("mutually exclusive"));

        let opts = parse_args_from(&args(&["batch", "--input", "up.csv", "--target-year", "2030"]))
            .expect("parse should succeed");
        assert!(matches!(
            opts.command,
            Command::Batch {
                target: Some(ForecastTarget::Year(2030)),
                ..
            }
        ));
    }

    #[test]
    fn batch_target_year_out_of_range_is_rejected() {
        for year in ["2147483647", "-3", "1899", "2101"] {
            let err = parse_args_from(&args(&["batch", "--target-year", year])).unwrap_err();
            assert!(err.starts_with("--target-year must be in"), "{year}: {err}");
        }
        assert!(parse_args_from(&args(&["batch", "--target-year", "2100"])).is_ok());
    }

    #[test]
    fn rejects_bad_values_and_unknown_input() {
        assert!(parse_args_from(&args(&["forecast", "--region", "A", "--horizon", "x"])).is_err());
        assert!(parse_args_from(&args(&["forecast", "--region", "A", "--method", "arima"])).is_err());
        assert!(parse_args_from(&args(&["launch"])).is_err());
        assert!(parse_args_from(&args(&["summary", "--verbose"])).is_err());
        assert!(parse_args_from(&args(&["fill", "--input"])).is_err());
        assert!(parse_args_from(&args(&[])).is_err());
    }

    #[test]
    fn repeated_flag_is_rejected() {
        let err = parse_args_from(&args(&["fill", "--input", "a.csv", "--input", "b.csv"]))
            .unwrap_err();
        assert_eq!(err, "--input provided more than once");
    }

    #[test]
    fn help_flag() {
        let opts = parse_args_from(&args(&["--help"])).expect("parse should succeed");
        assert_eq!(opts.command, Command::Help);
    }
}
