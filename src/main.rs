//! IPM forecaster entry point: CLI wiring and config-driven dashboard construction.

use std::fs::File;
use std::io;
use std::path::Path;
use std::process;

use tracing::warn;
use tracing_subscriber::EnvFilter;

use ipm_forecast::batch::ForecastTarget;
use ipm_forecast::cli::{self, Command};
use ipm_forecast::config::{AppConfig, MAX_HORIZON};
use ipm_forecast::dashboard::Dashboard;
use ipm_forecast::forecast::ForecastRow;
use ipm_forecast::io::export::{
    export_forecast_csv, export_table_csv, write_forecast_csv, write_table_csv,
};
use ipm_forecast::io::table::RawTable;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn check_horizon(horizon: u32) -> Result<u32, String> {
    if horizon == 0 || horizon > MAX_HORIZON {
        return Err(format!("--horizon must be in [1, {MAX_HORIZON}], got {horizon}"));
    }
    Ok(horizon)
}

/// Writes forecast rows to `out`, or to stdout when no path is given.
fn emit_rows(rows: &[ForecastRow], out: Option<&Path>) -> Result<(), String> {
    match out {
        Some(path) => {
            export_forecast_csv(rows, path)
                .map_err(|e| format!("failed to write CSV: {e}"))?;
            eprintln!("Forecast written to {}", path.display());
            Ok(())
        }
        None => write_forecast_csv(rows, io::stdout().lock())
            .map_err(|e| format!("failed to write CSV: {e}")),
    }
}

fn open_input(path: &Path) -> Result<File, String> {
    File::open(path).map_err(|e| format!("cannot read \"{}\": {e}", path.display()))
}

fn run(command: Command, config: AppConfig, dashboard: Dashboard) -> Result<(), String> {
    match command {
        Command::Predict(input) => {
            let prediction = dashboard
                .predict_single(&input)
                .map_err(|e| e.to_string())?;
            println!("IPM: {:.2} ({})", prediction.ipm, prediction.status);
        }
        Command::Forecast {
            region,
            horizon,
            method,
            out,
        } => {
            let horizon = check_horizon(horizon.unwrap_or(config.forecast.horizon))?;
            let method = method.unwrap_or_else(|| config.forecast.extrapolator());
            let rows = dashboard
                .forecast_region(&region, horizon, method)
                .map_err(|e| e.to_string())?;
            emit_rows(&rows, out.as_deref())?;
        }
        Command::Batch {
            input,
            target,
            method,
            out,
        } => {
            let target = target.unwrap_or_else(|| config.forecast.target());
            if let ForecastTarget::Horizon(h) = target {
                check_horizon(h)?;
            }
            let method = method.unwrap_or_else(|| config.forecast.extrapolator());
            let outcome = match input {
                Some(path) => {
                    let records = dashboard
                        .parse_upload(open_input(&path)?)
                        .map_err(|e| e.to_string())?;
                    dashboard.forecast_records(&records, target, method)
                }
                None => dashboard.forecast_history(target, method),
            }
            .map_err(|e| e.to_string())?;
            for skipped in &outcome.skipped {
                eprintln!("skipped: {skipped}");
            }
            emit_rows(&outcome.rows, out.as_deref())?;
        }
        Command::Fill { input, out } => {
            let (_, delimiter) = dashboard.upload_format();
            let table = RawTable::from_reader(open_input(&input)?, delimiter)
                .map_err(|e| e.to_string())?;
            let filled = dashboard
                .fill_predictions(&table)
                .map_err(|e| e.to_string())?;
            match out {
                Some(path) => {
                    export_table_csv(&filled, &path)
                        .map_err(|e| format!("failed to write CSV: {e}"))?;
                    eprintln!("Predictions written to {}", path.display());
                }
                None => write_table_csv(&filled, io::stdout().lock())
                    .map_err(|e| format!("failed to write CSV: {e}"))?,
            }
        }
        Command::Summary => {
            let regions = dashboard.regions().map_err(|e| e.to_string())?;
            let summary = dashboard.national_summary().map_err(|e| e.to_string())?;
            println!("Regions: {}", regions.len());
            for year in &summary {
                println!(
                    "{}  IPM {:.2}  ({} regions)",
                    year.year, year.mean_ipm, year.regions
                );
            }
        }
        #[cfg(feature = "api")]
        Command::Serve { port } => {
            use std::net::SocketAddr;
            use std::sync::Arc;

            let addr = SocketAddr::from(([0, 0, 0, 0], port));
            let rt = tokio::runtime::Runtime::new()
                .map_err(|e| format!("failed to create tokio runtime: {e}"))?;
            let state = Arc::new(ipm_forecast::api::AppState { dashboard, config });
            rt.block_on(ipm_forecast::api::serve(state, addr))
                .map_err(|e| format!("server error: {e}"))?;
        }
        Command::Help => cli::print_usage(),
    }
    Ok(())
}

fn main() {
    init_logging();

    let opts = match cli::parse_args() {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("error: {e}");
            cli::print_usage();
            process::exit(1);
        }
    };
    if opts.command == Command::Help {
        cli::print_usage();
        return;
    }

    let config = match opts.config {
        Some(ref path) => match AppConfig::from_toml_file(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        },
        None => AppConfig::default(),
    };

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }
    for w in config.warnings() {
        warn!(field = %w.field, "{}", w.message);
    }

    let dashboard = Dashboard::open(&config);

    if let Err(e) = run(opts.command, config, dashboard) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
