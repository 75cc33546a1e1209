//! CSV export for forecast results and mass predictions.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::forecast::ForecastRow;
use crate::io::table::RawTable;

/// Column header for forecast exports.
const HEADER: &str = "Cakupan,Tahun,UHH,HLS,RLS,Pengeluaran,IPM,predicted,origin";

/// Exports forecast rows to a CSV file at the given path.
///
/// Writes a header row followed by one data row per forecast row.
/// Produces deterministic output for identical inputs.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_forecast_csv(rows: &[ForecastRow], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_forecast_csv(rows, buf)
}

/// Writes forecast rows as CSV to any writer.
///
/// # Arguments
///
/// * `rows` - Actual and forecast rows in output order
/// * `writer` - Destination implementing `Write`
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_forecast_csv(rows: &[ForecastRow], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(','))?;

    for r in rows {
        let c = &r.components;
        wtr.write_record(&[
            r.region.clone(),
            r.year.to_string(),
            format!("{:.4}", c.life_expectancy),
            format!("{:.4}", c.expected_schooling),
            format!("{:.4}", c.mean_schooling),
            format!("{:.4}", c.expenditure),
            format!("{:.4}", r.composite),
            r.predicted.to_string(),
            r.origin.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes an uploaded table, including any appended columns, as CSV.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_table_csv(table: &RawTable, writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(table.headers())?;
    for row in table.rows() {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes an uploaded table to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_table_csv(table: &RawTable, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_table_csv(table, io::BufWriter::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::Origin;
    use crate::series::Components;

    fn make_row(year: i32, origin: Origin) -> ForecastRow {
        ForecastRow {
            region: "Kota Bandung".to_string(),
            year,
            components: Components::new(74.5, 14.1, 11.2, 17_500_000.0),
            composite: 81.25,
            predicted: origin == Origin::Forecast,
            origin,
        }
    }

    #[test]
    fn header_matches_schema() {
        let rows = vec![make_row(2022, Origin::Actual)];
        let mut buf = Vec::new();
        write_forecast_csv(&rows, &mut buf).ok();
        let output = String::from_utf8(buf).ok();
        let first_line = output.as_deref().unwrap_or("").lines().next().unwrap_or("");
        assert_eq!(first_line, HEADER);
    }

    #[test]
    fn row_count_matches_input() {
        let rows: Vec<ForecastRow> = (2020..2030).map(|y| make_row(y, Origin::Forecast)).collect();
        let mut buf = Vec::new();
        write_forecast_csv(&rows, &mut buf).ok();
        let output = String::from_utf8(buf).ok();
        let lines: Vec<&str> = output.as_deref().unwrap_or("").lines().collect();
        // 1 header + 10 data rows
        assert_eq!(lines.len(), 11);
    }

    #[test]
    fn data_row_uses_fixed_precision_and_tags() {
        let rows = vec![make_row(2031, Origin::Forecast)];
        let mut buf = Vec::new();
        write_forecast_csv(&rows, &mut buf).ok();
        let output = String::from_utf8(buf).unwrap_or_default();
        assert_eq!(
            output.lines().nth(1),
            Some("Kota Bandung,2031,74.5000,14.1000,11.2000,17500000.0000,81.2500,true,forecast")
        );
    }

    #[test]
    fn deterministic_output() {
        let rows: Vec<ForecastRow> = (0..5).map(|i| make_row(2020 + i, Origin::Actual)).collect();
        let mut buf1 = Vec::new();
        let mut buf2 = Vec::new();
        write_forecast_csv(&rows, &mut buf1).ok();
        write_forecast_csv(&rows, &mut buf2).ok();
        assert_eq!(buf1, buf2);
    }

    #[test]
    fn table_round_trip_keeps_cells() {
        let src = "Cakupan,Tahun,Catatan\n\"Kab. Aceh, Barat\",2020,x\n";
        let table = RawTable::from_reader(src.as_bytes(), b',').expect("table should read");
        let mut buf = Vec::new();
        write_table_csv(&table, &mut buf).ok();
        assert_eq!(String::from_utf8(buf).unwrap_or_default(), src);
    }
}
