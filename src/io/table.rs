//! CSV ingestion with locale-aware number parsing.
//!
//! Tables are read as strings, checked against the required column set,
//! and only then parsed into typed [`Record`]s or feature rows.

use std::io::Read;

use csv::{ReaderBuilder, Trim};

use crate::error::{IpmError, Result};
use crate::series::{
    COMPOSITE_COLUMN, Component, Components, FeatureSource, MAX_YEAR, MIN_YEAR, Observation,
    REGION_COLUMN, Record, YEAR_COLUMN,
};

/// Decimal and thousands separators used by a table's numeric cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberFormat {
    pub decimal: char,
    pub thousands: Option<char>,
}

impl NumberFormat {
    /// Plain `1234.5` numbers.
    pub const STANDARD: NumberFormat = NumberFormat {
        decimal: '.',
        thousands: None,
    };

    /// `1.234,5` numbers.
    pub const INDONESIAN: NumberFormat = NumberFormat {
        decimal: ',',
        thousands: Some('.'),
    };

    /// Parses a cell; `None` for blanks and malformed numbers.
    pub fn parse(&self, raw: &str) -> Option<f64> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let normalized: String = raw
            .chars()
            .filter(|&c| Some(c) != self.thousands)
            .map(|c| if c == self.decimal { '.' } else { c })
            .collect();
        normalized.parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Feature values of one uploaded row, looked up by column name.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow(Vec<(String, f64)>);

impl FeatureSource for FeatureRow {
    fn feature(&self, name: &str) -> Option<f64> {
        let name = name.trim();
        self.0
            .iter()
            .find(|(column, _)| column.eq_ignore_ascii_case(name))
            .map(|&(_, value)| value)
    }
}

/// An uploaded table kept as raw cells.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    lines: Vec<u64>,
}

impl RawTable {
    /// Reads a delimited table with a header row.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` for malformed CSV, ragged rows, or a missing header.
    pub fn from_reader(reader: impl Read, delimiter: u8) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| csv_error(e, delimiter))?
            .iter()
            .map(str::to_string)
            .collect();
        if headers.iter().all(String::is_empty) {
            return Err(IpmError::parse(Some(1), "table has no header row"));
        }

        let mut rows = Vec::new();
        let mut lines = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| csv_error(e, delimiter))?;
            lines.push(record.position().map_or(0, |p| p.line()));
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self {
            headers,
            rows,
            lines,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column, matched case-insensitively.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    }

    /// Resolves every named column or reports all missing ones.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` listing missing names in the order given.
    pub fn require_columns<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<usize>> {
        let mut indices = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match self.column_index(name.as_ref()) {
                Some(i) => indices.push(i),
                None => missing.push(name.as_ref().to_string()),
            }
        }
        if missing.is_empty() {
            Ok(indices)
        } else {
            Err(IpmError::SchemaError { missing })
        }
    }

    fn number(&self, row: usize, col: usize, format: NumberFormat) -> Result<f64> {
        let cell = &self.rows[row][col];
        format.parse(cell).ok_or_else(|| {
            IpmError::parse(
                Some(self.lines[row]),
                format!("column {} has non-numeric value \"{cell}\"", self.headers[col]),
            )
        })
    }

    /// Parses the named feature columns of every row.
    ///
    /// Columns are checked before any cell is parsed.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` for absent columns and `ParseError` for bad cells.
    pub fn feature_rows(&self, names: &[String], format: NumberFormat) -> Result<Vec<FeatureRow>> {
        let indices = self.require_columns(names)?;
        (0..self.rows.len())
            .map(|row| -> Result<FeatureRow> {
                let values = names
                    .iter()
                    .zip(&indices)
                    .map(|(name, &col)| -> Result<(String, f64)> {
                        Ok((name.clone(), self.number(row, col, format)?))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(FeatureRow(values))
            })
            .collect()
    }

    /// Parses rows into typed records.
    ///
    /// Year and the four components are required. The region and composite
    /// columns are optional; blank composite cells mean "not supplied".
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` for absent required columns and `ParseError`
    /// for bad cells, fractional or out-of-range years, or blank region
    /// identifiers.
    pub fn records(&self, format: NumberFormat) -> Result<Vec<Record>> {
        let mut required = vec![YEAR_COLUMN];
        required.extend(Component::ALL.iter().map(|c| c.column()));
        let indices = self.require_columns(&required)?;
        let year_col = indices[0];
        let component_cols = &indices[1..];
        let region_col = self.column_index(REGION_COLUMN);
        let composite_col = self.column_index(COMPOSITE_COLUMN);

        let mut records = Vec::with_capacity(self.rows.len());
        for row in 0..self.rows.len() {
            let line = Some(self.lines[row]);
            let year = self.number(row, year_col, format)?;
            if year.fract() != 0.0 {
                return Err(IpmError::parse(line, format!("invalid year {year}")));
            }
            if year < f64::from(MIN_YEAR) || year > f64::from(MAX_YEAR) {
                return Err(IpmError::parse(
                    line,
                    format!("year {year} outside [{MIN_YEAR}, {MAX_YEAR}]"),
                ));
            }

            let mut values = [0.0; 4];
            for (slot, &col) in values.iter_mut().zip(component_cols) {
                *slot = self.number(row, col, format)?;
            }
            let components = Components::from_fn(|c| values[c.index()]);

            let composite = match composite_col {
                Some(col) if !self.rows[row][col].trim().is_empty() => {
                    Some(self.number(row, col, format)?)
                }
                _ => None,
            };

            let region = match region_col {
                Some(col) => {
                    let name = self.rows[row][col].trim();
                    if name.is_empty() {
                        return Err(IpmError::parse(line, "blank region identifier"));
                    }
                    Some(name.to_string())
                }
                None => None,
            };

            records.push(Record {
                region,
                observation: Observation {
                    year: year as i32,
                    components,
                    composite,
                },
            });
        }
        Ok(records)
    }

    /// Returns a copy of the table with one column appended.
    pub fn with_column(&self, name: &str, values: &[String]) -> Self {
        let mut headers = self.headers.clone();
        headers.push(name.to_string());
        let rows = self
            .rows
            .iter()
            .zip(values)
            .map(|(row, value)| {
                let mut row = row.clone();
                row.push(value.clone());
                row
            })
            .collect();
        Self {
            headers,
            rows,
            lines: self.lines.clone(),
        }
    }
}

fn csv_error(e: csv::Error, delimiter: u8) -> IpmError {
    let line = e.position().map(|p| p.line());
    let mut message = e.to_string();
    if delimiter == b',' && matches!(e.kind(), csv::ErrorKind::UnequalLengths { .. }) {
        message.push_str(
            "; decimal commas must be quoted when `,` is the delimiter, or use delimiter = \";\"",
        );
    }
    IpmError::parse(line, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    const UPLOAD: &str = "\
Cakupan;Tahun;UHH;HLS;RLS;Pengeluaran;IPM;Catatan
Aceh;2021;70,18;14,36;9,37;9.572.000;72,18;a
Aceh;2022;70,43;14,37;9,44;10.024.000;;b
";

    fn upload() -> RawTable {
        RawTable::from_reader(UPLOAD.as_bytes(), b';').expect("table should read")
    }

    #[test]
    fn parses_indonesian_numbers() {
        let f = NumberFormat::INDONESIAN;
        assert_eq!(f.parse("12.000.000"), Some(12_000_000.0));
        assert_eq!(f.parse("73,5"), Some(73.5));
        assert_eq!(f.parse(" 1.234,25 "), Some(1234.25));
        assert_eq!(f.parse(""), None);
        assert_eq!(f.parse("n/a"), None);
    }

    #[test]
    fn standard_format_keeps_dot_decimal() {
        assert_eq!(NumberFormat::STANDARD.parse("73.5"), Some(73.5));
        assert_eq!(NumberFormat::STANDARD.parse("73,5"), None);
    }

    #[test]
    fn reads_records_with_optional_composite() {
        let records = upload().records(NumberFormat::INDONESIAN).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].region.as_deref(), Some("Aceh"));
        assert_eq!(records[0].observation.composite, Some(72.18));
        assert_eq!(records[0].observation.components.expenditure, 9_572_000.0);
        assert_eq!(records[1].observation.composite, None);
        assert_eq!(records[1].observation.year, 2022);
    }

    #[test]
    fn headers_match_case_insensitively() {
        let csv = "tahun,uhh,hls,rls,PENGELUARAN\n2020,70,13,9,10000\n";
        let table = RawTable::from_reader(csv.as_bytes(), b',').unwrap();
        let records = table.records(NumberFormat::STANDARD).unwrap();
        assert_eq!(records[0].region, None);
        assert_eq!(records[0].observation.components.life_expectancy, 70.0);
    }

    #[test]
    fn missing_columns_reported_before_parsing() {
        let csv = "Tahun,UHH,HLS,Pengeluaran\nnot-a-year,1,2,3\n";
        let table = RawTable::from_reader(csv.as_bytes(), b',').unwrap();
        let err = table.records(NumberFormat::STANDARD).unwrap_err();
        assert_eq!(
            err,
            IpmError::SchemaError {
                missing: vec!["RLS".to_string()]
            }
        );
    }

    #[test]
    fn bad_cell_reports_line() {
        let csv = "Tahun,UHH,HLS,RLS,Pengeluaran\n2020,70,13,9,10000\n2021,abc,13,9,10000\n";
        let table = RawTable::from_reader(csv.as_bytes(), b',').unwrap();
        let err = table.records(NumberFormat::STANDARD).unwrap_err();
        assert!(matches!(err, IpmError::ParseError { line: Some(3), .. }));
    }

    #[test]
    fn ragged_row_is_parse_error() {
        let csv = "Tahun,UHH\n2020,70,13\n";
        let err = RawTable::from_reader(csv.as_bytes(), b',').unwrap_err();
        assert_eq!(err.kind(), "ParseError");
    }

    #[test]
    fn unquoted_decimal_commas_suggest_semicolon_delimiter() {
        let csv = "Tahun,UHH,HLS,RLS,Pengeluaran\n2020,70,18,14,36,9,37,9.572.000\n";
        let err = RawTable::from_reader(csv.as_bytes(), b',').unwrap_err();
        assert_eq!(err.kind(), "ParseError");
        assert!(err.to_string().contains("delimiter = \";\""), "{err}");

        let quoted = "Tahun,UHH,HLS,RLS,Pengeluaran\n2020,\"70,18\",\"14,36\",\"9,37\",9.572.000\n";
        let table = RawTable::from_reader(quoted.as_bytes(), b',').unwrap();
        let records = table.records(NumberFormat::INDONESIAN).unwrap();
        assert_eq!(records[0].observation.components.life_expectancy, 70.18);
    }

    #[test]
    fn year_outside_accepted_range_is_rejected() {
        for year in ["2147483647", "-3", "1899", "2101"] {
            let csv = format!("Tahun,UHH,HLS,RLS,Pengeluaran\n{year},70,13,9,10000\n");
            let table = RawTable::from_reader(csv.as_bytes(), b',').unwrap();
            let err = table.records(NumberFormat::STANDARD).unwrap_err();
            assert_eq!(err.kind(), "ParseError", "{year}");
        }
        let csv = "Tahun,UHH,HLS,RLS,Pengeluaran\n2100,70,13,9,10000\n";
        let table = RawTable::from_reader(csv.as_bytes(), b',').unwrap();
        assert_eq!(table.records(NumberFormat::STANDARD).unwrap()[0].observation.year, 2100);
    }

    #[test]
    fn fractional_year_is_rejected() {
        let csv = "Tahun,UHH,HLS,RLS,Pengeluaran\n2020.5,70,13,9,10000\n";
        let table = RawTable::from_reader(csv.as_bytes(), b',').unwrap();
        assert!(table.records(NumberFormat::STANDARD).is_err());
    }

    #[test]
    fn feature_rows_ignore_extra_columns() {
        let names: Vec<String> = ["UHH", "Tahun"].iter().map(|s| s.to_string()).collect();
        let rows = upload()
            .feature_rows(&names, NumberFormat::INDONESIAN)
            .unwrap();
        assert_eq!(rows[1].feature("uhh"), Some(70.43));
        assert_eq!(rows[1].feature("Tahun"), Some(2022.0));
        assert_eq!(rows[1].feature("Catatan"), None);
    }

    #[test]
    fn with_column_appends_cells() {
        let t = upload().with_column("IPM_Prediksi", &["1".to_string(), "2".to_string()]);
        assert_eq!(t.headers().last().map(String::as_str), Some("IPM_Prediksi"));
        assert_eq!(t.rows()[1].last().map(String::as_str), Some("2"));
    }
}
