// Copyright (c) 2025 - Cowboy AI, Inc.
//! Row Source - spreadsheet input
//!
//! Rows are read once into memory and handed out in file order as often as
//! the caller asks. Cell values are raw; [`Row::normalize`] applies the
//! placeholder rules before anything compares them.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Placeholder for empty or missing cells
pub const NOT_LISTED: &str = "Not Listed";

/// Cell values spreadsheet tooling writes for "no value" (pandas' default
/// `na_values`), matched exactly after trimming
pub const MISSING_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub const COLUMN_NAME: &str = "Name";
pub const COLUMN_IP: &str = "IP";
pub const COLUMN_DEVICE_TYPE: &str = "Device Type";
pub const COLUMN_DEVICE_SUBTYPE: &str = "Device Subtype";
pub const COLUMN_HOSTNAME: &str = "Hostname";

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Row source error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Could not read '{path}': {message}")]
    Io { path: PathBuf, message: String },

    #[error("Input is empty")]
    Empty,

    #[error("Invalid header row: {0}")]
    InvalidHeader(String),

    #[error("No field called '{0}'")]
    MissingColumn(String),
}

/// One input row as read, cells untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawRow {
    /// 0-based position among the data rows
    pub index: usize,
    pub name: Option<String>,
    pub ip: Option<String>,
    pub device_type: Option<String>,
    pub device_subtype: Option<String>,
    pub hostname: Option<String>,
}

/// Row with every cell normalized
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    pub index: usize,
    pub name: String,
    pub ip: String,
    pub device_type: String,
    pub device_subtype: String,
    pub hostname: Option<String>,
}

impl Row {
    pub fn normalize(raw: &RawRow) -> Self {
        Self {
            index: raw.index,
            name: normalize_cell(raw.name.as_deref()),
            ip: normalize_cell(raw.ip.as_deref()),
            device_type: normalize_cell(raw.device_type.as_deref()),
            device_subtype: normalize_cell(raw.device_subtype.as_deref()),
            hostname: raw
                .hostname
                .as_deref()
                .map(str::trim)
                .filter(|h| !is_missing(h))
                .map(str::to_string),
        }
    }

    /// Candidate addresses in the IP cell, in order
    pub fn ip_candidates(&self) -> impl Iterator<Item = &str> {
        self.ip.split(',').map(str::trim)
    }
}

/// Trim a cell; empty, absent, and [`MISSING_MARKERS`] cells become [`NOT_LISTED`]
pub fn normalize_cell(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !is_missing(v) => v.to_string(),
        _ => NOT_LISTED.to_string(),
    }
}

fn is_missing(trimmed: &str) -> bool {
    trimmed.is_empty() || MISSING_MARKERS.contains(&trimmed)
}

/// Source of input rows
///
/// `rows` may be called any number of times and returns rows in source order.
pub trait RowSource {
    fn rows(&self) -> Result<Vec<RawRow>, SourceError>;
}

impl RowSource for Vec<RawRow> {
    fn rows(&self) -> Result<Vec<RawRow>, SourceError> {
        Ok(self.clone())
    }
}

/// Delimited-file row source with a header row
#[derive(Debug, Clone)]
pub struct CsvRowSource {
    rows: Vec<RawRow>,
}

impl CsvRowSource {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|e| SourceError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        debug!("Read {} bytes from {}", data.len(), path.display());
        Self::from_bytes(&data)
    }

    /// Parse comma-delimited data
    ///
    /// Rows that fail to parse are skipped with a warning; their index is
    /// still consumed so later rows keep their position.
    pub fn from_bytes(data: &[u8]) -> Result<Self, SourceError> {
        let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
        if data.iter().all(u8::is_ascii_whitespace) {
            return Err(SourceError::Empty);
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(data);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| SourceError::InvalidHeader(e.to_string()))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let column = |name: &str| headers.iter().position(|h| h == name);
        let required = |name: &str| column(name).ok_or_else(|| SourceError::MissingColumn(name.to_string()));

        let name_idx = required(COLUMN_NAME)?;
        let ip_idx = required(COLUMN_IP)?;
        let type_idx = required(COLUMN_DEVICE_TYPE)?;
        let subtype_idx = required(COLUMN_DEVICE_SUBTYPE)?;
        let hostname_idx = column(COLUMN_HOSTNAME);

        let mut rows = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    warn!("Row {}: failed to parse, skipping: {}", index, e);
                    continue;
                }
            };

            let cell = |idx: usize| record.get(idx).map(str::to_string);
            rows.push(RawRow {
                index,
                name: cell(name_idx),
                ip: cell(ip_idx),
                device_type: cell(type_idx),
                device_subtype: cell(subtype_idx),
                hostname: hostname_idx.and_then(cell),
            });
        }

        debug!("Parsed {} rows", rows.len());
        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl RowSource for CsvRowSource {
    fn rows(&self) -> Result<Vec<RawRow>, SourceError> {
        Ok(self.rows.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn test_normalize_cell() {
        assert_eq!(normalize_cell(Some(" Words go here ")), "Words go here");
        assert_eq!(normalize_cell(Some("nan")), NOT_LISTED);
        assert_eq!(normalize_cell(Some("NaN")), NOT_LISTED);
        assert_eq!(normalize_cell(Some("   ")), NOT_LISTED);
        assert_eq!(normalize_cell(None), NOT_LISTED);
        assert_eq!(normalize_cell(Some("nano")), "nano");
    }

    #[test_case("N/A" ; "slash na")]
    #[test_case("n/a" ; "lowercase slash na")]
    #[test_case("NA" ; "na")]
    #[test_case("NULL" ; "null upper")]
    #[test_case("null" ; "null lower")]
    #[test_case("None" ; "none")]
    #[test_case("#N/A" ; "spreadsheet na")]
    #[test_case("<NA>" ; "pandas na")]
    #[test_case("-nan" ; "negative nan")]
    #[test_case(" N/A " ; "padded")]
    fn test_missing_markers_are_not_listed(cell: &str) {
        assert_eq!(normalize_cell(Some(cell)), NOT_LISTED);
    }

    #[test]
    fn test_marker_lookalikes_are_kept() {
        assert_eq!(normalize_cell(Some("NAS")), "NAS");
        assert_eq!(normalize_cell(Some("Nonesuch")), "Nonesuch");
        assert_eq!(normalize_cell(Some("N/A switch")), "N/A switch");
    }

    #[test]
    fn test_missing_marker_type_becomes_not_listed() {
        let data = b"Name,IP,Device Type,Device Subtype\nap1,10.0.0.9,N/A,NULL\n";
        let rows = CsvRowSource::from_bytes(data).unwrap().rows().unwrap();
        let row = Row::normalize(&rows[0]);
        assert_eq!(row.device_type, NOT_LISTED);
        assert_eq!(row.device_subtype, NOT_LISTED);
    }

    #[test]
    fn test_parse_rows() {
        let data = b"Name,IP,Device Type,Device Subtype\n\
                     r1 ,10.0.0.5,Router,Core\n\
                     sw1,\"10.0.1.2, 10.0.2.2\",,\n";
        let source = CsvRowSource::from_bytes(data).unwrap();
        let rows = source.rows().unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            RawRow {
                index: 0,
                name: Some("r1 ".to_string()),
                ip: Some("10.0.0.5".to_string()),
                device_type: Some("Router".to_string()),
                device_subtype: Some("Core".to_string()),
                hostname: None,
            }
        );

        let row = Row::normalize(&rows[1]);
        assert_eq!(row.device_type, NOT_LISTED);
        assert_eq!(row.device_subtype, NOT_LISTED);
        assert_eq!(row.ip_candidates().collect::<Vec<_>>(), vec!["10.0.1.2", "10.0.2.2"]);
    }

    #[test]
    fn test_rows_can_be_read_twice() {
        let source = CsvRowSource::from_bytes(b"Name,IP,Device Type,Device Subtype\na,1.1.1.1,T,S\n").unwrap();
        assert_eq!(source.rows().unwrap(), source.rows().unwrap());
    }

    #[test]
    fn test_short_row_and_bom() {
        let mut data = UTF8_BOM.to_vec();
        data.extend_from_slice(b"Name,IP,Device Type,Device Subtype,Hostname\nr1,10.0.0.5\n");
        let rows = CsvRowSource::from_bytes(&data).unwrap().rows().unwrap();

        assert_eq!(rows[0].device_type, None);
        assert_eq!(rows[0].hostname, None);
        assert_eq!(Row::normalize(&rows[0]).device_subtype, NOT_LISTED);
    }

    #[test]
    fn test_hostname_column() {
        let data = b"Name,IP,Device Type,Device Subtype,Hostname\nr1,10.0.0.5,Router,Core, r1.corp.example \nr2,10.0.0.6,Router,Core,nan\n";
        let rows = CsvRowSource::from_bytes(data).unwrap().rows().unwrap();

        assert_eq!(Row::normalize(&rows[0]).hostname.as_deref(), Some("r1.corp.example"));
        assert_eq!(Row::normalize(&rows[1]).hostname, None);
    }

    #[test]
    fn test_missing_column() {
        let err = CsvRowSource::from_bytes(b"Name,IP,Device Type\nr1,10.0.0.5,Router\n").unwrap_err();
        assert_eq!(err, SourceError::MissingColumn(COLUMN_DEVICE_SUBTYPE.to_string()));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(CsvRowSource::from_bytes(b"").unwrap_err(), SourceError::Empty);
    }

    #[test]
    fn test_missing_file() {
        let err = CsvRowSource::from_path("/nonexistent/devices.csv").unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
    }
}
