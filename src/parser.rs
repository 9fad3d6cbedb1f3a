//! CSV decoding for raw exports and hourly grids.
//!
//! Schema resolution lives in [`resolve_schema`]; everything downstream sees
//! one canonical value column.

use std::io::Read;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use csv::{ByteRecord, ReaderBuilder, StringRecord};
use tracing::debug;

use crate::errors::{AlignError, ProfileError, RowRejection};
use crate::series::{Observation, RawSeries};

pub const DATETIME_COLUMN: &str = "DateTime";
pub const PLAYERS_COLUMN: &str = "Players";
pub const USERS_COLUMN: &str = "Users";
pub const AVG_PLAYERS_COLUMN: &str = "AvgPlayers";

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Which source column carried the values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueColumn {
    Players,
    /// Software titles export `Users`; same meaning as `Players`.
    Users,
}

/// Column positions for a raw export after aliasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    pub timestamp: usize,
    pub value: usize,
    pub value_column: ValueColumn,
}

/// Locates the timestamp column and the canonical value column.
///
/// `Players` takes precedence when a file carries both `Players` and `Users`.
pub fn resolve_schema(headers: &StringRecord) -> Result<Schema, AlignError> {
    let position = |name: &str| headers.iter().position(|h| h.trim() == name);

    let timestamp = position(DATETIME_COLUMN).ok_or(AlignError::Schema {
        column: DATETIME_COLUMN,
    })?;

    let (value, value_column) = match (position(PLAYERS_COLUMN), position(USERS_COLUMN)) {
        (Some(idx), _) => (idx, ValueColumn::Players),
        (None, Some(idx)) => (idx, ValueColumn::Users),
        (None, None) => return Err(AlignError::MissingValueColumn),
    };

    Ok(Schema {
        timestamp,
        value,
        value_column,
    })
}

/// Parses the timestamp shapes seen in exports and in our own output.
///
/// Values carrying an offset are converted to UTC; naive values are returned
/// unchanged. Returns `None` for anything else.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.naive_utc());
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// Parses a finite number; empty cells and `NaN` yield `None`.
pub fn parse_value(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Decodes a raw export into a [`RawSeries`].
///
/// Rows with an unreadable timestamp or value are counted in
/// [`RawSeries::rejected`] and skipped. A file whose data rows all fail to
/// parse is an error rather than an empty series.
pub fn read_raw_series<R: Read>(source: &str, reader: R) -> Result<RawSeries, AlignError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let schema = resolve_schema(rdr.headers()?)?;
    if schema.value_column == ValueColumn::Users {
        debug!(source, "using Users column as Players");
    }

    let mut series = RawSeries {
        source: source.to_string(),
        ..Default::default()
    };

    for record in rdr.byte_records() {
        let record = record?;
        match decode_row(&record, schema.timestamp, schema.value) {
            Ok(obs) => series.observations.push(obs),
            Err(rejection) => {
                debug!(source, %rejection, "row skipped");
                series.rejected += 1;
            }
        }
    }

    if series.observations.is_empty() && series.rejected > 0 {
        return Err(AlignError::NoParseableRows {
            rejected: series.rejected,
        });
    }
    Ok(series)
}

/// One decoded row of an hourly grid file.
pub type HourlyRow = Result<Observation, RowRejection>;

/// Decodes an hourly grid file (`DateTime,AvgPlayers`) row by row.
pub fn read_hourly_rows<R: Read>(reader: R) -> Result<Vec<HourlyRow>, ProfileError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let position = |name: &str| headers.iter().position(|h| h.trim() == name);

    let timestamp = position(DATETIME_COLUMN).ok_or(ProfileError::Schema {
        column: DATETIME_COLUMN,
    })?;
    let value = position(AVG_PLAYERS_COLUMN).ok_or(ProfileError::Schema {
        column: AVG_PLAYERS_COLUMN,
    })?;

    let mut rows = Vec::new();
    for record in rdr.byte_records() {
        let record = record?;
        rows.push(decode_row(&record, timestamp, value));
    }
    Ok(rows)
}

/// Decodes one data row. Cells are read as bytes so a stray non-UTF-8 cell
/// rejects only its own row.
fn decode_row(record: &ByteRecord, ts_idx: usize, value_idx: usize) -> HourlyRow {
    let line = record.position().map_or(0, |p| p.line() as usize);
    let cell = move |idx: usize| String::from_utf8_lossy(record.get(idx).unwrap_or_default());
    let raw_ts = cell(ts_idx);
    let raw_value = cell(value_idx);

    let timestamp = parse_timestamp(&raw_ts).ok_or_else(|| RowRejection::BadTimestamp {
        line,
        raw: raw_ts.to_string(),
    })?;
    let value = parse_value(&raw_value).ok_or_else(|| RowRejection::BadValue {
        line,
        raw: raw_value.to_string(),
    })?;

    Ok(Observation::new(timestamp, value))
}
