//! CSV persistence for pipeline artifacts.
//!
//! Every file is written to a temporary sibling and renamed into place only
//! after the last row is flushed, so a failed write never leaves a partial
//! artifact behind.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::parser::{AVG_PLAYERS_COLUMN, DATETIME_COLUMN};
use crate::series::{DailyProfile, HourlyGrid};

/// Timestamp layout used in hourly grid files.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Serialize)]
struct HourlyRecord {
    #[serde(rename = "DateTime")]
    date_time: String,
    #[serde(rename = "AvgPlayers")]
    avg_players: f64,
}

#[derive(Debug, Serialize)]
struct DailyRecord {
    #[serde(rename = "Hour")]
    hour: u32,
    #[serde(rename = "AvgPlayers")]
    avg_players: f64,
}

/// Writes `rows` under `headers` to `path`, replacing any existing file.
///
/// The header line is written even when `rows` is empty.
pub fn write_records<T, I>(path: &Path, headers: &[&str], rows: I) -> Result<()>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp =
        NamedTempFile::new_in(dir).with_context(|| format!("failed to create temp file in {dir:?}"))?;

    let mut count = 0usize;
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(tmp.as_file_mut());
        writer.write_record(headers)?;
        for row in rows {
            writer.serialize(row)?;
            count += 1;
        }
        writer.flush()?;
    }

    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("failed to finalize {path:?}"))?;
    debug!(?path, rows = count, "CSV written");
    Ok(())
}

/// Persists a grid as `DateTime,AvgPlayers`, oldest bucket first.
pub fn write_hourly_grid(path: &Path, grid: &HourlyGrid) -> Result<()> {
    let rows = grid.iter().map(|(at, avg_players)| HourlyRecord {
        date_time: at.format(DATETIME_FORMAT).to_string(),
        avg_players,
    });
    write_records(path, &[DATETIME_COLUMN, AVG_PLAYERS_COLUMN], rows)
}

/// Persists a profile as `Hour,AvgPlayers`, ascending by hour.
pub fn write_daily_profile(path: &Path, profile: &DailyProfile) -> Result<()> {
    let rows = profile
        .iter()
        .map(|(hour, avg_players)| DailyRecord { hour, avg_players });
    write_records(path, &["Hour", AVG_PLAYERS_COLUMN], rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::read_hourly_rows;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::collections::BTreeMap;
    use std::fs;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_write_hourly_grid_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filtered_game.csv");
        let grid = HourlyGrid::from_buckets(BTreeMap::from([(at(11), 150.0), (at(10), 100.0)]));

        write_hourly_grid(&path, &grid).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "DateTime,AvgPlayers\n2024-01-01 10:00:00,100.0\n2024-01-01 11:00:00,150.0\n"
        );
    }

    #[test]
    fn test_hourly_grid_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.csv");
        let grid = HourlyGrid::from_buckets(BTreeMap::from([(at(3), 2.5)]));
        write_hourly_grid(&path, &grid).unwrap();

        let rows = read_hourly_rows(fs::File::open(&path).unwrap()).unwrap();
        assert_eq!(rows.len(), 1);
        let obs = rows[0].clone().unwrap();
        assert_eq!(obs.timestamp, at(3));
        assert_eq!(obs.value, 2.5);
    }

    #[test]
    fn test_empty_grid_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        write_hourly_grid(&path, &HourlyGrid::default()).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "DateTime,AvgPlayers\n");
    }

    #[test]
    fn test_write_daily_profile_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daily.csv");
        let profile = DailyProfile::from_hours(BTreeMap::from([(8, 4.0), (5, 20.5)]));

        write_daily_profile(&path, &profile).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "Hour,AvgPlayers\n5,20.5\n8,4.0\n"
        );
    }

    #[test]
    fn test_rewrite_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daily.csv");
        fs::write(&path, "stale").unwrap();

        write_daily_profile(&path, &DailyProfile::default()).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "Hour,AvgPlayers\n");
        // no temp files left behind
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
