//! Stage 3: per-item mean and standard deviation over daily profiles.

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::analyzers::types::Descriptive;
use crate::analyzers::utility::{mean, sample_stddev};
use crate::batch::{CSV_SUFFIX, DAILY_PREFIX, HOURLY_PREFIX, list_csv_files};
use crate::errors::ProfileError;
use crate::output::write_records;
use crate::parser::{AVG_PLAYERS_COLUMN, parse_value};

pub const SUMMARY_FILE: &str = "Descriptives.csv";

/// Recovers the item name from a stage-2 file name:
/// `daily_avg_filtered_Portal 2.csv` → `Portal 2`.
pub fn item_name(file_name: &str) -> String {
    let name = file_name.strip_prefix(DAILY_PREFIX).unwrap_or(file_name);
    let name = name.strip_prefix(HOURLY_PREFIX).unwrap_or(name);
    name.strip_suffix(CSV_SUFFIX).unwrap_or(name).to_string()
}

/// Reads the `AvgPlayers` column of a daily profile; unreadable cells are skipped.
pub fn read_profile_values<R: Read>(reader: R) -> Result<Vec<f64>, ProfileError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let idx = rdr
        .headers()?
        .iter()
        .position(|h| h.trim() == AVG_PLAYERS_COLUMN)
        .ok_or(ProfileError::Schema {
            column: AVG_PLAYERS_COLUMN,
        })?;

    let mut values = Vec::new();
    for record in rdr.records() {
        let record = record?;
        if let Some(v) = record.get(idx).and_then(parse_value) {
            values.push(v);
        }
    }
    Ok(values)
}

/// Mean and SD of one daily-profile file.
pub fn describe_file(path: &Path) -> Result<Descriptive> {
    let game = path
        .file_name()
        .map(|n| item_name(&n.to_string_lossy()))
        .unwrap_or_default();
    let file = File::open(path).with_context(|| format!("failed to open {path:?}"))?;
    let values =
        read_profile_values(BufReader::new(file)).with_context(|| format!("failed to read {path:?}"))?;

    let avg = mean(&values);
    Ok(Descriptive {
        game,
        mean: avg,
        sd: sample_stddev(&values, avg),
    })
}

/// Summarizes every daily profile in `daily_dir` into
/// `<summary_dir>/Descriptives.csv`, sorted by item name.
pub fn describe_dir(daily_dir: &Path, summary_dir: &Path) -> Result<(PathBuf, Vec<Descriptive>)> {
    let files = list_csv_files(daily_dir)?;
    fs::create_dir_all(summary_dir).with_context(|| format!("failed to create {summary_dir:?}"))?;

    let mut rows = Vec::new();
    let mut failed = 0usize;
    for path in files {
        info!(file = ?path.file_name(), "Processing");
        match describe_file(&path) {
            Ok(row) => rows.push(row),
            Err(e) => {
                failed += 1;
                error!(file = ?path.file_name(), error = %format!("{e:#}"), "Failed to describe file");
            }
        }
    }
    rows.sort_by(|a, b| a.game.cmp(&b.game));

    let output = summary_dir.join(SUMMARY_FILE);
    write_records(&output, &["Game", "Mean", "SD"], &rows)?;
    info!(output = ?output, items = rows.len(), failed, "Descriptives saved");

    Ok((output, rows))
}
