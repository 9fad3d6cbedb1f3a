//! Directory-level orchestration for stages 1 and 2.
//!
//! Each `.csv` file is an independent unit of work. A failing file is logged
//! and skipped; only an unreadable source directory aborts the batch.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::align::HourAligner;
use crate::output::{write_daily_profile, write_hourly_grid};
use crate::parser::{read_hourly_rows, read_raw_series};
use crate::profile::DailyProfiler;

pub const CSV_SUFFIX: &str = ".csv";
pub const HOURLY_PREFIX: &str = "filtered_";
pub const DAILY_PREFIX: &str = "daily_avg_";

/// Outcome of one stage over a directory.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub written: Vec<PathBuf>,
    /// File name and rendered error of every skipped file.
    pub failed: Vec<(String, String)>,
}

impl BatchReport {
    pub fn log_summary(&self, stage: &str) {
        info!(
            stage,
            processed = self.written.len(),
            failed = self.failed.len(),
            "Batch complete"
        );
    }
}

/// Lists the `.csv` files directly inside `dir`, sorted by name.
pub fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("failed to read {dir:?}"))? {
        let entry = entry?;
        let path = entry.path();
        let is_csv = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(CSV_SUFFIX));
        if is_csv && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn run_stage<F>(stage: &str, src: &Path, dst: &Path, prefix: &str, mut process: F) -> Result<BatchReport>
where
    F: FnMut(&Path, &Path) -> Result<()>,
{
    let files = list_csv_files(src)?;
    fs::create_dir_all(dst).with_context(|| format!("failed to create {dst:?}"))?;

    let mut report = BatchReport::default();
    for input in files {
        let Some(name) = input.file_name().and_then(|n| n.to_str()) else {
            warn!(path = ?input, "skipping file with non UTF-8 name");
            continue;
        };
        let name = name.to_string();
        info!(stage, file = %name, "Processing");

        let output = dst.join(format!("{prefix}{name}"));
        match process(&input, &output) {
            Ok(()) => {
                info!(stage, output = ?output, "Processed file saved");
                report.written.push(output);
            }
            Err(e) => {
                let msg = format!("{e:#}");
                error!(stage, file = %name, error = %msg, "Failed to process file");
                report.failed.push((name, msg));
            }
        }
    }

    report.log_summary(stage);
    Ok(report)
}

/// Stage 1 over one file: raw export in, hourly grid out.
#[tracing::instrument(skip(aligner), fields(start_date = %aligner.start_date()))]
pub fn align_file(input: &Path, output: &Path, aligner: &HourAligner) -> Result<()> {
    let source = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file = File::open(input).with_context(|| format!("failed to open {input:?}"))?;
    let series = read_raw_series(&source, BufReader::new(file))
        .with_context(|| format!("failed to read {input:?}"))?;
    let grid = aligner
        .align(&series)
        .with_context(|| format!("failed to align {input:?}"))?;
    write_hourly_grid(output, &grid)
}

/// Stage 2 over one file: hourly grid in, daily profile out.
#[tracing::instrument(skip(profiler), fields(zone = %profiler.zone()))]
pub fn profile_file(input: &Path, output: &Path, profiler: &DailyProfiler) -> Result<()> {
    let file = File::open(input).with_context(|| format!("failed to open {input:?}"))?;
    let rows = read_hourly_rows(BufReader::new(file))
        .with_context(|| format!("failed to read {input:?}"))?;
    let profile = profiler.profile_rows(rows);
    write_daily_profile(output, &profile)
}

/// Runs stage 1 over every `.csv` in `src`, writing `filtered_<name>` into `dst`.
pub fn align_dir(src: &Path, dst: &Path, aligner: &HourAligner) -> Result<BatchReport> {
    run_stage("align", src, dst, HOURLY_PREFIX, |input, output| {
        align_file(input, output, aligner)
    })
}

/// Runs stage 2 over every `.csv` in `src`, writing `daily_avg_<name>` into `dst`.
pub fn profile_dir(src: &Path, dst: &Path, profiler: &DailyProfiler) -> Result<BatchReport> {
    run_stage("profile", src, dst, DAILY_PREFIX, |input, output| {
        profile_file(input, output, profiler)
    })
}
