//! Pipeline configuration.
//!
//! Values come from, in order of precedence: command-line flags (or their
//! `PH_*` environment variables), an optional JSON file, and the defaults
//! below. Directories are always explicit paths; nothing depends on the
//! process working directory beyond resolving relative paths.
//!
//! ```json
//! {
//!   "raw_dir": "data/raw",
//!   "start_date": "2024-03-01 00:00:00",
//!   "timezone": "America/New_York"
//! }
//! ```

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::align::{HourAligner, MinutePolicy};
use crate::parser::parse_timestamp;
use crate::profile::DailyProfiler;
use crate::timezone::TargetZone;

pub const DEFAULT_RAW_DIR: &str = "data/raw";
pub const DEFAULT_HOURLY_DIR: &str = "data/filtered";
pub const DEFAULT_DAILY_DIR: &str = "data/averaged";
pub const DEFAULT_SUMMARY_DIR: &str = "data/output";

/// Optional settings, as read from a JSON file or the command line.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverrides {
    pub raw_dir: Option<PathBuf>,
    pub hourly_dir: Option<PathBuf>,
    pub daily_dir: Option<PathBuf>,
    pub summary_dir: Option<PathBuf>,
    pub start_date: Option<String>,
    pub timezone: Option<String>,
    pub minute_policy: Option<String>,
}

impl ConfigOverrides {
    /// Loads overrides from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("failed to read {path:?}"))?;
        serde_json::from_str(&content).with_context(|| format!("failed to parse {path:?}"))
    }

    /// Fills every unset field of `self` from `base`.
    pub fn or(self, base: ConfigOverrides) -> Self {
        Self {
            raw_dir: self.raw_dir.or(base.raw_dir),
            hourly_dir: self.hourly_dir.or(base.hourly_dir),
            daily_dir: self.daily_dir.or(base.daily_dir),
            summary_dir: self.summary_dir.or(base.summary_dir),
            start_date: self.start_date.or(base.start_date),
            timezone: self.timezone.or(base.timezone),
            minute_policy: self.minute_policy.or(base.minute_policy),
        }
    }
}

/// Fully resolved settings for one batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub raw_dir: PathBuf,
    pub hourly_dir: PathBuf,
    pub daily_dir: PathBuf,
    pub summary_dir: PathBuf,
    /// Samples before this instant are dropped. `None` keeps everything.
    pub start_date: Option<NaiveDateTime>,
    pub zone: TargetZone,
    pub minute_policy: MinutePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_dir: DEFAULT_RAW_DIR.into(),
            hourly_dir: DEFAULT_HOURLY_DIR.into(),
            daily_dir: DEFAULT_DAILY_DIR.into(),
            summary_dir: DEFAULT_SUMMARY_DIR.into(),
            start_date: None,
            zone: TargetZone::default(),
            minute_policy: MinutePolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Validates and applies overrides on top of the defaults.
    pub fn resolve(overrides: ConfigOverrides) -> Result<Self> {
        let defaults = Self::default();

        let start_date = overrides
            .start_date
            .as_deref()
            .map(|raw| parse_timestamp(raw).with_context(|| format!("invalid start date {raw:?}")))
            .transpose()?;
        let zone = match overrides.timezone.as_deref() {
            Some(raw) => raw.parse::<TargetZone>().context("invalid timezone")?,
            None => defaults.zone,
        };
        let minute_policy = match overrides.minute_policy.as_deref() {
            Some(raw) => raw
                .parse::<MinutePolicy>()
                .map_err(anyhow::Error::msg)
                .context("invalid minute policy")?,
            None => defaults.minute_policy,
        };

        Ok(Self {
            raw_dir: overrides.raw_dir.unwrap_or(defaults.raw_dir),
            hourly_dir: overrides.hourly_dir.unwrap_or(defaults.hourly_dir),
            daily_dir: overrides.daily_dir.unwrap_or(defaults.daily_dir),
            summary_dir: overrides.summary_dir.unwrap_or(defaults.summary_dir),
            start_date,
            zone,
            minute_policy,
        })
    }

    pub fn aligner(&self) -> HourAligner {
        HourAligner::new(self.start_date.unwrap_or(NaiveDateTime::MIN)).with_policy(self.minute_policy)
    }

    pub fn profiler(&self) -> DailyProfiler {
        DailyProfiler::new(self.zone)
    }
}
