//! Stage 1: map irregular 10-minute samples onto top-of-hour buckets.
//!
//! Rounding table, keyed by the minute of the sample:
//!
//! | Minute  | Buckets                    |
//! |---------|----------------------------|
//! | 0       | same hour                  |
//! | 10, 20  | same hour (round down)     |
//! | 30      | same hour **and** next hour |
//! | 40, 50  | next hour (round up)       |
//!
//! Anything else is off-grid and handled per [`MinutePolicy`].

use std::fmt;
use std::iter::{Chain, Once, once};
use std::str::FromStr;

use chrono::{NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use tracing::{debug, warn};

use crate::errors::{AlignError, RowRejection};
use crate::series::{HourlyGrid, RawSeries};
use crate::stats::GroupedMean;

/// What to do with a sample whose minute is not a 10-minute mark.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MinutePolicy {
    /// Reject the whole file.
    #[default]
    Strict,
    /// Snap to the nearest 10-minute mark (ties round up) and bucket that.
    Nearest,
}

impl FromStr for MinutePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "nearest" => Ok(Self::Nearest),
            other => Err(format!("unknown minute policy {other:?} (expected strict or nearest)")),
        }
    }
}

impl fmt::Display for MinutePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Strict => "strict",
            Self::Nearest => "nearest",
        })
    }
}

/// The one or two buckets a single sample feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contributions {
    first: NaiveDateTime,
    second: Option<NaiveDateTime>,
}

impl Contributions {
    fn single(bucket: NaiveDateTime) -> Self {
        Self {
            first: bucket,
            second: None,
        }
    }

    fn pair(down: NaiveDateTime, up: NaiveDateTime) -> Self {
        Self {
            first: down,
            second: Some(up),
        }
    }

    pub fn len(&self) -> usize {
        1 + usize::from(self.second.is_some())
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl IntoIterator for Contributions {
    type Item = NaiveDateTime;
    type IntoIter = Chain<Once<NaiveDateTime>, std::option::IntoIter<NaiveDateTime>>;

    fn into_iter(self) -> Self::IntoIter {
        once(self.first).chain(self.second)
    }
}

fn floor_hour(at: NaiveDateTime) -> NaiveDateTime {
    at.date().and_time(NaiveTime::MIN) + TimeDelta::hours(i64::from(at.hour()))
}

/// Expands one sample timestamp into its bucket contributions.
///
/// Seconds and sub-seconds are ignored. A round-up past the last
/// representable hour yields [`RowRejection::OutOfRange`].
pub fn expand(at: NaiveDateTime) -> Result<Contributions, RowRejection> {
    let down = floor_hour(at);
    let up = || {
        down.checked_add_signed(TimeDelta::hours(1))
            .ok_or(RowRejection::OutOfRange { at })
    };

    match at.minute() {
        0 | 10 | 20 => Ok(Contributions::single(down)),
        30 => Ok(Contributions::pair(down, up()?)),
        40 | 50 => Ok(Contributions::single(up()?)),
        minute => Err(RowRejection::OffGridMinute { at, minute }),
    }
}

/// Moves `at` to the nearest 10-minute mark, seconds dropped.
///
/// Returns `None` when the mark lies past the representable range.
pub fn snap_to_mark(at: NaiveDateTime) -> Option<NaiveDateTime> {
    let minute = (at.minute() + 5) / 10 * 10;
    floor_hour(at).checked_add_signed(TimeDelta::minutes(i64::from(minute)))
}

/// Turns a [`RawSeries`] into a [`HourlyGrid`].
#[derive(Debug, Clone, Copy)]
pub struct HourAligner {
    start_date: NaiveDateTime,
    policy: MinutePolicy,
}

impl HourAligner {
    pub fn new(start_date: NaiveDateTime) -> Self {
        Self {
            start_date,
            policy: MinutePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: MinutePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn start_date(&self) -> NaiveDateTime {
        self.start_date
    }

    /// Drops samples before the cutoff, expands the rest into buckets and
    /// averages each bucket.
    ///
    /// # Errors
    ///
    /// [`AlignError::ContractViolation`] for an off-grid minute under
    /// [`MinutePolicy::Strict`].
    pub fn align(&self, series: &RawSeries) -> Result<HourlyGrid, AlignError> {
        let mut acc = GroupedMean::new();
        let mut before_cutoff = 0usize;
        let mut snapped = 0usize;
        let mut out_of_range = 0usize;

        for obs in &series.observations {
            if obs.timestamp < self.start_date {
                before_cutoff += 1;
                continue;
            }

            let contributions = match expand(obs.timestamp) {
                Ok(c) => c,
                Err(rejection @ RowRejection::OffGridMinute { .. }) => match self.policy {
                    MinutePolicy::Strict => return Err(AlignError::ContractViolation(rejection)),
                    MinutePolicy::Nearest => {
                        snapped += 1;
                        let resolved = snap_to_mark(obs.timestamp)
                            .ok_or(RowRejection::OutOfRange { at: obs.timestamp })
                            .and_then(expand);
                        match resolved {
                            Ok(c) => c,
                            Err(rejection) => {
                                debug!(source = %series.source, %rejection, "row skipped");
                                out_of_range += 1;
                                continue;
                            }
                        }
                    }
                },
                Err(rejection) => {
                    debug!(source = %series.source, %rejection, "row skipped");
                    out_of_range += 1;
                    continue;
                }
            };

            for bucket in contributions {
                acc.add(bucket, obs.value);
            }
        }

        if snapped > 0 {
            warn!(source = %series.source, snapped, "off-grid samples snapped to nearest mark");
        }
        if series.rejected > 0 {
            warn!(source = %series.source, rejected = series.rejected, "unparseable rows dropped");
        }
        if out_of_range > 0 {
            warn!(source = %series.source, out_of_range, "rows outside the supported date range dropped");
        }

        let grid = HourlyGrid::from_buckets(acc.finish());
        debug!(
            source = %series.source,
            observations = series.observations.len(),
            before_cutoff,
            buckets = grid.len(),
            "series aligned"
        );
        Ok(grid)
    }
}
