//! Data model shared by the pipeline stages.

use std::collections::BTreeMap;

use chrono::{NaiveDateTime, Timelike};

/// One parsed sample of a raw export.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

impl Observation {
    pub fn new(timestamp: NaiveDateTime, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// A raw export after schema resolution, with rows that failed to parse
/// already removed.
#[derive(Debug, Clone, Default)]
pub struct RawSeries {
    pub source: String,
    pub observations: Vec<Observation>,
    /// Rows dropped while decoding.
    pub rejected: usize,
}

/// Mean value per top-of-hour bucket. Sparse: hours without samples are absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HourlyGrid {
    buckets: BTreeMap<NaiveDateTime, f64>,
}

impl HourlyGrid {
    /// Builds a grid from bucket/mean pairs.
    ///
    /// # Panics
    ///
    /// Debug builds panic if a key is not a top-of-hour instant.
    pub fn from_buckets(buckets: BTreeMap<NaiveDateTime, f64>) -> Self {
        debug_assert!(buckets.keys().all(|k| is_top_of_hour(*k)));
        Self { buckets }
    }

    pub fn get(&self, bucket: &NaiveDateTime) -> Option<f64> {
        self.buckets.get(bucket).copied()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Iterates buckets in ascending time order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDateTime, f64)> + '_ {
        self.buckets.iter().map(|(k, v)| (*k, *v))
    }
}

/// Mean value per local hour-of-day. Hours without samples are absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyProfile {
    hours: BTreeMap<u32, f64>,
}

impl DailyProfile {
    pub fn from_hours(hours: BTreeMap<u32, f64>) -> Self {
        debug_assert!(hours.keys().all(|h| *h < 24));
        Self { hours }
    }

    pub fn get(&self, hour: u32) -> Option<f64> {
        self.hours.get(&hour).copied()
    }

    pub fn len(&self) -> usize {
        self.hours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hours.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.hours.iter().map(|(k, v)| (*k, *v))
    }
}

pub(crate) fn is_top_of_hour(at: NaiveDateTime) -> bool {
    at.minute() == 0 && at.second() == 0 && at.nanosecond() == 0
}
