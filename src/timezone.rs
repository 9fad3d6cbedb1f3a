//! Target zone for daily profiles: an IANA name or a fixed UTC offset.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

use crate::errors::UnknownZone;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetZone {
    Named(Tz),
    Fixed(FixedOffset),
}

impl Default for TargetZone {
    fn default() -> Self {
        Self::Named(Tz::UTC)
    }
}

impl TargetZone {
    pub fn is_utc(&self) -> bool {
        match self {
            Self::Named(tz) => matches!(
                tz.name(),
                "UTC" | "Etc/UTC" | "Etc/UCT" | "UCT" | "Etc/Universal" | "Universal" | "Etc/Zulu" | "Zulu"
            ),
            Self::Fixed(offset) => offset.local_minus_utc() == 0,
        }
    }

    /// Local hour-of-day of a UTC instant in this zone.
    pub fn local_hour(&self, instant: DateTime<Utc>) -> u32 {
        if self.is_utc() {
            return instant.hour();
        }
        match self {
            Self::Named(tz) => instant.with_timezone(tz).hour(),
            Self::Fixed(offset) => instant.with_timezone(offset).hour(),
        }
    }
}

impl FromStr for TargetZone {
    type Err = UnknownZone;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if let Ok(tz) = raw.parse::<Tz>() {
            return Ok(Self::Named(tz));
        }
        parse_offset(raw)
            .map(Self::Fixed)
            .ok_or_else(|| UnknownZone(s.to_string()))
    }
}

impl fmt::Display for TargetZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(tz) => f.write_str(tz.name()),
            Self::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

/// Accepts `+05:00`, `-0330`, `+5`, `UTC+5`, `GMT-03:30`.
fn parse_offset(raw: &str) -> Option<FixedOffset> {
    let upper = raw.to_ascii_uppercase();
    let rest = upper
        .strip_prefix("UTC")
        .or_else(|| upper.strip_prefix("GMT"))
        .unwrap_or(&upper);

    let (sign, digits) = match rest.chars().next()? {
        '+' => (1, &rest[1..]),
        '-' => (-1, &rest[1..]),
        _ => return None,
    };
    if !digits.is_ascii() {
        return None;
    }

    let (hours, minutes) = match digits.split_once(':') {
        Some((h, m)) => (h, m),
        None if digits.len() == 4 => digits.split_at(2),
        None => (digits, "0"),
    };
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if !(0..60).contains(&minutes) {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Localizes a naive instant as UTC.
///
/// Returns `None` when the localization is not a single instant.
pub fn localize_utc(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    Utc.from_local_datetime(&naive).single()
}
