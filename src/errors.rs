//! Error types for the alignment, profiling and table-loading stages.
//!
//! Row-level problems are not errors: they surface as [`RowRejection`] values
//! and the row is dropped. Only file-level failures become an error variant.

use std::fmt;

use chrono::NaiveDateTime;
use thiserror::Error;

/// Why a single row was left out of an aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowRejection {
    /// The timestamp cell could not be parsed.
    BadTimestamp { line: usize, raw: String },
    /// The value cell was empty or not a number.
    BadValue { line: usize, raw: String },
    /// The minute component is not one of the 10-minute marks.
    OffGridMinute { at: NaiveDateTime, minute: u32 },
    /// The instant has no single UTC localization.
    AmbiguousTime { at: NaiveDateTime },
    /// Moving the instant to its bucket leaves the representable range.
    OutOfRange { at: NaiveDateTime },
}

impl fmt::Display for RowRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadTimestamp { line, raw } => write!(f, "line {line}: bad timestamp {raw:?}"),
            Self::BadValue { line, raw } => write!(f, "line {line}: bad value {raw:?}"),
            Self::OffGridMinute { at, minute } => {
                write!(f, "{at}: minute {minute} is not a 10-minute mark")
            }
            Self::AmbiguousTime { at } => write!(f, "{at}: ambiguous local time"),
            Self::OutOfRange { at } => write!(f, "{at}: bucket is out of the supported date range"),
        }
    }
}

#[derive(Debug, Error)]
pub enum AlignError {
    #[error("missing required column {column:?}")]
    Schema { column: &'static str },

    #[error("neither \"Players\" nor \"Users\" column present")]
    MissingValueColumn,

    #[error("none of the {rejected} data rows could be parsed")]
    NoParseableRows { rejected: usize },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("off-grid timestamp rejected: {0}")]
    ContractViolation(RowRejection),
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("missing required column {column:?}")]
    Schema { column: &'static str },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("missing required column {column:?}")]
    MissingColumn { column: String },

    #[error("column {column:?} row {line}: cannot read {raw:?} as {expected}")]
    BadCell {
        column: String,
        line: usize,
        raw: String,
        expected: &'static str,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Timezone identifiers that neither `chrono-tz` nor the offset syntax accept.
#[derive(Debug, Error)]
#[error("unknown timezone {0:?}")]
pub struct UnknownZone(pub String);
