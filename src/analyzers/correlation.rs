//! Pearson correlations over a curated per-item table.
//!
//! The table is wide: one row per item with numeric columns (`Mean`, `Year`,
//! `Price`), boolean feature flags and free-text genre tags. Only the
//! requested value and flag columns are read.

use std::collections::BTreeMap;
use std::io::Read;

use csv::ReaderBuilder;
use tracing::info;

use crate::analyzers::types::{CorrelationMatrix, PairCorrelation};
use crate::analyzers::utility::pearson;
use crate::errors::TableError;
use crate::parser::parse_value;

pub const DEFAULT_VALUE_COLUMNS: [&str; 3] = ["Mean", "Year", "Price"];
pub const DEFAULT_FLAG_COLUMNS: [&str; 5] = [
    "isIndie",
    "hasAchv",
    "hasSteamCloud",
    "accountRequired",
    "hasKernel",
];

/// Optional grouping column; when present its labels are kept per row.
pub const GROUP_COLUMN: &str = "Player";
pub const CLOUD_FLAG: &str = "hasSteamCloud";

/// Significance threshold for the `*` marker.
pub const ALPHA: f64 = 0.05;

/// Selected columns of a curated table, flags already mapped to 0/1.
#[derive(Debug, Clone, Default)]
pub struct CuratedTable {
    names: Vec<String>,
    columns: Vec<Vec<Option<f64>>>,
    groups: Option<Vec<String>>,
}

impl CuratedTable {
    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.columns[idx].as_slice())
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Per-row labels of [`GROUP_COLUMN`], if the table has one.
    pub fn groups(&self) -> Option<&[String]> {
        self.groups.as_deref()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }
}

/// Reads a boolean cell. Numbers count as true when non-zero.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" => Some(true),
        "false" | "f" | "no" | "n" => Some(false),
        other => other.parse::<f64>().ok().map(|v| v != 0.0),
    }
}

#[derive(Clone, Copy)]
enum Kind {
    Value,
    Flag,
}

/// Loads the requested columns; value columns first, then flags.
///
/// Empty cells become `None`. Any other unreadable cell is an error.
pub fn load_table<R: Read>(
    reader: R,
    value_columns: &[String],
    flag_columns: &[String],
) -> Result<CuratedTable, TableError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let wanted: Vec<(String, Kind)> = value_columns
        .iter()
        .map(|c| (c.clone(), Kind::Value))
        .chain(flag_columns.iter().map(|c| (c.clone(), Kind::Flag)))
        .collect();

    let mut indices = Vec::with_capacity(wanted.len());
    for (name, kind) in &wanted {
        let idx = headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| TableError::MissingColumn {
                column: name.clone(),
            })?;
        indices.push((idx, *kind));
    }

    let group_idx = headers.iter().position(|h| h.trim() == GROUP_COLUMN);
    let mut groups = group_idx.map(|_| Vec::new());

    let mut columns = vec![Vec::new(); wanted.len()];
    for record in rdr.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line() as usize);

        if let (Some(idx), Some(labels)) = (group_idx, groups.as_mut()) {
            labels.push(record.get(idx).unwrap_or("").trim().to_string());
        }

        for (col, ((idx, kind), (name, _))) in indices.iter().zip(&wanted).enumerate() {
            let raw = record.get(*idx).unwrap_or("").trim();
            if raw.is_empty() {
                columns[col].push(None);
                continue;
            }
            let cell = match kind {
                Kind::Value => parse_value(raw),
                Kind::Flag => parse_flag(raw).map(|b| if b { 1.0 } else { 0.0 }),
            };
            let Some(v) = cell else {
                return Err(TableError::BadCell {
                    column: name.clone(),
                    line,
                    raw: raw.to_string(),
                    expected: match kind {
                        Kind::Value => "number",
                        Kind::Flag => "boolean",
                    },
                });
            };
            columns[col].push(Some(v));
        }
    }

    Ok(CuratedTable {
        names: wanted.into_iter().map(|(n, _)| n).collect(),
        columns,
        groups,
    })
}

/// Correlates every value column with every flag column.
pub fn value_flag_pairs(
    table: &CuratedTable,
    value_columns: &[String],
    flag_columns: &[String],
) -> Vec<PairCorrelation> {
    let mut pairs = Vec::new();
    for value in value_columns {
        let Some(xs) = table.column(value) else { continue };
        for flag in flag_columns {
            let Some(ys) = table.column(flag) else { continue };
            pairs.push(PairCorrelation {
                value: value.clone(),
                flag: flag.clone(),
                stats: pearson(xs, ys),
            });
        }
    }
    pairs
}

/// Full pairwise matrix over every loaded column.
pub fn correlation_matrix(table: &CuratedTable) -> CorrelationMatrix {
    let k = table.names.len();
    let mut r = vec![vec![f64::NAN; k]; k];
    let mut n = vec![vec![0; k]; k];

    for i in 0..k {
        for j in i..k {
            let stats = pearson(&table.columns[i], &table.columns[j]);
            r[i][j] = stats.r;
            r[j][i] = stats.r;
            n[i][j] = stats.n;
            n[j][i] = stats.n;
        }
    }

    CorrelationMatrix {
        names: table.names.clone(),
        r,
        n,
    }
}

/// Counts rows per group whose `flag` is false. Every group appears, even
/// with a zero count. `None` if the table has no groups or lacks `flag`.
pub fn false_flag_counts(table: &CuratedTable, flag: &str) -> Option<BTreeMap<String, usize>> {
    let groups = table.groups()?;
    let values = table.column(flag)?;

    let mut counts = BTreeMap::new();
    for (group, value) in groups.iter().zip(values) {
        let count = counts.entry(group.clone()).or_insert(0);
        if *value == Some(0.0) {
            *count += 1;
        }
    }
    Some(counts)
}

/// Logs the number of items without `flag` per group.
pub fn log_false_flag_counts(flag: &str, counts: &BTreeMap<String, usize>) {
    for (group, count) in counts {
        info!(group = %group, flag, count, "Items without flag");
    }
}

/// Logs each pair, marking `p < 0.05` with `*`.
pub fn log_pairs(pairs: &[PairCorrelation]) {
    for pair in pairs {
        let sig = if pair.stats.is_significant(ALPHA) { "*" } else { "" };
        info!(
            value = %pair.value,
            flag = %pair.flag,
            r = pair.stats.r,
            p = pair.stats.p,
            n = pair.stats.n,
            sig,
            "Correlation"
        );
    }
}
