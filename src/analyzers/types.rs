//! Data types used by the summary and correlation stages.

use serde::Serialize;

/// One row of `Descriptives.csv`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Descriptive {
    #[serde(rename = "Game")]
    pub game: String,
    #[serde(rename = "Mean")]
    pub mean: f64,
    #[serde(rename = "SD")]
    pub sd: f64,
}

/// Pearson statistics for one pair of columns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pearson {
    pub r: f64,
    /// Two-sided p-value against the null of zero correlation.
    pub p: f64,
    /// Rows where both columns had a value.
    pub n: usize,
}

impl Pearson {
    pub fn undefined(n: usize) -> Self {
        Self {
            r: f64::NAN,
            p: f64::NAN,
            n,
        }
    }

    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p < alpha
    }
}

/// Correlation between a value column and a flag column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairCorrelation {
    pub value: String,
    pub flag: String,
    pub stats: Pearson,
}

/// Square matrix of pairwise correlations over the selected columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub names: Vec<String>,
    pub r: Vec<Vec<f64>>,
    pub n: Vec<Vec<usize>>,
}

impl CorrelationMatrix {
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
