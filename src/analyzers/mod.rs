//! Downstream aggregation over daily profiles.
//!
//! This module summarizes every daily profile into per-item mean and SD,
//! correlates a curated per-item feature table, and renders the correlation
//! matrix as a PNG heatmap and an HTML page.

pub mod correlation;
pub mod descriptives;
pub mod heatmap;
pub mod types;
pub mod utility;
