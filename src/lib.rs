pub mod align;
pub mod analyzers;
pub mod batch;
pub mod config;
pub mod errors;
pub mod output;
pub mod parser;
pub mod profile;
pub mod series;
pub mod stats;
pub mod timezone;
