//! Error types for the trip pipeline.
//!
//! Structural and contract violations are raised as [`PipelineError`].
//! Bad individual values found while cleaning are not errors: they are
//! filtered out and handed to a rejection sink instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("required column `{column}` is missing from the {table} table")]
    Schema { table: &'static str, column: String },

    #[error("precondition violated at row {row}: {reason}")]
    Precondition { row: usize, reason: String },

    #[error("zone lookup has {count} rows for location id {location_id}")]
    LookupIntegrity { location_id: i64, count: usize },

    #[error("unsupported input format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid input source `{source_name}`: {reason}")]
    InvalidSource { source_name: String, reason: String },

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("parquet error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP fetch failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl PipelineError {
    pub(crate) fn precondition(row: usize, reason: impl Into<String>) -> Self {
        PipelineError::Precondition {
            row,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
