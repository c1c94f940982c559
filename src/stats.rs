use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::reject::{RejectSink, RejectStage};
use crate::types::{TripRecord, TripTable};

/// Summary of one pipeline run, one CSV row per run in the history file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineStats {
    pub timestamp: DateTime<Utc>,
    pub source: Option<String>,
    pub input_rows: usize,

    // rows dropped per cleaning stage
    pub duplicates: usize,
    pub missing_values: usize,
    pub invalid_values: usize,
    pub invalid_duration: usize,

    pub output_rows: usize,
    pub without_pickup_zone: usize,
    pub without_dropoff_zone: usize,
}

impl PipelineStats {
    pub fn new(input_rows: usize) -> Self {
        PipelineStats {
            timestamp: Utc::now(),
            input_rows,
            ..Default::default()
        }
    }

    /// Set the source the trips were loaded from.
    pub fn with_source(mut self, source: &str) -> Self {
        self.source = Some(source.to_string());
        self
    }

    pub fn rejected(&self, stage: RejectStage) -> usize {
        match stage {
            RejectStage::Duplicates => self.duplicates,
            RejectStage::MissingValues => self.missing_values,
            RejectStage::InvalidValues => self.invalid_values,
            RejectStage::InvalidDuration => self.invalid_duration,
        }
    }

    pub fn total_rejected(&self) -> usize {
        RejectStage::ALL.iter().map(|s| self.rejected(*s)).sum()
    }

    pub(crate) fn add_rejected(&mut self, stage: RejectStage, rows: usize) {
        let slot = match stage {
            RejectStage::Duplicates => &mut self.duplicates,
            RejectStage::MissingValues => &mut self.missing_values,
            RejectStage::InvalidValues => &mut self.invalid_values,
            RejectStage::InvalidDuration => &mut self.invalid_duration,
        };
        *slot += rows;
    }

    /// Fill output counts from the final merged table.
    pub(crate) fn record_output(&mut self, merged: &TripTable) {
        self.output_rows = merged.len();
        self.without_pickup_zone = merged
            .rows()
            .iter()
            .filter(|t| t.pickup_zone.is_none())
            .count();
        self.without_dropoff_zone = merged
            .rows()
            .iter()
            .filter(|t| t.dropoff_zone.is_none())
            .count();
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    pub fn retained_pct(&self) -> f64 {
        Self::pct(self.output_rows, self.input_rows)
    }
}

/// Forwards rejected rows to an inner sink while tallying them per stage.
pub(crate) struct CountingSink<'a, S: ?Sized> {
    pub(crate) inner: &'a mut S,
    pub(crate) stats: &'a mut PipelineStats,
}

impl<S: RejectSink + ?Sized> RejectSink for CountingSink<'_, S> {
    fn record(&mut self, stage: RejectStage, rows: &[TripRecord]) -> Result<()> {
        self.stats.add_rejected(stage, rows.len());
        self.inner.record(stage, rows)
    }
}
