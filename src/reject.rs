//! Rejection sinks for rows the cleaner drops.
//!
//! Every cleaning stage hands its removed rows to a [`RejectSink`] under its
//! own [`RejectStage`], so a caller can audit why a row vanished.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::types::TripRecord;

/// Cleaning stage that removed a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectStage {
    Duplicates,
    MissingValues,
    InvalidValues,
    InvalidDuration,
}

impl RejectStage {
    pub const ALL: [RejectStage; 4] = [
        RejectStage::Duplicates,
        RejectStage::MissingValues,
        RejectStage::InvalidValues,
        RejectStage::InvalidDuration,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RejectStage::Duplicates => "duplicates",
            RejectStage::MissingValues => "missing_values",
            RejectStage::InvalidValues => "invalid_values",
            RejectStage::InvalidDuration => "invalid_duration",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.log", self.name())
    }
}

/// Destination for rejected rows.
///
/// The cleaner never calls `record` with an empty slice.
pub trait RejectSink {
    fn record(&mut self, stage: RejectStage, rows: &[TripRecord]) -> Result<()>;
}

/// Keeps rejected rows in memory, keyed by stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RejectionLog {
    stages: BTreeMap<RejectStage, Vec<TripRecord>>,
}

impl RejectionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows rejected by `stage`, empty if the stage dropped nothing.
    pub fn rows(&self, stage: RejectStage) -> &[TripRecord] {
        self.stages.get(&stage).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count(&self, stage: RejectStage) -> usize {
        self.rows(stage).len()
    }

    pub fn total(&self) -> usize {
        self.stages.values().map(Vec::len).sum()
    }

    /// Stages that recorded at least one row.
    pub fn stages(&self) -> impl Iterator<Item = RejectStage> + '_ {
        self.stages.keys().copied()
    }
}

impl RejectSink for RejectionLog {
    fn record(&mut self, stage: RejectStage, rows: &[TripRecord]) -> Result<()> {
        self.stages
            .entry(stage)
            .or_default()
            .extend_from_slice(rows);
        Ok(())
    }
}

/// Writes each stage's rows to `<dir>/<stage>.log` as CSV with a header.
///
/// A stage file is overwritten the first time it is written in a run and
/// appended to afterwards.
#[derive(Debug)]
pub struct CsvRejectSink {
    dir: PathBuf,
    written: Vec<RejectStage>,
}

impl CsvRejectSink {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            written: Vec::new(),
        }
    }

    pub fn path_for(&self, stage: RejectStage) -> PathBuf {
        self.dir.join(stage.file_name())
    }
}

impl RejectSink for CsvRejectSink {
    fn record(&mut self, stage: RejectStage, rows: &[TripRecord]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(stage);
        let first_write = !self.written.contains(&stage);

        let file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .append(!first_write)
            .truncate(first_write)
            .open(&path)?;

        let mut writer = WriterBuilder::new()
            .has_headers(first_write)
            .from_writer(file);
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        if first_write {
            self.written.push(stage);
        }
        info!(stage = stage.name(), rows = rows.len(), path = %path.display(), "Logged rejected rows");
        Ok(())
    }
}
