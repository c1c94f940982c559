//! Writing processed trips, run history and analytics results.
//!
//! Supports CSV (optionally gzip-compressed), CSV append, and JSON.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use csv::WriterBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::types::TripTable;

/// Writes `value` to stdout as pretty-printed JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, value)?;
    writeln!(handle)?;
    Ok(())
}

/// Appends a record as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record<T: Serialize>(path: impl AsRef<Path>, record: &T) -> Result<()> {
    let path = path.as_ref();
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, "Appending CSV record");

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // header only on a fresh file
        .from_writer(file);

    writer.serialize(record)?;
    writer.flush()?;

    Ok(())
}

/// Writes the whole table as CSV, gzip-compressed when `path` ends in `.gz`.
///
/// Replaces any existing file.
pub fn write_trips(path: impl AsRef<Path>, trips: &TripTable) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let file = BufWriter::new(File::create(path)?);
    let gzip = path.extension().and_then(|e| e.to_str()) == Some("gz");

    if gzip {
        let encoder = write_rows(GzEncoder::new(file, Compression::default()), trips)?;
        encoder.finish()?.flush()?;
    } else {
        write_rows(file, trips)?.flush()?;
    }

    info!(path = %path.display(), rows = trips.len(), gzip, "Saved processed trips");
    Ok(())
}

fn write_rows<W: Write>(inner: W, trips: &TripTable) -> Result<W> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(inner);
    for row in trips.rows() {
        writer.serialize(row)?;
    }
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| io::Error::other(e.to_string()).into())
}
