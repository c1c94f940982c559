//! Removes duplicate, incomplete and impossible trips.
//!
//! Stages run in a fixed order and each one only sees rows that survived the
//! previous stages, so a dropped row lands in exactly one rejection log.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::reject::{RejectSink, RejectStage, RejectionLog};
use crate::types::{TIMESTAMP_FORMAT, TripRecord, TripTable};

/// Columns a trip table must carry before it can be cleaned.
pub const REQUIRED_COLUMNS: &[&str] = &[
    "tpep_pickup_datetime",
    "tpep_dropoff_datetime",
    "passenger_count",
    "trip_distance",
    "fare_amount",
    "PULocationID",
    "DOLocationID",
];

/// Column added by the cleaner.
pub const DURATION_COLUMN: &str = "trip_duration_min";

/// Cleans `trips`, sending every dropped row to `sink`.
///
/// The input table is left untouched.
///
/// # Errors
///
/// Returns [`PipelineError::Schema`] if a required column is absent from the
/// table, or any error raised by the sink.
#[tracing::instrument(skip_all, fields(rows = trips.len()))]
pub fn clean<S: RejectSink + ?Sized>(trips: &TripTable, sink: &mut S) -> Result<TripTable> {
    for column in REQUIRED_COLUMNS {
        if !trips.has_column(column) {
            return Err(PipelineError::Schema {
                table: "trip",
                column: column.to_string(),
            });
        }
    }

    let initial = trips.len();
    let rows = trips.rows().to_vec();

    let rows = drop_rows(rows, sink, RejectStage::Duplicates, {
        let mut seen = HashSet::new();
        move |trip: &TripRecord| seen.insert(trip.row_key())
    })?;

    let rows = drop_rows(rows, sink, RejectStage::MissingValues, has_required_values)?;

    let rows = drop_rows(rows, sink, RejectStage::InvalidValues, |trip: &TripRecord| {
        trip.trip_distance.is_some_and(is_positive) && trip.fare_amount.is_some_and(is_positive)
    })?;

    let rows: Vec<TripRecord> = rows.into_iter().map(standardise_times).collect();

    let rows = drop_rows(rows, sink, RejectStage::InvalidDuration, |trip: &TripRecord| {
        trip.trip_duration_min.is_some_and(|d| d > 0.0)
    })?;

    info!(input = initial, kept = rows.len(), "Cleaning complete");
    Ok(trips.derive(&[DURATION_COLUMN], rows))
}

/// Cleans `trips` into an in-memory [`RejectionLog`].
pub fn clean_with_log(trips: &TripTable) -> Result<(TripTable, RejectionLog)> {
    let mut log = RejectionLog::new();
    let cleaned = clean(trips, &mut log)?;
    Ok((cleaned, log))
}

/// Splits `rows` on `keep`, records the rejected side and returns the rest.
fn drop_rows<S, F>(
    rows: Vec<TripRecord>,
    sink: &mut S,
    stage: RejectStage,
    mut keep: F,
) -> Result<Vec<TripRecord>>
where
    S: RejectSink + ?Sized,
    F: FnMut(&TripRecord) -> bool,
{
    let (kept, rejected): (Vec<_>, Vec<_>) = rows.into_iter().partition(|trip| keep(trip));

    if rejected.is_empty() {
        debug!(stage = stage.name(), "No rows dropped");
    } else {
        info!(stage = stage.name(), dropped = rejected.len(), "Dropped rows");
        sink.record(stage, &rejected)?;
    }

    Ok(kept)
}

fn has_required_values(trip: &TripRecord) -> bool {
    trip.tpep_pickup_datetime.is_some()
        && trip.tpep_dropoff_datetime.is_some()
        && trip.passenger_count.is_some()
        && trip.trip_distance.is_some_and(|d| !d.is_nan())
        && trip.fare_amount.is_some_and(|f| !f.is_nan())
        && trip.pickup_location_id.is_some()
        && trip.dropoff_location_id.is_some()
}

/// Finite and strictly above zero. `inf` cells parse as floats and end up here.
fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Rewrites parseable timestamps in canonical form and computes the duration.
///
/// A timestamp that does not parse leaves the duration unset, which the next
/// stage treats the same as a non-positive duration.
fn standardise_times(mut trip: TripRecord) -> TripRecord {
    let pickup = trip.pickup_time();
    let dropoff = trip.dropoff_time();

    if let Some(ts) = pickup {
        trip.tpep_pickup_datetime = Some(ts.format(TIMESTAMP_FORMAT).to_string());
    }
    if let Some(ts) = dropoff {
        trip.tpep_dropoff_datetime = Some(ts.format(TIMESTAMP_FORMAT).to_string());
    }

    trip.trip_duration_min = match (pickup, dropoff) {
        (Some(start), Some(end)) => Some((end - start).num_milliseconds() as f64 / 60_000.0),
        _ => None,
    };
    trip
}
