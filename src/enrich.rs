//! Derived trip features: average speed, fare per mile and pickup hour.

use chrono::Timelike;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::types::{TripRecord, TripTable};

pub const FEATURE_COLUMNS: &[&str] = &["avg_speed_mph", "fare_per_mile", "pickup_hour"];

/// Adds speed, fare-per-mile and pickup hour to every row of a cleaned table.
///
/// Row count and order are preserved.
///
/// # Errors
///
/// Returns [`PipelineError::Precondition`] for the first row that could not
/// have passed cleaning: a missing, non-positive or infinite duration or
/// distance, a missing fare, or a pickup time that does not parse. Every
/// feature written is finite.
#[tracing::instrument(skip_all, fields(rows = trips.len()))]
pub fn enrich(trips: &TripTable) -> Result<TripTable> {
    let rows = trips
        .rows()
        .iter()
        .enumerate()
        .map(|(idx, trip)| add_features(idx, trip))
        .collect::<Result<Vec<_>>>()?;

    info!(rows = rows.len(), "Features added");
    Ok(trips.derive(FEATURE_COLUMNS, rows))
}

fn add_features(idx: usize, trip: &TripRecord) -> Result<TripRecord> {
    let duration_min = trip
        .trip_duration_min
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| PipelineError::precondition(idx, "trip duration must be positive"))?;
    let distance = trip
        .trip_distance
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| PipelineError::precondition(idx, "trip distance must be positive"))?;
    let fare = trip
        .fare_amount
        .filter(|f| f.is_finite())
        .ok_or_else(|| PipelineError::precondition(idx, "fare amount is missing"))?;
    let pickup = trip
        .pickup_time()
        .ok_or_else(|| PipelineError::precondition(idx, "pickup timestamp does not parse"))?;

    let duration_hours = duration_min / 60.0;

    let mut out = trip.clone();
    out.avg_speed_mph = Some(distance / duration_hours);
    out.fare_per_mile = Some(fare / distance);
    out.pickup_hour = Some(pickup.hour());
    Ok(out)
}
