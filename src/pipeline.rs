//! Runs the cleaning, feature and zone stages in order.

use tracing::info;

use crate::clean::clean;
use crate::enrich::enrich;
use crate::error::Result;
use crate::merge::merge;
use crate::reject::RejectSink;
use crate::stats::{CountingSink, PipelineStats};
use crate::types::{TripTable, ZoneLookup};

/// Final table plus the run summary.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub trips: TripTable,
    pub stats: PipelineStats,
}

/// Cleans, enriches and zone-merges `trips`.
///
/// Rejected rows go to `sink`. Errors from any stage are returned as-is;
/// there is no partial output.
#[tracing::instrument(skip_all, fields(rows = trips.len()))]
pub fn run<S: RejectSink + ?Sized>(
    trips: &TripTable,
    zones: &ZoneLookup,
    sink: &mut S,
) -> Result<PipelineOutput> {
    let mut stats = PipelineStats::new(trips.len());

    let cleaned = {
        let mut counting = CountingSink {
            inner: sink,
            stats: &mut stats,
        };
        clean(trips, &mut counting)?
    };
    let enriched = enrich(&cleaned)?;
    let merged = merge(&enriched, zones)?;

    stats.record_output(&merged);
    info!(
        input = stats.input_rows,
        output = stats.output_rows,
        rejected = stats.total_rejected(),
        retained_pct = stats.retained_pct(),
        "Pipeline finished"
    );

    Ok(PipelineOutput {
        trips: merged,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::read_trips;
    use crate::reject::{RejectStage, RejectionLog};
    use crate::types::{TripRecord, Zone};

    fn trip(pickup_loc: i64, distance: f64) -> TripRecord {
        TripRecord {
            tpep_pickup_datetime: Some("2019-01-01 08:00:00".to_string()),
            tpep_dropoff_datetime: Some("2019-01-01 08:20:00".to_string()),
            passenger_count: Some(1),
            trip_distance: Some(distance),
            fare_amount: Some(12.0),
            pickup_location_id: Some(pickup_loc),
            dropoff_location_id: Some(1),
            total_amount: Some(15.0),
            ..Default::default()
        }
    }

    fn zones() -> ZoneLookup {
        ZoneLookup::new(vec![Zone {
            location_id: 1,
            borough: Some("EWR".to_string()),
            zone: Some("Newark Airport".to_string()),
            service_zone: Some("EWR".to_string()),
        }])
    }

    #[test]
    fn test_run_end_to_end() {
        let table = TripTable::from_records(vec![trip(1, 4.0), trip(7, 2.0), trip(1, 0.0)]);
        let mut log = RejectionLog::new();
        let out = run(&table, &zones(), &mut log).unwrap();

        assert_eq!(out.trips.len(), 2);
        assert_eq!(out.stats.input_rows, 3);
        assert_eq!(out.stats.invalid_values, 1);
        assert_eq!(out.stats.output_rows, 2);
        assert_eq!(out.stats.without_pickup_zone, 1);
        assert_eq!(out.stats.without_dropoff_zone, 0);
        assert_eq!(log.count(RejectStage::InvalidValues), 1);

        let first = &out.trips.rows()[0];
        assert_eq!(first.pickup_hour, Some(8));
        assert!((first.avg_speed_mph.unwrap() - 12.0).abs() < 1e-9);
        assert_eq!(first.pickup_zone.as_deref(), Some("Newark Airport"));
    }

    #[test]
    fn test_run_rows_are_conserved() {
        let table = TripTable::from_records(vec![trip(1, 4.0), trip(1, 4.0), trip(1, -1.0)]);
        let mut log = RejectionLog::new();
        let out = run(&table, &zones(), &mut log).unwrap();

        assert_eq!(out.stats.output_rows + out.stats.total_rejected(), table.len());
        assert_eq!(log.total(), out.stats.total_rejected());
    }

    #[test]
    fn test_run_filters_infinite_cells() {
        let data = "\
tpep_pickup_datetime,tpep_dropoff_datetime,passenger_count,trip_distance,fare_amount,PULocationID,DOLocationID,total_amount
2019-01-01 08:00:00,2019-01-01 08:20:00,1,2.0,inf,1,1,15.0
2019-01-01 08:00:00,2019-01-01 08:20:00,1,infinity,12.0,1,1,15.0
2019-01-01 08:00:00,2019-01-01 08:20:00,1,-inf,12.0,1,1,15.0
2019-01-01 08:00:00,2019-01-01 08:20:00,1,4.0,12.0,1,1,15.0
";
        let table = read_trips(data.as_bytes()).unwrap();
        assert_eq!(table.rows()[0].fare_amount, Some(f64::INFINITY));

        let mut log = RejectionLog::new();
        let out = run(&table, &zones(), &mut log).unwrap();

        assert_eq!(out.trips.len(), 1);
        assert_eq!(log.count(RejectStage::InvalidValues), 3);
        let row = &out.trips.rows()[0];
        assert!(row.avg_speed_mph.is_some_and(f64::is_finite));
        assert!(row.fare_per_mile.is_some_and(f64::is_finite));
    }
}
