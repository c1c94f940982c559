//! Attaches pickup and dropoff borough/zone names from the zone lookup.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::types::{TripTable, Zone, ZoneLookup};

pub const ZONE_COLUMNS: &[&str] = &[
    "pickup_borough",
    "pickup_zone",
    "dropoff_borough",
    "dropoff_zone",
];

/// Indexes the lookup by location id.
///
/// # Errors
///
/// Returns [`PipelineError::LookupIntegrity`] if any id appears on more than
/// one row.
pub fn index_zones(zones: &ZoneLookup) -> Result<HashMap<i64, &Zone>> {
    let mut counts: HashMap<i64, usize> = HashMap::new();
    for zone in zones.zones() {
        *counts.entry(zone.location_id).or_default() += 1;
    }

    if let Some((&location_id, &count)) = counts
        .iter()
        .filter(|(_, count)| **count > 1)
        .min_by_key(|(id, _)| **id)
    {
        return Err(PipelineError::LookupIntegrity { location_id, count });
    }

    Ok(zones
        .zones()
        .iter()
        .map(|zone| (zone.location_id, zone))
        .collect())
}

/// Left-joins trips to zones on pickup and on dropoff location id.
///
/// Every input row yields exactly one output row; an id with no zone leaves
/// that side's borough and zone as `None`.
#[tracing::instrument(skip_all, fields(rows = trips.len(), zones = zones.len()))]
pub fn merge(trips: &TripTable, zones: &ZoneLookup) -> Result<TripTable> {
    let index = index_zones(zones)?;
    let lookup = |id: Option<i64>| id.and_then(|id| index.get(&id).copied());

    let mut unmatched_pickup = 0usize;
    let mut unmatched_dropoff = 0usize;

    let rows = trips
        .rows()
        .iter()
        .map(|trip| {
            let mut out = trip.clone();

            let pickup = lookup(trip.pickup_location_id);
            if pickup.is_none() {
                unmatched_pickup += 1;
            }
            out.pickup_borough = pickup.and_then(|z| z.borough.clone());
            out.pickup_zone = pickup.and_then(|z| z.zone.clone());

            let dropoff = lookup(trip.dropoff_location_id);
            if dropoff.is_none() {
                unmatched_dropoff += 1;
            }
            out.dropoff_borough = dropoff.and_then(|z| z.borough.clone());
            out.dropoff_zone = dropoff.and_then(|z| z.zone.clone());

            out
        })
        .collect::<Vec<_>>();

    if unmatched_pickup > 0 || unmatched_dropoff > 0 {
        warn!(unmatched_pickup, unmatched_dropoff, "Trips with unknown location ids");
    }
    info!(rows = rows.len(), "Zone merge complete");

    Ok(trips.derive(ZONE_COLUMNS, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TripRecord;

    fn zone(id: i64, borough: &str, name: &str) -> Zone {
        Zone {
            location_id: id,
            borough: Some(borough.to_string()),
            zone: Some(name.to_string()),
            service_zone: Some("Boro Zone".to_string()),
        }
    }

    fn lookup() -> ZoneLookup {
        ZoneLookup::new(vec![
            zone(132, "Queens", "JFK Airport"),
            zone(236, "Manhattan", "Upper East Side North"),
        ])
    }

    fn trip(pickup: i64, dropoff: i64) -> TripRecord {
        TripRecord {
            pickup_location_id: Some(pickup),
            dropoff_location_id: Some(dropoff),
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_attaches_both_sides() {
        let table = TripTable::from_records(vec![trip(132, 236)]);
        let merged = merge(&table, &lookup()).unwrap();
        let row = &merged.rows()[0];

        assert_eq!(row.pickup_borough.as_deref(), Some("Queens"));
        assert_eq!(row.pickup_zone.as_deref(), Some("JFK Airport"));
        assert_eq!(row.dropoff_borough.as_deref(), Some("Manhattan"));
        assert_eq!(row.dropoff_zone.as_deref(), Some("Upper East Side North"));
    }

    #[test]
    fn test_merge_unmatched_ids_are_none() {
        let table = TripTable::from_records(vec![trip(999, 236), trip(132, 998)]);
        let merged = merge(&table, &lookup()).unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(merged.rows()[0].pickup_borough, None);
        assert_eq!(merged.rows()[0].pickup_zone, None);
        assert_eq!(merged.rows()[0].dropoff_borough.as_deref(), Some("Manhattan"));
        assert_eq!(merged.rows()[1].dropoff_zone, None);
    }

    #[test]
    fn test_merge_with_empty_lookup_keeps_rows() {
        let table = TripTable::from_records(vec![trip(1, 2), trip(3, 4), trip(5, 6)]);
        let merged = merge(&table, &ZoneLookup::default()).unwrap();

        assert_eq!(merged.len(), 3);
        assert!(merged.rows().iter().all(|r| r.pickup_borough.is_none()));
    }

    #[test]
    fn test_merge_overwrites_stale_zone_columns() {
        let mut stale = trip(132, 999);
        stale.dropoff_zone = Some("Old Name".to_string());
        let merged = merge(&TripTable::from_records(vec![stale]), &lookup()).unwrap();

        assert_eq!(merged.rows()[0].dropoff_zone, None);
    }

    #[test]
    fn test_merge_duplicate_zone_id_is_integrity_error() {
        let zones = ZoneLookup::new(vec![
            zone(132, "Queens", "JFK Airport"),
            zone(132, "Queens", "JFK Terminal 4"),
        ]);
        let err = merge(&TripTable::from_records(vec![trip(132, 132)]), &zones).unwrap_err();

        assert!(matches!(
            err,
            PipelineError::LookupIntegrity {
                location_id: 132,
                count: 2
            }
        ));
    }

    #[test]
    fn test_merge_adds_zone_columns() {
        let merged = merge(&TripTable::from_records(vec![]), &lookup()).unwrap();
        for column in ZONE_COLUMNS {
            assert!(merged.has_column(column));
        }
    }
}
