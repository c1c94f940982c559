use std::collections::HashMap;

use crate::types::TripRecord;

/// Trip count per pickup borough. `None` collects trips whose pickup
/// location had no zone.
pub fn counts_by_borough(trips: &[TripRecord]) -> HashMap<Option<String>, usize> {
    let mut counts = HashMap::new();
    for trip in trips {
        *counts.entry(trip.pickup_borough.clone()).or_insert(0) += 1;
    }
    counts
}

/// Trip count per pickup zone, in order of first appearance.
///
/// Trips without a pickup zone are skipped.
pub fn pickup_zone_counts(trips: &[TripRecord]) -> Vec<(String, usize)> {
    let mut position: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();

    for zone in trips.iter().filter_map(|t| t.pickup_zone.as_deref()) {
        match position.get(zone) {
            Some(&idx) => counts[idx].1 += 1,
            None => {
                position.insert(zone, counts.len());
                counts.push((zone.to_string(), 1));
            }
        }
    }

    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_borough(borough: Option<&str>) -> TripRecord {
        TripRecord {
            pickup_borough: borough.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_counts_by_borough_with_unknown_bucket() {
        let trips = vec![
            from_borough(Some("Queens")),
            from_borough(Some("Bronx")),
            from_borough(Some("Queens")),
            from_borough(None),
            from_borough(Some("Bronx")),
            from_borough(Some("Queens")),
        ];

        let counts = counts_by_borough(&trips);
        assert_eq!(counts.len(), 3);
        assert_eq!(counts[&Some("Queens".to_string())], 3);
        assert_eq!(counts[&Some("Bronx".to_string())], 2);
        assert_eq!(counts[&None], 1);
    }

    #[test]
    fn test_counts_by_borough_empty() {
        assert!(counts_by_borough(&[]).is_empty());
    }

    #[test]
    fn test_pickup_zone_counts_first_seen_order() {
        let trips: Vec<_> = ["B", "A", "B", "C"]
            .iter()
            .map(|z| TripRecord {
                pickup_zone: Some(z.to_string()),
                ..Default::default()
            })
            .collect();

        let counts = pickup_zone_counts(&trips);
        assert_eq!(
            counts,
            vec![
                ("B".to_string(), 2),
                ("A".to_string(), 1),
                ("C".to_string(), 1)
            ]
        );
    }
}
