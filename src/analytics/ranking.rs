use std::cmp::Ordering;

use crate::analytics::counts::pickup_zone_counts;
use crate::types::TripRecord;

/// Returns the first `n` items after a stable sort by `cmp`.
///
/// Equal items keep their input order, so the result always matches a full
/// stable sort truncated to `n`.
pub fn top_k_by<T, F>(mut items: Vec<T>, n: usize, cmp: F) -> Vec<T>
where
    F: FnMut(&T, &T) -> Ordering,
{
    if n == 0 {
        return Vec::new();
    }
    items.sort_by(cmp);
    items.truncate(n);
    items
}

/// The `n` trips with the largest `total_amount`, highest first.
///
/// A missing or NaN amount ranks below every real amount.
pub fn top_earning_trips(trips: &[TripRecord], n: usize) -> Vec<TripRecord> {
    top_k_by(trips.to_vec(), n, |a, b| {
        amount_key(b.total_amount).total_cmp(&amount_key(a.total_amount))
    })
}

/// The `n` pickup zones with the most trips, busiest first.
///
/// Trips without a pickup zone are not counted. Zones with equal counts keep
/// the order in which they first appear in `trips`.
pub fn busiest_zones(trips: &[TripRecord], n: usize) -> Vec<(String, usize)> {
    top_k_by(pickup_zone_counts(trips), n, |a, b| b.1.cmp(&a.1))
}

fn amount_key(amount: Option<f64>) -> f64 {
    match amount {
        Some(v) if v.is_nan() => f64::NEG_INFINITY,
        // -0.0 and 0.0 are equal amounts and must tie
        Some(v) if v == 0.0 => 0.0,
        Some(v) => v,
        None => f64::NEG_INFINITY,
    }
}
