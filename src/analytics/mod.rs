//! Read-only queries over a merged trip table.
//!
//! None of these mutate their input. Ranking queries are stable: rows or
//! zones with equal keys keep their input order.

pub mod counts;
pub mod ranking;
pub mod types;

pub use counts::{counts_by_borough, pickup_zone_counts};
pub use ranking::{busiest_zones, top_earning_trips, top_k_by};
pub use types::{BoroughCount, ZoneCount};
