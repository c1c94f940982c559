//! Serializable result rows for analytics output.

use std::collections::HashMap;

use serde::Serialize;

/// One borough bucket. `borough` is `None` for trips with no pickup zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoroughCount {
    pub borough: Option<String>,
    pub trips: usize,
}

impl BoroughCount {
    /// Flattens a borough map into rows, largest first then by name, with
    /// the unknown bucket after named boroughs of the same size.
    pub fn from_counts(counts: HashMap<Option<String>, usize>) -> Vec<Self> {
        let mut rows: Vec<Self> = counts
            .into_iter()
            .map(|(borough, trips)| BoroughCount { borough, trips })
            .collect();
        rows.sort_by(|a, b| {
            b.trips
                .cmp(&a.trips)
                .then_with(|| a.borough.is_none().cmp(&b.borough.is_none()))
                .then_with(|| a.borough.cmp(&b.borough))
        });
        rows
    }
}

/// One pickup zone and its trip count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneCount {
    pub zone: String,
    pub trips: usize,
}

impl From<(String, usize)> for ZoneCount {
    fn from((zone, trips): (String, usize)) -> Self {
        ZoneCount { zone, trips }
    }
}
