//! Record and table types shared by every pipeline stage.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

/// Canonical timestamp layout written back by the cleaner.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Accepted input layouts. Slash dates are month-first.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M",
];

/// Parses a trip timestamp using the month-first convention.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// One taxi trip as it moves through the pipeline.
///
/// Raw columns keep the TLC header names on the wire. A blank or malformed
/// cell loads as `None`; the cleaner decides what to do with it. Derived
/// columns stay `None` until the stage that owns them runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    #[serde(rename = "VendorID", default, deserialize_with = "lenient_int")]
    pub vendor_id: Option<i64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub tpep_pickup_datetime: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub tpep_dropoff_datetime: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub passenger_count: Option<u32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub trip_distance: Option<f64>,
    #[serde(rename = "RatecodeID", default, deserialize_with = "lenient_int")]
    pub ratecode_id: Option<i64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub store_and_fwd_flag: Option<String>,
    #[serde(rename = "PULocationID", default, deserialize_with = "lenient_int")]
    pub pickup_location_id: Option<i64>,
    #[serde(rename = "DOLocationID", default, deserialize_with = "lenient_int")]
    pub dropoff_location_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub payment_type: Option<i64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub fare_amount: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub extra: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub mta_tax: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub tip_amount: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub tolls_amount: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub improvement_surcharge: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub total_amount: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub congestion_surcharge: Option<f64>,

    // derived by the cleaner
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub trip_duration_min: Option<f64>,

    // derived by the enricher
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub avg_speed_mph: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub fare_per_mile: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub pickup_hour: Option<u32>,

    // derived by the zone merger
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub pickup_borough: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub pickup_zone: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub dropoff_borough: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub dropoff_zone: Option<String>,
}

impl TripRecord {
    /// Column names as they appear in a raw TLC trip file.
    pub const RAW_COLUMNS: &'static [&'static str] = &[
        "VendorID",
        "tpep_pickup_datetime",
        "tpep_dropoff_datetime",
        "passenger_count",
        "trip_distance",
        "RatecodeID",
        "store_and_fwd_flag",
        "PULocationID",
        "DOLocationID",
        "payment_type",
        "fare_amount",
        "extra",
        "mta_tax",
        "tip_amount",
        "tolls_amount",
        "improvement_surcharge",
        "total_amount",
        "congestion_surcharge",
    ];

    pub fn pickup_time(&self) -> Option<NaiveDateTime> {
        self.tpep_pickup_datetime.as_deref().and_then(parse_timestamp)
    }

    pub fn dropoff_time(&self) -> Option<NaiveDateTime> {
        self.tpep_dropoff_datetime.as_deref().and_then(parse_timestamp)
    }

    /// Hashable stand-in for full-row equality. Timestamps compare by the
    /// instant they denote, so cleaning never creates new duplicates.
    pub(crate) fn row_key(&self) -> RowKey {
        RowKey {
            ints: [
                self.vendor_id,
                self.passenger_count.map(i64::from),
                self.ratecode_id,
                self.pickup_location_id,
                self.dropoff_location_id,
                self.payment_type,
                self.pickup_hour.map(i64::from),
            ],
            floats: [
                self.trip_distance,
                self.fare_amount,
                self.extra,
                self.mta_tax,
                self.tip_amount,
                self.tolls_amount,
                self.improvement_surcharge,
                self.total_amount,
                self.congestion_surcharge,
                self.trip_duration_min,
                self.avg_speed_mph,
                self.fare_per_mile,
            ]
            .map(float_bits),
            strings: [
                self.tpep_pickup_datetime.as_deref().map(canonical_time),
                self.tpep_dropoff_datetime.as_deref().map(canonical_time),
                self.store_and_fwd_flag.clone(),
                self.pickup_borough.clone(),
                self.pickup_zone.clone(),
                self.dropoff_borough.clone(),
                self.dropoff_zone.clone(),
            ],
        }
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
pub(crate) struct RowKey {
    ints: [Option<i64>; 7],
    floats: [Option<u64>; 12],
    strings: [Option<String>; 7],
}

fn canonical_time(raw: &str) -> String {
    parse_timestamp(raw)
        .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|| raw.to_string())
}

fn float_bits(value: Option<f64>) -> Option<u64> {
    // 0.0 and -0.0 compare equal
    value.map(|v| if v == 0.0 { 0 } else { v.to_bits() })
}

/// Accepts integer cells written either as `3` or `3.0`. Anything else loads
/// as missing.
fn lenient_int<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    let raw: Option<String> = Option::deserialize(de).unwrap_or(None);
    let Some(raw) = raw else {
        return Ok(None);
    };
    let raw = raw.trim();
    let whole = raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && v.fract() == 0.0)
            .map(|v| v as i64)
    });
    Ok(whole.and_then(|v| T::try_from(v).ok()))
}

/// An ordered batch of trips plus the columns its source carried.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripTable {
    columns: Vec<String>,
    rows: Vec<TripRecord>,
}

impl TripTable {
    /// Builds a table whose source carried exactly `columns`.
    pub fn new(columns: Vec<String>, rows: Vec<TripRecord>) -> Self {
        Self { columns, rows }
    }

    /// Builds a table from in-memory records, assuming every raw column.
    pub fn from_records(rows: Vec<TripRecord>) -> Self {
        let columns = TripRecord::RAW_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn rows(&self) -> &[TripRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns a table with the same schema plus `added` columns and new rows.
    pub(crate) fn derive(&self, added: &[&str], rows: Vec<TripRecord>) -> Self {
        let mut columns = self.columns.clone();
        for name in added {
            if !columns.iter().any(|c| c == name) {
                columns.push(name.to_string());
            }
        }
        Self { columns, rows }
    }
}

/// One row of the taxi zone lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    #[serde(rename = "LocationID")]
    pub location_id: i64,
    #[serde(rename = "Borough", default, deserialize_with = "csv::invalid_option")]
    pub borough: Option<String>,
    #[serde(rename = "Zone", default, deserialize_with = "csv::invalid_option")]
    pub zone: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub service_zone: Option<String>,
}

/// Read-only zone reference data, in load order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneLookup {
    zones: Vec<Zone>,
}

impl ZoneLookup {
    pub fn new(zones: Vec<Zone>) -> Self {
        Self { zones }
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}
