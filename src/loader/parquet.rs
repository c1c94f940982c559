//! Columnar trip files. TLC publishes its monthly trip data as parquet.

use std::fs::File;
use std::io::Cursor;
use std::mem;
use std::path::Path;

use chrono::DateTime;
use polars::prelude::*;

use crate::error::Result;
use crate::types::{TIMESTAMP_FORMAT, TripRecord, TripTable};

/// Reads a parquet trip file from disk.
pub fn open_parquet(path: &Path) -> Result<TripTable> {
    let df = ParquetReader::new(File::open(path)?).finish()?;
    trips_from_frame(&df)
}

/// Parses parquet trip data held in memory.
pub fn read_parquet(bytes: &[u8]) -> Result<TripTable> {
    let df = ParquetReader::new(Cursor::new(bytes)).finish()?;
    trips_from_frame(&df)
}

/// Maps frame columns onto trip records by header name.
///
/// Absent columns load as missing values, as they do for CSV. Datetime
/// columns are rendered in the canonical timestamp layout.
fn trips_from_frame(df: &DataFrame) -> Result<TripTable> {
    let columns = df
        .get_column_names()
        .iter()
        .map(|c| c.to_string())
        .collect();

    let vendor_id = ints(df, "VendorID")?;
    let mut pickup = timestamps(df, "tpep_pickup_datetime")?;
    let mut dropoff = timestamps(df, "tpep_dropoff_datetime")?;
    let passenger_count = ints(df, "passenger_count")?;
    let trip_distance = floats(df, "trip_distance")?;
    let ratecode_id = ints(df, "RatecodeID")?;
    let mut store_and_fwd_flag = strings(df, "store_and_fwd_flag")?;
    let pickup_location_id = ints(df, "PULocationID")?;
    let dropoff_location_id = ints(df, "DOLocationID")?;
    let payment_type = ints(df, "payment_type")?;
    let fare_amount = floats(df, "fare_amount")?;
    let extra = floats(df, "extra")?;
    let mta_tax = floats(df, "mta_tax")?;
    let tip_amount = floats(df, "tip_amount")?;
    let tolls_amount = floats(df, "tolls_amount")?;
    let improvement_surcharge = floats(df, "improvement_surcharge")?;
    let total_amount = floats(df, "total_amount")?;
    let congestion_surcharge = floats(df, "congestion_surcharge")?;
    let trip_duration_min = floats(df, "trip_duration_min")?;
    let avg_speed_mph = floats(df, "avg_speed_mph")?;
    let fare_per_mile = floats(df, "fare_per_mile")?;
    let pickup_hour = ints(df, "pickup_hour")?;
    let mut pickup_borough = strings(df, "pickup_borough")?;
    let mut pickup_zone = strings(df, "pickup_zone")?;
    let mut dropoff_borough = strings(df, "dropoff_borough")?;
    let mut dropoff_zone = strings(df, "dropoff_zone")?;

    let rows = (0..df.height())
        .map(|i| TripRecord {
            vendor_id: vendor_id[i],
            tpep_pickup_datetime: mem::take(&mut pickup[i]),
            tpep_dropoff_datetime: mem::take(&mut dropoff[i]),
            passenger_count: passenger_count[i].and_then(|v| u32::try_from(v).ok()),
            trip_distance: trip_distance[i],
            ratecode_id: ratecode_id[i],
            store_and_fwd_flag: mem::take(&mut store_and_fwd_flag[i]),
            pickup_location_id: pickup_location_id[i],
            dropoff_location_id: dropoff_location_id[i],
            payment_type: payment_type[i],
            fare_amount: fare_amount[i],
            extra: extra[i],
            mta_tax: mta_tax[i],
            tip_amount: tip_amount[i],
            tolls_amount: tolls_amount[i],
            improvement_surcharge: improvement_surcharge[i],
            total_amount: total_amount[i],
            congestion_surcharge: congestion_surcharge[i],
            trip_duration_min: trip_duration_min[i],
            avg_speed_mph: avg_speed_mph[i],
            fare_per_mile: fare_per_mile[i],
            pickup_hour: pickup_hour[i].and_then(|v| u32::try_from(v).ok()),
            pickup_borough: mem::take(&mut pickup_borough[i]),
            pickup_zone: mem::take(&mut pickup_zone[i]),
            dropoff_borough: mem::take(&mut dropoff_borough[i]),
            dropoff_zone: mem::take(&mut dropoff_zone[i]),
        })
        .collect();

    Ok(TripTable::new(columns, rows))
}

// Casts are non-strict: a value that does not convert becomes null.

fn floats(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let Ok(column) = df.column(name) else {
        return Ok(vec![None; df.height()]);
    };
    let values = column.cast(&DataType::Float64)?;
    Ok(values.f64()?.into_iter().collect())
}

fn ints(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>> {
    let Ok(column) = df.column(name) else {
        return Ok(vec![None; df.height()]);
    };
    let values = column.cast(&DataType::Int64)?;
    Ok(values.i64()?.into_iter().collect())
}

fn strings(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let Ok(column) = df.column(name) else {
        return Ok(vec![None; df.height()]);
    };
    let values = column.cast(&DataType::String)?;
    Ok(values
        .str()?
        .into_iter()
        .map(|v| v.filter(|s| !s.is_empty()).map(str::to_string))
        .collect())
}

fn timestamps(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let Ok(column) = df.column(name) else {
        return Ok(vec![None; df.height()]);
    };
    if !matches!(column.dtype(), DataType::Datetime(..) | DataType::Date) {
        return strings(df, name);
    }

    let micros = column
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?
        .cast(&DataType::Int64)?;
    Ok(micros
        .i64()?
        .into_iter()
        .map(|v| {
            v.and_then(DateTime::from_timestamp_micros)
                .map(|ts| ts.naive_utc().format(TIMESTAMP_FORMAT).to_string())
        })
        .collect())
}
