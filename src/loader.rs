//! Reads trip and zone lookup files into typed tables.
//!
//! Trip files are CSV (optionally gzip-compressed) or parquet, from disk or
//! over HTTP.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use flate2::read::GzDecoder;
use tracing::info;

mod parquet;

pub use parquet::{open_parquet, read_parquet};

use crate::error::{PipelineError, Result};
use crate::fetch::{TripFileClient, fetch_bytes, is_remote};
use crate::types::{TripRecord, TripTable, Zone, ZoneLookup};

/// Encoding of a trip file, chosen from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    GzipCsv,
    Parquet,
}

impl InputFormat {
    /// Picks the format for a path or URL. Query strings are ignored.
    pub fn detect(source: &str) -> Result<Self> {
        let name = source
            .split(['?', '#'])
            .next()
            .unwrap_or(source)
            .to_lowercase();

        if name.ends_with(".csv") {
            Ok(InputFormat::Csv)
        } else if name.ends_with(".csv.gz") || name.ends_with(".gz") {
            Ok(InputFormat::GzipCsv)
        } else if name.ends_with(".parquet") {
            Ok(InputFormat::Parquet)
        } else {
            Err(PipelineError::UnsupportedFormat(source.to_string()))
        }
    }

    fn read<R: Read>(&self, mut reader: R) -> Result<TripTable> {
        match self {
            InputFormat::Csv => read_trips(reader),
            InputFormat::GzipCsv => read_trips(GzDecoder::new(reader)),
            InputFormat::Parquet => {
                let mut bytes = Vec::new();
                reader.read_to_end(&mut bytes)?;
                read_parquet(&bytes)
            }
        }
    }
}

/// Parses CSV trip data with a header row.
///
/// The returned table remembers which columns the header carried; cells that
/// are blank or do not parse load as missing values.
pub fn read_trips<R: Read>(reader: R) -> Result<TripTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);

    let columns = rdr.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let record: TripRecord = result?;
        rows.push(record);
    }

    Ok(TripTable::new(columns, rows))
}

/// Parses the zone lookup CSV.
///
/// # Errors
///
/// Returns [`PipelineError::Schema`] if the header has no `LocationID`.
pub fn read_zones<R: Read>(reader: R) -> Result<ZoneLookup> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);

    if !rdr.headers()?.iter().any(|h| h == "LocationID") {
        return Err(PipelineError::Schema {
            table: "zone",
            column: "LocationID".to_string(),
        });
    }

    let mut zones = Vec::new();
    for result in rdr.deserialize() {
        let zone: Zone = result?;
        zones.push(zone);
    }

    Ok(ZoneLookup::new(zones))
}

/// Reads a trip file from disk.
pub fn open_trips(path: impl AsRef<Path>) -> Result<TripTable> {
    let path = path.as_ref();
    let table = match InputFormat::detect(&path.to_string_lossy())? {
        InputFormat::Parquet => open_parquet(path)?,
        format => format.read(BufReader::new(File::open(path)?))?,
    };

    info!(
        path = %path.display(),
        rows = table.len(),
        columns = table.columns().len(),
        "Loaded trip data"
    );
    Ok(table)
}

/// Loads trips from a local path or an `http(s)` URL.
#[tracing::instrument(skip_all, fields(source = %source))]
pub async fn load_trips(source: &str) -> Result<TripTable> {
    if !is_remote(source) {
        return open_trips(source);
    }

    let format = InputFormat::detect(source)?;
    let client = TripFileClient::new()?;
    let bytes = fetch_bytes(&client, source).await?;
    let table = format.read(bytes.as_slice())?;

    info!(
        rows = table.len(),
        columns = table.columns().len(),
        "Loaded trip data"
    );
    Ok(table)
}

/// Reads the taxi zone lookup CSV from disk.
pub fn load_zone_lookup(path: impl AsRef<Path>) -> Result<ZoneLookup> {
    let path = path.as_ref();
    let file = BufReader::new(File::open(path)?);
    let zones = read_zones(file)?;

    info!(path = %path.display(), rows = zones.len(), "Loaded zone lookup");
    Ok(zones)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    const TRIPS: &str = "\
VendorID,tpep_pickup_datetime,tpep_dropoff_datetime,passenger_count,trip_distance,RatecodeID,store_and_fwd_flag,PULocationID,DOLocationID,payment_type,fare_amount,extra,mta_tax,tip_amount,tolls_amount,improvement_surcharge,total_amount,congestion_surcharge
1,2019-01-01 00:46:40,2019-01-01 00:53:20,1,1.5,1,N,151,239,1,7,0.5,0.5,1.65,0,0.3,9.95,
2,2019-01-01 00:59:47,2019-01-01 01:18:59,,2.6,1,N,239,246,1,14,0.5,0.5,1,0,0.3,16.3,
";

    #[test]
    fn test_read_trips_typed_columns() {
        let table = read_trips(TRIPS.as_bytes()).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.columns().len(), TripRecord::RAW_COLUMNS.len());
        let first = &table.rows()[0];
        assert_eq!(first.vendor_id, Some(1));
        assert_eq!(first.pickup_location_id, Some(151));
        assert_eq!(first.total_amount, Some(9.95));
        assert_eq!(first.congestion_surcharge, None);
        assert_eq!(table.rows()[1].passenger_count, None);
    }

    #[test]
    fn test_read_trips_records_missing_columns() {
        let data = "tpep_pickup_datetime,trip_distance\n2019-01-01 00:00:00,1.0\n";
        let table = read_trips(data.as_bytes()).unwrap();

        assert!(table.has_column("trip_distance"));
        assert!(!table.has_column("fare_amount"));
        assert_eq!(table.rows()[0].fare_amount, None);
    }

    #[test]
    fn test_read_zones() {
        let data = "\"LocationID\",\"Borough\",\"Zone\",\"service_zone\"\n\
                    1,\"EWR\",\"Newark Airport\",\"EWR\"\n\
                    264,\"Unknown\",\"NV\",\n";
        let zones = read_zones(data.as_bytes()).unwrap();

        assert_eq!(zones.len(), 2);
        assert_eq!(zones.zones()[0].zone.as_deref(), Some("Newark Airport"));
        assert_eq!(zones.zones()[1].service_zone, None);
    }

    #[test]
    fn test_read_zones_without_location_id() {
        let data = "Borough,Zone\nQueens,Astoria\n";
        let err = read_zones(data.as_bytes()).unwrap_err();
        assert!(matches!(err, PipelineError::Schema { table: "zone", .. }));
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(InputFormat::detect("a/b.CSV").unwrap(), InputFormat::Csv);
        assert_eq!(InputFormat::detect("trips.csv.gz").unwrap(), InputFormat::GzipCsv);
        assert_eq!(
            InputFormat::detect("https://host/trips.csv?sig=abc").unwrap(),
            InputFormat::Csv
        );
        assert_eq!(
            InputFormat::detect("yellow_tripdata_2019-01.parquet").unwrap(),
            InputFormat::Parquet
        );
        assert!(matches!(
            InputFormat::detect("yellow_tripdata_2019-01.feather"),
            Err(PipelineError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_open_trips_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trips.csv.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(TRIPS.as_bytes()).unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();

        let table = open_trips(&path).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_load_zone_lookup_missing_file() {
        let err = load_zone_lookup("does/not/exist.csv").unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
    }

    #[tokio::test]
    async fn test_load_trips_local_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trips.csv");
        std::fs::write(&path, TRIPS).unwrap();

        let table = load_trips(path.to_str().unwrap()).await.unwrap();
        assert_eq!(table.len(), 2);
    }
}
