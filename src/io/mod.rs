//! Persistence of waveforms (miniSEED 2.4) and station metadata (StationXML 1.1).

use crate::data_container::Stream;
use crate::error::ExplorerResult;
use crate::inventory::Inventory;
use log::info;
use std::fs;
use std::path::Path;

pub mod mseed;
pub mod stationxml;
pub mod steim;

pub use mseed::{Encoding, WriteOptions};

/// Writes `stream` as miniSEED, one record sequence per trace.
pub fn write_stream(
    path: impl AsRef<Path>,
    stream: &Stream,
    options: &WriteOptions,
) -> ExplorerResult<()> {
    let path = path.as_ref();
    let bytes = mseed::write_to_bytes(stream, options)?;
    fs::write(path, &bytes)?;
    info!(
        "wrote {} trace(s), {} bytes to {}",
        stream.len(),
        bytes.len(),
        path.display()
    );
    Ok(())
}

/// Reads a miniSEED file. Contiguous records of one channel are joined into one trace.
pub fn read_stream(path: impl AsRef<Path>) -> ExplorerResult<Stream> {
    let path = path.as_ref();
    let stream = mseed::read_from_bytes(&fs::read(path)?)?;
    info!("read {} trace(s) from {}", stream.len(), path.display());
    Ok(stream)
}

pub fn write_inventory(path: impl AsRef<Path>, inventory: &Inventory) -> ExplorerResult<()> {
    let path = path.as_ref();
    fs::write(path, stationxml::write_to_string(inventory)?)?;
    info!(
        "wrote {} channel(s) to {}",
        inventory.channel_count(),
        path.display()
    );
    Ok(())
}

pub fn read_inventory(path: impl AsRef<Path>) -> ExplorerResult<Inventory> {
    let path = path.as_ref();
    let inventory = stationxml::read_from_str(&fs::read_to_string(path)?)?;
    info!(
        "read {} station(s) from {}",
        inventory.station_count(),
        path.display()
    );
    Ok(inventory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_container::{Samples, Trace, TraceId};
    use crate::error::ExplorerError;
    use crate::inventory::tests::{channel, inventory};
    use crate::response::tests::geophone_response;
    use chrono::{TimeZone, Utc};
    use ndarray::Array1;

    #[test]
    fn test_stream_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("AXAS1.mseed");
        let trace = Trace::new(
            TraceId::new("OO", "AXAS1", "", "EHZ"),
            Utc.with_ymd_and_hms(2019, 11, 1, 12, 30, 15).unwrap()
                + chrono::Duration::microseconds(123_456),
            200.0,
            Samples::Int32(Array1::from_shape_fn(5000, |i| ((i * 37) % 1001) as i32 - 500)),
        );
        let stream = Stream::new(vec![trace.clone()]);
        write_stream(&path, &stream, &WriteOptions::default()).unwrap();
        let read = read_stream(&path).unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read.traces[0].id, trace.id);
        assert_eq!(read.traces[0].starttime, trace.starttime);
        assert_eq!(read.traces[0].data, trace.data);
    }

    #[test]
    fn test_inventory_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("AXAS1.xml");
        let mut metadata = inventory(vec![channel("", "EHZ", 2016, None)]);
        metadata.networks[0].stations[0].channels[0].response = Some(geophone_response());
        write_inventory(&path, &metadata).unwrap();
        let read = read_inventory(&path).unwrap();
        assert_eq!(read.channel_count(), 1);
        assert_eq!(read.response_count(), 1);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_stream(dir.path().join("missing.mseed")),
            Err(ExplorerError::Io(_))
        ));
    }
}
