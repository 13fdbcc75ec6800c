//! Query parameters of the `fdsnws-station` and `fdsnws-dataselect` services.

use crate::error::{ExplorerError, ExplorerResult};
use crate::timestamp::format_fdsn;
use chrono::{DateTime, Utc};
use std::fmt;

/// Depth of the returned station metadata.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Level {
    Network,
    #[default]
    Station,
    /// Channels without instrument responses.
    Channel,
    Response,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Network => "network",
            Level::Station => "station",
            Level::Channel => "channel",
            Level::Response => "response",
        };
        write!(f, "{name}")
    }
}

/// Geographic rectangle in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

fn location_param(location: &str) -> String {
    if location.is_empty() {
        "--".to_string()
    } else {
        location.to_string()
    }
}

fn check_window(start: Option<&DateTime<Utc>>, end: Option<&DateTime<Utc>>) -> ExplorerResult<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if end <= start {
            return Err(ExplorerError::Validation(format!(
                "end time {} is not after start time {}",
                format_fdsn(end),
                format_fdsn(start)
            )));
        }
    }
    Ok(())
}

fn check_pattern(name: &str, pattern: &str) -> ExplorerResult<()> {
    let valid = pattern
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '*' | '?' | ',' | '-' | '_'));
    if !valid {
        return Err(ExplorerError::Validation(format!(
            "invalid {name} pattern '{pattern}'"
        )));
    }
    Ok(())
}

/// Station metadata query. Patterns accept `*` and `?` wildcards and comma separated lists; an
/// empty location code is sent as `--`.
#[derive(Clone, Debug, PartialEq)]
pub struct StationQuery {
    pub network: String,
    pub station: String,
    pub location: String,
    pub channel: String,
    pub starttime: Option<DateTime<Utc>>,
    pub endtime: Option<DateTime<Utc>>,
    pub level: Level,
    pub bounding_box: Option<BoundingBox>,
}

impl Default for StationQuery {
    fn default() -> Self {
        StationQuery {
            network: "*".to_string(),
            station: "*".to_string(),
            location: "*".to_string(),
            channel: "*".to_string(),
            starttime: None,
            endtime: None,
            level: Level::Station,
            bounding_box: None,
        }
    }
}

impl StationQuery {
    /// Checks the query and renders it as request parameters.
    pub fn params(&self) -> ExplorerResult<Vec<(String, String)>> {
        check_window(self.starttime.as_ref(), self.endtime.as_ref())?;
        check_pattern("network", &self.network)?;
        check_pattern("station", &self.station)?;
        check_pattern("location", &self.location)?;
        check_pattern("channel", &self.channel)?;
        let mut params = vec![
            ("network".to_string(), self.network.clone()),
            ("station".to_string(), self.station.clone()),
            ("location".to_string(), location_param(&self.location)),
            ("channel".to_string(), self.channel.clone()),
        ];
        if let Some(start) = &self.starttime {
            params.push(("starttime".to_string(), format_fdsn(start)));
        }
        if let Some(end) = &self.endtime {
            params.push(("endtime".to_string(), format_fdsn(end)));
        }
        if let Some(bbox) = &self.bounding_box {
            let lat_ok = (-90.0..=90.0).contains(&bbox.min_latitude)
                && (-90.0..=90.0).contains(&bbox.max_latitude)
                && bbox.min_latitude < bbox.max_latitude;
            let lon_ok = (-180.0..=180.0).contains(&bbox.min_longitude)
                && (-180.0..=180.0).contains(&bbox.max_longitude)
                && bbox.min_longitude < bbox.max_longitude;
            if !lat_ok || !lon_ok {
                return Err(ExplorerError::Validation(format!(
                    "invalid bounding box {bbox:?}"
                )));
            }
            params.push(("minlatitude".to_string(), bbox.min_latitude.to_string()));
            params.push(("maxlatitude".to_string(), bbox.max_latitude.to_string()));
            params.push(("minlongitude".to_string(), bbox.min_longitude.to_string()));
            params.push(("maxlongitude".to_string(), bbox.max_longitude.to_string()));
        }
        params.push(("level".to_string(), self.level.to_string()));
        params.push(("format".to_string(), "xml".to_string()));
        Ok(params)
    }
}

/// Waveform query for an explicit time window.
#[derive(Clone, Debug, PartialEq)]
pub struct WaveformQuery {
    pub network: String,
    pub station: String,
    pub location: String,
    pub channel: String,
    pub starttime: DateTime<Utc>,
    pub endtime: DateTime<Utc>,
    /// Fetch response-level metadata and attach it to the returned traces.
    pub attach_response: bool,
}

impl WaveformQuery {
    pub fn new(
        network: &str,
        station: &str,
        location: &str,
        channel: &str,
        starttime: DateTime<Utc>,
        endtime: DateTime<Utc>,
    ) -> Self {
        WaveformQuery {
            network: network.to_string(),
            station: station.to_string(),
            location: location.to_string(),
            channel: channel.to_string(),
            starttime,
            endtime,
            attach_response: false,
        }
    }

    pub fn params(&self) -> ExplorerResult<Vec<(String, String)>> {
        check_window(Some(&self.starttime), Some(&self.endtime))?;
        for (name, pattern) in [
            ("network", &self.network),
            ("station", &self.station),
            ("channel", &self.channel),
        ] {
            if pattern.is_empty() {
                return Err(ExplorerError::Validation(format!("empty {name} pattern")));
            }
            check_pattern(name, pattern)?;
        }
        check_pattern("location", &self.location)?;
        Ok(vec![
            ("network".to_string(), self.network.clone()),
            ("station".to_string(), self.station.clone()),
            ("location".to_string(), location_param(&self.location)),
            ("channel".to_string(), self.channel.clone()),
            ("starttime".to_string(), format_fdsn(&self.starttime)),
            ("endtime".to_string(), format_fdsn(&self.endtime)),
        ])
    }

    /// Station query covering the same channels and window at response level.
    pub fn response_query(&self) -> StationQuery {
        StationQuery {
            network: self.network.clone(),
            station: self.station.clone(),
            location: self.location.clone(),
            channel: self.channel.clone(),
            starttime: Some(self.starttime),
            endtime: Some(self.endtime),
            level: Level::Response,
            bounding_box: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2019, 11, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2019, 11, 2, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_station_params() {
        let (start, end) = day();
        let query = StationQuery {
            network: "OO".to_string(),
            station: "AXAS1".to_string(),
            location: "".to_string(),
            channel: "*Z".to_string(),
            starttime: Some(start),
            endtime: Some(end),
            level: Level::Channel,
            ..Default::default()
        };
        let params = query.params().unwrap();
        assert!(params.contains(&("location".to_string(), "--".to_string())));
        assert!(params.contains(&("level".to_string(), "channel".to_string())));
        assert!(params.contains(&(
            "starttime".to_string(),
            "2019-11-01T00:00:00.000000".to_string()
        )));
    }

    #[test]
    fn test_window_validation() {
        let (start, end) = day();
        let query = StationQuery {
            starttime: Some(end),
            endtime: Some(start),
            ..Default::default()
        };
        assert!(matches!(query.params(), Err(ExplorerError::Validation(_))));
        let waveform = WaveformQuery::new("OO", "AXAS1", "", "EHZ", start, start);
        assert!(matches!(waveform.params(), Err(ExplorerError::Validation(_))));
    }

    #[test]
    fn test_pattern_and_bbox_validation() {
        let (start, end) = day();
        assert!(WaveformQuery::new("OO", "AX AS1", "", "EHZ", start, end)
            .params()
            .is_err());
        assert!(WaveformQuery::new("", "AXAS1", "", "EHZ", start, end)
            .params()
            .is_err());
        let query = StationQuery {
            bounding_box: Some(BoundingBox {
                min_latitude: 50.0,
                max_latitude: 40.0,
                min_longitude: 0.0,
                max_longitude: 10.0,
            }),
            ..Default::default()
        };
        assert!(query.params().is_err());
    }

    #[test]
    fn test_response_query() {
        let (start, end) = day();
        let query = WaveformQuery::new("OO", "AXAS1", "", "EHZ", start, end).response_query();
        assert_eq!(query.level, Level::Response);
        assert_eq!(query.endtime, Some(end));
    }
}
