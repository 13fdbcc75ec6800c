//! Station metadata tree: `Inventory` → `Network` → `Station` → `Channel`, with wildcard
//! selection, response and coordinate lookups, and the epoch consistency check applied to every
//! inventory that is read.

use crate::data_container::TraceId;
use crate::error::{ExplorerError, ExplorerResult};
use crate::response::Response;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::fmt;

/// Validity interval of a metadata element. Open ends are unbounded.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Epoch {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl Epoch {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Epoch { start, end }
    }

    pub fn contains(&self, t: &DateTime<Utc>) -> bool {
        self.start.is_none_or(|s| s <= *t) && self.end.is_none_or(|e| *t <= e)
    }

    /// Half-open overlap test: an epoch ending exactly when the other starts does not overlap.
    pub fn overlaps(&self, other: &Epoch) -> bool {
        let starts_before_other_ends = match (self.start, other.end) {
            (Some(s), Some(e)) => s < e,
            _ => true,
        };
        let other_starts_before_end = match (other.start, self.end) {
            (Some(s), Some(e)) => s < e,
            _ => true,
        };
        starts_before_other_ends && other_starts_before_end
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Channel {
    pub code: String,
    pub location_code: String,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
    pub depth: f64,
    pub azimuth: Option<f64>,
    pub dip: Option<f64>,
    pub sample_rate: Option<f64>,
    pub sensor_description: Option<String>,
    pub epoch: Epoch,
    pub response: Option<Response>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Station {
    pub code: String,
    pub site_name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
    pub epoch: Epoch,
    pub channels: Vec<Channel>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Network {
    pub code: String,
    pub description: Option<String>,
    pub epoch: Epoch,
    pub stations: Vec<Station>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Inventory {
    pub source: Option<String>,
    pub sender: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub networks: Vec<Network>,
}

/// Station coordinates of a channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
    pub local_depth: f64,
}

/// Matches `value` against an FDSN pattern: comma separated alternatives with `*` and `?`
/// wildcards. `--` and an empty alternative stand for an empty location code.
pub fn matches_pattern(pattern: &str, value: &str) -> bool {
    pattern.split(',').any(|alternative| {
        let alternative = alternative.trim();
        if alternative == "--" || alternative.is_empty() {
            return value.is_empty();
        }
        let regex = format!(
            "^{}$",
            regex::escape(alternative)
                .replace(r"\*", ".*")
                .replace(r"\?", ".")
        );
        Regex::new(&regex).is_ok_and(|re| re.is_match(value))
    })
}

impl Inventory {
    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }

    pub fn network_count(&self) -> usize {
        self.networks.len()
    }

    pub fn station_count(&self) -> usize {
        self.networks.iter().map(|n| n.stations.len()).sum()
    }

    pub fn channels(&self) -> impl Iterator<Item = (&Network, &Station, &Channel)> {
        self.networks.iter().flat_map(|net| {
            net.stations
                .iter()
                .flat_map(move |sta| sta.channels.iter().map(move |cha| (net, sta, cha)))
        })
    }

    pub fn channel_count(&self) -> usize {
        self.channels().count()
    }

    /// Number of channels carrying a response.
    pub fn response_count(&self) -> usize {
        self.channels()
            .filter(|(_, _, cha)| cha.response.is_some())
            .count()
    }

    /// Distinct ids of all channels in document order. Channel epochs sharing an id count once.
    pub fn trace_ids(&self) -> Vec<TraceId> {
        let mut ids: Vec<TraceId> = Vec::new();
        for (net, sta, cha) in self.channels() {
            let id = TraceId::new(&net.code, &sta.code, &cha.location_code, &cha.code);
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    /// Sub-inventory matching the patterns. Stations listed without channels are kept when they
    /// match, empty networks are dropped.
    pub fn select(&self, network: &str, station: &str, location: &str, channel: &str) -> Inventory {
        let networks = self
            .networks
            .iter()
            .filter(|net| matches_pattern(network, &net.code))
            .filter_map(|net| {
                let stations: Vec<Station> = net
                    .stations
                    .iter()
                    .filter(|sta| matches_pattern(station, &sta.code))
                    .filter_map(|sta| {
                        let channels: Vec<Channel> = sta
                            .channels
                            .iter()
                            .filter(|cha| {
                                matches_pattern(location, &cha.location_code)
                                    && matches_pattern(channel, &cha.code)
                            })
                            .cloned()
                            .collect();
                        if channels.is_empty() && !sta.channels.is_empty() {
                            return None;
                        }
                        Some(Station {
                            channels,
                            ..sta.clone()
                        })
                    })
                    .collect();
                if stations.is_empty() {
                    return None;
                }
                Some(Network {
                    stations,
                    ..net.clone()
                })
            })
            .collect();
        Inventory {
            networks,
            ..self.clone()
        }
    }

    fn find_channel(&self, id: &TraceId, time: &DateTime<Utc>) -> Option<&Channel> {
        self.networks
            .iter()
            .filter(|net| net.code == id.network)
            .flat_map(|net| net.stations.iter())
            .filter(|sta| sta.code == id.station)
            .flat_map(|sta| sta.channels.iter())
            .find(|cha| {
                cha.location_code == id.location
                    && cha.code == id.channel
                    && cha.epoch.contains(time)
            })
    }

    /// Response of channel `id` valid at `time`.
    pub fn get_response(&self, id: &TraceId, time: &DateTime<Utc>) -> Option<&Response> {
        self.find_channel(id, time)
            .and_then(|cha| cha.response.as_ref())
    }

    pub fn get_coordinates(&self, id: &TraceId, time: &DateTime<Utc>) -> Option<Coordinates> {
        self.find_channel(id, time).map(|cha| Coordinates {
            latitude: cha.latitude,
            longitude: cha.longitude,
            elevation: cha.elevation,
            local_depth: cha.depth,
        })
    }

    /// Appends the networks of `other`.
    pub fn extend(&mut self, other: Inventory) {
        self.networks.extend(other.networks);
    }

    /// Checks that no two epochs of the same location and channel code overlap within a station.
    pub fn validate(&self) -> ExplorerResult<()> {
        for net in &self.networks {
            for sta in &net.stations {
                for (i, a) in sta.channels.iter().enumerate() {
                    let clash = sta.channels[i + 1..].iter().find(|b| {
                        a.code == b.code
                            && a.location_code == b.location_code
                            && a.epoch.overlaps(&b.epoch)
                    });
                    if clash.is_some() {
                        return Err(ExplorerError::Format(format!(
                            "overlapping epochs for channel {}.{}.{}.{}",
                            net.code, sta.code, a.location_code, a.code
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Inventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Inventory: {} network(s), {} station(s), {} channel(s)",
            self.network_count(),
            self.station_count(),
            self.channel_count()
        )?;
        for net in &self.networks {
            writeln!(
                f,
                "  {} {}",
                net.code,
                net.description.as_deref().unwrap_or("")
            )?;
            for sta in &net.stations {
                writeln!(
                    f,
                    "    {} ({:.4}, {:.4}) {}",
                    sta.code,
                    sta.latitude,
                    sta.longitude,
                    sta.site_name.as_deref().unwrap_or("")
                )?;
                for cha in &sta.channels {
                    writeln!(f, "      {}.{}", cha.location_code, cha.code)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn channel(
        location: &str,
        code: &str,
        start_year: i32,
        end_year: Option<i32>,
    ) -> Channel {
        Channel {
            code: code.to_string(),
            location_code: location.to_string(),
            latitude: 46.95,
            longitude: 7.44,
            elevation: 540.0,
            sample_rate: Some(100.0),
            epoch: Epoch::new(
                Some(Utc.with_ymd_and_hms(start_year, 1, 1, 0, 0, 0).unwrap()),
                end_year.map(|y| Utc.with_ymd_and_hms(y, 1, 1, 0, 0, 0).unwrap()),
            ),
            ..Default::default()
        }
    }

    pub(crate) fn inventory(channels: Vec<Channel>) -> Inventory {
        Inventory {
            networks: vec![Network {
                code: "OO".to_string(),
                stations: vec![Station {
                    code: "AXAS1".to_string(),
                    latitude: 46.95,
                    longitude: 7.44,
                    channels,
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_matches_pattern() {
        assert!(matches_pattern("*Z", "EHZ"));
        assert!(!matches_pattern("*Z", "EHN"));
        assert!(matches_pattern("EH?", "EHE"));
        assert!(matches_pattern("BHZ,EHZ", "EHZ"));
        assert!(matches_pattern("--", ""));
        assert!(matches_pattern("*", ""));
        assert!(!matches_pattern("--", "00"));
        assert!(matches_pattern("A.B", "A.B"));
        assert!(!matches_pattern("A.B", "AxB"));
    }

    #[test]
    fn test_counts_and_select() {
        let inv = inventory(vec![
            channel("", "EHZ", 2015, None),
            channel("", "EHN", 2015, None),
            channel("00", "HHZ", 2015, None),
        ]);
        assert_eq!(inv.station_count(), 1);
        assert_eq!(inv.channel_count(), 3);
        let z = inv.select("OO", "AXAS1", "*", "*Z");
        assert_eq!(z.channel_count(), 2);
        assert!(inv.select("AM", "*", "*", "*").is_empty());
        assert!(inv.select("OO", "*", "*", "BH?").is_empty());
        assert_eq!(inv.response_count(), 0);
    }

    #[test]
    fn test_trace_ids_distinct() {
        let inv = inventory(vec![
            channel("", "EHZ", 2015, Some(2018)),
            channel("00", "HHZ", 2015, None),
            channel("", "EHZ", 2018, None),
        ]);
        assert_eq!(
            inv.trace_ids(),
            vec![
                TraceId::new("OO", "AXAS1", "", "EHZ"),
                TraceId::new("OO", "AXAS1", "00", "HHZ"),
            ]
        );
        assert!(Inventory::default().trace_ids().is_empty());
    }

    #[test]
    fn test_epoch_lookup() {
        let mut old = channel("", "EHZ", 2015, Some(2018));
        old.latitude = 1.0;
        let new = channel("", "EHZ", 2018, None);
        let inv = inventory(vec![old, new]);
        assert!(inv.validate().is_ok());
        let id = TraceId::new("OO", "AXAS1", "", "EHZ");
        let t = Utc.with_ymd_and_hms(2016, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(inv.get_coordinates(&id, &t).unwrap().latitude, 1.0);
        let t = Utc.with_ymd_and_hms(2019, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(inv.get_coordinates(&id, &t).unwrap().latitude, 46.95);
        let t = Utc.with_ymd_and_hms(2010, 6, 1, 0, 0, 0).unwrap();
        assert!(inv.get_coordinates(&id, &t).is_none());
    }

    #[test]
    fn test_validate_rejects_overlap() {
        let inv = inventory(vec![
            channel("", "EHZ", 2015, Some(2019)),
            channel("", "EHZ", 2018, None),
        ]);
        assert!(matches!(inv.validate(), Err(ExplorerError::Format(_))));
        let other_location = inventory(vec![
            channel("", "EHZ", 2015, Some(2019)),
            channel("00", "EHZ", 2018, None),
        ]);
        assert!(other_location.validate().is_ok());
    }
}
