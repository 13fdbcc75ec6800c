//! FDSN web service client: station metadata and waveform retrieval.

use crate::config::Settings;
use crate::data_container::Stream;
use crate::error::{ExplorerError, ExplorerResult};
use crate::fdsn::query::{StationQuery, WaveformQuery};
use crate::fdsn::services::resolve_base_url;
use crate::fdsn::transport::{HttpResponse, HttpTransport, ReqwestTransport};
use crate::inventory::Inventory;
use crate::io::{mseed, stationxml};
use bytes::Bytes;
use log::{debug, info};
use std::time::Duration;

const STATION_PATH: &str = "fdsnws/station/1/query";
const DATASELECT_PATH: &str = "fdsnws/dataselect/1/query";

/// Maps an HTTP answer onto the crate error kinds. `Ok(None)` means "no data".
fn check_status(response: HttpResponse, url: &str) -> ExplorerResult<Option<Bytes>> {
    match response.status {
        200 => Ok(Some(response.body)),
        204 | 404 => Ok(None),
        400 | 413 | 414 => Err(ExplorerError::Validation(format!(
            "{url} rejected the request ({}): {}",
            response.status,
            response.body_excerpt()
        ))),
        401 | 403 => Err(ExplorerError::Authentication(format!(
            "{url} refused access ({})",
            response.status
        ))),
        status => Err(ExplorerError::ServiceUnavailable(format!(
            "{url} answered {status}: {}",
            response.body_excerpt()
        ))),
    }
}

/// Client for one FDSN data centre.
pub struct Client {
    base_url: String,
    transport: Box<dyn HttpTransport>,
}

impl Client {
    /// Client for a service short name (`"IRIS"`, `"RASPISHAKE"`, ...) or base URL, using the
    /// network timeout and user agent of `settings`.
    pub fn from_settings(settings: &Settings) -> ExplorerResult<Self> {
        let mut transport = ReqwestTransport::new(
            Duration::from_secs(settings.timeout_secs),
            &settings.user_agent,
        )?;
        if let (Some(user), Some(password)) = (&settings.user, &settings.password) {
            transport = transport.with_credentials(user, password);
        }
        Client::with_transport(&settings.service, Box::new(transport))
    }

    pub fn new(service: &str) -> ExplorerResult<Self> {
        Client::from_settings(&Settings {
            service: service.to_string(),
            ..Settings::default()
        })
    }

    pub fn with_transport(
        service: &str,
        transport: Box<dyn HttpTransport>,
    ) -> ExplorerResult<Self> {
        let base_url = resolve_base_url(service)?;
        debug!("FDSN client for {base_url}");
        Ok(Client {
            base_url,
            transport,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, path: &str, params: &[(String, String)]) -> ExplorerResult<Option<Bytes>> {
        let url = format!("{}/{path}", self.base_url);
        debug!(
            "GET {url}?{}",
            params
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("&")
        );
        let response = self.transport.get(&url, params)?;
        check_status(response, &url)
    }

    /// Station metadata matching `query`. No match is an empty inventory, not an error.
    pub fn get_stations(&self, query: &StationQuery) -> ExplorerResult<Inventory> {
        let params = query.params()?;
        let Some(body) = self.request(STATION_PATH, &params)? else {
            info!("no stations match {}.{}", query.network, query.station);
            return Ok(Inventory::default());
        };
        let xml = std::str::from_utf8(&body)
            .map_err(|e| ExplorerError::Format(format!("StationXML is not UTF-8: {e}")))?;
        let inventory = stationxml::read_from_str(xml)?;
        info!(
            "retrieved {} station(s), {} channel(s) at level {}",
            inventory.station_count(),
            inventory.channel_count(),
            query.level
        );
        Ok(inventory)
    }

    /// Waveforms for the query window, trimmed to it. Partial coverage is returned as is; no
    /// data at all is `ExplorerError::NoData`.
    pub fn get_waveforms(&self, query: &WaveformQuery) -> ExplorerResult<Stream> {
        let params = query.params()?;
        let description = format!(
            "{}.{}.{}.{} {} - {}",
            query.network,
            query.station,
            query.location,
            query.channel,
            query.starttime,
            query.endtime
        );
        let body = self
            .request(DATASELECT_PATH, &params)?
            .ok_or_else(|| ExplorerError::NoData(description.clone()))?;
        let mut stream = mseed::read_from_bytes(&body)?;
        stream.trim(Some(query.starttime), Some(query.endtime));
        if stream.is_empty() {
            return Err(ExplorerError::NoData(description));
        }
        stream.sort();
        if query.attach_response {
            let inventory = self.get_stations(&query.response_query())?;
            stream.attach_response(&inventory);
        }
        info!("retrieved {} trace(s) for {description}", stream.len());
        Ok(stream)
    }
}
