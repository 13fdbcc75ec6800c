//! Known FDSN data centres and base URL resolution.

use crate::error::{ExplorerError, ExplorerResult};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// Short names of FDSN data centres mapped to their base URLs.
pub static SERVICES: Lazy<BTreeMap<&'static str, &'static str>> = Lazy::new(|| {
    BTreeMap::from([
        ("AUSPASS", "http://auspass.edu.au"),
        ("BGR", "http://eida.bgr.de"),
        ("EIDA", "http://eida-federator.ethz.ch"),
        ("EMSC", "http://www.seismicportal.eu"),
        ("ETH", "http://eida.ethz.ch"),
        ("GEOFON", "http://geofon.gfz-potsdam.de"),
        ("GEONET", "http://service.geonet.org.nz"),
        ("GFZ", "http://geofon.gfz-potsdam.de"),
        ("ICGC", "http://ws.icgc.cat"),
        ("INGV", "http://webservices.ingv.it"),
        ("IPGP", "http://ws.ipgp.fr"),
        ("IRIS", "https://service.iris.edu"),
        ("KNMI", "http://rdsa.knmi.nl"),
        ("KOERI", "http://eida.koeri.boun.edu.tr"),
        ("LMU", "http://erde.geophysik.uni-muenchen.de"),
        ("NCEDC", "https://service.ncedc.org"),
        ("NIEP", "http://eida-sc3.infp.ro"),
        ("NOA", "http://eida.gein.noa.gr"),
        ("ODC", "http://www.orfeus-eu.org"),
        ("ORFEUS", "http://www.orfeus-eu.org"),
        ("RASPISHAKE", "https://data.raspberryshake.org"),
        ("RESIF", "http://ws.resif.fr"),
        ("SCEDC", "https://service.scedc.caltech.edu"),
        ("TEXNET", "http://rtserve.beg.utexas.edu"),
        ("UIB-NORSAR", "http://eida.geo.uib.no"),
        ("USGS", "https://earthquake.usgs.gov"),
        ("USP", "http://sismo.iag.usp.br"),
    ])
});

/// Base URL for a service short name (case insensitive) or an explicit `http(s)://` URL.
pub fn resolve_base_url(service: &str) -> ExplorerResult<String> {
    let service = service.trim();
    if let Some(url) = SERVICES.get(service.to_ascii_uppercase().as_str()) {
        return Ok(url.to_string());
    }
    if service.starts_with("http://") || service.starts_with("https://") {
        return Ok(service.trim_end_matches('/').to_string());
    }
    Err(ExplorerError::Validation(format!(
        "unknown FDSN service '{service}', expected one of {} or a URL",
        SERVICES.keys().copied().collect::<Vec<_>>().join(", ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_names_and_urls() {
        assert_eq!(resolve_base_url("IRIS").unwrap(), "https://service.iris.edu");
        assert_eq!(
            resolve_base_url("raspishake").unwrap(),
            "https://data.raspberryshake.org"
        );
        assert_eq!(
            resolve_base_url("http://localhost:8080/").unwrap(),
            "http://localhost:8080"
        );
        assert!(matches!(
            resolve_base_url("NOWHERE"),
            Err(ExplorerError::Validation(_))
        ));
    }
}
