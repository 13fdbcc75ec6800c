use env_logger::Env;
use log::{debug, error, info, warn};
use seismo_explorer::fdsn::{Client, Level, StationQuery, WaveformQuery};
use seismo_explorer::filters::build_filter;
use seismo_explorer::filters::filter::FILTER_REGISTRY;
use seismo_explorer::io::{self, WriteOptions};
use seismo_explorer::plotting::{self, MapProjection};
use seismo_explorer::spectrogram;
use seismo_explorer::timestamp::{add_seconds, parse_datetime};
use seismo_explorer::{ExplorerError, ExplorerResult, ResponseOutput, Settings};
use std::fs;
use std::path::{Path, PathBuf};

const NETWORK: &str = "OO";
const STATION: &str = "AXAS1";
const DAY: &str = "2019-11-01T00:00:00";
const WAVEFORM_START: &str = "2019-11-01T12:00:00";
const WAVEFORM_SECONDS: f64 = 1800.0;
const DAYPLOT_INTERVAL_MINUTES: f64 = 5.0;
const RESPONSE_MIN_FREQ: f64 = 0.001;

/// A missing plotting backend only skips the figure.
fn plotted(result: ExplorerResult<()>, what: &str) -> ExplorerResult<()> {
    match result {
        Err(ExplorerError::CapabilityUnavailable(msg)) => {
            warn!("skipping {what}: {msg}");
            Ok(())
        }
        other => other,
    }
}

fn run(out_dir: &Path) -> ExplorerResult<()> {
    fs::create_dir_all(out_dir)?;
    let settings = Settings::load_or_default();
    let size = settings.plot_size;
    let client = Client::from_settings(&settings)?;
    info!("using FDSN service at {}", client.base_url());
    for filter in &*FILTER_REGISTRY {
        debug!("{}", filter.config());
    }

    // station metadata, channel level
    let day_start = parse_datetime(DAY)?;
    let station_query = StationQuery {
        network: NETWORK.to_string(),
        station: STATION.to_string(),
        channel: "*Z".to_string(),
        starttime: Some(day_start),
        endtime: Some(add_seconds(&day_start, 86_400.0)),
        level: Level::Channel,
        ..Default::default()
    };
    let inventory = client.get_stations(&station_query)?;
    info!("{inventory}");
    plotted(
        plotting::plot_inventory(
            &inventory,
            MapProjection::Local,
            out_dir.join("stations.png"),
            size,
        ),
        "station map",
    )?;

    // instrument response
    let responses = client.get_stations(&StationQuery {
        level: Level::Response,
        ..station_query
    })?;
    let first_response = responses.channels().find_map(|(net, sta, cha)| {
        cha.response.as_ref().map(|response| (net, sta, cha, response))
    });
    match first_response {
        Some((net, sta, cha, response)) => plotted(
            plotting::plot_response(
                response,
                RESPONSE_MIN_FREQ,
                cha.sample_rate.unwrap_or(100.0),
                ResponseOutput::Velocity,
                &format!("{}.{}.{}.{}", net.code, sta.code, cha.location_code, cha.code),
                out_dir.join("response.png"),
                size,
            ),
            "response plot",
        )?,
        None => warn!("no channel with an instrument response"),
    }

    // waveforms, with responses attached for the deconvolution below
    let start = parse_datetime(WAVEFORM_START)?;
    let mut query = WaveformQuery::new(
        NETWORK,
        STATION,
        "*",
        "*Z",
        start,
        add_seconds(&start, WAVEFORM_SECONDS),
    );
    query.attach_response = true;
    let mut stream = client.get_waveforms(&query)?;
    info!("{stream}");
    for id in inventory.trace_ids() {
        if !stream.iter().any(|tr| tr.id == id) {
            warn!("no waveform data for {id}");
        }
    }
    for gap in stream.gaps() {
        info!("{gap}");
    }
    stream.merge(settings.gap_fill)?;
    plotted(
        plotting::plot_stream(&stream, out_dir.join("waveforms.png"), size),
        "waveform plot",
    )?;
    if let Some(trace) = stream.traces.first() {
        plotted(
            plotting::plot_dayplot(
                trace,
                DAYPLOT_INTERVAL_MINUTES,
                out_dir.join("dayplot.png"),
                size,
            ),
            "day plot",
        )?;
    }
    // masked gaps cannot be filtered or written
    let stream = stream.split();

    // band pass
    let band_pass = build_filter("Band Pass", &settings.band_pass_parameters())?;
    let mut filtered = stream.clone();
    filtered.filter(band_pass.as_ref())?;
    plotted(
        plotting::plot_stream(&filtered, out_dir.join("bandpass.png"), size),
        "band pass plot",
    )?;

    // spectrogram of the unfiltered trace
    if let Some(trace) = stream.traces.first() {
        let spec = spectrogram::compute(trace, &settings.spectrogram)?;
        plotted(
            plotting::plot_spectrogram(
                &spec,
                &trace.id.to_string(),
                true,
                out_dir.join("spectrogram.png"),
                size,
            ),
            "spectrogram",
        )?;
    }

    // response removal
    let removal = build_filter("Remove Response", &settings.response_removal_parameters())?;
    let mut corrected = stream.clone();
    match corrected.filter(removal.as_ref()) {
        Ok(()) => plotted(
            plotting::plot_stream(&corrected, out_dir.join("corrected.png"), size),
            "corrected waveform plot",
        )?,
        Err(ExplorerError::Precondition(msg)) => warn!("response not removed: {msg}"),
        Err(err) => return Err(err),
    }

    // persistence
    let mseed = out_dir.join(format!("{NETWORK}.{STATION}.mseed"));
    io::write_stream(&mseed, &stream, &WriteOptions::default())?;
    let reread = io::read_stream(&mseed)?;
    info!("{reread}");
    io::write_inventory(out_dir.join(format!("{NETWORK}.{STATION}.xml")), &responses)?;
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    info!(
        "seismo-explorer {} ({} on {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("GIT_BRANCH")
    );
    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    if let Err(err) = run(&out_dir) {
        error!("{err}");
        std::process::exit(1);
    }
}
