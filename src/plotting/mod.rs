//! PNG rendering of streams, spectrograms, instrument responses and station maps.
//!
//! All functions only read their input. Inputs are checked before anything is drawn, so an
//! invalid request never leaves a partial file behind. Without the `plotting` feature a valid
//! request fails with `ExplorerError::CapabilityUnavailable`.

use crate::data_container::{Stream, Trace};
use crate::error::{ExplorerError, ExplorerResult};
use crate::inventory::Inventory;
use crate::response::{Response, ResponseOutput};
use crate::spectrogram::Spectrogram;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[cfg(feature = "plotting")]
mod bode;
#[cfg(feature = "plotting")]
mod map;
#[cfg(feature = "plotting")]
mod spectrogram;
#[cfg(feature = "plotting")]
mod waveform;

#[cfg(feature = "plotting")]
const FONT_TUPLE_TITLE: (&str, i32) = ("sans-serif", 20);
#[cfg(feature = "plotting")]
const FONT_TUPLE_LABEL: (&str, i32) = ("sans-serif", 14);
#[cfg(feature = "plotting")]
const LINE_WIDTH: u32 = 1;

/// Projection of a station map.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapProjection {
    /// Whole globe, equirectangular.
    #[default]
    Global,
    /// Equirectangular, zoomed to the stations.
    Local,
    /// Not supported by the bitmap backend.
    Orthographic,
}

#[cfg(feature = "plotting")]
impl<E: std::error::Error + Send + Sync> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for ExplorerError
{
    fn from(err: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        ExplorerError::Plot(err.to_string())
    }
}

#[cfg(not(feature = "plotting"))]
fn unavailable() -> ExplorerError {
    ExplorerError::CapabilityUnavailable("built without the `plotting` feature".to_string())
}

fn check_size(size: (u32, u32)) -> ExplorerResult<()> {
    if size.0 == 0 || size.1 == 0 {
        return Err(ExplorerError::Validation(format!(
            "plot size {}x{} has a zero side",
            size.0, size.1
        )));
    }
    Ok(())
}

/// One panel per trace, sharing the time axis. Masked samples are left blank.
pub fn plot_stream(
    stream: &Stream,
    path: impl AsRef<Path>,
    size: (u32, u32),
) -> ExplorerResult<()> {
    check_size(size)?;
    if stream.iter().all(|tr| tr.npts() == 0) {
        return Err(ExplorerError::Precondition(
            "stream has no samples to plot".to_string(),
        ));
    }
    #[cfg(feature = "plotting")]
    {
        waveform::plot_stream(stream, path.as_ref(), size)
    }
    #[cfg(not(feature = "plotting"))]
    {
        let _ = path;
        Err(unavailable())
    }
}

/// Day plot: the trace cut into rows of `interval_minutes`, stacked top to bottom.
pub fn plot_dayplot(
    trace: &Trace,
    interval_minutes: f64,
    path: impl AsRef<Path>,
    size: (u32, u32),
) -> ExplorerResult<()> {
    check_size(size)?;
    if interval_minutes.is_nan() || interval_minutes <= 0.0 {
        return Err(ExplorerError::Validation(format!(
            "day plot interval {interval_minutes} min must be positive"
        )));
    }
    if trace.npts() == 0 {
        return Err(ExplorerError::Precondition(format!(
            "{} has no samples to plot",
            trace.id
        )));
    }
    #[cfg(feature = "plotting")]
    {
        waveform::plot_dayplot(trace, interval_minutes * 60.0, path.as_ref(), size)
    }
    #[cfg(not(feature = "plotting"))]
    {
        let _ = path;
        Err(unavailable())
    }
}

/// Spectrogram as a time-frequency heat map, optionally with a logarithmic frequency axis.
pub fn plot_spectrogram(
    spectrogram: &Spectrogram,
    title: &str,
    log_frequency: bool,
    path: impl AsRef<Path>,
    size: (u32, u32),
) -> ExplorerResult<()> {
    check_size(size)?;
    if spectrogram.values.is_empty() {
        return Err(ExplorerError::Precondition(
            "spectrogram has no windows".to_string(),
        ));
    }
    #[cfg(feature = "plotting")]
    {
        spectrogram::plot_spectrogram(spectrogram, title, log_frequency, path.as_ref(), size)
    }
    #[cfg(not(feature = "plotting"))]
    {
        let _ = (title, log_frequency, path);
        Err(unavailable())
    }
}

/// Bode plot of `response` from `min_freq` up to the Nyquist frequency of `sampling_rate`.
pub fn plot_response(
    response: &Response,
    min_freq: f64,
    sampling_rate: f64,
    output: ResponseOutput,
    title: &str,
    path: impl AsRef<Path>,
    size: (u32, u32),
) -> ExplorerResult<()> {
    check_size(size)?;
    let nyquist = sampling_rate / 2.0;
    if min_freq.is_nan() || min_freq <= 0.0 || min_freq >= nyquist {
        return Err(ExplorerError::Validation(format!(
            "minimum frequency {min_freq} Hz must be positive and below Nyquist ({nyquist} Hz)"
        )));
    }
    #[cfg(feature = "plotting")]
    {
        bode::plot_response(response, (min_freq, nyquist), output, title, path.as_ref(), size)
    }
    #[cfg(not(feature = "plotting"))]
    {
        let _ = (response, output, title, path);
        Err(unavailable())
    }
}

/// Station map with one marker per station, coloured by network.
pub fn plot_inventory(
    inventory: &Inventory,
    projection: MapProjection,
    path: impl AsRef<Path>,
    size: (u32, u32),
) -> ExplorerResult<()> {
    if projection == MapProjection::Orthographic {
        return Err(ExplorerError::CapabilityUnavailable(
            "orthographic projection is not supported".to_string(),
        ));
    }
    check_size(size)?;
    if inventory.station_count() == 0 {
        return Err(ExplorerError::Precondition(
            "inventory has no stations to plot".to_string(),
        ));
    }
    #[cfg(feature = "plotting")]
    {
        map::plot_inventory(inventory, projection, path.as_ref(), size)
    }
    #[cfg(not(feature = "plotting"))]
    {
        let _ = path;
        Err(unavailable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::tests::{channel, inventory};
    use crate::response::tests::geophone_response;

    #[test]
    fn test_orthographic_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.png");
        let metadata = inventory(vec![channel("", "EHZ", 2016, None)]);
        assert!(matches!(
            plot_inventory(&metadata, MapProjection::Orthographic, &path, (800, 600)),
            Err(ExplorerError::CapabilityUnavailable(_))
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_rejected_before_drawing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plot.png");
        assert!(matches!(
            plot_stream(&Stream::default(), &path, (800, 600)),
            Err(ExplorerError::Precondition(_))
        ));
        assert!(matches!(
            plot_inventory(&Inventory::default(), MapProjection::Global, &path, (800, 600)),
            Err(ExplorerError::Precondition(_))
        ));
        let response = geophone_response();
        assert!(matches!(
            plot_response(&response, 60.0, 100.0, ResponseOutput::Velocity, "", &path, (800, 600)),
            Err(ExplorerError::Validation(_))
        ));
        assert!(matches!(
            plot_response(&response, 0.1, 100.0, ResponseOutput::Velocity, "", &path, (0, 600)),
            Err(ExplorerError::Validation(_))
        ));
        assert!(!path.exists());
    }

    #[cfg(not(feature = "plotting"))]
    #[test]
    fn test_without_backend() {
        let metadata = inventory(vec![channel("", "EHZ", 2016, None)]);
        assert!(matches!(
            plot_inventory(&metadata, MapProjection::Global, "map.png", (800, 600)),
            Err(ExplorerError::CapabilityUnavailable(_))
        ));
    }
}
