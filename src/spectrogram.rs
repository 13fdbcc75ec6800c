//! Sliding-window power spectra of a trace.
//!
//! The trace is demeaned and cut into Hann-windowed segments of `nfft` samples (the power of
//! two nearest to the window length) that overlap by `per_lap`. Each segment is zero padded by
//! the `mult` factor and transformed; power is scaled as a one-sided power spectral density.
//! The DC bin is dropped, which keeps a logarithmic frequency axis usable.

use crate::data_container::Trace;
use crate::error::{ExplorerError, ExplorerResult};
use crate::math_tools::{demean, hann_window, nearest_pow2, rfft, rfftfreq};
use log::debug;
use ndarray::{s, Array1, Array2};
use serde::{Deserialize, Serialize};

const DEFAULT_WINDOW_SAMPLES: f64 = 128.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrogramParams {
    /// Window length in seconds; `None` uses 128 samples.
    pub wlen: Option<f64>,
    /// Overlap of consecutive windows as a fraction of the window, in `[0, 1)`.
    pub per_lap: f64,
    /// Zero padding factor, rounded to a power of two. `None` disables padding.
    pub mult: Option<f64>,
    /// Power in dB instead of amplitude (square root of the power).
    pub dbscale: bool,
}

impl Default for SpectrogramParams {
    fn default() -> Self {
        SpectrogramParams {
            wlen: None,
            per_lap: 0.9,
            mult: Some(8.0),
            dbscale: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Spectrogram {
    /// Window centres in seconds after the trace start.
    pub times: Array1<f64>,
    /// Frequencies in Hz, DC excluded.
    pub frequencies: Array1<f64>,
    /// Frequency × time matrix, in dB or amplitude according to `dbscale`.
    pub values: Array2<f64>,
    pub dbscale: bool,
}

/// Computes the spectrogram of `trace`.
///
/// # Errors
/// `ExplorerError::Precondition` for a masked trace, an overlap outside `[0, 1)`, a
/// non-positive window length or a trace shorter than one window.
pub fn compute(trace: &Trace, params: &SpectrogramParams) -> ExplorerResult<Spectrogram> {
    trace.require_unmasked("spectrogram")?;
    if !(0.0..1.0).contains(&params.per_lap) {
        return Err(ExplorerError::Precondition(format!(
            "window overlap {} outside [0, 1)",
            params.per_lap
        )));
    }
    let rate = trace.sampling_rate;
    let wlen = params.wlen.unwrap_or(DEFAULT_WINDOW_SAMPLES / rate);
    if wlen.is_nan() || wlen <= 0.0 {
        return Err(ExplorerError::Precondition(format!(
            "window length {wlen} s must be positive"
        )));
    }
    let nfft = nearest_pow2(wlen * rate);
    let npts = trace.npts();
    if npts < nfft {
        return Err(ExplorerError::Precondition(format!(
            "{} has {npts} samples, fewer than one window of {nfft}",
            trace.id
        )));
    }
    let pad_to = nfft * params.mult.map(nearest_pow2).unwrap_or(1);
    let overlap = (nfft as f64 * params.per_lap) as usize;
    let step = (nfft - overlap).max(1);

    let mut data = trace.data_f64();
    demean(&mut data);
    let window = hann_window(nfft);
    let scale = 1.0 / (rate * window.mapv(|w| w * w).sum());

    let starts: Vec<usize> = (0..=npts - nfft).step_by(step).collect();
    let bins = pad_to / 2 + 1;
    let mut values = Array2::zeros((bins - 1, starts.len()));
    for (column, &start) in starts.iter().enumerate() {
        let segment = &data.slice(s![start..start + nfft]) * &window;
        let spectrum = rfft(&segment.to_vec(), pad_to)?;
        // DC (k = 0) is dropped, the Nyquist bin of an even length is not doubled
        for k in 1..bins {
            let mut power = spectrum[k].norm_sqr() * scale;
            if !(pad_to % 2 == 0 && k == bins - 1) {
                power *= 2.0;
            }
            values[[k - 1, column]] = if params.dbscale {
                10.0 * power.max(f64::MIN_POSITIVE).log10()
            } else {
                power.sqrt()
            };
        }
    }
    let times = starts
        .iter()
        .map(|&start| (start as f64 + nfft as f64 / 2.0) / rate)
        .collect();
    let frequencies = rfftfreq(pad_to, 1.0 / rate).slice(s![1..]).to_owned();
    debug!(
        "spectrogram of {}: {} windows of {nfft} samples, padded to {pad_to}",
        trace.id,
        starts.len()
    );
    Ok(Spectrogram {
        times,
        frequencies,
        values,
        dbscale: params.dbscale,
    })
}
