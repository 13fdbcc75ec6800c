//! Butterworth IIR design and second-order section filtering.
//!
//! The design starts from the analog lowpass prototype in zero-pole-gain form, transforms it to
//! the requested band, maps it to the z-plane with the bilinear transform (with frequency
//! pre-warping) and splits the result into second-order sections, which stay numerically stable
//! for high orders and narrow bands.

use crate::data_container::Trace;
use crate::error::{ExplorerError, ExplorerResult};
use log::debug;
use ndarray::Array1;
use num_complex::Complex64;
use std::f64::consts::PI;

const IMAG_TOLERANCE: f64 = 1e-10;

/// Pass band of a Butterworth filter, corner frequencies in Hz.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Band {
    LowPass(f64),
    HighPass(f64),
    BandPass(f64, f64),
}

/// Zeros, poles and gain of a transfer function.
#[derive(Clone, Debug)]
struct Zpk {
    zeros: Vec<Complex64>,
    poles: Vec<Complex64>,
    gain: f64,
}

/// Cascade of biquads, each `[b0, b1, b2, a0, a1, a2]` with `a0 == 1`.
#[derive(Clone, Debug, PartialEq)]
pub struct Sos {
    pub sections: Vec<[f64; 6]>,
}

/// Analog Butterworth lowpass prototype with cutoff 1 rad/s.
fn prototype(order: usize) -> Zpk {
    let n = order as i64;
    let poles = (0..n)
        .map(|i| {
            let m = (-n + 1 + 2 * i) as f64;
            -Complex64::new(0.0, PI * m / (2.0 * n as f64)).exp()
        })
        .collect();
    Zpk {
        zeros: vec![],
        poles,
        gain: 1.0,
    }
}

fn lowpass(zpk: Zpk, wo: f64) -> Zpk {
    let degree = zpk.poles.len() - zpk.zeros.len();
    Zpk {
        zeros: zpk.zeros.iter().map(|z| *z * wo).collect(),
        poles: zpk.poles.iter().map(|p| *p * wo).collect(),
        gain: zpk.gain * wo.powi(degree as i32),
    }
}

fn highpass(zpk: Zpk, wo: f64) -> Zpk {
    let degree = zpk.poles.len() - zpk.zeros.len();
    let mut zeros: Vec<Complex64> = zpk.zeros.iter().map(|z| wo / *z).collect();
    zeros.extend(std::iter::repeat_n(Complex64::new(0.0, 0.0), degree));
    let num: Complex64 = zpk.zeros.iter().map(|z| -*z).product();
    let den: Complex64 = zpk.poles.iter().map(|p| -*p).product();
    Zpk {
        zeros,
        poles: zpk.poles.iter().map(|p| wo / *p).collect(),
        gain: zpk.gain * (num / den).re,
    }
}

fn bandpass(zpk: Zpk, wo: f64, bw: f64) -> Zpk {
    let degree = zpk.poles.len() - zpk.zeros.len();
    let split = |roots: &[Complex64]| -> Vec<Complex64> {
        let scaled: Vec<Complex64> = roots.iter().map(|r| *r * bw / 2.0).collect();
        let plus = scaled.iter().map(|&r| r + (r * r - wo * wo).sqrt());
        let minus = scaled.iter().map(|&r| r - (r * r - wo * wo).sqrt());
        plus.chain(minus).collect()
    };
    let mut zeros = split(&zpk.zeros);
    zeros.extend(std::iter::repeat_n(Complex64::new(0.0, 0.0), degree));
    Zpk {
        zeros,
        poles: split(&zpk.poles),
        gain: zpk.gain * bw.powi(degree as i32),
    }
}

/// Bilinear transform for a sampling rate of 2 (frequencies normalized to Nyquist). Zeros at
/// analog infinity land on z = -1.
fn bilinear(zpk: Zpk) -> Zpk {
    let fs2 = Complex64::new(4.0, 0.0);
    let degree = zpk.poles.len() - zpk.zeros.len();
    let mut zeros: Vec<Complex64> = zpk.zeros.iter().map(|&z| (fs2 + z) / (fs2 - z)).collect();
    zeros.extend(std::iter::repeat_n(Complex64::new(-1.0, 0.0), degree));
    let num: Complex64 = zpk.zeros.iter().map(|&z| fs2 - z).product();
    let den: Complex64 = zpk.poles.iter().map(|&p| fs2 - p).product();
    Zpk {
        zeros,
        poles: zpk.poles.iter().map(|&p| (fs2 + p) / (fs2 - p)).collect(),
        gain: zpk.gain * (num / den).re,
    }
}

/// Groups roots into conjugate pairs. Real roots are paired smallest with largest, so that a
/// band pass gets one zero at +1 and one at -1 per section.
fn pair_roots(roots: &[Complex64]) -> Vec<Vec<Complex64>> {
    let mut complex: Vec<Complex64> = roots
        .iter()
        .filter(|r| r.im > IMAG_TOLERANCE)
        .copied()
        .collect();
    complex.sort_by(|a, b| b.norm().total_cmp(&a.norm()));
    let mut real: Vec<f64> = roots
        .iter()
        .filter(|r| r.im.abs() <= IMAG_TOLERANCE)
        .map(|r| r.re)
        .collect();
    real.sort_by(f64::total_cmp);

    let mut groups: Vec<Vec<Complex64>> = complex.iter().map(|r| vec![*r, r.conj()]).collect();
    let (mut lo, mut hi) = (0, real.len());
    while lo < hi {
        if hi - lo == 1 {
            groups.push(vec![Complex64::new(real[lo], 0.0)]);
        } else {
            groups.push(vec![
                Complex64::new(real[lo], 0.0),
                Complex64::new(real[hi - 1], 0.0),
            ]);
        }
        lo += 1;
        hi -= 1;
    }
    groups
}

fn polynomial(roots: &[Complex64]) -> [f64; 3] {
    match roots {
        [] => [1.0, 0.0, 0.0],
        [r] => [1.0, -r.re, 0.0],
        [r1, r2, ..] => [1.0, -(r1 + r2).re, (r1 * r2).re],
    }
}

fn to_sos(zpk: Zpk) -> Sos {
    let pole_groups = pair_roots(&zpk.poles);
    let zero_groups = pair_roots(&zpk.zeros);
    let sections = pole_groups
        .iter()
        .enumerate()
        .map(|(i, poles)| {
            let b = polynomial(zero_groups.get(i).map(Vec::as_slice).unwrap_or(&[]));
            let a = polynomial(poles);
            let k = if i == 0 { zpk.gain } else { 1.0 };
            [k * b[0], k * b[1], k * b[2], a[0], a[1], a[2]]
        })
        .collect();
    Sos { sections }
}

/// Designs a digital Butterworth filter of the given order.
///
/// # Errors
/// `ExplorerError::Precondition` for order 0, corner frequencies that are not strictly between
/// 0 and the Nyquist frequency, or a band pass with `freqmin >= freqmax`.
/// Highest prototype order accepted for the `corners` parameter of the pass filters.
pub const MAX_CORNERS: i64 = 24;

pub fn butterworth(order: usize, band: Band, sampling_rate: f64) -> ExplorerResult<Sos> {
    if order == 0 {
        return Err(ExplorerError::Precondition(
            "filter order must be at least 1".to_string(),
        ));
    }
    let nyquist = sampling_rate / 2.0;
    let normalize = |f: f64| -> ExplorerResult<f64> {
        if f.is_nan() || f <= 0.0 || f >= nyquist {
            return Err(ExplorerError::Precondition(format!(
                "corner frequency {f} Hz must lie between 0 and the Nyquist frequency {nyquist} Hz"
            )));
        }
        Ok(4.0 * (PI * f / nyquist / 2.0).tan())
    };
    let analog = match band {
        Band::LowPass(freq) => lowpass(prototype(order), normalize(freq)?),
        Band::HighPass(freq) => highpass(prototype(order), normalize(freq)?),
        Band::BandPass(freqmin, freqmax) => {
            if freqmin >= freqmax {
                return Err(ExplorerError::Precondition(format!(
                    "freqmin ({freqmin} Hz) must be below freqmax ({freqmax} Hz)"
                )));
            }
            let low = normalize(freqmin)?;
            let high = normalize(freqmax)?;
            bandpass(prototype(order), (low * high).sqrt(), high - low)
        }
    };
    Ok(to_sos(bilinear(analog)))
}

impl Sos {
    /// Runs the cascade over `data` in place (direct form II transposed, zero initial state).
    pub fn filter_in_place(&self, data: &mut [f64]) {
        for [b0, b1, b2, _, a1, a2] in &self.sections {
            let (mut z0, mut z1) = (0.0, 0.0);
            for x in data.iter_mut() {
                let y = b0 * *x + z0;
                z0 = b1 * *x - a1 * y + z1;
                z1 = b2 * *x - a2 * y;
                *x = y;
            }
        }
    }

    /// Filters `data`; with `zerophase` a second pass over the reversed output cancels the phase
    /// shift and squares the amplitude response.
    pub fn apply(&self, mut data: Array1<f64>, zerophase: bool) -> Array1<f64> {
        let mut samples = data.to_vec();
        self.filter_in_place(&mut samples);
        if zerophase {
            samples.reverse();
            self.filter_in_place(&mut samples);
            samples.reverse();
        }
        data.iter_mut().zip(samples).for_each(|(d, s)| *d = s);
        data
    }
}

/// Filters a trace with a Butterworth design, recording `description` in its history.
pub fn filter_trace(
    trace: &Trace,
    band: Band,
    corners: usize,
    zerophase: bool,
    description: String,
) -> ExplorerResult<Trace> {
    trace.require_unmasked(&description)?;
    let sos = butterworth(corners, band, trace.sampling_rate)
        .map_err(|e| match e {
            ExplorerError::Precondition(msg) => {
                ExplorerError::Precondition(format!("{}: {msg}", trace.id))
            }
            other => other,
        })?;
    debug!(
        "{description} on {} with {} sections",
        trace.id,
        sos.sections.len()
    );
    Ok(trace.with_samples(sos.apply(trace.data_f64(), zerophase), description))
}
