//! Numerical helpers shared by the trace processors: window and taper functions, detrending,
//! FFT wrappers around `realfft`, power-of-two lengths and phase unwrapping.

use crate::error::{ExplorerError, ExplorerResult};
use ndarray::Array1;
use num_complex::Complex64;
use num_traits::Float;
use realfft::RealFftPlanner;
use std::f64::consts::PI;

/// Symmetric Hann window of length `n` (same definition as numpy's `hanning`).
pub fn hann_window(n: usize) -> Array1<f64> {
    if n <= 1 {
        return Array1::ones(n);
    }
    Array1::from_shape_fn(n, |i| 0.5 - 0.5 * (2.0 * PI * i as f64 / (n - 1) as f64).cos())
}

/// Cosine taper with half-Hann ramps covering `fraction` of the samples on each side.
///
/// # Arguments
/// - `n`: number of samples.
/// - `fraction`: ramp length per side as a fraction of `n`, clamped to `[0, 0.5]`.
pub fn cosine_taper(n: usize, fraction: f64) -> Array1<f64> {
    let mut taper = Array1::ones(n);
    let ramp = (fraction.clamp(0.0, 0.5) * n as f64).floor() as usize;
    if ramp == 0 {
        return taper;
    }
    for i in 0..ramp {
        let w = 0.5 * (1.0 - (PI * i as f64 / ramp as f64).cos());
        taper[i] = w;
        taper[n - 1 - i] = w;
    }
    taper
}

/// Removes the mean in place.
pub fn demean(data: &mut Array1<f64>) {
    if let Some(mean) = data.mean() {
        data.mapv_inplace(|x| x - mean);
    }
}

/// Removes the least-squares straight line in place.
pub fn detrend_linear(data: &mut Array1<f64>) {
    let n = data.len();
    if n < 2 {
        demean(data);
        return;
    }
    let nf = n as f64;
    let x_mean = (nf - 1.0) / 2.0;
    let y_mean = data.sum() / nf;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (i, y) in data.iter().enumerate() {
        let dx = i as f64 - x_mean;
        sxy += dx * (y - y_mean);
        sxx += dx * dx;
    }
    let slope = sxy / sxx;
    for (i, y) in data.iter_mut().enumerate() {
        *y -= y_mean + slope * (i as f64 - x_mean);
    }
}

pub fn next_pow2(n: usize) -> usize {
    n.max(1).next_power_of_two()
}

/// Power of two closest to `x` (ties go up).
pub fn nearest_pow2(x: f64) -> usize {
    if x <= 1.0 {
        return 1;
    }
    let upper = 2f64.powf(x.log2().ceil());
    let lower = 2f64.powf(x.log2().floor());
    if (upper - x).abs() <= (x - lower).abs() {
        upper as usize
    } else {
        lower as usize
    }
}

/// Frequencies of the bins returned by a real FFT of length `n` with sample spacing `d`.
pub fn rfftfreq(n: usize, d: f64) -> Array1<f64> {
    let bins = n / 2 + 1;
    Array1::from_shape_fn(bins, |k| k as f64 / (n as f64 * d))
}

/// Real FFT of `data`, zero padded to `nfft`.
pub fn rfft(data: &[f64], nfft: usize) -> ExplorerResult<Vec<Complex64>> {
    if data.len() > nfft {
        return Err(ExplorerError::Precondition(format!(
            "FFT length {nfft} shorter than input ({})",
            data.len()
        )));
    }
    let mut input = vec![0.0; nfft];
    input[..data.len()].copy_from_slice(data);
    let r2c = RealFftPlanner::<f64>::new().plan_fft_forward(nfft);
    let mut output = r2c.make_output_vec();
    r2c.process(&mut input, &mut output)
        .map_err(|e| ExplorerError::Precondition(format!("forward FFT failed: {e}")))?;
    Ok(output)
}

/// Inverse real FFT, normalized so that `irfft(rfft(x)) == x`.
pub fn irfft(spectrum: &[Complex64], nfft: usize) -> ExplorerResult<Vec<f64>> {
    let c2r = RealFftPlanner::<f64>::new().plan_fft_inverse(nfft);
    let mut input = spectrum.to_vec();
    if input.len() != nfft / 2 + 1 {
        return Err(ExplorerError::Precondition(format!(
            "spectrum has {} bins, expected {}",
            input.len(),
            nfft / 2 + 1
        )));
    }
    // realfft rejects non-zero imaginary parts on the DC and Nyquist bins
    input[0].im = 0.0;
    if nfft % 2 == 0 {
        if let Some(last) = input.last_mut() {
            last.im = 0.0;
        }
    }
    let mut output = c2r.make_output_vec();
    c2r.process(&mut input, &mut output)
        .map_err(|e| ExplorerError::Precondition(format!("inverse FFT failed: {e}")))?;
    let scale = 1.0 / nfft as f64;
    output.iter_mut().for_each(|x| *x *= scale);
    Ok(output)
}

/// Frequency-domain cosine taper defined by four corners (`f1 < f2 < f3 < f4`): zero below
/// `f1` and above `f4`, one between `f2` and `f3`, cosine ramps in between.
pub fn cosine_sac_taper(freqs: &Array1<f64>, corners: [f64; 4]) -> ExplorerResult<Array1<f64>> {
    let [f1, f2, f3, f4] = corners;
    if !(0.0 <= f1 && f1 < f2 && f2 <= f3 && f3 < f4) {
        return Err(ExplorerError::Validation(format!(
            "pre-filter corners must satisfy 0 <= f1 < f2 <= f3 < f4, got {corners:?}"
        )));
    }
    Ok(freqs.mapv(|f| {
        if f <= f1 || f >= f4 {
            0.0
        } else if f < f2 {
            0.5 * (1.0 - (PI * (f - f1) / (f2 - f1)).cos())
        } else if f <= f3 {
            1.0
        } else {
            0.5 * (1.0 + (PI * (f - f3) / (f4 - f3)).cos())
        }
    }))
}

/// Removes 2π jumps between consecutive phase values.
pub fn unwrap_phase(x: &[f64]) -> Vec<f64> {
    let period = 2.0 * PI;
    let mut unwrapped = x.to_vec();
    if x.is_empty() {
        return unwrapped;
    }
    let mut prev_val = x[0];
    let mut prev_unwrapped = x[0];
    for i in 1..x.len() {
        let val = x[i];
        let mut diff = val - prev_val;
        if diff > period / 2.0 {
            diff -= period;
        } else if diff < -period / 2.0 {
            diff += period;
        }
        let unwrapped_val = prev_unwrapped + diff;
        prev_val = val;
        prev_unwrapped = unwrapped_val;
        unwrapped[i] = unwrapped_val;
    }
    unwrapped
}

/// Minimum and maximum of the finite values, `None` when there are none.
pub fn finite_range<T: Float>(values: impl IntoIterator<Item = T>) -> Option<(T, T)> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_hann_window_symmetric() {
        let w = hann_window(9);
        assert_relative_eq!(w[0], 0.0);
        assert_relative_eq!(w[4], 1.0);
        assert_relative_eq!(w[2], w[6], epsilon = 1e-12);
    }

    #[test]
    fn test_cosine_taper_ramps() {
        let t = cosine_taper(100, 0.1);
        assert_relative_eq!(t[0], 0.0);
        assert_relative_eq!(t[99], 0.0);
        assert_relative_eq!(t[50], 1.0);
        assert!(t[5] > 0.0 && t[5] < 1.0);
        assert_eq!(cosine_taper(10, 0.0), Array1::<f64>::ones(10));
    }

    #[test]
    fn test_detrend_linear_removes_slope() {
        let mut data = Array1::from_shape_fn(50, |i| 3.0 + 0.5 * i as f64);
        detrend_linear(&mut data);
        assert!(data.iter().all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn test_pow2() {
        assert_eq!(next_pow2(1000), 1024);
        assert_eq!(next_pow2(1024), 1024);
        assert_eq!(nearest_pow2(100.0), 128);
        assert_eq!(nearest_pow2(90.0), 64);
    }

    #[test]
    fn test_fft_round_trip() {
        let data: Vec<f64> = (0..100).map(|i| (i as f64 * 0.3).sin()).collect();
        let spectrum = rfft(&data, 128).unwrap();
        let back = irfft(&spectrum, 128).unwrap();
        for (a, b) in data.iter().zip(back.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-10);
        }
        assert!(back[100..].iter().all(|v| v.abs() < 1e-10));
    }

    #[test]
    fn test_cosine_sac_taper() {
        let freqs = Array1::from(vec![0.0, 0.5, 1.5, 5.0, 9.5, 10.5, 20.0]);
        let taper = cosine_sac_taper(&freqs, [0.5, 2.0, 9.0, 10.0]).unwrap();
        assert_relative_eq!(taper[0], 0.0);
        assert_relative_eq!(taper[1], 0.0);
        assert!(taper[2] > 0.0 && taper[2] < 1.0);
        assert_relative_eq!(taper[3], 1.0);
        assert!(taper[4] > 0.0 && taper[4] < 1.0);
        assert_relative_eq!(taper[5], 0.0);
        assert!(cosine_sac_taper(&freqs, [1.0, 0.5, 9.0, 10.0]).is_err());
    }

    #[test]
    fn test_unwrap_phase() {
        let wrapped = vec![3.0, -3.0, -2.9];
        let unwrapped = unwrap_phase(&wrapped);
        assert_relative_eq!(unwrapped[1], -3.0 + 2.0 * PI, epsilon = 1e-12);
        assert!(unwrapped[2] > unwrapped[1]);
    }

    #[test]
    fn test_finite_range() {
        let range = finite_range(vec![1.0, f64::NAN, -2.0, 5.0]);
        assert_eq!(range, Some((-2.0, 5.0)));
        assert_eq!(finite_range(Vec::<f64>::new()), None);
    }
}
