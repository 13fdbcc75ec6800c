//! Instrument response removal by spectral division.
//!
//! The trace is optionally demeaned and tapered, transformed with a zero padded FFT
//! (`nfft = next_pow2(2 * npts)`), divided by the complex channel response evaluated for the
//! requested output quantity and transformed back. Two stabilizers keep the division bounded:
//!
//! * a pre-filter, a cosine taper in the frequency domain defined by four corners, and
//! * a water level, which raises every response value smaller than `max|H| * 10^(-wl/20)` to
//!   that level (keeping the phase) before the inversion.

use crate::data_container::Trace;
use crate::error::{ExplorerError, ExplorerResult};
use crate::filters::filter::{
    flag, unknown_parameter, whole_number, Filter, FilterConfig, FilterDomain,
};
use crate::math_tools::{cosine_sac_taper, cosine_taper, demean, irfft, next_pow2, rfft, rfftfreq};
use crate::response::ResponseOutput;
use log::debug;
use num_complex::Complex64;
use std::collections::BTreeMap;

/// Parameter names of the four pre-filter corners.
pub const PRE_FILT_KEYS: [&str; 4] = ["pre_filt_f1", "pre_filt_f2", "pre_filt_f3", "pre_filt_f4"];

#[derive(Clone, Debug)]
pub struct ResponseRemoval {
    pub output: ResponseOutput,
    /// Water level in dB below the maximum of the response, `None` to invert unguarded.
    pub water_level: Option<f64>,
    /// Frequency-domain cosine taper corners `f1 < f2 <= f3 < f4` in Hz.
    pub pre_filt: Option<[f64; 4]>,
    pub zero_mean: bool,
    pub taper: bool,
    pub taper_fraction: f64,
}

/// Value of the `output` parameter for `output`.
pub fn output_order(output: ResponseOutput) -> f64 {
    match output {
        ResponseOutput::Default => -1.0,
        ResponseOutput::Displacement => 0.0,
        ResponseOutput::Velocity => 1.0,
        ResponseOutput::Acceleration => 2.0,
    }
}

/// Inverts `spectrum` in place. Values below the water level are raised to it first; without a
/// water level, zeros stay zero.
fn invert_spectrum(spectrum: &mut [Complex64], water_level: Option<f64>) {
    let level = water_level.map(|wl| {
        let max = spectrum.iter().map(|h| h.norm()).fold(0.0, f64::max);
        max * 10f64.powf(-wl.abs() / 20.0)
    });
    for h in spectrum.iter_mut() {
        let magnitude = h.norm();
        if let Some(level) = level {
            if magnitude == 0.0 {
                *h = Complex64::new(level, 0.0);
            } else if magnitude < level {
                *h *= level / magnitude;
            }
        }
        if h.norm() > 0.0 {
            *h = h.inv();
        }
    }
}

impl Filter for ResponseRemoval {
    fn new() -> Self
    where
        Self: Sized,
    {
        ResponseRemoval {
            output: ResponseOutput::Velocity,
            water_level: Some(60.0),
            pre_filt: None,
            zero_mean: true,
            taper: true,
            taper_fraction: 0.05,
        }
    }

    fn config(&self) -> FilterConfig {
        FilterConfig {
            name: "Remove Response".to_string(),
            description: "Deconvolves the attached instrument response into physical units."
                .to_string(),
            hyperlink: Some((
                Some("FDSN StationXML".to_string()),
                "https://docs.fdsn.org/projects/stationxml/en/latest/response.html".to_string(),
            )),
            domain: FilterDomain::Frequency,
        }
    }

    /// `output` is the time derivative order of the result (0 displacement, 1 velocity,
    /// 2 acceleration, -1 the native input units); a negative `water_level` disables it.
    fn parameters(&self) -> BTreeMap<String, f64> {
        let mut parameters = BTreeMap::from([
            ("output".to_string(), output_order(self.output)),
            ("water_level".to_string(), self.water_level.unwrap_or(-1.0)),
            ("zero_mean".to_string(), f64::from(u8::from(self.zero_mean))),
            ("taper".to_string(), f64::from(u8::from(self.taper))),
            ("taper_fraction".to_string(), self.taper_fraction),
        ]);
        if let Some(corners) = self.pre_filt {
            for (key, value) in PRE_FILT_KEYS.iter().zip(corners) {
                parameters.insert(key.to_string(), value);
            }
        }
        parameters
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> ExplorerResult<()> {
        match name {
            "output" => {
                self.output = match whole_number(&self.config().name, name, value, -1..=2)? {
                    -1 => ResponseOutput::Default,
                    0 => ResponseOutput::Displacement,
                    1 => ResponseOutput::Velocity,
                    _ => ResponseOutput::Acceleration,
                }
            }
            "water_level" => self.water_level = (value >= 0.0).then_some(value),
            "zero_mean" => self.zero_mean = flag(value),
            "taper" => self.taper = flag(value),
            "taper_fraction" => self.taper_fraction = value,
            _ => match PRE_FILT_KEYS.iter().position(|k| *k == name) {
                Some(i) => self.pre_filt.get_or_insert([0.0; 4])[i] = value,
                None => return Err(unknown_parameter(&self.config().name, name)),
            },
        }
        Ok(())
    }

    fn filter(&self, trace: &Trace) -> ExplorerResult<Trace> {
        trace.require_unmasked("response removal")?;
        let response = trace.response.as_ref().ok_or_else(|| {
            ExplorerError::Precondition(format!(
                "no instrument response attached to {}",
                trace.id
            ))
        })?;
        let npts = trace.npts();
        if npts == 0 {
            return Err(ExplorerError::Precondition(format!(
                "{} has no samples",
                trace.id
            )));
        }

        let mut data = trace.data_f64();
        if self.zero_mean {
            demean(&mut data);
        }
        if self.taper {
            data *= &cosine_taper(npts, self.taper_fraction);
        }

        let nfft = next_pow2(2 * npts);
        let freqs = rfftfreq(nfft, trace.delta());
        let mut spectrum = rfft(&data.to_vec(), nfft)?;
        let mut inverse = response.evaluate(&freqs.to_vec(), self.output)?;
        if let Some(corners) = self.pre_filt {
            let window = cosine_sac_taper(&freqs, corners)?;
            spectrum
                .iter_mut()
                .zip(window.iter())
                .for_each(|(s, w)| *s *= *w);
        }
        invert_spectrum(&mut inverse, self.water_level);
        spectrum
            .iter_mut()
            .zip(&inverse)
            .for_each(|(s, h)| *s *= *h);

        let restored = irfft(&spectrum, nfft)?;
        debug!(
            "removed response of {} (nfft {nfft}, output {})",
            trace.id, self.output
        );
        Ok(trace.with_samples(
            restored[..npts].iter().copied().collect(),
            format!(
                "remove_response: output={}, water_level={:?}, pre_filt={:?}",
                self.output, self.water_level, self.pre_filt
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_container::{Samples, TraceId};
    use crate::response::tests::geophone_response;
    use crate::response::Response;
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};
    use ndarray::{s, Array1};
    use std::f64::consts::PI;
    use std::sync::Arc;

    fn trace(values: Array1<f64>, response: Option<Response>) -> Trace {
        let mut trace = Trace::new(
            TraceId::new("OO", "AXAS1", "", "EHZ"),
            Utc.with_ymd_and_hms(2019, 11, 1, 0, 0, 0).unwrap(),
            100.0,
            Samples::Float64(values),
        );
        trace.response = response.map(Arc::new);
        trace
    }

    #[test]
    fn test_flat_response_divides_by_sensitivity() {
        let values = Array1::from_shape_fn(1000, |i| (i as f64 * 0.37).sin() * 5000.0 + 120.0);
        let input = trace(values.clone(), Some(Response::flat(2000.0, "M/S")));
        let mut removal = ResponseRemoval::new();
        removal.set_parameter("zero_mean", 0.0).unwrap();
        removal.set_parameter("taper", 0.0).unwrap();
        let out = removal.filter(&input).unwrap();
        assert_eq!(out.npts(), 1000);
        for (o, i) in out.data_f64().iter().zip(values.iter()) {
            assert_relative_eq!(*o, i / 2000.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_output_order_must_be_whole() {
        let mut removal = ResponseRemoval::new();
        for value in [1.7, -0.5, 3.0, f64::NAN] {
            assert!(matches!(
                removal.set_parameter("output", value),
                Err(ExplorerError::Validation(_))
            ));
        }
        removal.set_parameter("output", 2.0).unwrap();
        assert_eq!(removal.parameters()["output"], 2.0);
        removal.set_parameter("output", -1.0).unwrap();
        assert_eq!(removal.parameters()["output"], -1.0);
    }

    #[test]
    fn test_missing_response() {
        let input = trace(Array1::zeros(100), None);
        assert!(matches!(
            ResponseRemoval::new().filter(&input),
            Err(ExplorerError::Precondition(_))
        ));
    }

    #[test]
    fn test_geophone_velocity_amplitude() {
        let response = geophone_response();
        let sensitivity = response.stage_gain_product();
        let values =
            Array1::from_shape_fn(2000, |i| 1e4 * (2.0 * PI * 5.0 * i as f64 / 100.0).sin());
        let input = trace(values, Some(response));
        let mut removal = ResponseRemoval::new();
        for (i, f) in [1.0, 2.0, 20.0, 30.0].into_iter().enumerate() {
            removal.set_parameter(PRE_FILT_KEYS[i], f).unwrap();
        }
        let out = removal.filter(&input).unwrap().data_f64();
        let peak = out
            .slice(s![800..1200])
            .iter()
            .fold(0.0f64, |m, x| m.max(x.abs()));
        assert_relative_eq!(peak, 1e4 / sensitivity, max_relative = 0.03);
    }

    #[test]
    fn test_water_level_bounds_inverse() {
        let mut spectrum = vec![
            Complex64::new(100.0, 0.0),
            Complex64::new(0.0, 0.01),
            Complex64::new(0.0, 0.0),
        ];
        invert_spectrum(&mut spectrum, Some(20.0));
        assert_relative_eq!(spectrum[0].re, 0.01);
        assert_relative_eq!(spectrum[1].norm(), 0.1, epsilon = 1e-12);
        assert_relative_eq!(spectrum[2].re, 0.1, epsilon = 1e-12);
    }
}
