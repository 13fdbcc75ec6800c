//! Instrument response model and its evaluation in the frequency domain.
//!
//! A `Response` is the cascade of the stages a signal passes on its way from ground motion to
//! digital counts. `Response::evaluate` multiplies the complex transfer function of every stage
//! with its stage gain and, on request, converts the input quantity (for example from velocity to
//! displacement) by multiplying with powers of `iω`.

use crate::error::{ExplorerError, ExplorerResult};
use interp1d::Interp1d;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Physical quantity a response is evaluated for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseOutput {
    /// The native input units of the first stage.
    Default,
    Displacement,
    #[default]
    Velocity,
    Acceleration,
}

impl ResponseOutput {
    fn order(self) -> Option<i32> {
        match self {
            ResponseOutput::Default => None,
            ResponseOutput::Displacement => Some(0),
            ResponseOutput::Velocity => Some(1),
            ResponseOutput::Acceleration => Some(2),
        }
    }
}

impl FromStr for ResponseOutput {
    type Err = ExplorerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEF" | "DEFAULT" => Ok(ResponseOutput::Default),
            "DISP" | "DISPLACEMENT" => Ok(ResponseOutput::Displacement),
            "VEL" | "VELOCITY" => Ok(ResponseOutput::Velocity),
            "ACC" | "ACCELERATION" => Ok(ResponseOutput::Acceleration),
            other => Err(ExplorerError::Validation(format!(
                "unknown response output '{other}'"
            ))),
        }
    }
}

impl fmt::Display for ResponseOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResponseOutput::Default => "DEF",
            ResponseOutput::Displacement => "DISP",
            ResponseOutput::Velocity => "VEL",
            ResponseOutput::Acceleration => "ACC",
        };
        write!(f, "{name}")
    }
}

/// Time derivative order of a unit string: 0 for displacement, 1 for velocity, 2 for
/// acceleration. `None` for anything else (pressure, volts, counts, ...).
pub fn unit_order(units: &str) -> Option<i32> {
    let u = units.trim().to_ascii_uppercase().replace(' ', "");
    let length = ["M", "NM", "MM", "CM", "UM"];
    let (base, order) = if let Some(base) = u.strip_suffix("/S**2") {
        (base, 2)
    } else if let Some(base) = u.strip_suffix("/S/S") {
        (base, 2)
    } else if let Some(base) = u.strip_suffix("/S^2") {
        (base, 2)
    } else if let Some(base) = u.strip_suffix("/S2") {
        (base, 2)
    } else if let Some(base) = u.strip_suffix("/SEC**2") {
        (base, 2)
    } else if let Some(base) = u.strip_suffix("/S") {
        (base, 1)
    } else if let Some(base) = u.strip_suffix("/SEC") {
        (base, 1)
    } else {
        (u.as_str(), 0)
    };
    length.contains(&base).then_some(order)
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct InstrumentSensitivity {
    pub value: f64,
    pub frequency: f64,
    pub input_units: String,
    pub output_units: String,
}

/// Domain in which poles and zeros are given.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PzTransferFunction {
    /// Laplace transform, rad/s.
    LaplaceRadians,
    /// Laplace transform, Hz.
    LaplaceHertz,
    /// Z transform of a digital stage.
    DigitalZ,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FirSymmetry {
    None,
    /// Even number of taps; only the first half is stored.
    Even,
    /// Odd number of taps; the first half plus the centre tap is stored.
    Odd,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StageKind {
    PolesZeros {
        transfer_function: PzTransferFunction,
        normalization_factor: f64,
        normalization_frequency: f64,
        zeros: Vec<Complex64>,
        poles: Vec<Complex64>,
    },
    Coefficients {
        numerators: Vec<f64>,
        denominators: Vec<f64>,
    },
    Fir {
        symmetry: FirSymmetry,
        coefficients: Vec<f64>,
    },
    /// Tabulated response; amplitudes are the full stage response, phases in degrees.
    ResponseList {
        frequencies: Vec<f64>,
        amplitudes: Vec<f64>,
        phases: Vec<f64>,
    },
    /// Pure gain stage.
    Gain,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Decimation {
    pub input_sample_rate: f64,
    pub factor: u32,
    pub offset: u32,
    pub delay: f64,
    pub correction: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResponseStage {
    pub number: u32,
    pub input_units: String,
    pub output_units: String,
    pub kind: StageKind,
    pub gain: f64,
    pub gain_frequency: f64,
    pub decimation: Option<Decimation>,
}

impl ResponseStage {
    fn sample_rate(&self) -> ExplorerResult<f64> {
        self.decimation
            .as_ref()
            .map(|d| d.input_sample_rate)
            .filter(|&sr| sr > 0.0)
            .ok_or_else(|| {
                ExplorerError::Precondition(format!(
                    "digital response stage {} has no input sample rate",
                    self.number
                ))
            })
    }

    /// Transfer function of the stage without its stage gain.
    pub fn transfer(&self, freqs: &[f64]) -> ExplorerResult<Vec<Complex64>> {
        match &self.kind {
            StageKind::PolesZeros {
                transfer_function,
                normalization_factor,
                zeros,
                poles,
                ..
            } => {
                let variable: Box<dyn Fn(f64) -> Complex64> = match transfer_function {
                    PzTransferFunction::LaplaceRadians => {
                        Box::new(|f| Complex64::new(0.0, 2.0 * PI * f))
                    }
                    PzTransferFunction::LaplaceHertz => Box::new(|f| Complex64::new(0.0, f)),
                    PzTransferFunction::DigitalZ => {
                        let sr = self.sample_rate()?;
                        Box::new(move |f| Complex64::from_polar(1.0, 2.0 * PI * f / sr))
                    }
                };
                Ok(freqs
                    .iter()
                    .map(|&f| {
                        let s = variable(f);
                        let num: Complex64 = zeros.iter().map(|z| s - z).product();
                        let den: Complex64 = poles.iter().map(|p| s - p).product();
                        num / den * *normalization_factor
                    })
                    .collect())
            }
            StageKind::Coefficients {
                numerators,
                denominators,
            } => {
                if numerators.is_empty() && denominators.is_empty() {
                    return Ok(vec![Complex64::new(1.0, 0.0); freqs.len()]);
                }
                let sr = self.sample_rate()?;
                Ok(freqs
                    .iter()
                    .map(|&f| {
                        let num = polyval_z(numerators, f, sr);
                        let den = if denominators.is_empty() {
                            Complex64::new(1.0, 0.0)
                        } else {
                            polyval_z(denominators, f, sr)
                        };
                        num / den
                    })
                    .collect())
            }
            StageKind::Fir {
                symmetry,
                coefficients,
            } => {
                if coefficients.is_empty() {
                    return Ok(vec![Complex64::new(1.0, 0.0); freqs.len()]);
                }
                let sr = self.sample_rate()?;
                let taps = expand_fir(*symmetry, coefficients);
                Ok(freqs.iter().map(|&f| polyval_z(&taps, f, sr)).collect())
            }
            StageKind::ResponseList {
                frequencies,
                amplitudes,
                phases,
            } => interpolate_response_list(frequencies, amplitudes, phases, freqs),
            StageKind::Gain => Ok(vec![Complex64::new(1.0, 0.0); freqs.len()]),
        }
    }

    fn applies_gain(&self) -> bool {
        !matches!(self.kind, StageKind::ResponseList { .. })
    }
}

/// `Σ c_k z^-k` on the unit circle at frequency `f`.
fn polyval_z(coefficients: &[f64], f: f64, sample_rate: f64) -> Complex64 {
    let w = 2.0 * PI * f / sample_rate;
    coefficients
        .iter()
        .enumerate()
        .map(|(k, c)| Complex64::from_polar(*c, -w * k as f64))
        .sum()
}

fn expand_fir(symmetry: FirSymmetry, coefficients: &[f64]) -> Vec<f64> {
    let mut taps = coefficients.to_vec();
    match symmetry {
        FirSymmetry::None => {}
        FirSymmetry::Even => taps.extend(coefficients.iter().rev()),
        FirSymmetry::Odd => taps.extend(coefficients.iter().rev().skip(1)),
    }
    taps
}

fn interpolate_response_list(
    frequencies: &[f64],
    amplitudes: &[f64],
    phases: &[f64],
    freqs: &[f64],
) -> ExplorerResult<Vec<Complex64>> {
    if frequencies.is_empty()
        || frequencies.len() != amplitudes.len()
        || frequencies.len() != phases.len()
    {
        return Err(ExplorerError::Format(
            "response list needs matching, non-empty frequency, amplitude and phase lists"
                .to_string(),
        ));
    }
    let x: Vec<f32> = frequencies.iter().map(|&f| f as f32).collect();
    let amp = Interp1d::new_unsorted(x.clone(), amplitudes.iter().map(|&a| a as f32).collect())
        .map_err(|_| ExplorerError::Format("invalid response list amplitudes".to_string()))?;
    let pha = Interp1d::new_unsorted(x.clone(), phases.iter().map(|&p| p as f32).collect())
        .map_err(|_| ExplorerError::Format("invalid response list phases".to_string()))?;
    let lo = x.iter().copied().fold(f32::INFINITY, f32::min);
    let hi = x.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    Ok(freqs
        .iter()
        .map(|&f| {
            let f = (f as f32).clamp(lo, hi);
            let a = amp.interpolate(f) as f64;
            let phi = (pha.interpolate(f) as f64).to_radians();
            Complex64::from_polar(a, phi)
        })
        .collect())
}

/// Complete channel response.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Response {
    pub instrument_sensitivity: Option<InstrumentSensitivity>,
    pub stages: Vec<ResponseStage>,
}

impl Response {
    /// Response with a single frequency independent gain stage.
    pub fn flat(gain: f64, input_units: &str) -> Self {
        Response {
            instrument_sensitivity: Some(InstrumentSensitivity {
                value: gain,
                frequency: 1.0,
                input_units: input_units.to_string(),
                output_units: "COUNTS".to_string(),
            }),
            stages: vec![ResponseStage {
                number: 1,
                input_units: input_units.to_string(),
                output_units: "COUNTS".to_string(),
                kind: StageKind::Gain,
                gain,
                gain_frequency: 1.0,
                decimation: None,
            }],
        }
    }

    /// Input units of the first stage, or of the sensitivity when there are no stages.
    pub fn input_units(&self) -> Option<&str> {
        self.stages
            .first()
            .map(|s| s.input_units.as_str())
            .or(self
                .instrument_sensitivity
                .as_ref()
                .map(|s| s.input_units.as_str()))
    }

    /// Complex response at `freqs` for the requested output quantity.
    ///
    /// Without stages the overall sensitivity is used as a flat response.
    pub fn evaluate(
        &self,
        freqs: &[f64],
        output: ResponseOutput,
    ) -> ExplorerResult<Vec<Complex64>> {
        let mut total = if self.stages.is_empty() {
            let sensitivity = self.instrument_sensitivity.as_ref().ok_or_else(|| {
                ExplorerError::Precondition("response has neither stages nor sensitivity".into())
            })?;
            vec![Complex64::new(sensitivity.value, 0.0); freqs.len()]
        } else {
            vec![Complex64::new(1.0, 0.0); freqs.len()]
        };
        for stage in &self.stages {
            let transfer = stage.transfer(freqs)?;
            let gain = if stage.applies_gain() { stage.gain } else { 1.0 };
            for (t, h) in total.iter_mut().zip(transfer) {
                *t *= h * gain;
            }
        }

        if let Some(out_order) = output.order() {
            let units = self.input_units().unwrap_or("");
            let in_order = unit_order(units).ok_or_else(|| {
                ExplorerError::Precondition(format!(
                    "cannot convert response input units '{units}' to {output}"
                ))
            })?;
            let power = in_order - out_order;
            if power != 0 {
                for (t, &f) in total.iter_mut().zip(freqs) {
                    let iw = Complex64::new(0.0, 2.0 * PI * f);
                    *t = if f == 0.0 && power < 0 {
                        Complex64::new(0.0, 0.0)
                    } else {
                        *t * iw.powi(power)
                    };
                }
            }
        }
        Ok(total)
    }

    /// Product of all stage gains.
    pub fn stage_gain_product(&self) -> f64 {
        self.stages.iter().map(|s| s.gain).product()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Two-pole 1 Hz velocity sensor followed by a digitizer gain, normalized at 5 Hz.
    pub(crate) fn geophone_response() -> Response {
        let poles = vec![
            Complex64::new(-4.443, 4.443),
            Complex64::new(-4.443, -4.443),
        ];
        let zeros = vec![Complex64::new(0.0, 0.0), Complex64::new(0.0, 0.0)];
        let s = Complex64::new(0.0, 2.0 * PI * 5.0);
        let h: Complex64 = zeros.iter().map(|z| s - z).product::<Complex64>()
            / poles.iter().map(|p| s - p).product::<Complex64>();
        Response {
            instrument_sensitivity: Some(InstrumentSensitivity {
                value: 28.8 * 400_000.0,
                frequency: 5.0,
                input_units: "M/S".to_string(),
                output_units: "COUNTS".to_string(),
            }),
            stages: vec![
                ResponseStage {
                    number: 1,
                    input_units: "M/S".to_string(),
                    output_units: "V".to_string(),
                    kind: StageKind::PolesZeros {
                        transfer_function: PzTransferFunction::LaplaceRadians,
                        normalization_factor: 1.0 / h.norm(),
                        normalization_frequency: 5.0,
                        zeros,
                        poles,
                    },
                    gain: 28.8,
                    gain_frequency: 5.0,
                    decimation: None,
                },
                ResponseStage {
                    number: 2,
                    input_units: "V".to_string(),
                    output_units: "COUNTS".to_string(),
                    kind: StageKind::Coefficients {
                        numerators: vec![1.0],
                        denominators: vec![],
                    },
                    gain: 400_000.0,
                    gain_frequency: 5.0,
                    decimation: Some(Decimation {
                        input_sample_rate: 100.0,
                        factor: 1,
                        offset: 0,
                        delay: 0.0,
                        correction: 0.0,
                    }),
                },
            ],
        }
    }

    #[test]
    fn test_unit_order() {
        assert_eq!(unit_order("M"), Some(0));
        assert_eq!(unit_order("m/s"), Some(1));
        assert_eq!(unit_order("NM/S"), Some(1));
        assert_eq!(unit_order("M/S**2"), Some(2));
        assert_eq!(unit_order("m/s/s"), Some(2));
        assert_eq!(unit_order("PA"), None);
        assert_eq!(unit_order("COUNTS"), None);
    }

    #[test]
    fn test_evaluate_at_normalization_frequency() {
        let response = geophone_response();
        let h = response.evaluate(&[5.0], ResponseOutput::Velocity).unwrap();
        assert_relative_eq!(h[0].norm(), response.stage_gain_product(), max_relative = 1e-9);
        assert_relative_eq!(
            h[0].norm(),
            response.instrument_sensitivity.as_ref().unwrap().value,
            max_relative = 1e-9
        );
    }

    #[test]
    fn test_unit_conversion() {
        let response = Response::flat(1000.0, "M/S");
        let f = 2.0;
        let disp = response.evaluate(&[f], ResponseOutput::Displacement).unwrap();
        assert_relative_eq!(disp[0].norm(), 1000.0 * 2.0 * PI * f, max_relative = 1e-12);
        let acc = response.evaluate(&[f], ResponseOutput::Acceleration).unwrap();
        assert_relative_eq!(acc[0].norm(), 1000.0 / (2.0 * PI * f), max_relative = 1e-12);
        assert_eq!(
            response.evaluate(&[0.0], ResponseOutput::Acceleration).unwrap()[0],
            Complex64::new(0.0, 0.0)
        );
        let pressure = Response::flat(1.0, "PA");
        assert!(pressure.evaluate(&[1.0], ResponseOutput::Velocity).is_err());
        assert!(pressure.evaluate(&[1.0], ResponseOutput::Default).is_ok());
    }

    #[test]
    fn test_symmetric_fir_dc_gain() {
        let stage = ResponseStage {
            number: 3,
            input_units: "COUNTS".to_string(),
            output_units: "COUNTS".to_string(),
            kind: StageKind::Fir {
                symmetry: FirSymmetry::Odd,
                coefficients: vec![0.25, 0.5],
            },
            gain: 1.0,
            gain_frequency: 0.0,
            decimation: Some(Decimation {
                input_sample_rate: 100.0,
                factor: 1,
                offset: 0,
                delay: 0.0,
                correction: 0.0,
            }),
        };
        let h = stage.transfer(&[0.0, 50.0]).unwrap();
        assert_relative_eq!(h[0].re, 1.0, epsilon = 1e-12);
        assert_relative_eq!(h[1].norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_digital_stage_needs_sample_rate() {
        let mut response = geophone_response();
        response.stages[1].decimation = None;
        response.stages[1].kind = StageKind::Coefficients {
            numerators: vec![0.5, 0.5],
            denominators: vec![],
        };
        assert!(matches!(
            response.evaluate(&[1.0], ResponseOutput::Velocity),
            Err(ExplorerError::Precondition(_))
        ));
    }

    #[test]
    fn test_output_parse() {
        assert_eq!("VEL".parse::<ResponseOutput>().unwrap(), ResponseOutput::Velocity);
        assert_eq!(
            "displacement".parse::<ResponseOutput>().unwrap(),
            ResponseOutput::Displacement
        );
        assert!("JERK".parse::<ResponseOutput>().is_err());
    }
}
