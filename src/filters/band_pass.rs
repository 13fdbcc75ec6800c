//! Butterworth band pass filter.
//!
//! Keeps the frequencies between `freqmin` and `freqmax`. Both corners must lie strictly
//! between 0 and the Nyquist frequency of the trace; a corner at or above Nyquist is rejected
//! instead of silently turning the filter into a high pass.

use crate::data_container::Trace;
use crate::error::ExplorerResult;
use crate::filters::filter::{
    flag, unknown_parameter, whole_number, Filter, FilterConfig, FilterDomain,
};
use crate::filters::iir::{filter_trace, Band, MAX_CORNERS};
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
pub struct BandPass {
    /// Lower corner in Hz.
    pub freqmin: f64,
    /// Upper corner in Hz.
    pub freqmax: f64,
    /// Order of the prototype.
    pub corners: usize,
    /// Run forward and backward to cancel the phase shift.
    pub zerophase: bool,
}

impl Filter for BandPass {
    fn new() -> Self
    where
        Self: Sized,
    {
        BandPass {
            freqmin: 1.0,
            freqmax: 20.0,
            corners: 4,
            zerophase: false,
        }
    }

    fn config(&self) -> FilterConfig {
        FilterConfig {
            name: "Band Pass".to_string(),
            description: "Butterworth band pass in second-order sections.".to_string(),
            hyperlink: None,
            domain: FilterDomain::Time,
        }
    }

    fn parameters(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("freqmin".to_string(), self.freqmin),
            ("freqmax".to_string(), self.freqmax),
            ("corners".to_string(), self.corners as f64),
            ("zerophase".to_string(), f64::from(u8::from(self.zerophase))),
        ])
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> ExplorerResult<()> {
        match name {
            "freqmin" => self.freqmin = value,
            "freqmax" => self.freqmax = value,
            "corners" => {
                self.corners =
                    whole_number(&self.config().name, name, value, 1..=MAX_CORNERS)? as usize
            }
            "zerophase" => self.zerophase = flag(value),
            _ => return Err(unknown_parameter(&self.config().name, name)),
        }
        Ok(())
    }

    fn filter(&self, trace: &Trace) -> ExplorerResult<Trace> {
        filter_trace(
            trace,
            Band::BandPass(self.freqmin, self.freqmax),
            self.corners,
            self.zerophase,
            format!(
                "bandpass: freqmin={}, freqmax={}, corners={}, zerophase={}",
                self.freqmin, self.freqmax, self.corners, self.zerophase
            ),
        )
    }
}
