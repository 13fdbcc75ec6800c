//! Butterworth high pass filter.

use crate::data_container::Trace;
use crate::error::ExplorerResult;
use crate::filters::filter::{
    flag, unknown_parameter, whole_number, Filter, FilterConfig, FilterDomain,
};
use crate::filters::iir::{filter_trace, Band, MAX_CORNERS};
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
pub struct HighPass {
    /// Corner in Hz, below the Nyquist frequency.
    pub freq: f64,
    pub corners: usize,
    pub zerophase: bool,
}

impl Filter for HighPass {
    fn new() -> Self
    where
        Self: Sized,
    {
        HighPass {
            freq: 1.0,
            corners: 4,
            zerophase: false,
        }
    }

    fn config(&self) -> FilterConfig {
        FilterConfig {
            name: "High Pass".to_string(),
            description: "Butterworth high pass in second-order sections.".to_string(),
            hyperlink: None,
            domain: FilterDomain::Time,
        }
    }

    fn parameters(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("freq".to_string(), self.freq),
            ("corners".to_string(), self.corners as f64),
            ("zerophase".to_string(), f64::from(u8::from(self.zerophase))),
        ])
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> ExplorerResult<()> {
        match name {
            "freq" => self.freq = value,
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
            Band::HighPass(self.freq),
            self.corners,
            self.zerophase,
            format!(
                "highpass: freq={}, corners={}, zerophase={}",
                self.freq, self.corners, self.zerophase
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_container::{Samples, TraceId};
    use chrono::{TimeZone, Utc};
    use ndarray::Array1;

    #[test]
    fn test_removes_offset() {
        let trace = Trace::new(
            TraceId::new("OO", "AXAS1", "", "EHZ"),
            Utc.with_ymd_and_hms(2019, 11, 1, 0, 0, 0).unwrap(),
            100.0,
            Samples::Float64(Array1::from_elem(6000, 50.0)),
        );
        let out = HighPass::new().filter(&trace).unwrap();
        assert!(out.data_f64()[5999].abs() < 1e-3);
    }

    #[test]
    fn test_masked_trace_rejected() {
        let mut trace = Trace::new(
            TraceId::new("OO", "AXAS1", "", "EHZ"),
            Utc.with_ymd_and_hms(2019, 11, 1, 0, 0, 0).unwrap(),
            100.0,
            Samples::Float64(Array1::zeros(4)),
        );
        trace.mask = Some(vec![false, true, false, false]);
        assert!(HighPass::new().filter(&trace).is_err());
    }
}
