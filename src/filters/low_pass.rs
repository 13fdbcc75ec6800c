//! Butterworth low pass filter.

use crate::data_container::Trace;
use crate::error::ExplorerResult;
use crate::filters::filter::{
    flag, unknown_parameter, whole_number, Filter, FilterConfig, FilterDomain,
};
use crate::filters::iir::{filter_trace, Band, MAX_CORNERS};
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
pub struct LowPass {
    /// Corner in Hz, below the Nyquist frequency.
    pub freq: f64,
    pub corners: usize,
    pub zerophase: bool,
}

impl Filter for LowPass {
    fn new() -> Self
    where
        Self: Sized,
    {
        LowPass {
            freq: 10.0,
            corners: 4,
            zerophase: false,
        }
    }

    fn config(&self) -> FilterConfig {
        FilterConfig {
            name: "Low Pass".to_string(),
            description: "Butterworth low pass in second-order sections.".to_string(),
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
            Band::LowPass(self.freq),
            self.corners,
            self.zerophase,
            format!(
                "lowpass: freq={}, corners={}, zerophase={}",
                self.freq, self.corners, self.zerophase
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_container::{Samples, TraceId};
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};
    use ndarray::Array1;

    #[test]
    fn test_dc_gain_is_one() {
        let trace = Trace::new(
            TraceId::new("OO", "AXAS1", "", "EHZ"),
            Utc.with_ymd_and_hms(2019, 11, 1, 0, 0, 0).unwrap(),
            200.0,
            Samples::Int32(Array1::from_elem(4000, 1200)),
        );
        let mut filter = LowPass::new();
        filter.set_parameter("zerophase", 1.0).unwrap();
        let out = filter.filter(&trace).unwrap();
        let data = out.data_f64();
        assert_relative_eq!(data[2000], 1200.0, max_relative = 1e-6);
        assert_eq!(out.data.sample_type(), crate::data_container::SampleType::Float64);
        assert_eq!(filter.parameters()["zerophase"], 1.0);
    }
}
