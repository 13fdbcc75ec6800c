//! Cosine taper applied to both ends of a trace.

use crate::data_container::Trace;
use crate::error::{ExplorerError, ExplorerResult};
use crate::filters::filter::{unknown_parameter, Filter, FilterConfig, FilterDomain};
use crate::math_tools::cosine_taper;
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
pub struct Taper {
    /// Length of each ramp as a fraction of the trace, at most 0.5.
    pub max_percentage: f64,
}

impl Filter for Taper {
    fn new() -> Self
    where
        Self: Sized,
    {
        Taper {
            max_percentage: 0.05,
        }
    }

    fn config(&self) -> FilterConfig {
        FilterConfig {
            name: "Taper".to_string(),
            description: "Half-Hann ramps at both ends of the trace.".to_string(),
            hyperlink: None,
            domain: FilterDomain::Time,
        }
    }

    fn parameters(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([("max_percentage".to_string(), self.max_percentage)])
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> ExplorerResult<()> {
        match name {
            "max_percentage" => self.max_percentage = value,
            _ => return Err(unknown_parameter(&self.config().name, name)),
        }
        Ok(())
    }

    fn filter(&self, trace: &Trace) -> ExplorerResult<Trace> {
        if !(0.0..=0.5).contains(&self.max_percentage) {
            return Err(ExplorerError::Precondition(format!(
                "taper fraction {} outside [0, 0.5]",
                self.max_percentage
            )));
        }
        trace.require_unmasked("taper")?;
        let data = trace.data_f64() * cosine_taper(trace.npts(), self.max_percentage);
        Ok(trace.with_samples(
            data,
            format!("taper: cosine, max_percentage={}", self.max_percentage),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_container::{Samples, TraceId};
    use chrono::{TimeZone, Utc};
    use ndarray::Array1;

    #[test]
    fn test_ends_go_to_zero() {
        let trace = Trace::new(
            TraceId::new("OO", "AXAS1", "", "EHZ"),
            Utc.with_ymd_and_hms(2019, 11, 1, 0, 0, 0).unwrap(),
            10.0,
            Samples::Float32(Array1::from_elem(200, 2.0)),
        );
        let out = Taper::new().filter(&trace).unwrap().data_f64();
        assert_eq!(out[0], 0.0);
        assert_eq!(out[199], 0.0);
        assert_eq!(out[100], 2.0);
        let mut invalid = Taper::new();
        invalid.set_parameter("max_percentage", 0.8).unwrap();
        assert!(invalid.filter(&trace).is_err());
    }
}
