//! Detrending: removes the mean or the least-squares line from a trace.

use crate::data_container::Trace;
use crate::error::ExplorerResult;
use crate::filters::filter::{unknown_parameter, whole_number, Filter, FilterConfig, FilterDomain};
use crate::math_tools::{demean, detrend_linear};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetrendKind {
    /// Subtract the mean.
    Demean,
    /// Subtract the least-squares straight line.
    Linear,
}

#[derive(Clone, Debug)]
pub struct Detrend {
    pub kind: DetrendKind,
}

impl Filter for Detrend {
    fn new() -> Self
    where
        Self: Sized,
    {
        Detrend {
            kind: DetrendKind::Linear,
        }
    }

    fn config(&self) -> FilterConfig {
        FilterConfig {
            name: "Detrend".to_string(),
            description: "Removes the mean (kind=0) or a linear trend (kind=1).".to_string(),
            hyperlink: None,
            domain: FilterDomain::Time,
        }
    }

    fn parameters(&self) -> BTreeMap<String, f64> {
        let kind = match self.kind {
            DetrendKind::Demean => 0.0,
            DetrendKind::Linear => 1.0,
        };
        BTreeMap::from([("kind".to_string(), kind)])
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> ExplorerResult<()> {
        match name {
            // 0 demean, 1 linear
            "kind" => {
                self.kind = match whole_number(&self.config().name, name, value, 0..=1)? {
                    0 => DetrendKind::Demean,
                    _ => DetrendKind::Linear,
                }
            }
            _ => return Err(unknown_parameter(&self.config().name, name)),
        }
        Ok(())
    }

    fn filter(&self, trace: &Trace) -> ExplorerResult<Trace> {
        trace.require_unmasked("detrend")?;
        let mut data = trace.data_f64();
        let operation = match self.kind {
            DetrendKind::Demean => {
                demean(&mut data);
                "detrend: demean"
            }
            DetrendKind::Linear => {
                detrend_linear(&mut data);
                "detrend: linear"
            }
        };
        Ok(trace.with_samples(data, operation.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_container::{Samples, TraceId};
    use approx::assert_abs_diff_eq;
    use chrono::{TimeZone, Utc};
    use ndarray::Array1;

    #[test]
    fn test_linear_trend_removed() {
        let trace = Trace::new(
            TraceId::new("OO", "AXAS1", "", "EHZ"),
            Utc.with_ymd_and_hms(2019, 11, 1, 0, 0, 0).unwrap(),
            10.0,
            Samples::Int32(Array1::from_shape_fn(100, |i| 3 * i as i32 + 7)),
        );
        let out = Detrend::new().filter(&trace).unwrap();
        for x in out.data_f64() {
            assert_abs_diff_eq!(x, 0.0, epsilon = 1e-9);
        }
        let mut demeaned = Detrend::new();
        demeaned.set_parameter("kind", 0.0).unwrap();
        let out = demeaned.filter(&trace).unwrap();
        assert_abs_diff_eq!(out.data_f64().sum(), 0.0, epsilon = 1e-6);
        assert!(demeaned.set_parameter("kind", 2.0).is_err());
        assert!(demeaned.set_parameter("kind", 0.5).is_err());
        assert_eq!(demeaned.parameters()["kind"], 0.0);
    }
}
