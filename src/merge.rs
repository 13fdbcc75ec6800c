//! Gap detection and merging of same-id traces.
//!
//! Services return one trace per contiguous segment, so a window with missing data arrives as
//! several traces sharing an id. `Stream::gaps` lists the holes and overlaps between them and
//! `Stream::merge` joins them onto a common sample grid, handling the holes with a `GapFill`
//! policy.

use crate::data_container::{SampleType, Samples, Stream, Trace, TraceId};
use crate::error::{ExplorerError, ExplorerResult};
use crate::timestamp::seconds_between;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Offsets further than this from the sample grid (in samples) are reported as misaligned.
const ALIGNMENT_TOLERANCE: f64 = 0.01;

/// What to put into samples no input trace covers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum GapFill {
    /// Fill with a constant. An integer or `Float32` trace becomes `Float64` when the constant
    /// cannot be stored exactly in its sample type.
    Constant(f64),
    /// Straight line between the samples bordering the gap.
    Interpolate,
    /// Keep the samples as missing in the trace mask.
    Mask,
}

impl Default for GapFill {
    fn default() -> Self {
        GapFill::Constant(0.0)
    }
}

impl fmt::Display for GapFill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GapFill::Constant(value) => write!(f, "constant {value}"),
            GapFill::Interpolate => write!(f, "interpolate"),
            GapFill::Mask => write!(f, "mask"),
        }
    }
}

/// Hole (or overlap) between two consecutive traces of one channel.
#[derive(Clone, Debug, PartialEq)]
pub struct Gap {
    pub id: TraceId,
    /// Last sample before the gap.
    pub start: DateTime<Utc>,
    /// First sample after the gap.
    pub end: DateTime<Utc>,
    /// Number of missing samples; negative for an overlap.
    pub missing: i64,
}

impl fmt::Display for Gap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {:.6} s {} samples",
            self.id,
            self.start.format("%Y-%m-%dT%H:%M:%S%.6fZ"),
            self.end.format("%Y-%m-%dT%H:%M:%S%.6fZ"),
            seconds_between(&self.start, &self.end),
            self.missing
        )
    }
}

/// Groups trace indices by id, ordered by id, each group ordered by start time.
fn groups(traces: &[Trace]) -> BTreeMap<&TraceId, Vec<usize>> {
    let mut groups: BTreeMap<&TraceId, Vec<usize>> = BTreeMap::new();
    for (i, trace) in traces.iter().enumerate() {
        groups.entry(&trace.id).or_default().push(i);
    }
    for indices in groups.values_mut() {
        indices.sort_by_key(|&i| traces[i].starttime);
    }
    groups
}

/// True when `value` is stored unchanged in `sample_type`.
fn representable(value: f64, sample_type: SampleType) -> bool {
    match sample_type {
        SampleType::Int32 => {
            value.fract() == 0.0 && value >= f64::from(i32::MIN) && value <= f64::from(i32::MAX)
        }
        SampleType::Float32 => value.is_nan() || f64::from(value as f32) == value,
        SampleType::Float64 => true,
    }
}

fn same_rate(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs())
}

/// Joins traces of one id, sorted by start time and sharing a sampling rate, onto the grid of
/// the first one.
fn merge_group(traces: Vec<&Trace>, fill: GapFill) -> Trace {
    let first = traces[0];
    let rate = first.sampling_rate;
    let offsets: Vec<usize> = traces
        .iter()
        .map(|tr| {
            let exact = seconds_between(&first.starttime, &tr.starttime) * rate;
            if (exact - exact.round()).abs() > ALIGNMENT_TOLERANCE {
                warn!(
                    "{} starting {} is off the sample grid by {:.3} samples, snapping",
                    tr.id,
                    tr.starttime,
                    exact - exact.round()
                );
            }
            exact.round().max(0.0) as usize
        })
        .collect();
    let len = traces
        .iter()
        .zip(&offsets)
        .map(|(tr, offset)| offset + tr.npts())
        .max()
        .unwrap_or(0);

    let mut values = vec![0.0; len];
    let mut covered = vec![false; len];
    let mut overlapping = 0usize;
    for (tr, &offset) in traces.iter().zip(&offsets) {
        let data = tr.data_f64();
        for (i, &x) in data.iter().enumerate() {
            if tr.mask.as_ref().is_some_and(|m| m[i]) {
                continue;
            }
            if covered[offset + i] {
                overlapping += 1;
            }
            values[offset + i] = x;
            covered[offset + i] = true;
        }
    }
    if overlapping > 0 {
        warn!(
            "{}: {overlapping} overlapping samples, later traces take precedence",
            first.id
        );
    }

    let missing = covered.iter().filter(|c| !**c).count();
    let mut mask = None;
    match fill {
        GapFill::Constant(value) => covered
            .iter()
            .zip(values.iter_mut())
            .filter(|(c, _)| !**c)
            .for_each(|(_, v)| *v = value),
        GapFill::Interpolate => interpolate_gaps(&mut values, &covered),
        GapFill::Mask => {
            if missing > 0 {
                mask = Some(covered.iter().map(|c| !c).collect());
            }
        }
    }

    let mut sample_type = if traces
        .iter()
        .all(|tr| tr.data.sample_type() == first.data.sample_type())
    {
        first.data.sample_type()
    } else {
        SampleType::Float64
    };
    if let GapFill::Constant(value) = fill {
        if missing > 0 && !representable(value, sample_type) {
            debug!(
                "{}: fill value {value} does not fit {sample_type:?} samples, merging as Float64",
                first.id
            );
            sample_type = SampleType::Float64;
        }
    }
    let mut merged = first.clone();
    merged.data = Samples::from_f64(Array1::from(values), sample_type);
    merged.mask = mask;
    merged.processing.push(format!(
        "merge: {} traces, {missing} missing samples, fill {fill}",
        traces.len()
    ));
    merged
}

/// Linear interpolation over every run of uncovered samples. A run touching an end takes the
/// nearest covered value.
fn interpolate_gaps(values: &mut [f64], covered: &[bool]) {
    let mut i = 0;
    while i < values.len() {
        if covered[i] {
            i += 1;
            continue;
        }
        let start = i;
        while i < values.len() && !covered[i] {
            i += 1;
        }
        let before = start.checked_sub(1).map(|j| values[j]);
        let after = (i < values.len()).then(|| values[i]);
        let (left, right) = match (before, after) {
            (Some(l), Some(r)) => (l, r),
            (Some(l), None) => (l, l),
            (None, Some(r)) => (r, r),
            (None, None) => (0.0, 0.0),
        };
        let steps = (i - start + 1) as f64;
        for (k, v) in values[start..i].iter_mut().enumerate() {
            *v = left + (right - left) * (k + 1) as f64 / steps;
        }
    }
}

impl Stream {
    /// Gaps and overlaps between consecutive traces of the same id.
    pub fn gaps(&self) -> Vec<Gap> {
        let mut gaps = vec![];
        for (id, indices) in groups(&self.traces) {
            for pair in indices.windows(2) {
                let (previous, next) = (&self.traces[pair[0]], &self.traces[pair[1]]);
                let end = previous.endtime();
                let missing = (seconds_between(&end, &next.starttime) * previous.sampling_rate)
                    .round() as i64
                    - 1;
                if missing != 0 {
                    gaps.push(Gap {
                        id: id.clone(),
                        start: end,
                        end: next.starttime,
                        missing,
                    });
                }
            }
        }
        gaps
    }

    /// Merges all traces sharing an id into one trace per id, ordered by id.
    ///
    /// Overlapping samples are taken from the later-starting trace. Samples covered by no trace
    /// are handled according to `fill`. The merged trace keeps the sample type of its inputs
    /// when they agree and becomes `Float64` otherwise, or when a constant fill value would not
    /// be stored exactly.
    ///
    /// # Errors
    /// `ExplorerError::Precondition` when traces of one id have different sampling rates. The
    /// stream is left unchanged.
    pub fn merge(&mut self, fill: GapFill) -> ExplorerResult<()> {
        let groups = groups(&self.traces);
        for (id, indices) in &groups {
            let rate = self.traces[indices[0]].sampling_rate;
            if let Some(&other) = indices
                .iter()
                .find(|&&i| !same_rate(self.traces[i].sampling_rate, rate))
            {
                return Err(ExplorerError::Precondition(format!(
                    "cannot merge {id}: sampling rates {rate} Hz and {} Hz differ, resample first",
                    self.traces[other].sampling_rate
                )));
            }
        }
        let before = self.len();
        let merged: Vec<Trace> = groups
            .into_values()
            .map(|indices| {
                if indices.len() == 1 {
                    self.traces[indices[0]].clone()
                } else {
                    merge_group(indices.iter().map(|&i| &self.traces[i]).collect(), fill)
                }
            })
            .collect();
        self.traces = merged;
        info!("merged {before} traces into {} with fill {fill}", self.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp::add_seconds;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 11, 1, 0, 0, 0).unwrap()
    }

    fn segment(offset_seconds: f64, values: Vec<i32>) -> Trace {
        Trace::new(
            TraceId::new("OO", "AXAS1", "", "EHZ"),
            add_seconds(&start(), offset_seconds),
            10.0,
            Samples::Int32(Array1::from(values)),
        )
    }

    #[test]
    fn test_gap_filled_with_constant() {
        // 5 samples, then 3 missing, then 4 samples
        let mut stream = Stream::new(vec![
            segment(0.8, vec![5, 6, 7, 8]),
            segment(0.0, vec![1, 2, 3, 4, 5]),
        ]);
        let gaps = stream.gaps();
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].missing, 3);

        stream.merge(GapFill::Constant(-1.0)).unwrap();
        assert_eq!(stream.len(), 1);
        let trace = &stream.traces[0];
        assert_eq!(trace.npts(), 5 + 4 + 3);
        assert_eq!(
            trace.data,
            Samples::Int32(Array1::from(vec![1, 2, 3, 4, 5, -1, -1, -1, 5, 6, 7, 8]))
        );
        assert_eq!(trace.starttime, start());
        assert!(stream.gaps().is_empty());
    }

    #[test]
    fn test_fractional_fill_promotes_integer_trace() {
        let mut stream = Stream::new(vec![
            segment(0.0, vec![1, 2]),
            segment(0.4, vec![5, 6]),
        ]);
        stream.merge(GapFill::Constant(0.5)).unwrap();
        assert_eq!(
            stream.traces[0].data,
            Samples::Float64(Array1::from(vec![1.0, 2.0, 0.5, 0.5, 5.0, 6.0]))
        );

        // without gaps the fill value does not matter
        let mut contiguous = Stream::new(vec![
            segment(0.0, vec![1, 2]),
            segment(0.2, vec![3, 4]),
        ]);
        contiguous.merge(GapFill::Constant(0.5)).unwrap();
        assert_eq!(
            contiguous.traces[0].data,
            Samples::Int32(Array1::from(vec![1, 2, 3, 4]))
        );
    }

    #[test]
    fn test_representable_fill_values() {
        assert!(representable(-1.0, SampleType::Int32));
        assert!(!representable(0.5, SampleType::Int32));
        assert!(!representable(1e10, SampleType::Int32));
        assert!(!representable(f64::NAN, SampleType::Int32));
        assert!(representable(0.5, SampleType::Float32));
        assert!(!representable(0.1, SampleType::Float32));
        assert!(representable(0.1, SampleType::Float64));
    }

    #[test]
    fn test_rate_mismatch_leaves_stream_untouched() {
        let mut other = segment(2.0, vec![1, 2]);
        other.sampling_rate = 20.0;
        let mut stream = Stream::new(vec![segment(0.0, vec![1, 2, 3]), other]);
        let err = stream.merge(GapFill::Interpolate).unwrap_err();
        assert!(matches!(err, ExplorerError::Precondition(_)));
        assert_eq!(stream.len(), 2);
        assert!(stream.traces.iter().all(|tr| tr.processing.is_empty()));
    }

    #[test]
    fn test_overlap_later_trace_wins() {
        let mut stream = Stream::new(vec![
            segment(0.0, vec![1, 2, 3, 4]),
            segment(0.2, vec![30, 40, 50]),
        ]);
        let gaps = stream.gaps();
        assert_eq!(gaps[0].missing, -2);
        stream.merge(GapFill::Mask).unwrap();
        let trace = &stream.traces[0];
        assert_eq!(trace.data, Samples::Int32(Array1::from(vec![1, 2, 30, 40, 50])));
        assert!(trace.mask.is_none());
    }

    #[test]
    fn test_interpolate_and_mask() {
        let pieces = || vec![segment(0.0, vec![0, 10]), segment(0.4, vec![40, 50])];
        let mut interpolated = Stream::new(pieces());
        interpolated.merge(GapFill::Interpolate).unwrap();
        assert_eq!(
            interpolated.traces[0].data,
            Samples::Int32(Array1::from(vec![0, 10, 20, 30, 40, 50]))
        );

        let mut masked = Stream::new(pieces());
        masked.merge(GapFill::Mask).unwrap();
        let trace = &masked.traces[0];
        assert_eq!(
            trace.mask,
            Some(vec![false, false, true, true, false, false])
        );
        let split = masked.split();
        assert_eq!(split.len(), 2);
        assert_eq!(split.traces[1].starttime, add_seconds(&start(), 0.4));
    }

    #[test]
    fn test_mixed_types_become_float() {
        let mut float = segment(0.3, vec![]);
        float.data = Samples::Float32(Array1::from(vec![2.5, 3.5]));
        let mut stream = Stream::new(vec![segment(0.0, vec![1, 2, 3]), float]);
        stream.merge(GapFill::default()).unwrap();
        assert_eq!(
            stream.traces[0].data,
            Samples::Float64(Array1::from(vec![1.0, 2.0, 3.0, 2.5, 3.5]))
        );
    }
}
