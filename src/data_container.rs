//! This module defines the waveform data model: channel identifiers, sample buffers, traces and
//! streams, plus the operations on them that do not need signal processing (selection, splitting
//! at masked samples, trimming, response attachment and applying filters).

use crate::error::{ExplorerError, ExplorerResult};
use crate::filters::filter::Filter;
use crate::inventory::{matches_pattern, Inventory};
use crate::response::Response;
use crate::timestamp::{add_seconds, round_to_micros, seconds_between};
use chrono::{DateTime, Utc};
use log::{debug, info};
use ndarray::{s, Array1};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// SEED channel identifier `network.station.location.channel`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TraceId {
    pub network: String,
    pub station: String,
    pub location: String,
    pub channel: String,
}

impl TraceId {
    pub fn new(network: &str, station: &str, location: &str, channel: &str) -> Self {
        TraceId {
            network: network.to_string(),
            station: station.to_string(),
            location: location.to_string(),
            channel: channel.to_string(),
        }
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.network, self.station, self.location, self.channel
        )
    }
}

impl FromStr for TraceId {
    type Err = ExplorerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        match parts.as_slice() {
            [network, station, location, channel] => {
                Ok(TraceId::new(network, station, location, channel))
            }
            _ => Err(ExplorerError::Format(format!(
                "'{s}' is not a NET.STA.LOC.CHA identifier"
            ))),
        }
    }
}

/// Sample type of a trace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleType {
    Int32,
    Float32,
    Float64,
}

/// Sample buffer of a trace. The variant is the dtype and survives merging and file round trips;
/// processing operations produce `Float64`.
#[derive(Clone, Debug, PartialEq)]
pub enum Samples {
    Int32(Array1<i32>),
    Float32(Array1<f32>),
    Float64(Array1<f64>),
}

impl Samples {
    pub fn len(&self) -> usize {
        match self {
            Samples::Int32(a) => a.len(),
            Samples::Float32(a) => a.len(),
            Samples::Float64(a) => a.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sample_type(&self) -> SampleType {
        match self {
            Samples::Int32(_) => SampleType::Int32,
            Samples::Float32(_) => SampleType::Float32,
            Samples::Float64(_) => SampleType::Float64,
        }
    }

    pub fn to_f64(&self) -> Array1<f64> {
        match self {
            Samples::Int32(a) => a.mapv(f64::from),
            Samples::Float32(a) => a.mapv(f64::from),
            Samples::Float64(a) => a.clone(),
        }
    }

    /// Converts `values` to the given sample type, rounding when the target is integer.
    pub fn from_f64(values: Array1<f64>, sample_type: SampleType) -> Samples {
        match sample_type {
            SampleType::Int32 => Samples::Int32(values.mapv(|v| v.round() as i32)),
            SampleType::Float32 => Samples::Float32(values.mapv(|v| v as f32)),
            SampleType::Float64 => Samples::Float64(values),
        }
    }

    /// Samples `start..end`.
    pub fn slice(&self, start: usize, end: usize) -> Samples {
        match self {
            Samples::Int32(a) => Samples::Int32(a.slice(s![start..end]).to_owned()),
            Samples::Float32(a) => Samples::Float32(a.slice(s![start..end]).to_owned()),
            Samples::Float64(a) => Samples::Float64(a.slice(s![start..end]).to_owned()),
        }
    }
}

/// A contiguous, uniformly sampled time series of one channel.
#[derive(Clone, Debug)]
pub struct Trace {
    pub id: TraceId,
    pub starttime: DateTime<Utc>,
    pub sampling_rate: f64,
    pub data: Samples,
    /// `true` marks a missing sample. Only set by merging with a masking gap policy.
    pub mask: Option<Vec<bool>>,
    pub response: Option<Arc<Response>>,
    /// One entry per operation applied to the samples.
    pub processing: Vec<String>,
}

impl Trace {
    pub fn new(id: TraceId, starttime: DateTime<Utc>, sampling_rate: f64, data: Samples) -> Self {
        Trace {
            id,
            starttime: round_to_micros(&starttime),
            sampling_rate,
            data,
            mask: None,
            response: None,
            processing: vec![],
        }
    }

    pub fn npts(&self) -> usize {
        self.data.len()
    }

    /// Sample interval in seconds.
    pub fn delta(&self) -> f64 {
        1.0 / self.sampling_rate
    }

    pub fn nyquist(&self) -> f64 {
        self.sampling_rate / 2.0
    }

    /// Time of the last sample: `starttime + (npts - 1) / sampling_rate`.
    pub fn endtime(&self) -> DateTime<Utc> {
        self.time_of(self.npts().saturating_sub(1))
    }

    pub fn time_of(&self, index: usize) -> DateTime<Utc> {
        add_seconds(&self.starttime, index as f64 / self.sampling_rate)
    }

    /// Covered duration, `npts × delta`.
    pub fn duration(&self) -> f64 {
        self.npts() as f64 * self.delta()
    }

    /// True when at least one sample is masked.
    pub fn is_masked(&self) -> bool {
        self.mask.as_ref().is_some_and(|m| m.iter().any(|&x| x))
    }

    /// Errors when the trace has masked samples, which `operation` cannot handle.
    pub fn require_unmasked(&self, operation: &str) -> ExplorerResult<()> {
        if self.is_masked() {
            return Err(ExplorerError::Precondition(format!(
                "{operation} cannot run on masked trace {}, fill or split it first",
                self.id
            )));
        }
        Ok(())
    }

    pub fn data_f64(&self) -> Array1<f64> {
        self.data.to_f64()
    }

    /// Copy of this trace with new `Float64` samples and `operation` appended to the history.
    pub fn with_samples(&self, data: Array1<f64>, operation: String) -> Trace {
        let mut out = self.clone();
        out.data = Samples::Float64(data);
        out.processing.push(operation);
        out
    }

    fn slice(&self, start: usize, end: usize) -> Trace {
        let mut out = self.clone();
        out.starttime = self.time_of(start);
        out.data = self.data.slice(start, end);
        out.mask = self.mask.as_ref().map(|m| m[start..end].to_vec());
        out
    }

    /// Splits at masked samples into unmasked traces. An unmasked trace comes back as is.
    pub fn split(&self) -> Vec<Trace> {
        let Some(mask) = self.mask.as_ref() else {
            return vec![self.clone()];
        };
        let mut pieces = vec![];
        let mut run_start: Option<usize> = None;
        for (i, &missing) in mask.iter().chain(std::iter::once(&true)).enumerate() {
            match (missing, run_start) {
                (false, None) => run_start = Some(i),
                (true, Some(start)) => {
                    let mut piece = self.slice(start, i);
                    piece.mask = None;
                    pieces.push(piece);
                    run_start = None;
                }
                _ => {}
            }
        }
        pieces
    }

    /// Cuts the trace to the samples inside `[start, end]`. Bounds outside the trace are ignored.
    pub fn trim(&mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) {
        let npts = self.npts();
        let first = start
            .map(|t| (seconds_between(&self.starttime, &t) * self.sampling_rate).ceil())
            .unwrap_or(0.0)
            .clamp(0.0, npts as f64) as usize;
        let last = end
            .map(|t| (seconds_between(&self.starttime, &t) * self.sampling_rate).floor() + 1.0)
            .unwrap_or(npts as f64)
            .clamp(first as f64, npts as f64) as usize;
        if first == 0 && last == npts {
            return;
        }
        let trimmed = self.slice(first, last);
        self.starttime = trimmed.starttime;
        self.data = trimmed.data;
        self.mask = trimmed.mask;
        self.processing
            .push(format!("trim: kept samples {first}..{last} of {npts}"));
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} - {} | {} Hz, {} samples",
            self.id,
            self.starttime.format("%Y-%m-%dT%H:%M:%S%.6fZ"),
            self.endtime().format("%Y-%m-%dT%H:%M:%S%.6fZ"),
            self.sampling_rate,
            self.npts()
        )?;
        if self.is_masked() {
            write!(f, " (masked)")?;
        }
        Ok(())
    }
}

/// Ordered collection of traces. Several traces may share an id (gaps).
#[derive(Clone, Debug, Default)]
pub struct Stream {
    pub traces: Vec<Trace>,
}

impl Stream {
    pub fn new(traces: Vec<Trace>) -> Self {
        Stream { traces }
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Trace> {
        self.traces.iter()
    }

    pub fn push(&mut self, trace: Trace) {
        self.traces.push(trace);
    }

    pub fn extend(&mut self, other: Stream) {
        self.traces.extend(other.traces);
    }

    /// Traces whose id matches the given patterns (`*`, `?` wildcards, comma lists).
    pub fn select(&self, network: &str, station: &str, location: &str, channel: &str) -> Stream {
        Stream::new(
            self.traces
                .iter()
                .filter(|tr| {
                    matches_pattern(network, &tr.id.network)
                        && matches_pattern(station, &tr.id.station)
                        && matches_pattern(location, &tr.id.location)
                        && matches_pattern(channel, &tr.id.channel)
                })
                .cloned()
                .collect(),
        )
    }

    /// Sorts by id, then start time.
    pub fn sort(&mut self) {
        self.traces
            .sort_by(|a, b| a.id.cmp(&b.id).then(a.starttime.cmp(&b.starttime)));
    }

    /// Replaces every masked trace by its unmasked pieces.
    pub fn split(&self) -> Stream {
        Stream::new(self.traces.iter().flat_map(|tr| tr.split()).collect())
    }

    pub fn trim(&mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) {
        for trace in &mut self.traces {
            trace.trim(start, end);
        }
        self.traces.retain(|tr| tr.npts() > 0);
    }

    /// Attaches to every trace the channel response valid at its start time.
    ///
    /// Returns the number of traces that received a response.
    pub fn attach_response(&mut self, inventory: &Inventory) -> usize {
        let mut attached = 0;
        for trace in &mut self.traces {
            match inventory.get_response(&trace.id, &trace.starttime) {
                Some(response) => {
                    trace.response = Some(Arc::new(response.clone()));
                    attached += 1;
                }
                None => debug!("no response found for {}", trace.id),
            }
        }
        info!("attached responses to {attached} of {} traces", self.len());
        attached
    }

    /// Applies `filter` to every trace. Either all traces are replaced or, on the first error,
    /// none is.
    pub fn filter(&mut self, filter: &dyn Filter) -> ExplorerResult<()> {
        let filtered = self
            .traces
            .iter()
            .map(|tr| filter.filter(tr))
            .collect::<ExplorerResult<Vec<Trace>>>()?;
        debug!(
            "applied {} to {} traces",
            filter.config().name,
            filtered.len()
        );
        self.traces = filtered;
        Ok(())
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} Trace(s) in Stream:", self.len())?;
        for trace in &self.traces {
            writeln!(f, "{trace}")?;
        }
        Ok(())
    }
}

impl IntoIterator for Stream {
    type Item = Trace;
    type IntoIter = std::vec::IntoIter<Trace>;

    fn into_iter(self) -> Self::IntoIter {
        self.traces.into_iter()
    }
}

impl<'a> IntoIterator for &'a Stream {
    type Item = &'a Trace;
    type IntoIter = std::slice::Iter<'a, Trace>;

    fn into_iter(self) -> Self::IntoIter {
        self.traces.iter()
    }
}
