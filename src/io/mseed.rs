//! miniSEED 2.4 records.
//!
//! Each record starts with the 48-byte fixed section of the data header, followed by a chain of
//! blockettes and the encoded samples. Written records carry Blockette 1000 (encoding, byte
//! order, record length) and Blockette 1001 (microsecond time offset) and start their data at
//! byte 64. Records are always written big-endian; both byte orders are accepted on read.

use crate::data_container::{SampleType, Samples, Stream, Trace, TraceId};
use crate::error::{ExplorerError, ExplorerResult};
use crate::io::steim::{self, Steim, FRAME_SIZE};
use crate::timestamp::{add_seconds, seconds_between};
use bytes::{Buf, BufMut, BytesMut};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};
use log::{debug, warn};
use ndarray::{s, Array1, ArrayView1, Axis};

const FIXED_HEADER_SIZE: usize = 48;
const DATA_OFFSET: usize = 64;
pub const DEFAULT_RECORD_LENGTH: usize = 4096;
/// Lowest sampling rate accepted on read, one sample per about eleven days.
const MIN_SAMPLING_RATE: f64 = 1e-6;

/// Data encoding of a record (SEED data format code).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    Int16,
    Int32,
    Float32,
    Float64,
    Steim1,
    Steim2,
}

impl Encoding {
    pub fn code(self) -> u8 {
        match self {
            Encoding::Int16 => 1,
            Encoding::Int32 => 3,
            Encoding::Float32 => 4,
            Encoding::Float64 => 5,
            Encoding::Steim1 => 10,
            Encoding::Steim2 => 11,
        }
    }

    pub fn from_code(code: u8) -> ExplorerResult<Self> {
        match code {
            1 => Ok(Encoding::Int16),
            3 => Ok(Encoding::Int32),
            4 => Ok(Encoding::Float32),
            5 => Ok(Encoding::Float64),
            10 => Ok(Encoding::Steim1),
            11 => Ok(Encoding::Steim2),
            other => Err(ExplorerError::Format(format!(
                "unsupported miniSEED encoding {other}"
            ))),
        }
    }
}

/// Options for writing miniSEED.
#[derive(Clone, Debug, PartialEq)]
pub struct WriteOptions {
    /// `None` picks the encoding from the sample type.
    pub encoding: Option<Encoding>,
    /// Power of two between 256 and 8192.
    pub record_length: usize,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            encoding: None,
            record_length: DEFAULT_RECORD_LENGTH,
        }
    }
}

fn choose_encoding(trace: &Trace, requested: Option<Encoding>) -> ExplorerResult<Encoding> {
    let encoding = match (requested, &trace.data) {
        (Some(e), _) => e,
        (None, Samples::Int32(a)) => {
            if steim::steim2_compatible(&a.to_vec()) {
                Encoding::Steim2
            } else {
                Encoding::Int32
            }
        }
        (None, Samples::Float32(_)) => Encoding::Float32,
        (None, Samples::Float64(_)) => Encoding::Float64,
    };
    let compatible = matches!(
        (encoding, &trace.data),
        (
            Encoding::Int32 | Encoding::Steim1 | Encoding::Steim2,
            Samples::Int32(_)
        ) | (Encoding::Float32, Samples::Float32(_))
            | (Encoding::Float64, Samples::Float64(_))
    );
    if !compatible {
        return Err(ExplorerError::Precondition(format!(
            "{encoding:?} cannot store {:?} samples of {}",
            trace.data.sample_type(),
            trace.id
        )));
    }
    Ok(encoding)
}

/// SEED sample rate factor and multiplier for `rate`.
fn rate_factor_multiplier(rate: f64) -> ExplorerResult<(i16, i16)> {
    let exact = |value: f64| (value - value.round()).abs() < 1e-6 && value.round().abs() <= 32767.0;
    if rate <= 0.0 || !rate.is_finite() {
        return Err(ExplorerError::Precondition(format!(
            "invalid sampling rate {rate}"
        )));
    }
    if rate >= 1.0 {
        for divisor in [1.0, 10.0, 100.0, 1000.0, 10000.0] {
            if exact(rate * divisor) {
                return Ok(((rate * divisor).round() as i16, -(divisor as i16)));
            }
        }
    } else {
        let period = 1.0 / rate;
        for multiplier in [1.0, 10.0, 100.0, 1000.0, 10000.0] {
            if exact(period * multiplier) {
                return Ok((-((period * multiplier).round() as i16), multiplier as i16));
            }
        }
    }
    Err(ExplorerError::Precondition(format!(
        "sampling rate {rate} cannot be expressed as SEED factor and multiplier"
    )))
}

fn rate_from_factor_multiplier(factor: i16, multiplier: i16) -> f64 {
    let (f, m) = (factor as f64, multiplier as f64);
    match (factor.signum(), multiplier.signum()) {
        (0, _) => 0.0,
        (1, 1) => f * m,
        (1, -1) => -f / m,
        (-1, 1) => -m / f,
        (-1, -1) => 1.0 / (f * m),
        _ => f,
    }
}

fn put_padded(buf: &mut BytesMut, value: &str, width: usize, field: &str) -> ExplorerResult<()> {
    if value.len() > width || !value.is_ascii() {
        return Err(ExplorerError::Precondition(format!(
            "{field} '{value}' does not fit {width} ASCII characters"
        )));
    }
    buf.put_slice(value.as_bytes());
    buf.put_bytes(b' ', width - value.len());
    Ok(())
}

/// Encodes `samples` starting at `offset`; returns the data bytes and the number of samples.
fn encode_samples(
    encoding: Encoding,
    data: &Samples,
    offset: usize,
    capacity: usize,
) -> ExplorerResult<(Vec<u8>, usize)> {
    let mut buf = BytesMut::with_capacity(capacity);
    match (encoding, data) {
        (Encoding::Steim1 | Encoding::Steim2, Samples::Int32(a)) => {
            let flavour = if encoding == Encoding::Steim1 {
                Steim::One
            } else {
                Steim::Two
            };
            // at most seven differences per word
            let frames = capacity / FRAME_SIZE;
            let n = (a.len() - offset).min(frames * 15 * 7);
            let values = a.slice(s![offset..offset + n]).to_vec();
            steim::encode(flavour, &values, frames)
        }
        (Encoding::Int32, Samples::Int32(a)) => {
            let n = (a.len() - offset).min(capacity / 4);
            a.slice(s![offset..offset + n])
                .iter()
                .for_each(|v| buf.put_i32(*v));
            Ok((buf.to_vec(), n))
        }
        (Encoding::Float32, Samples::Float32(a)) => {
            let n = (a.len() - offset).min(capacity / 4);
            a.slice(s![offset..offset + n])
                .iter()
                .for_each(|v| buf.put_f32(*v));
            Ok((buf.to_vec(), n))
        }
        (Encoding::Float64, Samples::Float64(a)) => {
            let n = (a.len() - offset).min(capacity / 8);
            a.slice(s![offset..offset + n])
                .iter()
                .for_each(|v| buf.put_f64(*v));
            Ok((buf.to_vec(), n))
        }
        _ => Err(ExplorerError::Precondition(format!(
            "{encoding:?} cannot be written"
        ))),
    }
}

fn put_header(
    buf: &mut BytesMut,
    sequence: usize,
    trace: &Trace,
    start: &DateTime<Utc>,
    nsamples: usize,
    encoding: Encoding,
    record_length: usize,
) -> ExplorerResult<()> {
    let (factor, multiplier) = rate_factor_multiplier(trace.sampling_rate)?;
    buf.put_slice(format!("{:06}", sequence % 1_000_000).as_bytes());
    buf.put_u8(b'D');
    buf.put_u8(b' ');
    put_padded(buf, &trace.id.station, 5, "station code")?;
    put_padded(buf, &trace.id.location, 2, "location code")?;
    put_padded(buf, &trace.id.channel, 3, "channel code")?;
    put_padded(buf, &trace.id.network, 2, "network code")?;

    let micros = start.nanosecond() / 1000;
    buf.put_u16(start.year() as u16);
    buf.put_u16(start.ordinal() as u16);
    buf.put_u8(start.hour() as u8);
    buf.put_u8(start.minute() as u8);
    buf.put_u8(start.second().min(59) as u8);
    buf.put_u8(0);
    buf.put_u16((micros / 100) as u16);

    buf.put_u16(nsamples as u16);
    buf.put_i16(factor);
    buf.put_i16(multiplier);
    buf.put_u8(0); // activity flags
    buf.put_u8(0); // I/O flags
    buf.put_u8(0); // quality flags
    buf.put_u8(2); // number of blockettes
    buf.put_i32(0); // time correction
    buf.put_u16(DATA_OFFSET as u16);
    buf.put_u16(FIXED_HEADER_SIZE as u16);

    // Blockette 1000
    buf.put_u16(1000);
    buf.put_u16(56);
    buf.put_u8(encoding.code());
    buf.put_u8(1);
    buf.put_u8(record_length.trailing_zeros() as u8);
    buf.put_u8(0);

    // Blockette 1001
    buf.put_u16(1001);
    buf.put_u16(0);
    buf.put_u8(0);
    buf.put_i8((micros % 100) as i8);
    buf.put_u8(0);
    buf.put_u8(match encoding {
        Encoding::Steim1 | Encoding::Steim2 => ((record_length - DATA_OFFSET) / FRAME_SIZE) as u8,
        _ => 0,
    });
    Ok(())
}

/// Serializes a stream into miniSEED records.
pub fn write_to_bytes(stream: &Stream, options: &WriteOptions) -> ExplorerResult<Vec<u8>> {
    let record_length = options.record_length;
    if !(256..=8192).contains(&record_length) || !record_length.is_power_of_two() {
        return Err(ExplorerError::Validation(format!(
            "record length {record_length} must be a power of two between 256 and 8192"
        )));
    }
    // check every trace before writing anything
    let encodings = stream
        .iter()
        .map(|trace| {
            if trace.is_masked() {
                return Err(ExplorerError::Precondition(format!(
                    "masked trace {} cannot be written, fill or split it first",
                    trace.id
                )));
            }
            rate_factor_multiplier(trace.sampling_rate)?;
            choose_encoding(trace, options.encoding)
        })
        .collect::<ExplorerResult<Vec<Encoding>>>()?;

    let mut out = BytesMut::new();
    let mut sequence = 1;
    for (trace, encoding) in stream.iter().zip(encodings) {
        let mut offset = 0;
        let mut records = 0;
        while offset < trace.npts() {
            let (data, count) =
                encode_samples(encoding, &trace.data, offset, record_length - DATA_OFFSET)?;
            if count == 0 {
                return Err(ExplorerError::Precondition(format!(
                    "no samples of {} fit a {record_length} byte record",
                    trace.id
                )));
            }
            let start = trace.time_of(offset);
            let mut record = BytesMut::with_capacity(record_length);
            put_header(
                &mut record,
                sequence,
                trace,
                &start,
                count,
                encoding,
                record_length,
            )?;
            record.put_slice(&data);
            record.resize(record_length, 0);
            out.extend_from_slice(&record);
            offset += count;
            sequence += 1;
            records += 1;
        }
        debug!("wrote {} as {records} {encoding:?} records", trace.id);
    }
    Ok(out.to_vec())
}

struct RecordHeader {
    id: TraceId,
    start: DateTime<Utc>,
    nsamples: usize,
    sampling_rate: f64,
    encoding: Encoding,
    data_big_endian: bool,
    record_length: usize,
    data_offset: usize,
}

fn ascii_field(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}

fn parse_header(record: &[u8]) -> ExplorerResult<RecordHeader> {
    if record.len() < FIXED_HEADER_SIZE {
        return Err(ExplorerError::Format("truncated miniSEED header".to_string()));
    }
    if !record[..6].iter().all(|b| b.is_ascii_digit() || *b == b' ')
        || !b"DRQM".contains(&record[6])
    {
        return Err(ExplorerError::Format(
            "not a miniSEED record (bad sequence number or quality indicator)".to_string(),
        ));
    }
    let big_year = u16::from_be_bytes([record[20], record[21]]);
    let big_endian = (1900..=2100).contains(&big_year);
    let mut h = &record[20..48];
    let get_u16 = |h: &mut &[u8]| if big_endian { h.get_u16() } else { h.get_u16_le() };
    let get_i16 = |h: &mut &[u8]| if big_endian { h.get_i16() } else { h.get_i16_le() };

    let year = get_u16(&mut h);
    let day = get_u16(&mut h);
    let hour = h.get_u8();
    let minute = h.get_u8();
    let second = h.get_u8();
    h.advance(1);
    let ticks = get_u16(&mut h);
    let nsamples = get_u16(&mut h) as usize;
    let factor = get_i16(&mut h);
    let multiplier = get_i16(&mut h);
    let activity = h.get_u8();
    h.advance(2);
    let _n_blockettes = h.get_u8();
    let time_correction = if big_endian { h.get_i32() } else { h.get_i32_le() };
    let data_offset = get_u16(&mut h) as usize;
    let mut next_blockette = get_u16(&mut h) as usize;

    let start = NaiveDate::from_yo_opt(year as i32, day as u32)
        .and_then(|d| d.and_hms_opt(hour as u32, minute as u32, second.min(59) as u32))
        .ok_or_else(|| {
            ExplorerError::Format(format!(
                "invalid record time {year}-{day} {hour}:{minute}:{second}"
            ))
        })?
        .and_utc();
    let mut start = start + Duration::microseconds(ticks as i64 * 100);
    if second == 60 {
        start += Duration::seconds(1);
    }
    if activity & 0x02 == 0 && time_correction != 0 {
        start += Duration::microseconds(time_correction as i64 * 100);
    }

    let mut sampling_rate = rate_from_factor_multiplier(factor, multiplier);
    let mut encoding = None;
    let mut data_big_endian = big_endian;
    let mut record_length = None;
    let mut guard = 0;
    while next_blockette != 0 && guard < 16 {
        if next_blockette + 4 > record.len() {
            return Err(ExplorerError::Format("blockette outside record".to_string()));
        }
        let mut b = &record[next_blockette..];
        let kind = get_u16(&mut b);
        let next = get_u16(&mut b) as usize;
        match kind {
            1000 if b.remaining() >= 4 => {
                encoding = Some(Encoding::from_code(b.get_u8())?);
                data_big_endian = b.get_u8() == 1;
                record_length = Some(1usize << b.get_u8().min(16));
            }
            1001 if b.remaining() >= 2 => {
                b.advance(1);
                start += Duration::microseconds(b.get_i8() as i64);
            }
            100 if b.remaining() >= 4 => {
                let rate = if big_endian { b.get_f32() } else { b.get_f32_le() };
                sampling_rate = rate as f64;
            }
            other => debug!("skipping blockette {other}"),
        }
        next_blockette = next;
        guard += 1;
    }

    // zero marks records without a time series (logs, opaque data)
    let plausible = sampling_rate.is_finite() && sampling_rate >= MIN_SAMPLING_RATE;
    if sampling_rate != 0.0 && !plausible {
        return Err(ExplorerError::Format(format!(
            "invalid sampling rate {sampling_rate} Hz in record header"
        )));
    }
    let encoding =
        encoding.ok_or_else(|| ExplorerError::Format("record without Blockette 1000".to_string()))?;
    let record_length = record_length.unwrap_or(record.len());
    Ok(RecordHeader {
        id: TraceId::new(
            &ascii_field(&record[18..20]),
            &ascii_field(&record[8..13]),
            &ascii_field(&record[13..15]),
            &ascii_field(&record[15..18]),
        ),
        start,
        nsamples,
        sampling_rate,
        encoding,
        data_big_endian,
        record_length,
        data_offset,
    })
}

fn decode_samples(header: &RecordHeader, data: &[u8]) -> ExplorerResult<Samples> {
    let n = header.nsamples;
    let be = header.data_big_endian;
    let need = |width: usize| -> ExplorerResult<()> {
        if data.len() < n * width {
            return Err(ExplorerError::Format(format!(
                "record of {} announces {n} samples but holds {} bytes",
                header.id,
                data.len()
            )));
        }
        Ok(())
    };
    let mut buf = data;
    Ok(match header.encoding {
        Encoding::Int16 => {
            need(2)?;
            Samples::Int32(Array1::from_iter((0..n).map(|_| {
                (if be { buf.get_i16() } else { buf.get_i16_le() }) as i32
            })))
        }
        Encoding::Int32 => {
            need(4)?;
            Samples::Int32(Array1::from_iter(
                (0..n).map(|_| if be { buf.get_i32() } else { buf.get_i32_le() }),
            ))
        }
        Encoding::Float32 => {
            need(4)?;
            Samples::Float32(Array1::from_iter(
                (0..n).map(|_| if be { buf.get_f32() } else { buf.get_f32_le() }),
            ))
        }
        Encoding::Float64 => {
            need(8)?;
            Samples::Float64(Array1::from_iter(
                (0..n).map(|_| if be { buf.get_f64() } else { buf.get_f64_le() }),
            ))
        }
        Encoding::Steim1 => Samples::Int32(Array1::from(steim::decode(Steim::One, data, n, be)?)),
        Encoding::Steim2 => Samples::Int32(Array1::from(steim::decode(Steim::Two, data, n, be)?)),
    })
}

/// Samples of consecutive records, concatenated once all records are read.
struct PendingTrace {
    id: TraceId,
    start: DateTime<Utc>,
    sampling_rate: f64,
    chunks: Vec<Samples>,
    npts: usize,
}

impl PendingTrace {
    fn continues_with(&self, header: &RecordHeader, samples: &Samples) -> bool {
        let expected = add_seconds(&self.start, self.npts as f64 / self.sampling_rate);
        let misfit = seconds_between(&expected, &header.start).abs();
        self.id == header.id
            && self.sampling_rate == header.sampling_rate
            && self.chunks[0].sample_type() == samples.sample_type()
            && misfit < 0.5 / header.sampling_rate
    }

    fn into_trace(self) -> ExplorerResult<Trace> {
        let data = match self.chunks[0].sample_type() {
            SampleType::Int32 => Samples::Int32(concatenate(&self.chunks, |c| match c {
                Samples::Int32(a) => Some(a.view()),
                _ => None,
            })?),
            SampleType::Float32 => Samples::Float32(concatenate(&self.chunks, |c| match c {
                Samples::Float32(a) => Some(a.view()),
                _ => None,
            })?),
            SampleType::Float64 => Samples::Float64(concatenate(&self.chunks, |c| match c {
                Samples::Float64(a) => Some(a.view()),
                _ => None,
            })?),
        };
        Ok(Trace::new(self.id, self.start, self.sampling_rate, data))
    }
}

fn concatenate<'a, T: Clone + 'a>(
    chunks: &'a [Samples],
    view: impl Fn(&'a Samples) -> Option<ArrayView1<'a, T>>,
) -> ExplorerResult<Array1<T>> {
    let views = chunks
        .iter()
        .map(view)
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| ExplorerError::Format("mixed sample types in one trace".to_string()))?;
    ndarray::concatenate(Axis(0), &views)
        .map_err(|e| ExplorerError::Format(format!("cannot join records: {e}")))
}

/// Parses miniSEED records. Consecutive records of one channel that continue each other without
/// a gap are joined into one trace.
pub fn read_from_bytes(bytes: &[u8]) -> ExplorerResult<Stream> {
    let mut pending: Vec<PendingTrace> = vec![];
    let mut pos = 0;
    while pos < bytes.len() {
        // tolerate zero padding at the end of a file
        if bytes[pos..].iter().all(|&b| b == 0) {
            break;
        }
        let header = parse_header(&bytes[pos..])?;
        let end = pos + header.record_length;
        if end > bytes.len() || header.data_offset > header.record_length {
            return Err(ExplorerError::Format(format!(
                "truncated record of {} at byte {pos}",
                header.id
            )));
        }
        let record = &bytes[pos..end];
        pos = end;
        if header.nsamples == 0 || header.sampling_rate <= 0.0 {
            debug!("skipping record of {} without samples", header.id);
            continue;
        }
        let samples = decode_samples(&header, &record[header.data_offset..])?;

        match pending.last_mut() {
            Some(last) if last.continues_with(&header, &samples) => {
                last.npts += samples.len();
                last.chunks.push(samples);
            }
            _ => pending.push(PendingTrace {
                id: header.id,
                start: header.start,
                sampling_rate: header.sampling_rate,
                npts: samples.len(),
                chunks: vec![samples],
            }),
        }
    }
    let stream = Stream::new(
        pending
            .into_iter()
            .map(PendingTrace::into_trace)
            .collect::<ExplorerResult<Vec<Trace>>>()?,
    );
    if stream.is_empty() && !bytes.is_empty() {
        warn!("miniSEED data contained no samples");
    }
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 11, 1, 12, 30, 5).unwrap() + Duration::microseconds(123_456)
    }

    fn int_trace(n: usize) -> Trace {
        Trace::new(
            TraceId::new("OO", "AXAS1", "", "EHZ"),
            start(),
            100.0,
            Samples::Int32(Array1::from_iter(
                (0..n).map(|i| ((i as f64 * 0.1).sin() * 5000.0) as i32),
            )),
        )
    }

    #[test]
    fn test_round_trip_every_dtype() {
        let float32 = Trace::new(
            TraceId::new("AM", "R0000", "00", "SHZ"),
            start(),
            50.0,
            Samples::Float32(Array1::from_iter((0..3000).map(|i| i as f32 * 0.25))),
        );
        let float64 = Trace::new(
            TraceId::new("GE", "WLF", "", "BHN"),
            start(),
            20.0,
            Samples::Float64(Array1::from_iter((0..2500).map(|i| (i as f64).sqrt()))),
        );
        let stream = Stream::new(vec![int_trace(10_000), float32, float64]);
        let bytes = write_to_bytes(&stream, &WriteOptions::default()).unwrap();
        assert_eq!(bytes.len() % DEFAULT_RECORD_LENGTH, 0);
        let back = read_from_bytes(&bytes).unwrap();
        assert_eq!(back.len(), 3);
        for (a, b) in stream.iter().zip(back.iter()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.starttime, b.starttime);
            assert_eq!(a.sampling_rate, b.sampling_rate);
            assert_eq!(a.data, b.data);
        }
    }

    #[test]
    fn test_explicit_encodings() {
        let stream = Stream::new(vec![int_trace(3000)]);
        for encoding in [Encoding::Int32, Encoding::Steim1, Encoding::Steim2] {
            let options = WriteOptions {
                encoding: Some(encoding),
                record_length: 512,
            };
            let bytes = write_to_bytes(&stream, &options).unwrap();
            assert_eq!(bytes[52], encoding.code());
            let back = read_from_bytes(&bytes).unwrap();
            assert_eq!(back.len(), 1);
            assert_eq!(back.traces[0].data, stream.traces[0].data);
        }
        let options = WriteOptions {
            encoding: Some(Encoding::Float32),
            ..Default::default()
        };
        assert!(matches!(
            write_to_bytes(&stream, &options),
            Err(ExplorerError::Precondition(_))
        ));
    }

    #[test]
    fn test_large_differences_fall_back_to_int32() {
        let trace = Trace::new(
            TraceId::new("OO", "AXAS1", "", "EHZ"),
            start(),
            100.0,
            Samples::Int32(Array1::from(vec![i32::MIN, i32::MAX, 0, 5])),
        );
        let bytes =
            write_to_bytes(&Stream::new(vec![trace.clone()]), &WriteOptions::default()).unwrap();
        assert_eq!(bytes[52], Encoding::Int32.code());
        assert_eq!(read_from_bytes(&bytes).unwrap().traces[0].data, trace.data);
    }

    #[test]
    fn test_masked_trace_rejected() {
        let mut trace = int_trace(10);
        trace.mask = Some(vec![
            false, true, false, false, false, false, false, false, false, false,
        ]);
        assert!(matches!(
            write_to_bytes(&Stream::new(vec![trace]), &WriteOptions::default()),
            Err(ExplorerError::Precondition(_))
        ));
    }

    #[test]
    fn test_invalid_record_length() {
        let options = WriteOptions {
            encoding: None,
            record_length: 1000,
        };
        assert!(matches!(
            write_to_bytes(&Stream::new(vec![int_trace(10)]), &options),
            Err(ExplorerError::Validation(_))
        ));
    }

    #[test]
    fn test_gap_starts_new_trace() {
        let first = int_trace(1000);
        let mut second = int_trace(1000);
        second.starttime = add_seconds(&first.endtime(), 5.0);
        let bytes =
            write_to_bytes(&Stream::new(vec![first, second]), &WriteOptions::default()).unwrap();
        assert_eq!(read_from_bytes(&bytes).unwrap().len(), 2);
    }

    /// Little-endian INT16 record of XX.ABC.00.BHZ with samples 7, -8, 9 and a Blockette 100
    /// sample rate.
    fn little_endian_record(rate: f32) -> Vec<u8> {
        let mut record = vec![0u8; 256];
        record[..8].copy_from_slice(b"000001D ");
        record[8..20].copy_from_slice(b"ABC  00BHZXX");
        record[20..22].copy_from_slice(&2020u16.to_le_bytes());
        record[22..24].copy_from_slice(&1u16.to_le_bytes());
        record[30..32].copy_from_slice(&3u16.to_le_bytes());
        record[32..34].copy_from_slice(&1i16.to_le_bytes());
        record[34..36].copy_from_slice(&1i16.to_le_bytes());
        record[39] = 2;
        record[44..46].copy_from_slice(&64u16.to_le_bytes());
        record[46..48].copy_from_slice(&48u16.to_le_bytes());
        record[48..50].copy_from_slice(&1000u16.to_le_bytes());
        record[50..52].copy_from_slice(&56u16.to_le_bytes());
        record[52] = 1;
        record[53] = 0;
        record[54] = 8;
        record[56..58].copy_from_slice(&100u16.to_le_bytes());
        record[60..64].copy_from_slice(&rate.to_le_bytes());
        for (i, v) in [7i16, -8, 9].iter().enumerate() {
            record[64 + 2 * i..66 + 2 * i].copy_from_slice(&v.to_le_bytes());
        }
        record
    }

    #[test]
    fn test_little_endian_int16_with_blockette_100() {
        let record = little_endian_record(40.0);
        let stream = read_from_bytes(&record).unwrap();
        let trace = &stream.traces[0];
        assert_eq!(trace.id.to_string(), "XX.ABC.00.BHZ");
        assert_eq!(trace.sampling_rate, 40.0);
        assert_eq!(trace.data, Samples::Int32(Array1::from(vec![7, -8, 9])));
        assert_eq!(trace.starttime, Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_implausible_sampling_rate_is_format_error() {
        for rate in [1e-30f32, -5.0, f32::NAN, f32::INFINITY] {
            let mut bytes = little_endian_record(rate);
            bytes.extend(little_endian_record(rate));
            assert!(matches!(read_from_bytes(&bytes), Err(ExplorerError::Format(_))));
        }
    }

    #[test]
    fn test_garbage_is_format_error() {
        assert!(matches!(
            read_from_bytes(b"this is not a miniSEED record, just some text padding it out......"),
            Err(ExplorerError::Format(_))
        ));
    }

    #[test]
    fn test_rate_factor_multiplier() {
        assert_eq!(rate_factor_multiplier(100.0).unwrap(), (100, -1));
        let (f, m) = rate_factor_multiplier(0.1).unwrap();
        assert_eq!(rate_from_factor_multiplier(f, m), 0.1);
        let (f, m) = rate_factor_multiplier(19.5).unwrap();
        assert_eq!(rate_from_factor_multiplier(f, m), 19.5);
        assert!(rate_factor_multiplier(0.0).is_err());
    }
}
