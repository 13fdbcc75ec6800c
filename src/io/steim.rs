//! Steim1 and Steim2 difference compression of 32-bit integer samples.
//!
//! Data is organized in 64-byte frames of sixteen 32-bit words. Word 0 of each frame holds
//! fifteen 2-bit control codes describing how words 1..15 are packed. In the first frame of a
//! record, words 1 and 2 carry the forward (X0) and reverse (Xn) integration constants.

use crate::error::{ExplorerError, ExplorerResult};
use bytes::{Buf, BufMut, BytesMut};
use log::warn;

pub const FRAME_SIZE: usize = 64;
const WORDS_PER_FRAME: usize = 16;

/// Steim flavour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Steim {
    One,
    Two,
}

/// Packings as `(control nibble, sub-code, samples per word, bits per sample)`, preferred first.
const STEIM1_PACKINGS: [(u32, u32, usize, u32); 3] = [(1, 0, 4, 8), (2, 0, 2, 16), (3, 0, 1, 32)];
const STEIM2_PACKINGS: [(u32, u32, usize, u32); 7] = [
    (3, 2, 7, 4),
    (3, 1, 6, 5),
    (3, 0, 5, 6),
    (1, 0, 4, 8),
    (2, 3, 3, 10),
    (2, 2, 2, 15),
    (2, 1, 1, 30),
];

fn fits(value: i64, bits: u32) -> bool {
    let limit = 1i64 << (bits - 1);
    (-limit..limit).contains(&value)
}

fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

/// True when every first difference of `samples` fits into the 30 bits Steim2 can store.
pub fn steim2_compatible(samples: &[i32]) -> bool {
    samples
        .windows(2)
        .all(|w| fits(w[1] as i64 - w[0] as i64, 30))
}

fn pack_word(nibble: u32, sub_code: u32, bits: u32, diffs: &[i64]) -> u32 {
    if nibble == 1 {
        return diffs
            .iter()
            .fold(0u32, |word, &d| (word << 8) | (d as u32 & 0xff));
    }
    if bits == 32 {
        return diffs[0] as u32;
    }
    let mask = (1u32 << bits) - 1;
    let packed = diffs
        .iter()
        .fold(0u32, |word, &d| (word << bits) | (d as u32 & mask));
    if bits == 16 {
        packed
    } else {
        (sub_code << 30) | packed
    }
}

/// Compresses as many leading samples as fit into `max_frames` frames.
///
/// Returns the frame bytes (a multiple of 64) and the number of samples encoded. Fails when a
/// difference does not fit the largest packing of the flavour.
pub fn encode(
    flavour: Steim,
    samples: &[i32],
    max_frames: usize,
) -> ExplorerResult<(Vec<u8>, usize)> {
    if samples.is_empty() || max_frames == 0 {
        return Ok((vec![], 0));
    }
    let packings: &[(u32, u32, usize, u32)] = match flavour {
        Steim::One => &STEIM1_PACKINGS,
        Steim::Two => &STEIM2_PACKINGS,
    };
    // the first difference refers to a previous record and is not used by decoders
    let diffs: Vec<i64> = std::iter::once(0)
        .chain(samples.windows(2).map(|w| w[1] as i64 - w[0] as i64))
        .collect();

    let mut frames: Vec<[u32; WORDS_PER_FRAME]> = vec![];
    let mut pos = 0;
    while pos < diffs.len() && frames.len() < max_frames {
        let mut frame = [0u32; WORDS_PER_FRAME];
        let first_word = if frames.is_empty() { 3 } else { 1 };
        for word_index in first_word..WORDS_PER_FRAME {
            if pos >= diffs.len() {
                break;
            }
            let remaining = &diffs[pos..];
            let (nibble, sub_code, count, bits) = packings
                .iter()
                .copied()
                .find(|&(_, _, count, bits)| {
                    count <= remaining.len() && remaining[..count].iter().all(|&d| fits(d, bits))
                })
                .ok_or_else(|| {
                    ExplorerError::Precondition(format!(
                        "sample difference {} too large for {flavour:?} compression",
                        remaining[0]
                    ))
                })?;
            frame[word_index] = pack_word(nibble, sub_code, bits, &remaining[..count]);
            frame[0] |= nibble << (30 - 2 * word_index);
            pos += count;
        }
        frames.push(frame);
    }

    let encoded = pos;
    frames[0][1] = samples[0] as u32;
    frames[0][2] = samples[encoded - 1] as u32;
    let mut buf = BytesMut::with_capacity(frames.len() * FRAME_SIZE);
    for word in frames.iter().flatten() {
        buf.put_u32(*word);
    }
    Ok((buf.to_vec(), encoded))
}

fn unpack(value: u32, count: usize, bits: u32, out: &mut Vec<i64>) {
    let mask = (1u32 << bits) - 1;
    for k in (0..count).rev() {
        let raw = (value >> (k as u32 * bits)) & mask;
        out.push(sign_extend(raw, bits) as i64);
    }
}

/// Decompresses `nsamples` samples from Steim frames.
pub fn decode(
    flavour: Steim,
    data: &[u8],
    nsamples: usize,
    big_endian: bool,
) -> ExplorerResult<Vec<i32>> {
    if nsamples == 0 {
        return Ok(vec![]);
    }
    let mut diffs: Vec<i64> = Vec::with_capacity(nsamples + 8);
    let mut x0 = None;
    let mut xn = 0i32;
    let mut buf = data;
    let mut frame_index = 0;
    while buf.remaining() >= FRAME_SIZE && diffs.len() < nsamples {
        let mut words = [0u32; WORDS_PER_FRAME];
        for word in words.iter_mut() {
            *word = if big_endian {
                buf.get_u32()
            } else {
                buf.get_u32_le()
            };
        }
        for (i, &word) in words.iter().enumerate().skip(1) {
            let nibble = (words[0] >> (30 - 2 * i)) & 0b11;
            if frame_index == 0 && i == 1 {
                x0 = Some(word as i32);
                continue;
            }
            if frame_index == 0 && i == 2 {
                xn = word as i32;
                continue;
            }
            match (flavour, nibble) {
                (_, 0) => {}
                (_, 1) => unpack(word, 4, 8, &mut diffs),
                (Steim::One, 2) => unpack(word, 2, 16, &mut diffs),
                (Steim::One, _) => diffs.push(word as i32 as i64),
                (Steim::Two, 2) => match word >> 30 {
                    1 => unpack(word, 1, 30, &mut diffs),
                    2 => unpack(word, 2, 15, &mut diffs),
                    3 => unpack(word, 3, 10, &mut diffs),
                    _ => {
                        return Err(ExplorerError::Format(
                            "invalid Steim2 sub-code 0 for control 10".to_string(),
                        ))
                    }
                },
                (Steim::Two, _) => match word >> 30 {
                    0 => unpack(word, 5, 6, &mut diffs),
                    1 => unpack(word, 6, 5, &mut diffs),
                    2 => unpack(word, 7, 4, &mut diffs),
                    _ => {
                        return Err(ExplorerError::Format(
                            "invalid Steim2 sub-code 3 for control 11".to_string(),
                        ))
                    }
                },
            }
        }
        frame_index += 1;
    }

    let x0 = x0.ok_or_else(|| ExplorerError::Format("Steim data without frames".to_string()))?;
    if diffs.len() < nsamples {
        return Err(ExplorerError::Format(format!(
            "Steim frames hold {} samples, header announces {nsamples}",
            diffs.len()
        )));
    }
    let mut samples = Vec::with_capacity(nsamples);
    samples.push(x0);
    let mut last = x0 as i64;
    for &d in &diffs[1..nsamples] {
        last += d;
        samples.push(last as i32);
    }
    if samples.last().copied() != Some(xn) {
        warn!(
            "Steim integrity check failed: last sample {:?}, reverse constant {xn}",
            samples.last()
        );
    }
    Ok(samples)
}
