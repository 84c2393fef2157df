//! Decoding of `.w` byte ranges into sample arrays.
//!
//! The decoder is chosen by datatype tag. Fixed-width tags read exactly
//! `nsamp × bytes_per_sample` bytes; the compressed tags (`e1`, `ca`) consume what they
//! need and stop after `nsamp` samples. Output length always equals `nsamp` or the decode
//! fails. Calibration is never applied here; the segment layer does that.
//!
//! The 24-bit `s3` samples are widened with an explicit mask-and-or sign extension rather
//! than pointer tricks, and the Steim-family `e1` decoder reconstructs each packed block
//! before undoing the first differences.
use num::NumCast;
use std::convert::TryFrom;

use crate::datatype::WfDatatype;
use ffdb_core::FfdbError;
use ffdb_core::Result;

/// Decode `nsamp` samples. The output type is `f32` or `i32` at the caller's choice;
/// integer tags widen losslessly, float tags cast.
pub fn decode<T: Copy + NumCast>(bytes: &[u8], dt: WfDatatype, nsamp: usize) -> Result<Vec<T>> {
    match dt {
        WfDatatype::T4 | WfDatatype::F4 => decode_floats(bytes, dt, nsamp)?
            .into_iter()
            .map(cast::<f32, T>)
            .collect(),
        _ => decode_ints(bytes, dt, nsamp)?
            .into_iter()
            .map(cast::<i32, T>)
            .collect(),
    }
}

fn cast<S: NumCast + Copy + std::fmt::Display, T: NumCast>(v: S) -> Result<T> {
    T::from(v).ok_or(FfdbError::BadObject {
        reason: format!("sample {} does not fit the requested output type", v),
    })
}

fn short(dt: WfDatatype, need: usize, have: usize) -> FfdbError {
    FfdbError::BadObject {
        reason: format!(
            "{}: data ends early: need {} bytes, have {}",
            dt.tag(),
            need,
            have
        ),
    }
}

fn decode_ints(bytes: &[u8], dt: WfDatatype, nsamp: usize) -> Result<Vec<i32>> {
    if let Some(bps) = dt.bytes_per_sample() {
        let need = nsamp * bps;
        if bytes.len() < need {
            return Err(short(dt, need, bytes.len()));
        }
    }
    let out = match dt {
        WfDatatype::S2 => bytes
            .chunks_exact(2)
            .take(nsamp)
            .map(|b| i16::from_be_bytes([b[0], b[1]]) as i32)
            .collect(),
        WfDatatype::I2 => bytes
            .chunks_exact(2)
            .take(nsamp)
            .map(|b| i16::from_le_bytes([b[0], b[1]]) as i32)
            .collect(),
        WfDatatype::S4 => bytes
            .chunks_exact(4)
            .take(nsamp)
            .map(|b| i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
        WfDatatype::I4 => bytes
            .chunks_exact(4)
            .take(nsamp)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
        WfDatatype::S3 => bytes
            .chunks_exact(3)
            .take(nsamp)
            .map(|b| sign_extend_24(b[0], b[1], b[2]))
            .collect(),
        WfDatatype::G2 => bytes
            .chunks_exact(2)
            .take(nsamp)
            .map(|b| g2_to_int(u16::from_be_bytes([b[0], b[1]])))
            .collect(),
        WfDatatype::E1 => e1_decompress(bytes, nsamp)?,
        WfDatatype::Ca => ca_decompress(bytes, nsamp)?,
        WfDatatype::T4 | WfDatatype::F4 => {
            return decode_floats(bytes, dt, nsamp)
                .map(|v| v.into_iter().map(|f| f as i32).collect())
        }
    };
    Ok(out)
}

fn decode_floats(bytes: &[u8], dt: WfDatatype, nsamp: usize) -> Result<Vec<f32>> {
    let need = nsamp * 4;
    if bytes.len() < need {
        return Err(short(dt, need, bytes.len()));
    }
    let out = match dt {
        WfDatatype::T4 => bytes
            .chunks_exact(4)
            .take(nsamp)
            .map(|b| f32::from_be_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
        WfDatatype::F4 => bytes
            .chunks_exact(4)
            .take(nsamp)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
        _ => unreachable!("decode_floats called for integer datatype"),
    };
    Ok(out)
}

/// Widen a big-endian packed 24-bit sample to 32 bits.
fn sign_extend_24(b0: u8, b1: u8, b2: u8) -> i32 {
    let v = ((b0 as u32) << 16) | ((b1 as u32) << 8) | (b2 as u32);
    if v & 0x0080_0000 != 0 {
        (v | 0xFF00_0000) as i32
    } else {
        v as i32
    }
}

const G2_MULT: [i32; 4] = [1, 4, 16, 128];

/// Expand one gain-ranged 16-bit word: a 14-bit biased mantissa in the high bits and a
/// 2-bit gain code in the low bits.
fn g2_to_int(word: u16) -> i32 {
    let mantissa = (word >> 2) as i32;
    let gain = (word & 0x3) as usize;
    (mantissa - 8191) * G2_MULT[gain]
}

/// Undo the `e1` packing: blocks of `[width: u8][count: u8][payload]` holding big-endian
/// signed first differences of the declared width; the very first value of the stream is
/// absolute. Reconstruction is a running prefix sum.
fn e1_decompress(bytes: &[u8], nsamp: usize) -> Result<Vec<i32>> {
    let mut out = Vec::with_capacity(nsamp);
    let mut prev: Option<i32> = None;
    let mut pos = 0usize;
    while out.len() < nsamp {
        if pos + 2 > bytes.len() {
            return Err(short(WfDatatype::E1, pos + 2, bytes.len()));
        }
        let width = bytes[pos] as usize;
        let count = bytes[pos + 1] as usize;
        pos += 2;
        if !matches!(width, 1 | 2 | 4) || count == 0 {
            return Err(FfdbError::BadObject {
                reason: format!("e1: bad block header ({}, {})", width, count),
            });
        }
        let need = pos + width * count;
        if need > bytes.len() {
            return Err(short(WfDatatype::E1, need, bytes.len()));
        }
        for k in 0..count {
            if out.len() == nsamp {
                break;
            }
            let b = &bytes[pos + k * width..pos + (k + 1) * width];
            let v = match width {
                1 => b[0] as i8 as i32,
                2 => i16::from_be_bytes([b[0], b[1]]) as i32,
                _ => i32::from_be_bytes([b[0], b[1], b[2], b[3]]),
            };
            let cur = match prev {
                None => v,
                Some(p) => p.wrapping_add(v),
            };
            out.push(cur);
            prev = Some(cur);
        }
        pos = need;
    }
    Ok(out)
}

/// Pack samples into `e1` blocks; the inverse of [`e1_decompress`]. Mostly useful for
/// writing fixtures.
pub fn e1_compress(samples: &[i32]) -> Vec<u8> {
    let mut diffs = Vec::with_capacity(samples.len());
    let mut prev: Option<i32> = None;
    for &s in samples {
        diffs.push(match prev {
            None => s,
            Some(p) => s.wrapping_sub(p),
        });
        prev = Some(s);
    }
    let mut out = Vec::new();
    for chunk in diffs.chunks(255) {
        let width = chunk
            .iter()
            .map(|&d| {
                if i8::try_from(d).is_ok() {
                    1
                } else if i16::try_from(d).is_ok() {
                    2
                } else {
                    4
                }
            })
            .max()
            .unwrap_or(1);
        out.push(width as u8);
        out.push(chunk.len() as u8);
        for &d in chunk {
            match width {
                1 => out.push(d as i8 as u8),
                2 => out.extend_from_slice(&(d as i16).to_be_bytes()),
                _ => out.extend_from_slice(&d.to_be_bytes()),
            }
        }
    }
    out
}

/// Undo the `ca` ASCII packing: whitespace-separated tokens, the first absolute, the rest
/// first differences, with `r*d` meaning `r` repetitions of difference `d`.
fn ca_decompress(bytes: &[u8], nsamp: usize) -> Result<Vec<i32>> {
    let text = std::str::from_utf8(bytes).map_err(|_| FfdbError::BadObject {
        reason: "ca: stream is not ascii".to_string(),
    })?;
    let mut out = Vec::with_capacity(nsamp);
    let mut prev: Option<i32> = None;
    for tok in text.split_whitespace() {
        if out.len() == nsamp {
            break;
        }
        let (reps, val) = match tok.split_once('*') {
            Some((r, d)) => {
                let reps = r.parse::<usize>().map_err(|_| bad_ca_token(tok))?;
                (reps, d.parse::<i32>().map_err(|_| bad_ca_token(tok))?)
            }
            None => (1, tok.parse::<i32>().map_err(|_| bad_ca_token(tok))?),
        };
        for _ in 0..reps {
            if out.len() == nsamp {
                break;
            }
            let cur = match prev {
                None => val,
                Some(p) => p.wrapping_add(val),
            };
            out.push(cur);
            prev = Some(cur);
        }
    }
    if out.len() < nsamp {
        return Err(FfdbError::BadObject {
            reason: format!("ca: stream holds {} of {} samples", out.len(), nsamp),
        });
    }
    Ok(out)
}

fn bad_ca_token(tok: &str) -> FfdbError {
    FfdbError::BadObject {
        reason: format!("ca: bad token '{}'", tok),
    }
}

/// Pack samples into a `ca` stream; the inverse of [`ca_decompress`].
pub fn ca_compress(samples: &[i32]) -> Vec<u8> {
    let mut diffs = Vec::with_capacity(samples.len());
    let mut prev: Option<i32> = None;
    for &s in samples {
        diffs.push(match prev {
            None => s,
            Some(p) => s.wrapping_sub(p),
        });
        prev = Some(s);
    }
    let mut out = String::new();
    let mut i = 0;
    while i < diffs.len() {
        let mut j = i + 1;
        // The first token is absolute and never folded into a run.
        if i > 0 {
            while j < diffs.len() && diffs[j] == diffs[i] {
                j += 1;
            }
        }
        if !out.is_empty() {
            out.push(' ');
        }
        if j - i > 1 {
            out.push_str(&format!("{}*{}", j - i, diffs[i]));
        } else {
            out.push_str(&diffs[i].to_string());
        }
        i = j;
    }
    out.into_bytes()
}

/// Decode in envelope (decimation) mode: the data is read in contiguous blocks of
/// `nsamp / requested` samples and each block yields its `(min, max)` pair, so a rendering
/// at reduced width is exact up to block granularity. When `nsamp % requested != 0` the
/// final pair covers the remainder.
pub fn decode_envelope(
    bytes: &[u8],
    dt: WfDatatype,
    nsamp: usize,
    requested: usize,
) -> Result<Vec<(f32, f32)>> {
    if requested == 0 {
        return Err(FfdbError::AllocErr {
            reason: "envelope request of zero samples".to_string(),
        });
    }
    let data: Vec<f32> = decode(bytes, dt, nsamp)?;
    if requested >= nsamp {
        return Ok(data.iter().map(|&v| (v, v)).collect());
    }
    let block = nsamp / requested;
    let mut out = Vec::with_capacity(nsamp / block + 1);
    for chunk in data.chunks(block) {
        let mut lo = chunk[0];
        let mut hi = chunk[0];
        for &v in &chunk[1..] {
            if v < lo {
                lo = v;
            }
            if v > hi {
                hi = v;
            }
        }
        out.push((lo, hi));
    }
    Ok(out)
}
