//! The replayable data-method stack.
//!
//! Every transformation applied to a time series is recorded as a method: a value object
//! with a stable one-line text form, a rotation-commutativity flag and an `apply`. Methods
//! are applied in list order; replaying the recorded stack over a re-read of the same
//! window reproduces the series. Rotation methods must keep their relative order against
//! every method that is not rotation-commutative.
mod convolve;
mod iir;
mod qc;
mod rotate;
mod taper;

pub use convolve::{Convolve, Direction, Response};
pub use iir::{Iir, IirType};
pub use qc::{QcData, QcDef, QcMask};
pub use rotate::Rotate;
pub use taper::{Taper, TaperType};

use crate::timeseries::TimeSeries;
use crate::{FfdbError, Result};

#[derive(Debug, Clone)]
pub enum Method {
    /// A copy of the window `[t1, t2]`; records the provenance of a duplicated series.
    CopyData { t1: f64, t2: f64 },
    /// Truncation to the window `[t1, t2]`.
    Cut { t1: f64, t2: f64 },
    Taper(Taper),
    Iir(Iir),
    /// Remove the mean computed over `[t1, t2]` (the whole series when the window is
    /// the null time).
    RemoveAvg { t1: f64, t2: f64 },
    /// Add a constant to every sample.
    Offset { value: f64 },
    /// Multiply every sample by a factor.
    AmpFactor { factor: f64, comment: String },
    /// Multiply each segment by its calibration factor.
    ApplyCalib,
    Rotate(Rotate),
    Convolve(Convolve),
    QcData(QcData),
}

impl Method {
    /// Whether the method commutes with a two-component rotation. Scalar gains and linear
    /// filters applied to both components do; anything that shifts or edits a single
    /// component does not.
    pub fn rotation_commutative(&self) -> bool {
        match self {
            Method::CopyData { .. } | Method::Cut { .. } => true,
            Method::Taper(_) | Method::Iir(_) | Method::Convolve(_) => true,
            Method::AmpFactor { .. } | Method::ApplyCalib | Method::RemoveAvg { .. } => true,
            Method::Offset { .. } | Method::Rotate(_) | Method::QcData(_) => false,
        }
    }

    /// Apply in place. `IIR` updates its recursion state; everything else is pure.
    pub fn apply_to(&mut self, ts: &mut TimeSeries) -> Result<()> {
        match self {
            Method::CopyData { t1, t2 } | Method::Cut { t1, t2 } => {
                // The selection is closed on both ends; pad by half a sample so the
                // half-open truncate keeps the sample sitting exactly at t2.
                let pad = ts.segments().first().map(|s| s.tdel() / 2.0).unwrap_or(0.0);
                ts.truncate(*t1, *t2 + pad);
                Ok(())
            }
            Method::Taper(t) => t.apply_to(ts),
            Method::Iir(f) => f.apply_to(ts),
            Method::RemoveAvg { t1, t2 } => {
                let window = if *t1 == ffdb_core::NULL_TIME || *t2 == ffdb_core::NULL_TIME {
                    ts.mean()
                } else {
                    let sub = ts.subseries(*t1, *t2);
                    if sub.is_empty() {
                        ts.mean()
                    } else {
                        sub.mean()
                    }
                };
                for seg in ts.segments_mut() {
                    for v in seg.data_mut() {
                        *v -= window as f32;
                    }
                }
                Ok(())
            }
            Method::Offset { value } => {
                for seg in ts.segments_mut() {
                    for v in seg.data_mut() {
                        *v += *value as f32;
                    }
                }
                Ok(())
            }
            Method::AmpFactor { factor, .. } => {
                for seg in ts.segments_mut() {
                    for v in seg.data_mut() {
                        *v *= *factor as f32;
                    }
                }
                Ok(())
            }
            Method::ApplyCalib => {
                for seg in ts.segments_mut() {
                    let calib = seg.calib();
                    if calib != 0.0 && calib != 1.0 {
                        for v in seg.data_mut() {
                            *v *= calib as f32;
                        }
                    }
                }
                Ok(())
            }
            Method::Rotate(r) => r.apply_to(ts),
            Method::Convolve(c) => c.apply_to(ts),
            Method::QcData(q) => q.apply_to(ts),
        }
    }

    /// The stable serialized form.
    pub fn to_text(&self) -> String {
        match self {
            Method::CopyData { t1, t2 } => format!("copy {:.5} {:.5}", t1, t2),
            Method::Cut { t1, t2 } => format!("cut {:.5} {:.5}", t1, t2),
            Method::Taper(t) => t.to_text(),
            Method::Iir(f) => f.to_text(),
            Method::RemoveAvg { t1, t2 } => format!("avg {:.5} {:.5}", t1, t2),
            Method::Offset { value } => format!("offset {}", value),
            Method::AmpFactor { factor, comment } => {
                format!("ampfactor {} {}", factor, comment)
            }
            Method::ApplyCalib => "calib".to_string(),
            Method::Rotate(r) => r.to_text(),
            Method::Convolve(c) => c.to_text(),
            Method::QcData(q) => q.to_text(),
        }
    }

    /// Parse a serialized form back into a method.
    pub fn from_text(text: &str) -> Result<Method> {
        let mut it = text.split_whitespace();
        let head = it.next().unwrap_or("");
        let rest: Vec<&str> = it.collect();
        let bad = || FfdbError::BadObject {
            reason: format!("cannot parse method '{}'", text),
        };
        let two = |rest: &[&str]| -> Result<(f64, f64)> {
            if rest.len() < 2 {
                return Err(bad());
            }
            let a = rest[0].parse().map_err(|_| bad())?;
            let b = rest[1].parse().map_err(|_| bad())?;
            Ok((a, b))
        };
        let m = match head {
            "copy" => {
                let (t1, t2) = two(&rest)?;
                Method::CopyData { t1, t2 }
            }
            "cut" => {
                let (t1, t2) = two(&rest)?;
                Method::Cut { t1, t2 }
            }
            "taper" => Method::Taper(Taper::from_args(&rest)?),
            "iir" => Method::Iir(Iir::from_args(&rest)?),
            "avg" => {
                let (t1, t2) = two(&rest)?;
                Method::RemoveAvg { t1, t2 }
            }
            "offset" => Method::Offset {
                value: rest.first().and_then(|s| s.parse().ok()).ok_or_else(bad)?,
            },
            "ampfactor" => Method::AmpFactor {
                factor: rest.first().and_then(|s| s.parse().ok()).ok_or_else(bad)?,
                comment: rest.get(1..).unwrap_or(&[]).join(" "),
            },
            "calib" => Method::ApplyCalib,
            "rotate" => Method::Rotate(Rotate::from_args(&rest)?),
            "convolve" => Method::Convolve(Convolve::from_args(&rest)?),
            "qc" => Method::QcData(QcData::from_args(&rest)?),
            _ => return Err(bad()),
        };
        Ok(m)
    }
}

/// The ordered list of methods attached to a time series.
#[derive(Debug, Clone, Default)]
pub struct MethodStack {
    methods: Vec<Method>,
}

impl MethodStack {
    pub fn new() -> MethodStack {
        MethodStack {
            methods: Vec::new(),
        }
    }

    pub fn push(&mut self, m: Method) {
        self.methods.push(m);
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<Method> {
        self.methods.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Method> {
        self.methods.get(index)
    }

    /// The first method of the named kind, by serialized head.
    pub fn find(&self, head: &str) -> Option<&Method> {
        self.methods
            .iter()
            .find(|m| m.to_text().starts_with(head))
    }

    /// Apply every method to the series, in order.
    pub fn replay(&mut self, ts: &mut TimeSeries) -> Result<()> {
        for m in &mut self.methods {
            m.apply_to(ts)?;
        }
        Ok(())
    }

    /// Whether appending `m` after the current tail preserves the ordering contract: a
    /// rotation may not move across a non-rotation-commutative method and vice versa.
    pub fn can_reorder_with_tail(&self, m: &Method) -> bool {
        match self.methods.last() {
            None => true,
            Some(tail) => tail.rotation_commutative() && m.rotation_commutative(),
        }
    }

    /// One serialized line per method.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for m in &self.methods {
            out.push_str(&m.to_text());
            out.push('\n');
        }
        out
    }

    pub fn from_text(text: &str) -> Result<MethodStack> {
        let mut stack = MethodStack::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            stack.push(Method::from_text(line)?);
        }
        Ok(stack)
    }
}

/// Apply a method to a series and record it on the stack.
pub fn apply_and_record(ts: &mut TimeSeries, mut m: Method) -> Result<()> {
    m.apply_to(ts)?;
    ts.methods.push(m);
    Ok(())
}

/// Re-apply the recorded stack of `ts` to itself, e.g. after a re-read replaced the
/// segment data.
pub fn replay_recorded(ts: &mut TimeSeries) -> Result<()> {
    let mut stack = std::mem::take(&mut ts.methods);
    let result = stack.replay(ts);
    ts.methods = stack;
    result
}
