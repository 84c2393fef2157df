//! The quality-control method: mask detection and mask-and-fix.
//!
//! The basic pass masks runs of `drop_thr` or more consecutive equal samples and
//! single-point spikes against `single_trace_spike_thr` on demeaned data. The extended
//! pass repeats spike detection over windows of `nsamp` samples with `nover` overlap for
//! `niter` iterations, thresholding against a per-window statistic. Fixing interpolates
//! linearly across each masked run and cosine-tapers `ntaper` points on the flanks.
use crate::segment::Segment;
use crate::timeseries::TimeSeries;
use crate::{FfdbError, Result};

/// Which statistic measures a window in the extended pass.
pub const SPIKE_STAT_AVG: i32 = 0;
pub const SPIKE_STAT_PER: i32 = 1;

/// Which data set the extended pass inspects.
pub const SPIKE_DSET_DATA: i32 = 0;
pub const SPIKE_DSET_1DIFF: i32 = 1;
pub const SPIKE_DSET_ALL: i32 = 2;

pub const QC_ZERO_TOL: f64 = 1.0e-6;

/// A QC definition; the knobs of both passes.
#[derive(Debug, Clone, PartialEq)]
pub struct QcDef {
    /// Fix the data after masking?
    pub fix: bool,
    /// Points to taper on the flanks of fixed runs.
    pub ntaper: usize,
    /// Consecutive equal-valued samples that make a bad run.
    pub drop_thr: usize,
    /// Amplitude threshold for single-point spikes.
    pub single_trace_spike_thr: f64,
    /// Extended-pass iterations.
    pub niter: usize,
    /// Extended-pass window length in samples.
    pub nsamp: usize,
    /// Extended-pass window overlap in samples.
    pub nover: usize,
    /// Extended-pass spike threshold, as a multiple of the window statistic.
    pub spike_thr: f64,
    pub spike_stat: i32,
    pub spike_val: f64,
    pub spike_npwin: usize,
    pub spike_dset: i32,
}

impl Default for QcDef {
    fn default() -> QcDef {
        QcDef {
            fix: true,
            ntaper: 5,
            drop_thr: 5,
            single_trace_spike_thr: 10.0,
            niter: 2,
            nsamp: 500,
            nover: 100,
            spike_thr: 8.0,
            spike_stat: SPIKE_STAT_AVG,
            spike_val: 0.95,
            spike_npwin: 10,
            spike_dset: SPIKE_DSET_DATA,
        }
    }
}

/// Half-open masked sample ranges within one segment, with the definition that made them.
#[derive(Debug, Clone)]
pub struct QcMask {
    pub segs: Vec<(usize, usize)>,
    pub def: QcDef,
}

impl QcMask {
    pub fn empty(def: QcDef) -> QcMask {
        QcMask {
            segs: Vec::new(),
            def,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segs.is_empty()
    }

    /// Total masked samples.
    pub fn count(&self) -> usize {
        self.segs.iter().map(|(s, e)| e - s).sum()
    }

    pub fn all_masked(&self, npts: usize) -> bool {
        self.segs.len() == 1 && self.segs[0] == (0, npts)
    }

    /// Whether `[istart, iend)` intersects any masked range.
    pub fn intersects(&self, istart: usize, iend: usize) -> bool {
        self.segs.iter().any(|&(s, e)| s < iend && istart < e)
    }

    /// Shift every range by `offset` samples.
    pub fn add_offset(&mut self, offset: usize) {
        for (s, e) in &mut self.segs {
            *s += offset;
            *e += offset;
        }
    }

    /// The union of two masks over the same segment.
    pub fn merge(&self, other: &QcMask) -> QcMask {
        let mut ranges: Vec<(usize, usize)> = self
            .segs
            .iter()
            .chain(other.segs.iter())
            .copied()
            .collect();
        ranges.sort();
        let mut merged: Vec<(usize, usize)> = Vec::new();
        for (s, e) in ranges {
            match merged.last_mut() {
                Some((_, le)) if s <= *le => *le = (*le).max(e),
                _ => merged.push((s, e)),
            }
        }
        QcMask {
            segs: merged,
            def: self.def.clone(),
        }
    }

    /// The mean of the unmasked samples.
    pub fn mean(&self, data: &[f32]) -> f64 {
        let mut sum = 0.0;
        let mut n = 0usize;
        for (i, &v) in data.iter().enumerate() {
            if !self.intersects(i, i + 1) {
                sum += v as f64;
                n += 1;
            }
        }
        if n == 0 {
            0.0
        } else {
            sum / n as f64
        }
    }
}

fn push_range(segs: &mut Vec<(usize, usize)>, start: usize, end: usize) {
    match segs.last_mut() {
        Some((_, le)) if start <= *le => *le = (*le).max(end),
        _ => segs.push((start, end)),
    }
}

/// The basic mask pass over one data array.
pub fn qc_basic(data: &[f32], def: &QcDef) -> QcMask {
    let mut mask = QcMask::empty(def.clone());
    let n = data.len();
    if n == 0 {
        return mask;
    }

    // Runs of consecutive equal-valued samples.
    if def.drop_thr > 0 {
        let mut run_start = 0;
        for i in 1..=n {
            let same = i < n && ((data[i] - data[run_start]) as f64).abs() <= QC_ZERO_TOL;
            if !same {
                if i - run_start >= def.drop_thr {
                    push_range(&mut mask.segs, run_start, i);
                }
                run_start = i;
            }
        }
    }

    // Single-point spikes on demeaned data.
    if def.single_trace_spike_thr > 0.0 && n >= 3 {
        let mean = data.iter().map(|&v| v as f64).sum::<f64>() / n as f64;
        let thr = def.single_trace_spike_thr;
        let mut spikes = Vec::new();
        for i in 1..n - 1 {
            let d = data[i] as f64 - mean;
            let dl = (data[i] as f64 - data[i - 1] as f64).abs();
            let dr = (data[i] as f64 - data[i + 1] as f64).abs();
            if d.abs() > thr && dl > thr && dr > thr {
                push_range(&mut spikes, i, i + 1);
            }
        }
        if !spikes.is_empty() {
            mask = mask.merge(&QcMask {
                segs: spikes,
                def: def.clone(),
            });
        }
    }
    mask
}

/// The extended windowed pass over one data array.
pub fn qc_extended(data: &[f32], def: &QcDef) -> QcMask {
    let mut mask = qc_basic(data, def);
    let n = data.len();
    if n == 0 || def.nsamp == 0 || def.spike_thr <= 0.0 {
        return mask;
    }
    let step = def.nsamp.saturating_sub(def.nover).max(1);
    let series: Vec<f64> = match def.spike_dset {
        SPIKE_DSET_1DIFF => std::iter::once(0.0)
            .chain(data.windows(2).map(|w| (w[1] - w[0]) as f64))
            .collect(),
        _ => data.iter().map(|&v| v as f64).collect(),
    };
    for _ in 0..def.niter.max(1) {
        let mut found = Vec::new();
        let mut start = 0;
        while start < n {
            let end = (start + def.nsamp).min(n);
            let window = &series[start..end];
            let mean = window.iter().sum::<f64>() / window.len() as f64;
            let stat = match def.spike_stat {
                SPIKE_STAT_PER => percentile(window, def.spike_val),
                _ => window.iter().map(|v| (v - mean).abs()).sum::<f64>() / window.len() as f64,
            };
            if stat > 0.0 {
                for (i, v) in window.iter().enumerate() {
                    if (v - mean).abs() > def.spike_thr * stat {
                        push_range(&mut found, start + i, start + i + 1);
                    }
                }
            }
            if end == n {
                break;
            }
            start += step;
        }
        if found.is_empty() {
            break;
        }
        let add = QcMask {
            segs: found,
            def: def.clone(),
        };
        mask = mask.merge(&add);
    }
    mask
}

fn percentile(window: &[f64], frac: f64) -> f64 {
    let mut mags: Vec<f64> = window.iter().map(|v| v.abs()).collect();
    mags.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let idx = ((mags.len() - 1) as f64 * frac.clamp(0.0, 1.0)).round() as usize;
    mags[idx]
}

/// Interpolate linearly across each masked run and cosine-taper the flanks.
pub fn qc_fix(data: &mut [f32], mask: &QcMask) {
    let n = data.len();
    for &(s, e) in &mask.segs {
        if s >= n {
            continue;
        }
        let e = e.min(n);
        let left = if s > 0 { data[s - 1] } else { 0.0 };
        let right = if e < n { data[e] } else { left };
        let len = (e - s) as f32;
        for (k, v) in data[s..e].iter_mut().enumerate() {
            let x = (k + 1) as f32 / (len + 1.0);
            *v = left + (right - left) * x;
        }
        taper_flanks(data, s, e, mask.def.ntaper);
    }
}

/// Blend `ntaper` flank samples toward the fixed run's edge values so the junctions stay
/// smooth. A sample at distance `k` from the mask keeps more of itself as `k` grows.
fn taper_flanks(data: &mut [f32], s: usize, e: usize, ntaper: usize) {
    if ntaper == 0 || s >= e || e > data.len() {
        return;
    }
    let n = data.len();
    let left_edge = data[s];
    let right_edge = data[e - 1];
    for k in 0..ntaper {
        let w = 0.5 * (1.0 - (std::f64::consts::PI * (k + 1) as f64 / (ntaper + 1) as f64).cos());
        if s > k {
            let i = s - 1 - k;
            data[i] = (left_edge as f64 * (1.0 - w) + data[i] as f64 * w) as f32;
        }
        if e + k < n {
            let i = e + k;
            data[i] = (right_edge as f64 * (1.0 - w) + data[i] as f64 * w) as f32;
        }
    }
}

/// The QC method recorded on a time series.
#[derive(Debug, Clone)]
pub struct QcData {
    pub extended: bool,
    pub def: QcDef,
    /// Masks produced by the last apply, one per segment.
    pub masks: Vec<QcMask>,
}

impl QcData {
    pub fn new(extended: bool, def: QcDef) -> QcData {
        QcData {
            extended,
            def,
            masks: Vec::new(),
        }
    }

    pub(crate) fn from_args(args: &[&str]) -> Result<QcData> {
        if args.len() < 13 {
            return Err(FfdbError::BadObject {
                reason: "qc needs 13 arguments".to_string(),
            });
        }
        let bad = || FfdbError::BadObject {
            reason: format!("cannot parse qc '{}'", args.join(" ")),
        };
        let flag = |s: &str| matches!(s, "1" | "true" | "y");
        let def = QcDef {
            fix: flag(args[1]),
            drop_thr: args[2].parse().map_err(|_| bad())?,
            single_trace_spike_thr: args[3].parse().map_err(|_| bad())?,
            ntaper: args[4].parse().map_err(|_| bad())?,
            niter: args[5].parse().map_err(|_| bad())?,
            nsamp: args[6].parse().map_err(|_| bad())?,
            nover: args[7].parse().map_err(|_| bad())?,
            spike_thr: args[8].parse().map_err(|_| bad())?,
            spike_stat: args[9].parse().map_err(|_| bad())?,
            spike_val: args[10].parse().map_err(|_| bad())?,
            spike_npwin: args[11].parse().map_err(|_| bad())?,
            spike_dset: args[12].parse().map_err(|_| bad())?,
        };
        Ok(QcData::new(flag(args[0]), def))
    }

    pub fn to_text(&self) -> String {
        let d = &self.def;
        format!(
            "qc {} {} {} {} {} {} {} {} {} {} {} {} {}",
            self.extended as u8,
            d.fix as u8,
            d.drop_thr,
            d.single_trace_spike_thr,
            d.ntaper,
            d.niter,
            d.nsamp,
            d.nover,
            d.spike_thr,
            d.spike_stat,
            d.spike_val,
            d.spike_npwin,
            d.spike_dset
        )
    }

    pub fn apply_to(&mut self, ts: &mut TimeSeries) -> Result<()> {
        self.masks.clear();
        for seg in ts.segments_mut() {
            let mask = self.mask_segment(seg);
            if self.def.fix && !mask.is_empty() {
                qc_fix(seg.data_mut(), &mask);
            }
            self.masks.push(mask);
        }
        Ok(())
    }

    fn mask_segment(&self, seg: &Segment) -> QcMask {
        if self.extended {
            qc_extended(seg.data(), &self.def)
        } else {
            qc_basic(seg.data(), &self.def)
        }
    }
}
