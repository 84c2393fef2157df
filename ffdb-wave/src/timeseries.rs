//! The multi-segment time series.
//!
//! A time series is identified by station, channel and network, holds its segments in
//! ascending order without overlap, and joins an incoming segment onto its neighbor when
//! the sample interval, the gap and the calibration all pass the tolerance test:
//!
//! > join iff |b.tdel - a.tdel| / a.tdel < tdel_tolerance
//! >      and |b.tbeg - (a.tbeg + a.len * a.tdel)| / a.tdel < tdel_tolerance
//! >      and |b.calib - a.calib| / a.calib < calib_tolerance
//!
//! Micro-gaps inside a joined segment are not interpolated; that is a method.
use ffdb_core::{CssRecord, Quark};

use crate::methods::MethodStack;
use crate::segment::Segment;

/// Default fractional tolerance on the sample interval and inter-segment gap.
pub const DEFAULT_TDEL_TOLERANCE: f64 = 0.01;
/// Default fractional tolerance on the calibration factor.
pub const DEFAULT_CALIB_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone)]
pub struct TimeSeries {
    pub sta: Quark,
    pub chan: Quark,
    pub net: Quark,
    pub tdel_tolerance: f64,
    pub calib_tolerance: f64,
    segments: Vec<Segment>,
    /// The wfdisc-style row this series was materialized from, kept for re-read.
    wfdisc: Option<CssRecord>,
    /// The ordered transformations applied to this series.
    pub methods: MethodStack,
}

impl TimeSeries {
    pub fn new(sta: Quark, chan: Quark, net: Quark) -> TimeSeries {
        TimeSeries {
            sta,
            chan,
            net,
            tdel_tolerance: DEFAULT_TDEL_TOLERANCE,
            calib_tolerance: DEFAULT_CALIB_TOLERANCE,
            segments: Vec::new(),
            wfdisc: None,
            methods: MethodStack::new(),
        }
    }

    pub fn from_segment(sta: Quark, chan: Quark, net: Quark, seg: Segment) -> TimeSeries {
        let mut ts = TimeSeries::new(sta, chan, net);
        ts.add_segment(seg);
        ts
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segments_mut(&mut self) -> &mut [Segment] {
        &mut self.segments
    }

    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }

    pub fn segment_at(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    /// Total number of samples across segments.
    pub fn npts(&self) -> usize {
        self.segments.iter().map(|s| s.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.npts() == 0
    }

    pub fn tbeg(&self) -> f64 {
        self.segments.first().map(|s| s.tbeg()).unwrap_or(0.0)
    }

    pub fn tend(&self) -> f64 {
        self.segments.last().map(|s| s.tend()).unwrap_or(0.0)
    }

    pub fn wfdisc(&self) -> Option<&CssRecord> {
        self.wfdisc.as_ref()
    }

    pub fn set_wfdisc(&mut self, rec: CssRecord) {
        self.wfdisc = Some(rec);
    }

    /// Whether two adjacent segments pass the join test.
    fn joins(&self, a: &Segment, b: &Segment) -> bool {
        if a.is_empty() || b.is_empty() || a.tdel() <= 0.0 {
            return false;
        }
        let dt_ok = ((b.tdel() - a.tdel()) / a.tdel()).abs() < self.tdel_tolerance;
        let expected = a.tbeg() + a.len() as f64 * a.tdel();
        let gap_ok = ((b.tbeg() - expected) / a.tdel()).abs() < self.tdel_tolerance;
        let calib_ok = if a.calib() != 0.0 {
            ((b.calib() - a.calib()) / a.calib()).abs() < self.calib_tolerance
        } else {
            b.calib() == 0.0
        };
        dt_ok && gap_ok && calib_ok
    }

    /// Add a segment, joining onto its neighbor when the tolerance test passes. Segments
    /// stay ordered by `tbeg`.
    pub fn add_segment(&mut self, seg: Segment) {
        self.add_segment_join(seg, true);
    }

    pub fn add_segment_join(&mut self, seg: Segment, join: bool) {
        if seg.is_empty() {
            return;
        }
        let pos = self
            .segments
            .iter()
            .position(|s| s.tbeg() > seg.tbeg())
            .unwrap_or(self.segments.len());
        if join && pos > 0 && self.joins(&self.segments[pos - 1], &seg) {
            // The joined segment keeps the left neighbor's tdel.
            self.segments[pos - 1].concat(&seg);
            return;
        }
        self.segments.insert(pos, seg);
    }

    /// The segment whose half-open interval `[tbeg, tend)` holds `t`.
    pub fn segment(&self, t: f64) -> Option<&Segment> {
        self.segments
            .iter()
            .find(|s| !s.is_empty() && t >= s.tbeg() && t < s.tend())
    }

    /// The segment nearest to `t` in time.
    pub fn nearest_segment(&self, t: f64) -> Option<&Segment> {
        self.segments.iter().min_by(|a, b| {
            let da = segment_distance(a, t);
            let db = segment_distance(b, t);
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        })
    }

    /// A new series covering `[t1, t2)`, boundaries snapped inward to sample times. A
    /// segment whose last sample sits at `t1` contributes nothing.
    pub fn subseries(&self, t1: f64, t2: f64) -> TimeSeries {
        let mut out = TimeSeries::new(self.sta, self.chan, self.net);
        out.tdel_tolerance = self.tdel_tolerance;
        out.calib_tolerance = self.calib_tolerance;
        out.wfdisc = self.wfdisc.clone();
        out.methods = self.methods.clone();
        for seg in &self.segments {
            if seg.is_empty() || seg.tend() <= t1 || seg.tbeg() >= t2 {
                continue;
            }
            let i1 = seg.index_at(t1).unwrap_or(seg.len());
            let mut i2 = seg.len();
            while i2 > i1 && seg.time_of(i2 - 1) >= t2 {
                i2 -= 1;
            }
            if i2 > i1 {
                out.add_segment_join(seg.subsegment(i1, i2), false);
            }
        }
        out
    }

    /// Keep only `[t1, t2)`, in place. Returns whether anything was removed.
    pub fn truncate(&mut self, t1: f64, t2: f64) -> bool {
        let before = self.npts();
        let mut kept = Vec::new();
        for seg in self.segments.drain(..) {
            if seg.is_empty() || seg.tend() <= t1 || seg.tbeg() >= t2 {
                continue;
            }
            let i1 = seg.index_at(t1).unwrap_or(seg.len());
            let mut i2 = seg.len();
            while i2 > i1 && seg.time_of(i2 - 1) >= t2 {
                i2 -= 1;
            }
            if i2 > i1 {
                let mut s = seg;
                s.truncate(i1, i2);
                kept.push(s);
            }
        }
        self.segments = kept;
        self.npts() != before
    }

    pub fn remove_all_segments(&mut self) {
        self.segments.clear();
    }

    pub fn data_min(&self) -> f64 {
        self.fold_samples(f64::INFINITY, |acc, v| acc.min(v))
    }

    pub fn data_max(&self) -> f64 {
        self.fold_samples(f64::NEG_INFINITY, |acc, v| acc.max(v))
    }

    pub fn mean(&self) -> f64 {
        let n = self.npts();
        if n == 0 {
            return 0.0;
        }
        self.fold_samples(0.0, |acc, v| acc + v) / n as f64
    }

    fn fold_samples<F: Fn(f64, f64) -> f64>(&self, init: f64, f: F) -> f64 {
        let mut acc = init;
        for seg in &self.segments {
            for &v in seg.data() {
                acc = f(acc, v as f64);
            }
        }
        acc
    }

    /// The time and value of the smallest sample.
    pub fn min_point(&self) -> Option<(f64, f32)> {
        self.extreme_point(|a, b| a < b)
    }

    /// The time and value of the largest sample.
    pub fn max_point(&self) -> Option<(f64, f32)> {
        self.extreme_point(|a, b| a > b)
    }

    fn extreme_point<F: Fn(f32, f32) -> bool>(&self, better: F) -> Option<(f64, f32)> {
        let mut best: Option<(f64, f32)> = None;
        for seg in &self.segments {
            for (i, &v) in seg.data().iter().enumerate() {
                match best {
                    Some((_, b)) if !better(v, b) => {}
                    _ => best = Some((seg.time_of(i), v)),
                }
            }
        }
        best
    }

    /// The sample whose time is nearest `t`, as `(segment index, sample index)`.
    pub fn nearest(&self, t: f64) -> Option<(usize, usize)> {
        let mut best: Option<(usize, usize, f64)> = None;
        for (si, seg) in self.segments.iter().enumerate() {
            if seg.is_empty() {
                continue;
            }
            let i = if t <= seg.tbeg() {
                0
            } else if t >= seg.tend() {
                seg.len() - 1
            } else {
                ((t - seg.tbeg()) / seg.tdel()).round() as usize
            };
            let d = (seg.time_of(i) - t).abs();
            if best.map(|(_, _, bd)| d < bd).unwrap_or(true) {
                best = Some((si, i, d));
            }
        }
        best.map(|(si, i, _)| (si, i))
    }

    /// Concatenate every sample into one flat array (gaps are not represented).
    pub fn copy_into(&self, out: &mut Vec<f32>) {
        out.clear();
        out.reserve(self.npts());
        for seg in &self.segments {
            out.extend_from_slice(seg.data());
        }
    }

    /// Linearly interpolate across every inter-segment gap of at most `max_gap` samples,
    /// merging the filled neighbors into one segment.
    pub fn fill_all_gaps(&mut self, max_gap: usize) {
        let mut i = 0;
        while i + 1 < self.segments.len() {
            let (a, b) = (&self.segments[i], &self.segments[i + 1]);
            if a.is_empty() || b.is_empty() || a.tdel() <= 0.0 {
                i += 1;
                continue;
            }
            let gap = ((b.tbeg() - a.tend()) / a.tdel()).round() as i64 - 1;
            if gap < 1 || gap as usize > max_gap {
                i += 1;
                continue;
            }
            let gap = gap as usize;
            let last = *a.data().last().unwrap();
            let first = b.data()[0];
            let step = (first - last) / (gap + 1) as f32;
            let mut filled: Vec<f32> = (1..=gap).map(|k| last + step * k as f32).collect();
            filled.extend_from_slice(b.data());
            let b_seg = self.segments.remove(i + 1);
            let a_seg = &mut self.segments[i];
            let fill_tbeg = a_seg.tend() + a_seg.tdel();
            let fill = Segment::new(filled, fill_tbeg, a_seg.tdel(), b_seg.calib(), b_seg.calper())
                .expect("positive tdel");
            a_seg.concat(&fill);
        }
    }

    /// Every `rate`-th sample of each segment, as a new series.
    pub fn decimate(&self, rate: usize) -> TimeSeries {
        let rate = rate.max(1);
        let mut out = TimeSeries::new(self.sta, self.chan, self.net);
        out.tdel_tolerance = self.tdel_tolerance;
        out.calib_tolerance = self.calib_tolerance;
        out.wfdisc = self.wfdisc.clone();
        for seg in &self.segments {
            if seg.is_empty() {
                continue;
            }
            let data: Vec<f32> = seg.data().iter().step_by(rate).copied().collect();
            out.add_segment_join(
                Segment::new(
                    data,
                    seg.tbeg(),
                    seg.tdel() * rate as f64,
                    seg.calib(),
                    seg.calper(),
                )
                .expect("positive tdel"),
                false,
            );
        }
        out
    }
}

fn segment_distance(s: &Segment, t: f64) -> f64 {
    if s.is_empty() {
        return f64::INFINITY;
    }
    if t < s.tbeg() {
        s.tbeg() - t
    } else if t > s.tend() {
        t - s.tend()
    } else {
        0.0
    }
}
