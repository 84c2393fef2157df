//! The IIR filter method: Butterworth in cascaded second-order sections.
//!
//! The design runs once per sample interval: analog prototype poles, prewarped cutoffs,
//! LP/HP/BP/BR transform, bilinear map, conjugate pairing into biquads, and a gain
//! normalization at the band's reference frequency. Filtering is direct-form I with the
//! per-section recursion state `(x1, x2, y1, y2)` kept on the method, so a window that
//! continues the previous one is filtered as if the data had never been split. A window
//! that does not continue the previous one resets the state, which makes replay over a
//! re-read bit-identical.
use num::complex::Complex64;

use crate::timeseries::TimeSeries;
use crate::{FfdbError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IirType {
    LP,
    HP,
    BP,
    BR,
}

impl IirType {
    pub fn name(self) -> &'static str {
        match self {
            IirType::LP => "LP",
            IirType::HP => "HP",
            IirType::BP => "BP",
            IirType::BR => "BR",
        }
    }

    pub fn from_name(name: &str) -> Result<IirType> {
        let t = match name {
            "LP" | "lp" => IirType::LP,
            "HP" | "hp" => IirType::HP,
            "BP" | "bp" => IirType::BP,
            "BR" | "br" => IirType::BR,
            _ => {
                return Err(FfdbError::BadObject {
                    reason: format!("unknown filter type '{}'", name),
                })
            }
        };
        Ok(t)
    }
}

#[derive(Debug, Clone, Copy)]
struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct SectionState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

#[derive(Debug, Clone)]
pub struct Iir {
    pub order: usize,
    pub iir_type: IirType,
    pub flo: f64,
    pub fhi: f64,
    pub zero_phase: bool,
    /// Sample interval the current sections were designed for.
    tdel: f64,
    sections: Vec<Biquad>,
    state: Vec<SectionState>,
    /// End time of the last filtered window, for continuation detection.
    last_end: Option<f64>,
}

impl Iir {
    pub fn new(order: usize, iir_type: IirType, flo: f64, fhi: f64, zero_phase: bool) -> Iir {
        Iir {
            order,
            iir_type,
            flo,
            fhi,
            zero_phase,
            tdel: 0.0,
            sections: Vec::new(),
            state: Vec::new(),
            last_end: None,
        }
    }

    pub(crate) fn from_args(args: &[&str]) -> Result<Iir> {
        if args.len() < 5 {
            return Err(FfdbError::BadObject {
                reason: "iir needs <order> <type> <flo> <fhi> <zero_phase>".to_string(),
            });
        }
        let bad = || FfdbError::BadObject {
            reason: format!("cannot parse iir '{}'", args.join(" ")),
        };
        Ok(Iir::new(
            args[0].parse().map_err(|_| bad())?,
            IirType::from_name(args[1])?,
            args[2].parse().map_err(|_| bad())?,
            args[3].parse().map_err(|_| bad())?,
            matches!(args[4], "1" | "true" | "y"),
        ))
    }

    pub fn to_text(&self) -> String {
        format!(
            "iir {} {} {} {} {}",
            self.order,
            self.iir_type.name(),
            self.flo,
            self.fhi,
            self.zero_phase as u8
        )
    }

    pub fn apply_to(&mut self, ts: &mut TimeSeries) -> Result<()> {
        let mut last_end = self.last_end;
        for i in 0..ts.num_segments() {
            let (tbeg, tdel, tend) = {
                let s = ts.segment_at(i).unwrap();
                (s.tbeg(), s.tdel(), s.tend())
            };
            if tdel != self.tdel || self.sections.is_empty() {
                self.design(tdel)?;
                last_end = None;
            }
            // A segment that does not continue the previous window restarts the recursion.
            let continues = last_end
                .map(|t| ((tbeg - (t + tdel)) / tdel).abs() < 0.5)
                .unwrap_or(false);
            if !continues {
                self.reset();
            }
            let seg = ts.segments_mut().get_mut(i).unwrap();
            if self.zero_phase {
                // Two passes, forward then time-reversed; continuation is meaningless here.
                self.reset();
                self.run(seg.data_mut(), false);
                self.reset();
                self.run(seg.data_mut(), true);
                self.reset();
            } else {
                self.run(seg.data_mut(), false);
            }
            last_end = Some(tend);
        }
        self.last_end = last_end;
        Ok(())
    }

    /// Filter a bare data array, resetting the recursion first.
    pub fn filter_data(&mut self, data: &mut [f32], tdel: f64) -> Result<()> {
        if tdel != self.tdel || self.sections.is_empty() {
            self.design(tdel)?;
        }
        self.reset();
        if self.zero_phase {
            self.run(data, false);
            self.reset();
            self.run(data, true);
            self.reset();
        } else {
            self.run(data, false);
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        for s in &mut self.state {
            *s = SectionState::default();
        }
    }

    fn run(&mut self, data: &mut [f32], reversed: bool) {
        let n = data.len();
        for k in 0..n {
            let idx = if reversed { n - 1 - k } else { k };
            let mut v = data[idx] as f64;
            for (sec, st) in self.sections.iter().zip(self.state.iter_mut()) {
                let y = sec.b0 * v + sec.b1 * st.x1 + sec.b2 * st.x2
                    - sec.a1 * st.y1
                    - sec.a2 * st.y2;
                st.x2 = st.x1;
                st.x1 = v;
                st.y2 = st.y1;
                st.y1 = y;
                v = y;
            }
            data[idx] = v as f32;
        }
    }

    fn design(&mut self, tdel: f64) -> Result<()> {
        if !(tdel > 0.0) {
            return Err(FfdbError::BadObject {
                reason: "cannot design filter for non-positive sample interval".to_string(),
            });
        }
        if self.order == 0 || self.order > 12 {
            return Err(FfdbError::BadObject {
                reason: format!("filter order {} out of range", self.order),
            });
        }
        let nyquist = 0.5 / tdel;
        let check = |f: f64| f > 0.0 && f < nyquist;
        let ok = match self.iir_type {
            IirType::LP => check(self.fhi),
            IirType::HP => check(self.flo),
            IirType::BP | IirType::BR => check(self.flo) && check(self.fhi) && self.flo < self.fhi,
        };
        if !ok {
            return Err(FfdbError::BadObject {
                reason: format!(
                    "filter band {}..{} invalid for sample interval {}",
                    self.flo, self.fhi, tdel
                ),
            });
        }

        // Analog Butterworth prototype poles, all in the left half plane.
        let n = self.order;
        let proto: Vec<Complex64> = (0..n)
            .map(|k| {
                let theta = std::f64::consts::PI * (2 * k + n + 1) as f64 / (2 * n) as f64;
                Complex64::new(theta.cos(), theta.sin())
            })
            .collect();

        let warp = |f: f64| 2.0 / tdel * (std::f64::consts::PI * f * tdel).tan();
        let mut poles: Vec<Complex64> = Vec::new();
        let mut zeros: Vec<Complex64> = Vec::new();
        match self.iir_type {
            IirType::LP => {
                let wc = warp(self.fhi);
                poles.extend(proto.iter().map(|p| *p * wc));
                // All n zeros at infinity.
            }
            IirType::HP => {
                let wc = warp(self.flo);
                poles.extend(proto.iter().map(|p| wc / *p));
                zeros.extend(std::iter::repeat(Complex64::new(0.0, 0.0)).take(n));
            }
            IirType::BP => {
                let (wl, wh) = (warp(self.flo), warp(self.fhi));
                let bw = wh - wl;
                let w0sq = wl * wh;
                for p in &proto {
                    let half = *p * bw / 2.0;
                    let disc = (half * half - w0sq).sqrt();
                    poles.push(half + disc);
                    poles.push(half - disc);
                }
                zeros.extend(std::iter::repeat(Complex64::new(0.0, 0.0)).take(n));
            }
            IirType::BR => {
                let (wl, wh) = (warp(self.flo), warp(self.fhi));
                let bw = wh - wl;
                let w0sq = wl * wh;
                let w0 = w0sq.sqrt();
                for p in &proto {
                    let half = (bw / 2.0) / *p;
                    let disc = (half * half - w0sq).sqrt();
                    poles.push(half + disc);
                    poles.push(half - disc);
                }
                for _ in 0..n {
                    zeros.push(Complex64::new(0.0, w0));
                    zeros.push(Complex64::new(0.0, -w0));
                }
            }
        }

        // Bilinear map; every zero at infinity lands on z = -1.
        let fs2 = 2.0 / tdel;
        let bilinear = |s: Complex64| (fs2 + s) / (fs2 - s);
        let zpoles: Vec<Complex64> = poles.iter().map(|&s| bilinear(s)).collect();
        let mut zzeros: Vec<Complex64> = zeros.iter().map(|&s| bilinear(s)).collect();
        while zzeros.len() < zpoles.len() {
            zzeros.push(Complex64::new(-1.0, 0.0));
        }

        let mut sections = pair_into_biquads(&zzeros, &zpoles);

        // Normalize gain at the band's reference frequency.
        let zref = match self.iir_type {
            IirType::LP | IirType::BR => Complex64::new(1.0, 0.0),
            IirType::HP => Complex64::new(-1.0, 0.0),
            IirType::BP => {
                let f0 = (self.flo * self.fhi).sqrt();
                let w = 2.0 * std::f64::consts::PI * f0 * tdel;
                Complex64::new(w.cos(), w.sin())
            }
        };
        let mut h = Complex64::new(1.0, 0.0);
        for s in &sections {
            let zi = 1.0 / zref;
            let num = s.b0 + s.b1 * zi + s.b2 * zi * zi;
            let den = Complex64::new(1.0, 0.0) + s.a1 * zi + s.a2 * zi * zi;
            h *= num / den;
        }
        let gain = 1.0 / h.norm();
        if let Some(first) = sections.first_mut() {
            first.b0 *= gain;
            first.b1 *= gain;
            first.b2 *= gain;
        }

        self.state = vec![SectionState::default(); sections.len()];
        self.sections = sections;
        self.tdel = tdel;
        self.last_end = None;
        Ok(())
    }
}

/// Pair conjugate roots into second-order sections with real coefficients. Roots arrive in
/// conjugate pairs by construction; near-real leftovers pair among themselves, and a final
/// odd real root forms a first-order section.
fn pair_into_biquads(zeros: &[Complex64], poles: &[Complex64]) -> Vec<Biquad> {
    let zpairs = pair_roots(zeros);
    let ppairs = pair_roots(poles);
    let nsect = ppairs.len().max(zpairs.len());
    // A section with no root pair contributes a constant 1.
    let unit = RootPair(0.0, 0.0);
    (0..nsect)
        .map(|i| {
            let (b1, b2) = zpairs.get(i).copied().unwrap_or(unit).into();
            let (a1, a2) = ppairs.get(i).copied().unwrap_or(unit).into();
            Biquad {
                b0: 1.0,
                b1,
                b2,
                a1,
                a2,
            }
        })
        .collect()
}

/// Quadratic coefficients `(c1, c2)` of `z^2 + c1 z + c2` per root pair; a lone real root
/// yields `(c1, 0)`.
#[derive(Debug, Clone, Copy)]
struct RootPair(f64, f64);

impl From<RootPair> for (f64, f64) {
    fn from(p: RootPair) -> (f64, f64) {
        (p.0, p.1)
    }
}

fn pair_roots(roots: &[Complex64]) -> Vec<RootPair> {
    let mut complex: Vec<Complex64> = roots.iter().copied().filter(|r| r.im > 1e-10).collect();
    let mut real: Vec<f64> = roots
        .iter()
        .copied()
        .filter(|r| r.im.abs() <= 1e-10)
        .map(|r| r.re)
        .collect();
    complex.sort_by(|a, b| a.re.partial_cmp(&b.re).unwrap_or(std::cmp::Ordering::Equal));
    real.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut out = Vec::new();
    for r in complex {
        // The conjugate partner contributes the quadratic z^2 - 2 Re(r) z + |r|^2.
        out.push(RootPair(-2.0 * r.re, r.norm_sqr()));
    }
    let mut i = 0;
    while i + 1 < real.len() {
        out.push(RootPair(-(real[i] + real[i + 1]), real[i] * real[i + 1]));
        i += 2;
    }
    if i < real.len() {
        out.push(RootPair(-real[i], 0.0));
    }
    out
}
