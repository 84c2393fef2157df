//! The taper method.
//!
//! The cosine taper shapes `width` percent of each end of the waveform, clamped to
//! `[minpts, maxpts]` points when those are positive. The symmetric window types shape the
//! whole waveform.
use crate::timeseries::TimeSeries;
use crate::{FfdbError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaperType {
    Hann,
    Hamming,
    Parzen,
    Welch,
    Blackman,
    Cosine,
}

impl TaperType {
    pub fn name(self) -> &'static str {
        match self {
            TaperType::Hann => "hanning",
            TaperType::Hamming => "hamming",
            TaperType::Parzen => "parzen",
            TaperType::Welch => "welch",
            TaperType::Blackman => "blackman",
            TaperType::Cosine => "cosine",
        }
    }

    pub fn from_name(name: &str) -> Result<TaperType> {
        let t = match name {
            "hanning" | "hann" => TaperType::Hann,
            "hamming" => TaperType::Hamming,
            "parzen" => TaperType::Parzen,
            "welch" => TaperType::Welch,
            "blackman" => TaperType::Blackman,
            "cosine" => TaperType::Cosine,
            _ => {
                return Err(FfdbError::BadObject {
                    reason: format!("unknown taper type '{}'", name),
                })
            }
        };
        Ok(t)
    }
}

#[derive(Debug, Clone)]
pub struct Taper {
    pub taper_type: TaperType,
    /// Percent of the waveform length shaped at each end (cosine only).
    pub width: i32,
    pub minpts: i32,
    pub maxpts: i32,
}

impl Taper {
    pub fn new(taper_type: TaperType, width: i32, minpts: i32, maxpts: i32) -> Taper {
        Taper {
            taper_type,
            width,
            minpts,
            maxpts,
        }
    }

    pub(crate) fn from_args(args: &[&str]) -> Result<Taper> {
        if args.len() < 4 {
            return Err(FfdbError::BadObject {
                reason: "taper needs <type> <width> <min> <max>".to_string(),
            });
        }
        let bad = || FfdbError::BadObject {
            reason: format!("cannot parse taper '{}'", args.join(" ")),
        };
        Ok(Taper {
            taper_type: TaperType::from_name(args[0])?,
            width: args[1].parse().map_err(|_| bad())?,
            minpts: args[2].parse().map_err(|_| bad())?,
            maxpts: args[3].parse().map_err(|_| bad())?,
        })
    }

    pub fn to_text(&self) -> String {
        format!(
            "taper {} {} {} {}",
            self.taper_type.name(),
            self.width,
            self.minpts,
            self.maxpts
        )
    }

    pub fn apply_to(&self, ts: &mut TimeSeries) -> Result<()> {
        for seg in ts.segments_mut() {
            let n = seg.len();
            if n < 2 {
                continue;
            }
            let data = seg.data_mut();
            match self.taper_type {
                TaperType::Cosine => {
                    let mut pts = (n as i64 * self.width as i64 / 100) as usize;
                    if self.minpts > 0 {
                        pts = pts.max(self.minpts as usize);
                    }
                    if self.maxpts > 0 {
                        pts = pts.min(self.maxpts as usize);
                    }
                    cosine_ends(data, pts.min(n / 2));
                }
                t => full_window(data, t),
            }
        }
        Ok(())
    }
}

/// Cosine-shape `pts` points at each end of the data.
fn cosine_ends(data: &mut [f32], pts: usize) {
    if pts == 0 {
        return;
    }
    let n = data.len();
    let denom = pts as f64;
    for i in 0..pts {
        let w = 0.5 * (1.0 - (std::f64::consts::PI * i as f64 / denom).cos());
        data[i] *= w as f32;
        data[n - 1 - i] *= w as f32;
    }
}

/// Shape the whole data span with a symmetric window.
fn full_window(data: &mut [f32], t: TaperType) {
    let n = data.len();
    let nm1 = (n - 1) as f64;
    for (i, v) in data.iter_mut().enumerate() {
        let x = i as f64 / nm1;
        let w = match t {
            TaperType::Hann => 0.5 - 0.5 * (2.0 * std::f64::consts::PI * x).cos(),
            TaperType::Hamming => 0.54 - 0.46 * (2.0 * std::f64::consts::PI * x).cos(),
            TaperType::Welch => {
                let u = 2.0 * x - 1.0;
                1.0 - u * u
            }
            TaperType::Parzen => {
                let u = (2.0 * x - 1.0).abs();
                if u <= 0.5 {
                    1.0 - 6.0 * u * u * (1.0 - u)
                } else {
                    2.0 * (1.0 - u).powi(3)
                }
            }
            TaperType::Blackman => {
                let c = 2.0 * std::f64::consts::PI * x;
                0.42 - 0.5 * c.cos() + 0.08 * (2.0 * c).cos()
            }
            TaperType::Cosine => 1.0,
        };
        *v *= w as f32;
    }
}
