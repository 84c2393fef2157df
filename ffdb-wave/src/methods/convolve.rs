//! The convolve/deconvolve method.
//!
//! Responses are sampled impulse responses. Convolution multiplies in the frequency
//! domain; deconvolution divides with a water level and band-limits the result to
//! `[flo, fhi]` with cosine flanks, which keeps the division away from the response's
//! spectral nulls.
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::timeseries::TimeSeries;
use crate::{FfdbError, Result};

/// The water level as a fraction of the response's peak spectral amplitude.
const WATER_LEVEL: f64 = 1.0e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Convolve,
    Deconvolve,
}

impl Direction {
    pub fn name(self) -> &'static str {
        match self {
            Direction::Convolve => "convolve",
            Direction::Deconvolve => "deconvolve",
        }
    }
}

/// A sampled impulse response.
#[derive(Debug, Clone)]
pub struct Response {
    /// Impulse response samples at the data's sample interval.
    pub samples: Vec<f64>,
}

impl Response {
    pub fn new(samples: Vec<f64>) -> Response {
        Response { samples }
    }
}

#[derive(Debug, Clone)]
pub struct Convolve {
    pub direction: Direction,
    pub responses: Vec<Response>,
    pub flo: f64,
    pub fhi: f64,
    pub instype: String,
}

impl Convolve {
    pub fn new(
        direction: Direction,
        responses: Vec<Response>,
        instype: &str,
        flo: f64,
        fhi: f64,
    ) -> Convolve {
        Convolve {
            direction,
            responses,
            flo,
            fhi,
            instype: instype.to_string(),
        }
    }

    pub(crate) fn from_args(args: &[&str]) -> Result<Convolve> {
        if args.len() < 4 {
            return Err(FfdbError::BadObject {
                reason: "convolve needs <direction> <instype> <flo> <fhi>".to_string(),
            });
        }
        let bad = || FfdbError::BadObject {
            reason: format!("cannot parse convolve '{}'", args.join(" ")),
        };
        let direction = match args[0] {
            "convolve" => Direction::Convolve,
            "deconvolve" => Direction::Deconvolve,
            _ => return Err(bad()),
        };
        // The responses travel with the instrument tables, not the text form.
        Ok(Convolve {
            direction,
            responses: Vec::new(),
            instype: args[1].to_string(),
            flo: args[2].parse().map_err(|_| bad())?,
            fhi: args[3].parse().map_err(|_| bad())?,
        })
    }

    pub fn to_text(&self) -> String {
        format!(
            "convolve {} {} {} {}",
            self.direction.name(),
            self.instype,
            self.flo,
            self.fhi
        )
    }

    pub fn apply_to(&mut self, ts: &mut TimeSeries) -> Result<()> {
        if self.responses.is_empty() {
            return Ok(());
        }
        let tdel: Vec<f64> = ts.segments().iter().map(|s| s.tdel()).collect();
        for (seg, tdel) in ts.segments_mut().iter_mut().zip(tdel) {
            if seg.is_empty() {
                continue;
            }
            let mut data: Vec<f64> = seg.data().iter().map(|&v| v as f64).collect();
            for resp in &self.responses {
                data = self.apply_response(&data, &resp.samples, tdel)?;
            }
            for (v, d) in seg.data_mut().iter_mut().zip(data) {
                *v = d as f32;
            }
        }
        Ok(())
    }

    fn apply_response(&self, data: &[f64], response: &[f64], tdel: f64) -> Result<Vec<f64>> {
        let n = data.len();
        let nfft = (n + response.len()).next_power_of_two();
        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(nfft);
        let ifft = planner.plan_fft_inverse(nfft);

        let mut x: Vec<Complex<f64>> = data
            .iter()
            .map(|&v| Complex::new(v, 0.0))
            .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
            .take(nfft)
            .collect();
        let mut h: Vec<Complex<f64>> = response
            .iter()
            .map(|&v| Complex::new(v, 0.0))
            .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
            .take(nfft)
            .collect();
        fft.process(&mut x);
        fft.process(&mut h);

        match self.direction {
            Direction::Convolve => {
                for (xi, hi) in x.iter_mut().zip(h.iter()) {
                    *xi *= *hi;
                }
            }
            Direction::Deconvolve => {
                let peak = h.iter().map(|c| c.norm()).fold(0.0f64, f64::max);
                if peak == 0.0 {
                    return Err(FfdbError::BadObject {
                        reason: "deconvolution response is identically zero".to_string(),
                    });
                }
                let floor = peak * WATER_LEVEL;
                let df = 1.0 / (nfft as f64 * tdel);
                for (k, xi) in x.iter_mut().enumerate() {
                    let hk = h[k];
                    let denom = if hk.norm() >= floor {
                        hk
                    } else if hk.norm() > 0.0 {
                        hk / hk.norm() * floor
                    } else {
                        Complex::new(floor, 0.0)
                    };
                    // Frequency of bin k, mirrored above the Nyquist.
                    let f = if k <= nfft / 2 {
                        k as f64 * df
                    } else {
                        (nfft - k) as f64 * df
                    };
                    *xi = *xi / denom * band_weight(f, self.flo, self.fhi);
                }
            }
        }

        ifft.process(&mut x);
        let scale = 1.0 / nfft as f64;
        Ok(x[..n].iter().map(|c| c.re * scale).collect())
    }
}

/// A cosine-flanked band weight: unity inside `[flo, fhi]`, rolling to zero over half an
/// octave outside, zero beyond.
fn band_weight(f: f64, flo: f64, fhi: f64) -> f64 {
    if flo <= 0.0 && fhi <= 0.0 {
        return 1.0;
    }
    let lo_edge = flo * 0.5;
    let hi_edge = fhi * 1.5;
    if f >= flo && f <= fhi {
        1.0
    } else if f > lo_edge && f < flo {
        let x = (f - lo_edge) / (flo - lo_edge);
        0.5 * (1.0 - (std::f64::consts::PI * x).cos())
    } else if f > fhi && f < hi_edge {
        let x = (hi_edge - f) / (hi_edge - fhi);
        0.5 * (1.0 - (std::f64::consts::PI * x).cos())
    } else {
        0.0
    }
}
