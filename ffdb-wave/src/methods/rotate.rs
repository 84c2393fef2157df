//! The two-component rotation method.
//!
//! A rotation pairs the series it is applied to with its orthogonal mate; the mate is
//! carried on the method so the rotation can be replayed. `mate_is_x` tells which of the
//! two is the x-component (usually East).
use ffdb_core::quark;

use crate::timeseries::TimeSeries;
use crate::{FfdbError, Result};

#[derive(Debug, Clone)]
pub struct Rotate {
    /// Rotation angle in degrees.
    pub angle: f64,
    /// The other component of the rotation; absent until resolved.
    pub mate: Option<Box<TimeSeries>>,
    pub mate_is_x: bool,
}

impl Rotate {
    pub fn new(angle: f64, mate: TimeSeries, mate_is_x: bool) -> Rotate {
        Rotate {
            angle,
            mate: Some(Box::new(mate)),
            mate_is_x,
        }
    }

    pub(crate) fn from_args(args: &[&str]) -> Result<Rotate> {
        if args.len() < 4 {
            return Err(FfdbError::BadObject {
                reason: "rotate needs <angle> <mate_sta> <mate_chan> <mate_is_x>".to_string(),
            });
        }
        let angle = args[0].parse().map_err(|_| FfdbError::BadObject {
            reason: format!("cannot parse rotate angle '{}'", args[0]),
        })?;
        // The mate series itself is re-resolved by the reader; only its identity persists.
        let mut mate = TimeSeries::new(quark(args[1]), quark(args[2]), quark(""));
        mate.tdel_tolerance = crate::timeseries::DEFAULT_TDEL_TOLERANCE;
        Ok(Rotate {
            angle,
            mate: Some(Box::new(mate)),
            mate_is_x: matches!(args[3], "1" | "true" | "y"),
        })
    }

    pub fn to_text(&self) -> String {
        let (sta, chan) = match &self.mate {
            Some(m) => (m.sta, m.chan),
            None => (quark("-"), quark("-")),
        };
        format!(
            "rotate {} {} {} {}",
            self.angle, sta, chan, self.mate_is_x as u8
        )
    }

    /// Rotate `ts` against the mate, sample by sample over their common span. Both series
    /// are updated; the mate carried by the method receives the rotated other component.
    pub fn apply_to(&mut self, ts: &mut TimeSeries) -> Result<()> {
        let mate = match self.mate.as_mut() {
            Some(m) if !m.is_empty() => m,
            // A mate that was never materialized leaves the data untouched; the method
            // still records the intent for a later replay with the mate present.
            _ => return Ok(()),
        };
        let theta = self.angle.to_radians();
        let (sin, cos) = (theta.sin(), theta.cos());
        for (seg, mseg) in ts
            .segments_mut()
            .iter_mut()
            .zip(mate.segments_mut().iter_mut())
        {
            let n = seg.len().min(mseg.len());
            let a = seg.data_mut();
            let b = mseg.data_mut();
            for i in 0..n {
                let (x, y) = if self.mate_is_x {
                    (b[i] as f64, a[i] as f64)
                } else {
                    (a[i] as f64, b[i] as f64)
                };
                let xr = x * cos + y * sin;
                let yr = -x * sin + y * cos;
                if self.mate_is_x {
                    b[i] = xr as f32;
                    a[i] = yr as f32;
                } else {
                    a[i] = xr as f32;
                    b[i] = yr as f32;
                }
            }
        }
        Ok(())
    }
}

/// Rotate two bare component arrays by `angle` degrees.
pub fn rotate_data(x: &mut [f32], y: &mut [f32], angle: f64) {
    let theta = angle.to_radians();
    let (sin, cos) = (theta.sin(), theta.cos());
    for i in 0..x.len().min(y.len()) {
        let (xi, yi) = (x[i] as f64, y[i] as f64);
        x[i] = (xi * cos + yi * sin) as f32;
        y[i] = (-xi * sin + yi * cos) as f32;
    }
}
