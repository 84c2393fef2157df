//! Waveform resolution: from a `wfdisc` row to bytes, samples and time series.
//!
//! A `wfdisc` row addresses `{seg_root}/{dir}/{dfile}` at byte `foff` with `nsamp`
//! samples of `datatype`. Plain files are memory-mapped; a `.gz` suffix transparently
//! switches to gzip streaming. Decoding hands fixed-width types exactly
//! `nsamp × bytes_per_sample` bytes and the compressed types everything to end of file.
//! Calibration is recorded on the built segment and applied only by the `ApplyCalib`
//! method.
use flate2::read::GzDecoder;
use memmap2::Mmap;
use std::io::Read;
use std::path::PathBuf;

use ffdb_core::errors::FfdbError;
use ffdb_core::record::CssRecord;
use ffdb_core::{quark, Quark, Result};
use ffdb_wave::methods::replay_recorded;
use ffdb_wave::{decode, Segment, TimeSeries, WfDatatype};

use crate::FFDatabase;

/// The byte range and decode parameters a `wfdisc` row resolves to.
#[derive(Debug)]
pub struct ResolvedWaveform {
    pub bytes: Vec<u8>,
    pub datatype: WfDatatype,
    pub nsamp: usize,
    pub samprate: f64,
    pub time: f64,
    pub calib: f64,
    pub calper: f64,
    pub clipped: bool,
}

impl ResolvedWaveform {
    pub fn decode_f32(&self) -> Result<Vec<f32>> {
        decode::decode(&self.bytes, self.datatype, self.nsamp)
    }

    pub fn decode_i32(&self) -> Result<Vec<i32>> {
        decode::decode(&self.bytes, self.datatype, self.nsamp)
    }

    /// Per-block min/max pairs for envelope rendering.
    pub fn envelope(&self, requested: usize) -> Result<Vec<(f32, f32)>> {
        decode::decode_envelope(&self.bytes, self.datatype, self.nsamp, requested)
    }
}

impl FFDatabase {
    /// Resolve a `wfdisc` row to its byte range.
    pub fn resolve_wfdisc(&self, wf: &CssRecord) -> Result<ResolvedWaveform> {
        let nsamp = wf.long_member("nsamp").unwrap_or(-1);
        let samprate = wf.double_member("samprate").unwrap_or(-1.0);
        if nsamp <= 0 || samprate <= 0.0 {
            return Err(FfdbError::BadObject {
                reason: format!(
                    "wfdisc wfid {} has no sample geometry",
                    wf.long_member("wfid").unwrap_or(-1)
                ),
            });
        }
        let nsamp = nsamp as usize;
        let datatype = WfDatatype::from_tag(wf.str_member("datatype").unwrap_or("-"))?;
        let foff = wf.long_member("foff").unwrap_or(0).max(0) as usize;
        let path = self.wf_path(wf);
        let want = datatype.bytes_per_sample().map(|bps| nsamp * bps);
        let bytes = read_range(&path, foff, want)?;
        Ok(ResolvedWaveform {
            bytes,
            datatype,
            nsamp,
            samprate,
            time: wf.double_member("time").unwrap_or(0.0),
            calib: wf.double_member("calib").unwrap_or(0.0),
            calper: wf.double_member("calper").unwrap_or(-1.0),
            clipped: wf.str_member("clip") == Some("c"),
        })
    }

    /// Decode one `wfdisc` row into a segment; calibration is attached, not applied.
    pub fn read_segment(&self, wf: &CssRecord) -> Result<Segment> {
        let resolved = self.resolve_wfdisc(wf)?;
        let data = resolved.decode_f32()?;
        Segment::new(
            data,
            resolved.time,
            1.0 / resolved.samprate,
            resolved.calib,
            resolved.calper,
        )
    }

    /// Envelope pairs for reduced-width rendering of one `wfdisc` row.
    pub fn read_envelope(&self, wf: &CssRecord, requested: usize) -> Result<Vec<(f32, f32)>> {
        self.resolve_wfdisc(wf)?.envelope(requested)
    }

    /// Assemble gap-aware time series from `wfdisc` rows, one series per station/channel
    /// pair, restricted to `[tmin, tmax]` when those are not the null time. Rows that
    /// pass the join tolerance merge into single segments.
    pub fn read_timeseries(
        &self,
        wfdiscs: &[CssRecord],
        tmin: f64,
        tmax: f64,
    ) -> Result<Vec<TimeSeries>> {
        let mut sorted: Vec<&CssRecord> = wfdiscs.iter().collect();
        sorted.sort_by(|a, b| {
            let ka = (a.str_member("sta"), a.str_member("chan"));
            let kb = (b.str_member("sta"), b.str_member("chan"));
            ka.cmp(&kb).then(
                a.double_member("time")
                    .partial_cmp(&b.double_member("time"))
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
        });

        let mut out: Vec<TimeSeries> = Vec::new();
        let mut current: Option<(Quark, Quark, TimeSeries)> = None;
        for wf in sorted {
            let sta = quark(wf.str_member("sta").unwrap_or("-"));
            let chan = quark(wf.str_member("chan").unwrap_or("-"));
            let fresh = match &current {
                Some((s, c, _)) => *s != sta || *c != chan,
                None => true,
            };
            if fresh {
                if let Some((_, _, ts)) = current.take() {
                    if !ts.is_empty() {
                        out.push(ts);
                    }
                }
                let net = quark(self.network_of(ffdb_core::quark_str(sta)).unwrap_or("-"));
                let mut ts = TimeSeries::new(sta, chan, net);
                ts.set_wfdisc(wf.clone());
                current = Some((sta, chan, ts));
            }
            let mut seg = self.read_segment(wf)?;
            clip_segment(&mut seg, tmin, tmax);
            if let Some((_, _, ts)) = current.as_mut() {
                if !seg.is_empty() {
                    ts.add_segment(seg);
                }
            }
        }
        if let Some((_, _, ts)) = current.take() {
            if !ts.is_empty() {
                out.push(ts);
            }
        }
        Ok(out)
    }

    /// Re-materialize a series from its attached `wfdisc` provenance over its current
    /// span, then replay the recorded method stack. The result equals the pre-close
    /// state within each method's declared tolerance.
    pub fn reread_timeseries(&self, ts: &mut TimeSeries) -> Result<()> {
        let wf = ts.wfdisc().cloned().ok_or(FfdbError::BadObject {
            reason: "time series has no wfdisc provenance".to_string(),
        })?;
        let (t1, t2) = (ts.tbeg(), ts.tend());
        let mut seg = self.read_segment(&wf)?;
        if !ts.is_empty() {
            let half = seg.tdel() / 2.0;
            clip_segment(&mut seg, t1, t2 + half);
        }
        ts.remove_all_segments();
        ts.add_segment(seg);
        replay_recorded(ts)
    }

    fn wf_path(&self, wf: &CssRecord) -> PathBuf {
        let dir = wf.str_member("dir").unwrap_or(".");
        let dfile = wf.str_member("dfile").unwrap_or("-");
        let base = if dir.starts_with('/') {
            PathBuf::from(dir)
        } else {
            self.seg_root().join(dir)
        };
        base.join(dfile)
    }
}

fn clip_segment(seg: &mut Segment, tmin: f64, tmax: f64) {
    if tmin == ffdb_core::NULL_TIME && tmax == ffdb_core::NULL_TIME {
        return;
    }
    let lo = if tmin == ffdb_core::NULL_TIME {
        0
    } else {
        seg.index_at(tmin).unwrap_or(seg.len())
    };
    let mut hi = seg.len();
    if tmax != ffdb_core::NULL_TIME {
        while hi > lo && seg.time_of(hi - 1) > tmax {
            hi -= 1;
        }
    }
    seg.truncate(lo, hi);
}

/// Read `want` bytes at `offset`, or everything from `offset` when `want` is `None`.
/// Falls back to `{path}.gz` with streaming decompression when the plain file is absent.
fn read_range(path: &PathBuf, offset: usize, want: Option<usize>) -> Result<Vec<u8>> {
    if path.is_file() {
        let file = std::fs::File::open(path).map_err(|_| FfdbError::OpenReadErr {
            path: path.display().to_string(),
        })?;
        let map = unsafe { Mmap::map(&file) }.map_err(FfdbError::StdIoError)?;
        return slice_range(&map, offset, want, path);
    }
    let mut gz_path = path.as_os_str().to_owned();
    gz_path.push(".gz");
    let gz_path = PathBuf::from(gz_path);
    if gz_path.is_file() {
        let file = std::fs::File::open(&gz_path).map_err(|_| FfdbError::OpenReadErr {
            path: gz_path.display().to_string(),
        })?;
        let mut decoder = GzDecoder::new(file);
        let mut all = Vec::new();
        decoder
            .read_to_end(&mut all)
            .map_err(FfdbError::StdIoError)?;
        return slice_range(&all, offset, want, &gz_path);
    }
    Err(FfdbError::OpenReadErr {
        path: path.display().to_string(),
    })
}

fn slice_range(
    data: &[u8],
    offset: usize,
    want: Option<usize>,
    path: &std::path::Path,
) -> Result<Vec<u8>> {
    let end = match want {
        Some(w) => offset + w,
        None => data.len(),
    };
    if offset > data.len() || end > data.len() {
        return Err(FfdbError::BadObject {
            reason: format!(
                "{}: byte range {}..{} beyond end of file ({} bytes)",
                path.display(),
                offset,
                end,
                data.len()
            ),
        });
    }
    Ok(data[offset..end].to_vec())
}
