use std::io::Write;

use ffdb_core::record::{CssRecord, CssValue};
use ffdb_core::quark;
use ffdb_wave::methods::{apply_and_record, Iir, IirType, Method};
use ffdb_wave::{decode, WfDatatype};

use super::open_test_db;
use crate::FFDatabase;

const T0: f64 = 1609459200.0; // 2021-01-01T00:00:00Z

/// Write samples as big-endian s4 into `{seg}/{dir}/{dfile}` and return the wfdisc row.
fn write_s4(
    db: &FFDatabase,
    samples: &[i32],
    dir: &str,
    dfile: &str,
    time: f64,
    samprate: f64,
    foff: usize,
) -> CssRecord {
    let path = db.seg_root().join(dir).join(dfile);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .open(&path)
        .unwrap();
    let bytes: Vec<u8> = samples.iter().flat_map(|v| v.to_be_bytes()).collect();
    file.write_all(&vec![0u8; foff]).unwrap();
    file.write_all(&bytes).unwrap();
    wfdisc_row(samples.len(), dir, dfile, time, samprate, foff, "s4")
}

fn wfdisc_row(
    nsamp: usize,
    dir: &str,
    dfile: &str,
    time: f64,
    samprate: f64,
    foff: usize,
    datatype: &str,
) -> CssRecord {
    let mut wf = CssRecord::new("wfdisc").unwrap();
    wf.set_by_name("sta", CssValue::Quark(quark("STA12"))).unwrap();
    wf.set_by_name("chan", CssValue::Quark(quark("BHZ"))).unwrap();
    wf.set_double_member("time", time).unwrap();
    wf.set_by_name("wfid", CssValue::Long(1)).unwrap();
    wf.set_by_name("nsamp", CssValue::Long(nsamp as i64)).unwrap();
    wf.set_double_member("samprate", samprate).unwrap();
    wf.set_double_member("endtime", time + (nsamp as f64 - 1.0) / samprate)
        .unwrap();
    wf.set_double_member("calib", 0.25).unwrap();
    wf.set_double_member("calper", 1.0).unwrap();
    wf.set_by_name("datatype", CssValue::Quark(quark(datatype))).unwrap();
    wf.set_by_name("dir", CssValue::Str(dir.into())).unwrap();
    wf.set_by_name("dfile", CssValue::Str(dfile.into())).unwrap();
    wf.set_by_name("foff", CssValue::Long(foff as i64)).unwrap();
    wf
}

#[test]
fn resolve_reads_the_declared_byte_range() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_test_db(dir.path());
    let samples: Vec<i32> = (0..100).collect();
    let wf = write_s4(&db, &samples, "2021/001", "STA12.w", T0, 100.0, 16);

    let resolved = db.resolve_wfdisc(&wf).unwrap();
    assert_eq!(resolved.nsamp, 100);
    assert_eq!(resolved.datatype, WfDatatype::S4);
    assert_eq!(resolved.calib, 0.25);
    assert_eq!(resolved.decode_i32().unwrap(), samples);
}

#[test]
fn gzip_suffix_is_transparent() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_test_db(dir.path());
    let samples: Vec<i32> = (0..50).map(|v| v * 3 - 60).collect();
    let bytes: Vec<u8> = samples.iter().flat_map(|v| v.to_be_bytes()).collect();

    let wdir = db.seg_root().join("2021/001");
    std::fs::create_dir_all(&wdir).unwrap();
    let gz = std::fs::File::create(wdir.join("STA12.w.gz")).unwrap();
    let mut enc = flate2::write::GzEncoder::new(gz, flate2::Compression::default());
    enc.write_all(&bytes).unwrap();
    enc.finish().unwrap();

    let wf = wfdisc_row(samples.len(), "2021/001", "STA12.w", T0, 40.0, 0, "s4");
    let resolved = db.resolve_wfdisc(&wf).unwrap();
    assert_eq!(resolved.decode_i32().unwrap(), samples);
}

#[test]
fn read_timeseries_joins_contiguous_wfdiscs_and_keeps_gaps() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_test_db(dir.path());
    // Two contiguous rows, then one across a two-second gap.
    let a = write_s4(&db, &vec![1; 100], "2021/001", "a.w", T0, 100.0, 0);
    let b = write_s4(&db, &vec![2; 100], "2021/001", "b.w", T0 + 1.0, 100.0, 0);
    let c = write_s4(&db, &vec![3; 100], "2021/001", "c.w", T0 + 4.0, 100.0, 0);

    let ts = db
        .read_timeseries(
            &[a, b, c],
            ffdb_core::NULL_TIME,
            ffdb_core::NULL_TIME,
        )
        .unwrap();
    assert_eq!(ts.len(), 1);
    let ts = &ts[0];
    assert_eq!(ffdb_core::quark_str(ts.sta), "STA12");
    assert_eq!(ts.num_segments(), 2);
    assert_eq!(ts.npts(), 300);
    assert_eq!(ts.segments()[0].len(), 200);
    assert_eq!(ts.segments()[1].tbeg(), T0 + 4.0);
    // Calibration is attached to the segments, never applied by the reader.
    assert_eq!(ts.segments()[0].data()[0], 1.0);
    assert_eq!(ts.segments()[0].calib(), 0.25);
}

#[test]
fn read_timeseries_window_clips_samples() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_test_db(dir.path());
    let samples: Vec<i32> = (0..100).collect();
    let wf = write_s4(&db, &samples, "2021/001", "STA12.w", T0, 1.0, 0);
    let ts = db.read_timeseries(&[wf], T0 + 10.0, T0 + 19.0).unwrap();
    assert_eq!(ts[0].npts(), 10);
    assert_eq!(ts[0].segments()[0].data()[0], 10.0);
}

#[test]
fn envelope_decimation_through_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_test_db(dir.path());
    let samples: Vec<i32> = (0..1000).map(|i| if i == 500 { 5000 } else { i }).collect();
    let wf = write_s4(&db, &samples, "2021/001", "STA12.w", T0, 100.0, 0);
    let pairs = db.read_envelope(&wf, 100).unwrap();
    assert_eq!(pairs.len(), 100);
    // The spike survives decimation in its block's max.
    assert!(pairs.iter().any(|&(_, hi)| hi == 5000.0));
}

#[test]
fn e1_waveform_through_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_test_db(dir.path());
    let samples: Vec<i32> = (0..500).map(|i| (i * i % 977) - 488).collect();
    let packed = decode::e1_compress(&samples);
    let wdir = db.seg_root().join("2021/001");
    std::fs::create_dir_all(&wdir).unwrap();
    std::fs::write(wdir.join("STA12.w"), &packed).unwrap();

    let wf = wfdisc_row(samples.len(), "2021/001", "STA12.w", T0, 20.0, 0, "e1");
    let resolved = db.resolve_wfdisc(&wf).unwrap();
    assert_eq!(resolved.decode_i32().unwrap(), samples);
}

#[test]
fn reread_replays_the_method_stack() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_test_db(dir.path());
    // A 60 s window at 40 sps with two tones.
    let n = 2400;
    let samples: Vec<i32> = (0..n)
        .map(|i| {
            let t = i as f64 / 40.0;
            ((2.0 * std::f64::consts::PI * 2.0 * t).sin() * 1000.0
                + (2.0 * std::f64::consts::PI * 15.0 * t).sin() * 300.0) as i32
        })
        .collect();
    let wf = write_s4(&db, &samples, "2021/001", "STA12.w", T0, 40.0, 0);

    let mut ts = db
        .read_timeseries(&[wf], ffdb_core::NULL_TIME, ffdb_core::NULL_TIME)
        .unwrap()
        .remove(0);
    apply_and_record(&mut ts, Method::ApplyCalib).unwrap();
    apply_and_record(&mut ts, Method::Iir(Iir::new(4, IirType::BP, 1.0, 5.0, true))).unwrap();
    let processed: Vec<f32> = ts.segments()[0].data().to_vec();

    db.reread_timeseries(&mut ts).unwrap();
    let replayed = ts.segments()[0].data();
    assert_eq!(replayed.len(), processed.len());
    let rms = (processed.iter().map(|v| (*v as f64).powi(2)).sum::<f64>()
        / processed.len() as f64)
        .sqrt();
    let max_diff = processed
        .iter()
        .zip(replayed)
        .map(|(a, b)| (a - b).abs() as f64)
        .fold(0.0f64, f64::max);
    assert!(max_diff <= 1e-6 * rms, "max diff {} rms {}", max_diff, rms);
}

#[test]
fn wfdisc_insert_goes_per_station_under_seg_root() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = open_test_db(dir.path());
    db.create_author("kim").unwrap();
    let mut wf = wfdisc_row(100, "2021/001", "STA12.w", T0, 100.0, 0, "s4");
    db.insert_table(&mut wf, "kim").unwrap();
    assert!(dir
        .path()
        .join("seg/STA12/2021/001/STA12.wfdisc")
        .is_file());

    let rows = db
        .query_table("select * from wfdisc w where w.sta = STA12", "w")
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].long_member("nsamp"), Some(100));
    // The wfdisc invariant survives the round trip.
    let time = rows[0].double_member("time").unwrap();
    let endtime = rows[0].double_member("endtime").unwrap();
    let nsamp = rows[0].long_member("nsamp").unwrap() as f64;
    let samprate = rows[0].double_member("samprate").unwrap();
    assert!((endtime - (time + (nsamp - 1.0) / samprate)).abs() < 1e-3);
}

#[test]
fn missing_waveform_file_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_test_db(dir.path());
    let wf = wfdisc_row(10, "2021/001", "ghost.w", T0, 1.0, 0, "s4");
    let err = db.resolve_wfdisc(&wf).unwrap_err();
    assert_eq!(err.errno(), 7);
}
