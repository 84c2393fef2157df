mod decode {
    use crate::datatype::WfDatatype;
    use crate::decode::{ca_compress, decode, decode_envelope, e1_compress};

    #[test]
    fn s3_sign_extension() {
        let bytes = [0x00, 0x00, 0x01, 0xFF, 0xFF, 0xFF, 0x7F, 0xFF, 0xFF];
        let out: Vec<i32> = decode(&bytes, WfDatatype::S3, 3).unwrap();
        assert_eq!(out, vec![1, -1, 8388607]);
    }

    #[test]
    fn s4_and_i4_differ_only_in_byte_order() {
        let v = 0x01020304i32;
        let be: Vec<i32> = decode(&v.to_be_bytes(), WfDatatype::S4, 1).unwrap();
        let le: Vec<i32> = decode(&v.to_le_bytes(), WfDatatype::I4, 1).unwrap();
        assert_eq!(be, le);
    }

    #[test]
    fn s2_widens() {
        let bytes = [0xFF, 0xFE, 0x00, 0x05];
        let out: Vec<i32> = decode(&bytes, WfDatatype::S2, 2).unwrap();
        assert_eq!(out, vec![-2, 5]);
    }

    #[test]
    fn t4_and_f4_floats() {
        let v = -12.5f32;
        let be: Vec<f32> = decode(&v.to_be_bytes(), WfDatatype::T4, 1).unwrap();
        let le: Vec<f32> = decode(&v.to_le_bytes(), WfDatatype::F4, 1).unwrap();
        assert_eq!(be, vec![-12.5]);
        assert_eq!(le, vec![-12.5]);
    }

    #[test]
    fn g2_gain_ranging_is_lossless_to_i32() {
        // Gain code 0: value is mantissa - 8191.
        let word: u16 = (8191u16 + 100) << 2;
        let out: Vec<i32> = decode(&word.to_be_bytes(), WfDatatype::G2, 1).unwrap();
        assert_eq!(out, vec![100]);
        // Gain code 3 multiplies by 128.
        let word: u16 = ((8191u16 + 10) << 2) | 3;
        let out: Vec<i32> = decode(&word.to_be_bytes(), WfDatatype::G2, 1).unwrap();
        assert_eq!(out, vec![1280]);
    }

    #[test]
    fn e1_round_trip() {
        let samples: Vec<i32> = vec![12000, 12004, 12010, 11900, 5, -70000, -69999, 0, 1, 1];
        let packed = e1_compress(&samples);
        let out: Vec<i32> = decode(&packed, WfDatatype::E1, samples.len()).unwrap();
        assert_eq!(out, samples);
    }

    #[test]
    fn e1_truncated_stream_is_an_error() {
        let samples: Vec<i32> = (0..100).collect();
        let packed = e1_compress(&samples);
        let r: crate::Result<Vec<i32>> = decode(&packed[..packed.len() - 1], WfDatatype::E1, 100);
        assert!(r.is_err());
    }

    #[test]
    fn ca_round_trip_with_runs() {
        let mut samples: Vec<i32> = vec![500];
        for _ in 0..50 {
            samples.push(samples.last().unwrap() + 2);
        }
        samples.extend_from_slice(&[100, -3, 17]);
        let packed = ca_compress(&samples);
        // Runs compress well: 50 equal differences fold into one token.
        assert!(packed.len() < samples.len() * 3);
        let out: Vec<i32> = decode(&packed, WfDatatype::Ca, samples.len()).unwrap();
        assert_eq!(out, samples);
    }

    #[test]
    fn output_length_always_equals_nsamp() {
        let bytes: Vec<u8> = (0i16..20).flat_map(|v| v.to_be_bytes()).collect();
        let out: Vec<i32> = decode(&bytes, WfDatatype::S2, 10).unwrap();
        assert_eq!(out.len(), 10);
        let r: crate::Result<Vec<i32>> = decode(&bytes[..10], WfDatatype::S2, 10);
        assert!(r.is_err());
    }

    #[test]
    fn envelope_blocks_and_remainder() {
        let bytes: Vec<u8> = (0i32..10).flat_map(|v| v.to_be_bytes()).collect();
        let pairs = decode_envelope(&bytes, WfDatatype::S4, 10, 3).unwrap();
        // Blocks of 10/3 = 3 samples: three full pairs plus the remainder pair.
        assert_eq!(pairs.len(), 4);
        assert_eq!(pairs[0], (0.0, 2.0));
        assert_eq!(pairs[2], (6.0, 8.0));
        assert_eq!(pairs[3], (9.0, 9.0));
    }
}

mod segment {
    use crate::segment::Segment;

    #[test]
    fn times_and_subsegment() {
        let s = Segment::new((0..100).map(|v| v as f32).collect(), 10.0, 0.5, 1.0, 1.0).unwrap();
        assert_eq!(s.tend(), 10.0 + 99.0 * 0.5);
        assert_eq!(s.time_of(4), 12.0);
        let sub = s.subsegment(10, 20);
        assert_eq!(sub.len(), 10);
        assert_eq!(sub.tbeg(), 15.0);
        assert_eq!(sub.data()[0], 10.0);
    }

    #[test]
    fn truncate_in_place() {
        let mut s = Segment::new((0..10).map(|v| v as f32).collect(), 0.0, 1.0, 1.0, 1.0).unwrap();
        s.truncate(2, 8);
        assert_eq!(s.len(), 6);
        assert_eq!(s.tbeg(), 2.0);
        assert_eq!(s.data(), &[2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn zero_tdel_is_rejected() {
        assert!(Segment::new(vec![0.0], 0.0, 0.0, 1.0, 1.0).is_err());
    }
}

mod timeseries {
    use crate::segment::Segment;
    use crate::timeseries::TimeSeries;
    use ffdb_core::quark;

    fn seg(t0: f64, n: usize, dt: f64, calib: f64) -> Segment {
        Segment::new(vec![1.0; n], t0, dt, calib, 1.0).unwrap()
    }

    fn ts() -> TimeSeries {
        TimeSeries::new(quark("STA12"), quark("BHZ"), quark("XX"))
    }

    #[test]
    fn contiguous_segments_join() {
        let mut t = ts();
        t.add_segment(seg(0.0, 100, 0.01, 1.0));
        t.add_segment(seg(1.0, 100, 0.01, 1.0));
        assert_eq!(t.num_segments(), 1);
        assert_eq!(t.npts(), 200);
    }

    #[test]
    fn gap_beyond_tolerance_stays_split() {
        let mut t = ts();
        t.add_segment(seg(0.0, 100, 0.01, 1.0));
        t.add_segment(seg(1.5, 100, 0.01, 1.0));
        assert_eq!(t.num_segments(), 2);
    }

    #[test]
    fn calib_change_beyond_tolerance_stays_split() {
        let mut t = ts();
        t.add_segment(seg(0.0, 100, 0.01, 1.0));
        t.add_segment(seg(1.0, 100, 0.01, 1.5));
        assert_eq!(t.num_segments(), 2);
    }

    #[test]
    fn segments_stay_ordered() {
        let mut t = ts();
        t.add_segment(seg(100.0, 10, 1.0, 1.0));
        t.add_segment(seg(0.0, 10, 1.0, 1.0));
        assert_eq!(t.segments()[0].tbeg(), 0.0);
        assert_eq!(t.tbeg(), 0.0);
        assert_eq!(t.tend(), 109.0);
    }

    #[test]
    fn segment_lookup_is_half_open() {
        let mut t = ts();
        t.add_segment(seg(0.0, 10, 1.0, 1.0));
        t.add_segment(seg(100.0, 10, 1.0, 1.0));
        assert_eq!(t.segment(5.0).unwrap().tbeg(), 0.0);
        assert!(t.segment(9.0).is_none()); // tend is exclusive
        assert_eq!(t.nearest_segment(50.0).unwrap().tbeg(), 0.0);
        assert_eq!(t.nearest_segment(80.0).unwrap().tbeg(), 100.0);
    }

    #[test]
    fn subseries_at_segment_end_is_empty() {
        let mut t = ts();
        t.add_segment(seg(0.0, 10, 1.0, 1.0));
        let sub = t.subseries(9.0, 20.0); // 9.0 == tend
        assert!(sub.is_empty());
    }

    #[test]
    fn subseries_snaps_inward() {
        let mut t = ts();
        let data: Vec<f32> = (0..10).map(|v| v as f32).collect();
        t.add_segment(Segment::new(data, 0.0, 1.0, 1.0, 1.0).unwrap());
        let sub = t.subseries(2.5, 7.5);
        assert_eq!(sub.npts(), 5); // samples at 3, 4, 5, 6, 7
        assert_eq!(sub.segments()[0].tbeg(), 3.0);
        assert_eq!(sub.segments()[0].data()[0], 3.0);
    }

    #[test]
    fn truncate_mutates() {
        let mut t = ts();
        t.add_segment(seg(0.0, 100, 1.0, 1.0));
        assert!(t.truncate(10.0, 20.0));
        assert_eq!(t.npts(), 10);
        assert_eq!(t.tbeg(), 10.0);
    }

    #[test]
    fn stats() {
        let mut t = ts();
        t.add_segment(Segment::new(vec![1.0, -3.0, 2.0], 0.0, 1.0, 1.0, 1.0).unwrap());
        assert_eq!(t.data_min(), -3.0);
        assert_eq!(t.data_max(), 2.0);
        assert_eq!(t.mean(), 0.0);
        assert_eq!(t.min_point().unwrap(), (1.0, -3.0));
    }

    #[test]
    fn fill_gaps_interpolates_small_ones() {
        let mut t = ts();
        t.add_segment(Segment::new(vec![0.0, 0.0], 0.0, 1.0, 1.0, 1.0).unwrap());
        // Two samples missing at t = 2, 3.
        t.add_segment_join(Segment::new(vec![3.0, 3.0], 4.0, 1.0, 1.0, 1.0).unwrap(), false);
        t.fill_all_gaps(5);
        assert_eq!(t.num_segments(), 1);
        assert_eq!(t.npts(), 6);
        assert_eq!(t.segments()[0].data()[2], 1.0);
        assert_eq!(t.segments()[0].data()[3], 2.0);
    }

    #[test]
    fn decimate_keeps_every_nth() {
        let mut t = ts();
        let data: Vec<f32> = (0..10).map(|v| v as f32).collect();
        t.add_segment(Segment::new(data, 0.0, 1.0, 1.0, 1.0).unwrap());
        let d = t.decimate(3);
        assert_eq!(d.npts(), 4);
        assert_eq!(d.segments()[0].data(), &[0.0, 3.0, 6.0, 9.0]);
        assert_eq!(d.segments()[0].tdel(), 3.0);
    }
}

mod methods {
    use crate::methods::{
        apply_and_record, replay_recorded, Convolve, Direction, Iir, IirType, Method,
        MethodStack, QcData, QcDef, Response, Rotate, Taper, TaperType,
    };
    use crate::segment::Segment;
    use crate::timeseries::TimeSeries;
    use ffdb_core::quark;

    fn series_with(data: Vec<f32>, tdel: f64) -> TimeSeries {
        let mut ts = TimeSeries::new(quark("STA12"), quark("BHZ"), quark("XX"));
        ts.add_segment(Segment::new(data, 0.0, tdel, 2.0, 1.0).unwrap());
        ts
    }

    #[test]
    fn text_forms_round_trip() {
        let texts = [
            "copy 100.00000 200.00000",
            "cut 100.00000 200.00000",
            "taper cosine 5 5 200",
            "iir 4 BP 1 5 1",
            "avg 100.00000 200.00000",
            "offset 3.5",
            "ampfactor 2 nominal gain",
            "calib",
            "rotate 30 STA12 BHN 1",
            "convolve deconvolve STS2 0.5 8",
            "qc 0 1 5 10 5 2 500 100 8 0 0.95 10 0",
        ];
        for t in &texts {
            let m = Method::from_text(t).unwrap();
            assert_eq!(&m.to_text(), t, "text form changed for {}", t);
        }
    }

    #[test]
    fn stack_text_round_trip() {
        let mut stack = MethodStack::new();
        stack.push(Method::Offset { value: 1.0 });
        stack.push(Method::Iir(Iir::new(4, IirType::BP, 1.0, 5.0, true)));
        let text = stack.to_text();
        let back = MethodStack::from_text(&text).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back.to_text(), text);
    }

    #[test]
    fn rotation_commutativity_flags() {
        let rot = Method::from_text("rotate 30 STA12 BHN 1").unwrap();
        assert!(!rot.rotation_commutative());
        assert!(Method::ApplyCalib.rotation_commutative());
        assert!(Method::from_text("iir 4 BP 1 5 1")
            .unwrap()
            .rotation_commutative());
        assert!(!Method::Offset { value: 1.0 }.rotation_commutative());
    }

    #[test]
    fn offset_ampfactor_calib_and_avg() {
        let mut ts = series_with(vec![1.0, 2.0, 3.0], 1.0);
        apply_and_record(&mut ts, Method::Offset { value: 1.0 }).unwrap();
        assert_eq!(ts.segments()[0].data(), &[2.0, 3.0, 4.0]);
        apply_and_record(
            &mut ts,
            Method::AmpFactor {
                factor: 2.0,
                comment: String::new(),
            },
        )
        .unwrap();
        assert_eq!(ts.segments()[0].data(), &[4.0, 6.0, 8.0]);
        // The segment carries calib = 2.
        apply_and_record(&mut ts, Method::ApplyCalib).unwrap();
        assert_eq!(ts.segments()[0].data(), &[8.0, 12.0, 16.0]);
        apply_and_record(
            &mut ts,
            Method::RemoveAvg {
                t1: ffdb_core::NULL_TIME,
                t2: ffdb_core::NULL_TIME,
            },
        )
        .unwrap();
        assert_eq!(ts.segments()[0].data(), &[-4.0, 0.0, 4.0]);
        assert_eq!(ts.methods.len(), 4);
    }

    #[test]
    fn cosine_taper_shapes_the_ends() {
        let mut ts = series_with(vec![1.0; 100], 1.0);
        Taper::new(TaperType::Cosine, 10, 0, 0)
            .apply_to(&mut ts)
            .unwrap();
        let d = ts.segments()[0].data();
        assert_eq!(d[0], 0.0);
        assert_eq!(d[99], 0.0);
        assert!(d[50] == 1.0);
        assert!(d[5] > 0.0 && d[5] < 1.0);
    }

    #[test]
    fn hann_taper_zeroes_both_ends() {
        let mut ts = series_with(vec![1.0; 64], 1.0);
        Taper::new(TaperType::Hann, 0, 0, 0).apply_to(&mut ts).unwrap();
        let d = ts.segments()[0].data();
        assert!(d[0].abs() < 1e-6);
        assert!(d[63].abs() < 1e-6);
        assert!(d[32] > 0.9);
    }

    #[test]
    fn lowpass_passes_dc() {
        let mut iir = Iir::new(2, IirType::LP, 0.0, 5.0, false);
        let mut data = vec![1.0f32; 2000];
        iir.filter_data(&mut data, 0.01).unwrap();
        assert!((data[1999] - 1.0).abs() < 0.01, "got {}", data[1999]);
    }

    #[test]
    fn bandpass_rejects_dc() {
        let mut iir = Iir::new(4, IirType::BP, 1.0, 5.0, false);
        let mut data = vec![1.0f32; 4000];
        iir.filter_data(&mut data, 0.01).unwrap();
        assert!(data[3999].abs() < 0.01, "got {}", data[3999]);
    }

    #[test]
    fn highpass_rejects_dc_passes_fast_alternation() {
        let mut iir = Iir::new(2, IirType::HP, 1.0, 0.0, false);
        let mut dc = vec![1.0f32; 4000];
        iir.filter_data(&mut dc, 0.01).unwrap();
        assert!(dc[3999].abs() < 0.01);
        // The Nyquist-rate alternation passes at unit gain.
        let mut alt: Vec<f32> = (0..4000).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        iir.filter_data(&mut alt, 0.01).unwrap();
        assert!(alt[3999].abs() > 0.9, "got {}", alt[3999]);
    }

    #[test]
    fn iir_replay_is_bit_identical() {
        let data: Vec<f32> = (0..6000)
            .map(|i| {
                let t = i as f64 * 0.01;
                ((2.0 * std::f64::consts::PI * 3.0 * t).sin()
                    + 0.3 * (2.0 * std::f64::consts::PI * 11.0 * t).sin()) as f32
            })
            .collect();
        let mut a = series_with(data.clone(), 0.01);
        let mut b = series_with(data, 0.01);
        apply_and_record(&mut a, Method::Iir(Iir::new(4, IirType::BP, 1.0, 5.0, true))).unwrap();
        apply_and_record(&mut b, Method::Iir(Iir::new(4, IirType::BP, 1.0, 5.0, true))).unwrap();
        assert_eq!(a.segments()[0].data(), b.segments()[0].data());
    }

    #[test]
    fn replay_recorded_reproduces_state() {
        let data: Vec<f32> = (0..1000).map(|i| (i % 17) as f32 - 8.0).collect();
        let mut ts = series_with(data.clone(), 0.01);
        apply_and_record(&mut ts, Method::Offset { value: 2.0 }).unwrap();
        apply_and_record(&mut ts, Method::Iir(Iir::new(2, IirType::LP, 0.0, 10.0, true))).unwrap();
        let processed: Vec<f32> = ts.segments()[0].data().to_vec();

        // Pretend a re-read restored the raw samples, then replay the stack.
        let fresh = Segment::new(data, 0.0, 0.01, 2.0, 1.0).unwrap();
        ts.remove_all_segments();
        ts.add_segment(fresh);
        replay_recorded(&mut ts).unwrap();
        let replayed = ts.segments()[0].data();
        let rms = (processed.iter().map(|v| (*v as f64).powi(2)).sum::<f64>()
            / processed.len() as f64)
            .sqrt();
        let max_diff = processed
            .iter()
            .zip(replayed)
            .map(|(x, y)| (x - y).abs() as f64)
            .fold(0.0f64, f64::max);
        assert!(max_diff <= 1e-6 * rms.max(1.0), "max diff {}", max_diff);
    }

    #[test]
    fn convolve_with_unit_impulse_is_identity() {
        let data: Vec<f32> = (0..64).map(|i| (i as f32 * 0.3).sin()).collect();
        let mut ts = series_with(data.clone(), 0.05);
        let mut c = Convolve::new(
            Direction::Convolve,
            vec![Response::new(vec![1.0])],
            "STS2",
            0.0,
            0.0,
        );
        c.apply_to(&mut ts).unwrap();
        for (a, b) in ts.segments()[0].data().iter().zip(&data) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn deconvolve_with_unit_impulse_is_identity() {
        let data: Vec<f32> = (0..64).map(|i| (i as f32 * 0.3).cos()).collect();
        let mut ts = series_with(data.clone(), 0.05);
        let mut c = Convolve::new(
            Direction::Deconvolve,
            vec![Response::new(vec![1.0])],
            "STS2",
            0.0,
            0.0,
        );
        c.apply_to(&mut ts).unwrap();
        for (a, b) in ts.segments()[0].data().iter().zip(&data) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn convolution_without_responses_is_a_recorded_no_op() {
        let data: Vec<f32> = vec![1.0, 2.0, 3.0];
        let mut ts = series_with(data.clone(), 1.0);
        let m = Method::from_text("convolve deconvolve STS2 0.5 8").unwrap();
        apply_and_record(&mut ts, m).unwrap();
        assert_eq!(ts.segments()[0].data(), data.as_slice());
        assert_eq!(ts.methods.len(), 1);
    }

    #[test]
    fn rotate_round_trips_through_inverse_angle() {
        let x: Vec<f32> = (0..50).map(|i| (i as f32).sin()).collect();
        let y: Vec<f32> = (0..50).map(|i| (i as f32).cos()).collect();
        let mate = TimeSeries::from_segment(
            quark("STA12"),
            quark("BHE"),
            quark("XX"),
            Segment::new(x.clone(), 0.0, 1.0, 1.0, 1.0).unwrap(),
        );
        let mut ts = series_with(y.clone(), 1.0);
        let mut rot = Rotate::new(30.0, mate, true);
        rot.apply_to(&mut ts).unwrap();
        let mut back = Rotate {
            angle: -30.0,
            mate: rot.mate.take(),
            mate_is_x: true,
        };
        back.apply_to(&mut ts).unwrap();
        let xr = back.mate.as_ref().unwrap().segments()[0].data();
        for (a, b) in ts.segments()[0].data().iter().zip(&y) {
            assert!((a - b).abs() < 1e-5);
        }
        for (a, b) in xr.iter().zip(&x) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn qc_masks_flat_run_and_fixes_it() {
        let mut data: Vec<f32> = (0..100).map(|i| ((i * 7) % 23) as f32 - 11.0).collect();
        for v in data.iter_mut().skip(40).take(10) {
            *v = 99.0;
        }
        let def = QcDef {
            drop_thr: 5,
            single_trace_spike_thr: 0.0,
            fix: true,
            ..QcDef::default()
        };
        let mut qc = QcData::new(false, def);
        let mut ts = series_with(data, 1.0);
        qc.apply_to(&mut ts).unwrap();
        assert_eq!(qc.masks.len(), 1);
        assert_eq!(qc.masks[0].segs, vec![(40, 50)]);
        // The flat run was replaced by interpolated values.
        let d = ts.segments()[0].data();
        assert!(d[45] != 99.0);
    }

    #[test]
    fn qc_finds_single_point_spike() {
        let mut data = vec![0.0f32; 100];
        data[30] = 1000.0;
        let def = QcDef {
            drop_thr: 0,
            single_trace_spike_thr: 50.0,
            fix: false,
            ..QcDef::default()
        };
        let mut qc = QcData::new(false, def);
        let mut ts = series_with(data, 1.0);
        qc.apply_to(&mut ts).unwrap();
        assert!(qc.masks[0].intersects(30, 31));
        // Not fixed: the spike survives.
        assert_eq!(ts.segments()[0].data()[30], 1000.0);
    }
}
