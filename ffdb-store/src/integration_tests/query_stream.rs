use std::io::Write;

use ffdb_core::record::{CssRecord, CssValue};
use ffdb_core::quark;

use super::open_test_db;

const DAY1: f64 = 1609459200.0; // 2021-01-01T00:00:00Z

/// Write `n` arrivals straight into one partition file, in time order.
fn seed_arrivals(param: &std::path::Path, n: usize) {
    let dir = param.join("kim/2021/001");
    std::fs::create_dir_all(&dir).unwrap();
    let mut file = std::fs::File::create(dir.join("kim.arrival")).unwrap();
    let mut out = String::new();
    for i in 0..n {
        let mut a = CssRecord::new("arrival").unwrap();
        a.set_by_name("arid", CssValue::Long(i as i64 + 1)).unwrap();
        a.set_double_member("time", DAY1 + i as f64).unwrap();
        a.set_by_name("sta", CssValue::Quark(quark("STA12"))).unwrap();
        out.push_str(&a.to_line());
    }
    file.write_all(out.as_bytes()).unwrap();
}

#[test]
fn streaming_returns_every_row_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = open_test_db(dir.path());
    db.create_author("kim").unwrap();
    seed_arrivals(&dir.path().join("param"), 10_000);
    db.rescan_authors();
    db.set_max_mem_records(100);

    let query = format!(
        "select a.arid, a.time from arrival a where a.time >= {} and a.time < {}",
        DAY1,
        DAY1 + 86400.0
    );
    let mut handle = db.query_table_init(&query, "a").unwrap();
    let mut all = Vec::new();
    for _ in 0..200 {
        let got = handle.results(50, &mut all).unwrap();
        assert_eq!(got, 50);
    }
    assert_eq!(all.len(), 10_000);
    for (i, rec) in all.iter().enumerate() {
        assert_eq!(rec.long_member("arid"), Some(i as i64 + 1));
    }
    // Nothing left; the producer is done.
    let mut rest = Vec::new();
    assert_eq!(handle.results(50, &mut rest).unwrap(), 0);
    handle.close().unwrap();
}

#[test]
fn streaming_matches_the_synchronous_query() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = open_test_db(dir.path());
    db.create_author("kim").unwrap();
    seed_arrivals(&dir.path().join("param"), 500);
    db.rescan_authors();

    let query = format!(
        "select a.arid from arrival a where a.time >= {} and a.time < {}",
        DAY1 + 100.0,
        DAY1 + 400.0
    );
    let sync_rows = db.query_table(&query, "a").unwrap();

    let mut handle = db.query_table_init(&query, "a").unwrap();
    let mut streamed = Vec::new();
    loop {
        if handle.results(64, &mut streamed).unwrap() == 0 {
            break;
        }
    }
    handle.close().unwrap();

    let a: Vec<i64> = sync_rows.iter().map(|r| r.long_member("arid").unwrap()).collect();
    let b: Vec<i64> = streamed.iter().map(|r| r.long_member("arid").unwrap()).collect();
    assert_eq!(a, b);
}

#[test]
fn close_mid_stream_cancels_the_producer() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = open_test_db(dir.path());
    db.create_author("kim").unwrap();
    seed_arrivals(&dir.path().join("param"), 5_000);
    db.rescan_authors();
    db.set_max_mem_records(10);

    let mut handle = db
        .query_table_init("select * from arrival a", "a")
        .unwrap();
    let mut some = Vec::new();
    assert_eq!(handle.results(20, &mut some).unwrap(), 20);
    // The producer is blocked on the 10-slot queue; close must still return.
    handle.close().unwrap();
    // Idempotent.
    handle.close().unwrap();
}

#[test]
fn init_rejects_bad_queries_without_a_thread() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_test_db(dir.path());
    let err = db
        .query_table_init("select * from nosuchtable x", "x")
        .unwrap_err();
    assert_eq!(err.errno(), 13);
}

#[test]
fn empty_result_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = open_test_db(dir.path());
    db.create_author("kim").unwrap();
    db.rescan_authors();
    let rows = db
        .query_table("select * from arrival a where a.arid = 42", "a")
        .unwrap();
    assert!(rows.is_empty());
    let mut handle = db
        .query_table_init("select * from arrival a", "a")
        .unwrap();
    let mut out = Vec::new();
    assert_eq!(handle.results(10, &mut out).unwrap(), 0);
    handle.close().unwrap();
}
