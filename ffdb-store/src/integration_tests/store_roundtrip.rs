use ffdb_core::record::{CssRecord, CssValue};
use ffdb_core::{quark, FfdbError};

use super::open_test_db;
use crate::FFDatabase;

fn arrival(arid: i64, time: f64, sta: &str) -> CssRecord {
    let mut a = CssRecord::new("arrival").unwrap();
    a.set_by_name("arid", CssValue::Long(arid)).unwrap();
    a.set_double_member("time", time).unwrap();
    a.set_by_name("sta", CssValue::Quark(quark(sta))).unwrap();
    a.set_by_name("iphase", CssValue::Str("P".into())).unwrap();
    a
}

const DAY1: f64 = 1609459200.0; // 2021-01-01T00:00:00Z

#[test]
fn open_requires_both_roots() {
    let dir = tempfile::tempdir().unwrap();
    let param = dir.path().join("param");
    std::fs::create_dir_all(&param).unwrap();
    let missing = dir.path().join("nothere");
    let err = FFDatabase::open(
        param.to_str().unwrap(),
        missing.to_str().unwrap(),
        "%A/%Y/%j",
        86400.0,
    )
    .unwrap_err();
    assert_eq!(err.errno(), 2);
    let err = FFDatabase::open(
        missing.to_str().unwrap(),
        param.to_str().unwrap(),
        "%A/%Y/%j",
        86400.0,
    )
    .unwrap_err();
    assert_eq!(err.errno(), 1);
}

#[test]
fn insert_lands_in_the_time_partition() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = open_test_db(dir.path());
    db.create_author("kim").unwrap();

    let mut rec = arrival(1, DAY1 + 10.0, "STA12");
    db.insert_table(&mut rec, "kim").unwrap();
    let expected = dir.path().join("param/kim/2021/001/kim.arrival");
    assert!(expected.is_file());
    // lddate was stamped on insert.
    assert!(rec.value_by_name("lddate").unwrap() != &CssValue::LoadDate(None));

    // A record one second before midnight lands in the earlier day.
    let mut rec = arrival(2, DAY1 - 1.0, "STA12");
    db.insert_table(&mut rec, "kim").unwrap();
    assert!(dir.path().join("param/kim/2020/366/kim.arrival").is_file());
}

#[test]
fn insert_to_unknown_or_readonly_author_fails_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = open_test_db(dir.path());
    let mut rec = arrival(1, DAY1, "STA12");
    let err = db.insert_table(&mut rec, "ghost").unwrap_err();
    assert_eq!(err.errno(), 9);

    db.create_author("kim").unwrap();
    db.set_author_writable("kim", false).unwrap();
    let err = db.insert_table(&mut rec, "kim").unwrap_err();
    assert_eq!(err.errno(), 12);
    assert!(!dir.path().join("param/kim/2021/001/kim.arrival").exists());
}

#[test]
fn query_round_trips_inserted_rows() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = open_test_db(dir.path());
    db.create_author("kim").unwrap();
    for i in 0..20 {
        let mut rec = arrival(i, DAY1 + i as f64, if i % 2 == 0 { "STA12" } else { "STB" });
        db.insert_table(&mut rec, "kim").unwrap();
    }
    db.rescan_authors();

    let rows = db
        .query_table("select * from arrival a where a.sta = STA12", "a")
        .unwrap();
    assert_eq!(rows.len(), 10);
    assert!(rows.iter().all(|r| r.str_member("sta") == Some("STA12")));
    assert!(rows.iter().all(|r| r.loaded()));

    let rows = db
        .query_table(
            &format!(
                "select a.arid, a.time from arrival a where a.time >= {} and a.time < {}",
                DAY1 + 5.0,
                DAY1 + 8.0
            ),
            "a",
        )
        .unwrap();
    let arids: Vec<i64> = rows.iter().map(|r| r.long_member("arid").unwrap()).collect();
    assert_eq!(arids, vec![5, 6, 7]);
}

#[test]
fn query_supports_like_in_and_arithmetic() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = open_test_db(dir.path());
    db.create_author("kim").unwrap();
    for (i, sta) in ["STA12", "STB", "KURK"].iter().enumerate() {
        let mut rec = arrival(i as i64, DAY1 + i as f64, sta);
        db.insert_table(&mut rec, "kim").unwrap();
    }
    db.rescan_authors();

    let rows = db
        .query_table("select * from arrival a where a.sta like ST%", "a")
        .unwrap();
    assert_eq!(rows.len(), 2);

    let rows = db
        .query_table("select * from arrival a where a.sta in (STA12, KURK)", "a")
        .unwrap();
    assert_eq!(rows.len(), 2);

    let rows = db
        .query_table(
            &format!("select * from arrival a where a.time <= {} + 1", DAY1),
            "a",
        )
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[test]
fn join_finds_matching_rows() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = open_test_db(dir.path());
    db.create_author("kim").unwrap();
    for i in 0..5 {
        let mut rec = arrival(i, DAY1 + i as f64, "STA12");
        db.insert_table(&mut rec, "kim").unwrap();
    }
    for (arid, orid) in &[(1i64, 900i64), (3, 900), (4, 901)] {
        let mut assoc = CssRecord::new("assoc").unwrap();
        assoc.set_by_name("arid", CssValue::Long(*arid)).unwrap();
        assoc.set_by_name("orid", CssValue::Long(*orid)).unwrap();
        db.write_table(&mut assoc, "kim", DAY1).unwrap();
    }
    db.rescan_authors();

    let rows = db
        .query_table(
            "select a.arid from arrival a, assoc s where a.arid = s.arid and s.orid = 900",
            "a",
        )
        .unwrap();
    let mut arids: Vec<i64> = rows.iter().map(|r| r.long_member("arid").unwrap()).collect();
    arids.sort_unstable();
    assert_eq!(arids, vec![1, 3]);
}

#[test]
fn distinct_collapses_join_multiplicity() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = open_test_db(dir.path());
    db.create_author("kim").unwrap();
    let mut rec = arrival(7, DAY1, "STA12");
    db.insert_table(&mut rec, "kim").unwrap();
    // Two assocs point at the same arrival.
    for orid in &[900i64, 901] {
        let mut assoc = CssRecord::new("assoc").unwrap();
        assoc.set_by_name("arid", CssValue::Long(7)).unwrap();
        assoc.set_by_name("orid", CssValue::Long(*orid)).unwrap();
        db.write_table(&mut assoc, "kim", DAY1).unwrap();
    }
    db.rescan_authors();

    let rows = db
        .query_table(
            "select a.arid from arrival a, assoc s where a.arid = s.arid",
            "a",
        )
        .unwrap();
    assert_eq!(rows.len(), 2);
    let rows = db
        .query_table(
            "select distinct a.arid from arrival a, assoc s where a.arid = s.arid",
            "a",
        )
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[test]
fn malformed_query_fails_before_touching_files() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_test_db(dir.path());
    for q in &[
        "selekt * from arrival a",
        "select * from nosuchtable a",
        "select * from arrival a where a.nocolumn = 1",
        "select * from arrival a where a.time %% 3",
    ] {
        let err = db.query_table(q, "a").unwrap_err();
        assert_eq!(err.errno(), 13, "query {:?}", q);
    }
}

#[test]
fn update_rewrites_in_place_and_delete_never_tears() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = open_test_db(dir.path());
    db.create_author("kim").unwrap();
    for i in 0..3 {
        let mut rec = arrival(i, DAY1 + i as f64, "STA12");
        db.insert_table(&mut rec, "kim").unwrap();
    }
    db.rescan_authors();

    let rows = db.query_table("select * from arrival a", "a").unwrap();
    assert_eq!(rows.len(), 3);
    let old = rows[1].clone();
    let mut new = old.clone();
    new.set_by_name("iphase", CssValue::Str("S".into())).unwrap();
    db.update_table(&old, &mut new).unwrap();

    let rows = db.query_table("select * from arrival a", "a").unwrap();
    assert_eq!(rows.len(), 3);
    let hit = CssRecord::find(&rows, "arid", 1).unwrap();
    assert_eq!(hit.str_member("iphase"), Some("S"));

    db.delete_table(hit).unwrap();
    let rows = db.query_table("select * from arrival a", "a").unwrap();
    assert_eq!(rows.len(), 2);
    assert!(CssRecord::find(&rows, "arid", 1).is_none());
    // Every remaining line still decodes, so the file was never torn.
    assert!(rows.iter().all(|r| r.loaded()));
}

#[test]
fn update_where_changes_selected_members() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = open_test_db(dir.path());
    db.create_author("kim").unwrap();
    let mut rec = arrival(5, DAY1, "STA12");
    db.insert_table(&mut rec, "kim").unwrap();
    db.rescan_authors();

    let schema = rec.schema().clone();
    let arid_i = schema.member_index("arid").unwrap();
    let iphase_i = schema.member_index("iphase").unwrap();
    let mut new = arrival(5, DAY1, "STA12");
    new.set_by_name("iphase", CssValue::Str("Pn".into())).unwrap();
    let n = db
        .update_table_where("arrival", &[iphase_i], &[arid_i], &rec, &new)
        .unwrap();
    assert_eq!(n, 1);
    let rows = db.query_table("select * from arrival a", "a").unwrap();
    assert_eq!(rows[0].str_member("iphase"), Some("Pn"));
}

#[test]
fn delete_without_provenance_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_test_db(dir.path());
    let rec = arrival(1, DAY1, "STA12");
    let err = db.delete_table(&rec).unwrap_err();
    assert_eq!(err.errno(), 16);
}

#[test]
fn prefix_layout_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let prefix = dir.path().join("local");
    let db = FFDatabase::open_prefix(prefix.to_str().unwrap()).unwrap();
    let mut rec = arrival(11, DAY1, "STA12");
    db.insert_prefix_table(&mut rec).unwrap();
    assert!(dir.path().join("local.arrival").is_file());
    let rows = db
        .query_prefix("select * from arrival a where a.arid = 11", "a")
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[test]
fn author_spans_and_time_limits() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = open_test_db(dir.path());
    db.create_author("kim").unwrap();
    let mut rec = arrival(1, DAY1, "STA12");
    db.insert_table(&mut rec, "kim").unwrap();
    let mut rec = arrival(2, DAY1 + 3.0 * 86400.0, "STA12");
    db.insert_table(&mut rec, "kim").unwrap();
    db.rescan_authors();

    let kim = db.author("kim").unwrap();
    assert_eq!(kim.tmin, DAY1);
    assert_eq!(kim.tmax, DAY1 + 4.0 * 86400.0);
    assert_eq!(db.time_limits(), Some((DAY1, DAY1 + 4.0 * 86400.0)));
}
