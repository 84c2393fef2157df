use std::io::Write;

use ffdb_core::record::{CssRecord, CssValue};

use super::open_test_db;
use crate::ids;

#[test]
fn id_batching_touches_disk_once_per_block() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_test_db(dir.path());
    ids::set_request_id_increment("tbatch", 1000).unwrap();

    let lastid_path = db.get_static_table("lastid");
    assert_eq!(db.get_next_id("lastid", "tbatch").unwrap(), 1);
    let mtime_after_first = std::fs::metadata(&lastid_path).unwrap().modified().unwrap();
    let rows = db.read_static_table("lastid").unwrap();
    let row = rows
        .iter()
        .find(|r| r.str_member("keyname") == Some("tbatch"))
        .unwrap();
    assert_eq!(row.long_member("keyvalue"), Some(1000));

    // The next 999 ids come from memory.
    for expect in 2..=1000 {
        assert_eq!(db.get_next_id("lastid", "tbatch").unwrap(), expect);
    }
    let mtime_after_batch = std::fs::metadata(&lastid_path).unwrap().modified().unwrap();
    assert_eq!(mtime_after_first, mtime_after_batch);

    // Id 1001 forces the next block onto disk.
    assert_eq!(db.get_next_id("lastid", "tbatch").unwrap(), 1001);
    let rows = db.read_static_table("lastid").unwrap();
    let row = rows
        .iter()
        .find(|r| r.str_member("keyname") == Some("tbatch"))
        .unwrap();
    assert_eq!(row.long_member("keyvalue"), Some(2000));
}

#[test]
fn request_ids_returns_distinct_consecutive_blocks() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_test_db(dir.path());
    let a = db.request_ids("lastid", "tconsec", 10, true).unwrap();
    assert_eq!(a.len(), 10);
    for w in a.windows(2) {
        assert_eq!(w[1], w[0] + 1);
    }
    let b = db.request_ids("lastid", "tconsec", 10, true).unwrap();
    assert!(a.iter().all(|id| !b.contains(id)));
}

#[test]
fn recycled_ids_are_preferred() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_test_db(dir.path());
    let first = db.request_ids("lastid", "trecycle", 3, false).unwrap();
    ids::recycle_ids("trecycle", &first);
    let available = db.number_ids_available("trecycle");
    assert!(available >= 3);
    let again = db.request_ids("lastid", "trecycle", 3, false).unwrap();
    for id in &again {
        assert!(first.contains(id));
    }
}

#[test]
fn concurrent_requests_get_disjoint_ids() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_test_db(dir.path());
    let mut sets: Vec<Vec<i64>> = Vec::new();
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| db.request_ids("lastid", "tconc", 50, false).unwrap()))
            .collect();
        for h in handles {
            sets.push(h.join().unwrap());
        }
    });
    let mut all: Vec<i64> = sets.into_iter().flatten().collect();
    let n = all.len();
    all.sort_unstable();
    all.dedup();
    assert_eq!(all.len(), n);
    assert_eq!(n, 200);
}

#[test]
fn bad_increment_is_rejected() {
    let err = ids::set_request_id_increment("tbad", 0).unwrap_err();
    assert_eq!(err.errno(), 25);
}

#[test]
fn static_table_reloads_when_the_file_changes() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_test_db(dir.path());
    let site_path = dir.path().join("site.txt");

    let mut site = CssRecord::new("site").unwrap();
    site.set_by_name("sta", CssValue::Quark(ffdb_core::quark("STA12")))
        .unwrap();
    site.set_double_member("lat", 42.5).unwrap();
    std::fs::write(&site_path, site.to_line()).unwrap();

    db.set_static_table("site", site_path.to_str().unwrap()).unwrap();
    let rows = db.read_static_table("site").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].double_member("lat"), Some(42.5));

    // Overwrite with two rows and a newer mtime; the next read sees the new contents
    // without any reopen of the database.
    std::thread::sleep(std::time::Duration::from_millis(20));
    let mut site2 = CssRecord::new("site").unwrap();
    site2
        .set_by_name("sta", CssValue::Quark(ffdb_core::quark("STB")))
        .unwrap();
    let mut f = std::fs::File::create(&site_path).unwrap();
    f.write_all(site.to_line().as_bytes()).unwrap();
    f.write_all(site2.to_line().as_bytes()).unwrap();
    drop(f);

    let rows = db.read_static_table("site").unwrap();
    assert_eq!(rows.len(), 2);
}

#[test]
fn missing_static_table_reads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_test_db(dir.path());
    let rows = db.read_static_table("affiliation").unwrap();
    assert!(rows.is_empty());
}

#[test]
fn network_lookup_through_affiliation() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_test_db(dir.path());
    let mut aff = CssRecord::new("affiliation").unwrap();
    aff.set_by_name("net", CssValue::Quark(ffdb_core::quark("IM")))
        .unwrap();
    aff.set_by_name("sta", CssValue::Quark(ffdb_core::quark("STA12")))
        .unwrap();
    let path = dir.path().join("affiliation");
    std::fs::write(&path, aff.to_line()).unwrap();
    db.set_static_table("affiliation", path.to_str().unwrap()).unwrap();

    assert_eq!(db.network_of("STA12"), Some("IM"));
    assert_eq!(db.network_of("NOPE"), None);
}

#[test]
fn skipped_bad_lines_do_not_stop_a_read() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_test_db(dir.path());
    let path = dir.path().join("site.mixed");

    let mut good = CssRecord::new("site").unwrap();
    good.set_by_name("sta", CssValue::Quark(ffdb_core::quark("GOOD")))
        .unwrap();
    let mut content = String::new();
    content.push_str(&good.to_line());
    content.push_str("this line is garbage\n");
    content.push_str(&good.to_line());
    std::fs::write(&path, content).unwrap();

    db.set_static_table("site", path.to_str().unwrap()).unwrap();
    let rows = db.read_static_table("site").unwrap();
    assert_eq!(rows.len(), 2);
}
