//! On-disk tests over a temporary database.
mod ids_and_static;
mod query_stream;
mod store_roundtrip;
mod waveform;

use std::path::Path;

use crate::FFDatabase;

/// A database over two fresh roots inside a tempdir.
pub(crate) fn open_test_db(dir: &Path) -> FFDatabase {
    let param = dir.join("param");
    let seg = dir.join("seg");
    std::fs::create_dir_all(&param).unwrap();
    std::fs::create_dir_all(&seg).unwrap();
    FFDatabase::open(
        param.to_str().unwrap(),
        seg.to_str().unwrap(),
        "%A/%Y/%j",
        86400.0,
    )
    .unwrap()
}
