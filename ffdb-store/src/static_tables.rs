//! The static/global table cache.
//!
//! Static tables (`site`, `sitechan`, `affiliation`, `instrument`, `lastid`, `staconf`,
//! `ampdescript`, `gregion`) live at one configured path each, independent of
//! partitioning, and are read once per process and shared until the file's mtime
//! advances. A missing optional table reads as empty, never as an error.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ffdb_core::errors::FfdbError;
use ffdb_core::record::CssRecord;
use ffdb_core::{quark_str, schema, Result};

use crate::table_file::FileCache;

/// The tables resolved through the static path map by default.
pub const STATIC_TABLES: &[&str] = &[
    "site",
    "sitechan",
    "affiliation",
    "instrument",
    "lastid",
    "staconf",
    "ampdescript",
    "gregion",
];

pub fn is_static_table(name: &str) -> bool {
    STATIC_TABLES.contains(&name)
}

/// The per-database static-table state: explicit paths and the mtime-guarded cache.
#[derive(Debug)]
pub struct StaticTables {
    root: PathBuf,
    paths: fnv::FnvHashMap<String, PathBuf>,
    cache: FileCache,
}

impl StaticTables {
    pub fn new(param_root: &Path) -> StaticTables {
        StaticTables {
            root: param_root.join("static"),
            paths: fnv::FnvHashMap::default(),
            cache: FileCache::new(),
        }
    }

    /// The same roots and explicit paths with a fresh cache, for a thread that wants its
    /// own file state.
    pub fn fork(&self) -> StaticTables {
        StaticTables {
            root: self.root.clone(),
            paths: self.paths.clone(),
            cache: FileCache::new(),
        }
    }

    /// Repoint a static table at an explicit path.
    pub fn set_path(&mut self, name: &str, path: &Path) {
        self.paths.insert(name.to_string(), path.to_path_buf());
        self.cache.invalidate(path);
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.paths
            .get(name)
            .cloned()
            .unwrap_or_else(|| self.root.join(name))
    }

    /// Read a static table through the cache. Missing files yield an empty vector.
    pub fn read(&mut self, name: &str) -> Result<Arc<Vec<CssRecord>>> {
        let schema = schema::lookup(name).ok_or(FfdbError::BadObject {
            reason: format!("unknown table {}", name),
        })?;
        let path = self.path_of(name);
        self.cache.read(&path, &schema)
    }

    /// The network a station is affiliated with, through the cached `affiliation` table.
    pub fn network_of(&mut self, sta: &str) -> Option<&'static str> {
        let rows = self.read("affiliation").ok()?;
        for row in rows.iter() {
            if row.str_member("sta") == Some(sta) {
                if let Some(ffdb_core::CssValue::Quark(q)) = row.value_by_name("net") {
                    return Some(quark_str(*q));
                }
            }
        }
        None
    }
}
