//! The CSS 3.0 flat-file database.
//!
//! A database is rooted at two directory trees: the parameter root holds per-author,
//! time-partitioned record files and the static tables, and the segment root holds the
//! waveform `.w` blobs with their owning per-station `wfdisc` files. Record files are
//! fixed-width ASCII, one record per line; queries run a restricted SELECT grammar over
//! them, with partition pruning by time window and a producer-thread streaming mode for
//! large result sets.
//!
//! The library is single-threaded cooperative in the foreground: inserts, updates, static
//! reads and waveform decodes run on the calling thread, and each active streaming query
//! owns one background producer.
extern crate chrono;
extern crate crossbeam_channel;
extern crate ffdb_core;
extern crate ffdb_wave;
extern crate flate2;
extern crate fnv;
extern crate fs2;
extern crate log;
extern crate memmap2;
extern crate once_cell;
#[cfg(test)]
extern crate tempfile;

pub mod ids;
#[cfg(test)]
mod integration_tests;
pub mod partition;
pub mod query;
pub mod static_tables;
pub mod table_file;
pub mod waveio;
mod write;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ffdb_core::errors::FfdbError;
use ffdb_core::record::CssRecord;
use ffdb_core::{schema, Result};

pub use query::{QueryHandle, DEFAULT_MAX_MEM_RECORDS};

/// One record author (account) under the parameter root.
#[derive(Debug, Clone)]
pub struct Author {
    pub name: String,
    /// Earliest partition start, or the null time when no partitions exist.
    pub tmin: f64,
    /// Latest partition end, or the null time when no partitions exist.
    pub tmax: f64,
    pub writable: bool,
}

/// A flat-file database handle.
#[derive(Debug)]
pub struct FFDatabase {
    param_root: PathBuf,
    seg_root: PathBuf,
    /// In prefix mode every table lives at `{prefix}.{name}` and nothing is partitioned.
    prefix: Option<PathBuf>,
    structure: String,
    duration: f64,
    authors: Vec<Author>,
    default_author: Option<String>,
    max_mem_records: usize,
    read_globals: bool,
    verbose: u32,
    pub(crate) statics: Mutex<static_tables::StaticTables>,
    pub(crate) id_state: Mutex<fnv::FnvHashMap<String, ids::IdBatch>>,
}

impl FFDatabase {
    /// Open a database under a parameter root and a segment root with the given
    /// directory structure and partition duration in seconds.
    pub fn open(
        param_root: &str,
        seg_root: &str,
        directory_structure: &str,
        directory_duration: f64,
    ) -> Result<FFDatabase> {
        let param = PathBuf::from(param_root);
        if !param.is_dir() {
            return Err(FfdbError::NoParamRoot {
                path: param_root.to_string(),
            });
        }
        let seg = PathBuf::from(seg_root);
        if !seg.is_dir() {
            return Err(FfdbError::NoSegRoot {
                path: seg_root.to_string(),
            });
        }
        partition::validate(directory_structure)?;
        let statics = static_tables::StaticTables::new(&param);
        let mut db = FFDatabase {
            param_root: param,
            seg_root: seg,
            prefix: None,
            structure: directory_structure.to_string(),
            duration: if directory_duration > 0.0 {
                directory_duration
            } else {
                partition::DEFAULT_DURATION
            },
            authors: Vec::new(),
            default_author: None,
            max_mem_records: DEFAULT_MAX_MEM_RECORDS,
            read_globals: true,
            verbose: 0,
            statics: Mutex::new(statics),
            id_state: Mutex::new(fnv::FnvHashMap::default()),
        };
        db.rescan_authors();
        Ok(db)
    }

    /// Open a self-contained prefix database: every table at `{prefix}.{name}`, no
    /// partitioning, one implicit author.
    pub fn open_prefix(prefix: &str) -> Result<FFDatabase> {
        let p = PathBuf::from(prefix);
        let parent = p.parent().map(Path::to_path_buf).unwrap_or_default();
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            return Err(FfdbError::NoParamRoot {
                path: parent.display().to_string(),
            });
        }
        let statics = static_tables::StaticTables::new(&parent);
        let name = p
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "local".to_string());
        Ok(FFDatabase {
            param_root: parent.clone(),
            seg_root: parent,
            prefix: Some(p),
            structure: String::new(),
            duration: partition::DEFAULT_DURATION,
            authors: vec![Author {
                name,
                tmin: ffdb_core::NULL_TIME,
                tmax: ffdb_core::NULL_TIME,
                writable: true,
            }],
            default_author: None,
            max_mem_records: DEFAULT_MAX_MEM_RECORDS,
            read_globals: true,
            verbose: 0,
            statics: Mutex::new(statics),
            id_state: Mutex::new(fnv::FnvHashMap::default()),
        })
    }

    pub fn param_root(&self) -> &Path {
        &self.param_root
    }

    pub fn seg_root(&self) -> &Path {
        &self.seg_root
    }

    pub fn prefix(&self) -> Option<&Path> {
        self.prefix.as_deref()
    }

    pub fn directory_structure(&self) -> &str {
        &self.structure
    }

    pub fn directory_duration(&self) -> f64 {
        self.duration
    }

    pub fn set_directory_duration(&mut self, duration: f64) {
        if duration > 0.0 {
            self.duration = duration;
        }
    }

    /// Cap on records buffered by a streaming query's producer.
    pub fn max_mem_records(&self) -> usize {
        self.max_mem_records
    }

    pub fn set_max_mem_records(&mut self, max_records: usize) {
        self.max_mem_records = max_records.max(1);
    }

    pub fn set_read_global_tables(&mut self, read_globals: bool) {
        self.read_globals = read_globals;
    }

    pub fn read_global_tables(&self) -> bool {
        self.read_globals
    }

    pub fn verbose(&self) -> u32 {
        self.verbose
    }

    pub fn set_verbose(&mut self, level: u32) {
        self.verbose = level;
    }

    /// Re-scan the author directories and their partition time spans.
    pub fn rescan_authors(&mut self) {
        let mut authors = Vec::new();
        let entries = match std::fs::read_dir(&self.param_root) {
            Ok(e) => e,
            Err(_) => {
                self.authors = authors;
                return;
            }
        };
        for entry in entries.flatten() {
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if name == "static" || name.starts_with('.') {
                continue;
            }
            let (tmin, tmax) = self.author_span(&entry.path());
            let writable = !entry
                .metadata()
                .map(|m| m.permissions().readonly())
                .unwrap_or(false);
            authors.push(Author {
                name,
                tmin,
                tmax,
                writable,
            });
        }
        authors.sort_by(|a, b| a.name.cmp(&b.name));
        let keep_default = self
            .default_author
            .as_ref()
            .map(|d| authors.iter().any(|a| &a.name == d))
            .unwrap_or(false);
        if !keep_default {
            self.default_author = None;
        }
        self.authors = authors;
    }

    fn author_span(&self, author_dir: &Path) -> (f64, f64) {
        let parts = partition::partitions_in_window(
            &self.structure,
            author_dir,
            f64::NEG_INFINITY,
            f64::INFINITY,
        );
        let mut tmin = f64::INFINITY;
        let mut tmax = f64::NEG_INFINITY;
        for p in &parts {
            if let Some((lo, hi)) = partition::dir_to_range(&self.structure, p) {
                tmin = tmin.min(lo);
                tmax = tmax.max(hi);
            }
        }
        if tmin.is_finite() {
            (tmin, tmax)
        } else {
            (ffdb_core::NULL_TIME, ffdb_core::NULL_TIME)
        }
    }

    pub fn authors(&self) -> &[Author] {
        &self.authors
    }

    pub fn author(&self, name: &str) -> Option<&Author> {
        self.authors.iter().find(|a| a.name == name)
    }

    pub fn default_author(&self) -> Option<&str> {
        self.default_author.as_deref()
    }

    pub fn set_default_author(&mut self, name: &str) -> Result<()> {
        if self.author(name).is_none() {
            return Err(FfdbError::AuthorErr {
                author: name.to_string(),
            });
        }
        self.default_author = Some(name.to_string());
        Ok(())
    }

    pub fn set_author_writable(&mut self, name: &str, writable: bool) -> Result<()> {
        match self.authors.iter_mut().find(|a| a.name == name) {
            Some(a) => {
                a.writable = writable;
                Ok(())
            }
            None => Err(FfdbError::AuthorErr {
                author: name.to_string(),
            }),
        }
    }

    /// Create a new author directory and register it writable.
    pub fn create_author(&mut self, name: &str) -> Result<()> {
        let dir = self.param_root.join(name);
        std::fs::create_dir_all(&dir).map_err(|_| FfdbError::CreateDirErr {
            path: dir.display().to_string(),
        })?;
        if self.author(name).is_none() {
            self.authors.push(Author {
                name: name.to_string(),
                tmin: ffdb_core::NULL_TIME,
                tmax: ffdb_core::NULL_TIME,
                writable: true,
            });
            self.authors.sort_by(|a, b| a.name.cmp(&b.name));
        }
        Ok(())
    }

    /// The overall time bounds spanned by every author's partitions.
    pub fn time_limits(&self) -> Option<(f64, f64)> {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for a in &self.authors {
            if a.tmin != ffdb_core::NULL_TIME {
                lo = lo.min(a.tmin);
                hi = hi.max(a.tmax);
            }
        }
        if lo.is_finite() {
            Some((lo, hi))
        } else {
            None
        }
    }

    /// Read a static table through the mtime-guarded cache.
    pub fn read_static_table(&self, name: &str) -> Result<Vec<CssRecord>> {
        let mut statics = self.statics.lock().unwrap();
        Ok(statics.read(name)?.as_ref().clone())
    }

    /// Repoint a static table at an explicit path.
    pub fn set_static_table(&self, name: &str, path: &str) -> Result<()> {
        if !schema::is_css_table(name) {
            return Err(FfdbError::BadObject {
                reason: format!("unknown table {}", name),
            });
        }
        let mut statics = self.statics.lock().unwrap();
        statics.set_path(name, Path::new(path));
        Ok(())
    }

    pub fn get_static_table(&self, name: &str) -> PathBuf {
        self.statics.lock().unwrap().path_of(name)
    }

    /// The network a station belongs to, via the cached `affiliation` table.
    pub fn network_of(&self, sta: &str) -> Option<&'static str> {
        self.statics.lock().unwrap().network_of(sta)
    }

    /// Every file that can hold rows of `table` whose partition intersects the window,
    /// optionally restricted to one author. `wfdisc` files live per station under the
    /// segment root; everything else per author under the parameter root.
    pub(crate) fn table_files(
        &self,
        table: &str,
        author: Option<&str>,
        tmin: f64,
        tmax: f64,
    ) -> Vec<PathBuf> {
        if let Some(prefix) = &self.prefix {
            let mut p = prefix.as_os_str().to_owned();
            p.push(".");
            p.push(table);
            return vec![PathBuf::from(p)];
        }
        let mut files = Vec::new();
        if table.starts_with("wfdisc") {
            let stations = list_dirs(&self.seg_root);
            for sta in stations {
                let sta_dir = self.seg_root.join(&sta);
                for part in partition::partitions_in_window(&self.structure, &sta_dir, tmin, tmax)
                {
                    let mut path = sta_dir.clone();
                    if !part.is_empty() {
                        path = path.join(&part);
                    }
                    files.push(path.join(format!("{}.{}", sta, table)));
                }
            }
            return files;
        }
        for a in &self.authors {
            if let Some(only) = author {
                if a.name != only {
                    continue;
                }
            }
            let author_dir = self.param_root.join(&a.name);
            for part in partition::partitions_in_window(&self.structure, &author_dir, tmin, tmax)
            {
                let mut path = author_dir.clone();
                if !part.is_empty() {
                    path = path.join(&part);
                }
                files.push(path.join(format!("{}.{}", a.name, table)));
            }
        }
        files
    }

    /// Whether `table` resolves through the static cache for queries.
    pub(crate) fn is_static_for_query(&self, table: &str) -> bool {
        self.read_globals && static_tables::is_static_table(table)
    }

    /// A private handle over the same on-disk layout with fresh caches, for a streaming
    /// producer thread. Per-file record caches are never shared across threads.
    pub(crate) fn clone_layout(&self) -> FFDatabase {
        let statics = self.statics.lock().unwrap().fork();
        FFDatabase {
            param_root: self.param_root.clone(),
            seg_root: self.seg_root.clone(),
            prefix: self.prefix.clone(),
            structure: self.structure.clone(),
            duration: self.duration,
            authors: self.authors.clone(),
            default_author: self.default_author.clone(),
            max_mem_records: self.max_mem_records,
            read_globals: self.read_globals,
            verbose: self.verbose,
            statics: Mutex::new(statics),
            id_state: Mutex::new(fnv::FnvHashMap::default()),
        }
    }
}

fn list_dirs(root: &Path) -> Vec<String> {
    let mut out = Vec::new();
    if let Ok(entries) = std::fs::read_dir(root) {
        for entry in entries.flatten() {
            if entry.path().is_dir() {
                let name = entry.file_name().to_string_lossy().to_string();
                if !name.starts_with('.') {
                    out.push(name);
                }
            }
        }
    }
    out.sort();
    out
}
