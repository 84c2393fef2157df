//! Record-file reading and writing.
//!
//! A record file is a sequence of schema-conforming fixed-width lines, one `\n` per
//! record. Reads decode line by line; a row that fails to decode is reported through the
//! log and skipped, and the reader continues. Writes serialize under an exclusive advisory
//! lock; updates overwrite in place when the replacement line has the same length, and
//! everything else rewrites through a sibling temp file renamed over the original so a
//! reader never sees a torn file.
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use ffdb_core::errors::FfdbError;
use ffdb_core::quark::quark;
use ffdb_core::record::{CssRecord, DataSource};
use ffdb_core::schema::CssSchema;
use ffdb_core::{codec, Result};

/// Read every record of a file. Bad lines are skipped with a warning; I/O failure on a
/// present file is an error, a missing file is `OpenReadErr` for the caller to interpret.
pub fn read_table_file(path: &Path, schema: &Arc<CssSchema>) -> Result<Vec<CssRecord>> {
    let file = File::open(path).map_err(|_| FfdbError::OpenReadErr {
        path: path.display().to_string(),
    })?;
    let mut reader = BufReader::new(file);
    let mut records = Vec::new();
    let mut offset = 0u64;
    let mut line_no = 0usize;
    let mut line = String::with_capacity(schema.line_length());
    let file_quark = quark(&path.display().to_string());
    loop {
        line.clear();
        let n = reader.read_line(&mut line)?;
        if n == 0 {
            break;
        }
        line_no += 1;
        let mut rec = CssRecord::with_schema(schema.clone());
        match codec::read_line(&mut rec, &line) {
            Ok(()) => {
                rec.source.data_source = DataSource::FlatFile;
                rec.source.table_name = schema.name_quark();
                rec.source.file = file_quark;
                rec.source.file_offset = offset;
                records.push(rec);
            }
            Err(e) => {
                let err = FfdbError::TableReadErr {
                    file: path.display().to_string(),
                    line_no,
                    reason: e.to_string(),
                };
                log::warn!("{}", err);
            }
        }
        offset += n as u64;
    }
    Ok(records)
}

/// A cached file read, revalidated when the mtime changes.
#[derive(Default, Debug)]
pub struct FileCache {
    entries: fnv::FnvHashMap<PathBuf, (SystemTime, Arc<Vec<CssRecord>>)>,
}

impl FileCache {
    pub fn new() -> FileCache {
        FileCache::default()
    }

    /// The records of `path`, re-read when the file changed since the last call. A
    /// missing file yields an empty vector.
    pub fn read(&mut self, path: &Path, schema: &Arc<CssSchema>) -> Result<Arc<Vec<CssRecord>>> {
        let mtime = match std::fs::metadata(path) {
            Ok(meta) => meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            Err(_) => {
                self.entries.remove(path);
                return Ok(Arc::new(Vec::new()));
            }
        };
        if let Some((cached_mtime, records)) = self.entries.get(path) {
            if *cached_mtime == mtime {
                return Ok(records.clone());
            }
            log::debug!("reloading {} (mtime changed)", path.display());
        }
        let records = Arc::new(read_table_file(path, schema)?);
        self.entries
            .insert(path.to_path_buf(), (mtime, records.clone()));
        Ok(records)
    }

    pub fn invalidate(&mut self, path: &Path) {
        self.entries.remove(path);
    }
}

/// Append one serialized record under an exclusive lock, creating parent directories.
/// Returns the byte offset the line landed at.
pub fn append_record(path: &Path, rec: &mut CssRecord) -> Result<u64> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|_| FfdbError::CreateDirErr {
            path: parent.display().to_string(),
        })?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|_| FfdbError::OpenWriteErr {
            path: path.display().to_string(),
        })?;
    file.lock_exclusive().map_err(FfdbError::StdIoError)?;
    let result = (|| -> Result<u64> {
        let offset = file.seek(SeekFrom::End(0))?;
        codec::write(rec, &mut file)?;
        file.flush()?;
        Ok(offset)
    })();
    let _ = fs2::FileExt::unlock(&file);
    let offset = result?;
    rec.source.data_source = DataSource::FlatFile;
    rec.source.file = quark(&path.display().to_string());
    rec.source.file_offset = offset;
    Ok(offset)
}

/// Overwrite the line at `offset` in place. The replacement must have the same byte
/// length, which the fixed-width codec guarantees; a mismatch reports `InvalidUpdate` and
/// the caller falls back to a rewrite.
pub fn overwrite_line(path: &Path, offset: u64, old_line: &str, new_line: &str) -> Result<()> {
    if old_line.len() != new_line.len() {
        return Err(FfdbError::InvalidUpdate {
            reason: format!(
                "replacement line length {} differs from {}",
                new_line.len(),
                old_line.len()
            ),
        });
    }
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|_| FfdbError::OpenWriteErr {
            path: path.display().to_string(),
        })?;
    file.lock_exclusive().map_err(FfdbError::StdIoError)?;
    let result = (|| -> Result<()> {
        file.seek(SeekFrom::Start(offset))?;
        let mut current = vec![0u8; old_line.len()];
        file.read_exact(&mut current)?;
        if current != old_line.as_bytes() {
            return Err(FfdbError::InvalidUpdate {
                reason: format!(
                    "record at offset {} of {} no longer matches",
                    offset,
                    path.display()
                ),
            });
        }
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(new_line.as_bytes())?;
        file.flush()?;
        Ok(())
    })();
    let _ = fs2::FileExt::unlock(&file);
    result
}

/// Rewrite the file keeping only the lines `keep` approves of, through a temp file and an
/// atomic rename. Line offsets are passed to the predicate.
pub fn rewrite_filtered<F: FnMut(u64, &str) -> Option<String>>(
    path: &Path,
    mut keep: F,
) -> Result<()> {
    let file = File::open(path).map_err(|_| FfdbError::OpenReadErr {
        path: path.display().to_string(),
    })?;
    file.lock_exclusive().map_err(FfdbError::StdIoError)?;
    let result = (|| -> Result<()> {
        let mut reader = BufReader::new(&file);
        let tmp_path = path.with_extension("tmp");
        let mut tmp = File::create(&tmp_path).map_err(|_| FfdbError::OpenWriteErr {
            path: tmp_path.display().to_string(),
        })?;
        let mut line = String::new();
        let mut offset = 0u64;
        loop {
            line.clear();
            let n = reader.read_line(&mut line)?;
            if n == 0 {
                break;
            }
            if let Some(out) = keep(offset, &line) {
                tmp.write_all(out.as_bytes())?;
            }
            offset += n as u64;
        }
        tmp.flush()?;
        std::fs::rename(&tmp_path, path).map_err(|e| FfdbError::TableWriteErr {
            file: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    })();
    let _ = fs2::FileExt::unlock(&file);
    result
}
