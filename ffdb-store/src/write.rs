//! Insert, update and delete paths.
//!
//! Insert is append-only into the author's current partition file. Update overwrites the
//! line in place when the replacement serializes to the same length, which the
//! fixed-width codec guarantees; otherwise, and for delete, the file is rewritten through
//! a temp file renamed over the original.
use std::path::PathBuf;

use ffdb_core::errors::FfdbError;
use ffdb_core::record::CssRecord;
use ffdb_core::{codec, gtime, Result};

use crate::partition;
use crate::table_file;
use crate::FFDatabase;

impl FFDatabase {
    /// Append a record to the author's partition for the record's own time.
    pub fn insert_table(&self, rec: &mut CssRecord, author: &str) -> Result<()> {
        let time = self.record_time(rec)?;
        self.write_table(rec, author, time)
    }

    pub fn insert_tables(&self, recs: &mut [CssRecord], author: &str) -> Result<()> {
        for rec in recs {
            self.insert_table(rec, author)?;
        }
        Ok(())
    }

    /// Append a record to the partition holding `time`. Fails before any byte is written
    /// when the author is unknown or not writable.
    pub fn write_table(&self, rec: &mut CssRecord, author: &str, time: f64) -> Result<()> {
        if let Some(prefix) = self.prefix() {
            let mut p = prefix.as_os_str().to_owned();
            p.push(".");
            p.push(rec.table_name());
            rec.set_lddate_now();
            table_file::append_record(&PathBuf::from(p), rec)?;
            return Ok(());
        }
        let a = self.author(author).ok_or(FfdbError::AuthorErr {
            author: author.to_string(),
        })?;
        if !a.writable {
            return Err(FfdbError::AuthorWriteErr {
                author: author.to_string(),
            });
        }
        let path = self.insert_path(rec, author, time)?;
        rec.set_lddate_now();
        rec.source.user = ffdb_core::quark(author);
        table_file::append_record(&path, rec)?;
        Ok(())
    }

    /// Append a record in prefix (self-contained) layout.
    pub fn insert_prefix_table(&self, rec: &mut CssRecord) -> Result<()> {
        let prefix = self.prefix().ok_or(FfdbError::BadObject {
            reason: "database was not opened with a prefix".to_string(),
        })?;
        let mut p = prefix.as_os_str().to_owned();
        p.push(".");
        p.push(rec.table_name());
        rec.set_lddate_now();
        table_file::append_record(&PathBuf::from(p), rec)?;
        Ok(())
    }

    /// Append a record to the table's static/global file.
    pub fn write_static_table(&self, rec: &mut CssRecord) -> Result<()> {
        let path = self.get_static_table(rec.table_name());
        rec.set_lddate_now();
        table_file::append_record(&path, rec)?;
        Ok(())
    }

    /// Replace each `old` record with its `new` counterpart in the owning file.
    pub fn update_tables(&self, old: &[CssRecord], new: &mut [CssRecord]) -> Result<usize> {
        if old.len() != new.len() {
            return Err(FfdbError::InvalidUpdate {
                reason: format!("{} old records but {} new", old.len(), new.len()),
            });
        }
        let mut updated = 0;
        for (o, n) in old.iter().zip(new.iter_mut()) {
            self.update_table(o, n)?;
            updated += 1;
        }
        Ok(updated)
    }

    pub fn update_table(&self, old: &CssRecord, new: &mut CssRecord) -> Result<()> {
        let path = record_file(old).ok_or(FfdbError::NoUpdateFile {
            table: old.table_name().to_string(),
        })?;
        new.set_lddate_now();
        let old_line = codec::to_string(old);
        let new_line = codec::to_string(new);
        if old_line.len() == new_line.len() {
            match table_file::overwrite_line(&path, old.source.file_offset, &old_line, &new_line)
            {
                Ok(()) => {
                    new.source = old.source;
                    return Ok(());
                }
                Err(FfdbError::InvalidUpdate { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        // The record moved or changed width; locate it by content and rewrite the file.
        let mut replaced = false;
        table_file::rewrite_filtered(&path, |_, line| {
            if !replaced && line == old_line {
                replaced = true;
                Some(new_line.clone())
            } else {
                Some(line.to_string())
            }
        })?;
        if replaced {
            Ok(())
        } else {
            Err(FfdbError::InvalidUpdate {
                reason: format!(
                    "record not found in {} for update",
                    path.display()
                ),
            })
        }
    }

    /// Update `member_indices` of the row matching `old` on `where_indices`, scanning the
    /// table's files. Returns how many rows were rewritten.
    pub fn update_table_where(
        &self,
        table: &str,
        member_indices: &[usize],
        where_indices: &[usize],
        old: &CssRecord,
        new: &CssRecord,
    ) -> Result<usize> {
        if old.table_name() != table || new.table_name() != table {
            return Err(FfdbError::InvalidUpdate {
                reason: format!("records are not rows of {}", table),
            });
        }
        let schema = old.schema().clone();
        let files = self.table_files(table, None, f64::NEG_INFINITY, f64::INFINITY);
        let mut updated = 0;
        for path in files {
            if !path.is_file() {
                continue;
            }
            let rows = table_file::read_table_file(&path, &schema)?;
            for row in &rows {
                let hit = where_indices.iter().all(|&i| {
                    row.value(i).map(|v| Some(v) == old.value(i)).unwrap_or(false)
                });
                if !hit {
                    continue;
                }
                let mut replacement = row.clone();
                for &i in member_indices {
                    if let Some(v) = new.value(i) {
                        replacement.set_value(i, v.clone())?;
                    }
                }
                replacement.set_lddate_now();
                let old_line = codec::to_string(row);
                let new_line = codec::to_string(&replacement);
                table_file::overwrite_line(&path, row.source.file_offset, &old_line, &new_line)?;
                updated += 1;
            }
        }
        Ok(updated)
    }

    /// Remove the record's line from its owning file, never leaving a torn file.
    pub fn delete_table(&self, rec: &CssRecord) -> Result<()> {
        let path = record_file(rec).ok_or(FfdbError::NoDeleteFile {
            table: rec.table_name().to_string(),
        })?;
        let target_offset = rec.source.file_offset;
        let target_line = codec::to_string(rec);
        let mut deleted = false;
        table_file::rewrite_filtered(&path, |offset, line| {
            if !deleted && (offset == target_offset || line == target_line) {
                deleted = true;
                None
            } else {
                Some(line.to_string())
            }
        })?;
        if deleted {
            Ok(())
        } else {
            Err(FfdbError::NoDeleteFile {
                table: rec.table_name().to_string(),
            })
        }
    }

    /// The partition time of a record: its `time` member, else its on-date, else an error
    /// when the layout partitions by time.
    fn record_time(&self, rec: &CssRecord) -> Result<f64> {
        if let Some(i) = rec.member_index("time") {
            if !rec.is_null(i) {
                return Ok(rec.double_member("time").unwrap_or(0.0));
            }
        }
        for member in &["ondate", "jdate"] {
            if let Some(i) = rec.member_index(member) {
                if !rec.is_null(i) {
                    let jdate = rec.long_member(member).unwrap_or(-1);
                    if jdate > 0 {
                        return gtime::jdate_to_epoch(jdate);
                    }
                }
            }
        }
        if !partition::is_time_partitioned(self.directory_structure()) {
            return Ok(0.0);
        }
        Err(FfdbError::NoTime {
            table: rec.table_name().to_string(),
        })
    }

    fn insert_path(&self, rec: &CssRecord, author: &str, time: f64) -> Result<PathBuf> {
        let table = rec.table_name();
        if table.starts_with("wfdisc") {
            let sta = rec.str_member("sta").unwrap_or("-").to_string();
            let part = partition::expand(
                self.directory_structure(),
                &sta,
                time,
                self.directory_duration(),
            )?;
            let mut path = self.seg_root().to_path_buf();
            if !part.is_empty() {
                path = path.join(part);
            }
            return Ok(path.join(format!("{}.{}", sta, table)));
        }
        let part = partition::expand(
            self.directory_structure(),
            author,
            time,
            self.directory_duration(),
        )?;
        let mut path = self.param_root().join(author);
        // The %A token already placed the author at the front of the partition path.
        if part.starts_with(&format!("{}/", author)) || part == author {
            path = self.param_root().to_path_buf();
        }
        if !part.is_empty() {
            path = path.join(part);
        }
        Ok(path.join(format!("{}.{}", author, table)))
    }
}

fn record_file(rec: &CssRecord) -> Option<PathBuf> {
    if rec.source.file.is_none() {
        return None;
    }
    Some(PathBuf::from(ffdb_core::quark_str(rec.source.file)))
}
