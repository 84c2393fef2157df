//! The id service: monotone integer issuance backed by the `lastid` table.
//!
//! Ids are reserved in pre-allocated batches: the first request bumps the on-disk
//! `keyvalue` by the configured increment and later requests are served from memory until
//! the batch drains. Reserved ids are never re-issued for the lifetime of the `lastid`
//! row; ids lost between reservation and use stay lost (forward-only). Unused ids can be
//! recycled into a per-key free list that is preferred on the next non-consecutive
//! request.
use fnv::FnvHashMap;
use once_cell::sync::Lazy;
use std::sync::Mutex;

use ffdb_core::errors::FfdbError;
use ffdb_core::record::{CssRecord, CssValue};
use ffdb_core::{codec, schema, Result};

use crate::table_file;
use crate::FFDatabase;

/// In-memory batch state for one keyname.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdBatch {
    /// Next id to hand out.
    next: i64,
    /// Ids left in the reserved block.
    remaining: i64,
}

/// Global keyname → batch increment configuration (default 1).
static INCREMENTS: Lazy<Mutex<FnvHashMap<String, i64>>> =
    Lazy::new(|| Mutex::new(FnvHashMap::default()));

/// Global keyname → recycled-id free lists.
static FREE_LISTS: Lazy<Mutex<FnvHashMap<String, Vec<i64>>>> =
    Lazy::new(|| Mutex::new(FnvHashMap::default()));

/// Configure how many ids a disk reservation pre-allocates for `keyname`.
pub fn set_request_id_increment(keyname: &str, increment: i64) -> Result<()> {
    if increment <= 0 {
        return Err(FfdbError::BadIncrement {
            keyname: keyname.to_string(),
            increment,
        });
    }
    INCREMENTS
        .lock()
        .unwrap()
        .insert(keyname.to_string(), increment);
    Ok(())
}

pub fn request_id_increment(keyname: &str) -> i64 {
    INCREMENTS.lock().unwrap().get(keyname).copied().unwrap_or(1)
}

/// Return unused ids to the per-key free list.
pub fn recycle_ids(keyname: &str, ids: &[i64]) {
    let mut lists = FREE_LISTS.lock().unwrap();
    lists
        .entry(keyname.to_string())
        .or_insert_with(Vec::new)
        .extend_from_slice(ids);
}

fn take_from_free_list(keyname: &str, max: usize) -> Vec<i64> {
    let mut lists = FREE_LISTS.lock().unwrap();
    match lists.get_mut(keyname) {
        Some(list) => {
            let n = max.min(list.len());
            list.split_off(list.len() - n)
        }
        None => Vec::new(),
    }
}

fn free_list_len(keyname: &str) -> usize {
    FREE_LISTS
        .lock()
        .unwrap()
        .get(keyname)
        .map(|l| l.len())
        .unwrap_or(0)
}

impl FFDatabase {
    /// Atomically reserve `n` identifiers for `keyname`, persisting the advance into the
    /// `lastid` table. With `consecutive` the returned ids are contiguous.
    pub fn request_ids(
        &self,
        table: &str,
        keyname: &str,
        n: usize,
        consecutive: bool,
    ) -> Result<Vec<i64>> {
        let mut state = self.id_state.lock().unwrap();
        let batch = state.entry(keyname.to_string()).or_default();
        let mut ids = Vec::with_capacity(n);

        if consecutive {
            if (batch.remaining as usize) < n {
                let reserve = (n as i64).max(request_id_increment(keyname));
                let keyvalue = self.update_lastid(table, keyname, reserve)?;
                batch.next = keyvalue - reserve + 1;
                batch.remaining = reserve;
            }
            for _ in 0..n {
                ids.push(batch.next);
                batch.next += 1;
                batch.remaining -= 1;
            }
            return Ok(ids);
        }

        ids.extend(take_from_free_list(keyname, n));
        while ids.len() < n {
            if batch.remaining == 0 {
                let need = (n - ids.len()) as i64;
                let reserve = need.max(request_id_increment(keyname));
                let keyvalue = self.update_lastid(table, keyname, reserve)?;
                batch.next = keyvalue - reserve + 1;
                batch.remaining = reserve;
            }
            ids.push(batch.next);
            batch.next += 1;
            batch.remaining -= 1;
        }
        Ok(ids)
    }

    /// One id, from the free list or the current batch.
    pub fn get_next_id(&self, table: &str, keyname: &str) -> Result<i64> {
        Ok(self.request_ids(table, keyname, 1, false)?[0])
    }

    /// Free-list size plus what is left of the reserved batch.
    pub fn number_ids_available(&self, keyname: &str) -> usize {
        let state = self.id_state.lock().unwrap();
        let remaining = state
            .get(keyname)
            .map(|b| b.remaining.max(0) as usize)
            .unwrap_or(0);
        free_list_len(keyname) + remaining
    }

    /// Advance the on-disk `keyvalue` for `keyname` by `n`, creating the row (and the
    /// file) when absent. Returns the new `keyvalue`, the last id of the reserved block.
    pub fn update_lastid(&self, table: &str, keyname: &str, n: i64) -> Result<i64> {
        let schema = schema::lookup(table).ok_or(FfdbError::NoLastid {
            keyname: keyname.to_string(),
        })?;
        let path = self.get_static_table(table);
        let existing = if path.is_file() {
            table_file::read_table_file(&path, &schema)?
        } else {
            Vec::new()
        };
        let old = existing
            .iter()
            .find(|r| r.str_member("keyname") == Some(keyname));
        match old {
            Some(rec) => {
                let keyvalue = rec.long_member("keyvalue").unwrap_or(0) + n;
                let mut updated = rec.clone();
                updated
                    .set_by_name("keyvalue", CssValue::Long(keyvalue))
                    .unwrap();
                updated.set_lddate_now();
                let old_line = codec::to_string(rec);
                let new_line = codec::to_string(&updated);
                table_file::overwrite_line(&path, rec.source.file_offset, &old_line, &new_line)?;
                Ok(keyvalue)
            }
            None => {
                let mut rec = CssRecord::with_schema(schema);
                rec.set_by_name("keyname", CssValue::Str(keyname.to_string()))
                    .unwrap();
                rec.set_by_name("keyvalue", CssValue::Long(n)).unwrap();
                rec.set_lddate_now();
                table_file::append_record(&path, &mut rec).map_err(|_| FfdbError::NoLastid {
                    keyname: keyname.to_string(),
                })?;
                Ok(n)
            }
        }
    }
}
