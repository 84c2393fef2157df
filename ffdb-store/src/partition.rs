//! Directory-structure expansion for time-partitioned record files.
//!
//! A directory structure is a `/`-separated token string; understood tokens are `%Y`
//! (year), `%j` (day of year), `%H` (hour), `%A` (author) and `%S` (station). The default
//! is `%A/%Y/%j` with a partition duration of one day. Expansion floors the record time to
//! the partition boundary, so an exact midnight belongs to the later day.
use chrono::{Datelike, Timelike};

use ffdb_core::errors::FfdbError;
use ffdb_core::gtime;
use ffdb_core::Result;

pub const DEFAULT_STRUCTURE: &str = "%A/%Y/%j";
pub const DEFAULT_DURATION: f64 = 86400.0;

/// Check a structure string for unknown tokens.
pub fn validate(structure: &str) -> Result<()> {
    for part in structure.split('/').filter(|p| !p.is_empty()) {
        match part {
            "%Y" | "%j" | "%H" | "%A" | "%S" => {}
            _ => {
                return Err(FfdbError::BadStructure {
                    structure: structure.to_string(),
                })
            }
        }
    }
    Ok(())
}

/// Expand a structure into the partition path for `epoch`, with `name` standing in for
/// both the `%A` and `%S` tokens.
pub fn expand(structure: &str, name: &str, epoch: f64, duration: f64) -> Result<String> {
    validate(structure)?;
    let floored = gtime::partition_floor(epoch, duration.max(1.0));
    let dt = gtime::epoch_to_datetime(floored);
    let mut parts = Vec::new();
    for part in structure.split('/').filter(|p| !p.is_empty()) {
        let expanded = match part {
            "%Y" => format!("{:04}", dt.year()),
            "%j" => format!("{:03}", dt.ordinal()),
            "%H" => format!("{:02}", dt.hour()),
            "%A" | "%S" => name.to_string(),
            _ => unreachable!("validated above"),
        };
        parts.push(expanded);
    }
    Ok(parts.join("/"))
}

/// Whether the structure partitions by time at all.
pub fn is_time_partitioned(structure: &str) -> bool {
    structure
        .split('/')
        .any(|p| matches!(p, "%Y" | "%j" | "%H"))
}

/// Recover the time interval `[tmin, tmax)` of a partition directory relative to the
/// author (or station) directory, e.g. `2021/001` against `%A/%Y/%j`. Returns `None` for
/// paths that do not parse.
pub fn dir_to_range(structure: &str, rel_dir: &str) -> Option<(f64, f64)> {
    let tokens: Vec<&str> = structure
        .split('/')
        .filter(|p| !p.is_empty() && !matches!(*p, "%A" | "%S"))
        .collect();
    let parts: Vec<&str> = rel_dir.split('/').filter(|p| !p.is_empty()).collect();
    if tokens.len() != parts.len() {
        return None;
    }
    let mut year: Option<i32> = None;
    let mut doy: Option<u32> = None;
    let mut hour: Option<u32> = None;
    for (tok, part) in tokens.iter().zip(parts.iter()) {
        match *tok {
            "%Y" => year = part.parse().ok(),
            "%j" => doy = part.parse().ok(),
            "%H" => hour = part.parse().ok(),
            _ => return None,
        }
    }
    let year = year?;
    let date = chrono::NaiveDate::from_yo_opt(year, doy.unwrap_or(1))?;
    let start = date.and_hms_opt(hour.unwrap_or(0), 0, 0)?;
    let tmin = gtime::datetime_to_epoch(start);
    let span = if hour.is_some() {
        3600.0
    } else if doy.is_some() {
        86400.0
    } else {
        // A year-only partition.
        let next = chrono::NaiveDate::from_yo_opt(year + 1, 1)?.and_hms_opt(0, 0, 0)?;
        gtime::datetime_to_epoch(next) - tmin
    };
    Some((tmin, tmin + span))
}

/// Every partition directory of `author_dir` whose interval intersects `[tmin, tmax]`,
/// as relative paths in ascending time order.
pub fn partitions_in_window(
    structure: &str,
    author_dir: &std::path::Path,
    tmin: f64,
    tmax: f64,
) -> Vec<String> {
    let depth = structure
        .split('/')
        .filter(|p| !p.is_empty() && !matches!(*p, "%A" | "%S"))
        .count();
    if depth == 0 {
        // No time tokens: the author directory itself is the single partition.
        return vec![String::new()];
    }
    let mut found: Vec<(f64, String)> = Vec::new();
    collect_dirs(author_dir, depth, String::new(), &mut |rel| {
        if let Some((lo, hi)) = dir_to_range(structure, rel) {
            if lo <= tmax && tmin < hi {
                found.push((lo, rel.to_string()));
            }
        }
    });
    found.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    found.into_iter().map(|(_, p)| p).collect()
}

fn collect_dirs(
    dir: &std::path::Path,
    depth: usize,
    rel: String,
    visit: &mut dyn FnMut(&str),
) {
    if depth == 0 {
        if !rel.is_empty() {
            visit(&rel);
        }
        return;
    }
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return,
    };
    for entry in entries.flatten() {
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        let next = if rel.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", rel, name)
        };
        collect_dirs(&entry.path(), depth - 1, next, visit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expansion_and_midnight_boundary() {
        let midnight = 1609459200.0; // 2021-01-01T00:00:00Z
        let p = expand("%A/%Y/%j", "kim", midnight, 86400.0).unwrap();
        assert_eq!(p, "kim/2021/001");
        let p = expand("%A/%Y/%j", "kim", midnight - 0.001, 86400.0).unwrap();
        assert_eq!(p, "kim/2020/366");
    }

    #[test]
    fn hour_token() {
        let t = 1609462800.0; // 01:00Z
        assert_eq!(expand("%Y/%j/%H", "x", t, 3600.0).unwrap(), "2021/001/01");
    }

    #[test]
    fn station_token_expands_like_author() {
        let t = 1609459200.0;
        assert_eq!(expand("%S/%Y/%j", "STA12", t, 86400.0).unwrap(), "STA12/2021/001");
    }

    #[test]
    fn bad_token_is_rejected() {
        assert!(expand("%Q/%Y", "x", 0.0, 86400.0).is_err());
    }

    #[test]
    fn dir_range_round_trip() {
        let (lo, hi) = dir_to_range("%A/%Y/%j", "2021/001").unwrap();
        assert_eq!(lo, 1609459200.0);
        assert_eq!(hi, 1609459200.0 + 86400.0);
        assert!(dir_to_range("%A/%Y/%j", "2021").is_none());
        assert!(dir_to_range("%A/%Y/%j", "2021/abc").is_none());
    }
}
