//! The process-wide string intern pool.
//!
//! A quark is a small integer handle for a byte string. Two equal strings always intern to
//! the same quark, and the reverse lookup returns a borrow that stays valid for the life of
//! the process. Quarks are used as hash keys and as cheap column values wherever short
//! repeated strings dominate: station and channel codes, datatypes, file paths.
use fnv::FnvHashMap;
use once_cell::sync::Lazy;
use std::sync::RwLock;

/// An interned string handle. Quark 0 is the empty string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Quark(pub u32);

impl Quark {
    /// The empty-string quark.
    pub const NONE: Quark = Quark(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

struct QuarkPool {
    map: FnvHashMap<&'static str, u32>,
    names: Vec<&'static str>,
}

static POOL: Lazy<RwLock<QuarkPool>> = Lazy::new(|| {
    let mut map = FnvHashMap::default();
    map.insert("", 0);
    RwLock::new(QuarkPool {
        map,
        names: vec![""],
    })
});

/// Intern a string, returning its stable handle. Deterministic and idempotent: the same
/// string always yields the same quark. Readers never block each other; writers serialize.
pub fn quark(s: &str) -> Quark {
    {
        let pool = POOL.read().unwrap();
        if let Some(&q) = pool.map.get(s) {
            return Quark(q);
        }
    }
    let mut pool = POOL.write().unwrap();
    // A racing writer may have interned it between the two locks.
    if let Some(&q) = pool.map.get(s) {
        return Quark(q);
    }
    let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
    let q = pool.names.len() as u32;
    pool.names.push(leaked);
    pool.map.insert(leaked, q);
    Quark(q)
}

/// Reverse lookup. Infallible for quarks previously returned by [`quark`]; an unknown
/// handle maps to the empty string.
pub fn quark_str(q: Quark) -> &'static str {
    let pool = POOL.read().unwrap();
    pool.names.get(q.0 as usize).copied().unwrap_or("")
}

impl std::fmt::Display for Quark {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(fmt, "{}", quark_str(*self))
    }
}

impl From<&str> for Quark {
    fn from(s: &str) -> Quark {
        quark(s)
    }
}
