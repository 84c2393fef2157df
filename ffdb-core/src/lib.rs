//! This library is the foundation for the `ffdb-wave` and `ffdb-store` crates. It holds the
//! CSS 3.0 table machinery: the quark string-intern pool, the schema registry with the
//! built-in table catalog, the typed record object, and the fixed-width ASCII codec that
//! round-trips record lines bit-exactly.
//!
//! A CSS flat-file database stores one record per line in fixed-column ASCII files. Every
//! table (wfdisc, arrival, origin, ...) is described by a schema: an ordered list of columns
//! with a name, a line position, a width, a type and a null literal. Numeric null literals
//! are sentinel values with meaning of their own (`-1`, `-999`, `-9999999999.999`), not SQL
//! NULLs; records are created with the nulls pre-filled.
extern crate chrono;
extern crate fnv;
extern crate num;
#[macro_use]
extern crate num_derive;
extern crate once_cell;

#[cfg(feature = "serde")]
extern crate serde;
#[cfg(feature = "to_json")]
extern crate serde_json;

pub mod codec;
pub mod errors;
pub mod gtime;
pub mod quark;
pub mod record;
pub mod schema;
mod schemas;

pub use errors::FfdbError;
pub use quark::{quark, quark_str, Quark};
pub use record::{CssRecord, CssValue, DataSource, PropValue, RecordSource};
pub use schema::{CssColumn, CssSchema, CssType};
pub use schemas::SchemaBuilder;

/// The result type used throughout the workspace.
pub type Result<T> = std::result::Result<T, FfdbError>;

/// Epoch-time null sentinel shared by every `Time` column.
pub const NULL_TIME: f64 = -9999999999.999;

/// The `lddate` serialization used by every table (`%Y-%m-%d %H:%M:%S`).
pub const LDDATE_WIDTH: usize = 19;
