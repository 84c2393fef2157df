//! Waveform decoding and processing for CSS 3.0 flat-file databases.
//!
//! This crate turns `.w` byte ranges into typed sample arrays (`decode`), assembles them
//! into gap-aware multi-segment time series (`segment`, `timeseries`), and records every
//! transformation applied to a series as a replayable method stack (`methods`), so a
//! derived sample is always traceable to its inputs.
//!
//! The crate holds no file handles; resolving a `wfdisc` row to bytes is the store's job.
extern crate ffdb_core;
extern crate num;
extern crate rustfft;

pub mod datatype;
pub mod decode;
pub mod methods;
pub mod segment;
pub mod timeseries;
#[cfg(test)]
mod tests;

pub use datatype::WfDatatype;
pub use decode::{decode, decode_envelope};
pub use methods::{Method, MethodStack};
pub use segment::Segment;
pub use timeseries::TimeSeries;

pub use ffdb_core::{FfdbError, Result};
