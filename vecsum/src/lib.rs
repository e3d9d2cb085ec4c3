//! This crate measures how fast a large file of doubles can be read and summed
//! through different data-access paths.
//!
//! # Usage
//!
//! 1. Build a [`Config`]: which file, how many passes, which [`Strategy`].
//! 2. Pick a storage [`backend`]. [`backend::LocalFs`] reads from the local filesystem.
//! 3. Create a [`Driver`] and call [`Driver::run`].
//! 4. Inspect the returned [`RunReport`]: per-pass sums, throughput, chunk latencies.
//!
//! ```no_run
//! use std::num::NonZeroU32;
//! use vecsum::{backend::LocalFs, Config, Driver, Strategy};
//!
//! let config = Config::new("/data/floats.bin", NonZeroU32::new(3).unwrap(), Strategy::ZeroCopy);
//! let backend = LocalFs::new();
//! let report = Driver::new(config, &backend).run().unwrap();
//! println!("{}", report.measurement);
//! ```
//!
//! # Read strategies
//!
//! - [`Strategy::Buffered`]: `read(2)`-style copies into one reusable aligned scratch buffer.
//! - [`Strategy::ZeroCopy`]: the backend lends out a buffer pointing into its own memory.
//!   Each lent buffer is handed back before the next one is requested, also when the read
//!   fails half-way. See [`source::ZeroCopySource`].
//! - [`Strategy::LocalMemory`]: the file is loaded into a page-locked arena up front and the
//!   passes only walk memory. This is the upper bound the other paths are compared against.
//!
//! Every chunk must be a whole number of 8-double groups, and the file a whole number of
//! chunks. Both are checked before the first read; see [`chunk`].

pub mod backend;
pub mod chunk;
pub mod config;
pub mod driver;
mod error;
pub mod metrics;
pub mod report;
pub mod source;
pub mod stopwatch;
pub mod sum;

#[cfg(test)]
pub(crate) mod test_util;

pub use chunk::{AlignmentError, Chunk};
pub use config::{Config, Strategy};
pub use driver::{Driver, RunState};
pub use error::Error;
pub use report::{PassReport, RunReport};
pub use stopwatch::{Measurement, Stopwatch};
pub use sum::{SumMode, VectorSummer};
