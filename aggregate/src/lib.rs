//! Benchmark Result Aggregation
//!
//! Turns raw benchmark tool output (fio, iperf, wrk) collected for the
//! compared NIC variants into long-format, tab-separated tables for plotting.
//!
//! ## Pipeline
//!
//! 1. [`classify`]: assign every raw result file to a variant by file name
//! 2. [`family`]: parse a file positionally into readings over the family's grid
//! 3. [`group`]: group the samples by grid point and variant
//! 4. [`stats`]: summarize and compare the groups
//! 5. [`table`]: write one row per sample
//!
//! Any file whose structure differs from the expected one aborts the run,
//! unless malformed files are explicitly skipped.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use aggregate::{Aggregator, Family};
//!
//! let aggregator = Aggregator::default();
//! aggregator.run_family(Family::Fio, Path::new("csvs"), Path::new("aggregated"))?;
//! # Ok::<(), aggregate::AggregateError>(())
//! ```

pub mod classify;
pub mod cli;
pub mod error;
pub mod extract;
pub mod family;
pub mod group;
pub mod layout;
pub mod pipeline;
pub mod report;
pub mod stats;
pub mod table;

pub use classify::{Classifier, ClassifierRule};
pub use error::{AggregateError, Result};
pub use nicbench_common::{Direction, Family, Variant};
pub use pipeline::{AggregateOptions, AggregationReport, Aggregator, RawResultFile};
pub use table::LongTable;

/// Initialize logging for the aggregation tool
///
/// Info level by default; `RUST_LOG` overrides it.
pub fn init_logging() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .format_module_path(false)
        .format_target(false)
        .try_init()
        .map_err(|e| {
            AggregateError::Configuration(format!("Failed to initialize logging: {e}"))
        })?;

    Ok(())
}
