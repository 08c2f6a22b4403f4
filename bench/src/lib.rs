//! NIC Benchmark Driver Library
//!
//! Drives iperf, fio and wrk sweeps between a client machine carrying the NIC
//! under test and a server machine, and writes raw results in the format read
//! by the `aggregate` crate.
//!
//! ## Architecture
//!
//! - `config`: testbed description and address derivation
//! - `remote`: the [`remote::RemoteShell`] boundary and its `ssh` implementation
//! - `retry`: bounded retries and Ctrl-C cancellation
//! - `collect`: per-benchmark collectors and link preparation
//! - `driver`: the benchmark modes behind the command line
//! - `utils`: result file naming and writing

pub mod cli;
pub mod collect;
pub mod config;
pub mod driver;
pub mod remote;
pub mod retry;
pub mod types;
pub mod utils;

#[cfg(test)]
mod testing;

pub use collect::Session;
pub use config::TestbedConfig;
pub use remote::{RemoteShell, SshShell};
pub use retry::{CancellationToken, RetryPolicy};
pub use types::{BenchmarkError, BenchmarkResult};

/// Initialize logging for the benchmark driver
///
/// Info level by default; `RUST_LOG` overrides it.
pub fn init_logging() -> BenchmarkResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .format_module_path(false)
        .format_target(false)
        .try_init()
        .map_err(|e| {
            BenchmarkError::Initialization(format!("Failed to initialize logging: {e}"))
        })?;

    Ok(())
}
