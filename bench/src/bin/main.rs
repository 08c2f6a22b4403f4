//! NIC Benchmark Driver
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin bench -- bench --machine f03 --name csf --iterations 5
//! cargo run --bin bench -- fio --machine f03 --server-machine f05 --fio-job scripts/custom.fio
//! cargo run --bin bench -- bench-nic --machine f03 --server-machine f05
//! cargo run --bin bench -- util --corundum-path ~/corundum
//! ```

use bench::{
    cli::Cli, driver, init_logging, BenchmarkError, BenchmarkResult, CancellationToken, SshShell,
};
use clap::Parser;
use log::{error, info, warn};

fn main() -> BenchmarkResult<()> {
    init_logging()?;

    let cli = Cli::parse();

    let cancel = CancellationToken::new();
    let result = cancel
        .install_ctrlc_handler()
        .and_then(|()| SshShell::new())
        .and_then(|shell| driver::run(&shell, &cli.command, &cancel));

    match result {
        Ok(()) => {
            info!("Benchmark driver completed successfully");
            Ok(())
        }
        Err(BenchmarkError::Cancelled) => {
            warn!("Interrupted; completed points were kept");
            Ok(())
        }
        Err(e) => {
            error!("Benchmark failed: {e}");

            match &e {
                BenchmarkError::Configuration(_) => {
                    error!("Please check the testbed configuration file and command-line options");
                }
                BenchmarkError::Remote { host, .. } | BenchmarkError::Timeout { host, .. } => {
                    error!("Please ensure {host} is reachable with passwordless SSH and sudo");
                }
                BenchmarkError::RetriesExhausted { .. } => {
                    error!("Raise --max-attempts or omit it to retry until the step succeeds");
                }
                BenchmarkError::Aggregate(_) => {
                    error!("Please check that the implementation reports exist under --corundum-path");
                }
                _ => {}
            }

            std::process::exit(1);
        }
    }
}
