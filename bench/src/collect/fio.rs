//! fio sweep against the server's `fio --server`, measured under `perf stat`.

use std::{net::Ipv4Addr, path::Path};

use log::{info, warn};
use nicbench_common::{FioPoint, GridPoint};

use super::Session;
use crate::{
    remote::{CommandOutput, RemoteShell},
    retry::retry,
    types::{BenchmarkError, BenchmarkResult},
    utils::ResultWriter,
};

/// Job file name in the client's home directory.
pub const JOB_FILE: &str = "custom.fio";

/// Events counted on CPU 0 while fio runs.
const PERF_EVENTS: &str = "cycles,instructions,cache-misses";

/// Command run on the client for one point.
#[must_use]
pub fn client_command(point: FioPoint, server_ip: Ipv4Addr) -> String {
    format!(
        "env BLOCKSIZE={} IODEPTH={} bash -c 'sudo -E perf stat -a -C 0 -e {PERF_EVENTS} \
         sudo -E fio --client=ip:{server_ip} ~/{JOB_FILE}'",
        point.block_size, point.io_depth
    )
}

/// The three lines recorded per point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FioBlock {
    /// Cycle count reported by perf.
    pub cycles: String,
    /// fio's per-job bandwidth line.
    pub bandwidth: String,
    /// fio's per-job IOPS line.
    pub iops: String,
}

impl FioBlock {
    pub fn from_output(host: &str, output: &CommandOutput) -> BenchmarkResult<Self> {
        let first_line = |text: &str, needle: &str| {
            text.lines()
                .find(|l| l.contains(needle))
                .map(str::to_string)
                .ok_or_else(|| {
                    BenchmarkError::missing_output(host, format!("no '{needle}' line"))
                })
        };

        let cycles = first_line(&output.stderr, "cycles")?
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string();
        Ok(Self {
            cycles,
            bandwidth: first_line(&output.stdout, "bw")?,
            iops: first_line(&output.stdout, "iops")?,
        })
    }
}

impl<S: RemoteShell> Session<'_, S> {
    /// Starts a clean `fio --server` and copies the job file to the client.
    pub fn fio_setup(&self, job_file: &Path) -> BenchmarkResult<()> {
        self.shell.run(&self.client.name, "killall fio")?;
        self.shell.run(&self.server.name, "killall fio")?;
        self.shell.spawn(&self.server.name, "fio --server")?;
        self.shell.copy_to(&self.client.name, job_file, "~")
    }

    fn fio_restart(&self) -> BenchmarkResult<()> {
        warn!("Restarting fio on {} and {}", self.client.name, self.server.name);
        self.shell.run(&self.client.name, "killall fio")?;
        self.shell.run(&self.server.name, "killall fio")?;
        self.cancel.sleep(self.timing.restart_backoff())?;
        self.shell.spawn(&self.server.name, "fio --server")?;
        self.cancel.sleep(self.timing.settle())
    }

    /// Runs one point, restarting both fio ends before every retry.
    pub fn fio_point(&self, point: FioPoint) -> BenchmarkResult<FioBlock> {
        let command = client_command(point, self.server.ip);
        let operation = format!("fio blocksize {} depth {}", point.block_size, point.io_depth);
        let host = &self.client.name;

        retry(&self.policy, &self.cancel, &operation, |attempt| {
            if attempt > 1 {
                self.fio_restart()?;
            }
            let output = self
                .shell
                .run_with_timeout(host, &command, self.timing.fio_timeout())?
                .into_success(host, &command)?;
            FioBlock::from_output(host, &output)
        })
    }

    /// Sweeps every block size and queue depth, one 4-line block per point.
    pub fn fio_sweep(&self, writer: &mut ResultWriter) -> BenchmarkResult<()> {
        for point in FioPoint::grid() {
            self.cancel.sleep(self.timing.settle())?;
            info!("fio blocksize {} depth {}", point.block_size, point.io_depth);
            writer.write_line(&format!(
                "blocksize {} depth {},",
                point.block_size, point.io_depth
            ))?;

            let block = self.fio_point(point)?;
            writer.write_line(&block.cycles)?;
            writer.write_line(&block.bandwidth)?;
            writer.write_line(&block.iops)?;
        }
        Ok(())
    }
}
