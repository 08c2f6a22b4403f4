//! Benchmark collectors.
//!
//! Each collector sweeps its family's grid in the order given by
//! [`nicbench_common::grid`] and writes the raw tool output that the
//! aggregator reads back positionally.

use std::{
    net::Ipv4Addr,
    path::{Path, PathBuf},
};

use log::info;

use crate::{
    config::{client_ip, machine_number, server_ip, RemotePaths, TestbedConfig, TimingConfig},
    remote::RemoteShell,
    retry::{CancellationToken, RetryPolicy},
    types::{BenchmarkError, BenchmarkResult},
    utils::{result_path, ResultWriter},
};

pub mod fio;
pub mod iperf;
pub mod setup;
pub mod wrk;

/// Interface the FPGA NIC shows up as.
pub const FPGA_IFACE: &str = "eth0";

/// One end of the benchmarked link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    pub name: String,
    pub ip: Ipv4Addr,
    /// Interface carrying `ip`.
    pub iface: String,
    /// Interface to fall back to when `iface` does not exist.
    pub alt_iface: Option<String>,
}

impl Host {
    /// Interfaces to try, in order.
    #[must_use]
    pub fn ifaces(&self) -> Vec<&str> {
        std::iter::once(self.iface.as_str())
            .chain(self.alt_iface.as_deref())
            .collect()
    }
}

/// Everything a collector needs to drive one client/server pair.
pub struct Session<'a, S: RemoteShell> {
    pub shell: &'a S,
    /// Machine with the NIC under test.
    pub client: Host,
    /// Machine at the other end of the link.
    pub server: Host,
    /// PCI address of the client's FPGA card; `None` for commodity NICs.
    pub alveo_port: Option<String>,
    pub timing: TimingConfig,
    pub paths: RemotePaths,
    pub policy: RetryPolicy,
    pub cancel: CancellationToken,
}

impl<'a, S: RemoteShell> Session<'a, S> {
    /// A session against the FPGA NIC of `client`.
    pub fn fpga(
        shell: &'a S,
        config: &TestbedConfig,
        client: &str,
        server: Option<&str>,
        max_attempts: Option<u32>,
        cancel: CancellationToken,
    ) -> BenchmarkResult<Self> {
        let server_name = server.unwrap_or(&config.default_server);
        let client_cfg = lookup(config, client)?;
        let server_cfg = lookup(config, server_name)?;
        let number = machine_number(client)?;

        Ok(Self {
            shell,
            client: Host {
                name: client.to_string(),
                ip: client_ip(number),
                iface: FPGA_IFACE.to_string(),
                alt_iface: client_cfg.fpga_alt_iface.clone(),
            },
            server: Host {
                name: server_name.to_string(),
                ip: server_ip(number),
                iface: required_iface(server_name, server_cfg.iface.as_deref())?,
                alt_iface: None,
            },
            alveo_port: client_cfg.alveo_port.clone(),
            timing: config.timing,
            paths: config.paths.clone(),
            policy: RetryPolicy::default().with_max_attempts(max_attempts),
            cancel,
        })
    }

    /// A session between the commodity NICs of two machines.
    pub fn nic(
        shell: &'a S,
        config: &TestbedConfig,
        client: &str,
        server: &str,
        max_attempts: Option<u32>,
        cancel: CancellationToken,
    ) -> BenchmarkResult<Self> {
        let client_cfg = lookup(config, client)?;
        let server_cfg = lookup(config, server)?;
        let number = machine_number(client)?;

        Ok(Self {
            shell,
            client: Host {
                name: client.to_string(),
                ip: client_ip(number),
                iface: required_iface(client, client_cfg.iface.as_deref())?,
                alt_iface: None,
            },
            server: Host {
                name: server.to_string(),
                ip: server_ip(number),
                iface: required_iface(server, server_cfg.iface.as_deref())?,
                alt_iface: None,
            },
            alveo_port: None,
            timing: config.timing,
            paths: config.paths.clone(),
            policy: RetryPolicy::default().with_max_attempts(max_attempts),
            cancel,
        })
    }

    /// Runs `body` once per sweep iteration, each into its own result file.
    ///
    /// Stops after `iterations` when given, and otherwise runs until cancelled.
    pub fn sweep<F>(
        &self,
        dir: &Path,
        stem: &str,
        iterations: Option<u32>,
        mut body: F,
    ) -> BenchmarkResult<Vec<PathBuf>>
    where
        F: FnMut(&mut ResultWriter) -> BenchmarkResult<()>,
    {
        let mut written = Vec::new();
        let mut iteration = 0;
        while iterations.map_or(true, |n| iteration < n) {
            if self.cancel.is_cancelled() {
                info!("Sweep cancelled after {iteration} iterations");
                break;
            }

            let mut writer = ResultWriter::create(result_path(dir, stem, iteration))?;
            match body(&mut writer) {
                Ok(()) => {}
                Err(BenchmarkError::Cancelled) => {
                    info!("Sweep cancelled during iteration {iteration}");
                    written.push(writer.path().to_path_buf());
                    break;
                }
                Err(e) => return Err(e),
            }
            info!("Iteration {iteration} complete: {}", writer.path().display());
            written.push(writer.path().to_path_buf());
            iteration += 1;
        }
        Ok(written)
    }
}

fn lookup<'c>(
    config: &'c TestbedConfig,
    name: &str,
) -> BenchmarkResult<&'c crate::config::MachineConfig> {
    config
        .machine(name)
        .ok_or_else(|| BenchmarkError::Configuration(format!("Unknown machine: {name}")))
}

fn required_iface(machine: &str, iface: Option<&str>) -> BenchmarkResult<String> {
    iface.map(str::to_string).ok_or_else(|| {
        BenchmarkError::Configuration(format!("Machine {machine} has no 'iface' configured"))
    })
}
