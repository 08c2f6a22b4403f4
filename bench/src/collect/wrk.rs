//! nginx throughput sweeps driven by wrk.

use std::net::Ipv4Addr;

use log::info;
use nicbench_common::{
    grid::{SCALE_CORES, SCALE_FILE_SIZE},
    GridPoint, ScalePoint, WrkPoint,
};

use super::Session;
use crate::{remote::RemoteShell, types::BenchmarkResult, utils::ResultWriter};

/// Bytes addressable by the wrk path generator.
const PATH_SPACE: u64 = 2_147_483_648;

/// Connections used by the file size sweep.
pub const WRK_CONNECTIONS: u32 = 128;

const WRK_THREADS: u32 = 16;
const WRK_TIMEOUT_SECS: u32 = 100;

/// `worker_cpu_affinity` masks pinning each worker to every other CPU.
#[must_use]
pub fn affinity(cores: u32) -> String {
    if cores <= 1 {
        return "1".to_string();
    }
    (0..cores)
        .map(|i| format!("1{}", "0".repeat(2 * i as usize)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// A single wrk run against `server_ip`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrkRun {
    pub file_size: u64,
    pub connections: u32,
    pub duration_secs: u64,
}

impl WrkRun {
    #[must_use]
    pub fn command(&self, wrk_dir: &str, server_ip: Ipv4Addr) -> String {
        let max_paths = PATH_SPACE / self.file_size.max(1) - 1;
        format!(
            "maxpaths={max_paths} mode=https fsize={fsize} dip1={server_ip} \
             {wrk_dir}/wrk --timeout {WRK_TIMEOUT_SECS} -t {WRK_THREADS} -c {conns} -d {secs} \
             -s {wrk_dir}/http.size.lua https://{server_ip}",
            fsize = self.file_size,
            conns = self.connections,
            secs = self.duration_secs,
        )
    }
}

impl<S: RemoteShell> Session<'_, S> {
    /// Restarts nginx on the server with `cores` pinned workers.
    pub fn restart_nginx(&self, cores: u32) -> BenchmarkResult<()> {
        let server = &self.server.name;
        self.shell.run(server, "sudo killall nginx")?;
        self.shell.spawn(
            server,
            &format!(
                "TBASE={} sudo -E nginx -c {} -g \"worker_processes {cores}; worker_cpu_affinity {};\"",
                self.paths.nginx_base,
                self.paths.nginx_conf,
                affinity(cores)
            ),
        )
    }

    /// Matches the block device read-ahead to the served file size.
    pub fn set_read_ahead(&self, file_size: u64) -> BenchmarkResult<()> {
        self.shell
            .run(
                &self.server.name,
                &format!(
                    "echo {} | sudo tee {}",
                    file_size / 1024,
                    self.paths.read_ahead
                ),
            )
            .map(drop)
    }

    /// Runs wrk on the client and records its full output. wrk runs are not
    /// retried; a failing run aborts the sweep.
    fn wrk_run(&self, writer: &mut ResultWriter, run: WrkRun) -> BenchmarkResult<()> {
        let command = run.command(&self.paths.wrk, self.server.ip);
        let output = self.shell.check(&self.client.name, &command)?;
        writer.write(&output.stderr)?;
        writer.write(&output.stdout)
    }

    /// Sweeps worker counts and file sizes, restarting nginx for each point.
    pub fn wrk_sweep(&self, writer: &mut ResultWriter) -> BenchmarkResult<()> {
        self.shell.run(&self.client.name, "sudo killall wrk")?;
        for point in WrkPoint::grid() {
            self.cancel.check()?;
            self.restart_nginx(point.cores)?;
            self.set_read_ahead(point.file_size)?;
            self.cancel.sleep(self.timing.settle())?;

            info!("wrk cores {} fsize {}", point.cores, point.file_size);
            writer.write_line(&format!("cores {} fsize {},", point.cores, point.file_size))?;
            self.wrk_run(
                writer,
                WrkRun {
                    file_size: point.file_size,
                    connections: WRK_CONNECTIONS,
                    duration_secs: self.timing.wrk_secs,
                },
            )?;
        }
        Ok(())
    }

    /// Sweeps the connection count against a single nginx instance.
    pub fn scale_sweep(&self, writer: &mut ResultWriter) -> BenchmarkResult<()> {
        self.shell.run(&self.client.name, "sudo killall wrk")?;
        self.restart_nginx(SCALE_CORES)?;
        self.cancel.sleep(self.timing.settle())?;

        for point in ScalePoint::grid() {
            self.cancel.check()?;
            info!("wrk conns {}", point.connections);
            writer.write_line(&format!(
                "conns {} cores {SCALE_CORES} fsize {SCALE_FILE_SIZE},",
                point.connections
            ))?;
            self.wrk_run(
                writer,
                WrkRun {
                    file_size: SCALE_FILE_SIZE,
                    connections: point.connections,
                    duration_secs: self.timing.wrk_secs,
                },
            )?;
        }
        Ok(())
    }
}
