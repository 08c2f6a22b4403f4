//! iperf throughput sweep.
//!
//! Each grid point starts a fresh `iperf -s` on the receiving machine, runs
//! the client on the sending one and records the reported Gbits/sec.

use log::{debug, info};
use nicbench_common::{
    grid::{GridPoint, IPERF_ROW_COLUMNS},
    Direction, IperfPoint, Mtu,
};

use super::{Host, Session};
use crate::{
    remote::RemoteShell,
    retry::retry,
    types::{BenchmarkError, BenchmarkResult},
    utils::ResultWriter,
};

/// Port the iperf server listens on.
pub const IPERF_PORT: u16 = 5001;

/// Second line of every MTU block.
pub const ROW_HEADER: &str =
    "parallel connections, tx half-duplex, rx half-duplex, tx full-duplex, rx full-duplex,";

const RATE_UNIT: &str = "Gbits/sec";
const SUM_MARKER: &str = "[SUM]";

/// Extracts the sender-side throughput from iperf client output.
///
/// With one connection the report of the stream connected to the receiver's
/// listening port is used; with several, the `[SUM]` line. Returns `None`
/// when the expected lines are missing.
#[must_use]
pub fn parse_gbps(output: &str, receiver_ip: &str, connections: u8) -> Option<f64> {
    let line = if connections == 1 {
        let connected = format!("{receiver_ip} port {IPERF_PORT}");
        let id = output
            .lines()
            .find(|l| l.contains(&connected))
            .and_then(stream_id)?;
        output
            .lines()
            .find(|l| l.contains(RATE_UNIT) && stream_id(l) == Some(id))?
    } else {
        output.lines().find(|l| l.contains(SUM_MARKER))?
    };
    aggregate::extract::numbers(line).last().copied()
}

/// The `N` of a line starting with `[  N]`.
fn stream_id(line: &str) -> Option<u32> {
    let rest = line.trim_start().strip_prefix('[')?;
    let (id, _) = rest.split_once(']')?;
    id.trim().parse().ok()
}

/// Pids of iperf processes in `ps aux` output.
fn iperf_pids(ps: &str) -> Vec<&str> {
    ps.lines()
        .filter(|l| l.contains("iperf"))
        .filter_map(|l| l.split_whitespace().nth(1))
        .filter(|pid| pid.chars().all(|c| c.is_ascii_digit()))
        .collect()
}

/// Kills iperf processes left over from an earlier point.
pub fn kill_stale<S: RemoteShell>(shell: &S, host: &str) -> BenchmarkResult<()> {
    let ps = shell.run(host, "ps aux | grep '[i]perf'")?;
    let pids = iperf_pids(&ps.stdout);
    if !pids.is_empty() {
        debug!("Killing stale iperf on {host}: {}", pids.join(" "));
        shell.run(host, &format!("kill -9 {}", pids.join(" ")))?;
    }
    Ok(())
}

/// Sets the MTU on the first of `host`'s interfaces that accepts it.
pub fn set_mtu<S: RemoteShell>(shell: &S, host: &Host, mtu: Mtu) -> BenchmarkResult<()> {
    let mut last = None;
    for iface in host.ifaces() {
        match shell.check(&host.name, &format!("sudo ip link set {iface} mtu {mtu}")) {
            Ok(_) => return Ok(()),
            Err(e) => last = Some(e),
        }
    }
    Err(last.unwrap_or_else(|| {
        BenchmarkError::Configuration(format!("No interface configured on {}", host.name))
    }))
}

impl<S: RemoteShell> Session<'_, S> {
    /// Measures one point, retrying until iperf reports a rate.
    pub fn iperf_point(&self, point: IperfPoint) -> BenchmarkResult<f64> {
        let (sender, receiver) = match point.direction {
            Direction::Tx => (&self.client, &self.server),
            Direction::Rx => (&self.server, &self.client),
        };
        let n = point.parallel;
        let operation = format!("iperf {} {} -P {n}", point.direction, point.duplex);

        let gbps = retry(&self.policy, &self.cancel, &operation, |_| {
            kill_stale(self.shell, &sender.name)?;
            kill_stale(self.shell, &receiver.name)?;
            self.cancel.sleep(self.timing.wait())?;

            self.shell.spawn(
                &receiver.name,
                &format!("iperf -s -P {n} -c {}", sender.ip),
            )?;
            self.cancel.sleep(self.timing.wait())?;

            let mut command = format!("iperf -c {} -P {n}", receiver.ip);
            let flag = point.duplex.iperf_flag();
            if !flag.is_empty() {
                command.push(' ');
                command.push_str(flag);
            }
            command.push_str(&format!(" -t {}", self.timing.bench_secs));
            let output = self.shell.run(&sender.name, &command)?;
            parse_gbps(&output.stdout, &receiver.ip.to_string(), n).ok_or_else(|| {
                BenchmarkError::missing_output(&sender.name, "no iperf throughput report")
            })
        })?;

        debug!("{operation}: {gbps} Gbits/sec");
        self.cancel.sleep(self.timing.sleep())?;
        Ok(gbps)
    }

    /// Sweeps every connection count and duplex mode for each of `mtus`.
    pub fn iperf_sweep(&self, writer: &mut ResultWriter, mtus: &[Mtu]) -> BenchmarkResult<()> {
        for &mtu in mtus {
            info!("iperf sweep at MTU {mtu}");
            writer.write_line(&format!("mtu {mtu},"))?;
            writer.write_line(ROW_HEADER)?;
            set_mtu(self.shell, &self.server, mtu)?;
            set_mtu(self.shell, &self.client, mtu)?;

            let points: Vec<IperfPoint> = IperfPoint::grid()
                .into_iter()
                .filter(|p| p.mtu == mtu)
                .collect();
            for row in points.chunks(IPERF_ROW_COLUMNS.len()) {
                let Some(first) = row.first() else { continue };
                writer.write(&format!("{},", first.axis_value()))?;
                for &point in row {
                    let gbps = self.iperf_point(point)?;
                    writer.write(&format!("{gbps},"))?;
                }
                writer.write_line("")?;
            }
            writer.write_line("")?;
        }
        Ok(())
    }
}
