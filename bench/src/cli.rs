//! Command-line interface definitions for the benchmark driver

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use nicbench_common::{Duplex, Mtu};

/// NIC Benchmark Driver
///
/// Prepares the FPGA or commodity NIC of a testbed machine and sweeps iperf,
/// fio and wrk benchmarks against a server machine over SSH.
#[derive(Parser, Debug)]
#[command(
    version,
    about = "NIC benchmark driver - iperf, fio and nginx sweeps over SSH",
    long_about = "
Drives benchmark sweeps between a client machine carrying the NIC under test
and a server machine, both reachable with passwordless SSH.

Every sweep iteration is written to its own raw result file,
<prefix>[_<name>]_<machine>_<MMDD_HHMM>_<iteration>.csv, which the aggregate
tool reads back. Sweeps repeat until --iterations is reached or Ctrl-C is
pressed; the current iteration's file keeps every completed point.

Machine addresses are derived from machine names: f03 uses 10.103.41.0/24,
j11 uses 10.121.41.0/24, with .1 on the server and .2 on the client.
"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: BenchCommand,
}

/// Available benchmark modes
#[derive(Subcommand, Debug)]
pub enum BenchCommand {
    /// Reset the FPGA NIC and sweep iperf over both MTUs
    Bench(SweepArgs),

    /// Measure a single iperf point in both directions
    ///
    /// Reloads the driver without a hot reset and writes both rates to one file.
    BenchOne(BenchOneArgs),

    /// Sweep iperf between two commodity NICs at MTU 1500
    BenchNic(SweepArgs),

    /// Reload the FPGA NIC driver and bring up both ends of the link
    Setup(SetupArgs),

    /// Bring up the link between two commodity NICs
    SetupNic(TestbedArgs),

    /// Reset the FPGA NIC and sweep fio block sizes and queue depths
    Fio(FioArgs),

    /// Sweep nginx worker counts and file sizes with wrk
    NginxWrk(SweepArgs),

    /// Sweep wrk connection counts against 8 nginx workers
    NginxScale(SweepArgs),

    /// Print resource utilization and timing of an implemented design
    Util(UtilArgs),
}

/// Arguments selecting the machines under test
#[derive(Args, Debug, Clone)]
pub struct TestbedArgs {
    /// Path to testbed configuration file (JSON format)
    #[arg(long, default_value = "testbed.json", value_name = "FILE")]
    pub config: PathBuf,

    /// Client machine carrying the NIC under test (e.g. f03)
    #[arg(long, value_name = "MACHINE")]
    pub machine: String,

    /// Server machine at the other end of the link
    ///
    /// Defaults to the testbed's default server; required for commodity NIC
    /// modes.
    #[arg(long, value_name = "MACHINE")]
    pub server_machine: Option<String>,

    /// Attempts per step before giving up
    ///
    /// Failed steps are retried until they succeed when not given.
    #[arg(long, value_name = "COUNT")]
    pub max_attempts: Option<u32>,
}

/// Arguments for sweep modes
#[derive(Args, Debug, Clone)]
pub struct SweepArgs {
    #[command(flatten)]
    pub testbed: TestbedArgs,

    /// Tag included in result file names, e.g. the variant (corig, csf, mel)
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Number of sweep iterations; runs until interrupted when not given
    #[arg(long, value_name = "COUNT")]
    pub iterations: Option<u32>,

    /// Directory for raw result files
    ///
    /// Defaults to `csvs/<benchmark>`, the layout read by the aggregate tool.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

/// Arguments for the single point mode
#[derive(Args, Debug, Clone)]
pub struct BenchOneArgs {
    #[command(flatten)]
    pub testbed: TestbedArgs,

    /// Link MTU (1500 or 9000)
    #[arg(long, default_value = "9000", value_name = "BYTES")]
    pub mtu: Mtu,

    /// Duplex mode (half or full)
    #[arg(long, default_value = "half", value_name = "MODE")]
    pub duplex: Duplex,

    /// Number of parallel iperf connections
    #[arg(long, default_value = "5", value_parser = clap::value_parser!(u8).range(1..=64), value_name = "COUNT")]
    pub parallel: u8,

    /// Output file for the two rates
    #[arg(long, default_value = "temp.csv", value_name = "FILE")]
    pub output: PathBuf,
}

/// Arguments for FPGA setup
#[derive(Args, Debug, Clone)]
pub struct SetupArgs {
    #[command(flatten)]
    pub testbed: TestbedArgs,

    /// MTU of the client interface (1500 or 9000)
    #[arg(long, default_value = "9000", value_name = "BYTES")]
    pub mtu: Mtu,
}

/// Arguments for the fio sweep
#[derive(Args, Debug, Clone)]
pub struct FioArgs {
    #[command(flatten)]
    pub sweep: SweepArgs,

    /// fio job file copied to the client's home directory
    ///
    /// The job reads `BLOCKSIZE` and `IODEPTH` from the environment.
    #[arg(long, default_value = "scripts/custom.fio", value_name = "FILE")]
    pub fio_job: PathBuf,
}

/// Arguments for printing implementation reports
#[derive(Args, Debug, Clone)]
pub struct UtilArgs {
    /// Corundum checkout holding the implementation run
    #[arg(long, default_value = "corundum", value_name = "DIR")]
    pub corundum_path: PathBuf,
}
