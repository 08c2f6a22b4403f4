//! Benchmark modes.
//!
//! Each mode loads the testbed, prepares the link and runs its sweep into
//! per-iteration result files.

use std::path::{Path, PathBuf};

use aggregate::report::{timing_report_path, utilization_report_path, TimingSummary, Utilization};
use chrono::Local;
use log::info;
use nicbench_common::{Direction, Family, IperfPoint, Mtu};

use crate::{
    cli::{BenchCommand, BenchOneArgs, FioArgs, SetupArgs, SweepArgs, TestbedArgs, UtilArgs},
    collect::{iperf::set_mtu, Session},
    config::TestbedConfig,
    remote::RemoteShell,
    retry::CancellationToken,
    types::{BenchmarkError, BenchmarkResult},
    utils::{result_stem, ResultWriter},
};

/// Root of the raw result layout read by the aggregate tool.
pub const DEFAULT_RESULTS_DIR: &str = "csvs";

/// Runs `command` against the testbed through `shell`.
pub fn run<S: RemoteShell>(
    shell: &S,
    command: &BenchCommand,
    cancel: &CancellationToken,
) -> BenchmarkResult<()> {
    match command {
        BenchCommand::Bench(args) => {
            let session = fpga_session(shell, &args.testbed, cancel)?;
            session.prepare_fpga()?;
            sweep(&session, Family::Iperf, args, |s, w| s.iperf_sweep(w, &Mtu::ALL))
        }
        BenchCommand::BenchOne(args) => bench_one(shell, args, cancel),
        BenchCommand::BenchNic(args) => {
            let session = nic_session(shell, &args.testbed, cancel)?;
            session.prepare_nic()?;
            sweep(&session, Family::Iperf, args, |s, w| {
                s.iperf_sweep(w, &[Mtu::Standard])
            })
        }
        BenchCommand::Setup(args) => setup(shell, args, cancel),
        BenchCommand::SetupNic(args) => {
            nic_session(shell, args, cancel)?.prepare_nic()?;
            info!("Setup complete");
            Ok(())
        }
        BenchCommand::Fio(args) => fio(shell, args, cancel),
        BenchCommand::NginxWrk(args) => {
            let session = fpga_session(shell, &args.testbed, cancel)?;
            sweep(&session, Family::NginxWrk, args, |s, w| s.wrk_sweep(w))
        }
        BenchCommand::NginxScale(args) => {
            let session = fpga_session(shell, &args.testbed, cancel)?;
            sweep(&session, Family::NginxScale, args, |s, w| s.scale_sweep(w))
        }
        BenchCommand::Util(args) => util(args),
    }
}

fn load_testbed(path: &Path) -> BenchmarkResult<TestbedConfig> {
    TestbedConfig::load_from_file(path)
        .map_err(|e| BenchmarkError::Configuration(format!("{e:#}")))
}

fn fpga_session<'a, S: RemoteShell>(
    shell: &'a S,
    args: &TestbedArgs,
    cancel: &CancellationToken,
) -> BenchmarkResult<Session<'a, S>> {
    let config = load_testbed(&args.config)?;
    Session::fpga(
        shell,
        &config,
        &args.machine,
        args.server_machine.as_deref(),
        args.max_attempts,
        cancel.clone(),
    )
}

fn nic_session<'a, S: RemoteShell>(
    shell: &'a S,
    args: &TestbedArgs,
    cancel: &CancellationToken,
) -> BenchmarkResult<Session<'a, S>> {
    let server = args.server_machine.as_deref().ok_or_else(|| {
        BenchmarkError::Configuration(
            "--server-machine is required between commodity NICs".to_string(),
        )
    })?;
    let config = load_testbed(&args.config)?;
    Session::nic(
        shell,
        &config,
        &args.machine,
        server,
        args.max_attempts,
        cancel.clone(),
    )
}

fn output_dir(args: &SweepArgs, family: Family) -> PathBuf {
    args.output_dir
        .clone()
        .unwrap_or_else(|| Path::new(DEFAULT_RESULTS_DIR).join(family.dir_name()))
}

/// Repeats `body` into fresh result files named after `family`.
fn sweep<S, F>(
    session: &Session<'_, S>,
    family: Family,
    args: &SweepArgs,
    mut body: F,
) -> BenchmarkResult<()>
where
    S: RemoteShell,
    F: FnMut(&Session<'_, S>, &mut ResultWriter) -> BenchmarkResult<()>,
{
    let stem = result_stem(
        family.file_prefix(),
        args.name.as_deref(),
        &args.testbed.machine,
        Local::now(),
    );
    let dir = output_dir(args, family);
    info!(
        "Sweeping {family} between {} and {} into {}",
        session.client.name,
        session.server.name,
        dir.display()
    );

    let files = session.sweep(&dir, &stem, args.iterations, |writer| body(session, writer))?;
    info!("{family} sweep finished, {} result files", files.len());
    Ok(())
}

fn setup<S: RemoteShell>(
    shell: &S,
    args: &SetupArgs,
    cancel: &CancellationToken,
) -> BenchmarkResult<()> {
    fpga_session(shell, &args.testbed, cancel)?.setup_without_reset(args.mtu)?;
    info!("Setup complete");
    Ok(())
}

fn bench_one<S: RemoteShell>(
    shell: &S,
    args: &BenchOneArgs,
    cancel: &CancellationToken,
) -> BenchmarkResult<()> {
    let session = fpga_session(shell, &args.testbed, cancel)?;
    session.setup_without_reset(args.mtu)?;
    set_mtu(shell, &session.server, args.mtu)?;
    set_mtu(shell, &session.client, args.mtu)?;

    let mut writer = ResultWriter::create(args.output.clone())?;
    for direction in Direction::ALL {
        let gbps = session.iperf_point(IperfPoint {
            mtu: args.mtu,
            duplex: args.duplex,
            direction,
            parallel: args.parallel,
        })?;
        info!("{direction}: {gbps} Gbits/sec");
        writer.write(&format!("{gbps},"))?;
    }
    Ok(())
}

fn fio<S: RemoteShell>(
    shell: &S,
    args: &FioArgs,
    cancel: &CancellationToken,
) -> BenchmarkResult<()> {
    if !args.fio_job.is_file() {
        return Err(BenchmarkError::Configuration(format!(
            "fio job file not found: {}",
            args.fio_job.display()
        )));
    }

    let session = fpga_session(shell, &args.sweep.testbed, cancel)?;
    session.prepare_fpga()?;
    session.fio_setup(&args.fio_job)?;
    sweep(&session, Family::Fio, &args.sweep, |s, w| s.fio_sweep(w))
}

fn util(args: &UtilArgs) -> BenchmarkResult<()> {
    let utilization = Utilization::load(&utilization_report_path(&args.corundum_path))?;
    let timing = TimingSummary::load(&timing_report_path(&args.corundum_path))?;
    println!("{utilization}");
    println!("{timing}");
    Ok(())
}
