//! Command-line interface definitions for the aggregation tool

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use nicbench_common::Family;

/// Benchmark Result Aggregator
///
/// Reads raw fio, iperf and wrk results of the compared NIC variants and writes
/// long-format, tab-separated tables for the plotting scripts.
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Aggregate raw NIC benchmark results into long-format tables",
    long_about = "
Aggregates raw benchmark results collected for the compared NIC variants.

Each raw result file is assigned to a variant by its file name (by default
'corig', 'csf' and 'mel'), parsed positionally over the benchmark's parameter
grid, and written as one table row per sample. Summaries and comparisons
between variants are logged.

Expected input layout:
  fio/{rx,tx}/*.csv  iperf/*.csv  nginx_wrk/{rx,tx}/*.csv  nginx_scale/*.csv
"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: AggregateCommand,
}

/// Benchmark families to aggregate
#[derive(Subcommand, Debug)]
pub enum AggregateCommand {
    /// Aggregate fio block device results (throughput and IOPS)
    Fio(AggregateArgs),

    /// Aggregate iperf results for both MTUs and duplex modes
    Iperf(AggregateArgs),

    /// Aggregate nginx results across file sizes
    NginxWrk(AggregateArgs),

    /// Aggregate nginx results across connection counts
    NginxScale(AggregateArgs),

    /// Aggregate every family found under the input directory
    All(AggregateArgs),
}

impl AggregateCommand {
    /// Families selected by the command, with its arguments.
    #[must_use]
    pub fn families(&self) -> (Vec<Family>, &AggregateArgs) {
        match self {
            Self::Fio(args) => (vec![Family::Fio], args),
            Self::Iperf(args) => (vec![Family::Iperf], args),
            Self::NginxWrk(args) => (vec![Family::NginxWrk], args),
            Self::NginxScale(args) => (vec![Family::NginxScale], args),
            Self::All(args) => (Family::ALL.to_vec(), args),
        }
    }
}

/// Arguments shared by all aggregation commands
#[derive(Args, Debug, Clone)]
pub struct AggregateArgs {
    /// Root directory of the raw result files
    ///
    /// Each family is read from its own sub-directory, e.g. `fio/rx`.
    #[arg(long, value_name = "DIR")]
    pub input: PathBuf,

    /// Directory for the aggregated tables
    ///
    /// Tables are written to a sub-directory per family.
    #[arg(long, default_value = "aggregated", value_name = "DIR")]
    pub output: PathBuf,

    /// Classification rules (JSON format)
    ///
    /// Defaults to one rule per variant tag: corig, csf and mel.
    #[arg(long, value_name = "FILE")]
    pub classifier: Option<PathBuf>,

    /// Skip files with an unexpected structure instead of aborting
    #[arg(long)]
    pub skip_malformed: bool,

    /// Warn about groups whose standard deviation exceeds this value
    #[arg(long, default_value = "10.0", value_name = "VALUE")]
    pub stddev_warn: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all() {
        let cli = Cli::try_parse_from([
            "aggregate",
            "all",
            "--input",
            "csvs",
            "--skip-malformed",
            "--stddev-warn",
            "2.5",
        ])
        .unwrap();
        let (families, args) = cli.command.families();
        assert_eq!(families.len(), 4);
        assert_eq!(args.output, PathBuf::from("aggregated"));
        assert!(args.skip_malformed);
        assert_eq!(args.stddev_warn, 2.5);
    }

    #[test]
    fn test_input_is_required() {
        assert!(Cli::try_parse_from(["aggregate", "fio"]).is_err());
        let cli = Cli::try_parse_from(["aggregate", "nginx-scale", "--input", "x"]).unwrap();
        assert_eq!(cli.command.families().0, [Family::NginxScale]);
    }
}
