//! Benchmark Result Aggregator
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin aggregate -- fio --input scripts/csvs --output scripts/aggregated
//! cargo run --bin aggregate -- all --input scripts/csvs --classifier rules.json --skip-malformed
//! ```

use aggregate::{
    cli::Cli, init_logging, AggregateError, AggregateOptions, Aggregator, Classifier, Result,
};
use clap::Parser;
use log::{error, info, warn};

fn run(cli: &Cli) -> Result<()> {
    let (families, args) = cli.command.families();

    let classifier = match &args.classifier {
        Some(path) => Classifier::load_from_file(path)?,
        None => Classifier::default(),
    };
    let options = AggregateOptions {
        skip_malformed: args.skip_malformed,
        stddev_warn: args.stddev_warn,
    };
    let aggregator = Aggregator::new(classifier, options);

    for family in families {
        info!("Aggregating {family} results");
        let reports = aggregator.run_family(family, &args.input, &args.output)?;
        if reports.is_empty() {
            warn!("No {family} results found under {}", args.input.display());
        }
        for report in reports {
            info!(
                "{}: {} files, {} skipped, {} tables",
                report.input.display(),
                report.accepted.len(),
                report.skipped.len(),
                report.tables.len()
            );
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    init_logging()?;

    let cli = Cli::parse();
    let result = run(&cli);

    if let Err(ref e) = result {
        error!("Aggregation failed: {e}");

        match e.inner() {
            inner if inner.is_structural() => {
                error!("A raw result file is incomplete or was written by a different collector version");
                error!("Remove or fix it, or rerun with --skip-malformed to leave it out");
            }
            AggregateError::AmbiguousVariant { .. } => {
                error!("Please rename the file so that exactly one variant tag matches");
            }
            AggregateError::General(_) | AggregateError::Configuration(_) => {
                error!("Please check the classifier rules file");
            }
            _ => {}
        }

        std::process::exit(1);
    }

    info!("Aggregation completed successfully");
    Ok(())
}
