//! Aggregation runs.
//!
//! A run snapshots the raw result files of one directory, classifies them,
//! parses every accepted file, groups the samples and writes the long-format
//! tables. Comparisons between variants are logged, not persisted.

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info, warn};
use nicbench_common::{Direction, Family, GridPoint, Variant};

use crate::{
    classify::Classifier,
    error::{AggregateError, Result},
    family::{FioFormat, IperfFormat, ResultFormat, ScaleFormat, WrkFormat},
    group::{Dataset, SampleRecord, Samples},
    stats::format_optional,
    table::LongTable,
};

/// Extension of raw result files.
pub const RAW_EXTENSION: &str = "csv";

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AggregateOptions {
    /// Skip files with a structural mismatch instead of aborting.
    pub skip_malformed: bool,
    /// Groups with a larger standard deviation are reported.
    pub stddev_warn: f64,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            skip_malformed: false,
            stddev_warn: 10.0,
        }
    }
}

/// A raw result file and the variant it was classified as.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResultFile {
    pub path: PathBuf,
    pub variant: Variant,
}

/// Outcome of aggregating one input directory.
#[derive(Clone, Debug, Default)]
pub struct AggregationReport {
    pub input: PathBuf,
    pub direction: Option<Direction>,
    /// Files whose samples made it into the tables.
    pub accepted: Vec<RawResultFile>,
    /// Malformed files left out with `skip_malformed`.
    pub skipped: Vec<PathBuf>,
    pub tables: Vec<PathBuf>,
}

impl AggregationReport {
    #[must_use]
    pub fn files_of(&self, variant: Variant) -> usize {
        self.accepted.iter().filter(|f| f.variant == variant).count()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Aggregator {
    classifier: Classifier,
    options: AggregateOptions,
}

impl Aggregator {
    #[must_use]
    pub fn new(classifier: Classifier, options: AggregateOptions) -> Self {
        Self {
            classifier,
            options,
        }
    }

    /// Lists the classified raw result files of `dir` in name order.
    ///
    /// Files matching no rule are left out.
    pub fn scan(&self, dir: &Path) -> Result<Vec<RawResultFile>> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == RAW_EXTENSION) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            match self.classifier.classify_path(&path) {
                Ok(Some(variant)) => {
                    debug!("{} -> {variant}", path.display());
                    files.push(RawResultFile { path, variant });
                }
                Ok(None) => debug!("Ignoring unclassified file {}", path.display()),
                Err(e) => return Err(AggregateError::in_file(path, e)),
            }
        }
        Ok(files)
    }

    /// Parses every file into one dataset.
    ///
    /// Returns the dataset with the files that were accepted and skipped.
    pub fn collect<F: ResultFormat>(
        &self,
        format: &F,
        files: Vec<RawResultFile>,
    ) -> Result<(Dataset<F::Point>, Vec<RawResultFile>, Vec<PathBuf>)> {
        let mut dataset = Dataset::default();
        let mut accepted = Vec::with_capacity(files.len());
        let mut skipped = Vec::new();

        for file in files {
            let content = fs::read_to_string(&file.path)
                .map_err(|e| AggregateError::in_file(&file.path, e.into()))?;

            let readings = match format.parse(&content) {
                Ok(readings) => readings,
                Err(e) => {
                    let e = AggregateError::in_file(&file.path, e);
                    if self.options.skip_malformed && e.is_structural() {
                        warn!("Skipping malformed file {e}");
                        skipped.push(file.path);
                        continue;
                    }
                    return Err(e);
                }
            };

            debug!(
                "{}: {} readings",
                file.path.display(),
                readings.len()
            );
            for reading in readings {
                dataset.insert(
                    reading.metric,
                    SampleRecord {
                        point: reading.point,
                        variant: file.variant,
                        value: reading.value,
                    },
                );
            }
            accepted.push(file);
        }

        Ok((dataset, accepted, skipped))
    }

    /// Writes every table of `format` for `direction` into `out_dir`.
    pub fn write_tables<F: ResultFormat>(
        &self,
        format: &F,
        dataset: &Dataset<F::Point>,
        direction: Option<Direction>,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(out_dir)?;

        let empty = Samples::default();
        let mut written = Vec::new();
        for plan in format.tables(direction) {
            let samples = dataset.metric(plan.metric).unwrap_or(&empty);
            let table = LongTable::from_samples(&plan, samples);
            let path = out_dir.join(&plan.file_name);
            table.save(&path)?;
            info!("{} rows -> {}", table.rows.len(), path.display());
            written.push(path);
        }
        Ok(written)
    }

    /// Aggregates the raw results in `input` into tables in `out_dir`.
    pub fn run<F: ResultFormat>(
        &self,
        format: &F,
        input: &Path,
        direction: Option<Direction>,
        out_dir: &Path,
    ) -> Result<AggregationReport> {
        let files = self.scan(input)?;
        info!(
            "Aggregating {} result files from {}",
            files.len(),
            input.display()
        );

        let (dataset, accepted, skipped) = self.collect(format, files)?;
        let mut report = AggregationReport {
            input: input.to_path_buf(),
            direction,
            accepted,
            skipped,
            tables: Vec::new(),
        };

        info!(
            "Files per variant: baseline {}, modified {}, reference {}",
            report.files_of(Variant::Baseline),
            report.files_of(Variant::Modified),
            report.files_of(Variant::Reference)
        );
        if !report.skipped.is_empty() {
            warn!("{} malformed files skipped", report.skipped.len());
        }

        for (metric, samples) in dataset.metrics() {
            self.log_summary(metric, samples);
        }

        report.tables = self.write_tables(format, &dataset, direction, out_dir)?;
        Ok(report)
    }

    fn log_summary<P: GridPoint>(&self, metric: &str, samples: &Samples<P>) {
        info!(
            "{metric}: samples per variant: baseline {}, modified {}, reference {}",
            samples.count(Variant::Baseline),
            samples.count(Variant::Modified),
            samples.count(Variant::Reference)
        );

        for row in samples.summaries() {
            debug!(
                "{metric} {:?} {}: n={} mean={:.4} std={:.4}",
                row.point, row.variant, row.summary.count, row.summary.mean, row.summary.stddev
            );
            if row.summary.stddev > self.options.stddev_warn {
                warn!(
                    "{metric} {:?} {}: high deviation, mean {:.2} std {:.2}",
                    row.point, row.variant, row.summary.mean, row.summary.stddev
                );
            }
        }

        for (point, group) in samples {
            let comparison = group.comparison();
            if comparison.is_empty() {
                continue;
            }
            info!(
                "{metric} {:?}: modified/baseline-1 {}, dev(baseline) {}, dev(modified) {}, modified/reference-1 {}",
                point,
                format_optional(comparison.relative_to_baseline),
                format_optional(comparison.deviations_baseline),
                format_optional(comparison.deviations_modified),
                format_optional(comparison.relative_to_reference)
            );
        }
    }

    /// Aggregates one family under `input_root` into `out_root/<family>/`.
    ///
    /// Directional families are aggregated per `rx`/`tx` sub-directory; a
    /// missing directory is skipped with a warning.
    pub fn run_family(
        &self,
        family: Family,
        input_root: &Path,
        out_root: &Path,
    ) -> Result<Vec<AggregationReport>> {
        let input = input_root.join(family.dir_name());
        let out_dir = out_root.join(family.dir_name());

        let inputs: Vec<(PathBuf, Option<Direction>)> = if family.is_directional() {
            Direction::ALL
                .into_iter()
                .map(|d| (input.join(d.as_str()), Some(d)))
                .collect()
        } else {
            vec![(input, None)]
        };

        let mut reports = Vec::new();
        for (dir, direction) in inputs {
            if !dir.is_dir() {
                warn!("No {family} results in {}, skipping", dir.display());
                continue;
            }
            let report = match family {
                Family::Fio => self.run(&FioFormat::new()?, &dir, direction, &out_dir)?,
                Family::Iperf => self.run(&IperfFormat, &dir, direction, &out_dir)?,
                Family::NginxWrk => self.run(&WrkFormat, &dir, direction, &out_dir)?,
                Family::NginxScale => self.run(&ScaleFormat, &dir, direction, &out_dir)?,
            };
            reports.push(report);
        }
        Ok(reports)
    }
}
