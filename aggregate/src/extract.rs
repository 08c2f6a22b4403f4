//! Numeric token extraction and bandwidth unit normalization.
//!
//! Every metric is read positionally: a line must carry exactly the expected
//! number of numeric tokens, and the metric is the token at a fixed index.
//! Bandwidth values are converted to Gbps.

use std::{fmt, sync::LazyLock};

use regex::Regex;

use crate::error::{AggregateError, Result};

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-+]?(?:\d*\.\d+|\d+)").expect("valid number pattern"));

/// Returns every integer or decimal token of `line`, in order.
#[must_use]
pub fn numbers(line: &str) -> Vec<f64> {
    NUMBER_RE
        .find_iter(line)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

/// Returns the numeric tokens of `line`, failing unless there are exactly `expected`.
pub fn expect_tokens(line: &str, expected: usize) -> Result<Vec<f64>> {
    let tokens = numbers(line);
    if tokens.len() != expected {
        return Err(AggregateError::TokenCount {
            line: line.trim().to_string(),
            expected,
            found: tokens.len(),
        });
    }
    Ok(tokens)
}

/// Bandwidth units found in raw tool output.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BandwidthUnit {
    /// fio `KiB/s`
    KibPerSec,
    /// fio `MiB/s`
    MibPerSec,
    /// wrk `MB` (per second)
    Megabytes,
    /// wrk `GB` (per second)
    Gigabytes,
}

impl BandwidthUnit {
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::KibPerSec => "KiB/s",
            Self::MibPerSec => "MiB/s",
            Self::Megabytes => "MB",
            Self::Gigabytes => "GB",
        }
    }

    /// Converts a value in this unit to Gbps.
    #[must_use]
    pub fn to_gbps(self, value: f64) -> f64 {
        match self {
            Self::KibPerSec => value / 1024.0 / 1024.0 * 8.0,
            Self::MibPerSec | Self::Megabytes => value / 1024.0 * 8.0,
            Self::Gigabytes => value * 8.0,
        }
    }

    /// Finds the first of `allowed` that occurs in `line`.
    pub fn detect(line: &str, allowed: &[Self]) -> Result<Self> {
        allowed
            .iter()
            .copied()
            .find(|unit| line.contains(unit.suffix()))
            .ok_or_else(|| AggregateError::UnknownUnit {
                line: line.trim().to_string(),
                allowed: allowed
                    .iter()
                    .map(|u| u.suffix())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

impl fmt::Display for BandwidthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Where a named metric sits on a line of tool output.
#[derive(Copy, Clone, Debug)]
pub struct MetricSpec {
    /// Metric name, also used as the value column header.
    pub name: &'static str,
    /// Exact number of numeric tokens on the line.
    pub tokens: usize,
    /// Index of the metric among those tokens.
    pub index: usize,
    /// Units the value may carry; empty for unitless metrics.
    pub units: &'static [BandwidthUnit],
}

/// fio `bw (  KiB/s): min=.., max=.., per=..%, avg=.., stdev=.., samples=..`
pub const FIO_BANDWIDTH: MetricSpec = MetricSpec {
    name: "throughput",
    tokens: 6,
    index: 3,
    units: &[BandwidthUnit::KibPerSec, BandwidthUnit::MibPerSec],
};

/// fio `iops        : min=.., max=.., avg=.., stdev=.., samples=..`
pub const FIO_IOPS: MetricSpec = MetricSpec {
    name: "IOPS",
    tokens: 5,
    index: 2,
    units: &[],
};

/// wrk `Transfer/sec:      1.10GB`
pub const WRK_TRANSFER: MetricSpec = MetricSpec {
    name: "throughput",
    tokens: 1,
    index: 0,
    units: &[BandwidthUnit::Megabytes, BandwidthUnit::Gigabytes],
};

impl MetricSpec {
    /// Extracts the metric from `line`, normalized to Gbps if it carries a unit.
    pub fn extract(&self, line: &str) -> Result<f64> {
        let tokens = expect_tokens(line, self.tokens)?;
        let value = tokens
            .get(self.index)
            .copied()
            .ok_or_else(|| AggregateError::TokenCount {
                line: line.trim().to_string(),
                expected: self.index + 1,
                found: tokens.len(),
            })?;

        if self.units.is_empty() {
            return Ok(value);
        }
        let unit = BandwidthUnit::detect(line, self.units)?;
        Ok(unit.to_gbps(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_numbers() {
        assert_eq!(numbers("bw=100KiB/s iops=50"), vec![100.0, 50.0]);
        assert_eq!(numbers("avg=51898.05, stdev=-812.23"), vec![51898.05, -812.23]);
        assert_eq!(numbers("delta -3 and +.5"), vec![-3.0, 0.5]);
        assert!(numbers("no digits here").is_empty());
    }

    #[test]
    fn test_unit_conversion() {
        for value in [0.0, 1.0, 100.0, 51898.05, 1e9] {
            assert!(close(
                BandwidthUnit::KibPerSec.to_gbps(value),
                value / 1024.0 / 1024.0 * 8.0
            ));
            assert!(close(
                BandwidthUnit::MibPerSec.to_gbps(value),
                value / 1024.0 * 8.0
            ));
            assert!(close(
                BandwidthUnit::Megabytes.to_gbps(value),
                value / 1024.0 * 8.0
            ));
            assert!(close(BandwidthUnit::Gigabytes.to_gbps(value), value * 8.0));
        }
    }

    #[test]
    fn test_fio_lines() {
        let bw = "   bw (  MiB/s): min= 1512, max= 1620, per=100.00%, avg=1580.25, stdev=20.10, samples=119";
        let gbps = FIO_BANDWIDTH.extract(bw).unwrap();
        assert!(close(gbps, 1580.25 / 1024.0 * 8.0));

        let iops = "   iops        : min=12442, max=13348, avg=12974.51, stdev=203.06, samples=119";
        assert!(close(FIO_IOPS.extract(iops).unwrap(), 12974.51));
    }

    #[test]
    fn test_wrk_line() {
        let gb = WRK_TRANSFER.extract("Transfer/sec:      1.25GB").unwrap();
        assert!(close(gb, 10.0));
        let mb = WRK_TRANSFER.extract("Transfer/sec:    512.00MB").unwrap();
        assert!(close(mb, 4.0));
    }

    #[test]
    fn test_token_count_mismatch() {
        let err = FIO_IOPS.extract("iops: avg=10").unwrap_err();
        assert!(matches!(
            err,
            AggregateError::TokenCount {
                expected: 5,
                found: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_unit() {
        let spec = MetricSpec {
            name: "throughput",
            tokens: 2,
            index: 0,
            units: &[BandwidthUnit::KibPerSec, BandwidthUnit::MibPerSec],
        };
        let err = spec.extract("bw=100bps iops=50").unwrap_err();
        assert!(matches!(err, AggregateError::UnknownUnit { .. }));
        assert!(err.is_structural());
    }
}
