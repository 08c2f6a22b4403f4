//! iperf results.
//!
//! One file holds both MTUs, each as an 11-line block:
//!
//! ```text
//! mtu 1500,
//! parallel connections, tx half-duplex, rx half-duplex, tx full-duplex, rx full-duplex,
//! 1,9.41,9.40,9.12,9.08,
//! ...
//! 8,9.39,9.41,9.35,9.30,
//!
//! ```
//!
//! Values are already in Gbps.

use nicbench_common::{
    grid::{IPERF_MAX_PARALLEL, IPERF_ROW_COLUMNS},
    Direction, Duplex, IperfPoint, Mtu, Variant,
};

use super::{Reading, ResultFormat, TablePlan};
use crate::{
    error::{AggregateError, Result},
    extract::expect_tokens,
};

/// Lines per MTU block: marker, header, one row per connection count, blank.
pub const BLOCK_LINES: usize = 3 + IPERF_MAX_PARALLEL as usize;

/// Lines in a complete iperf result file.
pub const EXPECTED_LINES: usize = BLOCK_LINES * Mtu::ALL.len();

/// Numeric tokens on a data row: the connection count and four speeds.
const ROW_TOKENS: usize = 1 + IPERF_ROW_COLUMNS.len();

pub const METRIC: &str = "speed";

#[derive(Debug, Clone, Default)]
pub struct IperfFormat;

impl IperfFormat {
    fn check_block_header(line: &str, mtu: Mtu) -> Result<()> {
        let tokens = expect_tokens(line, 1)?;
        if !line.trim_start().starts_with("mtu") || tokens[0] != f64::from(mtu.bytes()) {
            return Err(AggregateError::UnexpectedValue {
                line: line.trim().to_string(),
                message: format!("expected block header 'mtu {mtu}'"),
            });
        }
        Ok(())
    }
}

impl ResultFormat for IperfFormat {
    type Point = IperfPoint;

    fn parse(&self, content: &str) -> Result<Vec<Reading<IperfPoint>>> {
        let lines: Vec<&str> = content.lines().collect();
        if lines.len() != EXPECTED_LINES {
            return Err(AggregateError::LineCount {
                expected: EXPECTED_LINES,
                found: lines.len(),
            });
        }

        let mut readings = Vec::new();
        for (block, mtu) in Mtu::ALL.into_iter().enumerate() {
            let base = block * BLOCK_LINES;
            Self::check_block_header(lines[base], mtu)?;

            for parallel in 1..=IPERF_MAX_PARALLEL {
                let line = lines[base + 1 + usize::from(parallel)];
                let tokens = expect_tokens(line, ROW_TOKENS)?;
                if tokens[0] != f64::from(parallel) {
                    return Err(AggregateError::UnexpectedValue {
                        line: line.trim().to_string(),
                        message: format!("expected row for {parallel} connections"),
                    });
                }

                for ((duplex, direction), &value) in IPERF_ROW_COLUMNS.iter().zip(&tokens[1..]) {
                    readings.push(Reading {
                        metric: METRIC,
                        point: IperfPoint {
                            mtu,
                            duplex: *duplex,
                            direction: *direction,
                            parallel,
                        },
                        value,
                    });
                }
            }
        }
        Ok(readings)
    }

    /// `<duplex>_<mtu>.tsv`, each holding both directions.
    fn tables(&self, _direction: Option<Direction>) -> Vec<TablePlan<IperfPoint>> {
        let mut plans = Vec::new();
        for duplex in Duplex::ALL {
            for mtu in Mtu::ALL {
                plans.push(TablePlan {
                    file_name: format!("{duplex}_{mtu}.tsv"),
                    metric: METRIC,
                    include: Box::new(move |p: &IperfPoint| p.duplex == duplex && p.mtu == mtu),
                    label: |variant: Variant, p: &IperfPoint| {
                        format!("{} {}", variant.label(), p.direction.upper())
                    },
                });
            }
        }
        plans
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::Write as _;

    use nicbench_common::GridPoint;

    use super::*;

    fn sample_file() -> String {
        let mut out = String::new();
        for mtu in Mtu::ALL {
            let _ = writeln!(out, "mtu {mtu},");
            let _ = writeln!(
                out,
                "parallel connections, tx half-duplex, rx half-duplex, tx full-duplex, rx full-duplex,"
            );
            for n in 1..=IPERF_MAX_PARALLEL {
                let _ = writeln!(out, "{n},{n}.1,{n}.2,{n}.3,{n}.4,");
            }
            let _ = writeln!(out);
        }
        out
    }

    #[test]
    fn test_parse_complete_file() {
        let readings = IperfFormat.parse(&sample_file()).unwrap();
        assert_eq!(readings.len(), 64);

        let first = readings[0];
        assert_eq!(first.point.mtu, Mtu::Standard);
        assert_eq!(first.point.duplex, Duplex::Half);
        assert_eq!(first.point.direction, Direction::Tx);
        assert_eq!(first.value, 1.1);

        let last = readings[readings.len() - 1];
        assert_eq!(last.point.mtu, Mtu::Jumbo);
        assert_eq!(last.point.parallel, 8);
        assert_eq!(last.point.duplex, Duplex::Full);
        assert_eq!(last.point.direction, Direction::Rx);
        assert_eq!(last.value, 8.4);

        let points: Vec<_> = readings.iter().map(|r| r.point).collect();
        assert_eq!(points, IperfPoint::grid());
    }

    #[test]
    fn test_short_file_is_rejected() {
        let content: String = sample_file().lines().skip(1).map(|l| format!("{l}\n")).collect();
        assert!(matches!(
            IperfFormat.parse(&content).unwrap_err(),
            AggregateError::LineCount {
                expected: 22,
                found: 21
            }
        ));
    }

    #[test]
    fn test_swapped_blocks_are_rejected() {
        let content = sample_file()
            .replacen("mtu 1500", "mtu 0", 1)
            .replacen("mtu 9000", "mtu 1500", 1)
            .replacen("mtu 0", "mtu 9000", 1);
        assert!(matches!(
            IperfFormat.parse(&content).unwrap_err(),
            AggregateError::UnexpectedValue { .. }
        ));
    }

    #[test]
    fn test_missing_column_is_rejected() {
        let content = sample_file().replacen("3,3.1,3.2,3.3,3.4,", "3,3.1,3.2,3.3,", 1);
        assert!(matches!(
            IperfFormat.parse(&content).unwrap_err(),
            AggregateError::TokenCount {
                expected: 5,
                found: 4,
                ..
            }
        ));
    }

    #[test]
    fn test_tables_and_labels() {
        let plans = IperfFormat.tables(None);
        let names: Vec<_> = plans.iter().map(|p| p.file_name.as_str()).collect();
        assert_eq!(names, ["half_1500.tsv", "half_9000.tsv", "full_1500.tsv", "full_9000.tsv"]);

        let point = IperfPoint {
            mtu: Mtu::Jumbo,
            duplex: Duplex::Full,
            direction: Direction::Rx,
            parallel: 3,
        };
        assert!(!(plans[0].include)(&point));
        assert!((plans[3].include)(&point));
        assert_eq!(
            (plans[3].label)(Variant::Modified, &point),
            "$\\mathbf{C_{SF}}$ RX"
        );
    }
}
