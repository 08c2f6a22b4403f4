//! fio results.
//!
//! The collector writes 26 four-line blocks per file, one per (block size,
//! queue depth) cell:
//!
//! ```text
//! blocksize 4K depth 1,
//! 1234567
//!    bw (  KiB/s): min=49768, max=53392, per=100.00%, avg=51898.05, stdev=812.23, samples=119
//!    iops        : min=12442, max=13348, avg=12974.51, stdev=203.06, samples=119
//! ```

use nicbench_common::{BlockSize, Direction, FioPoint, GridPoint, Variant};

use super::{direction_suffix, Reading, ResultFormat, TablePlan};
use crate::{
    error::Result,
    extract::{FIO_BANDWIDTH, FIO_IOPS},
    layout::{PositionalFormat, PositionalLayout},
};

/// Lines per (block size, depth) block.
pub const BLOCK_LINES: usize = 4;

/// Lines in a complete fio result file.
pub const EXPECTED_LINES: usize = 104;

#[derive(Debug, Clone)]
pub struct FioFormat {
    inner: PositionalFormat<FioPoint>,
}

impl FioFormat {
    pub fn new() -> Result<Self> {
        let layouts = vec![
            PositionalLayout {
                expected_lines: EXPECTED_LINES,
                first_line: 2,
                stride: BLOCK_LINES,
                metric: FIO_BANDWIDTH,
            },
            PositionalLayout {
                expected_lines: EXPECTED_LINES,
                first_line: 3,
                stride: BLOCK_LINES,
                metric: FIO_IOPS,
            },
        ];
        Ok(Self {
            inner: PositionalFormat::new(FioPoint::grid(), layouts)?,
        })
    }
}

impl ResultFormat for FioFormat {
    type Point = FioPoint;

    fn parse(&self, content: &str) -> Result<Vec<Reading<FioPoint>>> {
        self.inner.parse(content)
    }

    /// `<metric>_<block size>_<dir>.tsv` for both metrics and block sizes.
    fn tables(&self, direction: Option<Direction>) -> Vec<TablePlan<FioPoint>> {
        let suffix = direction_suffix(direction);
        let mut plans = Vec::new();
        for metric in [FIO_BANDWIDTH.name, FIO_IOPS.name] {
            for block_size in BlockSize::ALL {
                plans.push(TablePlan {
                    file_name: format!("{metric}_{}{suffix}.tsv", block_size.file_tag()),
                    metric,
                    include: Box::new(move |p: &FioPoint| p.block_size == block_size),
                    label: |variant: Variant, _: &FioPoint| variant.label().to_string(),
                });
            }
        }
        plans
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::Write as _;

    use nicbench_common::grid::FIO_IO_DEPTHS;

    use super::*;
    use crate::error::AggregateError;

    fn sample_file(blocks: usize) -> String {
        let mut out = String::new();
        for (i, point) in FioPoint::grid().into_iter().take(blocks).enumerate() {
            let _ = writeln!(
                out,
                "blocksize {} depth {},",
                point.block_size, point.io_depth
            );
            let _ = writeln!(out, "{}", 1000 + i);
            let _ = writeln!(
                out,
                "   bw (  KiB/s): min=1, max=2, per=100.00%, avg={}, stdev=0.5, samples=10",
                1024 * 1024 * (i + 1)
            );
            let _ = writeln!(
                out,
                "   iops        : min=1, max=2, avg={}.5, stdev=0.1, samples=10",
                i
            );
        }
        out
    }

    #[test]
    fn test_parse_complete_file() {
        let readings = FioFormat::new().unwrap().parse(&sample_file(26)).unwrap();
        assert_eq!(readings.len(), 52);

        let bw: Vec<_> = readings
            .iter()
            .filter(|r| r.metric == "throughput")
            .collect();
        assert_eq!(bw.len(), 26);
        assert_eq!(bw[0].point.io_depth, 1);
        assert_eq!(bw[0].value, 8.0);
        assert_eq!(bw[13].point.block_size, BlockSize::K256);
        assert_eq!(bw[25].point.io_depth, FIO_IO_DEPTHS[12]);
        assert_eq!(bw[25].value, 26.0 * 8.0);

        let iops: Vec<_> = readings.iter().filter(|r| r.metric == "IOPS").collect();
        assert_eq!(iops[3].value, 3.5);
    }

    #[test]
    fn test_incomplete_file_is_rejected() {
        let err = FioFormat::new().unwrap().parse(&sample_file(25)).unwrap_err();
        assert!(matches!(
            err,
            AggregateError::LineCount {
                expected: 104,
                found: 100
            }
        ));
    }

    #[test]
    fn test_gigabit_unit_is_rejected() {
        let content = sample_file(26).replacen("KiB/s", "GiB/s", 1);
        let err = FioFormat::new().unwrap().parse(&content).unwrap_err();
        assert!(matches!(err, AggregateError::UnknownUnit { .. }));
    }

    #[test]
    fn test_table_names() {
        let names: Vec<_> = FioFormat::new()
            .unwrap()
            .tables(Some(Direction::Rx))
            .into_iter()
            .map(|t| t.file_name)
            .collect();
        assert_eq!(
            names,
            [
                "throughput_4k_rx.tsv",
                "throughput_256k_rx.tsv",
                "IOPS_4k_rx.tsv",
                "IOPS_256k_rx.tsv"
            ]
        );
    }
}
