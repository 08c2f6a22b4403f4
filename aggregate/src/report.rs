//! Vivado implementation reports of the NIC design.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use serde::Serialize;

use crate::{
    error::{AggregateError, Result},
    extract::numbers,
};

/// Implementation run directory, relative to a Corundum checkout.
pub const IMPL_DIR: &str = "fpga/mqnic/AU200/fpga_100g/fpga/fpga.runs/impl_1";

pub const UTILIZATION_REPORT: &str = "fpga_utilization_placed.rpt";

pub const TIMING_REPORT: &str = "fpga_timing_summary_routed.rpt";

const TIMING_MARKER: &str = "Design Timing Summary";

/// Distance from the timing summary heading to its first row of values.
const TIMING_VALUES_OFFSET: usize = 6;

/// Path of the utilization report under `corundum`.
#[must_use]
pub fn utilization_report_path(corundum: &Path) -> PathBuf {
    corundum.join(IMPL_DIR).join(UTILIZATION_REPORT)
}

/// Path of the timing summary report under `corundum`.
#[must_use]
pub fn timing_report_path(corundum: &Path) -> PathBuf {
    corundum.join(IMPL_DIR).join(TIMING_REPORT)
}

/// First number on the first line containing `label`.
fn first_value(report: &str, label: &str) -> Result<f64> {
    let line = report
        .lines()
        .find(|line| line.contains(label))
        .ok_or_else(|| AggregateError::MissingMarker {
            marker: label.to_string(),
        })?;
    numbers(line)
        .first()
        .copied()
        .ok_or_else(|| AggregateError::TokenCount {
            line: line.trim().to_string(),
            expected: 1,
            found: 0,
        })
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Utilization {
    pub luts: f64,
    pub luts_logic: f64,
    pub luts_memory: f64,
    pub registers: f64,
    pub bram_tiles: f64,
    pub uram: f64,
}

impl Utilization {
    pub fn parse(report: &str) -> Result<Self> {
        Ok(Self {
            luts: first_value(report, "CLB LUTs")?,
            luts_logic: first_value(report, "LUT as Logic")?,
            luts_memory: first_value(report, "LUT as Memory")?,
            registers: first_value(report, "CLB Registers")?,
            bram_tiles: first_value(report, "Block RAM Tile")?,
            uram: first_value(report, "URAM")?,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let report = fs::read_to_string(path)?;
        Self::parse(&report).map_err(|e| AggregateError::in_file(path, e))
    }
}

impl fmt::Display for Utilization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "LUTs: {}", self.luts)?;
        writeln!(f, "  LUT as Logic: {}", self.luts_logic)?;
        writeln!(f, "  LUT as Memory: {}", self.luts_memory)?;
        writeln!(f, "FFs: {}", self.registers)?;
        writeln!(f, "BRAM: {}", self.bram_tiles)?;
        write!(f, "URAM: {}", self.uram)
    }
}

/// Worst and total negative slack, in ns.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct TimingSummary {
    pub wns: f64,
    pub tns: f64,
}

impl TimingSummary {
    pub fn parse(report: &str) -> Result<Self> {
        let lines: Vec<&str> = report.lines().collect();
        let heading = lines
            .iter()
            .position(|line| line.contains(TIMING_MARKER))
            .ok_or_else(|| AggregateError::MissingMarker {
                marker: TIMING_MARKER.to_string(),
            })?;

        let row = lines
            .get(heading + TIMING_VALUES_OFFSET)
            .ok_or(AggregateError::LineCount {
                expected: heading + TIMING_VALUES_OFFSET + 1,
                found: lines.len(),
            })?;
        let values = numbers(row);
        match values.as_slice() {
            &[wns, tns, ..] => Ok(Self { wns, tns }),
            found => Err(AggregateError::TokenCount {
                line: row.trim().to_string(),
                expected: 2,
                found: found.len(),
            }),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let report = fs::read_to_string(path)?;
        Self::parse(&report).map_err(|e| AggregateError::in_file(path, e))
    }
}

impl fmt::Display for TimingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "WNS: {}", self.wns)?;
        write!(f, "TNS: {}", self.tns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UTILIZATION: &str = "\
1. CLB Logic
------------

+----------------------------+--------+-------+-----------+-------+
|          Site Type         |  Used  | Fixed | Available | Util% |
+----------------------------+--------+-------+-----------+-------+
| CLB LUTs                   | 123456 |     0 |   1182240 | 10.44 |
|   LUT as Logic             | 110000 |     0 |   1182240 |  9.30 |
|   LUT as Memory            |  13456 |     0 |    591840 |  2.27 |
| CLB Registers              | 201234 |     0 |   2364480 |  8.51 |
...
| Block RAM Tile    | 312.5 |     0 |      2160 | 14.47 |
| URAM              |    24 |     0 |       960 |  2.50 |
";

    const TIMING: &str = "\
------------------------------------------------------------------------------------------------
| Design Timing Summary
| ---------------------
------------------------------------------------------------------------------------------------

    WNS(ns)      TNS(ns)  TNS Failing Endpoints  TNS Total Endpoints
    -------      -------  ---------------------  -------------------
     -0.125      -12.750                    231               612345
";

    #[test]
    fn test_parse_utilization() {
        let util = Utilization::parse(UTILIZATION).unwrap();
        assert_eq!(util.luts, 123_456.0);
        assert_eq!(util.luts_logic, 110_000.0);
        assert_eq!(util.luts_memory, 13_456.0);
        assert_eq!(util.registers, 201_234.0);
        assert_eq!(util.bram_tiles, 312.5);
        assert_eq!(util.uram, 24.0);
        assert!(util.to_string().starts_with("LUTs: 123456\n"));
    }

    #[test]
    fn test_parse_timing_summary() {
        let timing = TimingSummary::parse(TIMING).unwrap();
        assert_eq!(timing.wns, -0.125);
        assert_eq!(timing.tns, -12.75);
    }

    #[test]
    fn test_missing_sections() {
        assert!(matches!(
            Utilization::parse("nothing here").unwrap_err(),
            AggregateError::MissingMarker { .. }
        ));
        assert!(matches!(
            TimingSummary::parse("| Design Timing Summary\n").unwrap_err(),
            AggregateError::LineCount { .. }
        ));
    }

    #[test]
    fn test_report_paths() {
        let path = timing_report_path(Path::new("/home/user/corundum"));
        assert_eq!(
            path,
            Path::new(
                "/home/user/corundum/fpga/mqnic/AU200/fpga_100g/fpga/fpga.runs/impl_1/fpga_timing_summary_routed.rpt"
            )
        );
    }
}
