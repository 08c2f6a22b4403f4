//! Per-family raw result formats.
//!
//! Each family knows how to turn the contents of one raw result file into
//! readings over its grid, and which tables the readings are split into.

use nicbench_common::{Direction, GridPoint, Variant};

use crate::error::Result;

pub mod fio;
pub mod iperf;
pub mod wrk;

pub use fio::FioFormat;
pub use iperf::IperfFormat;
pub use wrk::{ScaleFormat, WrkFormat};

/// One metric value read at one grid cell, before the file's variant is known.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Reading<P> {
    pub metric: &'static str,
    pub point: P,
    pub value: f64,
}

/// How a subset of the samples is written to one long-format table.
pub struct TablePlan<P> {
    /// Output file name, relative to the output directory.
    pub file_name: String,
    /// Metric whose samples fill the table; also the value column header.
    pub metric: &'static str,
    /// Selects the grid cells that belong to this table.
    pub include: Box<dyn Fn(&P) -> bool>,
    /// Text of the `type` column.
    pub label: fn(Variant, &P) -> String,
}

/// A raw result format.
pub trait ResultFormat {
    type Point: GridPoint;

    /// Parses a whole raw file.
    ///
    /// # Errors
    ///
    /// Any deviation from the expected structure is an error; a file is never
    /// partially accepted.
    fn parse(&self, content: &str) -> Result<Vec<Reading<Self::Point>>>;

    /// Tables written for results of the given direction.
    fn tables(&self, direction: Option<Direction>) -> Vec<TablePlan<Self::Point>>;
}

/// `_<dir>` suffix for file names of directional families.
pub(crate) fn direction_suffix(direction: Option<Direction>) -> String {
    direction.map_or_else(String::new, |d| format!("_{d}"))
}
