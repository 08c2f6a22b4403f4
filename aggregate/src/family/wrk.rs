//! nginx results measured with wrk.
//!
//! The collector writes a `cores .. fsize ..,` marker followed by the raw wrk
//! output for every cell. Only the `Transfer/sec` summary lines are read; the
//! Nth of them belongs to the Nth grid cell.

use nicbench_common::{grid::WRK_CORES, Direction, GridPoint, ScalePoint, Variant, WrkPoint};

use super::{direction_suffix, Reading, ResultFormat, TablePlan};
use crate::{
    error::{AggregateError, Result},
    extract::WRK_TRANSFER,
};

pub const TRANSFER_MARKER: &str = "Transfer/sec";

/// Reads one transfer rate (Gbps) per grid cell.
fn transfer_readings<P: GridPoint>(content: &str) -> Result<Vec<Reading<P>>> {
    let grid = P::grid();
    let lines: Vec<&str> = content
        .lines()
        .filter(|line| line.contains(TRANSFER_MARKER))
        .collect();
    if lines.len() != grid.len() {
        return Err(AggregateError::BlockCount {
            marker: TRANSFER_MARKER.to_string(),
            expected: grid.len(),
            found: lines.len(),
        });
    }

    grid.into_iter()
        .zip(lines)
        .map(|(point, line)| {
            Ok(Reading {
                metric: WRK_TRANSFER.name,
                point,
                value: WRK_TRANSFER.extract(line)?,
            })
        })
        .collect()
}

fn variant_label<P>(variant: Variant, _: &P) -> String {
    variant.label().to_string()
}

/// File size sweep at 1 and 8 nginx workers.
#[derive(Debug, Clone, Default)]
pub struct WrkFormat;

impl ResultFormat for WrkFormat {
    type Point = WrkPoint;

    fn parse(&self, content: &str) -> Result<Vec<Reading<WrkPoint>>> {
        transfer_readings(content)
    }

    /// `<cores>core_<dir>.tsv`
    fn tables(&self, direction: Option<Direction>) -> Vec<TablePlan<WrkPoint>> {
        let suffix = direction_suffix(direction);
        WRK_CORES
            .into_iter()
            .map(|cores| TablePlan {
                file_name: format!("{cores}core{suffix}.tsv"),
                metric: WRK_TRANSFER.name,
                include: Box::new(move |p: &WrkPoint| p.cores == cores),
                label: variant_label::<WrkPoint>,
            })
            .collect()
    }
}

/// Connection count sweep at a fixed file size.
#[derive(Debug, Clone, Default)]
pub struct ScaleFormat;

impl ResultFormat for ScaleFormat {
    type Point = ScalePoint;

    fn parse(&self, content: &str) -> Result<Vec<Reading<ScalePoint>>> {
        transfer_readings(content)
    }

    fn tables(&self, _direction: Option<Direction>) -> Vec<TablePlan<ScalePoint>> {
        vec![TablePlan {
            file_name: "scale.tsv".to_string(),
            metric: WRK_TRANSFER.name,
            include: Box::new(|_: &ScalePoint| true),
            label: variant_label::<ScalePoint>,
        }]
    }
}
