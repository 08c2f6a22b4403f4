//! Fixed-shape positional layouts.
//!
//! A layout describes a file with an exact number of lines in which a metric
//! appears every `stride` lines starting at `first_line`. The Nth occurrence
//! belongs to the Nth grid cell.

use log::trace;
use nicbench_common::{GridPoint, Variant};

use crate::{
    error::{AggregateError, Result},
    extract::MetricSpec,
    family::{Reading, ResultFormat, TablePlan},
};

#[derive(Copy, Clone, Debug)]
pub struct PositionalLayout {
    pub expected_lines: usize,
    pub first_line: usize,
    pub stride: usize,
    pub metric: MetricSpec,
}

impl PositionalLayout {
    /// Number of metric occurrences in a well-formed file.
    #[must_use]
    pub fn cells(&self) -> usize {
        if self.stride == 0 || self.first_line >= self.expected_lines {
            return 0;
        }
        (self.expected_lines - self.first_line).div_ceil(self.stride)
    }

    /// Extracts one value per occurrence, after checking the line count.
    pub fn extract(&self, content: &str) -> Result<Vec<f64>> {
        let lines: Vec<&str> = content.lines().collect();
        if lines.len() != self.expected_lines {
            return Err(AggregateError::LineCount {
                expected: self.expected_lines,
                found: lines.len(),
            });
        }

        lines
            .iter()
            .skip(self.first_line)
            .step_by(self.stride.max(1))
            .map(|line| {
                trace!("{}: {line}", self.metric.name);
                self.metric.extract(line)
            })
            .collect()
    }
}

/// A result format made of positional layouts over a single grid.
#[derive(Debug, Clone)]
pub struct PositionalFormat<P> {
    grid: Vec<P>,
    layouts: Vec<PositionalLayout>,
}

impl<P: GridPoint> PositionalFormat<P> {
    /// # Errors
    ///
    /// Fails if a layout's occurrence count differs from the grid size.
    pub fn new(grid: Vec<P>, layouts: Vec<PositionalLayout>) -> Result<Self> {
        for layout in &layouts {
            if layout.cells() != grid.len() {
                return Err(AggregateError::Configuration(format!(
                    "layout for '{}' has {} cells but the grid has {}",
                    layout.metric.name,
                    layout.cells(),
                    grid.len()
                )));
            }
        }
        Ok(Self { grid, layouts })
    }

    #[must_use]
    pub fn grid(&self) -> &[P] {
        &self.grid
    }

    #[must_use]
    pub fn metrics(&self) -> Vec<&'static str> {
        self.layouts.iter().map(|l| l.metric.name).collect()
    }
}

impl<P: GridPoint + 'static> ResultFormat for PositionalFormat<P> {
    type Point = P;

    fn parse(&self, content: &str) -> Result<Vec<Reading<P>>> {
        let mut readings = Vec::with_capacity(self.grid.len() * self.layouts.len());
        for layout in &self.layouts {
            let values = layout.extract(content)?;
            readings.extend(
                self.grid
                    .iter()
                    .zip(values)
                    .map(|(&point, value)| Reading {
                        metric: layout.metric.name,
                        point,
                        value,
                    }),
            );
        }
        Ok(readings)
    }

    /// One table per metric covering the whole grid.
    fn tables(&self, _direction: Option<nicbench_common::Direction>) -> Vec<TablePlan<P>> {
        self.layouts
            .iter()
            .map(|layout| TablePlan {
                file_name: format!("{}.tsv", layout.metric.name),
                metric: layout.metric.name,
                include: Box::new(|_: &P| true),
                label: |variant: Variant, _: &P| variant.label().to_string(),
            })
            .collect()
    }
}
