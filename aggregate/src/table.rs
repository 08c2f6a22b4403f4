//! Long-format tab-separated tables.
//!
//! One row per sample, header `<grid label>\ttype\t<metric>`. This is the
//! interface consumed by the plotting scripts.

use std::{fs::File, path::Path};

use csv::{ReaderBuilder, WriterBuilder};
use log::debug;
use nicbench_common::{GridPoint, Variant};

use crate::{
    error::{AggregateError, Result},
    family::TablePlan,
    group::Samples,
};

const DELIMITER: u8 = b'\t';

#[derive(Clone, Debug, PartialEq)]
pub struct TableRow {
    pub coordinate: String,
    pub variant: String,
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LongTable {
    pub grid_label: String,
    pub metric: String,
    pub rows: Vec<TableRow>,
}

impl LongTable {
    /// Builds the table described by `plan` from the samples of its metric.
    #[must_use]
    pub fn from_samples<P: GridPoint>(plan: &TablePlan<P>, samples: &Samples<P>) -> Self {
        let rows = samples
            .records()
            .filter(|record| (plan.include)(&record.point))
            .map(|record| TableRow {
                coordinate: record.point.axis_value(),
                variant: (plan.label)(record.variant, &record.point),
                value: record.value,
            })
            .collect();

        Self {
            grid_label: P::AXIS.to_string(),
            metric: plan.metric.to_string(),
            rows,
        }
    }

    pub fn save<Q: AsRef<Path>>(&self, path: Q) -> Result<()> {
        let mut writer = WriterBuilder::new()
            .delimiter(DELIMITER)
            .from_path(path.as_ref())?;

        writer.write_record([self.grid_label.as_str(), "type", self.metric.as_str()])?;
        for row in &self.rows {
            writer.write_record([
                row.coordinate.as_str(),
                row.variant.as_str(),
                format_value(row.value).as_str(),
            ])?;
        }
        writer.flush()?;

        debug!(
            "Wrote {} rows to {}",
            self.rows.len(),
            path.as_ref().display()
        );
        Ok(())
    }

    /// Reads a table written by [`LongTable::save`].
    pub fn load<Q: AsRef<Path>>(path: Q) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let mut reader = ReaderBuilder::new()
            .delimiter(DELIMITER)
            .has_headers(true)
            .from_reader(file);

        let headers = reader.headers()?.clone();
        if headers.len() != 3 {
            return Err(AggregateError::InvalidTable(format!(
                "{}: expected 3 header columns, found {}",
                path.as_ref().display(),
                headers.len()
            )));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let value = record[2].parse().map_err(|e| {
                AggregateError::InvalidTable(format!("invalid value '{}': {e}", &record[2]))
            })?;
            rows.push(TableRow {
                coordinate: record[0].to_string(),
                variant: record[1].to_string(),
                value,
            });
        }

        Ok(Self {
            grid_label: headers[0].to_string(),
            metric: headers[2].to_string(),
            rows,
        })
    }

    /// `(coordinate, type, value)` triples in row order.
    #[must_use]
    pub fn triples(&self) -> Vec<(String, String, f64)> {
        self.rows
            .iter()
            .map(|row| (row.coordinate.clone(), row.variant.clone(), row.value))
            .collect()
    }

    /// Rows whose type column is the plain label of `variant`.
    pub fn rows_for(&self, variant: Variant) -> impl Iterator<Item = &TableRow> {
        self.rows
            .iter()
            .filter(move |row| row.variant == variant.label())
    }
}

/// Shortest round-tripping decimal, keeping `.0` on integral values.
fn format_value(value: f64) -> String {
    format!("{value:?}")
}
