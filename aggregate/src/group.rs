//! Samples grouped by grid point and variant.

use std::collections::{btree_map, BTreeMap};

use nicbench_common::{GridPoint, Variant};

use crate::stats::{Comparison, Summary};

/// One observed value. Never mutated after parsing.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SampleRecord<P> {
    pub point: P,
    pub variant: Variant,
    pub value: f64,
}

/// Values observed at one grid point, kept per variant in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VariantSamples {
    pub baseline: Vec<f64>,
    pub modified: Vec<f64>,
    pub reference: Vec<f64>,
}

impl VariantSamples {
    #[must_use]
    pub fn get(&self, variant: Variant) -> &[f64] {
        match variant {
            Variant::Baseline => &self.baseline,
            Variant::Modified => &self.modified,
            Variant::Reference => &self.reference,
        }
    }

    pub fn push(&mut self, variant: Variant, value: f64) {
        match variant {
            Variant::Baseline => self.baseline.push(value),
            Variant::Modified => self.modified.push(value),
            Variant::Reference => self.reference.push(value),
        }
    }

    #[must_use]
    pub fn summary(&self, variant: Variant) -> Option<Summary> {
        Summary::of(self.get(variant))
    }

    #[must_use]
    pub fn comparison(&self) -> Comparison {
        Comparison::new(
            self.summary(Variant::Baseline),
            self.summary(Variant::Modified),
            self.summary(Variant::Reference),
        )
    }
}

/// Summary of one (point, variant) group.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SummaryRow<P> {
    pub point: P,
    pub variant: Variant,
    pub summary: Summary,
}

/// Samples of one metric, ordered by grid point.
#[derive(Clone, Debug)]
pub struct Samples<P> {
    groups: BTreeMap<P, VariantSamples>,
}

impl<P> Default for Samples<P> {
    fn default() -> Self {
        Self {
            groups: BTreeMap::new(),
        }
    }
}

impl<P: GridPoint> Samples<P> {
    pub fn insert(&mut self, record: SampleRecord<P>) {
        self.groups
            .entry(record.point)
            .or_default()
            .push(record.variant, record.value);
    }

    pub fn iter(&self) -> btree_map::Iter<'_, P, VariantSamples> {
        self.groups.iter()
    }

    #[must_use]
    pub fn get(&self, point: &P) -> Option<&VariantSamples> {
        self.groups.get(point)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of samples of `variant` across all points.
    #[must_use]
    pub fn count(&self, variant: Variant) -> usize {
        self.groups.values().map(|g| g.get(variant).len()).sum()
    }

    /// Rows in point order, then variant order; empty groups are left out.
    #[must_use]
    pub fn summaries(&self) -> Vec<SummaryRow<P>> {
        self.groups
            .iter()
            .flat_map(|(&point, group)| {
                Variant::ALL.into_iter().filter_map(move |variant| {
                    group.summary(variant).map(|summary| SummaryRow {
                        point,
                        variant,
                        summary,
                    })
                })
            })
            .collect()
    }

    /// Sample records in table order: point, variant, then insertion.
    pub fn records(&self) -> impl Iterator<Item = SampleRecord<P>> + '_ {
        self.groups.iter().flat_map(|(&point, group)| {
            Variant::ALL.into_iter().flat_map(move |variant| {
                group.get(variant).iter().map(move |&value| SampleRecord {
                    point,
                    variant,
                    value,
                })
            })
        })
    }
}

impl<'a, P> IntoIterator for &'a Samples<P> {
    type Item = (&'a P, &'a VariantSamples);
    type IntoIter = btree_map::Iter<'a, P, VariantSamples>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

/// Samples of every metric of a family, keyed by metric name.
#[derive(Clone, Debug)]
pub struct Dataset<P> {
    metrics: BTreeMap<&'static str, Samples<P>>,
}

impl<P> Default for Dataset<P> {
    fn default() -> Self {
        Self {
            metrics: BTreeMap::new(),
        }
    }
}

impl<P: GridPoint> Dataset<P> {
    pub fn insert(&mut self, metric: &'static str, record: SampleRecord<P>) {
        self.metrics.entry(metric).or_default().insert(record);
    }

    #[must_use]
    pub fn metric(&self, name: &str) -> Option<&Samples<P>> {
        self.metrics.get(name)
    }

    pub fn metrics(&self) -> impl Iterator<Item = (&'static str, &Samples<P>)> {
        self.metrics.iter().map(|(&name, samples)| (name, samples))
    }
}

#[cfg(test)]
mod tests {
    use nicbench_common::ScalePoint;

    use super::*;

    fn record(connections: u32, variant: Variant, value: f64) -> SampleRecord<ScalePoint> {
        SampleRecord {
            point: ScalePoint { connections },
            variant,
            value,
        }
    }

    #[test]
    fn test_grouping_preserves_multiplicity_and_order() {
        let mut samples = Samples::default();
        samples.insert(record(128, Variant::Reference, 3.0));
        samples.insert(record(64, Variant::Modified, 2.0));
        samples.insert(record(64, Variant::Baseline, 1.0));
        samples.insert(record(64, Variant::Modified, 2.0));

        assert_eq!(samples.count(Variant::Modified), 2);
        assert_eq!(samples.count(Variant::Reference), 1);

        let records: Vec<_> = samples
            .records()
            .map(|r| (r.point.connections, r.variant, r.value))
            .collect();
        assert_eq!(
            records,
            [
                (64, Variant::Baseline, 1.0),
                (64, Variant::Modified, 2.0),
                (64, Variant::Modified, 2.0),
                (128, Variant::Reference, 3.0),
            ]
        );
    }

    #[test]
    fn test_summaries_skip_empty_groups() {
        let mut samples = Samples::default();
        samples.insert(record(64, Variant::Modified, 2.0));
        samples.insert(record(64, Variant::Modified, 4.0));

        let rows = samples.summaries();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].variant, Variant::Modified);
        assert_eq!(rows[0].summary.mean, 3.0);
        assert_eq!(rows[0].summary.stddev, 1.0);

        let group = samples.get(&ScalePoint { connections: 64 }).unwrap();
        assert!(group.comparison().is_empty());
    }

    #[test]
    fn test_dataset_keeps_metrics_apart() {
        let mut dataset = Dataset::default();
        dataset.insert("throughput", record(64, Variant::Baseline, 1.0));
        dataset.insert("IOPS", record(64, Variant::Baseline, 100.0));

        assert_eq!(dataset.metrics().count(), 2);
        let iops = dataset.metric("IOPS").unwrap();
        assert_eq!(iops.count(Variant::Baseline), 1);
        assert!(dataset.metric("speed").is_none());
    }
}
