use std::{fmt::Write as _, fs, path::Path};

use aggregate::{
    extract::{BandwidthUnit, MetricSpec},
    family::wrk::WrkFormat,
    layout::{PositionalFormat, PositionalLayout},
    AggregateError, AggregateOptions, Aggregator, Direction, Family, LongTable, Variant,
};
use nicbench_common::{
    grid::{IPERF_MAX_PARALLEL, WRK_CORES},
    FioPoint, GridPoint, Mtu, ScalePoint, WrkPoint,
};

const SCENARIO_METRIC: MetricSpec = MetricSpec {
    name: "throughput",
    tokens: 2,
    index: 0,
    units: &[BandwidthUnit::KibPerSec, BandwidthUnit::MibPerSec],
};

fn scenario_format() -> PositionalFormat<ScalePoint> {
    PositionalFormat::new(
        vec![ScalePoint { connections: 64 }],
        vec![PositionalLayout {
            expected_lines: 1,
            first_line: 0,
            stride: 1,
            metric: SCENARIO_METRIC,
        }],
    )
    .unwrap()
}

fn write_files(dir: &Path, files: &[(&str, &str)]) {
    fs::create_dir_all(dir).unwrap();
    for (name, content) in files {
        fs::write(dir.join(name), content).unwrap();
    }
}

fn fio_file(blocks: usize) -> String {
    let mut out = String::new();
    for point in FioPoint::grid().into_iter().take(blocks) {
        let _ = writeln!(out, "blocksize {} depth {},", point.block_size, point.io_depth);
        let _ = writeln!(out, "4242424");
        let _ = writeln!(
            out,
            "   bw (  MiB/s): min= 1000, max= 1100, per=100.00%, avg=1024.00, stdev=10.00, samples=119"
        );
        let _ = writeln!(
            out,
            "   iops        : min=256000, max=281600, avg=262144.00, stdev=2560.00, samples=119"
        );
    }
    out
}

fn iperf_file(speed: f64) -> String {
    let mut out = String::new();
    for mtu in Mtu::ALL {
        let _ = writeln!(out, "mtu {mtu},");
        let _ = writeln!(
            out,
            "parallel connections, tx half-duplex, rx half-duplex, tx full-duplex, rx full-duplex,"
        );
        for n in 1..=IPERF_MAX_PARALLEL {
            let _ = writeln!(out, "{n},{speed},{speed},{speed},{speed},");
        }
        let _ = writeln!(out);
    }
    out
}

fn wrk_file(rate: &str) -> String {
    let mut out = String::new();
    for point in WrkPoint::grid() {
        let _ = writeln!(out, "cores {} fsize {},", point.cores, point.file_size);
        let _ = writeln!(out, "Running 1m test @ https://10.101.41.1");
        let _ = writeln!(out, "Requests/sec:   4521.33");
        let _ = writeln!(out, "Transfer/sec:    {rate}");
    }
    out
}

#[test]
fn three_variants_produce_one_row_each() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let line = "bw=100KiB/s iops=50\n";
    write_files(
        input.path(),
        &[
            ("run1_corig.csv", line),
            ("run2_csf.csv", line),
            ("run3_mel.csv", line),
        ],
    );

    let report = Aggregator::default()
        .run(&scenario_format(), input.path(), None, output.path())
        .unwrap();
    assert_eq!(report.accepted.len(), 3);
    assert_eq!(report.files_of(Variant::Reference), 1);

    let table = LongTable::load(output.path().join("throughput.tsv")).unwrap();
    assert_eq!(table.rows.len(), 3);
    let labels: Vec<_> = table.rows.iter().map(|r| r.variant.as_str()).collect();
    assert_eq!(labels, Variant::ALL.map(Variant::label));
    for row in &table.rows {
        assert_eq!(row.coordinate, "64");
        assert!((row.value - 0.000763).abs() < 1e-6);
        assert!((row.value - 100.0 / 1024.0 / 1024.0 * 8.0).abs() < 1e-15);
    }
}

#[test]
fn unknown_unit_aborts_the_run() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_files(
        input.path(),
        &[
            ("run1_corig.csv", "bw=100KiB/s iops=50\n"),
            ("run2_csf.csv", "bw=100bps iops=50\n"),
        ],
    );

    let err = Aggregator::default()
        .run(&scenario_format(), input.path(), None, output.path())
        .unwrap_err();
    assert!(matches!(err.inner(), AggregateError::UnknownUnit { .. }));
    assert!(err.to_string().contains("run2_csf.csv"));
    assert!(!output.path().join("throughput.tsv").exists());
}

#[test]
fn malformed_files_can_be_skipped() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_files(
        input.path(),
        &[
            ("run1_corig.csv", "bw=100KiB/s iops=50\n"),
            ("run2_csf.csv", "bw=100bps iops=50\n"),
        ],
    );

    let aggregator = Aggregator::new(
        Default::default(),
        AggregateOptions {
            skip_malformed: true,
            ..Default::default()
        },
    );
    let report = aggregator
        .run(&scenario_format(), input.path(), None, output.path())
        .unwrap();
    assert_eq!(report.accepted.len(), 1);
    assert_eq!(report.skipped.len(), 1);

    let table = LongTable::load(output.path().join("throughput.tsv")).unwrap();
    assert_eq!(table.rows.len(), 1);
}

#[test]
fn fio_block_count_is_enforced() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let rx = input.path().join("fio").join("rx");
    write_files(&rx, &[("fio_f01_corig_0101_1200_0.csv", &fio_file(26))]);

    let reports = Aggregator::default()
        .run_family(Family::Fio, input.path(), output.path())
        .unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].direction, Some(Direction::Rx));

    let table = LongTable::load(output.path().join("fio").join("throughput_4k_rx.tsv")).unwrap();
    assert_eq!(table.grid_label, "IOdepth");
    assert_eq!(table.rows.len(), 13);
    assert!(table.rows.iter().all(|r| r.value == 8.0));

    let iops = LongTable::load(output.path().join("fio").join("IOPS_256k_rx.tsv")).unwrap();
    assert_eq!(iops.rows.len(), 13);
    assert_eq!(iops.rows[12].coordinate, "4096");
    assert_eq!(iops.rows[12].value, 262_144.0);

    let content: String = fio_file(26).lines().take(103).map(|l| format!("{l}\n")).collect();
    write_files(&rx, &[("fio_f01_csf_0101_1300_0.csv", &content)]);
    let err = Aggregator::default()
        .run_family(Family::Fio, input.path(), output.path())
        .unwrap_err();
    assert!(matches!(
        err.inner(),
        AggregateError::LineCount {
            expected: 104,
            found: 103
        }
    ));
}

#[test]
fn iperf_tables_hold_both_directions() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_files(
        &input.path().join("iperf"),
        &[
            ("data_corig_f01_0101_1200_0.csv", &iperf_file(9.4)),
            ("data_corig_f01_0101_1200_1.csv", &iperf_file(9.2)),
            ("data_csf_f01_0101_1300_0.csv", &iperf_file(9.3)),
        ],
    );

    let reports = Aggregator::default()
        .run_family(Family::Iperf, input.path(), output.path())
        .unwrap();
    assert_eq!(reports[0].tables.len(), 4);

    let table = LongTable::load(output.path().join("iperf").join("half_9000.tsv")).unwrap();
    assert_eq!(table.grid_label, "parallel connections");
    assert_eq!(table.metric, "speed");
    // 8 connection counts x 2 directions x 3 files
    assert_eq!(table.rows.len(), 48);
    assert!(table
        .rows
        .iter()
        .any(|r| r.variant == "$\\mathbf{C_{SF}}$ RX" && r.value == 9.3));
    assert!(table.rows.iter().all(|r| r.variant.ends_with(" TX") || r.variant.ends_with(" RX")));
}

#[test]
fn wrk_tables_are_split_by_cores() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_files(
        &input.path().join("nginx_wrk").join("tx"),
        &[
            ("wrk_corig_f01_0101_1200_0.csv", &wrk_file("1.00GB")),
            ("wrk_mel_f01_0101_1200_0.csv", &wrk_file("512.00MB")),
        ],
    );

    let reports = Aggregator::default()
        .run_family(Family::NginxWrk, input.path(), output.path())
        .unwrap();
    assert_eq!(reports.len(), 1);

    for cores in WRK_CORES {
        let path = output.path().join("nginx_wrk").join(format!("{cores}core_tx.tsv"));
        let table = LongTable::load(path).unwrap();
        assert_eq!(table.grid_label, "size");
        assert_eq!(table.rows.len(), 10);
        assert_eq!(table.rows[0].coordinate, "4");
        assert_eq!(table.rows[0].value, 8.0);
        assert_eq!(table.rows[1].value, 4.0);
        assert_eq!(table.rows_for(Variant::Reference).count(), 5);
    }
}

#[test]
fn wrk_variants_are_grouped_per_cell() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let rx = input.path().join("nginx_wrk").join("rx");
    write_files(
        &rx,
        &[
            ("wrk_corig_f01_0101_1200_0.csv", &wrk_file("1.00GB")),
            ("wrk_corig_f01_0101_1200_1.csv", &wrk_file("768.00MB")),
            ("wrk_csf_f01_0101_1300_0.csv", &wrk_file("1.00GB")),
            ("wrk_csf_f01_0101_1300_1.csv", &wrk_file("1.00GB")),
            ("wrk_mel_f01_0101_1400_0.csv", &wrk_file("512.00MB")),
        ],
    );

    let aggregator = Aggregator::default();
    let files = aggregator.scan(&rx).unwrap();
    let (dataset, accepted, skipped) = aggregator.collect(&WrkFormat, files).unwrap();
    assert_eq!(accepted.len(), 5);
    assert!(skipped.is_empty());

    let samples = dataset.metric("throughput").unwrap();
    assert_eq!(samples.count(Variant::Baseline), 2 * WrkPoint::grid().len());
    for (_, group) in samples {
        let baseline = group.summary(Variant::Baseline).unwrap();
        assert_eq!((baseline.mean, baseline.stddev), (7.0, 1.0));
        let modified = group.summary(Variant::Modified).unwrap();
        assert_eq!((modified.mean, modified.stddev), (8.0, 0.0));
        assert_eq!(group.summary(Variant::Reference).unwrap().mean, 4.0);

        let comparison = group.comparison();
        assert!((comparison.relative_to_baseline.unwrap() - 1.0 / 7.0).abs() < 1e-12);
        assert_eq!(comparison.deviations_baseline, Some(1.0));
        assert_eq!(comparison.deviations_modified, None);
        assert_eq!(comparison.relative_to_reference, Some(1.0));
    }

    let reports = aggregator
        .run_family(Family::NginxWrk, input.path(), output.path())
        .unwrap();
    assert_eq!(reports[0].direction, Some(Direction::Rx));
    let table = LongTable::load(output.path().join("nginx_wrk").join("8core_rx.tsv")).unwrap();
    assert_eq!(table.rows.len(), 25);
    assert_eq!(table.rows_for(Variant::Modified).count(), 10);
    assert_eq!(table.rows_for(Variant::Reference).count(), 5);
}
