//! ABOUTME: Integration tests for PoolCollector describe/collect behavior
//! ABOUTME: Covers completeness, labels, consistency and failure propagation

use cp_collector::{LabelSet, MetricKind, MetricValue, PoolCollector, PoolMetric, StatSnapshot};
use cp_core::Error;
use std::collections::HashMap;
use std::time::Duration;
use test_support::{
    consistent_snapshot, example_snapshot, FailingProvider, FixedProvider, SequenceProvider,
};

fn host_labels() -> LabelSet {
    LabelSet::new().with("host", "example.com")
}

#[test]
fn collects_example_snapshot() {
    let collector = PoolCollector::new(FixedProvider::new(example_snapshot()), host_labels());
    let samples = collector.collect().expect("collect should succeed");

    assert_eq!(samples.len(), 9);

    let by_name: HashMap<_, _> = samples
        .iter()
        .map(|s| (s.descriptor.name().to_string(), s.value))
        .collect();

    assert_eq!(by_name["ch_pool_acquires_total"], MetricValue::Counter(4));
    assert_eq!(by_name["ch_pool_acquire_duration_nanoseconds"], MetricValue::Counter(8));
    assert_eq!(by_name["ch_pool_canceled_acquires_total"], MetricValue::Counter(16));
    assert_eq!(by_name["ch_pool_empty_acquires_total"], MetricValue::Counter(42));
    assert_eq!(by_name["ch_pool_acquired_connections"], MetricValue::Gauge(15));
    assert_eq!(by_name["ch_pool_constructing_connections"], MetricValue::Gauge(23));
    assert_eq!(by_name["ch_pool_idle_connections"], MetricValue::Gauge(24));
    assert_eq!(by_name["ch_pool_total_connections"], MetricValue::Gauge(61));
    assert_eq!(by_name["ch_pool_max_connections"], MetricValue::Gauge(32));

    for sample in &samples {
        assert_eq!(sample.descriptor.const_labels(), &host_labels());
    }
}

#[test]
fn one_provider_call_per_collect() {
    let collector = PoolCollector::new(FixedProvider::new(example_snapshot()), LabelSet::new());

    collector.describe();
    assert_eq!(collector.provider().calls(), 0);

    collector.collect().unwrap();
    collector.collect().unwrap();
    assert_eq!(collector.provider().calls(), 2);
}

#[test]
fn describe_is_stable_across_collects() {
    let collector = PoolCollector::new(FixedProvider::new(example_snapshot()), host_labels());

    let before = collector.describe().to_vec();
    collector.collect().unwrap();
    let after = collector.describe().to_vec();

    assert_eq!(before, after);
    assert_eq!(before.len(), 9);

    let counters = before
        .iter()
        .filter(|d| d.kind() == MetricKind::Counter)
        .count();
    assert_eq!(counters, 4);

    for descriptor in &before {
        assert_eq!(descriptor.const_labels().get("host"), Some("example.com"));
        assert_eq!(descriptor.const_labels().len(), 1);
        assert!(!descriptor.help().is_empty());
    }
}

#[test]
fn reflects_latest_snapshot() {
    let first = consistent_snapshot(1, 0, 4, 10);
    let second = StatSnapshot {
        acquire_count: 7,
        acquire_duration: Duration::from_millis(3),
        ..consistent_snapshot(6, 1, 2, 10)
    };
    let provider = SequenceProvider::new([first, second]);
    let collector = PoolCollector::new(provider, LabelSet::new());

    let samples = collector.collect().unwrap();
    assert_eq!(samples[PoolMetric::AcquiredConnections as usize].value, MetricValue::Gauge(1));
    assert_eq!(samples[PoolMetric::Acquires as usize].value, MetricValue::Counter(0));

    let samples = collector.collect().unwrap();
    assert_eq!(samples[PoolMetric::AcquiredConnections as usize].value, MetricValue::Gauge(6));
    assert_eq!(samples[PoolMetric::Acquires as usize].value, MetricValue::Counter(7));
    assert_eq!(
        samples[PoolMetric::AcquireDuration as usize].value,
        MetricValue::Counter(3_000_000)
    );

    // Sequence exhausted: the provider error surfaces instead of stale data
    assert!(matches!(collector.collect(), Err(Error::Stat(_))));
}

#[test]
fn sequence_provider_is_called_once_per_collect() {
    let collector = PoolCollector::new(
        SequenceProvider::new([example_snapshot(), example_snapshot()]),
        LabelSet::new(),
    );

    collector.collect().unwrap();
    collector.collect().unwrap();
    assert_eq!(collector.provider().calls(), 2);
}

#[test]
fn total_matches_parts_within_one_collect() {
    let snapshots = [
        consistent_snapshot(0, 0, 0, 0),
        consistent_snapshot(3, 1, 4, 10),
        consistent_snapshot(10, 0, 0, 10),
        consistent_snapshot(0, 2, 30, 32),
    ];
    let collector = PoolCollector::new(SequenceProvider::new(snapshots), LabelSet::new());

    for _ in 0..snapshots.len() {
        let samples = collector.collect().unwrap();
        let value = |metric: PoolMetric| samples[metric as usize].value.as_i128();

        assert_eq!(
            value(PoolMetric::TotalConnections),
            value(PoolMetric::AcquiredConnections)
                + value(PoolMetric::ConstructingConnections)
                + value(PoolMetric::IdleConnections)
        );
        assert!(value(PoolMetric::TotalConnections) <= value(PoolMetric::MaxConnections));
    }
}

#[test]
fn provider_failure_emits_nothing() {
    let collector = PoolCollector::new(FailingProvider::new("connection refused"), host_labels());

    match collector.collect() {
        Err(Error::Stat(msg)) => assert_eq!(msg, "connection refused"),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(samples) => panic!("expected failure, got {} samples", samples.len()),
    }

    // Descriptors remain available after a failed collect
    assert_eq!(collector.describe().len(), 9);
}
