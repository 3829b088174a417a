//! ABOUTME: Pool collector translating one stat snapshot into nine metric samples
//! ABOUTME: Descriptors are fixed at construction, values are read per collection

use crate::descriptor::{
    build_fq_name, LabelSet, MetricDescriptor, MetricKind, DEFAULT_NAMESPACE, DEFAULT_SUBSYSTEM,
};
use crate::stat::{StatProvider, StatSnapshot};
use cp_core::Result;
use std::fmt;

/// The nine metrics exported for every pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolMetric {
    Acquires,
    /// Counter of whole nanoseconds. OpenMetrics text output always ends
    /// counter samples in `_total`, so this one is scraped as
    /// `<prefix>_acquire_duration_nanoseconds_total`.
    AcquireDuration,
    CanceledAcquires,
    EmptyAcquires,
    AcquiredConnections,
    ConstructingConnections,
    IdleConnections,
    TotalConnections,
    MaxConnections,
}

impl PoolMetric {
    /// Export order
    pub const ALL: [PoolMetric; 9] = [
        PoolMetric::Acquires,
        PoolMetric::AcquireDuration,
        PoolMetric::CanceledAcquires,
        PoolMetric::EmptyAcquires,
        PoolMetric::AcquiredConnections,
        PoolMetric::ConstructingConnections,
        PoolMetric::IdleConnections,
        PoolMetric::TotalConnections,
        PoolMetric::MaxConnections,
    ];

    /// Name suffix after the namespace and subsystem
    pub fn suffix(self) -> &'static str {
        match self {
            PoolMetric::Acquires => "acquires_total",
            PoolMetric::AcquireDuration => "acquire_duration_nanoseconds",
            PoolMetric::CanceledAcquires => "canceled_acquires_total",
            PoolMetric::EmptyAcquires => "empty_acquires_total",
            PoolMetric::AcquiredConnections => "acquired_connections",
            PoolMetric::ConstructingConnections => "constructing_connections",
            PoolMetric::IdleConnections => "idle_connections",
            PoolMetric::TotalConnections => "total_connections",
            PoolMetric::MaxConnections => "max_connections",
        }
    }

    pub fn kind(self) -> MetricKind {
        match self {
            PoolMetric::Acquires
            | PoolMetric::AcquireDuration
            | PoolMetric::CanceledAcquires
            | PoolMetric::EmptyAcquires => MetricKind::Counter,
            _ => MetricKind::Gauge,
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            PoolMetric::Acquires => "Cumulative count of successful acquires from the pool.",
            PoolMetric::AcquireDuration => {
                "Total duration of all successful acquires from the pool."
            }
            PoolMetric::CanceledAcquires => {
                "Cumulative count of acquires from the pool that were canceled by the caller."
            }
            PoolMetric::EmptyAcquires => {
                "Cumulative count of successful acquires from the pool that waited for a connection to be released or constructed because the pool was empty."
            }
            PoolMetric::AcquiredConnections => {
                "The number of currently acquired connections in the pool."
            }
            PoolMetric::ConstructingConnections => {
                "The number of connections with construction in progress in the pool."
            }
            PoolMetric::IdleConnections => "The number of currently idle connections in the pool.",
            PoolMetric::TotalConnections => {
                "Total number of connections currently in the pool. The value is the sum of constructing, acquired, and idle connections."
            }
            PoolMetric::MaxConnections => "The maximum size of the pool.",
        }
    }

    /// Read this metric's value out of a snapshot
    pub fn value(self, snapshot: &StatSnapshot) -> MetricValue {
        match self {
            PoolMetric::Acquires => MetricValue::Counter(snapshot.acquire_count),
            PoolMetric::AcquireDuration => MetricValue::Counter(snapshot.acquire_duration_nanos()),
            PoolMetric::CanceledAcquires => MetricValue::Counter(snapshot.canceled_acquire_count),
            PoolMetric::EmptyAcquires => MetricValue::Counter(snapshot.empty_acquire_count),
            PoolMetric::AcquiredConnections => {
                MetricValue::Gauge(i64::from(snapshot.acquired_resources))
            }
            PoolMetric::ConstructingConnections => {
                MetricValue::Gauge(i64::from(snapshot.constructing_resources))
            }
            PoolMetric::IdleConnections => MetricValue::Gauge(i64::from(snapshot.idle_resources)),
            PoolMetric::TotalConnections => MetricValue::Gauge(i64::from(snapshot.total_resources)),
            PoolMetric::MaxConnections => MetricValue::Gauge(i64::from(snapshot.max_resources)),
        }
    }
}

/// Value of one sample, typed by metric kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricValue {
    Counter(u64),
    Gauge(i64),
}

impl MetricValue {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricValue::Counter(_) => MetricKind::Counter,
            MetricValue::Gauge(_) => MetricKind::Gauge,
        }
    }

    /// Widened value, useful for cross-metric comparisons
    pub fn as_i128(&self) -> i128 {
        match *self {
            MetricValue::Counter(v) => i128::from(v),
            MetricValue::Gauge(v) => i128::from(v),
        }
    }
}

/// One emitted sample, borrowing its descriptor from the collector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample<'a> {
    pub metric: PoolMetric,
    pub descriptor: &'a MetricDescriptor,
    pub value: MetricValue,
}

/// Naming and labels for a [`PoolCollector`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorOptions {
    pub namespace: String,
    pub subsystem: String,
    pub labels: LabelSet,
}

impl Default for CollectorOptions {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            subsystem: DEFAULT_SUBSYSTEM.to_string(),
            labels: LabelSet::new(),
        }
    }
}

impl CollectorOptions {
    pub fn with_labels(labels: LabelSet) -> Self {
        Self {
            labels,
            ..Self::default()
        }
    }
}

/// Exposes a pool's stat snapshot as Prometheus metrics.
///
/// Holds one descriptor per [`PoolMetric`], built once. Every
/// [`collect`](Self::collect) reads the provider exactly once, so all
/// nine samples describe the same instant.
pub struct PoolCollector<P> {
    provider: P,
    descriptors: [MetricDescriptor; 9],
}

impl<P: StatProvider> PoolCollector<P> {
    /// Collector with the default `ch_pool_` prefix
    pub fn new(provider: P, labels: LabelSet) -> Self {
        Self::with_options(provider, CollectorOptions::with_labels(labels))
    }

    pub fn with_options(provider: P, options: CollectorOptions) -> Self {
        let descriptors = PoolMetric::ALL.map(|metric| {
            MetricDescriptor::new(
                build_fq_name(&options.namespace, &options.subsystem, metric.suffix()),
                metric.help(),
                metric.kind(),
                options.labels.clone(),
            )
        });

        tracing::debug!(
            namespace = %options.namespace,
            subsystem = %options.subsystem,
            labels = options.labels.len(),
            "Pool collector created"
        );

        Self {
            provider,
            descriptors,
        }
    }

    /// The nine static descriptors, in export order
    pub fn describe(&self) -> &[MetricDescriptor] {
        &self.descriptors
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn descriptor(&self, metric: PoolMetric) -> &MetricDescriptor {
        &self.descriptors[metric as usize]
    }

    /// Sample the provider once and translate the snapshot.
    ///
    /// A provider error is returned as-is and nothing is emitted.
    pub fn collect(&self) -> Result<Vec<Sample<'_>>> {
        let stat = self.provider.stat()?;
        Ok(self.translate(&StatSnapshot::capture(&stat)))
    }

    /// Pair every descriptor with its value from `snapshot`
    pub fn translate(&self, snapshot: &StatSnapshot) -> Vec<Sample<'_>> {
        PoolMetric::ALL
            .iter()
            .zip(self.descriptors.iter())
            .map(|(&metric, descriptor)| Sample {
                metric,
                descriptor,
                value: metric.value(snapshot),
            })
            .collect()
    }
}

impl<P> fmt::Debug for PoolCollector<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolCollector")
            .field("descriptors", &self.descriptors)
            .finish_non_exhaustive()
    }
}
