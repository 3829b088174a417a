//! ABOUTME: Prometheus collector translating pool stat snapshots into metrics
//! ABOUTME: Defines the snapshot contract, metric descriptors and the registry bridge

pub mod collector;
pub mod descriptor;
pub mod exposition;
pub mod stat;

pub use collector::{CollectorOptions, MetricValue, PoolCollector, PoolMetric, Sample};
pub use descriptor::{LabelSet, MetricDescriptor, MetricKind};
pub use stat::{PoolStat, StatProvider, StatSnapshot};
