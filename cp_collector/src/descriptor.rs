//! ABOUTME: Static metric descriptors and constant label sets
//! ABOUTME: Built once per collector and shared by every collection

use std::collections::BTreeMap;
use std::fmt;

/// Default metric namespace
pub const DEFAULT_NAMESPACE: &str = "ch";
/// Default metric subsystem
pub const DEFAULT_SUBSYSTEM: &str = "pool";

/// Kind of an exported metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// Monotonically increasing value
    Counter,
    /// Point-in-time value
    Gauge,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::Counter => write!(f, "counter"),
            MetricKind::Gauge => write!(f, "gauge"),
        }
    }
}

/// Constant labels attached to every descriptor of a collector.
///
/// Ordered by label name so exposition output is stable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LabelSet(BTreeMap<String, String>);

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a label, replacing any previous value for `name`
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for LabelSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<BTreeMap<String, String>> for LabelSet {
    fn from(labels: BTreeMap<String, String>) -> Self {
        Self(labels)
    }
}

/// Immutable description of one exported metric
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    name: String,
    help: &'static str,
    kind: MetricKind,
    const_labels: LabelSet,
}

impl MetricDescriptor {
    pub fn new(
        name: impl Into<String>,
        help: &'static str,
        kind: MetricKind,
        const_labels: LabelSet,
    ) -> Self {
        Self {
            name: name.into(),
            help,
            kind,
            const_labels,
        }
    }

    /// Fully-qualified metric name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &'static str {
        self.help
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    pub fn const_labels(&self) -> &LabelSet {
        &self.const_labels
    }

    /// Family name as written in `# TYPE` and `# HELP` lines.
    ///
    /// OpenMetrics appends `_total` to counter samples itself, so a
    /// trailing `_total` is dropped from counter names here.
    pub fn family_name(&self) -> &str {
        match self.kind {
            MetricKind::Counter => self.name.strip_suffix("_total").unwrap_or(&self.name),
            MetricKind::Gauge => &self.name,
        }
    }
}

/// Join non-empty name fragments with `_`.
///
/// Returns an empty string when `name` is empty.
pub fn build_fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }

    [namespace, subsystem, name]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}

/// Whether `name` is usable as a metric name or name fragment
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// Whether `name` is usable as a label name; `__` prefixes are reserved
pub fn is_valid_label_name(name: &str) -> bool {
    if name.starts_with("__") {
        return false;
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
