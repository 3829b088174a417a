//! ABOUTME: Bridge from PoolCollector to a prometheus-client registry
//! ABOUTME: Encodes each collected sample as a const counter or gauge

use crate::collector::{MetricValue, PoolCollector, Sample};
use crate::descriptor::LabelSet;
use crate::stat::StatProvider;
use prometheus_client::collector::Collector;
use prometheus_client::encoding::{
    DescriptorEncoder, EncodeLabelValue, EncodeMetric, LabelValueEncoder,
};
use prometheus_client::metrics::counter::ConstCounter;
use prometheus_client::metrics::gauge::ConstGauge;
use std::fmt::{self, Write};

impl<P> Collector for PoolCollector<P>
where
    P: StatProvider + 'static,
{
    /// Called on each scrape. A failed stat read aborts the encode before
    /// any sample is written.
    fn encode(&self, mut encoder: DescriptorEncoder) -> Result<(), fmt::Error> {
        let samples = self.collect().map_err(|e| {
            tracing::error!(error = %e, "Failed to collect pool stats");
            fmt::Error
        })?;

        for sample in &samples {
            encode_sample(&mut encoder, sample)?;
        }

        Ok(())
    }
}

/// Label value written with `\`, `"` and newline escaped
#[derive(Debug, Clone, PartialEq, Eq)]
struct EscapedLabelValue(String);

impl EncodeLabelValue for EscapedLabelValue {
    fn encode(&self, encoder: &mut LabelValueEncoder) -> Result<(), fmt::Error> {
        for c in self.0.chars() {
            match c {
                '\\' => encoder.write_str("\\\\")?,
                '"' => encoder.write_str("\\\"")?,
                '\n' => encoder.write_str("\\n")?,
                c => encoder.write_char(c)?,
            }
        }
        Ok(())
    }
}

fn label_pairs(labels: &LabelSet) -> Vec<(String, EscapedLabelValue)> {
    labels
        .iter()
        .map(|(name, value)| (name.to_string(), EscapedLabelValue(value.to_string())))
        .collect()
}

fn encode_sample(encoder: &mut DescriptorEncoder, sample: &Sample<'_>) -> Result<(), fmt::Error> {
    let descriptor = sample.descriptor;
    let labels = label_pairs(descriptor.const_labels());

    match sample.value {
        MetricValue::Counter(value) => {
            let counter = ConstCounter::new(value);
            let mut metric_encoder = encoder.encode_descriptor(
                descriptor.family_name(),
                descriptor.help(),
                None,
                counter.metric_type(),
            )?;
            if labels.is_empty() {
                return counter.encode(metric_encoder);
            }
            let family_encoder = metric_encoder.encode_family(&labels)?;
            counter.encode(family_encoder)
        }
        MetricValue::Gauge(value) => {
            let gauge = ConstGauge::new(value);
            let mut metric_encoder = encoder.encode_descriptor(
                descriptor.family_name(),
                descriptor.help(),
                None,
                gauge.metric_type(),
            )?;
            if labels.is_empty() {
                return gauge.encode(metric_encoder);
            }
            let family_encoder = metric_encoder.encode_family(&labels)?;
            gauge.encode(family_encoder)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stat::StatSnapshot;
    use cp_core::{Error, Result};
    use prometheus_client::encoding::text::encode;
    use prometheus_client::registry::Registry;

    fn render(collector: PoolCollector<impl StatProvider + 'static>) -> std::result::Result<String, fmt::Error> {
        let mut registry = Registry::default();
        registry.register_collector(Box::new(collector));

        let mut buffer = String::new();
        encode(&mut buffer, &registry)?;
        Ok(buffer)
    }

    #[test]
    fn test_encodes_types_and_help() {
        let collector = PoolCollector::new(
            || -> Result<StatSnapshot> {
                Ok(StatSnapshot {
                    idle_resources: 3,
                    total_resources: 3,
                    max_resources: 8,
                    ..Default::default()
                })
            },
            LabelSet::new().with("host", "db-1"),
        );
        let text = render(collector).unwrap();

        assert!(text.contains("# TYPE ch_pool_acquires counter"));
        assert!(text.contains("# HELP ch_pool_acquires Cumulative count of successful acquires from the pool."));
        assert!(text.contains("# TYPE ch_pool_idle_connections gauge"));
        assert!(text.contains("ch_pool_idle_connections{host=\"db-1\"} 3"));
        assert!(text.contains("ch_pool_max_connections{host=\"db-1\"} 8"));
        assert!(text.contains("ch_pool_acquires_total{host=\"db-1\"} 0"));
        assert!(text.trim_end().ends_with("# EOF"));
    }

    #[test]
    fn test_unlabeled_samples() {
        let collector = PoolCollector::new(
            || -> Result<StatSnapshot> {
                Ok(StatSnapshot {
                    max_resources: 8,
                    ..Default::default()
                })
            },
            LabelSet::new(),
        );
        let text = render(collector).unwrap();

        assert!(text.contains("ch_pool_max_connections 8"));
        assert!(text.contains("ch_pool_acquire_duration_nanoseconds_total 0"));
    }

    #[test]
    fn test_label_values_are_escaped() {
        let collector = PoolCollector::new(
            || -> Result<StatSnapshot> {
                Ok(StatSnapshot {
                    max_resources: 2,
                    ..Default::default()
                })
            },
            LabelSet::new().with("dsn", r"C:\db"),
        );
        let text = render(collector).unwrap();

        assert!(text.contains(r#"ch_pool_max_connections{dsn="C:\\db"} 2"#));
    }

    #[test]
    fn test_failing_provider_fails_encode() {
        let collector = PoolCollector::new(
            || -> Result<StatSnapshot> { Err(Error::Stat("pool closed".to_string())) },
            LabelSet::new(),
        );
        assert!(render(collector).is_err());
    }
}
