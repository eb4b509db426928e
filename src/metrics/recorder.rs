//! Prometheus recorders owned by the collector
//!
//! Each [`MetricStore`] wraps its own recorder instead of installing a global
//! one, so several collectors (and tests) can live in one process.

use crate::metrics::collector::{MetricDescriptor, Sample, ROUTER_LABEL};
use metrics::{counter, describe_counter, describe_gauge, gauge, with_local_recorder};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Values are set as absolute counter readings
    Counter,

    /// Values are set as gauges and survive until overwritten
    Gauge,
}

pub struct MetricStore {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
    kind: MetricKind,
}

impl MetricStore {
    pub fn new(kind: MetricKind, descriptors: &[MetricDescriptor]) -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        with_local_recorder(&recorder, || {
            for descriptor in descriptors {
                match kind {
                    MetricKind::Counter => {
                        describe_counter!(descriptor.name.clone(), descriptor.help)
                    }
                    MetricKind::Gauge => describe_gauge!(descriptor.name.clone(), descriptor.help),
                }
            }
        });

        Self {
            recorder,
            handle,
            kind,
        }
    }

    /// Set every sample's value, overwriting what the store held for the same
    /// name and router. Series not in `samples` are left untouched.
    pub fn set(&self, samples: &[Sample]) {
        with_local_recorder(&self.recorder, || {
            for sample in samples {
                let router = sample.router.clone();
                match self.kind {
                    MetricKind::Counter => {
                        counter!(sample.name.clone(), ROUTER_LABEL => router)
                            .absolute(sample.reading)
                    }
                    MetricKind::Gauge => {
                        gauge!(sample.name.clone(), ROUTER_LABEL => router).set(sample.value)
                    }
                }
            }
        });
    }

    /// Prometheus text exposition of everything recorded so far
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(name: &str, router: &str, reading: u64) -> Sample {
        Sample {
            name: name.to_string(),
            router: router.to_string(),
            value: reading as f64,
            reading,
        }
    }

    fn descriptor(name: &str) -> MetricDescriptor {
        MetricDescriptor {
            name: name.to_string(),
            help: "test metric",
            labels: vec![ROUTER_LABEL],
        }
    }

    #[test]
    fn test_gauge_store_keeps_absent_series() {
        let store = MetricStore::new(MetricKind::Gauge, &[descriptor("test_gauge")]);

        store.set(&[sample("test_gauge", "a", 1), sample("test_gauge", "b", 2)]);
        store.set(&[sample("test_gauge", "a", 5)]);

        let output = store.render();
        assert!(output.contains(r#"test_gauge{router="a"} 5"#));
        assert!(output.contains(r#"test_gauge{router="b"} 2"#));
    }

    #[test]
    fn test_stores_are_independent() {
        let first = MetricStore::new(MetricKind::Counter, &[descriptor("test_counter")]);
        let second = MetricStore::new(MetricKind::Counter, &[descriptor("test_counter")]);

        first.set(&[sample("test_counter", "a", 42)]);

        assert!(first.render().contains(r#"router="a""#));
        assert!(!second.render().contains(r#"router="a""#));
    }
}
