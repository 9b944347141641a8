//! A metrics recorder that keeps every metric in memory and logs a snapshot
//! on request.

use anyhow::anyhow;
use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
use metrics_util::registry::{AtomicStorage, Registry};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, info};

/// Records counters, gauges and histograms into an in-memory registry.
pub struct LoggingRecorder {
    registry: Arc<Registry<Key, AtomicStorage>>,
}

/// Read access to the values captured by a [`LoggingRecorder`].
#[derive(Clone)]
pub struct MetricsHandle {
    registry: Arc<Registry<Key, AtomicStorage>>,
}

impl LoggingRecorder {
    /// Creates a recorder and a handle onto the same registry.
    pub fn new() -> (Self, MetricsHandle) {
        let registry = Arc::new(Registry::new(AtomicStorage));
        let handle = MetricsHandle {
            registry: registry.clone(),
        };
        (Self { registry }, handle)
    }
}

/// Installs a [`LoggingRecorder`] as the process-wide recorder.
///
/// Fails if a recorder is already installed.
pub fn install() -> anyhow::Result<MetricsHandle> {
    let (recorder, handle) = LoggingRecorder::new();
    metrics::set_global_recorder(recorder)
        .map_err(|_| anyhow!("A metrics recorder is already installed"))?;
    Ok(handle)
}

impl MetricsHandle {
    /// Current value of the counter `name`, summed over all label sets.
    pub fn counter(&self, name: &str) -> u64 {
        self.registry
            .get_counter_handles()
            .into_iter()
            .filter(|(key, _)| key.name() == name)
            .map(|(_, counter)| counter.load(Ordering::Relaxed))
            .sum()
    }

    /// Number of samples recorded into the histogram `name`.
    pub fn histogram_count(&self, name: &str) -> usize {
        self.registry
            .get_histogram_handles()
            .into_iter()
            .filter(|(key, _)| key.name() == name)
            .map(|(_, bucket)| bucket.data().len())
            .sum()
    }

    /// Logs every captured metric.
    pub fn log_snapshot(&self) {
        debug!("--- Metrics Snapshot ---");

        for (key, counter) in self.registry.get_counter_handles() {
            info!("[Counter] {}: {}", key.name(), counter.load(Ordering::Relaxed));
        }

        for (key, gauge) in self.registry.get_gauge_handles() {
            let value = f64::from_bits(gauge.load(Ordering::Relaxed));
            info!("[Gauge] {}: {}", key.name(), value);
        }

        for (key, bucket) in self.registry.get_histogram_handles() {
            let samples = bucket.data();
            if samples.is_empty() {
                continue;
            }
            let total: f64 = samples.iter().sum();
            info!(
                "[Histogram] {}: count={} mean={:.4}",
                key.name(),
                samples.len(),
                total / samples.len() as f64
            );
        }
    }
}

impl Recorder for LoggingRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        self.registry.get_or_create_counter(key, |c| c.clone()).into()
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        self.registry.get_or_create_gauge(key, |g| g.clone()).into()
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        self.registry.get_or_create_histogram(key, |h| h.clone()).into()
    }
}
