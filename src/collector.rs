//! Collector adapter for polling monitor hosts.
//!
//! - [`MetricValue`]: gauge, counter or text
//! - [`Metrics`]: a timestamped collection of metric values
//! - [`Collector`]: trait for metric sources
//! - [`MacmonCollector`]: a [`Collector`] backed by [`Macmon`]

use crate::config::Config;
use crate::error::Result;
use crate::ffi::SamplerState;
use crate::macmon::Macmon;
use crate::types::{MetricsSnapshot, SocInfo};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A single metric value.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    /// A point-in-time measurement (temperature, watts).
    Gauge(f64),

    /// An integral quantity (bytes, core counts).
    Counter(u64),

    /// A text value (chip name).
    Text(String),
}

impl MetricValue {
    /// Returns the value as a gauge, if it is one.
    #[must_use]
    pub fn as_gauge(&self) -> Option<f64> {
        match self {
            Self::Gauge(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as a counter, if it is one.
    #[must_use]
    pub fn as_counter(&self) -> Option<u64> {
        match self {
            Self::Counter(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as text, if it is one.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        Self::Gauge(value)
    }
}

impl From<f32> for MetricValue {
    fn from(value: f32) -> Self {
        Self::Gauge(f64::from(value))
    }
}

impl From<u64> for MetricValue {
    fn from(value: u64) -> Self {
        Self::Counter(value)
    }
}

impl From<String> for MetricValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A collection of metrics with a timestamp.
#[derive(Debug, Clone)]
pub struct Metrics {
    /// When these metrics were collected.
    pub timestamp: Instant,

    /// The metric values, keyed by metric name.
    pub values: HashMap<String, MetricValue>,
}

impl Metrics {
    /// Creates a new empty metrics collection with the current timestamp.
    #[must_use]
    pub fn new() -> Self {
        Self { timestamp: Instant::now(), values: HashMap::new() }
    }

    /// Adds a metric value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetricValue>) {
        self.values.insert(key.into(), value.into());
    }

    /// Gets a metric value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&MetricValue> {
        self.values.get(key)
    }

    /// Gets a gauge value by key.
    #[must_use]
    pub fn get_gauge(&self, key: &str) -> Option<f64> {
        self.values.get(key).and_then(MetricValue::as_gauge)
    }

    /// Gets a counter value by key.
    #[must_use]
    pub fn get_counter(&self, key: &str) -> Option<u64> {
        self.values.get(key).and_then(MetricValue::as_counter)
    }

    /// Gets a text value by key.
    #[must_use]
    pub fn get_text(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(MetricValue::as_text)
    }

    /// Returns the number of metrics in this collection.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if there are no metrics.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Flattens one snapshot into named metrics.
    #[must_use]
    pub fn from_snapshot(snapshot: &MetricsSnapshot) -> Self {
        let mut metrics = Self::new();

        metrics.insert("temp.cpu", snapshot.temp.cpu_temp_avg);
        metrics.insert("temp.gpu", snapshot.temp.gpu_temp_avg);

        metrics.insert("memory.ram_total", snapshot.memory.ram_total);
        metrics.insert("memory.ram_used", snapshot.memory.ram_usage);
        metrics.insert("memory.swap_total", snapshot.memory.swap_total);
        metrics.insert("memory.swap_used", snapshot.memory.swap_usage);

        for (domain, usage) in [
            ("ecpu", snapshot.ecpu_usage),
            ("pcpu", snapshot.pcpu_usage),
            ("gpu", snapshot.gpu_usage),
        ] {
            metrics.insert(format!("{domain}.freq_mhz"), usage.frequency());
            metrics.insert(format!("{domain}.usage"), usage.usage());
        }

        for (rail, watts) in [
            ("cpu", snapshot.cpu_power),
            ("gpu", snapshot.gpu_power),
            ("ane", snapshot.ane_power),
            ("all", snapshot.all_power),
            ("sys", snapshot.sys_power),
            ("ram", snapshot.ram_power),
            ("gpu_ram", snapshot.gpu_ram_power),
        ] {
            metrics.insert(format!("power.{rail}"), watts);
        }

        metrics
    }

    /// Adds the static descriptor under `soc.*`.
    pub fn insert_soc_info(&mut self, info: &SocInfo) {
        self.insert("soc.mac_model", info.mac_model.clone());
        self.insert("soc.chip_name", info.chip_name.clone());
        self.insert("soc.memory_gb", u64::from(info.memory_gb));
        self.insert("soc.ecpu_cores", u64::from(info.ecpu_cores));
        self.insert("soc.pcpu_cores", u64::from(info.pcpu_cores));
        self.insert("soc.gpu_cores", u64::from(info.gpu_cores));
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for metric collectors.
///
/// Collectors must be `Send + Sync` to allow collection from background
/// threads.
pub trait Collector: Send + Sync {
    /// Returns the unique identifier for this collector.
    fn id(&self) -> &'static str;

    /// Collects metrics from this source.
    ///
    /// # Errors
    ///
    /// Returns an error if metric collection fails.
    fn collect(&mut self) -> Result<Metrics>;

    /// Returns true if this collector is available on the current system.
    fn is_available(&self) -> bool;

    /// Suggests an appropriate collection interval for this collector.
    fn interval_hint(&self) -> Duration {
        Duration::from_millis(1000)
    }

    /// Returns a human-readable name for this collector.
    fn display_name(&self) -> &'static str {
        self.id()
    }
}

/// Collector backed by an attached [`Macmon`].
///
/// The SoC descriptor is fetched once when the collector is built and
/// attached to every collection.
#[derive(Debug)]
pub struct MacmonCollector {
    monitor: Macmon,
    soc_info: Option<SocInfo>,
    interval: Duration,
}

impl MacmonCollector {
    /// Wraps an attached binding. A descriptor fetch failure is tolerated.
    #[must_use]
    pub fn new(monitor: Macmon, config: &Config) -> Self {
        let soc_info = monitor.soc_info().ok();
        Self { monitor, soc_info, interval: config.update_interval() }
    }

    /// The cached descriptor, if it could be fetched.
    #[must_use]
    pub fn soc_info(&self) -> Option<&SocInfo> {
        self.soc_info.as_ref()
    }

    /// The underlying binding.
    #[must_use]
    pub fn monitor(&self) -> &Macmon {
        &self.monitor
    }
}

impl Collector for MacmonCollector {
    fn id(&self) -> &'static str {
        "macmon"
    }

    fn collect(&mut self) -> Result<Metrics> {
        let snapshot = self.monitor.metrics()?;
        let mut metrics = Metrics::from_snapshot(&snapshot);
        if let Some(info) = &self.soc_info {
            metrics.insert_soc_info(info);
        }
        Ok(metrics)
    }

    fn is_available(&self) -> bool {
        self.monitor.sampler_state() == SamplerState::Active
    }

    fn interval_hint(&self) -> Duration {
        self.interval
    }

    fn display_name(&self) -> &'static str {
        "Apple SoC"
    }
}
