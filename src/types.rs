//! Owned, serializable values produced by the binding.
//!
//! - [`SocInfo`]: static hardware descriptor, one per `get_soc_info` call
//! - [`MetricsSnapshot`]: one sampling pass, one per `sampler_get_metrics` call
//! - [`Report`]: both together
//!
//! Field names are the stable serialized shape consumed by hosts.

use crate::ffi::layout::{RawMemory, RawMetrics, RawSocInfo, RawTemperature, RawUsage};
use crate::marshal::{bounded_array, bounded_str};
use serde::{Deserialize, Serialize};

/// Static description of the SoC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocInfo {
    /// Machine model identifier (e.g. `Mac14,2`).
    pub mac_model: String,
    /// Chip name (e.g. `Apple M2`).
    pub chip_name: String,
    /// Installed memory in GiB.
    pub memory_gb: u8,
    /// Efficiency core count.
    pub ecpu_cores: u8,
    /// Performance core count.
    pub pcpu_cores: u8,
    /// Supported efficiency core frequencies (MHz).
    pub ecpu_freqs: Vec<u32>,
    /// Supported performance core frequencies (MHz).
    pub pcpu_freqs: Vec<u32>,
    /// GPU core count.
    pub gpu_cores: u8,
    /// Supported GPU frequencies (MHz).
    pub gpu_freqs: Vec<u32>,
}

impl SocInfo {
    /// Total CPU cores.
    #[must_use]
    pub fn cpu_cores(&self) -> u16 {
        u16::from(self.ecpu_cores) + u16::from(self.pcpu_cores)
    }
}

impl From<&RawSocInfo> for SocInfo {
    fn from(raw: &RawSocInfo) -> Self {
        Self {
            mac_model: bounded_str(&raw.mac_model),
            chip_name: bounded_str(&raw.chip_name),
            memory_gb: raw.memory_gb,
            ecpu_cores: raw.ecpu_cores,
            pcpu_cores: raw.pcpu_cores,
            ecpu_freqs: bounded_array(&raw.ecpu_freqs, raw.ecpu_freqs_count),
            pcpu_freqs: bounded_array(&raw.pcpu_freqs, raw.pcpu_freqs_count),
            gpu_cores: raw.gpu_cores,
            gpu_freqs: bounded_array(&raw.gpu_freqs, raw.gpu_freqs_count),
        }
    }
}

/// Averaged temperatures in Celsius.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    /// CPU average.
    pub cpu_temp_avg: f32,
    /// GPU average.
    pub gpu_temp_avg: f32,
}

impl From<RawTemperature> for Temperature {
    fn from(raw: RawTemperature) -> Self {
        Self { cpu_temp_avg: raw.cpu_temp_avg, gpu_temp_avg: raw.gpu_temp_avg }
    }
}

/// Memory and swap counters in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryUsage {
    /// Physical RAM.
    pub ram_total: u64,
    /// RAM in use.
    pub ram_usage: u64,
    /// Swap size.
    pub swap_total: u64,
    /// Swap in use.
    pub swap_usage: u64,
}

impl MemoryUsage {
    /// RAM in use as a fraction of total, 0.0 when total is unknown.
    #[must_use]
    pub fn ram_fraction(&self) -> f64 {
        if self.ram_total == 0 {
            0.0
        } else {
            self.ram_usage as f64 / self.ram_total as f64
        }
    }
}

impl From<RawMemory> for MemoryUsage {
    fn from(raw: RawMemory) -> Self {
        Self {
            ram_total: raw.ram_total,
            ram_usage: raw.ram_usage,
            swap_total: raw.swap_total,
            swap_usage: raw.swap_usage,
        }
    }
}

/// `(frequency MHz, utilization fraction)`, serialized as a two-element array.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsagePair(pub f64, pub f64);

impl UsagePair {
    /// Frequency in MHz.
    #[must_use]
    pub fn frequency(&self) -> f64 {
        self.0
    }

    /// Utilization, 0.0 to 1.0.
    #[must_use]
    pub fn usage(&self) -> f64 {
        self.1
    }
}

impl From<RawUsage> for UsagePair {
    fn from(raw: RawUsage) -> Self {
        Self(f64::from(raw.frequency), f64::from(raw.usage))
    }
}

/// One point-in-time reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Temperatures.
    pub temp: Temperature,
    /// Memory counters.
    pub memory: MemoryUsage,
    /// Efficiency cluster.
    pub ecpu_usage: UsagePair,
    /// Performance cluster.
    pub pcpu_usage: UsagePair,
    /// GPU.
    pub gpu_usage: UsagePair,
    /// CPU rail (W).
    pub cpu_power: f32,
    /// GPU rail (W).
    pub gpu_power: f32,
    /// Neural engine rail (W).
    pub ane_power: f32,
    /// CPU + GPU + ANE (W).
    pub all_power: f32,
    /// Whole system (W).
    pub sys_power: f32,
    /// DRAM (W).
    pub ram_power: f32,
    /// GPU SRAM (W).
    pub gpu_ram_power: f32,
}

impl From<&RawMetrics> for MetricsSnapshot {
    fn from(raw: &RawMetrics) -> Self {
        Self {
            temp: raw.temp.into(),
            memory: raw.memory.into(),
            ecpu_usage: raw.ecpu_usage.into(),
            pcpu_usage: raw.pcpu_usage.into(),
            gpu_usage: raw.gpu_usage.into(),
            cpu_power: raw.cpu_power,
            gpu_power: raw.gpu_power,
            ane_power: raw.ane_power,
            all_power: raw.all_power,
            sys_power: raw.sys_power,
            ram_power: raw.ram_power,
            gpu_ram_power: raw.gpu_ram_power,
        }
    }
}

/// Descriptor and one snapshot, as printed by one-shot consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Static SoC description.
    pub soc: SocInfo,
    /// Current reading.
    pub metrics: MetricsSnapshot,
}
