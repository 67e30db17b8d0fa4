//! `#[repr(C)]` mirrors of the structs `libmacmon` hands across the ABI.
//!
//! These layouts are the contract with the native library. Sizes and field
//! offsets are asserted at compile time so an accidental edit fails the build
//! instead of corrupting memory at runtime.

use std::mem::{align_of, offset_of, size_of};

/// Capacity of the model/chip name buffers, including the terminating NUL.
pub const NAME_CAPACITY: usize = 64;

/// Capacity of each frequency table.
pub const FREQ_CAPACITY: usize = 32;

/// Static SoC descriptor returned by `get_soc_info`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawSocInfo {
    /// NUL-terminated model identifier.
    pub mac_model: [u8; NAME_CAPACITY],
    /// NUL-terminated chip name.
    pub chip_name: [u8; NAME_CAPACITY],
    /// Installed memory in GiB.
    pub memory_gb: u8,
    /// Efficiency core count.
    pub ecpu_cores: u8,
    /// Performance core count.
    pub pcpu_cores: u8,
    /// Efficiency core frequency table (MHz).
    pub ecpu_freqs: [u32; FREQ_CAPACITY],
    /// Performance core frequency table (MHz).
    pub pcpu_freqs: [u32; FREQ_CAPACITY],
    /// GPU core count.
    pub gpu_cores: u8,
    /// GPU frequency table (MHz).
    pub gpu_freqs: [u32; FREQ_CAPACITY],
    /// Valid entries in `ecpu_freqs`.
    pub ecpu_freqs_count: u8,
    /// Valid entries in `pcpu_freqs`.
    pub pcpu_freqs_count: u8,
    /// Valid entries in `gpu_freqs`.
    pub gpu_freqs_count: u8,
}

impl RawSocInfo {
    /// An all-zero descriptor.
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            mac_model: [0; NAME_CAPACITY],
            chip_name: [0; NAME_CAPACITY],
            memory_gb: 0,
            ecpu_cores: 0,
            pcpu_cores: 0,
            ecpu_freqs: [0; FREQ_CAPACITY],
            pcpu_freqs: [0; FREQ_CAPACITY],
            gpu_cores: 0,
            gpu_freqs: [0; FREQ_CAPACITY],
            ecpu_freqs_count: 0,
            pcpu_freqs_count: 0,
            gpu_freqs_count: 0,
        }
    }
}

/// Averaged temperatures in Celsius.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawTemperature {
    /// CPU average.
    pub cpu_temp_avg: f32,
    /// GPU average.
    pub gpu_temp_avg: f32,
}

/// Memory counters in bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawMemory {
    /// Physical RAM.
    pub ram_total: u64,
    /// RAM in use.
    pub ram_usage: u64,
    /// Swap size.
    pub swap_total: u64,
    /// Swap in use.
    pub swap_usage: u64,
}

/// Frequency (MHz) and utilization fraction of one compute domain.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawUsage {
    /// Residency-weighted frequency.
    pub frequency: u32,
    /// Active fraction, 0.0 to 1.0.
    pub usage: f32,
}

/// One sampling pass returned by `sampler_get_metrics`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawMetrics {
    /// Temperatures.
    pub temp: RawTemperature,
    /// Memory counters.
    pub memory: RawMemory,
    /// Efficiency cluster.
    pub ecpu_usage: RawUsage,
    /// Performance cluster.
    pub pcpu_usage: RawUsage,
    /// GPU.
    pub gpu_usage: RawUsage,
    /// CPU rail (W).
    pub cpu_power: f32,
    /// GPU rail (W).
    pub gpu_power: f32,
    /// Neural engine rail (W).
    pub ane_power: f32,
    /// Sum of CPU, GPU and ANE (W).
    pub all_power: f32,
    /// Whole system (W).
    pub sys_power: f32,
    /// DRAM (W).
    pub ram_power: f32,
    /// GPU SRAM (W).
    pub gpu_ram_power: f32,
}

impl RawMetrics {
    /// An all-zero metrics buffer.
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            temp: RawTemperature { cpu_temp_avg: 0.0, gpu_temp_avg: 0.0 },
            memory: RawMemory { ram_total: 0, ram_usage: 0, swap_total: 0, swap_usage: 0 },
            ecpu_usage: RawUsage { frequency: 0, usage: 0.0 },
            pcpu_usage: RawUsage { frequency: 0, usage: 0.0 },
            gpu_usage: RawUsage { frequency: 0, usage: 0.0 },
            cpu_power: 0.0,
            gpu_power: 0.0,
            ane_power: 0.0,
            all_power: 0.0,
            sys_power: 0.0,
            ram_power: 0.0,
            gpu_ram_power: 0.0,
        }
    }
}

const _: () = {
    assert!(size_of::<RawSocInfo>() == 524);
    assert!(align_of::<RawSocInfo>() == 4);
    assert!(offset_of!(RawSocInfo, chip_name) == 64);
    assert!(offset_of!(RawSocInfo, memory_gb) == 128);
    assert!(offset_of!(RawSocInfo, ecpu_freqs) == 132);
    assert!(offset_of!(RawSocInfo, pcpu_freqs) == 260);
    assert!(offset_of!(RawSocInfo, gpu_cores) == 388);
    assert!(offset_of!(RawSocInfo, gpu_freqs) == 392);
    assert!(offset_of!(RawSocInfo, ecpu_freqs_count) == 520);
    assert!(offset_of!(RawSocInfo, gpu_freqs_count) == 522);

    assert!(size_of::<RawMetrics>() == 96);
    assert!(align_of::<RawMetrics>() == 8);
    assert!(offset_of!(RawMetrics, memory) == 8);
    assert!(offset_of!(RawMetrics, ecpu_usage) == 40);
    assert!(offset_of!(RawMetrics, pcpu_usage) == 48);
    assert!(offset_of!(RawMetrics, gpu_usage) == 56);
    assert!(offset_of!(RawMetrics, cpu_power) == 64);
    assert!(offset_of!(RawMetrics, gpu_ram_power) == 88);
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed_soc_info_has_empty_tables() {
        let raw = RawSocInfo::zeroed();

        assert!(raw.mac_model.iter().all(|&b| b == 0));
        assert_eq!(raw.ecpu_freqs_count, 0);
        assert_eq!(raw.gpu_freqs, [0; FREQ_CAPACITY]);
    }

    #[test]
    fn test_zeroed_metrics_matches_default() {
        assert_eq!(RawMetrics::zeroed(), RawMetrics::default());
    }

    #[test]
    fn test_usage_layout_is_two_words() {
        assert_eq!(size_of::<RawUsage>(), 8);
        assert_eq!(size_of::<RawTemperature>(), 8);
        assert_eq!(size_of::<RawMemory>(), 32);
    }
}
