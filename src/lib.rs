//! # macmon-binding
//!
//! Runtime binding to `libmacmon`, a native library reporting Apple Silicon
//! SoC details and live power, thermal and utilization metrics through a C
//! ABI.
//!
//! The library is opened with `dlopen` at startup, its entry points are
//! resolved into a typed symbol table, and every native buffer it returns is
//! copied into owned, serde-serializable values and released exactly once.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use macmon_binding::Macmon;
//!
//! let monitor = Macmon::new()?;
//! let soc = monitor.soc_info()?;
//! let metrics = monitor.metrics()?;
//! println!("{} at {:.1}°C, {:.2} W", soc.chip_name, metrics.temp.cpu_temp_avg, metrics.all_power);
//! # Ok::<(), macmon_binding::MacmonError>(())
//! ```
//!
//! ## Search Order
//!
//! 1. `$MACMON_LIBRARY`, then `library.search_paths` from the config
//! 2. `libmacmon.dylib` in the working directory
//! 3. next to the running executable
//! 4. next to the object containing this crate
//!
//! ## Modules
//!
//! - [`ffi`]: loader, symbol table, sampler and native layouts (all `unsafe` lives here)
//! - [`marshal`]: bounded string/array extraction
//! - [`types`]: [`SocInfo`], [`MetricsSnapshot`], [`Report`]
//! - [`config`]: YAML configuration
//! - [`collector`]: adapter for polling monitor hosts

#![warn(missing_docs)]
// Allow unwrap() in tests only - banned in production code
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::module_name_repetitions)]

// ============================================================================
// Error Types
// ============================================================================

pub mod error;
pub use error::{LoadAttempt, MacmonError, Result};

// ============================================================================
// Native Boundary
// ============================================================================

pub mod ffi;
pub mod marshal;

// ============================================================================
// Values
// ============================================================================

pub mod types;
pub use types::{MemoryUsage, MetricsSnapshot, Report, SocInfo, Temperature, UsagePair};

// ============================================================================
// Binding
// ============================================================================

pub mod config;
mod macmon;

pub use config::Config;
pub use macmon::Macmon;

// ============================================================================
// Collector Adapter
// ============================================================================

pub mod collector;
pub use collector::{Collector, MacmonCollector, MetricValue, Metrics};

// ============================================================================
// Prelude
// ============================================================================

/// Commonly used types.
pub mod prelude {
    pub use crate::collector::{Collector, MacmonCollector, Metrics};
    pub use crate::config::Config;
    pub use crate::error::{MacmonError, Result};
    pub use crate::ffi::{AbiVariant, CandidatePath, DynamicLoader, SamplerState};
    pub use crate::macmon::Macmon;
    pub use crate::types::{MetricsSnapshot, Report, SocInfo};
}
