//! FFI Module - the unsafe boundary with `libmacmon`.
//!
//! Everything that touches raw pointers lives under this module:
//!
//! ```text
//! ffi/
//! ├── mod.rs       # Entry point signatures and symbol names
//! ├── layout.rs    # #[repr(C)] struct mirrors
//! ├── loader.rs    # dlopen over an ordered candidate list
//! ├── symbols.rs   # Typed symbol table, resolved once
//! ├── sampler.rs   # Owned native sampler
//! └── transfer.rs  # Scoped ownership of returned buffers
//! ```
//!
//! Errors convert to [`crate::Result`], never panic. Signatures are declared
//! once here and cast in exactly one place ([`SymbolTable`] resolution).

use std::ffi::{c_void, CStr};

pub mod layout;
pub mod loader;
pub mod sampler;
pub mod symbols;
pub(crate) mod transfer;

pub use layout::{RawMetrics, RawMemory, RawSocInfo, RawTemperature, RawUsage};
pub use loader::{load_first, CandidatePath, DynamicLoader, NativeLibrary, SystemLoader};
pub use sampler::{SamplerHandle, SamplerState};
pub use symbols::{AbiVariant, SymbolTable};

/// `void *sampler_new(void)`
pub type SamplerNewFn = unsafe extern "C" fn() -> *mut c_void;
/// `Metrics *sampler_get_metrics(void *sampler)`
pub type SamplerGetMetricsFn = unsafe extern "C" fn(*mut c_void) -> *mut RawMetrics;
/// `void sampler_free(void *sampler)`
pub type SamplerFreeFn = unsafe extern "C" fn(*mut c_void);
/// `void metrics_free(Metrics *metrics)`
pub type MetricsFreeFn = unsafe extern "C" fn(*mut RawMetrics);
/// `SocInfo *get_soc_info(void)`
pub type GetSocInfoFn = unsafe extern "C" fn() -> *mut RawSocInfo;
/// `void soc_info_free(SocInfo *info)`
pub type SocInfoFreeFn = unsafe extern "C" fn(*mut RawSocInfo);

/// Exported entry point names.
pub mod names {
    use super::CStr;

    /// Sampler constructor.
    pub const SAMPLER_NEW: &CStr = c"sampler_new";
    /// Metrics getter.
    pub const SAMPLER_GET_METRICS: &CStr = c"sampler_get_metrics";
    /// Sampler destructor.
    pub const SAMPLER_FREE: &CStr = c"sampler_free";
    /// Metrics buffer destructor.
    pub const METRICS_FREE: &CStr = c"metrics_free";
    /// SoC info getter.
    pub const GET_SOC_INFO: &CStr = c"get_soc_info";
    /// SoC info buffer destructor.
    pub const SOC_INFO_FREE: &CStr = c"soc_info_free";
}

/// Platform file name of the native library (`libmacmon.dylib` on macOS).
#[must_use]
pub fn default_library_name() -> String {
    format!("{}macmon{}", std::env::consts::DLL_PREFIX, std::env::consts::DLL_SUFFIX)
}
