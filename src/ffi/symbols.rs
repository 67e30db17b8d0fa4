//! Symbol resolver.
//!
//! Resolves the fixed set of `libmacmon` entry points into a [`SymbolTable`]
//! of typed function pointers. Resolution is all-or-nothing.

use super::loader::NativeLibrary;
use super::{
    names, GetSocInfoFn, MetricsFreeFn, SamplerFreeFn, SamplerGetMetricsFn, SamplerNewFn,
    SocInfoFreeFn,
};
use crate::error::{MacmonError, Result};
use serde::{Deserialize, Serialize};
use std::ffi::{c_void, CStr};
use std::mem::size_of;
use std::ptr::NonNull;
use tracing::{debug, warn};

/// Which entry points the library is expected to export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AbiVariant {
    /// Sampler, metrics and SoC info entry points.
    #[default]
    Full,
    /// Sampler and metrics entry points only.
    MetricsOnly,
}

/// Entry points for the static SoC descriptor.
#[derive(Debug, Clone, Copy)]
pub struct SocInfoSymbols {
    pub(crate) get_soc_info: GetSocInfoFn,
    pub(crate) soc_info_free: SocInfoFreeFn,
}

/// Typed entry points, resolved once and immutable afterwards.
///
/// The pointers are only valid while the library they came from is open, so
/// tables are built by [`Macmon`](crate::Macmon), which owns that library:
///
/// ```compile_fail
/// use macmon_binding::ffi::{AbiVariant, DynamicLoader, SymbolTable, SystemLoader};
///
/// let library = SystemLoader.open("libmacmon.dylib".as_ref()).unwrap();
/// let table = SymbolTable::resolve(library.as_ref(), AbiVariant::Full);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SymbolTable {
    pub(crate) sampler_new: SamplerNewFn,
    pub(crate) sampler_get_metrics: SamplerGetMetricsFn,
    pub(crate) sampler_free: SamplerFreeFn,
    pub(crate) metrics_free: MetricsFreeFn,
    pub(crate) soc_info: Option<SocInfoSymbols>,
}

impl SymbolTable {
    /// Resolves every entry point `abi` requires.
    ///
    /// # Errors
    ///
    /// Returns [`MacmonError::SymbolResolution`] naming all missing symbols.
    /// The caller owns `library` and is responsible for closing it.
    pub(crate) fn resolve(library: &dyn NativeLibrary, abi: AbiVariant) -> Result<Self> {
        let mut missing = Vec::new();

        let mut lookup = |name: &'static CStr| -> Option<NonNull<c_void>> {
            let found = library.symbol(name);
            if found.is_none() {
                missing.push(name.to_str().unwrap_or("<non-utf8 symbol>"));
            }
            found
        };

        let sampler_new = lookup(names::SAMPLER_NEW);
        let sampler_get_metrics = lookup(names::SAMPLER_GET_METRICS);
        let sampler_free = lookup(names::SAMPLER_FREE);
        let metrics_free = lookup(names::METRICS_FREE);
        let soc_info = match abi {
            AbiVariant::Full => Some((lookup(names::GET_SOC_INFO), lookup(names::SOC_INFO_FREE))),
            AbiVariant::MetricsOnly => None,
        };

        let (
            Some(sampler_new),
            Some(sampler_get_metrics),
            Some(sampler_free),
            Some(metrics_free),
        ) = (sampler_new, sampler_get_metrics, sampler_free, metrics_free)
        else {
            return Err(missing_symbols(library, missing));
        };

        let soc_info = match soc_info {
            None => None,
            Some((Some(get_soc_info), Some(soc_info_free))) => Some((get_soc_info, soc_info_free)),
            Some(_) => return Err(missing_symbols(library, missing)),
        };

        // SAFETY: each pointer was exported under the name whose prototype
        // the target alias declares.
        #[allow(unsafe_code)]
        let table = unsafe {
            Self {
                sampler_new: cast_symbol(sampler_new),
                sampler_get_metrics: cast_symbol(sampler_get_metrics),
                sampler_free: cast_symbol(sampler_free),
                metrics_free: cast_symbol(metrics_free),
                soc_info: soc_info.map(|(get, free)| SocInfoSymbols {
                    get_soc_info: cast_symbol(get),
                    soc_info_free: cast_symbol(free),
                }),
            }
        };

        debug!(path = %library.path().display(), ?abi, "resolved native symbols");
        Ok(table)
    }

    /// Returns true if the SoC info entry points were resolved.
    #[must_use]
    pub fn has_soc_info(&self) -> bool {
        self.soc_info.is_some()
    }
}

fn missing_symbols(library: &dyn NativeLibrary, missing: Vec<&'static str>) -> MacmonError {
    warn!(path = %library.path().display(), ?missing, "native library is missing symbols");
    MacmonError::SymbolResolution { path: library.path().to_path_buf(), missing }
}

/// Reinterprets a symbol address as a function pointer.
///
/// # Safety
///
/// `F` must be an `extern "C"` function pointer type matching the symbol.
#[allow(unsafe_code)]
unsafe fn cast_symbol<F: Copy>(ptr: NonNull<c_void>) -> F {
    debug_assert_eq!(size_of::<F>(), size_of::<*mut c_void>());
    std::mem::transmute_copy(&ptr.as_ptr())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::{RawMetrics, RawSocInfo};
    use std::path::{Path, PathBuf};

    extern "C" fn sampler_new() -> *mut c_void {
        std::ptr::null_mut()
    }
    extern "C" fn sampler_get_metrics(_: *mut c_void) -> *mut RawMetrics {
        std::ptr::null_mut()
    }
    extern "C" fn sampler_free(_: *mut c_void) {}
    extern "C" fn metrics_free(_: *mut RawMetrics) {}
    extern "C" fn get_soc_info() -> *mut RawSocInfo {
        std::ptr::null_mut()
    }
    extern "C" fn soc_info_free(_: *mut RawSocInfo) {}

    /// Exports every entry point except those listed in `omit`.
    struct TableLibrary {
        path: PathBuf,
        omit: Vec<&'static str>,
    }

    impl NativeLibrary for TableLibrary {
        fn path(&self) -> &Path {
            &self.path
        }

        fn symbol(&self, name: &CStr) -> Option<NonNull<c_void>> {
            let name = name.to_str().ok()?;
            if self.omit.contains(&name) {
                return None;
            }
            let addr = match name {
                "sampler_new" => sampler_new as extern "C" fn() -> *mut c_void as *mut c_void,
                "sampler_get_metrics" => {
                    sampler_get_metrics as extern "C" fn(*mut c_void) -> *mut RawMetrics
                        as *mut c_void
                }
                "sampler_free" => sampler_free as extern "C" fn(*mut c_void) as *mut c_void,
                "metrics_free" => metrics_free as extern "C" fn(*mut RawMetrics) as *mut c_void,
                "get_soc_info" => get_soc_info as extern "C" fn() -> *mut RawSocInfo as *mut c_void,
                "soc_info_free" => soc_info_free as extern "C" fn(*mut RawSocInfo) as *mut c_void,
                _ => return None,
            };
            NonNull::new(addr)
        }
    }

    fn library(omit: &[&'static str]) -> TableLibrary {
        TableLibrary { path: PathBuf::from("/tmp/libmacmon.dylib"), omit: omit.to_vec() }
    }

    #[test]
    fn test_full_variant_resolves_soc_info() {
        let table = SymbolTable::resolve(&library(&[]), AbiVariant::Full).expect("resolve");

        assert!(table.has_soc_info());
    }

    #[test]
    fn test_metrics_only_variant_skips_soc_info() {
        let lib = library(&["get_soc_info", "soc_info_free"]);
        let table = SymbolTable::resolve(&lib, AbiVariant::MetricsOnly).expect("resolve");

        assert!(!table.has_soc_info());
    }

    #[test]
    fn test_every_missing_symbol_is_reported() {
        let lib = library(&["sampler_free", "soc_info_free"]);

        let err = SymbolTable::resolve(&lib, AbiVariant::Full).expect_err("must fail");

        match err {
            MacmonError::SymbolResolution { path, missing } => {
                assert_eq!(path, PathBuf::from("/tmp/libmacmon.dylib"));
                assert_eq!(missing, vec!["sampler_free", "soc_info_free"]);
            }
            other => panic!("expected SymbolResolution, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_info_symbol_fails_full_variant() {
        let lib = library(&["get_soc_info"]);

        let err = SymbolTable::resolve(&lib, AbiVariant::Full).expect_err("must fail");

        assert!(matches!(err, MacmonError::SymbolResolution { ref missing, .. } if missing == &["get_soc_info"]));
    }

    #[test]
    fn test_abi_variant_serde_names() {
        let parsed: AbiVariant = serde_yaml_ng::from_str("metrics-only").expect("parse");
        assert_eq!(parsed, AbiVariant::MetricsOnly);
        assert_eq!(AbiVariant::default(), AbiVariant::Full);
    }
}
