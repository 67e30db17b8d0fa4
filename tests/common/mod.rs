//! In-process stand-in for `libmacmon`.
//!
//! The fake entry points allocate real heap buffers and count every
//! allocation and release, so tests can check the ownership contract.
//! Counters are process-global: every test takes [`serial`] first.

#![allow(unsafe_code, dead_code)]

use macmon_binding::ffi::{
    DynamicLoader, GetSocInfoFn, MetricsFreeFn, NativeLibrary, RawMetrics, RawSocInfo,
    SamplerFreeFn, SamplerGetMetricsFn, SamplerNewFn, SocInfoFreeFn,
};
use macmon_binding::Config;
use std::ffi::{c_void, CStr};
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, AtomicIsize, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const SAMPLER_MAGIC: u64 = 0x6d61_636d_6f6e;

static SERIAL: Mutex<()> = Mutex::new(());

pub static LIBRARIES_OPEN: AtomicIsize = AtomicIsize::new(0);
pub static SAMPLERS_CREATED: AtomicUsize = AtomicUsize::new(0);
pub static SAMPLERS_FREED: AtomicUsize = AtomicUsize::new(0);
pub static METRICS_ISSUED: AtomicUsize = AtomicUsize::new(0);
pub static METRICS_FREED: AtomicUsize = AtomicUsize::new(0);
pub static INFO_ISSUED: AtomicUsize = AtomicUsize::new(0);
pub static INFO_FREED: AtomicUsize = AtomicUsize::new(0);

pub static FAIL_SAMPLER_NEW: AtomicBool = AtomicBool::new(false);
pub static FAIL_INFO: AtomicBool = AtomicBool::new(false);
/// Number of upcoming metrics calls that return null.
pub static FAIL_METRICS: AtomicUsize = AtomicUsize::new(0);
/// Time each metrics call spends "sampling".
pub static SAMPLE_DELAY_MICROS: AtomicUsize = AtomicUsize::new(0);

static IN_FLIGHT: AtomicUsize = AtomicUsize::new(0);
pub static MAX_IN_FLIGHT: AtomicUsize = AtomicUsize::new(0);

pub static METRICS: Mutex<RawMetrics> = Mutex::new(RawMetrics::zeroed());
pub static SOC_INFO: Mutex<RawSocInfo> = Mutex::new(RawSocInfo::zeroed());

/// Native-side events in the order they happened.
pub static EVENTS: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Serializes tests and resets all fake library state.
pub fn serial() -> MutexGuard<'static, ()> {
    let guard = lock(&SERIAL);

    for counter in [
        &SAMPLERS_CREATED,
        &SAMPLERS_FREED,
        &METRICS_ISSUED,
        &METRICS_FREED,
        &INFO_ISSUED,
        &INFO_FREED,
        &FAIL_METRICS,
        &SAMPLE_DELAY_MICROS,
        &IN_FLIGHT,
        &MAX_IN_FLIGHT,
    ] {
        counter.store(0, Ordering::SeqCst);
    }
    LIBRARIES_OPEN.store(0, Ordering::SeqCst);
    FAIL_SAMPLER_NEW.store(false, Ordering::SeqCst);
    FAIL_INFO.store(false, Ordering::SeqCst);
    *lock(&METRICS) = RawMetrics::zeroed();
    *lock(&SOC_INFO) = RawSocInfo::zeroed();
    lock(&EVENTS).clear();

    guard
}

pub fn events() -> Vec<&'static str> {
    lock(&EVENTS).clone()
}

pub fn set_metrics(raw: RawMetrics) {
    *lock(&METRICS) = raw;
}

pub fn set_soc_info(raw: RawSocInfo) {
    *lock(&SOC_INFO) = raw;
}

pub fn count(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

/// True while a fake metrics call is inside its sampling pass.
pub fn sampling_in_progress() -> bool {
    IN_FLIGHT.load(Ordering::SeqCst) > 0
}

pub fn open_libraries() -> isize {
    LIBRARIES_OPEN.load(Ordering::SeqCst)
}

// ============================================================================
// Fake entry points
// ============================================================================

unsafe extern "C" fn sampler_new() -> *mut c_void {
    if FAIL_SAMPLER_NEW.load(Ordering::SeqCst) {
        return std::ptr::null_mut();
    }
    SAMPLERS_CREATED.fetch_add(1, Ordering::SeqCst);
    Box::into_raw(Box::new(SAMPLER_MAGIC)).cast()
}

unsafe extern "C" fn sampler_get_metrics(sampler: *mut c_void) -> *mut RawMetrics {
    assert!(!sampler.is_null(), "metrics requested without a sampler");
    assert_eq!(*sampler.cast::<u64>(), SAMPLER_MAGIC, "sampler used after free");

    let in_flight = IN_FLIGHT.fetch_add(1, Ordering::SeqCst) + 1;
    MAX_IN_FLIGHT.fetch_max(in_flight, Ordering::SeqCst);
    let delay = SAMPLE_DELAY_MICROS.load(Ordering::SeqCst);
    if delay > 0 {
        std::thread::sleep(Duration::from_micros(delay as u64));
    }
    IN_FLIGHT.fetch_sub(1, Ordering::SeqCst);

    let failing = FAIL_METRICS.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    if failing.is_ok() {
        return std::ptr::null_mut();
    }

    METRICS_ISSUED.fetch_add(1, Ordering::SeqCst);
    Box::into_raw(Box::new(*lock(&METRICS)))
}

unsafe extern "C" fn sampler_free(sampler: *mut c_void) {
    SAMPLERS_FREED.fetch_add(1, Ordering::SeqCst);
    lock(&EVENTS).push("sampler_free");
    let sampler = sampler.cast::<u64>();
    *sampler = 0;
    drop(Box::from_raw(sampler));
}

unsafe extern "C" fn metrics_free(metrics: *mut RawMetrics) {
    METRICS_FREED.fetch_add(1, Ordering::SeqCst);
    drop(Box::from_raw(metrics));
}

unsafe extern "C" fn get_soc_info() -> *mut RawSocInfo {
    if FAIL_INFO.load(Ordering::SeqCst) {
        return std::ptr::null_mut();
    }
    INFO_ISSUED.fetch_add(1, Ordering::SeqCst);
    Box::into_raw(Box::new(*lock(&SOC_INFO)))
}

unsafe extern "C" fn soc_info_free(info: *mut RawSocInfo) {
    INFO_FREED.fetch_add(1, Ordering::SeqCst);
    drop(Box::from_raw(info));
}

// ============================================================================
// Fake loader
// ============================================================================

/// A loader that can open exactly one path.
pub struct FakeLoader {
    pub path: PathBuf,
    pub omit: Vec<&'static str>,
}

impl FakeLoader {
    pub fn new() -> Self {
        Self { path: PathBuf::from("/fake/lib/libmacmon.dylib"), omit: Vec::new() }
    }

    pub fn without(symbols: &[&'static str]) -> Self {
        Self { omit: symbols.to_vec(), ..Self::new() }
    }

    /// A config whose first candidate is this loader's path.
    pub fn config(&self) -> Config {
        let mut config = Config::new();
        config.library.search_paths = vec![self.path.clone()];
        config
    }
}

impl DynamicLoader for FakeLoader {
    fn open(&self, path: &Path) -> Result<Box<dyn NativeLibrary>, String> {
        if path != self.path {
            return Err(format!("dlopen({}): image not found", path.display()));
        }
        LIBRARIES_OPEN.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeLibrary { path: path.to_path_buf(), omit: self.omit.clone() }))
    }
}

struct FakeLibrary {
    path: PathBuf,
    omit: Vec<&'static str>,
}

impl NativeLibrary for FakeLibrary {
    fn path(&self) -> &Path {
        &self.path
    }

    fn symbol(&self, name: &CStr) -> Option<NonNull<c_void>> {
        let name = name.to_str().ok()?;
        if self.omit.contains(&name) {
            return None;
        }
        let addr = match name {
            "sampler_new" => sampler_new as SamplerNewFn as *mut c_void,
            "sampler_get_metrics" => sampler_get_metrics as SamplerGetMetricsFn as *mut c_void,
            "sampler_free" => sampler_free as SamplerFreeFn as *mut c_void,
            "metrics_free" => metrics_free as MetricsFreeFn as *mut c_void,
            "get_soc_info" => get_soc_info as GetSocInfoFn as *mut c_void,
            "soc_info_free" => soc_info_free as SocInfoFreeFn as *mut c_void,
            _ => return None,
        };
        NonNull::new(addr)
    }
}

impl Drop for FakeLibrary {
    fn drop(&mut self) {
        lock(&EVENTS).push("library_close");
        LIBRARIES_OPEN.fetch_sub(1, Ordering::SeqCst);
    }
}
