//! The binding's top-level object.

use crate::config::Config;
use crate::error::{MacmonError, Result};
use crate::ffi::loader::{load_first, DynamicLoader, NativeLibrary, SystemLoader};
use crate::ffi::sampler::{SamplerHandle, SamplerState};
use crate::ffi::symbols::{AbiVariant, SymbolTable};
use crate::ffi::transfer::TransferBuffer;
use crate::types::{MetricsSnapshot, Report, SocInfo};
use std::fmt;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};
use tracing::{debug, warn};

/// An attached `libmacmon` with one live sampler.
///
/// Owns the library handle, the resolved symbol table and the sampler. The
/// sampler is destroyed before the library is closed. Metrics requests are
/// serialized through an internal lock, so a `Macmon` can be shared behind an
/// `Arc`.
pub struct Macmon {
    sampler: Mutex<SamplerHandle>,
    symbols: SymbolTable,
    library: Box<dyn NativeLibrary>,
}

impl Macmon {
    /// Attaches using the default configuration and the platform loader.
    ///
    /// # Errors
    ///
    /// Returns an initialization error if the library cannot be loaded, is
    /// missing symbols, or fails to create a sampler.
    pub fn new() -> Result<Self> {
        Self::from_config(&Config::default())
    }

    /// Attaches using `config` and the platform loader.
    ///
    /// # Errors
    ///
    /// See [`Macmon::new`].
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_loader(&SystemLoader, config)
    }

    /// Attaches through a custom loader.
    ///
    /// On failure nothing is left open: a library opened before symbol
    /// resolution or sampler construction failed is closed before returning.
    ///
    /// # Errors
    ///
    /// See [`Macmon::new`].
    pub fn with_loader(loader: &dyn DynamicLoader, config: &Config) -> Result<Self> {
        let library = load_first(loader, &config.candidates())?;

        let symbols = match SymbolTable::resolve(library.as_ref(), config.library.abi) {
            Ok(symbols) => symbols,
            Err(e) => {
                drop(library);
                return Err(e);
            }
        };

        let sampler = match SamplerHandle::create(&symbols, library.path()) {
            Ok(sampler) => sampler,
            Err(e) => {
                drop(library);
                return Err(e);
            }
        };

        Ok(Self { sampler: Mutex::new(sampler), symbols, library })
    }

    /// Path the native library was loaded from.
    #[must_use]
    pub fn library_path(&self) -> &Path {
        self.library.path()
    }

    /// Which entry point set was bound.
    #[must_use]
    pub fn abi(&self) -> AbiVariant {
        if self.symbols.has_soc_info() {
            AbiVariant::Full
        } else {
            AbiVariant::MetricsOnly
        }
    }

    /// Lifecycle state of the sampler.
    #[must_use]
    pub fn sampler_state(&self) -> SamplerState {
        self.lock_sampler().state()
    }

    /// Fetches the static SoC descriptor.
    ///
    /// Every call is a fresh native round trip; the result is not cached.
    ///
    /// # Errors
    ///
    /// Returns [`MacmonError::InfoUnavailable`] if the library was bound
    /// without SoC info entry points or `get_soc_info` returned null.
    pub fn soc_info(&self) -> Result<SocInfo> {
        let Some(info) = self.symbols.soc_info else {
            return Err(MacmonError::InfoUnavailable(
                "library was bound without SoC info entry points".to_string(),
            ));
        };

        // SAFETY: get_soc_info takes no arguments and returns an owned buffer
        // or null; soc_info_free is its matching destructor.
        #[allow(unsafe_code)]
        let buffer = unsafe { TransferBuffer::from_raw((info.get_soc_info)(), info.soc_info_free) };

        let Some(buffer) = buffer else {
            warn!("get_soc_info returned null");
            return Err(MacmonError::InfoUnavailable("get_soc_info returned null".to_string()));
        };

        Ok(SocInfo::from(buffer.get()))
    }

    /// Runs one sampling pass.
    ///
    /// Blocks for as long as the native sampler takes. Concurrent callers
    /// wait for each other.
    ///
    /// # Errors
    ///
    /// Returns [`MacmonError::MetricsUnavailable`] if the native call
    /// returned null. The sampler stays usable and the call may be retried.
    pub fn metrics(&self) -> Result<MetricsSnapshot> {
        let sampler = self.lock_sampler();
        let raw = sampler
            .as_ptr()
            .ok_or_else(|| MacmonError::MetricsUnavailable("sampler destroyed".to_string()))?;

        // SAFETY: raw is a live sampler (the lock is held for the whole
        // call) and metrics_free is the getter's matching destructor.
        #[allow(unsafe_code)]
        let buffer = unsafe {
            TransferBuffer::from_raw((self.symbols.sampler_get_metrics)(raw), self.symbols.metrics_free)
        };

        let Some(buffer) = buffer else {
            warn!("sampler_get_metrics returned null");
            return Err(MacmonError::MetricsUnavailable(
                "sampler_get_metrics returned null".to_string(),
            ));
        };

        Ok(MetricsSnapshot::from(buffer.get()))
    }

    /// Fetches the descriptor and one snapshot.
    ///
    /// # Errors
    ///
    /// Returns the first per-call failure.
    pub fn report(&self) -> Result<Report> {
        Ok(Report { soc: self.soc_info()?, metrics: self.metrics()? })
    }

    /// Destroys the sampler and closes the library.
    pub fn close(self) {
        drop(self);
    }

    fn lock_sampler(&self) -> MutexGuard<'_, SamplerHandle> {
        // A panic while holding the lock cannot leave the native sampler
        // half-updated; the guard only protects exclusive access.
        self.sampler.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Macmon {
    fn drop(&mut self) {
        // The destructor lives in the library, so it must run before
        // `library` is dropped.
        self.sampler.get_mut().unwrap_or_else(PoisonError::into_inner).destroy();
        debug!(path = %self.library.path().display(), "detaching from native library");
    }
}

impl fmt::Debug for Macmon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never wait out a sampling pass just to format.
        let sampler = match self.sampler.try_lock() {
            Ok(guard) => format!("{:?}", guard.state()),
            Err(TryLockError::Poisoned(poisoned)) => format!("{:?}", poisoned.into_inner().state()),
            Err(TryLockError::WouldBlock) => "<sampling>".to_string(),
        };

        f.debug_struct("Macmon")
            .field("library", &self.library.path())
            .field("abi", &self.abi())
            .field("sampler", &format_args!("{sampler}"))
            .finish()
    }
}
