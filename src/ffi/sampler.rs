//! The native sampler resource.

use super::symbols::SymbolTable;
use super::SamplerFreeFn;
use crate::error::{MacmonError, Result};
use std::ffi::c_void;
use std::path::Path;
use std::ptr::NonNull;
use tracing::{debug, info, warn};

/// Lifecycle of a [`SamplerHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    /// Created and usable for metrics requests.
    Active,
    /// `sampler_free` has been called.
    Destroyed,
}

/// Exclusive owner of one native sampler.
///
/// `sampler_free` is called exactly once, by an explicit destroy or on drop,
/// whichever comes first. Handles are created and destroyed only by
/// [`Macmon`](crate::Macmon), before it closes the library:
///
/// ```compile_fail
/// use macmon_binding::ffi::{SamplerHandle, SymbolTable};
///
/// fn outlive(table: &SymbolTable) -> SamplerHandle {
///     SamplerHandle::create(table, "libmacmon.dylib".as_ref()).unwrap()
/// }
/// ```
#[derive(Debug)]
pub struct SamplerHandle {
    raw: Option<NonNull<c_void>>,
    free: SamplerFreeFn,
}

// SAFETY: the sampler is only reached through &mut self or a Mutex held by
// the owner, so it is never used from two threads at once.
#[allow(unsafe_code)]
unsafe impl Send for SamplerHandle {}

impl SamplerHandle {
    /// Calls the resolved constructor.
    ///
    /// # Errors
    ///
    /// Returns [`MacmonError::ConstructionFailed`] if it returns null.
    pub(crate) fn create(symbols: &SymbolTable, library: &Path) -> Result<Self> {
        // SAFETY: sampler_new takes no arguments and returns an owned handle or null.
        #[allow(unsafe_code)]
        let raw = unsafe { (symbols.sampler_new)() };

        match NonNull::new(raw) {
            Some(raw) => {
                info!(path = %library.display(), "created native sampler");
                Ok(Self { raw: Some(raw), free: symbols.sampler_free })
            }
            None => {
                warn!(path = %library.display(), "sampler_new returned null");
                Err(MacmonError::ConstructionFailed { path: library.to_path_buf() })
            }
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SamplerState {
        if self.raw.is_some() {
            SamplerState::Active
        } else {
            SamplerState::Destroyed
        }
    }

    pub(crate) fn as_ptr(&self) -> Option<*mut c_void> {
        self.raw.map(NonNull::as_ptr)
    }

    /// Frees the native sampler. Later calls do nothing.
    pub(crate) fn destroy(&mut self) {
        if let Some(raw) = self.raw.take() {
            debug!("destroying native sampler");
            // SAFETY: raw came from sampler_new and was just taken out of
            // self, so it is freed exactly once.
            #[allow(unsafe_code)]
            unsafe {
                (self.free)(raw.as_ptr());
            }
        }
    }
}

impl Drop for SamplerHandle {
    fn drop(&mut self) {
        self.destroy();
    }
}
