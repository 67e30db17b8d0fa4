//! Library loader.
//!
//! Opens `libmacmon` from an ordered list of [`CandidatePath`]s, stopping at
//! the first success. The platform facility sits behind [`DynamicLoader`] so
//! the binding can be exercised without a real shared object.

use crate::error::{LoadAttempt, MacmonError, Result};
use std::ffi::{c_void, CStr};
use std::fmt;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use tracing::{debug, info, warn};

/// An opened shared library. Dropping it closes the OS handle.
pub trait NativeLibrary: Send + Sync {
    /// Path the library was opened from.
    fn path(&self) -> &Path;

    /// Looks up an exported symbol.
    fn symbol(&self, name: &CStr) -> Option<NonNull<c_void>>;
}

/// Platform dynamic-loading facility.
pub trait DynamicLoader {
    /// Opens the library at `path`, returning loader diagnostics on failure.
    ///
    /// # Errors
    ///
    /// Returns the platform's error text if the library cannot be opened.
    fn open(&self, path: &Path) -> std::result::Result<Box<dyn NativeLibrary>, String>;
}

/// One place to look for the library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidatePath {
    /// File name resolved against the current working directory.
    WorkingDirectory(PathBuf),
    /// Path relative to the running executable's directory.
    ExecutableRelative(PathBuf),
    /// Path relative to the directory of the object containing this crate.
    ModuleRelative(PathBuf),
    /// Path used as given.
    Explicit(PathBuf),
}

impl CandidatePath {
    /// The standard search order for `name`: working directory, next to the
    /// executable, next to this binding.
    #[must_use]
    pub fn defaults(name: &str) -> Vec<Self> {
        vec![
            Self::WorkingDirectory(PathBuf::from(name)),
            Self::ExecutableRelative(PathBuf::from(name)),
            Self::ModuleRelative(PathBuf::from(name)),
        ]
    }

    /// Resolves the candidate to a concrete path.
    ///
    /// # Errors
    ///
    /// Returns a diagnostic if the anchor directory cannot be determined.
    pub fn resolve(&self) -> std::result::Result<PathBuf, String> {
        match self {
            Self::WorkingDirectory(name) => std::env::current_dir()
                .map(|dir| dir.join(name))
                .map_err(|e| format!("cannot determine working directory: {e}")),
            Self::ExecutableRelative(name) => {
                let exe = std::env::current_exe()
                    .map_err(|e| format!("cannot determine executable path: {e}"))?;
                exe.parent()
                    .map(|dir| dir.join(name))
                    .ok_or_else(|| format!("executable {} has no parent", exe.display()))
            }
            Self::ModuleRelative(name) => module_dir()
                .map(|dir| dir.join(name))
                .ok_or_else(|| "cannot determine binding module location".to_string()),
            Self::Explicit(path) => Ok(path.clone()),
        }
    }
}

impl fmt::Display for CandidatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WorkingDirectory(name) => write!(f, "{}", name.display()),
            Self::ExecutableRelative(name) => write!(f, "@executable_path/{}", name.display()),
            Self::ModuleRelative(name) => write!(f, "@loader_path/{}", name.display()),
            Self::Explicit(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Opens the first candidate that loads.
///
/// # Errors
///
/// Returns [`MacmonError::LibraryNotFound`] carrying one [`LoadAttempt`] per
/// candidate if none can be opened.
pub fn load_first(
    loader: &dyn DynamicLoader,
    candidates: &[CandidatePath],
) -> Result<Box<dyn NativeLibrary>> {
    let mut attempts = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let opened = candidate.resolve().and_then(|path| {
            debug!(candidate = %candidate, path = %path.display(), "trying native library");
            loader.open(&path)
        });

        match opened {
            Ok(library) => {
                info!(path = %library.path().display(), "loaded native library");
                return Ok(library);
            }
            Err(error) => {
                debug!(candidate = %candidate, %error, "candidate failed");
                attempts.push(LoadAttempt { candidate: candidate.to_string(), error });
            }
        }
    }

    warn!(tried = attempts.len(), "native library not found");
    Err(MacmonError::LibraryNotFound { attempts })
}

/// The platform loader (`dlopen` on unix).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLoader;

#[cfg(unix)]
pub use self::unix::DlLibrary;

#[cfg(unix)]
impl DynamicLoader for SystemLoader {
    fn open(&self, path: &Path) -> std::result::Result<Box<dyn NativeLibrary>, String> {
        DlLibrary::open(path).map(|lib| Box::new(lib) as Box<dyn NativeLibrary>)
    }
}

#[cfg(not(unix))]
impl DynamicLoader for SystemLoader {
    fn open(&self, _path: &Path) -> std::result::Result<Box<dyn NativeLibrary>, String> {
        Err("dynamic loading is not supported on this platform".to_string())
    }
}

#[cfg(unix)]
fn module_dir() -> Option<PathBuf> {
    unix::object_path_of(module_dir as fn() -> Option<PathBuf> as *const c_void)
        .and_then(|path| path.parent().map(Path::to_path_buf))
}

#[cfg(not(unix))]
fn module_dir() -> Option<PathBuf> {
    None
}

// SAFETY: All unsafe blocks in this module are libc dynamic-loader calls.
// Handles are only produced by a successful dlopen and closed exactly once in
// Drop. C strings passed in are NUL-terminated for the duration of each call.
#[cfg(unix)]
#[allow(unsafe_code)]
mod unix {
    use super::NativeLibrary;
    use std::ffi::{c_void, CStr, CString, OsStr};
    use std::os::unix::ffi::OsStrExt;
    use std::path::{Path, PathBuf};
    use std::ptr::NonNull;
    use tracing::debug;

    /// A library opened with `dlopen`.
    #[derive(Debug)]
    pub struct DlLibrary {
        handle: NonNull<c_void>,
        path: PathBuf,
    }

    // SAFETY: a dlopen handle is process-global and the dl* functions are
    // thread-safe; the handle is never dereferenced.
    unsafe impl Send for DlLibrary {}
    unsafe impl Sync for DlLibrary {}

    impl DlLibrary {
        pub(super) fn open(path: &Path) -> Result<Self, String> {
            let c_path = CString::new(path.as_os_str().as_bytes())
                .map_err(|_| "path contains an interior NUL byte".to_string())?;

            // SAFETY: c_path is a valid NUL-terminated string. Running the
            // library's initializers is the point of loading it.
            let handle = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL) };

            match NonNull::new(handle) {
                Some(handle) => Ok(Self { handle, path: path.to_path_buf() }),
                None => Err(last_error()),
            }
        }
    }

    impl NativeLibrary for DlLibrary {
        fn path(&self) -> &Path {
            &self.path
        }

        fn symbol(&self, name: &CStr) -> Option<NonNull<c_void>> {
            // SAFETY: handle is open until Drop; name is NUL-terminated.
            NonNull::new(unsafe { libc::dlsym(self.handle.as_ptr(), name.as_ptr()) })
        }
    }

    impl Drop for DlLibrary {
        fn drop(&mut self) {
            debug!(path = %self.path.display(), "closing native library");
            // SAFETY: handle came from a successful dlopen and is closed once.
            unsafe {
                libc::dlclose(self.handle.as_ptr());
            }
        }
    }

    fn last_error() -> String {
        // SAFETY: dlerror returns NULL or a NUL-terminated thread-local string.
        unsafe {
            let err = libc::dlerror();
            if err.is_null() {
                "unknown dlopen error".to_string()
            } else {
                CStr::from_ptr(err).to_string_lossy().into_owned()
            }
        }
    }

    /// Path of the loaded object (executable or shared library) containing `addr`.
    pub(super) fn object_path_of(addr: *const c_void) -> Option<PathBuf> {
        // SAFETY: Dl_info is plain data, zero is a valid bit pattern. dladdr
        // only writes into it; dli_fname is NUL-terminated when non-null.
        unsafe {
            let mut info: libc::Dl_info = std::mem::zeroed();
            if libc::dladdr(addr, &mut info) == 0 || info.dli_fname.is_null() {
                return None;
            }
            let name = CStr::from_ptr(info.dli_fname);
            Some(PathBuf::from(OsStr::from_bytes(name.to_bytes())))
        }
    }
}
