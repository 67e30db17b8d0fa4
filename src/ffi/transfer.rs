//! Scoped ownership of buffers returned by the native getters.

use std::ptr::NonNull;

/// One native buffer plus the routine that frees it.
///
/// The buffer is released exactly once, when the guard drops, on every exit
/// path including unwinding out of marshalling code.
pub(crate) struct TransferBuffer<T> {
    ptr: NonNull<T>,
    free: unsafe extern "C" fn(*mut T),
}

// SAFETY: the guard is the only owner of `ptr` (ownership transferred from
// the native getter); `free` is the matching destructor from the same library.
#[allow(unsafe_code)]
impl<T> TransferBuffer<T> {
    /// Takes ownership of a getter's return value. Returns `None` for null.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must point to a valid, initialized `T` owned by the
    /// caller, and `free` must be the library routine that releases it.
    pub(crate) unsafe fn from_raw(ptr: *mut T, free: unsafe extern "C" fn(*mut T)) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self { ptr, free })
    }

    /// Borrows the native struct. The borrow cannot outlive the guard.
    pub(crate) fn get(&self) -> &T {
        // SAFETY: ptr is valid and unreleased for as long as self is alive.
        unsafe { self.ptr.as_ref() }
    }
}

#[allow(unsafe_code)]
impl<T> Drop for TransferBuffer<T> {
    fn drop(&mut self) {
        // SAFETY: ptr came from the native getter and is released once here.
        unsafe { (self.free)(self.ptr.as_ptr()) }
    }
}
