//! Extraction of fixed-capacity C fields into owned values.
//!
//! Both primitives are total: they never fault and never read past the
//! physical capacity of the source array, whatever the native side wrote.

use tracing::{debug, warn};

/// Decodes a NUL-terminated byte buffer.
///
/// Scans up to the first zero byte, or the whole buffer if there is none, and
/// decodes that prefix as UTF-8. Invalid UTF-8 yields an empty string.
#[must_use]
pub fn bounded_str(bytes: &[u8]) -> String {
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    match std::str::from_utf8(&bytes[..len]) {
        Ok(text) => text.to_owned(),
        Err(e) => {
            debug!(error = %e, "native string is not valid UTF-8");
            String::new()
        }
    }
}

/// Copies the first `count` elements of a fixed array, clamped to `N`.
#[must_use]
pub fn bounded_array<T: Copy, const N: usize>(values: &[T; N], count: impl Into<usize>) -> Vec<T> {
    let count = count.into();
    if count > N {
        warn!(count, capacity = N, "native element count exceeds array capacity, clamping");
    }
    values[..count.min(N)].to_vec()
}


// ============================================================================
// Property-based tests with proptest
// ============================================================================
