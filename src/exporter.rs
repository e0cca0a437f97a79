//! The exported text transform.

use std::os::raw::c_char;
use std::panic::AssertUnwindSafe;
use std::ptr;

use crate::error::{clear_error, hal_error_t, write_error};
use crate::ffi::{into_raw_cstring, into_raw_wstring, read_cstr, read_wstr};

/// Suffix appended by [`transform`] in this build.
pub const TRANSFORM_MARKER: u32 = 1;

/// Appends `marker` to `input`.
pub fn transform(input: &str, marker: u32) -> String {
    format!("{input}{marker}")
}

/// Appends the transform marker to `input`.
///
/// The returned string is heap-allocated and must be freed with `hal_string_free`.
#[unsafe(no_mangle)]
pub extern "C" fn hal_transform(
    input: *const c_char,
    out_error: *mut *mut hal_error_t,
) -> *mut c_char {
    clear_error(out_error);
    let input = match read_cstr(input, "input", out_error) {
        Some(value) => value,
        None => return ptr::null_mut(),
    };

    let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
        transform(&input, TRANSFORM_MARKER)
    }));

    match result {
        Ok(value) => into_raw_cstring(&value, out_error),
        Err(_) => {
            write_error(out_error, "panic while transforming input");
            ptr::null_mut()
        }
    }
}

/// Wide-text variant of `hal_transform`.
///
/// `input` points to `len` UTF-16 units. The result length (without the
/// terminator) is written to `out_len`; release the result with
/// `hal_wstring_free`.
#[unsafe(no_mangle)]
pub extern "C" fn hal_transform_utf16(
    input: *const u16,
    len: usize,
    out_len: *mut usize,
    out_error: *mut *mut hal_error_t,
) -> *mut u16 {
    clear_error(out_error);
    let input = match read_wstr(input, len, "input", out_error) {
        Some(value) => value,
        None => return ptr::null_mut(),
    };
    match std::panic::catch_unwind(AssertUnwindSafe(|| transform(&input, TRANSFORM_MARKER))) {
        Ok(value) => into_raw_wstring(&value, out_len),
        Err(_) => {
            write_error(out_error, "panic while transforming input");
            ptr::null_mut()
        }
    }
}

/// Returns the marker `hal_transform` appends.
#[unsafe(no_mangle)]
pub extern "C" fn hal_transform_marker() -> i32 {
    TRANSFORM_MARKER as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_marker() {
        assert_eq!(transform("something ", TRANSFORM_MARKER), "something 1");
        assert_eq!(transform("", TRANSFORM_MARKER), "1");
        assert_eq!(transform("x", 42), "x42");
    }

    #[test]
    fn repeated_calls_agree() {
        let first = transform("héllo", TRANSFORM_MARKER);
        for _ in 0..8 {
            assert_eq!(transform("héllo", TRANSFORM_MARKER), first);
        }
    }

    #[test]
    fn marker_export_matches_constant() {
        assert_eq!(hal_transform_marker(), 1);
    }
}
