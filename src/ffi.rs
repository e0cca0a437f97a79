//! Shared utilities for hal's C FFI surface.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::error::{HalError, hal_error_t, write_error};

pub(crate) fn read_cstr(
    value: *const c_char,
    field: &'static str,
    out_error: *mut *mut hal_error_t,
) -> Option<String> {
    if value.is_null() {
        write_error(out_error, HalError::NullArgument(field).to_string());
        return None;
    }
    // Safety: caller guarantees a valid, NUL-terminated C string.
    let cstr = unsafe { CStr::from_ptr(value) };
    Some(cstr.to_string_lossy().into_owned())
}

/// Reads `len` UTF-16 units. Unpaired surrogates are rejected.
pub(crate) fn read_wstr(
    value: *const u16,
    len: usize,
    field: &'static str,
    out_error: *mut *mut hal_error_t,
) -> Option<String> {
    if value.is_null() {
        write_error(out_error, HalError::NullArgument(field).to_string());
        return None;
    }
    // Safety: caller guarantees `len` readable UTF-16 units at `value`.
    let units = unsafe { std::slice::from_raw_parts(value, len) };
    match String::from_utf16(units) {
        Ok(text) => Some(text),
        Err(_) => {
            write_error(out_error, HalError::InvalidText { field }.to_string());
            None
        }
    }
}

pub(crate) fn into_raw_cstring(value: &str, out_error: *mut *mut hal_error_t) -> *mut c_char {
    match CString::new(value) {
        Ok(value) => value.into_raw(),
        Err(_) => {
            write_error(out_error, "result contained an interior null byte");
            ptr::null_mut()
        }
    }
}

/// Leaks `value` as a NUL-terminated UTF-16 buffer, writing the unit count
/// (without terminator) to `out_len`. Release with `hal_wstring_free`.
pub(crate) fn into_raw_wstring(value: &str, out_len: *mut usize) -> *mut u16 {
    let mut units: Vec<u16> = value.encode_utf16().collect();
    let len = units.len();
    units.push(0);
    if !out_len.is_null() {
        // Safety: caller provided a writable out_len pointer.
        unsafe {
            *out_len = len;
        }
    }
    Box::into_raw(units.into_boxed_slice()) as *mut u16
}
