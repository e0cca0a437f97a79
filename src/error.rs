use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

use thiserror::Error;

/// Errors raised on the Rust side of the boundary.
#[derive(Debug, Error)]
pub enum HalError {
    #[error("failed to resolve full path for library `{name}`")]
    PathResolutionFailed { name: String },
    #[error("{0} was null")]
    NullArgument(&'static str),
    #[error("{field} was not valid text")]
    InvalidText { field: &'static str },
    #[error("failed to load library `{path}`: {source}")]
    LibraryLoad {
        path: String,
        #[source]
        source: libloading::Error,
    },
    #[error("library does not export `{symbol}`: {source}")]
    MissingSymbol {
        symbol: &'static str,
        #[source]
        source: libloading::Error,
    },
    #[error("exporter call failed: {0}")]
    Export(String),
    #[error("panic while {0}")]
    Panic(&'static str),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = HalError> = std::result::Result<T, E>;

/// Opaque error type for C callers.
#[allow(non_camel_case_types)]
#[repr(C)]
pub struct hal_error_t;

struct ErrorHandle {
    message: CString,
}

pub(crate) fn cstring_from_str_lossy(value: &str) -> CString {
    let sanitized: String = value.chars().map(|c| if c == '\0' { ' ' } else { c }).collect();
    CString::new(sanitized).unwrap_or_default()
}

pub(crate) fn clear_error(out_error: *mut *mut hal_error_t) {
    if !out_error.is_null() {
        // Safety: caller provided a valid out_error pointer.
        unsafe {
            *out_error = ptr::null_mut();
        }
    }
}

pub(crate) fn write_error(out_error: *mut *mut hal_error_t, message: impl Into<String>) {
    if out_error.is_null() {
        return;
    }
    let handle = Box::new(ErrorHandle {
        message: cstring_from_str_lossy(&message.into()),
    });
    // Safety: out_error is non-null and points to writable memory.
    unsafe {
        *out_error = Box::into_raw(handle) as *mut hal_error_t;
    }
}

/// Returns the message for an error allocated by hal.
///
/// The returned pointer is valid as long as the error handle is alive.
#[unsafe(no_mangle)]
pub extern "C" fn hal_error_message(error: *const hal_error_t) -> *const c_char {
    if error.is_null() {
        return ptr::null();
    }
    // Safety: error must be a valid handle allocated by hal.
    let handle = unsafe { &*(error as *const ErrorHandle) };
    handle.message.as_ptr()
}

/// Frees an error returned by hal.
#[unsafe(no_mangle)]
pub extern "C" fn hal_error_free(error: *mut hal_error_t) {
    if error.is_null() {
        return;
    }
    // Safety: error must be a valid handle allocated by hal.
    unsafe {
        drop(Box::from_raw(error as *mut ErrorHandle));
    }
}

/// Frees a string allocated by hal.
#[unsafe(no_mangle)]
pub extern "C" fn hal_string_free(value: *mut c_char) {
    if value.is_null() {
        return;
    }
    // Safety: value must be a string returned by a hal function.
    unsafe {
        drop(CString::from_raw(value));
    }
}

/// Frees a wide string allocated by hal. `len` is the length reported when
/// the string was returned, excluding the terminator.
#[unsafe(no_mangle)]
pub extern "C" fn hal_wstring_free(value: *mut u16, len: usize) {
    if value.is_null() {
        return;
    }
    // Safety: value was produced by leaking a boxed slice of len + 1 units.
    unsafe {
        drop(Box::from_raw(ptr::slice_from_raw_parts_mut(value, len + 1)));
    }
}
