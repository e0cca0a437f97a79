//! Library path resolution.

use std::os::raw::c_char;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::ptr;

use crate::error::{HalError, Result, clear_error, hal_error_t, write_error};
use crate::ffi::{into_raw_cstring, read_cstr};

/// Longest resolved path accepted, exclusive, in platform path units
/// (UTF-16 code units on Windows, bytes elsewhere).
#[cfg(windows)]
pub const MAX_PATH_LEN: usize = 260;
#[cfg(not(windows))]
pub const MAX_PATH_LEN: usize = 4096;

/// Resolves `name` against the current directory without touching the
/// filesystem. Fails when the result is empty or not shorter than
/// [`MAX_PATH_LEN`].
pub fn try_resolve_library_path(name: &str) -> Result<PathBuf> {
    let failed = || HalError::PathResolutionFailed {
        name: name.to_string(),
    };
    let full = std::path::absolute(Path::new(name)).map_err(|_| failed())?;
    let len = path_units(&full);
    if len == 0 || len >= MAX_PATH_LEN {
        return Err(failed());
    }
    Ok(full)
}

#[cfg(windows)]
fn path_units(path: &Path) -> usize {
    use std::os::windows::ffi::OsStrExt;
    path.as_os_str().encode_wide().count()
}

#[cfg(not(windows))]
fn path_units(path: &Path) -> usize {
    path.as_os_str().len()
}

/// Like [`try_resolve_library_path`], but logs the outcome and returns an
/// empty path on failure.
pub fn resolve_library_path(name: &str) -> PathBuf {
    match try_resolve_library_path(name) {
        Ok(full) => {
            log::info!("full path to library: {}", full.display());
            full
        }
        Err(err) => {
            log::warn!("{err}");
            PathBuf::new()
        }
    }
}

/// Resolves a library name to its full path.
///
/// Resolution failure yields an empty string, not an error; `out_error` is
/// only set for a null `name`. The returned string must be freed with
/// `hal_string_free`.
#[unsafe(no_mangle)]
pub extern "C" fn hal_resolve_library_path(
    name: *const c_char,
    out_error: *mut *mut hal_error_t,
) -> *mut c_char {
    clear_error(out_error);
    let name = match read_cstr(name, "name", out_error) {
        Some(value) => value,
        None => return ptr::null_mut(),
    };
    match std::panic::catch_unwind(AssertUnwindSafe(|| resolve_library_path(&name))) {
        Ok(full) => into_raw_cstring(&full.to_string_lossy(), out_error),
        Err(_) => {
            write_error(out_error, HalError::Panic("resolving library path").to_string());
            ptr::null_mut()
        }
    }
}
