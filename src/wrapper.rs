//! Consumer side of the boundary: binds the exported transform through C ABI
//! function pointers and renders its results.

use std::ffi::{CStr, CString};
use std::io::{self, Write};
use std::marker::PhantomData;
use std::os::raw::c_char;
use std::path::{Path, PathBuf};
use std::ptr;

use libloading::Library;

use crate::error::{HalError, Result, clear_error, hal_error_t, write_error};
use crate::{error, exporter};

/// Literal passed to the exporter by [`Wrapper::show_static_info`].
pub const STATIC_INFO_INPUT: &str = "something ";
/// Label of the line written by [`Wrapper::show_static_info`].
pub const STATIC_INFO_LABEL: &str = "hal_transform";

pub type TransformFn =
    unsafe extern "C" fn(input: *const c_char, out_error: *mut *mut hal_error_t) -> *mut c_char;
pub type StringFreeFn = unsafe extern "C" fn(value: *mut c_char);
pub type ErrorMessageFn = unsafe extern "C" fn(error: *const hal_error_t) -> *const c_char;
pub type ErrorFreeFn = unsafe extern "C" fn(error: *mut hal_error_t);

/// Entry points of one exporter image. Strings and errors it returns are
/// released through the same image's free functions.
#[derive(Clone, Copy)]
struct ExportBinding {
    transform: TransformFn,
    string_free: StringFreeFn,
    error_message: ErrorMessageFn,
    error_free: ErrorFreeFn,
}

impl ExportBinding {
    fn linked() -> Self {
        Self {
            transform: exporter::hal_transform,
            string_free: error::hal_string_free,
            error_message: error::hal_error_message,
            error_free: error::hal_error_free,
        }
    }

    /// # Safety
    ///
    /// `library` must export these symbols with the signatures above.
    unsafe fn lookup(library: &Library) -> Result<Self> {
        // Safety: forwarded from the caller.
        unsafe {
            Ok(Self {
                transform: symbol(library, "hal_transform")?,
                string_free: symbol(library, "hal_string_free")?,
                error_message: symbol(library, "hal_error_message")?,
                error_free: symbol(library, "hal_error_free")?,
            })
        }
    }

    fn transform(&self, input: &str) -> Result<String> {
        let input = CString::new(input).map_err(|_| HalError::InvalidText { field: "input" })?;
        let mut error: *mut hal_error_t = ptr::null_mut();
        // Safety: the binding points at hal_transform-compatible exports.
        let raw = unsafe { (self.transform)(input.as_ptr(), &mut error) };
        if raw.is_null() {
            let message = self
                .take_error(error)
                .unwrap_or_else(|| "exporter returned null".to_string());
            return Err(HalError::Export(message));
        }
        // Safety: raw is a NUL-terminated string owned by the exporter until freed.
        let value = unsafe { CStr::from_ptr(raw) }.to_string_lossy().into_owned();
        // Safety: raw came from this binding's transform.
        unsafe { (self.string_free)(raw) };
        Ok(value)
    }

    fn take_error(&self, error: *mut hal_error_t) -> Option<String> {
        if error.is_null() {
            return None;
        }
        // Safety: error was written by this binding's exporter.
        unsafe {
            let message = (self.error_message)(error);
            let text = (!message.is_null())
                .then(|| CStr::from_ptr(message).to_string_lossy().into_owned());
            (self.error_free)(error);
            text
        }
    }
}

/// # Safety
///
/// `T` must match the exported symbol's real signature.
unsafe fn symbol<T: Copy>(library: &Library, name: &'static str) -> Result<T> {
    // Safety: forwarded from the caller.
    unsafe {
        library
            .get::<T>(name.as_bytes())
            .map(|symbol| *symbol)
            .map_err(|source| HalError::MissingSymbol {
                symbol: name,
                source,
            })
    }
}

/// Calls the exporter and prints what it returns.
///
/// The lifetime ties a wrapper to the library image its entry points live in.
#[derive(Clone, Copy)]
pub struct Wrapper<'lib> {
    binding: ExportBinding,
    _image: PhantomData<&'lib Library>,
}

impl Wrapper<'static> {
    /// Wrapper over the exporter linked into this image.
    pub fn linked() -> Self {
        Self {
            binding: ExportBinding::linked(),
            _image: PhantomData,
        }
    }
}

impl Wrapper<'_> {
    pub fn transform(&self, input: &str) -> Result<String> {
        self.binding.transform(input)
    }

    /// Transforms [`STATIC_INFO_INPUT`] and writes one labelled line to `sink`.
    pub fn show_static_info<W: Write>(&self, sink: &mut W) -> Result<()> {
        let value = self.transform(STATIC_INFO_INPUT)?;
        writeln!(sink, "{STATIC_INFO_LABEL}: {value}")?;
        Ok(())
    }
}

/// An exporter loaded at runtime; unloaded on drop.
pub struct DynamicExporter {
    path: PathBuf,
    library: Library,
    binding: ExportBinding,
}

impl DynamicExporter {
    /// Loads the library at `path` and looks up the hal entry points.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        // Safety: loading runs the image's initializers; callers choose the path.
        let library = unsafe { Library::new(path) }.map_err(|source| HalError::LibraryLoad {
            path: path.display().to_string(),
            source,
        })?;
        // Safety: a hal exporter image exports these with matching signatures.
        let binding = unsafe { ExportBinding::lookup(&library)? };
        log::debug!("loaded exporter from {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            library,
            binding,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn wrapper(&self) -> Wrapper<'_> {
        Wrapper {
            binding: self.binding,
            _image: PhantomData,
        }
    }

    /// Unloads the library, reporting any failure from the loader.
    pub fn close(self) -> Result<()> {
        self.library.close().map_err(|source| HalError::LibraryLoad {
            path: self.path.display().to_string(),
            source,
        })
    }
}

/// Prints the transformed static literal to stdout.
#[unsafe(no_mangle)]
pub extern "C" fn hal_show_static_info(out_error: *mut *mut hal_error_t) -> bool {
    clear_error(out_error);
    let result = std::panic::catch_unwind(|| {
        Wrapper::linked().show_static_info(&mut io::stdout().lock())
    });
    match result {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            log::error!("show static info failed: {err}");
            write_error(out_error, err.to_string());
            false
        }
        Err(_) => {
            write_error(out_error, HalError::Panic("showing static info").to_string());
            false
        }
    }
}
