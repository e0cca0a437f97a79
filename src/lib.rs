//! A C ABI text-transform export and the wrapper that binds it.
//!
//! The same image serves both sides: C callers link or load the `hal_*`
//! exports, while Rust callers go through [`Wrapper`], which reaches the
//! exporter only through C ABI function pointers.

mod error;
mod exporter;
mod ffi;
mod logging;
mod object;
mod resolve;
mod wrapper;

pub use error::{HalError, Result};
pub use exporter::{TRANSFORM_MARKER, transform};
pub use object::HalObject;
pub use resolve::{MAX_PATH_LEN, resolve_library_path, try_resolve_library_path};
pub use wrapper::{DynamicExporter, STATIC_INFO_INPUT, STATIC_INFO_LABEL, Wrapper};

#[cfg(test)]
mod tests;
