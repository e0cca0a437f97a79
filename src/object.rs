//! Display-only value object exposed to C callers.

use std::fmt;
use std::io::{self, Write};

/// Two fields fixed at construction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HalObject {
    field1: i32,
    field2: f32,
}

impl HalObject {
    pub const DEFAULT: HalObject = HalObject::new(10, 11.0);

    pub const fn new(field1: i32, field2: f32) -> Self {
        Self { field1, field2 }
    }

    pub fn field1(&self) -> i32 {
        self.field1
    }

    pub fn field2(&self) -> f32 {
        self.field2
    }

    /// Writes one `Field1: .., Field2: ..` line to `sink`.
    pub fn display_data<W: Write>(&self, sink: &mut W) -> io::Result<()> {
        writeln!(sink, "{self}")
    }

    /// Writes the line for [`HalObject::DEFAULT`] without an instance.
    pub fn display_default<W: Write>(sink: &mut W) -> io::Result<()> {
        Self::DEFAULT.display_data(sink)
    }
}

impl fmt::Display for HalObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Field1: {}, Field2: {}", self.field1, self.field2)
    }
}

/// Opaque object handle for C callers.
#[allow(non_camel_case_types)]
#[repr(C)]
pub struct hal_object_t;

/// Creates an object. Release it with `hal_object_free`.
#[unsafe(no_mangle)]
pub extern "C" fn hal_object_create(field1: i32, field2: f32) -> *mut hal_object_t {
    Box::into_raw(Box::new(HalObject::new(field1, field2))) as *mut hal_object_t
}

/// Returns `field1`, or 0 for a null handle.
#[unsafe(no_mangle)]
pub extern "C" fn hal_object_field1(object: *const hal_object_t) -> i32 {
    object_from_handle(object).map_or(0, |object| object.field1())
}

/// Returns `field2`, or 0 for a null handle.
#[unsafe(no_mangle)]
pub extern "C" fn hal_object_field2(object: *const hal_object_t) -> f32 {
    object_from_handle(object).map_or(0.0, |object| object.field2())
}

/// Prints the object's fields to stdout.
#[unsafe(no_mangle)]
pub extern "C" fn hal_object_display(object: *const hal_object_t) -> bool {
    match object_from_handle(object) {
        Some(object) => object.display_data(&mut io::stdout().lock()).is_ok(),
        None => false,
    }
}

/// Prints the default `Field1: 10, Field2: 11` line to stdout.
#[unsafe(no_mangle)]
pub extern "C" fn hal_display_default() -> bool {
    HalObject::display_default(&mut io::stdout().lock()).is_ok()
}

/// Frees an object handle.
#[unsafe(no_mangle)]
pub extern "C" fn hal_object_free(object: *mut hal_object_t) {
    if object.is_null() {
        return;
    }
    // Safety: object must be a valid handle allocated by hal.
    unsafe {
        drop(Box::from_raw(object as *mut HalObject));
    }
}

fn object_from_handle(object: *const hal_object_t) -> Option<HalObject> {
    if object.is_null() {
        return None;
    }
    // Safety: object must be a valid handle allocated by hal.
    Some(unsafe { *(object as *const HalObject) })
}
