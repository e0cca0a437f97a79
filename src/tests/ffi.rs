use std::ffi::{CStr, CString};
use std::os::raw::c_void;
use std::path::PathBuf;
use std::ptr;
use std::sync::Mutex;

use crate::error::{hal_error_free, hal_error_message, hal_error_t, hal_string_free, hal_wstring_free};
use crate::exporter::{hal_transform, hal_transform_utf16};
use crate::logging::{
    hal_log_config_init, hal_log_config_t, hal_log_init, hal_log_level_t, hal_log_record_t,
};
use crate::object::{hal_object_create, hal_object_display, hal_object_free};
use crate::resolve::hal_resolve_library_path;
use crate::wrapper::hal_show_static_info;
use crate::{DynamicExporter, MAX_PATH_LEN};

static CAPTURED: Mutex<Vec<(hal_log_level_t, String, String)>> = Mutex::new(Vec::new());

extern "C" fn capture(record: *const hal_log_record_t, _user_data: *mut c_void) {
    // Safety: the logger passes a record valid for this call.
    let record = unsafe { &*record };
    let target = unsafe { CStr::from_ptr(record.target) }.to_string_lossy().into_owned();
    let message = unsafe { CStr::from_ptr(record.message) }.to_string_lossy().into_owned();
    CAPTURED.lock().unwrap().push((record.level, target, message));
}

unsafe fn take_string(value: *mut std::os::raw::c_char) -> String {
    assert!(!value.is_null());
    let text = unsafe { CStr::from_ptr(value) }.to_string_lossy().into_owned();
    hal_string_free(value);
    text
}

unsafe fn take_error(error: *mut hal_error_t) -> String {
    assert!(!error.is_null());
    let text = unsafe { CStr::from_ptr(hal_error_message(error)) }
        .to_string_lossy()
        .into_owned();
    hal_error_free(error);
    text
}

fn built_cdylib() -> Option<PathBuf> {
    let deps = std::env::current_exe().ok()?.parent()?.to_path_buf();
    let name = libloading::library_filename("hal");
    [deps.join(&name), deps.parent()?.join(&name)]
        .into_iter()
        .find(|path| path.exists())
}

#[test]
fn transform_appends_marker_over_c_abi() {
    let input = CString::new("something ").unwrap();
    let mut error: *mut hal_error_t = ptr::null_mut();
    let out = hal_transform(input.as_ptr(), &mut error);
    assert!(error.is_null());
    assert_eq!(unsafe { take_string(out) }, "something 1");
}

#[test]
fn transform_reports_null_input() {
    let mut error: *mut hal_error_t = ptr::null_mut();
    let out = hal_transform(ptr::null(), &mut error);
    assert!(out.is_null());
    assert_eq!(unsafe { take_error(error) }, "input was null");
}

#[test]
fn wide_transform_round_trips_non_ascii() {
    let input: Vec<u16> = "grüße ".encode_utf16().collect();
    let mut len = 0usize;
    let mut error: *mut hal_error_t = ptr::null_mut();
    let out = hal_transform_utf16(input.as_ptr(), input.len(), &mut len, &mut error);
    assert!(error.is_null());
    let units = unsafe { std::slice::from_raw_parts(out, len + 1) };
    assert_eq!(units[len], 0);
    assert_eq!(String::from_utf16(&units[..len]).unwrap(), "grüße 1");
    hal_wstring_free(out, len);
}

#[test]
fn wide_transform_rejects_lone_surrogate() {
    let input = [0xD800u16];
    let mut len = 0usize;
    let mut error: *mut hal_error_t = ptr::null_mut();
    let out = hal_transform_utf16(input.as_ptr(), input.len(), &mut len, &mut error);
    assert!(out.is_null());
    assert_eq!(unsafe { take_error(error) }, "input was not valid text");
}

#[test]
fn show_static_info_succeeds() {
    let mut error: *mut hal_error_t = ptr::null_mut();
    assert!(hal_show_static_info(&mut error));
    assert!(error.is_null());
}

#[test]
fn object_handle_displays() {
    let object = hal_object_create(10, 11.0);
    assert!(hal_object_display(object));
    hal_object_free(object);
}

#[test]
fn resolve_over_c_abi_is_empty_on_failure() {
    let name = CString::new("a".repeat(MAX_PATH_LEN)).unwrap();
    let mut error: *mut hal_error_t = ptr::null_mut();
    let out = hal_resolve_library_path(name.as_ptr(), &mut error);
    assert!(error.is_null());
    assert_eq!(unsafe { take_string(out) }, "");

    let out = hal_resolve_library_path(ptr::null(), &mut error);
    assert!(out.is_null());
    assert_eq!(unsafe { take_error(error) }, "name was null");
}

#[test]
fn resolution_emits_diagnostics() {
    let filter = CString::new("hal=trace").unwrap();
    let mut config = std::mem::MaybeUninit::<hal_log_config_t>::uninit();
    hal_log_config_init(config.as_mut_ptr());
    let mut config = unsafe { config.assume_init() };
    config.filter = filter.as_ptr();
    config.callback = Some(capture);

    let mut error: *mut hal_error_t = ptr::null_mut();
    assert!(hal_log_init(&config, &mut error));
    assert!(error.is_null());

    let resolved = crate::resolve_library_path("capture-check/libhal_capture.so");
    assert!(!resolved.as_os_str().is_empty());
    let overlong = format!("overlong-capture-{}", "z".repeat(MAX_PATH_LEN));
    assert!(crate::resolve_library_path(&overlong).as_os_str().is_empty());

    let captured = CAPTURED.lock().unwrap();
    assert!(captured.iter().any(|(level, target, message)| {
        *level == hal_log_level_t::HAL_LOG_LEVEL_INFO
            && target == "hal::resolve"
            && message.starts_with("full path to library: ")
            && message.ends_with("libhal_capture.so")
    }));
    assert!(captured.iter().any(|(level, _, message)| {
        *level == hal_log_level_t::HAL_LOG_LEVEL_WARN
            && message.contains("`overlong-capture-")
    }));
}

#[test]
fn invalid_log_filter_is_reported() {
    let filter = CString::new("hal=shouting").unwrap();
    let config = hal_log_config_t {
        level: hal_log_level_t::HAL_LOG_LEVEL_INFO,
        filter: filter.as_ptr(),
        callback: None,
        user_data: ptr::null_mut(),
    };
    let mut error: *mut hal_error_t = ptr::null_mut();
    assert!(!hal_log_init(&config, &mut error));
    assert!(unsafe { take_error(error) }.starts_with("invalid log filter `hal=shouting`"));
}

#[test]
fn loaded_cdylib_transforms() {
    let Some(path) = built_cdylib() else {
        return;
    };
    let exporter = DynamicExporter::open(&path).expect("open built cdylib");
    assert_eq!(exporter.path(), path.as_path());
    let mut out = Vec::new();
    exporter.wrapper().show_static_info(&mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "hal_transform: something 1\n");
    exporter.close().unwrap();
}
