//! Logging configuration for hal's C surface.

use std::ffi::CStr;
use std::os::raw::{c_char, c_void};
use std::ptr;
use std::sync::RwLock;

use log::{Level, LevelFilter, Log, Metadata, Record};
use once_cell::sync::Lazy;

use crate::error::{clear_error, cstring_from_str_lossy, hal_error_t, write_error};

/// Target prefix that a bare level applies to.
const DEFAULT_TARGET: &str = "hal";

static HAL_LOGGER: Lazy<HalLogger> = Lazy::new(HalLogger::new);
static LOGGER_INSTALLED: Lazy<bool> = Lazy::new(|| log::set_logger(&*HAL_LOGGER).is_ok());

/// Log level values for hal logging.
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(C)]
pub enum hal_log_level_t {
    HAL_LOG_LEVEL_OFF = 0,
    HAL_LOG_LEVEL_ERROR = 1,
    HAL_LOG_LEVEL_WARN = 2,
    HAL_LOG_LEVEL_INFO = 3,
    HAL_LOG_LEVEL_DEBUG = 4,
    HAL_LOG_LEVEL_TRACE = 5,
}

impl From<hal_log_level_t> for LevelFilter {
    fn from(value: hal_log_level_t) -> Self {
        match value {
            hal_log_level_t::HAL_LOG_LEVEL_OFF => LevelFilter::Off,
            hal_log_level_t::HAL_LOG_LEVEL_ERROR => LevelFilter::Error,
            hal_log_level_t::HAL_LOG_LEVEL_WARN => LevelFilter::Warn,
            hal_log_level_t::HAL_LOG_LEVEL_INFO => LevelFilter::Info,
            hal_log_level_t::HAL_LOG_LEVEL_DEBUG => LevelFilter::Debug,
            hal_log_level_t::HAL_LOG_LEVEL_TRACE => LevelFilter::Trace,
        }
    }
}

impl From<Level> for hal_log_level_t {
    fn from(value: Level) -> Self {
        match value {
            Level::Error => hal_log_level_t::HAL_LOG_LEVEL_ERROR,
            Level::Warn => hal_log_level_t::HAL_LOG_LEVEL_WARN,
            Level::Info => hal_log_level_t::HAL_LOG_LEVEL_INFO,
            Level::Debug => hal_log_level_t::HAL_LOG_LEVEL_DEBUG,
            Level::Trace => hal_log_level_t::HAL_LOG_LEVEL_TRACE,
        }
    }
}

/// Log record delivered to a C callback.
///
/// String pointers are only valid for the duration of the callback.
#[allow(non_camel_case_types)]
#[repr(C)]
pub struct hal_log_record_t {
    pub level: hal_log_level_t,
    pub target: *const c_char,
    pub message: *const c_char,
    pub line: u32,
}

#[allow(non_camel_case_types)]
pub type hal_log_callback_t =
    Option<extern "C" fn(record: *const hal_log_record_t, user_data: *mut c_void)>;

/// Logging configuration.
///
/// A non-null `filter` is a `RUST_LOG`-style directive list and overrides
/// `level`; with a null `filter` the `RUST_LOG` environment variable is
/// consulted before falling back to `level` for hal's own targets. A null
/// `callback` sends records to stderr.
#[allow(non_camel_case_types)]
#[repr(C)]
pub struct hal_log_config_t {
    pub level: hal_log_level_t,
    pub filter: *const c_char,
    pub callback: hal_log_callback_t,
    pub user_data: *mut c_void,
}

#[derive(Clone, Debug, PartialEq)]
struct Directive {
    target: String,
    level: LevelFilter,
}

#[derive(Clone, Debug, PartialEq)]
struct LogFilter {
    default: LevelFilter,
    directives: Vec<Directive>,
}

impl LogFilter {
    fn for_level(level: LevelFilter) -> Self {
        Self {
            default: LevelFilter::Off,
            directives: vec![Directive {
                target: DEFAULT_TARGET.to_string(),
                level,
            }],
        }
    }

    fn parse(spec: &str) -> Result<Self, String> {
        let mut filter = Self {
            default: LevelFilter::Off,
            directives: Vec::new(),
        };

        for directive in spec.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            match directive.split_once('=') {
                Some((target, level)) => {
                    let target = target.trim();
                    if target.is_empty() {
                        return Err(format!("missing target in `{directive}`"));
                    }
                    let level = parse_level(level)
                        .ok_or_else(|| format!("invalid level in `{directive}`"))?;
                    filter.directives.push(Directive {
                        target: target.to_string(),
                        level,
                    });
                }
                None => match parse_level(directive) {
                    Some(level) => filter.default = level,
                    None => filter.directives.push(Directive {
                        target: directive.to_string(),
                        level: LevelFilter::Trace,
                    }),
                },
            }
        }

        Ok(filter)
    }

    /// The longest matching target prefix wins.
    fn level_for(&self, target: &str) -> LevelFilter {
        self.directives
            .iter()
            .filter(|d| target.starts_with(&d.target))
            .max_by_key(|d| d.target.len())
            .map_or(self.default, |d| d.level)
    }

    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level_for(metadata.target())
    }

    fn max_level(&self) -> LevelFilter {
        self.directives
            .iter()
            .map(|d| d.level)
            .fold(self.default, Ord::max)
    }
}

fn parse_level(value: &str) -> Option<LevelFilter> {
    match value.trim().to_ascii_lowercase().as_str() {
        "off" => Some(LevelFilter::Off),
        "error" => Some(LevelFilter::Error),
        "warn" | "warning" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}

struct Sink {
    filter: LogFilter,
    callback: hal_log_callback_t,
    // Stored as an integer so the logger stays Sync.
    user_data: usize,
}

struct HalLogger {
    sink: RwLock<Sink>,
}

impl HalLogger {
    fn new() -> Self {
        Self {
            sink: RwLock::new(Sink {
                filter: LogFilter::for_level(LevelFilter::Info),
                callback: None,
                user_data: 0,
            }),
        }
    }

    fn replace(&self, sink: Sink) {
        *self.sink.write().unwrap_or_else(|err| err.into_inner()) = sink;
    }
}

impl Log for HalLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        let sink = self.sink.read().unwrap_or_else(|err| err.into_inner());
        sink.filter.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        let (callback, user_data) = {
            let sink = self.sink.read().unwrap_or_else(|err| err.into_inner());
            if !sink.filter.enabled(record.metadata()) {
                return;
            }
            (sink.callback, sink.user_data)
        };

        let Some(callback) = callback else {
            eprintln!("{} {}: {}", record.level(), record.target(), record.args());
            return;
        };
        let target = cstring_from_str_lossy(record.target());
        let message = cstring_from_str_lossy(&record.args().to_string());
        let c_record = hal_log_record_t {
            level: record.level().into(),
            target: target.as_ptr(),
            message: message.as_ptr(),
            line: record.line().unwrap_or(0),
        };
        callback(&c_record, user_data as *mut c_void);
    }

    fn flush(&self) {}
}

fn read_filter(value: *const c_char) -> Option<String> {
    if value.is_null() {
        return None;
    }
    // Safety: caller guarantees a valid, NUL-terminated C string.
    Some(unsafe { CStr::from_ptr(value) }.to_string_lossy().into_owned())
}

fn resolve_filter(config: Option<&hal_log_config_t>) -> Result<LogFilter, String> {
    if let Some(spec) = config.and_then(|config| read_filter(config.filter)) {
        return LogFilter::parse(&spec).map_err(|err| format!("invalid log filter `{spec}`: {err}"));
    }
    if let Ok(spec) = std::env::var("RUST_LOG") {
        return LogFilter::parse(&spec)
            .map_err(|err| format!("invalid RUST_LOG value `{spec}`: {err}"));
    }
    let level = config.map_or(hal_log_level_t::HAL_LOG_LEVEL_INFO, |config| config.level);
    Ok(LogFilter::for_level(level.into()))
}

/// Writes the default configuration: INFO for hal targets, stderr output.
#[unsafe(no_mangle)]
pub extern "C" fn hal_log_config_init(config: *mut hal_log_config_t) {
    if config.is_null() {
        return;
    }
    // Safety: caller provided a writable config pointer.
    unsafe {
        *config = hal_log_config_t {
            level: hal_log_level_t::HAL_LOG_LEVEL_INFO,
            filter: ptr::null(),
            callback: None,
            user_data: ptr::null_mut(),
        };
    }
}

/// Installs hal's logger, or reconfigures it if already installed.
///
/// A null `config` applies the defaults.
#[unsafe(no_mangle)]
pub extern "C" fn hal_log_init(
    config: *const hal_log_config_t,
    out_error: *mut *mut hal_error_t,
) -> bool {
    clear_error(out_error);

    // Safety: caller passes null or a valid config pointer.
    let config = unsafe { config.as_ref() };
    let filter = match resolve_filter(config) {
        Ok(filter) => filter,
        Err(message) => {
            write_error(out_error, message);
            return false;
        }
    };

    if !*LOGGER_INSTALLED {
        write_error(out_error, "logging already initialized by another logger");
        return false;
    }

    let max_level = filter.max_level();
    HAL_LOGGER.replace(Sink {
        filter,
        callback: config.and_then(|config| config.callback),
        user_data: config.map_or(0, |config| config.user_data as usize),
    });
    log::set_max_level(max_level);
    true
}
