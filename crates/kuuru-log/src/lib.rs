//! Leveled, zero-dependency logging for the `kuuru` libraries.
//!
//! Records go to stderr tagged with their level and the module path of the
//! call site. The minimum level is process-wide and can be taken from the
//! `KUURU_LOG` environment variable.
//!
//! # Example
//!
//! ```
//! use kuuru_log::{debug, info, Level};
//!
//! kuuru_log::set_level(Level::Debug);
//!
//! let grown_to = 16;
//! info!("buffer ready");
//! debug!("grew to {} slots", grown_to);
//! ```

use std::fmt::Arguments;
use std::io::Write;
use std::str::FromStr;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Name of the environment variable read by [`init_from_env`].
pub const LOG_ENV: &str = "KUURU_LOG";

/// Severity of a log record, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Unrecoverable conditions.
    Error = 0,
    /// Suspicious but recoverable conditions.
    Warn = 1,
    /// High-level progress.
    Info = 2,
    /// Diagnostics useful while developing.
    Debug = 3,
    /// Per-operation detail such as container growth.
    Trace = 4,
}

impl Level {
    const fn color_code(self) -> &'static str {
        match self {
            Level::Error => "\x1b[31m",
            Level::Warn => "\x1b[33m",
            Level::Info => "\x1b[32m",
            Level::Debug => "\x1b[36m",
            Level::Trace => "\x1b[35m",
        }
    }

    /// Upper-case name used in the record prefix.
    pub const fn as_str(self) -> &'static str {
        match self {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Level::Error,
            1 => Level::Warn,
            2 => Level::Info,
            3 => Level::Debug,
            _ => Level::Trace,
        }
    }
}

/// Returned when a level name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLevelError(String);

impl std::fmt::Display for ParseLevelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid log level: {:?}", self.0)
    }
}

impl std::error::Error for ParseLevelError {}

impl FromStr for Level {
    type Err = ParseLevelError;

    /// Parses a level name case-insensitively. `warning` is accepted as an
    /// alias of `warn`.
    ///
    /// ```
    /// use kuuru_log::Level;
    ///
    /// assert_eq!("trace".parse(), Ok(Level::Trace));
    /// assert_eq!("Warning".parse(), Ok(Level::Warn));
    /// assert!("loud".parse::<Level>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Level::Error),
            "warn" | "warning" => Ok(Level::Warn),
            "info" => Ok(Level::Info),
            "debug" => Ok(Level::Debug),
            "trace" => Ok(Level::Trace),
            _ => Err(ParseLevelError(s.to_owned())),
        }
    }
}

/// Process-wide log filter.
pub struct Logger {
    level: AtomicU8,
    colors: AtomicBool,
}

impl Logger {
    const fn new(level: Level) -> Self {
        Logger {
            level: AtomicU8::new(level as u8),
            colors: AtomicBool::new(true),
        }
    }

    /// Sets the minimum level that is emitted.
    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    /// Current minimum level.
    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    /// Turns ANSI colors in the level tag on or off.
    pub fn set_colors(&self, enabled: bool) {
        self.colors.store(enabled, Ordering::Relaxed);
    }

    /// Whether a record at `level` would be emitted.
    #[inline]
    pub fn enabled(&self, level: Level) -> bool {
        level as u8 <= self.level.load(Ordering::Relaxed)
    }

    /// Applies the raw value of [`LOG_ENV`]; `None` means unset.
    fn apply_env_value(&self, value: Option<&str>) -> Result<(), ParseLevelError> {
        if let Some(value) = value {
            self.set_level(value.parse()?);
        }
        Ok(())
    }

    fn format(&self, level: Level, target: &str, args: Arguments) -> String {
        if self.colors.load(Ordering::Relaxed) {
            format!("{}[{}]\x1b[0m {target}: {args}", level.color_code(), level.as_str())
        } else {
            format!("[{}] {target}: {args}", level.as_str())
        }
    }
}

static LOGGER: OnceLock<Logger> = OnceLock::new();

/// The global logger, created at `Level::Info` on first use.
pub fn logger() -> &'static Logger {
    LOGGER.get_or_init(|| Logger::new(Level::Info))
}

/// Sets the global minimum level.
pub fn set_level(level: Level) {
    logger().set_level(level);
}

/// Reads [`LOG_ENV`] and applies it to the global logger.
///
/// An unset variable leaves the level untouched; an unparsable one is
/// reported as an error and also leaves the level untouched.
pub fn init_from_env() -> Result<(), ParseLevelError> {
    logger().apply_env_value(std::env::var(LOG_ENV).ok().as_deref())
}

#[doc(hidden)]
pub fn __emit(level: Level, target: &str, args: Arguments) {
    let logger = logger();
    if !logger.enabled(level) {
        return;
    }
    let line = logger.format(level, target, args);
    // A closed stderr is not worth failing the caller over.
    let _ = writeln!(std::io::stderr().lock(), "{line}");
}

/// Logs at an explicit level.
///
/// ```
/// use kuuru_log::{log, Level};
///
/// log!(level: Level::Warn, "arena {} is {}% full", "temp", 90);
/// ```
#[macro_export]
macro_rules! log {
    (level: $level:expr, $($arg:tt)*) => {{
        let level = $level;
        if $crate::logger().enabled(level) {
            $crate::__emit(level, module_path!(), format_args!($($arg)*));
        }
    }};
}

/// Logs at [`Level::Error`].
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Error, $($arg)*) };
}

/// Logs at [`Level::Warn`].
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Warn, $($arg)*) };
}

/// Logs at [`Level::Info`].
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Info, $($arg)*) };
}

/// Logs at [`Level::Debug`].
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Debug, $($arg)*) };
}

/// Logs at [`Level::Trace`].
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => { $crate::log!(level: $crate::Level::Trace, $($arg)*) };
}
