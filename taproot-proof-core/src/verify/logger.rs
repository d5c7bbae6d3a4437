//! An explicit logging handle. The core never logs through the process-wide
//! `log` macros; callers hand it a [`Logger`] instead.

use alloc::sync::Arc;
use core::fmt;

use log::{Level, Log, Metadata, Record};

/// Default target for records emitted by the verifier.
pub const DEFAULT_TARGET: &str = "taproot_proof";

/// A cloneable handle to a `log::Log` sink.
#[derive(Clone)]
pub struct Logger {
    sink: Option<Arc<dyn Log>>,
    target: &'static str,
}

impl Logger {
    /// Wraps any `log::Log` implementation.
    pub fn new(sink: Arc<dyn Log>) -> Self {
        Logger {
            sink: Some(sink),
            target: DEFAULT_TARGET,
        }
    }

    /// Forwards to whichever logger the process installed with the `log`
    /// crate.
    pub fn global() -> Self {
        Logger::new(Arc::new(GlobalLog))
    }

    /// A logger that drops every record.
    pub fn disabled() -> Self {
        Logger {
            sink: None,
            target: DEFAULT_TARGET,
        }
    }

    pub fn enabled(&self, level: Level) -> bool {
        let Some(sink) = &self.sink else {
            return false;
        };
        sink.enabled(&Metadata::builder().level(level).target(self.target).build())
    }

    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        let Some(sink) = &self.sink else {
            return;
        };
        let record = Record::builder()
            .level(level)
            .target(self.target)
            .args(args)
            .build();
        if sink.enabled(record.metadata()) {
            sink.log(&record);
        }
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args);
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args);
    }

    pub fn trace(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Trace, args);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Logger::disabled()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("enabled", &self.sink.is_some())
            .field("target", &self.target)
            .finish()
    }
}

struct GlobalLog;

impl Log for GlobalLog {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        log::logger().enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        log::logger().log(record);
    }

    fn flush(&self) {
        log::logger().flush();
    }
}
