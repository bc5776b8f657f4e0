use log::{Metadata, Record};

pub(crate) use log::{debug, error, info, trace, warn};

/// Set the callback function that is called when logging.
///
/// The `callback` function's first parameter is the level of the message being
/// logged, and the second is the message itself.
pub fn set_logging_callback<T>(callback: T)
where
    T: Fn(LogLevel, &str) + Send + Sync + 'static,
{
    let logger = Box::new(CallbackLogger { callback });

    // The logger can only be set once per process, so if this fails the
    // existing logger is left in place.
    if log::set_boxed_logger(logger).is_ok() {
        log::set_max_level(log::LevelFilter::Trace);
    }
}

/// Set the lowest severity of messages that will be passed to the logging
/// callback.
pub fn set_log_level(level: LogLevel) {
    log::set_max_level(match level {
        LogLevel::Trace => log::LevelFilter::Trace,
        LogLevel::Debug => log::LevelFilter::Debug,
        LogLevel::Info => log::LevelFilter::Info,
        LogLevel::Warning => log::LevelFilter::Warn,
        LogLevel::Error | LogLevel::Fatal => log::LevelFilter::Error,
    });
}

/// Codes used to specify different levels of API logging.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warning => write!(f, "warning"),
            LogLevel::Error => write!(f, "error"),
            LogLevel::Fatal => write!(f, "fatal"),
        }
    }
}

impl From<log::Level> for LogLevel {
    fn from(value: log::Level) -> Self {
        match value {
            log::Level::Trace => LogLevel::Trace,
            log::Level::Debug => LogLevel::Debug,
            log::Level::Info => LogLevel::Info,
            log::Level::Warn => LogLevel::Warning,
            log::Level::Error => LogLevel::Error,
        }
    }
}

pub(crate) fn is_log_enabled(level: LogLevel) -> bool {
    let level = match level {
        LogLevel::Trace => log::Level::Trace,
        LogLevel::Debug => log::Level::Debug,
        LogLevel::Info => log::Level::Info,
        LogLevel::Warning => log::Level::Warn,
        LogLevel::Error | LogLevel::Fatal => log::Level::Error,
    };

    log::log_enabled!(level)
}

/// Format an error and its chain of sources as a single string.
pub(crate) fn format_details(error: &dyn std::error::Error) -> String {
    let mut details = error.to_string();

    let mut source = error.source();
    while let Some(error) = source {
        details.push_str(": ");
        details.push_str(&error.to_string());
        source = error.source();
    }

    details
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct CallbackLogger<T: Fn(LogLevel, &str)> {
    callback: T,
}

impl<T: Fn(LogLevel, &str) + Send + Sync> log::Log for CallbackLogger<T> {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            (self.callback)(record.level().into(), &format!("{}", record.args()));
        }
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    mod format_details {
        use super::*;

        #[derive(Debug)]
        struct TestError(Option<Box<TestError>>);

        impl std::fmt::Display for TestError {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "test error")
            }
        }

        impl std::error::Error for TestError {
            fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
                self.0
                    .as_deref()
                    .map(|e| -> &(dyn std::error::Error + 'static) { e })
            }
        }

        #[test]
        fn should_give_only_the_error_display_if_it_has_no_source() {
            assert_eq!("test error", format_details(&TestError(None)));
        }

        #[test]
        fn should_append_each_source_error() {
            let error = TestError(Some(Box::new(TestError(None))));

            assert_eq!("test error: test error", format_details(&error));
        }
    }
}
