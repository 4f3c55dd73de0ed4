//! Debug logging for the CLI and the library.
//!
//! Library code logs through the `log_*` macros. Nothing is emitted until
//! [`enable_logging`] is called and a sink (log file or stderr) is set.

use chrono::Local;
use log::{Level, LevelFilter, Metadata, Record};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::sync::{LazyLock, OnceLock};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};

const DEFAULT_FILTER: &str = "specsmith=debug,warn";

#[derive(Default)]
struct Sinks {
    enabled: bool,
    verbose: bool,
    stderr: bool,
    file: Option<File>,
}

impl Sinks {
    fn accepts(&self, metadata: &Metadata) -> bool {
        if !self.enabled {
            return false;
        }
        let target = metadata.target();
        if target.starts_with("specsmith") {
            return metadata.level() <= Level::Debug;
        }
        if !self.verbose && is_transport_target(target) {
            return false;
        }
        metadata.level() <= Level::Info
    }

    fn write_line(&mut self, line: &str) {
        if let Some(file) = self.file.as_mut() {
            let _ = file.write_all(line.as_bytes());
            let _ = file.flush();
        }
        if self.stderr {
            eprint!("{line}");
        }
    }
}

static SINKS: LazyLock<Mutex<Sinks>> = LazyLock::new(Mutex::default);

struct SpecsmithLogger;

static LOGGER: SpecsmithLogger = SpecsmithLogger;

impl log::Log for SpecsmithLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        SINKS.lock().accepts(metadata)
    }

    fn log(&self, record: &Record) {
        let mut sinks = SINKS.lock();
        if !sinks.accepts(record.metadata()) {
            return;
        }
        let line = format!(
            "{} {} [{}] - {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.target(),
            record.args()
        );
        sinks.write_line(&line);
    }

    fn flush(&self) {}
}

/// Tracing output shares the log file
struct FileWriter;

impl Write for FileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(file) = SINKS.lock().file.as_mut() {
            let _ = file.write_all(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(file) = SINKS.lock().file.as_mut() {
            let _ = file.flush();
        }
        Ok(())
    }
}

/// Whether a log target belongs to the HTTP stack underneath the adapters
fn is_transport_target(target: &str) -> bool {
    ["reqwest", "hyper", "h2", "rustls", "want", "mio"]
        .iter()
        .any(|prefix| target.starts_with(prefix))
}

/// Install the `log` backend and the tracing subscriber
///
/// Runs once per process; later calls return the first outcome.
pub fn init() -> Result<(), String> {
    static INIT: OnceLock<Result<(), String>> = OnceLock::new();

    INIT.get_or_init(|| {
        let wants_verbose = std::env::var_os("SPECSMITH_VERBOSE").is_some()
            || std::env::var("RUST_LOG").is_ok_and(|v| v.contains("debug") || v.contains("trace"));
        set_verbose_logging(wants_verbose);

        log::set_logger(&LOGGER).map_err(|e| format!("Failed to install logger: {e}"))?;
        log::set_max_level(LevelFilter::Debug);

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let subscriber = Registry::default().with(filter).with(
            fmt::layer()
                .with_ansi(false)
                .with_timer(fmt::time::ChronoUtc::rfc_3339())
                .with_writer(|| FileWriter),
        );
        tracing::subscriber::set_global_default(subscriber)
            .map_err(|e| format!("Failed to install tracing subscriber: {e}"))
    })
    .clone()
}

pub fn enable_logging() {
    SINKS.lock().enabled = true;
}

pub fn disable_logging() {
    SINKS.lock().enabled = false;
}

/// Let HTTP client internals through as well
pub fn set_verbose_logging(enabled: bool) {
    SINKS.lock().verbose = enabled;
}

pub fn set_log_file(file_path: &str) -> io::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(file_path)?;
    SINKS.lock().file = Some(file);
    Ok(())
}

/// Mirror log lines to stderr; stdout stays reserved for command output
pub fn set_log_to_stderr(enabled: bool) {
    SINKS.lock().stderr = enabled;
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        log::debug!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        log::info!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        log::warn!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        log::error!($($arg)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_targets() {
        assert!(is_transport_target("reqwest::connect"));
        assert!(is_transport_target("hyper_util::client"));
        assert!(!is_transport_target("specsmith::gateway"));
    }

    fn debug(target: &str) -> Metadata<'_> {
        Metadata::builder().level(Level::Debug).target(target).build()
    }

    fn info(target: &str) -> Metadata<'_> {
        Metadata::builder().level(Level::Info).target(target).build()
    }

    #[test]
    fn test_sinks_filtering() {
        let mut sinks = Sinks::default();
        assert!(!sinks.accepts(&debug("specsmith::gateway")));

        sinks.enabled = true;
        assert!(sinks.accepts(&debug("specsmith::gateway")));
        assert!(!sinks.accepts(&debug("tokio::runtime")));
        assert!(!sinks.accepts(&info("reqwest::connect")));

        sinks.verbose = true;
        assert!(sinks.accepts(&info("reqwest::connect")));
    }

    #[test]
    fn test_init_is_idempotent() {
        assert_eq!(init(), init());
    }
}
