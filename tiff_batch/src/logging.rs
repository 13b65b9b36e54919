//! Logging Module
//!
//! Two `tracing` layers share one registry:
//! - console diagnostics on stderr, filtered by `RUST_LOG` (default `warn`)
//! - the audit log, which receives only events with [`AUDIT_TARGET`] and
//!   writes them through a non-blocking appender to the `--logfile`
//!
//! The audit file is opened in append mode, so earlier runs are kept.
//!
//! ```no_run
//! use tiff_batch::logging::{init_logging, LogConfig};
//!
//! let _guard = init_logging(LogConfig::new().with_log_file("compression.log"))?;
//! tiff_batch::logging::audit("✔ scan.tif | 10.00 KB → 4.00 KB");
//! # Ok::<(), tiff_batch::ConfigError>(())
//! ```

use crate::errors::ConfigError;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;
use tracing::{Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Events with this target go to the audit log and nowhere else.
pub const AUDIT_TARGET: &str = "tiffcompressor::audit";

pub const DEFAULT_LOG_FILE: &str = "compression.log";

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_file: PathBuf,
    /// Console level when `RUST_LOG` is unset.
    pub console_level: Level,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            console_level: Level::WARN,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.log_file = path.as_ref().to_path_buf();
        self
    }

    pub fn with_console_level(mut self, level: Level) -> Self {
        self.console_level = level;
        self
    }
}

pub fn open_log_file(path: &Path) -> Result<File, ConfigError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| ConfigError::LogFile {
            path: path.to_path_buf(),
            source,
        })
}

/// Layer writing audit events, and only those, to `file`.
pub fn audit_layer<S>(file: File) -> (impl Layer<S>, WorkerGuard)
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let (writer, guard) = tracing_appender::non_blocking(file);
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .with_level(false)
        .with_filter(filter_fn(|meta| meta.target() == AUDIT_TARGET));
    (layer, guard)
}

/// Installs the global subscriber.
///
/// The returned guard flushes the audit log when dropped; keep it alive until
/// the final summary has been logged.
pub fn init_logging(config: LogConfig) -> Result<WorkerGuard, ConfigError> {
    let file = open_log_file(&config.log_file)?;
    let (audit, guard) = audit_layer(file);

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(config.console_level).into())
        .from_env_lossy();

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(env_filter)
        .with_filter(filter_fn(|meta| meta.target() != AUDIT_TARGET));

    tracing_subscriber::registry()
        .with(audit)
        .with(console)
        .try_init()
        .map_err(|e| ConfigError::Logging(e.to_string()))?;

    tracing::debug!(
        log_file = %config.log_file.display(),
        console_level = %config.console_level,
        "Logging system initialized"
    );
    Ok(guard)
}

/// Writes one line to the audit log.
pub fn audit(line: &str) {
    tracing::info!(target: AUDIT_TARGET, "{}", line);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_open_log_file_appends() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("compression.log");
        fs::write(&path, "earlier run\n").unwrap();

        {
            use std::io::Write;
            let mut file = open_log_file(&path).unwrap();
            writeln!(file, "this run").unwrap();
        }

        assert_eq!(fs::read_to_string(&path).unwrap(), "earlier run\nthis run\n");
    }

    #[test]
    fn test_open_log_file_failure_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing-dir/compression.log");

        let err = open_log_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::LogFile { .. }));
    }

    #[test]
    fn test_audit_layer_only_receives_audit_events() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("audit.log");
        let file = open_log_file(&path).unwrap();

        let (layer, guard) = audit_layer(file);
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            audit("✔ scan.tif | 2.00 KB → 1.00 KB");
            tracing::warn!("console diagnostic");
        });
        drop(guard);

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("✔ scan.tif | 2.00 KB → 1.00 KB"));
        assert!(!contents.contains("console diagnostic"));
        assert!(!contents.contains("INFO"));
        assert!(!contents.contains(AUDIT_TARGET));
    }

    #[test]
    fn test_config_builder() {
        let config = LogConfig::new()
            .with_log_file("/var/log/tiff.log")
            .with_console_level(Level::DEBUG);
        assert_eq!(config.log_file, PathBuf::from("/var/log/tiff.log"));
        assert_eq!(config.console_level, Level::DEBUG);
        assert_eq!(LogConfig::default().log_file, PathBuf::from(DEFAULT_LOG_FILE));
    }
}
