//! # Logging Initialization
//!
//! One global `tracing` subscriber, installed at most once per process.
//!
//! - Filter: `RUST_LOG` when set, otherwise `"{level},sluice=debug"`.
//! - File (default): daily rolling `sluice.*.log` in the user cache directory
//!   from `directories`, no ANSI colors. Falls back to stderr if the directory
//!   cannot be determined or written.
//! - Stderr (`log_to_file = false`): ANSI colors on. Stdout stays reserved for
//!   responses.
//!
//! Audit events (bridge projections, sandbox denials) use the
//! `sluice::audit` target, so `RUST_LOG=sluice::audit=info` isolates them.

use anyhow::Result;
use directories::ProjectDirs;
use std::io::stderr;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt::layer, prelude::*};

/// Where log output ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    File(PathBuf),
    Stderr,
}

static TARGET: OnceLock<LogTarget> = OnceLock::new();

/// Trace-level stderr logging for tests. Safe to call from every test.
pub fn init_test_logging() {
    let _ = init_logging("trace", false);
}

/// Install the global subscriber. Later calls return the first call's target.
pub fn init_logging(log_level: &str, log_to_file: bool) -> Result<&'static LogTarget> {
    Ok(TARGET.get_or_init(|| install(log_level, log_to_file)))
}

fn install(log_level: &str, log_to_file: bool) -> LogTarget {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{log_level},sluice=debug")));

    if log_to_file && let Some((appender, dir)) = file_appender() {
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let installed = tracing_subscriber::registry()
            .with(env_filter)
            .with(layer().with_writer(writer).with_ansi(false))
            .try_init()
            .is_ok();
        // Flushes on drop; the subscriber lives for the whole process.
        std::mem::forget(guard);
        return if installed {
            LogTarget::File(dir)
        } else {
            LogTarget::Stderr
        };
    }

    // A subscriber installed elsewhere (e.g. by a test harness) wins.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(layer().with_writer(stderr).with_ansi(true))
        .try_init();
    LogTarget::Stderr
}

fn file_appender() -> Option<(RollingFileAppender, PathBuf)> {
    let dirs = ProjectDirs::from("com", "Sluice", "sluice")?;
    let log_dir = dirs.cache_dir();
    if !is_writable(log_dir) {
        return None;
    }
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("sluice")
        .filename_suffix("log")
        .build(log_dir)
        .ok()?;
    Some((appender, log_dir.to_path_buf()))
}

/// Create `dir` if needed and prove a file can be written in it.
fn is_writable(dir: &Path) -> bool {
    if std::fs::create_dir_all(dir).is_err() {
        return false;
    }
    let probe = dir.join(".sluice_log_probe");
    let ok = std::fs::write(&probe, b"probe").is_ok();
    let _ = std::fs::remove_file(&probe);
    ok
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writable_probe_creates_missing_dirs() {
        let temp = tempfile::TempDir::new().unwrap();
        let nested = temp.path().join("a/b/c");
        assert!(is_writable(&nested));
        assert!(nested.is_dir());
        assert!(!nested.join(".sluice_log_probe").exists());
    }

    #[test]
    fn repeated_init_returns_first_target() {
        init_test_logging();
        let first = init_logging("info", true).unwrap();
        let second = init_logging("debug", false).unwrap();
        assert_eq!(first, second);
    }
}
