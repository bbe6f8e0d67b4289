pub use crate::error::{Result, ThreadweaveError};
pub use crate::snapshots::{ForestSnapshots, ForestUpdate};
pub use crate::threading::{
    Message, MessageThreader, NodeSummary, ParentPreview, ThreadForest, ThreadingConfig,
    ThreadingError,
};

use once_cell::sync::OnceCell;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::EnvFilter, fmt::Layer, prelude::*, registry::Registry};

use std::path::{Path, PathBuf};
use std::sync::Mutex;

mod error;
pub mod outline;
pub mod snapshots;
pub mod threading;

pub const COALESCE_WINDOW_ENV: &str = "THREADWEAVE_COALESCE_WINDOW_MS";
pub const IMPLICIT_LINK_WINDOW_ENV: &str = "THREADWEAVE_IMPLICIT_LINK_WINDOW_MS";
pub const DEBUG_LOGGING_ENV: &str = "THREADWEAVE_DEBUG_LOGGING";
pub const LOGS_DIR_ENV: &str = "THREADWEAVE_LOGS_DIR";

static TRACING_GUARDS: OnceCell<Mutex<Option<(WorkerGuard, Option<WorkerGuard>)>>> =
    OnceCell::new();
static TRACING_INIT: OnceCell<()> = OnceCell::new();

/// Install the global tracing subscriber once.
///
/// Logs go to stderr and, when `logs_dir` is given, to a daily rolling file in
/// that directory. The filter comes from `RUST_LOG`, defaulting to `info`.
pub fn init_tracing(logs_dir: Option<&Path>) -> Result<()> {
    TRACING_INIT.get_or_try_init(|| -> Result<()> {
        let (non_blocking_stderr, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());

        let (file_layer, file_guard) = match logs_dir {
            Some(logs_dir) => {
                std::fs::create_dir_all(logs_dir)?;
                let file_appender = tracing_appender::rolling::RollingFileAppender::builder()
                    .rotation(tracing_appender::rolling::Rotation::DAILY)
                    .filename_prefix("threadweave")
                    .filename_suffix("log")
                    .build(logs_dir)
                    .map_err(|e| ThreadweaveError::LoggingSetup(e.to_string()))?;
                let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);
                let file_layer = Layer::new()
                    .with_writer(non_blocking_file)
                    .with_ansi(false)
                    .with_target(true);
                (Some(file_layer), Some(file_guard))
            }
            None => (None, None),
        };

        TRACING_GUARDS
            .set(Mutex::new(Some((stderr_guard, file_guard))))
            .ok();

        let stderr_layer = Layer::new()
            .with_writer(non_blocking_stderr)
            .with_ansi(true)
            .with_target(true);

        Registry::default()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
            .with(stderr_layer)
            .with(file_layer)
            .try_init()
            .map_err(|e| ThreadweaveError::LoggingSetup(e.to_string()))
    })?;
    Ok(())
}

#[derive(Clone, Debug, Default)]
pub struct ThreadweaveConfig {
    /// Windows for the threading heuristics
    pub threading: ThreadingConfig,

    /// Directory for log files; stderr only when absent
    pub logs_dir: Option<PathBuf>,
}

impl ThreadweaveConfig {
    /// Build a configuration from `THREADWEAVE_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ThreadweaveConfig::from_env`], reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ThreadingConfig::default();

        let threading = ThreadingConfig {
            coalesce_window_ms: parse_var(&lookup, COALESCE_WINDOW_ENV)?
                .unwrap_or(defaults.coalesce_window_ms),
            implicit_link_window_ms: parse_var(&lookup, IMPLICIT_LINK_WINDOW_ENV)?
                .unwrap_or(defaults.implicit_link_window_ms),
            enable_debug_logging: parse_var(&lookup, DEBUG_LOGGING_ENV)?
                .unwrap_or(defaults.enable_debug_logging),
        };

        threading
            .validate()
            .map_err(|e| ThreadweaveError::Configuration(e.to_string()))?;

        let logs_dir = lookup(LOGS_DIR_ENV)
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            threading,
            logs_dir,
        })
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ThreadweaveError::Configuration(format!("{key}={raw:?}: {e}"))),
        _ => Ok(None),
    }
}
