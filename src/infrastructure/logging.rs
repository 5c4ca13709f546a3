//! Logging system configuration and initialization
//!
//! - Console and per-run log file, both with KST (UTC+9) timestamps
//! - Level from configuration, overridable with `RUST_LOG`
//! - Verbose dependency targets suppressed unless TRACE is requested
//!
//! The file writer lives as long as the returned [`LogGuard`]; drop it last.

#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use chrono::{FixedOffset, Utc};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub use crate::infrastructure::config::LoggingConfig;
use crate::domain::Checkpoint;

const KST_OFFSET_SECONDS: i32 = 9 * 3600;

/// Targets that flood the log below TRACE
const NOISY_TARGETS: &[(&str, &str)] = &[
    ("reqwest", "info"),
    ("hyper", "warn"),
    ("hyper_util", "warn"),
    ("h2", "warn"),
    ("rustls", "warn"),
    ("cookie_store", "warn"),
    ("html5ever", "warn"),
    ("selectors", "warn"),
];

/// Custom time formatter for KST (Korea Standard Time, UTC+9)
#[derive(Debug, Clone, Copy, Default)]
pub struct KstTimeFormatter;

impl FormatTime for KstTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        let kst = FixedOffset::east_opt(KST_OFFSET_SECONDS).ok_or(std::fmt::Error)?;
        let now = Utc::now().with_timezone(&kst);
        write!(w, "{}", now.format("%Y-%m-%d %H:%M:%S%.3f %:z"))
    }
}

/// Keeps the non-blocking file writer alive; logs are flushed on drop
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _file: Option<WorkerGuard>,
    log_file: Option<PathBuf>,
}

impl LogGuard {
    #[must_use]
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }
}

/// Log file name for a run starting at `cursor`
///
/// Without a readable cursor a KST timestamp keeps names unique.
#[must_use]
pub fn run_log_file_name(cursor: Option<&Checkpoint>) -> String {
    match cursor {
        Some(cp) => format!("s2b_result_{}_{}.log", cp.target_date(), cp.next_page()),
        None => {
            let now = FixedOffset::east_opt(KST_OFFSET_SECONDS)
                .map_or_else(|| Utc::now().naive_utc(), |kst| Utc::now().with_timezone(&kst).naive_local());
            format!("s2b_harvest_{}.log", now.format("%Y%m%dT%H%M%S"))
        }
    }
}

/// Filter from `RUST_LOG`, or from the configured level with noisy targets clamped
#[must_use]
pub fn build_env_filter(level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let mut filter = EnvFilter::new(level);
    if !level.to_lowercase().contains("trace") {
        for (target, target_level) in NOISY_TARGETS {
            if let Ok(directive) = format!("{}={}", target, target_level).parse() {
                filter = filter.add_directive(directive);
            }
        }
    }
    filter
}

/// Initialize console and/or file logging for one run
pub fn init_logging(config: &LoggingConfig, log_file_name: &str) -> Result<LogGuard> {
    if !config.console_output && !config.file_output {
        return Err(anyhow!("No logging output configured"));
    }

    let (file_layer, file_guard, log_file) = if config.file_output {
        std::fs::create_dir_all(&config.log_dir)
            .with_context(|| format!("Failed to create log directory {:?}", config.log_dir))?;

        let file_appender = rolling::never(&config.log_dir, log_file_name);
        let (file_writer, guard) = non_blocking(file_appender);

        // time + level + message only, no colors
        let layer = fmt::Layer::new()
            .with_writer(file_writer)
            .with_timer(KstTimeFormatter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_ansi(false);

        (Some(layer), Some(guard), Some(config.log_dir.join(log_file_name)))
    } else {
        (None, None, None)
    };

    let console_layer = config.console_output.then(|| {
        fmt::Layer::new()
            .with_writer(std::io::stdout)
            .with_timer(KstTimeFormatter)
            .with_target(false)
    });

    Registry::default()
        .with(build_env_filter(&config.level))
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging system initialized");
    info!("Log level: {}", config.level);
    if let Some(path) = &log_file {
        info!("Log file: {:?}", path);
    }

    Ok(LogGuard {
        _file: file_guard,
        log_file,
    })
}

/// Log system information for diagnostics
pub fn log_system_info() {
    info!("=== S2B Harvest ===");
    info!("Application version: {}", env!("CARGO_PKG_VERSION"));
    info!("Operating system: {}", std::env::consts::OS);
    info!("Architecture: {}", std::env::consts::ARCH);

    if let Ok(current_dir) = std::env::current_dir() {
        info!("Working directory: {:?}", current_dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert!(!config.level.is_empty());
        assert!(config.console_output);
        assert!(config.file_output);
    }

    #[test]
    fn run_log_name_follows_cursor() {
        let cp = Checkpoint::new("20250601".parse().unwrap(), 4).unwrap();
        assert_eq!(run_log_file_name(Some(&cp)), "s2b_result_20250601_4.log");

        let fallback = run_log_file_name(None);
        assert!(fallback.starts_with("s2b_harvest_"));
        assert!(fallback.ends_with(".log"));
    }

    #[test]
    fn kst_formatter_writes_offset() {
        let mut out = String::new();
        let mut writer = fmt::format::Writer::new(&mut out);
        KstTimeFormatter.format_time(&mut writer).unwrap();
        assert!(out.ends_with("+09:00"));
    }

    #[test]
    fn no_output_is_rejected() {
        let config = LoggingConfig {
            console_output: false,
            file_output: false,
            ..LoggingConfig::default()
        };
        assert!(init_logging(&config, "unused.log").is_err());
    }
}
