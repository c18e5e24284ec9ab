//! Logging system configuration and initialization
//!
//! - Console output with local timestamps
//! - Optional file output (plain or JSON) through a non-blocking writer
//! - Existing log files are renamed with their timestamp before a new run
//! - `RUST_LOG` overrides the configured filter

#![allow(clippy::uninlined_format_args)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use chrono::Local;
use lazy_static::lazy_static;
use tracing::info;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    fmt::{self, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

pub use crate::infrastructure::config::LoggingConfig;

/// Base name of the unified log file
const LOG_FILE_STEM: &str = "sku-report";

// Keeps the file writer alive for the lifetime of the process
lazy_static! {
    static ref LOG_GUARDS: Mutex<Vec<tracing_appender::non_blocking::WorkerGuard>> =
        Mutex::new(Vec::new());
}

/// Timestamps in the local timezone, matching the report timestamps
struct LocalTimeFormatter;

impl FormatTime for LocalTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Log directory: the configured one, or `logs/` next to the executable
pub fn get_log_directory(config: &LoggingConfig) -> PathBuf {
    if let Some(dir) = &config.log_dir {
        return dir.clone();
    }
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

    exe_dir.join("logs")
}

fn log_file_name(config: &LoggingConfig) -> String {
    match config.file_naming_strategy.as_str() {
        "timestamped" => format!("{}-{}.log", LOG_FILE_STEM, Local::now().format("%Y%m%d")),
        _ => format!("{}.log", LOG_FILE_STEM),
    }
}

/// Rename an existing log file with its modification time
fn rotate_existing_log_file(log_dir: &Path, log_file_name: &str) -> Result<Option<String>> {
    let log_file_path = log_dir.join(log_file_name);
    if !log_file_path.exists() {
        return Ok(None);
    }

    let metadata = std::fs::metadata(&log_file_path)
        .map_err(|e| anyhow!("Failed to get log file metadata: {}", e))?;
    let file_time = metadata
        .modified()
        .unwrap_or_else(|_| std::time::SystemTime::now());
    let datetime: chrono::DateTime<Local> = file_time.into();

    let file_stem = log_file_name.trim_end_matches(".log");
    let rotated_name = format!("{}.{}.log", file_stem, datetime.format("%Y%m%dT%H%M%S"));
    let rotated_path = log_dir.join(&rotated_name);

    std::fs::rename(&log_file_path, &rotated_path).map_err(|e| {
        anyhow!(
            "Failed to rotate log file {} to {}: {}",
            log_file_path.display(),
            rotated_path.display(),
            e
        )
    })?;

    Ok(Some(rotated_name))
}

fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut filter = EnvFilter::try_new(&config.level)
        .map_err(|e| anyhow!("Invalid log level '{}': {}", config.level, e))?;

    // Dependency chatter stays quiet unless TRACE is requested
    if !config.level.eq_ignore_ascii_case("trace") {
        for (module, level) in &config.module_filters {
            let directive = format!("{}={}", module, level)
                .parse()
                .map_err(|e| anyhow!("Invalid module filter {}={}: {}", module, level, e))?;
            filter = filter.add_directive(directive);
        }
    }

    Ok(filter)
}

/// Initialize logging with default configuration
pub fn init_logging() -> Result<()> {
    init_logging_with_config(&LoggingConfig::default())
}

/// Initialize logging with custom configuration
///
/// Override the configured filter with `RUST_LOG`, for example:
/// ```bash
/// RUST_LOG="debug,reqwest=debug" sku-report --domain search
/// ```
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    if !config.file_output && !config.console_output {
        return Err(anyhow!("No logging output configured"));
    }

    let env_filter = build_env_filter(config)?;
    let registry = Registry::default().with(env_filter);

    let mut log_path = None;
    let mut rotated = None;
    let file_layer = if config.file_output {
        let log_dir = get_log_directory(config);
        std::fs::create_dir_all(&log_dir)
            .map_err(|e| anyhow!("Failed to create log directory {:?}: {}", log_dir, e))?;

        let file_name = log_file_name(config);
        rotated = rotate_existing_log_file(&log_dir, &file_name)?;

        let (file_writer, file_guard) = non_blocking(rolling::never(&log_dir, &file_name));
        LOG_GUARDS
            .lock()
            .map_err(|_| anyhow!("Log guard registry is poisoned"))?
            .push(file_guard);
        log_path = Some(log_dir.join(&file_name));

        let layer = fmt::Layer::new()
            .with_writer(file_writer)
            .with_timer(LocalTimeFormatter)
            .with_ansi(false);
        Some(if config.json_format {
            layer
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .boxed()
        } else {
            layer.with_target(false).boxed()
        })
    } else {
        None
    };

    let console_layer = config.console_output.then(|| {
        fmt::Layer::new()
            .with_writer(std::io::stdout)
            .with_timer(LocalTimeFormatter)
            .with_target(false)
    });

    registry
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    info!("📝 Logging initialized (level: {})", config.level);
    if let Some(path) = log_path {
        info!("Log file: {:?}", path);
    }
    if let Some(name) = rotated {
        info!("Rotated existing log file to: {}", name);
    }

    Ok(())
}

/// Log system information for diagnostics
pub fn log_system_info() {
    info!("=== SKU Report ===");
    info!("Application version: {}", env!("CARGO_PKG_VERSION"));
    info!("Operating system: {}", std::env::consts::OS);
    if let Ok(current_dir) = std::env::current_dir() {
        info!("Working directory: {:?}", current_dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_names() {
        let mut config = LoggingConfig::default();
        assert_eq!(log_file_name(&config), "sku-report.log");

        config.file_naming_strategy = "timestamped".to_string();
        let name = log_file_name(&config);
        assert!(name.starts_with("sku-report-"));
        assert!(name.ends_with(".log"));
    }

    #[test]
    fn test_configured_log_directory_wins() {
        let config = LoggingConfig {
            log_dir: Some(PathBuf::from("/tmp/sku-logs")),
            ..LoggingConfig::default()
        };
        assert_eq!(get_log_directory(&config), PathBuf::from("/tmp/sku-logs"));
    }

    #[test]
    fn test_rotate_existing_log_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(rotate_existing_log_file(dir.path(), "sku-report.log").unwrap(), None);

        std::fs::write(dir.path().join("sku-report.log"), "previous run").unwrap();
        let rotated = rotate_existing_log_file(dir.path(), "sku-report.log")
            .unwrap()
            .unwrap();
        assert!(rotated.starts_with("sku-report."));
        assert!(!dir.path().join("sku-report.log").exists());
        assert!(dir.path().join(rotated).exists());
    }

    #[test]
    fn test_no_output_is_rejected() {
        let config = LoggingConfig {
            console_output: false,
            file_output: false,
            ..LoggingConfig::default()
        };
        assert!(init_logging_with_config(&config).is_err());
    }

    #[test]
    fn test_invalid_level_is_rejected() {
        let config = LoggingConfig {
            level: "info,reqwest=loud".to_string(),
            ..LoggingConfig::default()
        };
        // RUST_LOG may be set in CI; only assert when it is not
        if std::env::var("RUST_LOG").is_err() {
            assert!(build_env_filter(&config).is_err());
        }
    }
}
