//! Configuration infrastructure
//!
//! Run parameters (root domain, timeouts, worker count, page count, input and
//! output paths) are plain configuration values. They are layered as:
//! 1. Built-in defaults (the `defaults` module)
//! 2. An optional TOML/JSON configuration file
//! 3. Environment variables prefixed with `SKU_REPORT_` (`__` separates nesting,
//!    e.g. `SKU_REPORT_RUN__WORKERS=20`)
//! 4. Command line overrides applied by the binary

#![allow(clippy::uninlined_format_args)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::schema::DomainSchema;
use crate::domain::schemas::ProductEndpointMode;
use crate::domain::task::{Domain, RetrievalParams};

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "SKU_REPORT";

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Upstream extraction API
    pub api: ApiConfig,

    /// Batch parameters
    pub run: RunConfig,

    /// Where the keys come from
    pub input: InputConfig,

    pub logging: LoggingConfig,
}

/// Extraction API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the local extraction API
    pub base_url: String,

    /// Catalog/site identifier scoping every call of the run (e.g. "hp.com/us")
    pub root_domain: String,

    pub user_agent: String,

    /// Product endpoint flavour
    pub product_endpoint: ProductEndpointMode,
}

/// Batch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub domain: Domain,

    /// Worker pool capacity
    pub workers: usize,

    /// Timeout of the first attempt; attempt n uses n times this value
    pub base_timeout_seconds: u64,

    /// Attempts per task (or per page for paginated domains)
    pub max_attempts: u32,

    /// Pages requested per key for search and review runs
    pub max_pages: u32,

    /// Value written into the process name column
    pub process_name: String,

    /// Report path; derived from the root domain when unset
    pub output: Option<PathBuf>,
}

/// Key source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Spreadsheet or text file with the keys
    pub path: Option<PathBuf>,

    /// Identifier column when reading a spreadsheet
    pub column: String,

    /// Inline keys, used when no path is configured
    pub keys: Vec<String>,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs in the log file
    pub json_format: bool,

    /// Enable console output
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    /// Log directory; next to the executable when unset
    pub log_dir: Option<PathBuf>,

    /// Log file naming strategy: "unified" or "timestamped"
    pub file_naming_strategy: String,

    /// Module-specific log level filters (e.g., "reqwest": "warn")
    pub module_filters: HashMap<String, String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::BASE_URL.to_string(),
            root_domain: defaults::ROOT_DOMAIN.to_string(),
            user_agent: defaults::USER_AGENT.to_string(),
            product_endpoint: ProductEndpointMode::default(),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            domain: Domain::Product,
            workers: defaults::WORKERS,
            base_timeout_seconds: defaults::BASE_TIMEOUT_SECONDS,
            max_attempts: defaults::MAX_ATTEMPTS,
            max_pages: defaults::MAX_PAGES,
            process_name: defaults::PROCESS_NAME.to_string(),
            output: None,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: None,
            column: defaults::KEY_COLUMN.to_string(),
            keys: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            log_dir: None,
            file_naming_strategy: defaults::LOG_FILE_NAMING_STRATEGY.to_string(),
            module_filters: HashMap::from([
                ("reqwest".to_string(), "warn".to_string()),
                ("hyper".to_string(), "warn".to_string()),
                ("h2".to_string(), "warn".to_string()),
                ("tokio".to_string(), "info".to_string()),
            ]),
        }
    }
}

impl RunConfig {
    #[must_use]
    pub fn retrieval_params(&self) -> RetrievalParams {
        RetrievalParams {
            base_timeout: Duration::from_secs(self.base_timeout_seconds),
            max_attempts: self.max_attempts,
            max_pages: self.max_pages,
        }
    }
}

impl AppConfig {
    /// Rejects values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.run.workers == 0 {
            bail!("run.workers must be at least 1");
        }
        if self.run.max_attempts == 0 {
            bail!("run.max_attempts must be at least 1");
        }
        if self.run.base_timeout_seconds == 0 {
            bail!("run.base_timeout_seconds must be greater than zero");
        }
        if self.run.domain.is_paginated() && self.run.max_pages == 0 {
            bail!("run.max_pages must be at least 1 for {} runs", self.run.domain);
        }
        if self.api.root_domain.trim().is_empty() {
            bail!("api.root_domain must not be empty");
        }
        url::Url::parse(&self.api.base_url)
            .with_context(|| format!("api.base_url is not a valid URL: {}", self.api.base_url))?;
        Ok(())
    }

    /// Report path: the configured one, or a name derived from the root domain
    #[must_use]
    pub fn output_path(&self, schema: &dyn DomainSchema) -> PathBuf {
        self.run
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(schema.default_file_name(&self.api.root_domain)))
    }
}

/// Configuration manager for loading settings
pub struct ConfigManager {
    pub config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join("sku-report");

        Ok(config_dir)
    }

    /// Manager reading an explicit file, or the per-user default location
    pub fn new(config_path: Option<PathBuf>) -> Self {
        Self { config_path }
    }

    /// Shorthand for `ConfigManager::new(path).load_config()`
    pub fn load(config_path: Option<PathBuf>) -> Result<AppConfig> {
        Self::new(config_path).load_config()
    }

    /// Default per-user configuration file
    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::get_config_dir()?.join("config.toml"))
    }

    /// Load and validate configuration
    pub fn load_config(&self) -> Result<AppConfig> {
        let app_config = self.read_config()?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Layer defaults, the file and the environment without validating,
    /// so callers can apply further overrides first
    pub fn read_config(&self) -> Result<AppConfig> {
        let mut builder = config::Config::builder();

        match &self.config_path {
            Some(path) => {
                info!("Loading configuration from: {:?}", path);
                builder = builder.add_source(config::File::from(path.as_path()).required(true));
            }
            None => {
                if let Ok(path) = Self::default_config_path() {
                    builder = builder.add_source(config::File::from(path).required(false));
                }
            }
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration sources")?;

        settings
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}

/// Default configuration values
pub mod defaults {
    /// Local extraction API
    pub const BASE_URL: &str = "http://localhost:5000";

    pub const ROOT_DOMAIN: &str = "hp.com/us";

    pub const USER_AGENT: &str = "sku-report/0.2 (+extraction QA)";

    /// Worker pool capacity
    pub const WORKERS: usize = 10;

    pub const BASE_TIMEOUT_SECONDS: u64 = 30;

    pub const MAX_ATTEMPTS: u32 = 3;

    pub const MAX_PAGES: u32 = 4;

    pub const PROCESS_NAME: &str = "cds";

    pub const KEY_COLUMN: &str = "sku";

    // Logging configuration defaults
    pub const LOG_LEVEL: &str = "info";

    pub const LOG_JSON_FORMAT: bool = false;

    pub const LOG_CONSOLE_OUTPUT: bool = true;

    pub const LOG_FILE_OUTPUT: bool = false;

    pub const LOG_FILE_NAMING_STRATEGY: &str = "unified";
}
