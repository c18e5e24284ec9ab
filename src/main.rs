//! `sku-report` command line entry point

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use sku_report_lib::infrastructure::config::{AppConfig, ConfigManager};
use sku_report_lib::infrastructure::logging::{init_logging_with_config, log_system_info};
use sku_report_lib::Domain;

/// Fetch product, search or review data for a list of keys and write an
/// annotated spreadsheet report.
#[derive(Debug, Parser)]
#[command(name = "sku-report", version, about)]
struct Cli {
    /// Configuration file (TOML or JSON)
    #[arg(long, env = "SKU_REPORT_CONFIG")]
    config: Option<PathBuf>,

    /// Record domain: product, search or review
    #[arg(long)]
    domain: Option<Domain>,

    /// Catalog/site identifier, e.g. "hp.com/us"
    #[arg(long)]
    root_domain: Option<String>,

    /// Spreadsheet or text file with the keys
    #[arg(long)]
    input: Option<PathBuf>,

    /// Report path
    #[arg(long)]
    output: Option<PathBuf>,

    /// Worker pool capacity
    #[arg(long)]
    workers: Option<usize>,
}

impl Cli {
    /// Command line values win over file and environment settings
    fn apply(self, config: &mut AppConfig) {
        if let Some(domain) = self.domain {
            config.run.domain = domain;
        }
        if let Some(root_domain) = self.root_domain {
            config.api.root_domain = root_domain;
        }
        if let Some(input) = self.input {
            config.input.path = Some(input);
        }
        if let Some(output) = self.output {
            config.run.output = Some(output);
        }
        if let Some(workers) = self.workers {
            config.run.workers = workers;
        }
    }
}

fn load_config(cli: Cli) -> Result<AppConfig> {
    let mut config = ConfigManager::new(cli.config.clone()).read_config()?;
    cli.apply(&mut config);
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match load_config(Cli::parse()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging_with_config(&config.logging) {
        eprintln!("Failed to initialize logging: {e:#}");
        return ExitCode::FAILURE;
    }
    log_system_info();

    match sku_report_lib::run(&config).await {
        Ok(summary) => {
            match &summary.report_path {
                Some(path) => info!("✅ Report written to {}", path.display()),
                None => info!("No report written"),
            }
            info!(
                "Tasks: {}, records: {}, failed fetches: {}",
                summary.tasks, summary.records, summary.failures
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "sku-report",
            "--domain",
            "reviews",
            "--root-domain",
            "hp.com/uk",
            "--workers",
            "4",
            "--output",
            "out.xlsx",
        ]);
        let mut config = AppConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.run.domain, Domain::Review);
        assert_eq!(config.api.root_domain, "hp.com/uk");
        assert_eq!(config.run.workers, 4);
        assert_eq!(config.run.output, Some(PathBuf::from("out.xlsx")));
    }

    #[test]
    fn test_unknown_domain_is_rejected() {
        assert!(Cli::try_parse_from(["sku-report", "--domain", "catalog"]).is_err());
    }
}
