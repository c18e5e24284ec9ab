//! SKU Report - concurrent product, search and review extraction
//!
//! Keys (SKUs or search terms) are fanned out over a bounded worker pool
//! against a local extraction API. Responses are normalized into a fixed
//! column set per domain and written to an annotated spreadsheet report.

pub mod application;
pub mod crawling;
pub mod domain;
pub mod infrastructure;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use anyhow::{Context, Result};
use tracing::info;

pub use application::{ExtractionPipeline, PipelineError, RunSummary};
pub use domain::{Domain, KeyInput};
pub use infrastructure::config::AppConfig;

use infrastructure::key_source::KeySource;

/// Reads the configured keys and runs one extraction batch
pub async fn run(config: &AppConfig) -> Result<RunSummary> {
    let keys = KeySource::from_config(&config.input)
        .load()
        .map_err(PipelineError::from)?;

    let pipeline = ExtractionPipeline::from_config(config)?;
    let output = config.output_path(pipeline.schema());
    info!(
        "🔧 {} run against {} (root domain: {}, workers: {})",
        config.run.domain, config.api.base_url, config.api.root_domain, config.run.workers
    );

    pipeline
        .run(&keys, &output)
        .await
        .with_context(|| format!("{} run failed", config.run.domain))
}
