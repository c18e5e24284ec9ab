//! Extraction pipeline
//!
//! keys → tasks → scheduler (fetch + retry) → outcomes → records → report.
//! One generic pipeline serves every domain; the domain schema decides
//! endpoints, columns and QA rules.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::application::normalizer::RecordNormalizer;
use crate::application::report::{Report, ReportError, ReportSink};
use crate::crawling::{TaskRunner, TaskScheduler};
use crate::domain::outcome::TaskOutcome;
use crate::domain::schema::DomainSchema;
use crate::domain::schemas::schema_for;
use crate::domain::task::{build_tasks, KeyInput, RetrievalParams};
use crate::infrastructure::config::{defaults, AppConfig};
use crate::infrastructure::http_client::{ApiHttpClient, FetchClient, HttpClientError};
use crate::infrastructure::key_source::KeySourceError;
use crate::infrastructure::xlsx_writer::XlsxReportWriter;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("failed to read keys: {0}")]
    Input(#[from] KeySourceError),

    #[error("failed to write report: {0}")]
    Report(#[from] ReportError),

    #[error("failed to set up the API client: {0}")]
    HttpClient(#[from] HttpClientError),
}

/// Run-wide knobs of the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub workers: usize,
    pub params: RetrievalParams,
    pub process_name: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            workers: defaults::WORKERS,
            params: RetrievalParams::default(),
            process_name: defaults::PROCESS_NAME.to_string(),
        }
    }
}

impl From<&AppConfig> for PipelineSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            workers: config.run.workers,
            params: config.run.retrieval_params(),
            process_name: config.run.process_name.clone(),
        }
    }
}

/// What a run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub tasks: usize,
    pub records: usize,
    /// Failed fetches (products or pages) that became error rows
    pub failures: usize,
    /// `None` when no record came from a successful fetch
    pub report_path: Option<PathBuf>,
}

pub struct ExtractionPipeline {
    schema: Arc<dyn DomainSchema>,
    client: Arc<dyn FetchClient>,
    sink: Arc<dyn ReportSink>,
    settings: PipelineSettings,
}

impl ExtractionPipeline {
    pub fn new(
        schema: Arc<dyn DomainSchema>,
        client: Arc<dyn FetchClient>,
        sink: Arc<dyn ReportSink>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            schema,
            client,
            sink,
            settings,
        }
    }

    /// Production wiring: HTTP client and spreadsheet writer from configuration
    pub fn from_config(config: &AppConfig) -> Result<Self, PipelineError> {
        let schema = schema_for(config.run.domain, config.api.product_endpoint);
        let client = Arc::new(ApiHttpClient::from_config(&config.api)?);
        Ok(Self::new(
            schema,
            client,
            Arc::new(XlsxReportWriter::new()),
            PipelineSettings::from(config),
        ))
    }

    pub fn schema(&self) -> &dyn DomainSchema {
        self.schema.as_ref()
    }

    /// Fetch every key, build the annotated report and write it to `output`
    pub async fn run(&self, keys: &[KeyInput], output: &Path) -> Result<RunSummary, PipelineError> {
        let domain = self.schema.domain();
        let tasks = build_tasks(domain, keys, self.settings.params);
        let task_count = tasks.len();
        info!("🎯 Starting {} run with {} keys", domain, task_count);

        let runner = Arc::new(TaskRunner::new(Arc::clone(&self.client), Arc::clone(&self.schema)));
        let outcomes = TaskScheduler::new(self.settings.workers)
            .run(tasks, runner)
            .await;
        let failures = count_failures(&outcomes);

        let normalizer = RecordNormalizer::new(Arc::clone(&self.schema), self.settings.process_name.as_str());
        let records = normalizer.normalize_all(&outcomes);
        let record_count = records.len();

        let report = Report::build(self.schema.as_ref(), records);
        let report_path = if report.successful_rows() == 0 {
            warn!("⚠️ No successful records; skipping report creation");
            None
        } else {
            self.sink.write(&report, output)?;
            Some(output.to_path_buf())
        };

        info!(
            "🏁 {} run finished: {} tasks, {} records, {} failed fetches",
            domain, task_count, record_count, failures
        );

        Ok(RunSummary {
            tasks: task_count,
            records: record_count,
            failures,
            report_path,
        })
    }
}

fn count_failures(outcomes: &[TaskOutcome]) -> usize {
    outcomes
        .iter()
        .flat_map(|o| &o.pages)
        .filter(|p| !p.outcome.is_success())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::outcome::FetchFailure;
    use crate::domain::schemas::ReviewSchema;
    use crate::test_utils::ScriptedClient;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Keeps the report in memory instead of writing a file
    #[derive(Default)]
    struct CapturingSink {
        reports: Mutex<Vec<Report>>,
    }

    impl ReportSink for CapturingSink {
        fn write(&self, report: &Report, _path: &Path) -> Result<(), ReportError> {
            self.reports.lock().unwrap().push(report.clone());
            Ok(())
        }
    }

    fn settings() -> PipelineSettings {
        PipelineSettings {
            workers: 2,
            params: RetrievalParams {
                base_timeout: Duration::from_millis(5),
                max_attempts: 2,
                max_pages: 2,
            },
            process_name: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_all_failures_write_no_report() {
        let sink = Arc::new(CapturingSink::default());
        let client = Arc::new(
            ScriptedClient::new().always("sku-1", Some(1), Err(FetchFailure::status(404, "nope"))),
        );
        let pipeline = ExtractionPipeline::new(Arc::new(ReviewSchema), client, sink.clone(), settings());

        let summary = pipeline
            .run(&[KeyInput::from("SKU-1")], Path::new("unused.xlsx"))
            .await
            .unwrap();

        assert_eq!(summary.report_path, None);
        // both pages failed, so both became error rows
        assert_eq!(summary.failures, 2);
        assert_eq!(summary.records, 2);
        assert!(sink.reports.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_successful_run_hands_report_to_sink() {
        let sink = Arc::new(CapturingSink::default());
        let client = Arc::new(
            ScriptedClient::new()
                .always("sku-1", Some(1), Ok(serde_json::json!({"reviewItems": [{"reviewId": "R1"}]})))
                .always("sku-1", Some(2), Ok(serde_json::json!({"reviewItems": []}))),
        );
        let pipeline = ExtractionPipeline::new(Arc::new(ReviewSchema), client, sink.clone(), settings());

        let summary = pipeline
            .run(&[KeyInput::from("sku-1")], Path::new("Reviews.xlsx"))
            .await
            .unwrap();

        assert_eq!(summary.report_path, Some(PathBuf::from("Reviews.xlsx")));
        assert_eq!(summary.failures, 0);
        let reports = sink.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].records().len(), 1);
        assert_eq!(reports[0].sheet_title(), "Reviews Data");
    }
}
