//! Infrastructure layer: HTTP access, retries, configuration, logging and
//! spreadsheet input/output.

pub mod config;
pub mod http_client;
pub mod key_source;
pub mod logging;
pub mod retry_policy;
pub mod xlsx_writer;

pub use config::{AppConfig, ConfigManager};
pub use http_client::{ApiHttpClient, ApiRequest, ApiTarget, FetchClient, HttpClientError};
pub use key_source::{KeySource, KeySourceError};
pub use logging::{init_logging, init_logging_with_config};
pub use retry_policy::RetryPolicy;
pub use xlsx_writer::XlsxReportWriter;
