//! Turns task outcomes into report records
//!
//! Successful payloads go through the domain schema's extraction; every failed
//! fetch (a product, or a single page) becomes exactly one error record.

use std::sync::Arc;

use chrono::Local;

use crate::domain::outcome::{FetchOutcome, TaskOutcome};
use crate::domain::record::NormalizedRecord;
use crate::domain::schema::{DomainSchema, RecordContext};

pub struct RecordNormalizer {
    schema: Arc<dyn DomainSchema>,
    process_name: String,
}

/// ISO-8601 local time with microseconds
fn timestamp() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

impl RecordNormalizer {
    pub fn new(schema: Arc<dyn DomainSchema>, process_name: impl Into<String>) -> Self {
        Self {
            schema,
            process_name: process_name.into(),
        }
    }

    /// Records of one task, page by page
    #[must_use]
    pub fn normalize(&self, outcome: &TaskOutcome) -> Vec<NormalizedRecord> {
        let mut records = Vec::new();
        for page in &outcome.pages {
            let ctx = RecordContext {
                key: &outcome.task.key,
                page: page.page,
                process_name: &self.process_name,
                timestamp: timestamp(),
            };
            match &page.outcome {
                FetchOutcome::Success { payload, .. } => {
                    records.extend(self.schema.records_from_payload(&ctx, payload));
                }
                FetchOutcome::Failure { failure, attempts } => {
                    records.push(self.schema.failure_record(&ctx, failure, *attempts));
                }
            }
        }
        records
    }

    #[must_use]
    pub fn normalize_all(&self, outcomes: &[TaskOutcome]) -> Vec<NormalizedRecord> {
        outcomes.iter().flat_map(|o| self.normalize(o)).collect()
    }
}
