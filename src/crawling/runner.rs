//! Executes one extraction task against the API
//!
//! Product tasks are a single retried fetch. Search and review tasks walk pages
//! `1..=max_pages`, retrying each page on its own; a failed page is recorded and
//! the walk continues, while a successful page with no items ends it.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::crawling::scheduler::TaskExecutor;
use crate::domain::outcome::{FetchOutcome, PageOutcome, TaskOutcome};
use crate::domain::schema::DomainSchema;
use crate::domain::task::Task;
use crate::infrastructure::http_client::{ApiRequest, FetchClient};
use crate::infrastructure::retry_policy::RetryPolicy;

pub struct TaskRunner {
    client: Arc<dyn FetchClient>,
    schema: Arc<dyn DomainSchema>,
}

impl TaskRunner {
    pub fn new(client: Arc<dyn FetchClient>, schema: Arc<dyn DomainSchema>) -> Self {
        Self { client, schema }
    }

    async fn fetch_page(&self, task: &Task, policy: &RetryPolicy, page: Option<u32>) -> FetchOutcome {
        let request = ApiRequest::new(self.schema.endpoint(), task.key.as_str(), page);
        policy.execute(self.client.as_ref(), &request).await
    }

    /// A successful page without items
    fn is_exhausted(&self, outcome: &FetchOutcome) -> bool {
        match outcome {
            FetchOutcome::Success { payload, .. } => self
                .schema
                .page_items(payload)
                .is_some_and(<[Value]>::is_empty),
            FetchOutcome::Failure { .. } => false,
        }
    }
}

#[async_trait]
impl TaskExecutor for TaskRunner {
    async fn execute(&self, task: &Task) -> TaskOutcome {
        let policy = RetryPolicy::from_params(&task.params);

        if !self.schema.endpoint().paged {
            let outcome = self.fetch_page(task, &policy, None).await;
            return TaskOutcome::new(task.clone(), vec![PageOutcome { page: None, outcome }]);
        }

        let mut pages = Vec::new();
        for page in task.page_range() {
            debug!("{} - page {}", task.key, page);
            let outcome = self.fetch_page(task, &policy, Some(page)).await;
            if self.is_exhausted(&outcome) {
                info!("No more results for {} on page {}. Stopping.", task.key, page);
                break;
            }
            pages.push(PageOutcome {
                page: Some(page),
                outcome,
            });
        }

        TaskOutcome::new(task.clone(), pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::outcome::FetchFailure;
    use crate::domain::schemas::{ProductEndpointMode, ProductSchema, ReviewSchema, SearchSchema};
    use crate::domain::task::{Domain, KeyInput, RetrievalParams};
    use crate::test_utils::ScriptedClient;
    use serde_json::json;
    use std::time::Duration;

    fn params(max_pages: u32) -> RetrievalParams {
        RetrievalParams {
            base_timeout: Duration::from_millis(10),
            max_attempts: 3,
            max_pages,
        }
    }

    fn reviews(ids: &[&str]) -> Value {
        let items: Vec<Value> = ids.iter().map(|id| json!({"reviewId": id})).collect();
        json!({"reviewItems": items})
    }

    #[tokio::test]
    async fn test_product_is_a_single_retried_fetch() {
        let client = Arc::new(
            ScriptedClient::new()
                .respond("abc", None, Err(FetchFailure::status(500, "retry me")))
                .respond("abc", None, Ok(json!({"sellerSkus": []}))),
        );
        let runner = TaskRunner::new(
            client.clone(),
            Arc::new(ProductSchema::new(ProductEndpointMode::Api)),
        );
        let task = Task::new(Domain::Product, &KeyInput::from("ABC"), params(4));

        let outcome = runner.execute(&task).await;
        assert_eq!(outcome.pages.len(), 1);
        assert_eq!(outcome.pages[0].page, None);
        assert_eq!(outcome.pages[0].outcome.attempts(), 2);
        assert_eq!(client.pages_requested("abc"), vec![None]);
    }

    #[tokio::test]
    async fn test_empty_page_stops_pagination() {
        let client = Arc::new(
            ScriptedClient::new()
                .always("sku-1", Some(1), Ok(reviews(&["R1", "R2"])))
                .always("sku-1", Some(2), Ok(reviews(&[])))
                .always("sku-1", Some(3), Ok(reviews(&["R3"]))),
        );
        let runner = TaskRunner::new(client.clone(), Arc::new(ReviewSchema));
        let task = Task::new(Domain::Review, &KeyInput::from("sku-1"), params(4));

        let outcome = runner.execute(&task).await;
        assert_eq!(outcome.pages.len(), 1);
        assert!(!outcome.has_failure());
        assert_eq!(client.pages_requested("sku-1"), vec![Some(1), Some(2)]);
    }

    #[tokio::test]
    async fn test_failed_page_does_not_stop_pagination() {
        let client = Arc::new(
            ScriptedClient::new()
                .always("laptop", Some(1), Ok(json!({"searchItems": [{"sku": "S1"}]})))
                .always("laptop", Some(2), Err(FetchFailure::status(503, "busy")))
                .always("laptop", Some(3), Ok(json!({"searchItems": [{"sku": "S3"}]}))),
        );
        let runner = TaskRunner::new(client.clone(), Arc::new(SearchSchema));
        let task = Task::new(Domain::Search, &KeyInput::from("Laptop"), params(3));

        let outcome = runner.execute(&task).await;
        let pages: Vec<_> = outcome.pages.iter().map(|p| p.page).collect();
        assert_eq!(pages, vec![Some(1), Some(2), Some(3)]);
        assert_eq!(outcome.pages[1].outcome.attempts(), 3);
        assert_eq!(client.calls_for("laptop", Some(2)), 3);
    }
}
