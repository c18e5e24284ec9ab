//! Page walking for paginated domains

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use sku_report_lib::crawling::{TaskRunner, TaskScheduler};
use sku_report_lib::application::RecordNormalizer;
use sku_report_lib::domain::outcome::FetchFailure;
use sku_report_lib::domain::schemas::{ReviewSchema, SearchSchema};
use sku_report_lib::domain::task::{build_tasks, Domain, RetrievalParams};
use sku_report_lib::test_utils::ScriptedClient;
use sku_report_lib::KeyInput;

fn params(max_pages: u32) -> RetrievalParams {
    RetrievalParams {
        base_timeout: Duration::from_millis(10),
        max_attempts: 3,
        max_pages,
    }
}

#[tokio::test]
async fn empty_page_two_stops_the_walk() {
    let client = Arc::new(
        ScriptedClient::new()
            .always("hp-laptop-17", Some(1), Ok(json!({"reviewItems": [{"reviewId": "R1"}, {"reviewId": "R2"}]})))
            .always("hp-laptop-17", Some(2), Ok(json!({"reviewItems": []})))
            .always("hp-laptop-17", Some(3), Ok(json!({"reviewItems": [{"reviewId": "R3"}]}))),
    );
    let schema = Arc::new(ReviewSchema);
    let tasks = build_tasks(Domain::Review, &[KeyInput::from("HP-LAPTOP-17")], params(4));

    let outcomes = TaskScheduler::new(2)
        .run(tasks, Arc::new(TaskRunner::new(client.clone(), schema.clone())))
        .await;

    assert_eq!(client.pages_requested("hp-laptop-17"), vec![Some(1), Some(2)]);
    assert_eq!(outcomes.len(), 1);
    assert!(!outcomes[0].has_failure());

    let records = RecordNormalizer::new(schema, "reviews").normalize_all(&outcomes);
    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn every_key_walks_its_own_pages() {
    let client = Arc::new(
        ScriptedClient::new()
            .always("laptop", Some(1), Ok(json!({"searchItems": [{"sku": "S1"}]})))
            .always("laptop", Some(2), Ok(json!({"searchItems": [{"sku": "S2"}]})))
            .always("mouse", Some(1), Err(FetchFailure::status(502, "bad gateway")))
            .always("mouse", Some(2), Ok(json!({"searchItems": []}))),
    );
    let tasks = build_tasks(
        Domain::Search,
        &[KeyInput::from("Laptop"), KeyInput::from("mouse")],
        params(2),
    );

    let outcomes = TaskScheduler::new(4)
        .run(tasks, Arc::new(TaskRunner::new(client.clone(), Arc::new(SearchSchema))))
        .await;
    assert_eq!(outcomes.len(), 2);

    assert_eq!(client.pages_requested("laptop"), vec![Some(1), Some(2)]);
    assert_eq!(client.pages_requested("mouse"), vec![Some(1), Some(2)]);
    assert_eq!(client.calls_for("mouse", Some(1)), 3);

    let mouse = outcomes.iter().find(|o| o.task.key == "mouse").unwrap();
    assert_eq!(mouse.pages.len(), 1);
    assert!(mouse.has_failure());
}
