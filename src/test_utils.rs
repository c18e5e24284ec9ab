//! Test utilities
//!
//! [`ScriptedClient`] is an in-memory [`FetchClient`] that replays scripted
//! responses per `(key, page)` and records every call, so retry, pagination
//! and end-to-end behaviour can be tested without a running extraction API.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::outcome::FetchFailure;
use crate::infrastructure::http_client::{ApiRequest, FetchClient};

type ScriptKey = (String, Option<u32>);
type Scripted = Result<Value, FetchFailure>;

/// One observed call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub key: String,
    pub page: Option<u32>,
    pub timeout: Duration,
}

/// Replays queued responses; unscripted calls answer `500 unscripted`
#[derive(Debug, Default)]
pub struct ScriptedClient {
    queued: Mutex<HashMap<ScriptKey, VecDeque<Scripted>>>,
    always: Mutex<HashMap<ScriptKey, Scripted>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one response for `(key, page)`; queued responses are used in order
    #[must_use]
    pub fn respond(self, key: &str, page: Option<u32>, response: Scripted) -> Self {
        self.queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry((key.to_string(), page))
            .or_default()
            .push_back(response);
        self
    }

    /// Answer every call for `(key, page)` with `response` once the queue is drained
    #[must_use]
    pub fn always(self, key: &str, page: Option<u32>, response: Scripted) -> Self {
        self.always
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((key.to_string(), page), response);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn calls_for(&self, key: &str, page: Option<u32>) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.key == key && c.page == page)
            .count()
    }

    pub fn timeouts_for(&self, key: &str, page: Option<u32>) -> Vec<Duration> {
        self.calls()
            .into_iter()
            .filter(|c| c.key == key && c.page == page)
            .map(|c| c.timeout)
            .collect()
    }

    /// Distinct pages requested for `key`, in first-request order
    pub fn pages_requested(&self, key: &str) -> Vec<Option<u32>> {
        let mut pages = Vec::new();
        for call in self.calls().into_iter().filter(|c| c.key == key) {
            if !pages.contains(&call.page) {
                pages.push(call.page);
            }
        }
        pages
    }
}

#[async_trait]
impl FetchClient for ScriptedClient {
    async fn fetch(&self, request: &ApiRequest, timeout: Duration) -> Result<Value, FetchFailure> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                key: request.key.clone(),
                page: request.page,
                timeout,
            });

        let script_key = (request.key.clone(), request.page);
        let queued = self
            .queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&script_key)
            .and_then(VecDeque::pop_front);
        if let Some(response) = queued {
            return response;
        }

        self.always
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&script_key)
            .cloned()
            .unwrap_or_else(|| Err(FetchFailure::status(500, "unscripted")))
    }
}
