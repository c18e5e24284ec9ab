//! # Extraction Task Definitions
//!
//! A task is one immutable unit of retrieval work: a domain, a normalized key
//! and the retrieval parameters it runs with. Tasks are built once at batch
//! start and consumed exactly once by the scheduler.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for extraction tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Creates a new unique task ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Record domain served by the extraction API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Product,
    Search,
    Review,
}

impl Domain {
    /// Search and review results are paged; product detail is a single call.
    #[must_use]
    pub const fn is_paginated(self) -> bool {
        matches!(self, Self::Search | Self::Review)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Search => "search",
            Self::Review => "review",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "product" | "pdp" => Ok(Self::Product),
            "search" => Ok(Self::Search),
            "review" | "reviews" => Ok(Self::Review),
            other => Err(format!("unknown domain '{other}' (expected product, search or review)")),
        }
    }
}

/// Raw key as it arrives from the input source, before normalization
#[derive(Debug, Clone, PartialEq)]
pub enum KeyInput {
    Number(f64),
    Text(String),
}

impl KeyInput {
    /// Normalizes the key into the string sent to the API.
    ///
    /// Finite numbers lose their fractional part (`123.0` becomes `"123"`)
    /// at any magnitude, everything else is lower-cased.
    #[must_use]
    pub fn normalize(&self) -> String {
        match self {
            Self::Number(n) if n.is_finite() => {
                // `-0.5` truncates to `-0.0`, which must print as "0"
                let whole = n.trunc() + 0.0;
                format!("{whole:.0}")
            }
            Self::Number(n) => n.to_string().to_lowercase(),
            Self::Text(s) => s.trim().to_lowercase(),
        }
    }
}

impl From<&str> for KeyInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for KeyInput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for KeyInput {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// Retrieval parameters shared by every task of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalParams {
    /// Timeout of the first attempt; attempt n waits n times as long
    pub base_timeout: Duration,
    pub max_attempts: u32,
    /// Pages requested per key for paginated domains
    pub max_pages: u32,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        use crate::infrastructure::config::defaults;
        Self {
            base_timeout: Duration::from_secs(defaults::BASE_TIMEOUT_SECONDS),
            max_attempts: defaults::MAX_ATTEMPTS,
            max_pages: defaults::MAX_PAGES,
        }
    }
}

/// One unit of scheduled retrieval work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub domain: Domain,
    /// Key after normalization; reused unchanged across retries
    pub key: String,
    pub params: RetrievalParams,
}

impl Task {
    #[must_use]
    pub fn new(domain: Domain, key: &KeyInput, params: RetrievalParams) -> Self {
        Self {
            id: TaskId::new(),
            domain,
            key: key.normalize(),
            params,
        }
    }

    /// Pages this task will walk through; a single implicit page for product.
    #[must_use]
    pub fn page_range(&self) -> std::ops::RangeInclusive<u32> {
        if self.domain.is_paginated() {
            1..=self.params.max_pages.max(1)
        } else {
            1..=1
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.domain, self.key)
    }
}

/// Builds one task per input key
#[must_use]
pub fn build_tasks(domain: Domain, keys: &[KeyInput], params: RetrievalParams) -> Vec<Task> {
    keys.iter().map(|key| Task::new(domain, key, params)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(KeyInput::Number(123.0), "123")]
    #[case(KeyInput::Number(4_567_890_123.0), "4567890123")]
    #[case(KeyInput::Number(12.9), "12")]
    #[case(KeyInput::Number(1e20), "100000000000000000000")]
    #[case(KeyInput::Number(-0.5), "0")]
    #[case(KeyInput::Number(-3.7), "-3")]
    #[case(KeyInput::Text("HP-LAPTOP-17-CP3047NR".into()), "hp-laptop-17-cp3047nr")]
    #[case(KeyInput::Text("  Laptop ".into()), "laptop")]
    #[case(KeyInput::Text("123.0".into()), "123.0")]
    fn test_key_normalization(#[case] input: KeyInput, #[case] expected: &str) {
        assert_eq!(input.normalize(), expected);
    }

    #[test]
    fn test_non_finite_number_is_not_truncated() {
        assert_eq!(KeyInput::Number(f64::NAN).normalize(), "nan");
    }

    #[test]
    fn test_task_normalizes_key_once() {
        let task = Task::new(Domain::Product, &KeyInput::Number(42.0), RetrievalParams::default());
        assert_eq!(task.key, "42");
        assert_eq!(task.page_range(), 1..=1);
    }

    #[test]
    fn test_paginated_page_range() {
        let params = RetrievalParams { max_pages: 4, ..RetrievalParams::default() };
        let task = Task::new(Domain::Review, &"sku-1".into(), params);
        assert_eq!(task.page_range(), 1..=4);
    }

    #[test]
    fn test_domain_parsing() {
        assert_eq!("PDP".parse::<Domain>(), Ok(Domain::Product));
        assert_eq!("reviews".parse::<Domain>(), Ok(Domain::Review));
        assert!("catalog".parse::<Domain>().is_err());
    }

    #[test]
    fn test_build_tasks_assigns_unique_ids() {
        let keys = vec![KeyInput::from("a"), KeyInput::from("b")];
        let tasks = build_tasks(Domain::Search, &keys, RetrievalParams::default());
        assert_eq!(tasks.len(), 2);
        assert_ne!(tasks[0].id, tasks[1].id);
    }
}
