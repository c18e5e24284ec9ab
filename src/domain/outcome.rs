//! Fetch outcomes
//!
//! Past the fetch/retry boundary failures are data: every downstream stage
//! works on these values and never on raised errors.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::task::Task;

/// Status text written for failures that never produced an HTTP status
pub const TRANSPORT_FAILURE_STATUS: &str = "Request Failed";

/// Kind of transport-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    /// 200 response whose body was not valid JSON
    Decode,
    /// Task execution panicked inside the worker pool
    Internal,
    Other,
}

/// Why a single attempt (or a whole retry sequence) did not succeed
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FetchFailure {
    #[error("HTTP error {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Transport error ({kind:?}): {message}")]
    Transport {
        kind: TransportErrorKind,
        message: String,
    },
}

impl FetchFailure {
    pub fn status(code: u16, body: impl Into<String>) -> Self {
        Self::Status {
            code,
            body: body.into(),
        }
    }

    pub fn transport(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self::Transport {
            kind,
            message: message.into(),
        }
    }

    /// Observed status code, if the server answered at all
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { code, .. } => Some(*code),
            Self::Transport { .. } => None,
        }
    }

    /// Whether another attempt may help; a 200 with an undecodable body will not
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::Transport {
                kind: TransportErrorKind::Decode,
                ..
            }
        )
    }

    /// Error text suitable for the report: the response body or the transport message
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Status { body, .. } => body,
            Self::Transport { message, .. } => message,
        }
    }
}

/// Terminal result of one retry sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FetchOutcome {
    Success { payload: Value, attempts: u32 },
    Failure { failure: FetchFailure, attempts: u32 },
}

impl FetchOutcome {
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Success { attempts, .. } | Self::Failure { attempts, .. } => *attempts,
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Outcome of one requested page; `page` is `None` for unpaginated domains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageOutcome {
    pub page: Option<u32>,
    pub outcome: FetchOutcome,
}

/// Everything one task produced, handed to the normalizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub task: Task,
    pub pages: Vec<PageOutcome>,
}

impl TaskOutcome {
    #[must_use]
    pub const fn new(task: Task, pages: Vec<PageOutcome>) -> Self {
        Self { task, pages }
    }

    /// Outcome for a task whose execution never completed normally
    #[must_use]
    pub fn aborted(task: Task, reason: impl Into<String>) -> Self {
        let page = task.domain.is_paginated().then_some(1);
        Self {
            task,
            pages: vec![PageOutcome {
                page,
                outcome: FetchOutcome::Failure {
                    failure: FetchFailure::transport(TransportErrorKind::Internal, reason),
                    attempts: 0,
                },
            }],
        }
    }

    #[must_use]
    pub fn has_failure(&self) -> bool {
        self.pages.iter().any(|p| !p.outcome.is_success())
    }
}
