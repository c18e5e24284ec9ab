//! HTTP client for the local extraction API
//!
//! [`FetchClient`] is the seam between the retry layer and the network. The
//! production implementation, [`ApiHttpClient`], performs exactly one GET per
//! call and turns every outcome into either a decoded JSON payload or a
//! [`FetchFailure`]. It does not retry and does not log outcomes; that is the
//! retry policy's job.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::domain::outcome::{FetchFailure, TransportErrorKind};
use crate::domain::schema::Endpoint;
use crate::infrastructure::config::ApiConfig;

#[derive(Debug, thiserror::Error)]
pub enum HttpClientError {
    #[error("invalid API base URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Base URL and root domain every call of a run is scoped to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiTarget {
    pub base_url: Url,
    pub root_domain: String,
}

impl ApiTarget {
    pub fn new(base_url: &str, root_domain: impl Into<String>) -> Result<Self, HttpClientError> {
        let base_url = Url::parse(base_url).map_err(|source| HttpClientError::InvalidBaseUrl {
            url: base_url.to_string(),
            source,
        })?;
        Ok(Self {
            base_url,
            root_domain: root_domain.into(),
        })
    }
}

/// One API call: endpoint, normalized key and optional page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub endpoint: Endpoint,
    pub key: String,
    pub page: Option<u32>,
}

impl ApiRequest {
    pub fn new(endpoint: Endpoint, key: impl Into<String>, page: Option<u32>) -> Self {
        Self {
            endpoint,
            key: key.into(),
            page,
        }
    }

    /// Full request URL under `target`
    pub fn url(&self, target: &ApiTarget) -> Result<Url, url::ParseError> {
        let mut url = target.base_url.join(self.endpoint.path)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("rootdomain", &target.root_domain);
            query.append_pair(self.endpoint.key_param, &self.key);
            if self.endpoint.paged {
                query.append_pair("page", &self.page.unwrap_or(1).to_string());
            }
        }
        Ok(url)
    }
}

/// Single-attempt fetch of one API payload
#[async_trait]
pub trait FetchClient: Send + Sync {
    async fn fetch(&self, request: &ApiRequest, timeout: Duration) -> Result<Value, FetchFailure>;
}

/// `reqwest` implementation of [`FetchClient`]
#[derive(Clone)]
pub struct ApiHttpClient {
    client: Client,
    target: ApiTarget,
}

impl ApiHttpClient {
    pub fn new(target: ApiTarget, user_agent: &str) -> Result<Self, HttpClientError> {
        let client = ClientBuilder::new()
            .user_agent(user_agent)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self { client, target })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, HttpClientError> {
        let target = ApiTarget::new(&config.base_url, config.root_domain.clone())?;
        Self::new(target, &config.user_agent)
    }

    pub const fn target(&self) -> &ApiTarget {
        &self.target
    }
}

fn transport_kind(error: &reqwest::Error) -> TransportErrorKind {
    if error.is_timeout() {
        TransportErrorKind::Timeout
    } else if error.is_connect() {
        TransportErrorKind::Connect
    } else if error.is_decode() || error.is_body() {
        TransportErrorKind::Decode
    } else {
        TransportErrorKind::Other
    }
}

fn transport_failure(error: &reqwest::Error) -> FetchFailure {
    FetchFailure::transport(transport_kind(error), error.to_string())
}

#[async_trait]
impl FetchClient for ApiHttpClient {
    async fn fetch(&self, request: &ApiRequest, timeout: Duration) -> Result<Value, FetchFailure> {
        let url = request
            .url(&self.target)
            .map_err(|e| FetchFailure::transport(TransportErrorKind::Internal, e.to_string()))?;
        debug!("🌐 GET {} (timeout {:?})", url, timeout);

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport_failure(&e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| transport_failure(&e))?;

        if status != StatusCode::OK {
            return Err(FetchFailure::status(status.as_u16(), body));
        }

        serde_json::from_str(&body).map_err(|e| {
            FetchFailure::transport(
                TransportErrorKind::Decode,
                format!("invalid JSON payload: {e}"),
            )
        })
    }
}
