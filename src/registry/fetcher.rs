//! HTTP transport used by the registry client

#[cfg(test)]
use mockall::automock;

use crate::config::USER_AGENT;
use crate::registry::error::FetchError;

/// Raw response of a registry GET request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Reason phrase of the status, e.g. "Not Found"
    pub reason: String,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, reason: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            reason: reason.into(),
            body: body.into(),
        }
    }
}

/// Trait for issuing GET requests against the registry
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url`, returning the response whatever its status.
    ///
    /// # Returns
    /// * `Ok(HttpResponse)` - The server answered (any status code)
    /// * `Err(FetchError)` - The request could not be completed
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError>;
}

/// Fetcher backed by a shared `reqwest::Client`
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        let reason = status.canonical_reason().unwrap_or_default().to_string();
        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse {
            status: status.as_u16(),
            reason,
            body,
        })
    }
}
