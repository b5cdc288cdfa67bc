//! URL shortening for commit announcements.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Bitly API endpoint.
pub const BITLY_API_URL: &str = "https://api-ssl.bitly.com";

/// Errors from the shortening service.
#[derive(Debug, Error)]
pub enum ShortenError {
    /// Transport failure or timeout
    #[error("Shortener request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Service answered with a non-success status
    #[error("Shortener returned {status}: {body}")]
    Status {
        /// HTTP status
        status: StatusCode,
        /// Response body, for diagnostics
        body: String,
    },
}

/// Turns long URLs into short ones.
#[async_trait]
pub trait UrlShortener: Send + Sync {
    /// Shorten `url`.
    async fn shorten(&self, url: &str) -> Result<String, ShortenError>;
}

/// Returns URLs unchanged. Used when no shortening service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughShortener;

#[async_trait]
impl UrlShortener for PassthroughShortener {
    async fn shorten(&self, url: &str) -> Result<String, ShortenError> {
        Ok(url.to_string())
    }
}

#[derive(Debug, Serialize)]
struct ShortenRequest<'a> {
    long_url: &'a str,
}

#[derive(Debug, Deserialize)]
struct ShortenResponse {
    link: String,
}

/// Bitly v4 client.
#[derive(Debug, Clone)]
pub struct BitlyShortener {
    client: reqwest::Client,
    access_token: String,
    api_url: String,
}

impl BitlyShortener {
    /// Create a client authenticated with `access_token`.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be constructed
    pub fn new(access_token: &str, timeout: Duration) -> Result<Self, ShortenError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            access_token: access_token.to_string(),
            api_url: BITLY_API_URL.to_string(),
        })
    }

    /// Use a different API host.
    #[must_use]
    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl UrlShortener for BitlyShortener {
    async fn shorten(&self, url: &str) -> Result<String, ShortenError> {
        debug!(url = %url, "Shortening URL");

        let response = self
            .client
            .post(format!("{}/v4/shorten", self.api_url))
            .bearer_auth(&self.access_token)
            .json(&ShortenRequest { long_url: url })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ShortenError::Status { status, body });
        }

        let shortened: ShortenResponse = response.json().await?;
        Ok(shortened.link)
    }
}
