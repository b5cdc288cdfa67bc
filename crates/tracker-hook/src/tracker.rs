//! Issue tracker client.
//!
//! The dispatcher talks to the tracker through [`TrackerClient`]; the
//! production implementation is [`PivotalTrackerClient`], which speaks the
//! Pivotal Tracker v1 XML API.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, instrument};

/// Public Pivotal Tracker endpoint.
pub const PIVOTAL_TRACKER_URL: &str = "http://www.pivotaltracker.com";

/// Header carrying the per-project API token.
const TOKEN_HEADER: &str = "X-TrackerToken";

/// Tracker API token. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    /// Wrap a raw token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token, for the request header only.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(***)")
    }
}

/// Credentials for one tracker project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerCredentials {
    /// API token
    pub api_token: ApiToken,
    /// Tracker project ID
    pub project_id: String,
}

/// Errors from tracker calls.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Transport failure or timeout
    #[error("Tracker request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Tracker answered with a non-success status
    #[error("Tracker returned {status}: {body}")]
    Status {
        /// HTTP status
        status: StatusCode,
        /// Response body, for diagnostics
        body: String,
    },
}

/// Operations the dispatcher needs from the issue tracker.
#[async_trait]
pub trait TrackerClient: Send + Sync {
    /// Add a comment to a story.
    async fn post_comment(
        &self,
        credentials: &TrackerCredentials,
        issue_id: &str,
        body: &str,
    ) -> Result<(), TrackerError>;

    /// Move a story to a new state.
    async fn set_status(
        &self,
        credentials: &TrackerCredentials,
        issue_id: &str,
        state: &str,
    ) -> Result<(), TrackerError>;
}

/// Pivotal Tracker v1 XML API client.
#[derive(Debug, Clone)]
pub struct PivotalTrackerClient {
    client: reqwest::Client,
    base_url: String,
}

impl PivotalTrackerClient {
    /// Create a client whose requests give up after `timeout`.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be constructed
    pub fn new(timeout: Duration) -> Result<Self, TrackerError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: PIVOTAL_TRACKER_URL.to_string(),
        })
    }

    /// Point the client at a different server (self-hosted or tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn story_url(&self, project_id: &str, issue_id: &str) -> String {
        format!(
            "{}/services/v1/projects/{project_id}/stories/{issue_id}",
            self.base_url
        )
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        credentials: &TrackerCredentials,
        xml: String,
    ) -> Result<(), TrackerError> {
        let response = request
            .header(TOKEN_HEADER, credentials.api_token.expose())
            .header(CONTENT_TYPE, "application/xml")
            .body(xml)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(TrackerError::Status { status, body })
    }
}

#[async_trait]
impl TrackerClient for PivotalTrackerClient {
    #[instrument(skip(self, credentials, body), fields(project_id = %credentials.project_id))]
    async fn post_comment(
        &self,
        credentials: &TrackerCredentials,
        issue_id: &str,
        body: &str,
    ) -> Result<(), TrackerError> {
        let url = format!("{}/notes", self.story_url(&credentials.project_id, issue_id));
        let xml = format!("<note><text>{}</text></note>", xml_escape(body));

        debug!(url = %url, "Posting story comment");
        self.send(self.client.post(&url), credentials, xml).await
    }

    #[instrument(skip(self, credentials), fields(project_id = %credentials.project_id))]
    async fn set_status(
        &self,
        credentials: &TrackerCredentials,
        issue_id: &str,
        state: &str,
    ) -> Result<(), TrackerError> {
        let url = self.story_url(&credentials.project_id, issue_id);
        let xml = format!(
            "<story><current_state>{}</current_state></story>",
            xml_escape(state)
        );

        debug!(url = %url, "Updating story state");
        self.send(self.client.put(&url), credentials, xml).await
    }
}

/// Escape text for inclusion in an XML element.
fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
