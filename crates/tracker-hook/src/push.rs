//! GitHub push event payload.

use serde::Deserialize;
use thiserror::Error;

/// Errors decoding a webhook body into a [`PushEvent`].
#[derive(Debug, Error)]
pub enum PayloadError {
    /// Body was not a valid push event document
    #[error("Invalid push payload: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Form body without a `payload` field
    #[error("Form body has no payload field")]
    MissingPayload,
}

/// GitHub push event (only the fields the hook uses).
#[derive(Debug, Clone, Deserialize)]
pub struct PushEvent {
    /// Pushed ref, e.g. `refs/heads/main`
    #[serde(rename = "ref", default)]
    pub ref_name: String,
    /// Repository the push went to
    pub repository: Repository,
    /// Pushed commits, oldest first
    #[serde(default)]
    pub commits: Vec<Commit>,
}

/// Repository section of a push event.
#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    /// Short repository name, used in announcements
    pub name: String,
    /// Browse URL, used to look up the tracked project
    pub url: String,
}

/// One pushed commit.
#[derive(Debug, Clone, Deserialize)]
pub struct Commit {
    /// Commit SHA
    #[serde(default)]
    pub id: Option<String>,
    /// Full commit message
    pub message: String,
    /// Browse URL of the commit
    pub url: String,
    /// Commit author
    pub author: CommitAuthor,
}

/// Commit author.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitAuthor {
    /// Display name
    pub name: String,
    /// Email address
    #[serde(default)]
    pub email: Option<String>,
}

impl PushEvent {
    /// Decode a JSON body.
    pub fn from_json(body: &[u8]) -> Result<Self, PayloadError> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Decode the `payload` field of a classic form-encoded hook delivery.
    pub fn from_form_payload(payload: Option<&str>) -> Result<Self, PayloadError> {
        let payload = payload.ok_or(PayloadError::MissingPayload)?;
        Ok(serde_json::from_str(payload)?)
    }
}

impl Commit {
    /// Comment body posted to the tracker for this commit.
    #[must_use]
    pub fn tracker_message(&self) -> String {
        format!(
            "Commit: {} ({}) - {}",
            self.message, self.author.name, self.url
        )
    }
}
