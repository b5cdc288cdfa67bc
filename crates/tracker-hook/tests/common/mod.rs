//! In-process fakes shared by the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use notify::{ChannelError, Notifier, NotifyChannel};
use tracker_hook::shortener::ShortenError;
use tracker_hook::tracker::TrackerError;
use tracker_hook::{
    ApiToken, ProjectRegistry, PushDispatcher, PushEvent, TrackedProject, TrackerClient,
    TrackerCredentials, UrlShortener,
};

pub const REPO_URL: &str = "https://github.com/sunlightlabs/site";

// =============================================================================
// Tracker
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerCall {
    Comment {
        project_id: String,
        issue_id: String,
        body: String,
    },
    Status {
        project_id: String,
        issue_id: String,
        state: String,
    },
}

/// Records every call; optionally fails comment calls.
#[derive(Default)]
pub struct RecordingTracker {
    pub calls: Mutex<Vec<TrackerCall>>,
    pub fail_comments: bool,
}

impl RecordingTracker {
    pub fn failing_comments() -> Self {
        Self {
            fail_comments: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<TrackerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn comment_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, TrackerCall::Comment { .. }))
            .count()
    }

    pub fn status_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, TrackerCall::Status { .. }))
            .count()
    }
}

#[async_trait]
impl TrackerClient for RecordingTracker {
    async fn post_comment(
        &self,
        credentials: &TrackerCredentials,
        issue_id: &str,
        body: &str,
    ) -> Result<(), TrackerError> {
        self.calls.lock().unwrap().push(TrackerCall::Comment {
            project_id: credentials.project_id.clone(),
            issue_id: issue_id.to_string(),
            body: body.to_string(),
        });
        if self.fail_comments {
            return Err(TrackerError::Status {
                status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                body: "tracker down".to_string(),
            });
        }
        Ok(())
    }

    async fn set_status(
        &self,
        credentials: &TrackerCredentials,
        issue_id: &str,
        state: &str,
    ) -> Result<(), TrackerError> {
        self.calls.lock().unwrap().push(TrackerCall::Status {
            project_id: credentials.project_id.clone(),
            issue_id: issue_id.to_string(),
            state: state.to_string(),
        });
        Ok(())
    }
}

// =============================================================================
// Chat
// =============================================================================

#[derive(Default)]
pub struct RecordingChannel {
    pub lines: Mutex<Vec<String>>,
}

impl RecordingChannel {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotifyChannel for RecordingChannel {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn enabled(&self) -> bool {
        true
    }

    async fn send(&self, text: &str) -> Result<(), ChannelError> {
        self.lines.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

pub struct FailingChannel;

#[async_trait]
impl NotifyChannel for FailingChannel {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn enabled(&self) -> bool {
        true
    }

    async fn send(&self, _text: &str) -> Result<(), ChannelError> {
        Err(ChannelError::NotConnected("irc.example.org:6667".to_string()))
    }
}

// =============================================================================
// Shortener
// =============================================================================

/// Shortens to `http://sho.rt/<last path segment>`, failing for URLs
/// containing `unshortenable`.
pub struct FakeShortener;

#[async_trait]
impl UrlShortener for FakeShortener {
    async fn shorten(&self, url: &str) -> Result<String, ShortenError> {
        if url.contains("unshortenable") {
            return Err(ShortenError::Status {
                status: reqwest::StatusCode::TOO_MANY_REQUESTS,
                body: "RATE_LIMIT_EXCEEDED".to_string(),
            });
        }
        let id = url.rsplit('/').next().unwrap_or_default();
        Ok(format!("http://sho.rt/{id}"))
    }
}

// =============================================================================
// Builders
// =============================================================================

pub fn project(ref_filter: Option<&str>) -> TrackedProject {
    TrackedProject {
        credentials: TrackerCredentials {
            api_token: ApiToken::new("secret-token"),
            project_id: "4242".to_string(),
        },
        ref_filter: ref_filter.map(str::to_string),
    }
}

pub fn tracked_registry(ref_filter: Option<&str>) -> ProjectRegistry {
    ProjectRegistry::default().with_project(REPO_URL, project(ref_filter))
}

pub struct Harness {
    pub dispatcher: PushDispatcher,
    pub tracker: Arc<RecordingTracker>,
    pub chat: Arc<RecordingChannel>,
}

pub fn harness(registry: ProjectRegistry, tracker: RecordingTracker) -> Harness {
    let tracker = Arc::new(tracker);
    let chat = Arc::new(RecordingChannel::default());
    let dispatcher = PushDispatcher::new(
        Arc::new(registry),
        Arc::new(Notifier::with_channels(vec![
            chat.clone() as Arc<dyn NotifyChannel>
        ])),
        tracker.clone(),
        Arc::new(FakeShortener),
    );
    Harness {
        dispatcher,
        tracker,
        chat,
    }
}

/// Push JSON for `REPO_URL` with `(sha, message)` commits by Ada.
pub fn push_json(ref_name: &str, commits: &[(&str, &str)]) -> String {
    let commits: Vec<_> = commits
        .iter()
        .map(|(sha, message)| {
            serde_json::json!({
                "id": sha,
                "message": message,
                "url": format!("{REPO_URL}/commit/{sha}"),
                "author": { "name": "Ada", "email": "ada@example.org" }
            })
        })
        .collect();

    serde_json::json!({
        "ref": ref_name,
        "repository": { "name": "site", "url": REPO_URL },
        "commits": commits
    })
    .to_string()
}

pub fn push(ref_name: &str, commits: &[(&str, &str)]) -> PushEvent {
    PushEvent::from_json(push_json(ref_name, commits).as_bytes()).unwrap()
}
