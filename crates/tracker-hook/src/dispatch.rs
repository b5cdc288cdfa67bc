//! Push dispatching.
//!
//! For each push every commit is announced to chat. Then, if the repository
//! is tracked and the ref passes the project's filter, every annotation tag in
//! every commit becomes a tracker comment plus an optional state change.
//!
//! All outbound calls are best effort: failures are logged and counted, and
//! processing moves on. Nothing is deduplicated, so replaying a push repeats
//! every call.

use std::sync::Arc;

use notify::Notifier;
use tracing::{debug, info, instrument, warn};

use crate::annotations::AnnotationParser;
use crate::config::ProjectRegistry;
use crate::push::{Commit, PushEvent};
use crate::shortener::UrlShortener;
use crate::tracker::{TrackerClient, TrackerCredentials};

/// Why the tracker phase did not run for a push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerSkip {
    /// Repository has no tracked project.
    UntrackedRepository,
    /// Project only tracks a different ref.
    RefFiltered,
}

/// Outcome of one dispatch pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Commits announced successfully.
    pub announced: usize,
    /// Announcements that failed.
    pub announce_failures: usize,
    /// Annotation tags matched across all commits.
    pub matches: usize,
    /// Tracker comments posted successfully.
    pub comments_posted: usize,
    /// Story state changes applied successfully.
    pub status_updates: usize,
    /// Tracker calls that failed.
    pub tracker_failures: usize,
    /// Set when the tracker phase was skipped.
    pub tracker_skipped: Option<TrackerSkip>,
}

/// Processes push events against chat and the tracker.
pub struct PushDispatcher {
    registry: Arc<ProjectRegistry>,
    notifier: Arc<Notifier>,
    tracker: Arc<dyn TrackerClient>,
    shortener: Arc<dyn UrlShortener>,
    parser: AnnotationParser,
}

impl PushDispatcher {
    /// Create a dispatcher using the default `Story` annotation keyword.
    #[must_use]
    pub fn new(
        registry: Arc<ProjectRegistry>,
        notifier: Arc<Notifier>,
        tracker: Arc<dyn TrackerClient>,
        shortener: Arc<dyn UrlShortener>,
    ) -> Self {
        Self {
            registry,
            notifier,
            tracker,
            shortener,
            parser: AnnotationParser::default(),
        }
    }

    /// Use a different annotation parser.
    #[must_use]
    pub fn with_parser(mut self, parser: AnnotationParser) -> Self {
        self.parser = parser;
        self
    }

    /// Process one push and report what happened.
    #[instrument(
        skip_all,
        fields(
            repository = %push.repository.name,
            git_ref = %push.ref_name,
            commits = push.commits.len()
        )
    )]
    pub async fn dispatch(&self, push: &PushEvent) -> DispatchReport {
        let mut report = DispatchReport::default();
        let project = self.registry.resolve(&push.repository.url);

        for commit in &push.commits {
            self.announce_commit(&push.repository.name, commit, &mut report)
                .await;
        }

        match project {
            None => {
                debug!(url = %push.repository.url, "Repository not tracked, skipping tracker");
                report.tracker_skipped = Some(TrackerSkip::UntrackedRepository);
            }
            Some(project) if !project.tracks_ref(&push.ref_name) => {
                info!(
                    git_ref = %push.ref_name,
                    "Skipping commits for non-tracked ref"
                );
                report.tracker_skipped = Some(TrackerSkip::RefFiltered);
            }
            Some(project) => {
                for commit in &push.commits {
                    self.process_tracker_commit(&project.credentials, commit, &mut report)
                        .await;
                }
            }
        }

        info!(
            announced = report.announced,
            matches = report.matches,
            tracker_failures = report.tracker_failures,
            "Push processed"
        );

        report
    }

    async fn announce_commit(
        &self,
        repository_name: &str,
        commit: &Commit,
        report: &mut DispatchReport,
    ) {
        let url = match self.shortener.shorten(&commit.url).await {
            Ok(short) => short,
            Err(e) => {
                warn!(url = %commit.url, error = %e, "Failed to shorten commit URL, using full URL");
                commit.url.clone()
            }
        };

        let text = announcement(repository_name, commit, &url);
        match self.notifier.announce(&text).await {
            Ok(()) => report.announced += 1,
            Err(e) => {
                warn!(commit = ?commit.id, error = %e, "Failed to announce commit");
                report.announce_failures += 1;
            }
        }
    }

    async fn process_tracker_commit(
        &self,
        credentials: &TrackerCredentials,
        commit: &Commit,
        report: &mut DispatchReport,
    ) {
        let message = commit.tracker_message();
        let tags: Vec<_> = self.parser.parse(&message).collect();

        for tag in tags {
            report.matches += 1;

            match self
                .tracker
                .post_comment(credentials, &tag.issue_id, &message)
                .await
            {
                Ok(()) => {
                    debug!(issue_id = %tag.issue_id, "Posted commit comment");
                    report.comments_posted += 1;
                }
                Err(e) => {
                    warn!(issue_id = %tag.issue_id, error = %e, "Failed to post commit comment");
                    report.tracker_failures += 1;
                }
            }

            let Some(state) = tag.state.as_deref() else {
                continue;
            };

            match self
                .tracker
                .set_status(credentials, &tag.issue_id, state)
                .await
            {
                Ok(()) => {
                    debug!(issue_id = %tag.issue_id, state = %state, "Updated story state");
                    report.status_updates += 1;
                }
                Err(e) => {
                    warn!(
                        issue_id = %tag.issue_id,
                        state = %state,
                        error = %e,
                        "Failed to update story state"
                    );
                    report.tracker_failures += 1;
                }
            }
        }
    }
}

/// Chat line announcing `commit`.
#[must_use]
pub fn announcement(repository_name: &str, commit: &Commit, url: &str) -> String {
    format!(
        "{repository_name} {} ({}) {url}",
        commit.message, commit.author.name
    )
}
