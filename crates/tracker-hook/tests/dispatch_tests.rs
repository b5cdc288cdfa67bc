//! Integration tests for push dispatching.
//!
//! The tracker, chat channel and shortener are in-process fakes so the
//! tests can assert on exactly which outbound calls a push produces.

mod common;

use std::sync::Arc;

use common::{
    harness, push, tracked_registry, FailingChannel, FakeShortener, RecordingTracker, TrackerCall,
    REPO_URL,
};
use notify::Notifier;
use tracker_hook::{AnnotationParser, ProjectRegistry, PushDispatcher, TrackerSkip};

#[tokio::test]
async fn test_untracked_repository_only_announces() {
    let h = harness(ProjectRegistry::default(), RecordingTracker::default());
    let event = push(
        "refs/heads/master",
        &[
            ("a1", "First [Story1]"),
            ("b2", "Second"),
            ("c3", "Third [Story3 state:finished]"),
        ],
    );

    let report = h.dispatcher.dispatch(&event).await;

    assert_eq!(h.chat.lines().len(), 3);
    assert!(h.tracker.calls().is_empty());
    assert_eq!(report.matches, 0);
    assert_eq!(report.announced, 3);
    assert_eq!(report.tracker_skipped, Some(TrackerSkip::UntrackedRepository));
}

#[tokio::test]
async fn test_announcements_in_commit_order() {
    let h = harness(ProjectRegistry::default(), RecordingTracker::default());
    let event = push(
        "refs/heads/master",
        &[("a1", "First"), ("b2", "Second"), ("c3", "Third")],
    );

    h.dispatcher.dispatch(&event).await;

    assert_eq!(
        h.chat.lines(),
        vec![
            "site First (Ada) http://sho.rt/a1",
            "site Second (Ada) http://sho.rt/b2",
            "site Third (Ada) http://sho.rt/c3",
        ]
    );
}

#[tokio::test]
async fn test_two_tags_one_with_state() {
    let h = harness(tracked_registry(None), RecordingTracker::default());
    let event = push(
        "refs/heads/master",
        &[("a1", "Login flow [Story1] and [Story2 state: started]")],
    );

    let report = h.dispatcher.dispatch(&event).await;

    let body = format!("Commit: Login flow [Story1] and [Story2 state: started] (Ada) - {REPO_URL}/commit/a1");
    assert_eq!(
        h.tracker.calls(),
        vec![
            TrackerCall::Comment {
                project_id: "4242".to_string(),
                issue_id: "1".to_string(),
                body: body.clone(),
            },
            TrackerCall::Comment {
                project_id: "4242".to_string(),
                issue_id: "2".to_string(),
                body,
            },
            TrackerCall::Status {
                project_id: "4242".to_string(),
                issue_id: "2".to_string(),
                state: "started".to_string(),
            },
        ]
    );
    assert_eq!(report.matches, 2);
    assert_eq!(report.comments_posted, 2);
    assert_eq!(report.status_updates, 1);
    assert_eq!(report.tracker_skipped, None);
}

#[tokio::test]
async fn test_tags_across_commits_are_counted() {
    let h = harness(tracked_registry(None), RecordingTracker::default());
    let event = push(
        "refs/heads/master",
        &[
            ("a1", "[Story10 state:finished]"),
            ("b2", "no tags here"),
            ("c3", "[Story11] [Story12]"),
        ],
    );

    let report = h.dispatcher.dispatch(&event).await;

    assert_eq!(report.matches, 3);
    assert_eq!(h.tracker.comment_count(), 3);
    assert_eq!(h.tracker.status_count(), 1);
}

#[tokio::test]
async fn test_ref_mismatch_skips_tracker_but_announces() {
    let h = harness(
        tracked_registry(Some("refs/heads/master")),
        RecordingTracker::default(),
    );
    let event = push(
        "refs/heads/feature",
        &[("a1", "[Story1 state:finished]"), ("b2", "[Story2]")],
    );

    let report = h.dispatcher.dispatch(&event).await;

    assert_eq!(h.chat.lines().len(), 2);
    assert!(h.tracker.calls().is_empty());
    assert_eq!(report.matches, 0);
    assert_eq!(report.tracker_skipped, Some(TrackerSkip::RefFiltered));
}

#[tokio::test]
async fn test_matching_ref_reaches_tracker() {
    let h = harness(
        tracked_registry(Some("refs/heads/master")),
        RecordingTracker::default(),
    );
    let event = push("refs/heads/master", &[("a1", "[Story1 state:finished]")]);

    let report = h.dispatcher.dispatch(&event).await;

    assert_eq!(report.matches, 1);
    assert_eq!(h.tracker.comment_count(), 1);
    assert_eq!(h.tracker.status_count(), 1);
}

#[tokio::test]
async fn test_shortener_failure_falls_back_to_full_url() {
    let h = harness(ProjectRegistry::default(), RecordingTracker::default());
    let event = push(
        "refs/heads/master",
        &[("unshortenable", "First"), ("b2", "Second")],
    );

    let report = h.dispatcher.dispatch(&event).await;

    assert_eq!(
        h.chat.lines(),
        vec![
            format!("site First (Ada) {REPO_URL}/commit/unshortenable"),
            "site Second (Ada) http://sho.rt/b2".to_string(),
        ]
    );
    assert_eq!(report.announced, 2);
}

#[tokio::test]
async fn test_comment_failure_does_not_stop_status_or_later_tags() {
    let h = harness(tracked_registry(None), RecordingTracker::failing_comments());
    let event = push(
        "refs/heads/master",
        &[("a1", "[Story1 state:finished]"), ("b2", "[Story2]")],
    );

    let report = h.dispatcher.dispatch(&event).await;

    assert_eq!(h.tracker.comment_count(), 2);
    assert_eq!(h.tracker.status_count(), 1);
    assert_eq!(report.matches, 2);
    assert_eq!(report.comments_posted, 0);
    assert_eq!(report.status_updates, 1);
    assert_eq!(report.tracker_failures, 2);
}

#[tokio::test]
async fn test_announce_failure_is_isolated() {
    let tracker = Arc::new(RecordingTracker::default());
    let dispatcher = PushDispatcher::new(
        Arc::new(tracked_registry(None)),
        Arc::new(Notifier::with_channels(vec![Arc::new(FailingChannel)])),
        tracker.clone(),
        Arc::new(FakeShortener),
    );
    let event = push(
        "refs/heads/master",
        &[("a1", "[Story1]"), ("b2", "[Story2]")],
    );

    let report = dispatcher.dispatch(&event).await;

    assert_eq!(report.announced, 0);
    assert_eq!(report.announce_failures, 2);
    assert_eq!(report.matches, 2);
    assert_eq!(tracker.comment_count(), 2);
}

#[tokio::test]
async fn test_replaying_a_push_repeats_calls() {
    let h = harness(tracked_registry(None), RecordingTracker::default());
    let event = push("refs/heads/master", &[("a1", "[Story7 state:delivered]")]);

    h.dispatcher.dispatch(&event).await;
    h.dispatcher.dispatch(&event).await;

    assert_eq!(h.tracker.comment_count(), 2);
    assert_eq!(h.tracker.status_count(), 2);
    assert_eq!(h.chat.lines().len(), 2);
}

#[tokio::test]
async fn test_empty_push() {
    let h = harness(tracked_registry(None), RecordingTracker::default());
    let report = h.dispatcher.dispatch(&push("refs/heads/master", &[])).await;

    assert_eq!(report, tracker_hook::DispatchReport::default());
    assert!(h.chat.lines().is_empty());
}

#[tokio::test]
async fn test_custom_keyword() {
    let tracker = Arc::new(RecordingTracker::default());
    let dispatcher = PushDispatcher::new(
        Arc::new(tracked_registry(None)),
        Arc::new(Notifier::disabled()),
        tracker.clone(),
        Arc::new(FakeShortener),
    )
    .with_parser(AnnotationParser::new("Bug"));
    let event = push("refs/heads/master", &[("a1", "[Bug5 state:fixed] [Story6]")]);

    let report = dispatcher.dispatch(&event).await;

    assert_eq!(report.matches, 1);
    assert_eq!(
        tracker.calls()[1],
        TrackerCall::Status {
            project_id: "4242".to_string(),
            issue_id: "5".to_string(),
            state: "fixed".to_string(),
        }
    );
}
