//! GitHub push hook that announces commits to IRC and updates tracker stories.
//!
//! This crate provides:
//! - Parsing of `[Story123 state:finished]` annotations in commit messages
//! - A push dispatcher that announces commits and drives tracker calls
//! - Pivotal Tracker and Bitly HTTP clients behind small traits
//! - Project configuration loading
//! - HTTP server for webhook handling (standalone service)

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Many async API methods can fail

pub mod annotations;
pub mod config;
pub mod dispatch;
pub mod push;
pub mod server;
pub mod shortener;
pub mod tracker;

pub use annotations::{parse_annotations, AnnotationParser, AnnotationTag};
pub use config::{Config, ConfigError, ProjectRegistry, TrackedProject};
pub use dispatch::{DispatchReport, PushDispatcher, TrackerSkip};
pub use push::{Commit, CommitAuthor, PushEvent, Repository};
pub use shortener::{BitlyShortener, PassthroughShortener, UrlShortener};
pub use tracker::{ApiToken, PivotalTrackerClient, TrackerClient, TrackerCredentials};
