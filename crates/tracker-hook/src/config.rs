//! Configuration for the tracker hook service.
//!
//! Process settings come from environment variables (see [`Config`]). The
//! repository → tracker project mapping is read once from a YAML file into an
//! immutable [`ProjectRegistry`].

use std::collections::{BTreeMap, HashMap};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::IrcConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::annotations::DEFAULT_KEYWORD;
use crate::shortener::BITLY_API_URL;
use crate::tracker::{ApiToken, TrackerCredentials, PIVOTAL_TRACKER_URL};

/// Errors loading configuration. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Project file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Project file is not valid YAML of the expected shape
    #[error("Failed to parse project configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A project entry lacks a required key
    #[error("Project '{project}' is missing required setting '{key}'")]
    MissingSetting {
        /// Entry name in the file
        project: String,
        /// Missing key
        key: &'static str,
    },
}

/// Tracker hook service configuration.
#[derive(Clone)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,
    /// Path of the YAML project file.
    pub projects_path: PathBuf,
    /// Tracker API base URL.
    pub tracker_api_url: String,
    /// Entity keyword recognised in commit annotations.
    pub annotation_keyword: String,
    /// Timeout applied to every outbound HTTP call.
    pub http_timeout: Duration,
    /// Bitly access token; URLs are announced unshortened without it.
    pub bitly_access_token: Option<String>,
    /// Bitly API base URL.
    pub bitly_api_url: String,
    /// IRC session settings; `None` disables announcements.
    pub irc: Option<IrcConfig>,
}

impl Default for Config {
    fn default() -> Self {
        let http_timeout = Duration::from_secs(
            env::var("HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
        );

        let irc_enabled = env::var("IRC_ENABLED")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(true);

        let irc = irc_enabled.then(|| {
            let mut irc = IrcConfig::new(
                &env::var("IRC_SERVER").unwrap_or_else(|_| "irc.freenode.net".to_string()),
                env::var("IRC_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(notify::channels::irc::DEFAULT_PORT),
                &env::var("IRC_NICK").unwrap_or_else(|_| "SunlightBot".to_string()),
                &env::var("IRC_CHANNEL").unwrap_or_else(|_| "#sunlightlabs".to_string()),
            );
            irc.connect_timeout = http_timeout;
            irc
        });

        Self {
            port: env::var("TRACKER_HOOK_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(4567),
            projects_path: env::var("TRACKER_HOOK_PROJECTS")
                .map_or_else(|_| PathBuf::from("config.yml"), PathBuf::from),
            tracker_api_url: env::var("TRACKER_API_URL")
                .unwrap_or_else(|_| PIVOTAL_TRACKER_URL.to_string()),
            annotation_keyword: env::var("TRACKER_ANNOTATION_KEYWORD")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_KEYWORD.to_string()),
            http_timeout,
            bitly_access_token: env::var("BITLY_ACCESS_TOKEN")
                .ok()
                .filter(|s| !s.is_empty()),
            bitly_api_url: env::var("BITLY_API_URL")
                .unwrap_or_else(|_| BITLY_API_URL.to_string()),
            irc,
        }
    }
}

/// A repository tracked in the issue tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedProject {
    /// Tracker credentials for the project.
    pub credentials: TrackerCredentials,
    /// Only pushes to this ref reach the tracker, when set.
    pub ref_filter: Option<String>,
}

impl TrackedProject {
    /// Whether pushes to `ref_name` should reach the tracker.
    #[must_use]
    pub fn tracks_ref(&self, ref_name: &str) -> bool {
        self.ref_filter
            .as_deref()
            .map_or(true, |filter| filter == ref_name)
    }
}

/// Project IDs appear both quoted and bare in hand-written files.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProjectId {
    Text(String),
    Number(u64),
}

impl ProjectId {
    fn into_string(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

/// One entry of the project file.
#[derive(Debug, Deserialize)]
struct ProjectEntry {
    github_url: Option<String>,
    tracker_api_token: Option<String>,
    tracker_project_id: Option<ProjectId>,
    #[serde(rename = "ref")]
    ref_filter: Option<String>,
}

/// Immutable repository URL → tracked project lookup.
#[derive(Debug, Clone, Default)]
pub struct ProjectRegistry {
    projects: HashMap<String, TrackedProject>,
}

impl ProjectRegistry {
    /// Read the project file at `path`.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or an entry is incomplete
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Parse a project file.
    ///
    /// # Errors
    /// Returns error if the YAML is malformed or an entry is incomplete
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let entries: BTreeMap<String, ProjectEntry> = serde_yaml::from_str(contents)?;
        let mut registry = Self::default();

        for (name, entry) in entries {
            let missing = |key| ConfigError::MissingSetting {
                project: name.clone(),
                key,
            };

            let api_token = entry
                .tracker_api_token
                .filter(|s| !s.is_empty())
                .ok_or_else(|| missing("tracker_api_token"))?;
            let project_id = entry
                .tracker_project_id
                .map(ProjectId::into_string)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| missing("tracker_project_id"))?;
            let github_url = entry
                .github_url
                .filter(|s| !s.is_empty())
                .ok_or_else(|| missing("github_url"))?;

            registry = registry.with_project(
                &github_url,
                TrackedProject {
                    credentials: TrackerCredentials {
                        api_token: ApiToken::new(api_token),
                        project_id,
                    },
                    ref_filter: entry.ref_filter.filter(|s| !s.is_empty()),
                },
            );
        }

        Ok(registry)
    }

    /// Add or replace the project for `repository`.
    #[must_use]
    pub fn with_project(mut self, repository: &str, project: TrackedProject) -> Self {
        self.projects.insert(normalize(repository).to_string(), project);
        self
    }

    /// Look up the project tracking `repository`.
    #[must_use]
    pub fn resolve(&self, repository: &str) -> Option<&TrackedProject> {
        self.projects.get(normalize(repository))
    }

    /// Number of tracked repositories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.projects.len()
    }

    /// Whether no repository is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

fn normalize(repository: &str) -> &str {
    repository.trim_end_matches('/')
}
