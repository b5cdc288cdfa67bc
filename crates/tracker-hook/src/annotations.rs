//! Commit message annotations.
//!
//! A commit references a tracker story with a bracketed tag:
//!
//! ```text
//! [Story123]
//! [Story123 state:finished]
//! ```
//!
//! The keyword is matched literally and case-sensitively. Anything between
//! the digits and the closing bracket is the suffix; a `state:<word>` marker
//! in the suffix requests a state transition.

use regex::Regex;
use std::sync::LazyLock;

/// Keyword used by the tracker's story references.
pub const DEFAULT_KEYWORD: &str = "Story";

/// Finds the `state:<word>` marker in a tag suffix. The greedy prefix makes
/// the rightmost well-formed marker win.
static STATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r".*state:((?-u:\s)?(?-u:\w)+)").unwrap());

static DEFAULT_PARSER: LazyLock<AnnotationParser> =
    LazyLock::new(|| AnnotationParser::new(DEFAULT_KEYWORD));

/// One story reference found in a commit message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationTag {
    /// Story identifier, the digits exactly as written.
    pub issue_id: String,
    /// Requested state, trimmed, case preserved.
    pub state: Option<String>,
}

/// Extracts [`AnnotationTag`]s for one entity keyword.
#[derive(Debug, Clone)]
pub struct AnnotationParser {
    keyword: String,
    pattern: Regex,
}

impl AnnotationParser {
    /// Build a parser for `[<keyword><digits>...]` tags.
    ///
    /// # Panics
    ///
    /// Never in practice: the keyword is escaped before being compiled.
    #[must_use]
    pub fn new(keyword: &str) -> Self {
        let pattern = Regex::new(&format!(r"\[{}([0-9]+)([^\]]*)\]", regex::escape(keyword)))
            .expect("escaped keyword always forms a valid pattern");
        Self {
            keyword: keyword.to_string(),
            pattern,
        }
    }

    /// The entity keyword this parser matches.
    #[must_use]
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Lazily yield every tag in `message`, left to right.
    ///
    /// Calling again restarts from the beginning of the message.
    pub fn parse<'a>(&'a self, message: &'a str) -> impl Iterator<Item = AnnotationTag> + 'a {
        self.pattern.captures_iter(message).map(|caps| {
            let issue_id = caps.get(1).map_or("", |m| m.as_str()).to_string();
            let suffix = caps.get(2).map_or("", |m| m.as_str());
            AnnotationTag {
                issue_id,
                state: parse_state(suffix),
            }
        })
    }
}

impl Default for AnnotationParser {
    fn default() -> Self {
        DEFAULT_PARSER.clone()
    }
}

/// Parse `message` with the default `Story` keyword.
pub fn parse_annotations(message: &str) -> impl Iterator<Item = AnnotationTag> + '_ {
    DEFAULT_PARSER.parse(message)
}

fn parse_state(suffix: &str) -> Option<String> {
    STATE_PATTERN
        .captures(suffix)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}
