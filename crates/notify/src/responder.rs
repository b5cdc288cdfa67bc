//! Channel mention responder.
//!
//! Anyone addressing the bot as `<nick>: ...` in the channel gets a random
//! magic 8-ball answer back. It shares nothing with commit announcements
//! beyond the connection.

use rand::seq::SliceRandom;

/// Classic magic 8-ball answers.
pub const EIGHT_BALL: [&str; 20] = [
    "As I see it, yes",
    "It is certain",
    "It is decidedly so",
    "Most likely",
    "Outlook good",
    "Signs point to yes",
    "Without a doubt",
    "Yes",
    "Yes - definitely",
    "You may rely on it",
    "Reply hazy, try again",
    "Ask again later",
    "Better not tell you now",
    "Cannot predict now",
    "Concentrate and ask again",
    "Don't count on it",
    "My reply is no",
    "My sources say no",
    "Outlook not so good",
    "Very doubtful",
];

/// Replies to channel messages that address the bot by nick.
#[derive(Debug, Clone)]
pub struct MentionResponder {
    marker: String,
}

impl MentionResponder {
    /// Create a responder for the given bot nick.
    #[must_use]
    pub fn new(nick: &str) -> Self {
        Self {
            marker: format!("{nick}:"),
        }
    }

    /// Whether `text` addresses the bot.
    #[must_use]
    pub fn is_mention(&self, text: &str) -> bool {
        text.contains(&self.marker)
    }

    /// Reply to `sender` if `text` addresses the bot.
    #[must_use]
    pub fn reply(&self, sender: &str, text: &str) -> Option<String> {
        if !self.is_mention(text) {
            return None;
        }
        let answer = EIGHT_BALL
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(EIGHT_BALL[0]);
        Some(format!("{sender}: {answer}"))
    }
}
