//! Chat notifications for commit announcements.
//!
//! This crate provides the announcement side of the tracker hook: a
//! [`Notifier`] that fans one line of text out to every configured channel,
//! and an [`IrcChannel`] that keeps a single IRC session alive, joins the
//! announcement channel and answers channel mentions.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use notify::{IrcChannel, IrcConfig, Notifier};
//!
//! # async fn run() -> Result<(), notify::ChannelError> {
//! let irc = IrcChannel::spawn(IrcConfig::new("irc.libera.chat", 6667, "CommitBot", "#dev"));
//! let notifier = Notifier::with_channels(vec![Arc::new(irc)]);
//!
//! notifier.announce("repo Fix the build (Ada) https://bit.ly/x").await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`NotifyChannel`] trait defines the interface for notification channels
//! - [`IrcChannel`] implements it over a long-lived IRC connection
//! - [`Notifier`] dispatches announcements to all enabled channels

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod channels;
pub mod error;
pub mod protocol;
pub mod responder;

pub use channels::irc::{IrcChannel, IrcConfig};
pub use channels::NotifyChannel;
pub use error::ChannelError;
pub use responder::MentionResponder;

use std::sync::Arc;
use tracing::{debug, error};

/// Central notification dispatcher.
///
/// Announcements are delivered to each channel in turn and awaited, so the
/// order callers announce in is the order lines reach the channel.
pub struct Notifier {
    channels: Vec<Arc<dyn NotifyChannel>>,
    disabled: bool,
}

impl Notifier {
    /// Create a notifier with specific channels.
    #[must_use]
    pub fn with_channels(channels: Vec<Arc<dyn NotifyChannel>>) -> Self {
        Self {
            channels,
            disabled: false,
        }
    }

    /// Create a disabled notifier (for testing or when announcements are off).
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            channels: vec![],
            disabled: true,
        }
    }

    /// Check if any notification channels are enabled.
    #[must_use]
    pub fn has_channels(&self) -> bool {
        !self.disabled && !self.channels.is_empty()
    }

    /// Get the number of enabled channels.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        if self.disabled {
            0
        } else {
            self.channels.len()
        }
    }

    /// Send one line to every enabled channel.
    ///
    /// Every channel is attempted even when an earlier one fails. Failures are
    /// logged; the last one is returned.
    pub async fn announce(&self, text: &str) -> Result<(), ChannelError> {
        if !self.has_channels() {
            debug!("No notification channels, skipping announcement");
            return Ok(());
        }

        let mut outcome = Ok(());

        for channel in &self.channels {
            let channel_name = channel.name();

            if !channel.enabled() {
                debug!(channel = channel_name, "Channel disabled, skipping");
                continue;
            }

            match channel.send(text).await {
                Ok(()) => {
                    debug!(channel = channel_name, "Announcement sent");
                }
                Err(e) => {
                    error!(
                        channel = channel_name,
                        error = %e,
                        "Failed to send announcement"
                    );
                    outcome = Err(e);
                }
            }
        }

        outcome
    }
}
