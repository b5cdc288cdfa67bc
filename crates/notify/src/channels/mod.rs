//! Notification channel implementations.

pub mod irc;

use async_trait::async_trait;

use crate::error::ChannelError;

/// Trait for notification channels (IRC, or in-process fakes in tests).
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    /// Get the name of this channel.
    fn name(&self) -> &'static str;

    /// Check if this channel is enabled/configured.
    fn enabled(&self) -> bool;

    /// Send one line of text to this channel.
    async fn send(&self, text: &str) -> Result<(), ChannelError>;
}
