//! Error types for the notification system.

use thiserror::Error;

/// Errors that can occur when sending notifications.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Socket level failure talking to the chat server
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The session task has stopped and no longer accepts lines
    #[error("Channel not connected: {0}")]
    NotConnected(String),

    /// Connecting took longer than the configured timeout
    #[error("Timed out connecting to {0}")]
    ConnectTimeout(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}
