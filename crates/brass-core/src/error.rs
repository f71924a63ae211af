//! Error types shared by the core and chat-client implementations.

use thiserror::Error;

/// Error type for calls into the chat client.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The client is not connected.
    #[error("client is not connected")]
    NotConnected,
    /// The server refused or dropped the request.
    #[error("failed to send to '{target}': {reason}")]
    SendFailed {
        /// Channel or nickname the message was addressed to.
        target: String,
        /// Reason given by the client.
        reason: String,
    },
    /// The named channel is unknown to the client.
    #[error("unknown channel '{0}'")]
    UnknownChannel(String),
    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl ApiError {
    /// Creates a send failure for `target`.
    pub fn send_failed(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SendFailed {
            target: target.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for chat-client calls.
pub type ApiResult<T> = Result<T, ApiError>;
