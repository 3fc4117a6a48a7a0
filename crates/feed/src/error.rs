//! Errors surfaced by the streaming client.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during WebSocket operations.
///
/// Only connection setup and lifecycle misuse reach the caller. Transport
/// failures after a successful connect are handled inside the session by
/// reconnecting, and malformed messages are dropped one at a time.
#[derive(Error, Debug)]
pub enum FeedError {
    /// Failed to establish the WebSocket connection.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Connection attempt did not complete in time.
    #[error("Connection timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// Feed URL could not be parsed.
    #[error("Invalid feed URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// WebSocket protocol error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// `connect` was called while a session is already running.
    #[error("Client is already connected")]
    AlreadyConnected,

    /// The client has been closed.
    #[error("Client is closed")]
    Closed,
}
