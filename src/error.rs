//! Error types for the stream supervisor

use std::time::Duration;
use thiserror::Error;

/// Everything that can go wrong while keeping the stream alive
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("no voice channel configured")]
    NoTargetConfigured,

    #[error("no stream URL configured")]
    NoSourceConfigured,

    #[error("already streaming")]
    AlreadyStreaming,

    #[error("not streaming")]
    NotStreaming,

    #[error("voice channel not found: {0}")]
    ChannelNotFound(String),

    #[error("voice connection not ready after {0:?}")]
    ConnectTimeout(Duration),

    #[error("failed to spawn transcoder: {0}")]
    ProcessSpawnFailure(#[source] std::io::Error),

    #[error("playback error: {0}")]
    SinkPlaybackError(String),

    #[error("authentication failed: {0}")]
    AuthenticationFailure(String),

    #[error("invalid volume {0}, expected 0.0-2.0")]
    InvalidVolume(f32),

    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("voice transport error: {0}")]
    Transport(String),

    #[error("supervisor is not running")]
    SupervisorUnavailable,
}

impl StreamError {
    /// Whether the supervisor keeps retrying after this error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StreamError::ConnectTimeout(_)
                | StreamError::ProcessSpawnFailure(_)
                | StreamError::SinkPlaybackError(_)
                | StreamError::Transport(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, StreamError>;
