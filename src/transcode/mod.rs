//! Transcoder subprocess management
//!
//! The transcoder is an external program (ffmpeg in production) that reads a
//! remote media URL and writes an Ogg/Opus stream to its stdout. This module
//! provides:
//! - the [`Transcoder`] seam used to launch it (swappable in tests)
//! - the ffmpeg implementation and its argument builder
//! - [`TranscodeProcess`], which guarantees a single live instance

mod args;
mod ffmpeg;
mod process;

pub use args::build_args;
pub use ffmpeg::{FfmpegTranscoder, TranscoderSettings};
pub use process::TranscodeProcess;

use crate::error::Result;
use crate::stream::MediaSourceConfig;
use serde::Serialize;
use std::fmt;
use tokio::io::AsyncRead;

/// Encoded audio bytes produced by a transcoder
pub type AudioOutput = Box<dyn AsyncRead + Send + Unpin>;

/// Lifecycle of the transcoder subprocess
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProcessState {
    NotStarted,
    Running,
    ExitedClean,
    ExitedError,
    Killed,
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessState::NotStarted => "NotStarted",
            ProcessState::Running => "Running",
            ProcessState::ExitedClean => "ExitedClean",
            ProcessState::ExitedError => "ExitedError",
            ProcessState::Killed => "Killed",
        };
        f.write_str(s)
    }
}

/// How a transcoder process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcessExit {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl ProcessExit {
    pub fn with_code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    pub fn with_signal(signal: i32) -> Self {
        Self {
            code: None,
            signal: Some(signal),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for ProcessExit {
    fn from(status: std::process::ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = std::os::unix::process::ExitStatusExt::signal(&status);
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

impl fmt::Display for ProcessExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exit code {}", code),
            (None, Some(signal)) => write!(f, "signal {}", signal),
            (None, None) => f.write_str("unknown status"),
        }
    }
}

/// Launches transcoder processes
///
/// Implementations:
/// - [`FfmpegTranscoder`]: spawns the real ffmpeg binary
/// - test fakes that hand out in-memory pipes
#[async_trait::async_trait]
pub trait Transcoder: Send + Sync {
    /// Start a new process for the given source
    async fn launch(&self, source: &MediaSourceConfig) -> Result<Box<dyn TranscodeChild>>;

    /// Get transcoder name for logging
    fn name(&self) -> &str;
}

/// A single running transcoder process
#[async_trait::async_trait]
pub trait TranscodeChild: Send {
    /// OS process id, if there is one
    fn id(&self) -> Option<u32>;

    /// Take the encoded output stream. Returns `None` after the first call.
    fn take_output(&mut self) -> Option<AudioOutput>;

    /// Wait for the process to exit on its own
    async fn wait(&mut self) -> std::io::Result<ProcessExit>;

    /// Hard-kill the process and reap it
    async fn kill(&mut self) -> std::io::Result<()>;
}
