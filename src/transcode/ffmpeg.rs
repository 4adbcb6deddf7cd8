// ffmpeg-backed transcoder

use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::{debug, info};

use super::args::build_args;
use super::{AudioOutput, ProcessExit, TranscodeChild, Transcoder};
use crate::error::{Result, StreamError};
use crate::stream::MediaSourceConfig;

/// How to invoke the transcoder binary
#[derive(Debug, Clone)]
pub struct TranscoderSettings {
    /// Program to run (default: `ffmpeg` from PATH)
    pub program: String,
    /// Opus encoder name
    pub codec: String,
    /// Optional target bitrate, e.g. `128k`
    pub bitrate: Option<String>,
}

impl Default for TranscoderSettings {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            codec: "libopus".to_string(),
            bitrate: None,
        }
    }
}

pub struct FfmpegTranscoder {
    settings: TranscoderSettings,
}

impl FfmpegTranscoder {
    pub fn new(settings: TranscoderSettings) -> Self {
        info!(
            "ffmpeg transcoder initialized ({}, codec {})",
            settings.program, settings.codec
        );
        Self { settings }
    }
}

#[async_trait::async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn launch(&self, source: &MediaSourceConfig) -> Result<Box<dyn TranscodeChild>> {
        let args = build_args(source, &self.settings);
        debug!(
            "Launching {} for {} (cookie: {})",
            self.settings.program,
            source.url,
            source.cookie.is_some()
        );

        let child = Command::new(&self.settings.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(StreamError::ProcessSpawnFailure)?;

        Ok(Box::new(FfmpegChild { child }))
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

struct FfmpegChild {
    child: Child,
}

#[async_trait::async_trait]
impl TranscodeChild for FfmpegChild {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn take_output(&mut self) -> Option<AudioOutput> {
        self.child
            .stdout
            .take()
            .map(|stdout| Box::new(stdout) as AudioOutput)
    }

    async fn wait(&mut self) -> std::io::Result<ProcessExit> {
        let status = self.child.wait().await?;
        Ok(ProcessExit::from(status))
    }

    async fn kill(&mut self) -> std::io::Result<()> {
        // SIGKILL
        self.child.kill().await
    }
}
