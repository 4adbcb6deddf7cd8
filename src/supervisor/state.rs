use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::playback::SinkState;
use crate::stream::{SourceSummary, TargetChannel};
use crate::transcode::ProcessState;
use crate::voice::VoiceState;

/// Top-level phase of the supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SupervisorState {
    Stopped,
    Connecting,
    Streaming,
    /// Waiting to respawn the transcoder
    Restarting,
    /// Waiting to re-establish the voice session
    Reconnecting,
}

impl SupervisorState {
    /// Anything but Stopped: the operator wants audio flowing
    pub fn is_active(&self) -> bool {
        !matches!(self, SupervisorState::Stopped)
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SupervisorState::Stopped => "Stopped",
            SupervisorState::Connecting => "Connecting",
            SupervisorState::Streaming => "Streaming",
            SupervisorState::Restarting => "Restarting",
            SupervisorState::Reconnecting => "Reconnecting",
        };
        f.write_str(s)
    }
}

/// Read-only view of the supervisor
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub state: SupervisorState,
    pub streaming: bool,
    pub target: Option<TargetChannel>,
    pub source: SourceSummary,
    pub voice: VoiceState,
    pub transcoder: ProcessState,
    pub playback: SinkState,
    pub volume: f32,
}

impl StatusSnapshot {
    pub fn render(&self) -> String {
        let vc = self
            .target
            .as_ref()
            .map(|t| t.channel_id.as_str())
            .unwrap_or("(not set)");
        let stream = if self.source.url.is_empty() {
            "(not set)"
        } else {
            self.source.url.as_str()
        };
        let cookie = if self.source.cookie_set { "set" } else { "unset" };

        format!(
            "VC: {}\nStreaming: {}\nState: {}\nStream: {}\nCookie: {}\nVolume: {}\nVoice: {}\nTranscoder: {}\nPlayback: {}",
            vc,
            self.streaming,
            self.state,
            stream,
            cookie,
            self.volume,
            self.voice,
            self.transcoder,
            self.playback
        )
    }
}

/// Lifetime counters for the supervisor
#[derive(Debug, Clone, Serialize)]
pub struct SupervisorStats {
    pub started_at: DateTime<Utc>,
    pub uptime_secs: f64,
    pub transcoder_launches: u64,
    pub transcoder_pid: Option<u32>,
    pub respawns: u64,
    pub restarts: u64,
    pub reconnects: u64,
    pub packets_sent: u64,
    pub last_exit: Option<String>,
}

impl SupervisorStats {
    pub fn render(&self) -> String {
        let total = self.uptime_secs as u64;
        let uptime = format!("{}h {:02}m {:02}s", total / 3600, (total / 60) % 60, total % 60);
        let pid = self
            .transcoder_pid
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());

        format!(
            "Uptime: {}\nTranscoder launches: {}\nTranscoder pid: {}\nRespawns: {}\nRestarts: {}\nReconnects: {}\nPackets sent: {}\nLast transcoder exit: {}",
            uptime,
            self.transcoder_launches,
            pid,
            self.respawns,
            self.restarts,
            self.reconnects,
            self.packets_sent,
            self.last_exit.as_deref().unwrap_or("none")
        )
    }
}
