use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::Result;

/// Connection phase as reported by the voice transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportState {
    Signalling,
    Connecting,
    Ready,
    Disconnected,
    Destroyed,
}

/// A channel resolved through the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedChannel {
    pub channel_id: String,
    /// Parent grouping (server) the channel belongs to
    pub guild_id: String,
    pub name: Option<String>,
}

/// One encoded Opus packet ready for the voice connection
#[derive(Debug, Clone, PartialEq)]
pub struct OpusPacket {
    pub payload: Bytes,
    pub sequence: u64,
    pub gain: f32,
}

/// Resolves channel ids to channels
#[async_trait::async_trait]
pub trait ChannelDirectory: Send + Sync {
    /// Fails with `ChannelNotFound` for invalid or inaccessible ids
    async fn resolve(&self, channel_id: &str) -> Result<ResolvedChannel>;
}

/// Opens voice connections
#[async_trait::async_trait]
pub trait VoiceTransport: Send + Sync {
    async fn open(&self, channel: &ResolvedChannel) -> Result<Box<dyn VoiceConnection>>;

    /// Get transport name for logging
    fn name(&self) -> &str;
}

/// A live voice connection
#[async_trait::async_trait]
pub trait VoiceConnection: Send + Sync {
    fn session_id(&self) -> &str;

    /// Watch the transport's connection phase
    fn state(&self) -> watch::Receiver<TransportState>;

    /// Audio sink subscription point: submit one packet for playback
    async fn send_packet(&self, packet: OpusPacket) -> Result<()>;

    /// Tear the connection down. Idempotent.
    async fn destroy(&self) -> Result<()>;
}
