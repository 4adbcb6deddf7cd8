// Voice gateway adapters over NATS
//
// The voice wire protocol is spoken by a separate gateway service. We only
// ask it to resolve channels, open and destroy sessions, and we publish Opus
// packets to it. It reports each session's connection phase on
// `<prefix>.session.<id>.state`.

use base64::Engine;
use futures::stream::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::client::NatsClient;
use super::messages::{
    AudioPacketMessage, DestroySessionMessage, OpenSessionRequest, OpenSessionResponse,
    ResolveRequest, ResolveResponse, VoiceStateMessage,
};
use crate::error::{Result, StreamError};
use crate::voice::{
    ChannelDirectory, OpusPacket, ResolvedChannel, TransportState, VoiceConnection, VoiceTransport,
};

pub struct NatsDirectory {
    client: NatsClient,
    prefix: String,
}

impl NatsDirectory {
    pub fn new(client: NatsClient, prefix: impl Into<String>) -> Self {
        Self {
            client,
            prefix: prefix.into(),
        }
    }
}

#[async_trait::async_trait]
impl ChannelDirectory for NatsDirectory {
    async fn resolve(&self, channel_id: &str) -> Result<ResolvedChannel> {
        let response: ResolveResponse = self
            .client
            .request_json(
                format!("{}.directory.resolve", self.prefix),
                &ResolveRequest {
                    channel_id: channel_id.to_string(),
                },
            )
            .await?;

        match (response.found, response.guild_id) {
            (true, Some(guild_id)) => Ok(ResolvedChannel {
                channel_id: response.channel_id,
                guild_id,
                name: response.name,
            }),
            _ => Err(StreamError::ChannelNotFound(channel_id.to_string())),
        }
    }
}

pub struct NatsVoiceTransport {
    client: NatsClient,
    prefix: String,
}

impl NatsVoiceTransport {
    pub fn new(client: NatsClient, prefix: impl Into<String>) -> Self {
        Self {
            client,
            prefix: prefix.into(),
        }
    }
}

#[async_trait::async_trait]
impl VoiceTransport for NatsVoiceTransport {
    async fn open(&self, channel: &ResolvedChannel) -> Result<Box<dyn VoiceConnection>> {
        let session_id = uuid::Uuid::new_v4().to_string();
        let subject_base = format!("{}.session.{}", self.prefix, session_id);

        // Subscribe before opening so no state change is missed
        let mut states = self.client.subscribe(format!("{}.state", subject_base)).await?;
        let (state_tx, state_rx) = watch::channel(TransportState::Signalling);

        let id = session_id.clone();
        let state_task = tokio::spawn(async move {
            while let Some(msg) = states.next().await {
                match serde_json::from_slice::<VoiceStateMessage>(&msg.payload) {
                    Ok(update) if update.session_id == id => {
                        debug!("Voice session {} is {:?}", id, update.state);
                        state_tx.send_replace(update.state);
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Failed to parse voice state message: {}", e),
                }
            }
        });

        let response: OpenSessionResponse = match self
            .client
            .request_json(
                format!("{}.session.open", self.prefix),
                &OpenSessionRequest {
                    session_id: session_id.clone(),
                    guild_id: channel.guild_id.clone(),
                    channel_id: channel.channel_id.clone(),
                },
            )
            .await
        {
            Ok(response) => response,
            Err(e) => {
                state_task.abort();
                return Err(e);
            }
        };

        if !response.ok {
            state_task.abort();
            return Err(StreamError::Transport(
                response
                    .error
                    .unwrap_or_else(|| "voice gateway refused session".to_string()),
            ));
        }

        info!("Voice gateway opened session {}", session_id);

        Ok(Box::new(NatsVoiceConnection {
            client: self.client.clone(),
            subject_base,
            session_id,
            state_rx,
            state_task,
            destroyed: AtomicBool::new(false),
        }))
    }

    fn name(&self) -> &str {
        "nats voice gateway"
    }
}

struct NatsVoiceConnection {
    client: NatsClient,
    subject_base: String,
    session_id: String,
    state_rx: watch::Receiver<TransportState>,
    state_task: JoinHandle<()>,
    destroyed: AtomicBool,
}

#[async_trait::async_trait]
impl VoiceConnection for NatsVoiceConnection {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn state(&self) -> watch::Receiver<TransportState> {
        self.state_rx.clone()
    }

    async fn send_packet(&self, packet: OpusPacket) -> Result<()> {
        let message = AudioPacketMessage {
            session_id: self.session_id.clone(),
            sequence: packet.sequence,
            opus: base64::engine::general_purpose::STANDARD.encode(&packet.payload),
            gain: packet.gain,
        };
        self.client
            .publish_json(format!("{}.audio", self.subject_base), &message)
            .await
    }

    async fn destroy(&self) -> Result<()> {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.state_task.abort();

        self.client
            .publish_json(
                format!("{}.destroy", self.subject_base),
                &DestroySessionMessage {
                    session_id: self.session_id.clone(),
                },
            )
            .await
    }
}

impl Drop for NatsVoiceConnection {
    fn drop(&mut self) {
        self.state_task.abort();
    }
}
