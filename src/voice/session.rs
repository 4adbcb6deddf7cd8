use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::transport::{ChannelDirectory, ResolvedChannel, TransportState, VoiceConnection, VoiceTransport};
use crate::error::{Result, StreamError};
use crate::stream::TargetChannel;
use crate::supervisor::{EventSender, SupervisorEvent};

/// Supervisor-side view of the voice session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VoiceState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Destroyed,
}

impl fmt::Display for VoiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VoiceState::Disconnected => "Disconnected",
            VoiceState::Connecting => "Connecting",
            VoiceState::Connected => "Connected",
            VoiceState::Reconnecting => "Reconnecting",
            VoiceState::Destroyed => "Destroyed",
        };
        f.write_str(s)
    }
}

/// Owner of the (at most one) live voice connection
pub struct VoiceSession {
    directory: Arc<dyn ChannelDirectory>,
    transport: Arc<dyn VoiceTransport>,
    events: EventSender,
    connect_timeout: Duration,
    generation: u64,
    state: VoiceState,
    channel: Option<ResolvedChannel>,
    connection: Option<Arc<dyn VoiceConnection>>,
    watcher: Option<JoinHandle<()>>,
}

impl VoiceSession {
    pub fn new(
        directory: Arc<dyn ChannelDirectory>,
        transport: Arc<dyn VoiceTransport>,
        events: EventSender,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            directory,
            transport,
            events,
            connect_timeout,
            generation: 0,
            state: VoiceState::Disconnected,
            channel: None,
            connection: None,
            watcher: None,
        }
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn channel(&self) -> Option<&ResolvedChannel> {
        self.channel.as_ref()
    }

    /// Resolve the target, destroy any existing session, open a new one and
    /// wait for it to become ready.
    pub async fn connect(&mut self, target: &TargetChannel) -> Result<Arc<dyn VoiceConnection>> {
        let channel = self.directory.resolve(&target.channel_id).await?;

        self.destroy().await;

        self.generation += 1;
        self.state = VoiceState::Connecting;
        info!(
            "Opening voice session for channel {} in guild {} via {}",
            channel.channel_id,
            channel.guild_id,
            self.transport.name()
        );

        let connection: Arc<dyn VoiceConnection> = match self.transport.open(&channel).await {
            Ok(connection) => Arc::from(connection),
            Err(e) => {
                self.state = VoiceState::Disconnected;
                return Err(e);
            }
        };

        let mut state_rx = connection.state();
        let ready = timeout(
            self.connect_timeout,
            state_rx.wait_for(|s| *s == TransportState::Ready),
        )
        .await
        .map(|result| result.is_ok());

        match ready {
            Ok(true) => {}
            Ok(false) => {
                self.abandon(connection.as_ref()).await;
                return Err(StreamError::Transport(
                    "voice connection closed before becoming ready".to_string(),
                ));
            }
            Err(_) => {
                self.abandon(connection.as_ref()).await;
                return Err(StreamError::ConnectTimeout(self.connect_timeout));
            }
        }

        let generation = self.generation;
        let events = self.events.clone();
        self.watcher = Some(tokio::spawn(async move {
            while state_rx.changed().await.is_ok() {
                let state = *state_rx.borrow_and_update();
                if events
                    .send(SupervisorEvent::VoiceStateChanged { generation, state })
                    .is_err()
                {
                    break;
                }
            }
        }));

        info!("Voice session {} ready", connection.session_id());
        self.state = VoiceState::Connected;
        self.channel = Some(channel);
        self.connection = Some(Arc::clone(&connection));

        Ok(connection)
    }

    /// Destroy the current connection if there is one. Idempotent.
    pub async fn destroy(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }

        let Some(connection) = self.connection.take() else {
            if self.state != VoiceState::Disconnected {
                self.state = VoiceState::Destroyed;
            }
            return;
        };

        info!("Destroying voice session {}", connection.session_id());
        if let Err(e) = connection.destroy().await {
            warn!("Voice session destroy failed: {}", e);
        }
        self.state = VoiceState::Destroyed;
    }

    /// Fold a transport state change into the session state.
    ///
    /// Returns false for events from a superseded connection.
    pub fn observe(&mut self, generation: u64, state: TransportState) -> bool {
        if generation != self.generation || self.connection.is_none() {
            debug!("Ignoring voice state {:?} from generation {}", state, generation);
            return false;
        }

        self.state = match state {
            TransportState::Ready => VoiceState::Connected,
            TransportState::Signalling | TransportState::Connecting => VoiceState::Reconnecting,
            TransportState::Disconnected => VoiceState::Disconnected,
            TransportState::Destroyed => VoiceState::Destroyed,
        };
        true
    }

    async fn abandon(&mut self, connection: &dyn VoiceConnection) {
        warn!("Voice session {} never became ready", connection.session_id());
        if let Err(e) = connection.destroy().await {
            warn!("Voice session destroy failed: {}", e);
        }
        self.state = VoiceState::Disconnected;
    }
}
