use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::event::{EventSender, SupervisorEvent};
use super::handle::{Request, SupervisorHandle};
use super::settings::SupervisorSettings;
use super::state::{StatusSnapshot, SupervisorState, SupervisorStats};
use crate::error::{Result, StreamError};
use crate::playback::{PlaybackSink, SinkState};
use crate::stream::{validate_volume, MediaSourceConfig, TargetChannel};
use crate::transcode::{ProcessExit, TranscodeProcess, Transcoder};
use crate::voice::{ChannelDirectory, TransportState, VoiceSession, VoiceState, VoiceTransport};

/// External collaborators the supervisor drives
#[derive(Clone)]
pub struct SupervisorDeps {
    pub directory: Arc<dyn ChannelDirectory>,
    pub transport: Arc<dyn VoiceTransport>,
    pub transcoder: Arc<dyn Transcoder>,
}

/// Keeps one voice session, one transcoder and one playback sink running as a
/// unit.
///
/// The supervisor runs as a single task. Operator requests arrive through a
/// [`SupervisorHandle`]; resource and timer events arrive on an internal
/// channel. Both are handled one at a time, so a compound operation (connect,
/// then spawn, then play) is never interleaved with another state change.
/// Timers carry the epoch they were scheduled in; `stop`, `start`, `restart`,
/// retargeting and `reconnect` move to a new epoch, which cancels every pending
/// retry.
pub struct StreamSupervisor {
    settings: SupervisorSettings,
    state: SupervisorState,
    source: MediaSourceConfig,
    target: Option<TargetChannel>,
    session: VoiceSession,
    process: TranscodeProcess,
    sink: PlaybackSink,
    epoch: u64,
    /// Bumped on every voice state change; only the grace timer of the latest
    /// disconnect may act
    disconnects: u64,
    events_tx: EventSender,
    events_rx: mpsc::UnboundedReceiver<SupervisorEvent>,
    started_at: DateTime<Utc>,
    respawns: u64,
    restarts: u64,
    reconnects: u64,
    last_exit: Option<ProcessExit>,
}

impl StreamSupervisor {
    pub fn new(
        settings: SupervisorSettings,
        deps: SupervisorDeps,
        source: MediaSourceConfig,
        target: Option<TargetChannel>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let session = VoiceSession::new(
            deps.directory,
            deps.transport,
            events_tx.clone(),
            settings.connect_timeout,
        );
        let process = TranscodeProcess::new(deps.transcoder, events_tx.clone());
        let sink = PlaybackSink::new(events_tx.clone(), source.volume);

        Self {
            settings,
            state: SupervisorState::Stopped,
            source,
            target,
            session,
            process,
            sink,
            epoch: 0,
            disconnects: 0,
            events_tx,
            events_rx,
            started_at: Utc::now(),
            respawns: 0,
            restarts: 0,
            reconnects: 0,
            last_exit: None,
        }
    }

    /// Run the control loop on its own task
    pub fn spawn(self) -> (SupervisorHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(32);
        let task = tokio::spawn(self.run(rx));
        (SupervisorHandle::new(tx), task)
    }

    async fn run(mut self, mut requests: mpsc::Receiver<Request>) {
        info!("Stream supervisor started");

        loop {
            tokio::select! {
                request = requests.recv() => match request {
                    Some(Request::Shutdown { reply }) => {
                        self.stop().await;
                        let _ = reply.send(());
                        break;
                    }
                    Some(request) => self.handle_request(request).await,
                    None => {
                        self.stop().await;
                        break;
                    }
                },
                Some(event) = self.events_rx.recv() => self.handle_event(event).await,
            }
        }

        info!("Stream supervisor shut down");
    }

    async fn handle_request(&mut self, request: Request) {
        match request {
            Request::SetTarget { target, reply } => {
                info!("Voice target set to {}", target.channel_id);
                self.target = Some(target);
                let _ = reply.send(Ok(()));

                if self.state.is_active() {
                    info!("Moving running stream to the new voice channel");
                    if let Err(e) = self.restart().await {
                        warn!("Retarget failed: {}", e);
                    }
                }
            }
            Request::SetSource { update, reply } => {
                self.source.apply(update);
                info!(
                    "Stream source updated (url: {}, cookie: {})",
                    self.source.url,
                    self.source.cookie.is_some()
                );
                let _ = reply.send(Ok(()));

                // Restarting/Reconnecting pick up the new source on their next spawn
                if self.state == SupervisorState::Streaming {
                    if let Err(e) = self.restart().await {
                        warn!("Restart after source change failed: {}", e);
                    }
                }
            }
            Request::Start { reply } => {
                let _ = reply.send(self.start().await);
            }
            Request::Stop { reply } => {
                self.stop().await;
                let _ = reply.send(());
            }
            Request::Restart { reply } => {
                let _ = reply.send(self.restart().await);
            }
            Request::Reconnect { reply } => {
                let _ = reply.send(self.reconnect_only().await);
            }
            Request::SetVolume { volume, reply } => {
                let _ = reply.send(self.set_volume(volume));
            }
            Request::Status { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Request::Stats { reply } => {
                let _ = reply.send(self.stats());
            }
            Request::Shutdown { reply } => {
                // Handled by the run loop
                let _ = reply.send(());
            }
        }
    }

    async fn handle_event(&mut self, event: SupervisorEvent) {
        match event {
            SupervisorEvent::ProcessExited { generation, exit } => {
                if !self.process.mark_exited(generation, &exit) {
                    debug!("Ignoring exit of superseded transcoder {}", generation);
                    return;
                }
                if exit.is_clean() {
                    info!("Transcoder exited cleanly ({})", exit);
                } else {
                    warn!("Transcoder exited with error ({})", exit);
                }
                self.last_exit = Some(exit);

                if self.state == SupervisorState::Streaming {
                    self.begin_respawn("transcoder exited").await;
                }
            }
            SupervisorEvent::SinkIdle { generation } => {
                if !self.is_current_pipeline(generation) {
                    debug!("Ignoring idle from superseded playback {}", generation);
                    return;
                }
                self.begin_respawn("playback went idle").await;
            }
            SupervisorEvent::SinkErrored { generation, error } => {
                if !self.is_current_pipeline(generation) {
                    debug!("Ignoring error from superseded playback {}: {}", generation, error);
                    return;
                }
                error!("Playback failed: {}; restarting stream", error);
                if let Err(e) = self.restart().await {
                    warn!("Restart after playback error failed: {}", e);
                }
            }
            SupervisorEvent::VoiceStateChanged { generation, state } => {
                if !self.session.observe(generation, state) {
                    return;
                }
                self.on_voice_state(generation, state).await;
            }
            SupervisorEvent::DisconnectGraceElapsed {
                epoch,
                generation,
                disconnect,
            } => {
                if epoch != self.epoch || generation != self.session.generation() {
                    return;
                }
                if disconnect != self.disconnects {
                    debug!("Dropping grace timer of an earlier disconnect");
                    return;
                }
                if self.session.state() != VoiceState::Disconnected {
                    debug!("Voice session recovered within grace period");
                    return;
                }
                if !self.watches_voice() {
                    return;
                }
                warn!(
                    "Voice session did not recover within {:?}",
                    self.settings.disconnect_grace
                );
                self.begin_reconnect().await;
            }
            SupervisorEvent::RespawnDue { epoch } => {
                if epoch != self.epoch || self.state != SupervisorState::Restarting {
                    debug!("Dropping stale respawn timer");
                    return;
                }
                info!("Respawning transcoder");
                if let Err(e) = self.spawn_and_play().await {
                    warn!("Respawn failed: {}", e);
                }
            }
            SupervisorEvent::ReconnectDue { epoch } => {
                if epoch != self.epoch || self.state != SupervisorState::Reconnecting {
                    debug!("Dropping stale reconnect timer");
                    return;
                }
                let Some(target) = self.target.clone() else {
                    warn!("No voice target to reconnect to; stopping");
                    self.stop().await;
                    return;
                };

                self.reconnects += 1;
                info!("Reconnecting voice session (attempt {})", self.reconnects);
                match self.connect(&target).await {
                    Ok(()) => {
                        if let Err(e) = self.resume_after_connect().await {
                            warn!("Stream did not resume after reconnect: {}", e);
                        }
                    }
                    Err(e) => {
                        warn!(
                            "Reconnect failed: {}; retrying in {:?}",
                            e, self.settings.reconnect_backoff
                        );
                        self.enter_reconnecting();
                    }
                }
            }
        }
    }

    async fn on_voice_state(&mut self, generation: u64, state: TransportState) {
        // Any state change supersedes a pending grace period
        self.disconnects += 1;

        match state {
            TransportState::Disconnected => {
                if self.watches_voice() {
                    warn!(
                        "Voice session disconnected; waiting {:?} for it to recover",
                        self.settings.disconnect_grace
                    );
                    self.schedule(
                        self.settings.disconnect_grace,
                        SupervisorEvent::DisconnectGraceElapsed {
                            epoch: self.epoch,
                            generation,
                            disconnect: self.disconnects,
                        },
                    );
                }
            }
            TransportState::Signalling | TransportState::Connecting => {
                info!("Voice transport is re-establishing the session");
            }
            TransportState::Ready => {
                info!("Voice session ready");
            }
            TransportState::Destroyed => {
                if self.watches_voice() {
                    warn!("Voice session destroyed by the transport");
                    self.begin_reconnect().await;
                }
            }
        }
    }

    /// States in which a voice drop triggers recovery
    fn watches_voice(&self) -> bool {
        matches!(
            self.state,
            SupervisorState::Streaming | SupervisorState::Connecting | SupervisorState::Restarting
        )
    }

    fn is_current_pipeline(&self, generation: u64) -> bool {
        generation == self.process.generation() && self.state == SupervisorState::Streaming
    }

    async fn start(&mut self) -> Result<()> {
        if self.state.is_active() {
            return Err(StreamError::AlreadyStreaming);
        }
        self.bring_up().await
    }

    /// Tear everything down. Idempotent.
    async fn stop(&mut self) {
        let was = self.state;
        self.teardown().await;
        if was.is_active() {
            info!("Streaming stopped");
        }
    }

    async fn restart(&mut self) -> Result<()> {
        self.restarts += 1;
        info!("Restarting stream");
        self.teardown().await;
        self.bring_up().await
    }

    async fn reconnect_only(&mut self) -> Result<()> {
        if !self.state.is_active() {
            return Err(StreamError::NotStreaming);
        }
        let target = self.target.clone().ok_or(StreamError::NoTargetConfigured)?;

        self.epoch += 1;
        self.reconnects += 1;
        self.state = SupervisorState::Reconnecting;
        info!("Reconnecting voice session on request");

        match self.connect(&target).await {
            Ok(()) => self.resume_after_connect().await,
            Err(e) => {
                warn!("Reconnect failed: {}", e);
                self.enter_reconnecting();
                Err(e)
            }
        }
    }

    fn set_volume(&mut self, volume: f32) -> Result<bool> {
        let volume = validate_volume(volume)?;
        if !self.sink.set_volume(volume) {
            info!("Volume change ignored, nothing is playing");
            return Ok(false);
        }
        self.source.volume = volume;
        Ok(true)
    }

    /// connect() then spawnAndPlay() against the current target and source
    async fn bring_up(&mut self) -> Result<()> {
        let target = self.target.clone().ok_or(StreamError::NoTargetConfigured)?;
        if !self.source.has_url() {
            return Err(StreamError::NoSourceConfigured);
        }

        self.epoch += 1;
        self.state = SupervisorState::Connecting;

        if let Err(e) = self.connect(&target).await {
            if matches!(e, StreamError::ChannelNotFound(_)) {
                warn!("Cannot start: {}", e);
                self.state = SupervisorState::Stopped;
            } else {
                warn!(
                    "Voice connect failed: {}; retrying in {:?}",
                    e, self.settings.reconnect_backoff
                );
                self.enter_reconnecting();
            }
            return Err(e);
        }

        self.spawn_and_play().await
    }

    async fn connect(&mut self, target: &TargetChannel) -> Result<()> {
        self.sink.detach().await;
        let connection = self.session.connect(target).await?;

        if let (Some(channel), Some(current)) = (self.session.channel(), self.target.as_mut()) {
            if current.channel_id == channel.channel_id {
                current.guild_id = Some(channel.guild_id.clone());
            }
        }

        self.sink.attach(connection).await;
        Ok(())
    }

    async fn spawn_and_play(&mut self) -> Result<()> {
        self.sink.stop().await;

        match self.process.spawn(&self.source).await {
            Ok((generation, output)) => {
                self.sink.play(generation, output, self.source.volume).await;
                self.state = SupervisorState::Streaming;
                info!("Streaming {}", self.source.url);
                Ok(())
            }
            Err(e) => {
                error!("Failed to start transcoder: {}", e);
                self.begin_respawn("transcoder failed to start").await;
                Err(e)
            }
        }
    }

    /// After a voice reconnect: keep the running transcoder if it is still
    /// feeding the sink, otherwise start a fresh one.
    async fn resume_after_connect(&mut self) -> Result<()> {
        let pipeline_alive = self.process.is_running()
            && matches!(self.sink.state(), SinkState::Playing | SinkState::Paused);

        if pipeline_alive {
            self.state = SupervisorState::Streaming;
            info!("Voice session re-established, transcoder kept running");
            Ok(())
        } else {
            self.spawn_and_play().await
        }
    }

    async fn begin_respawn(&mut self, reason: &str) {
        self.sink.stop().await;
        self.process.kill().await;

        self.state = SupervisorState::Restarting;
        self.respawns += 1;
        warn!(
            "{}; respawning transcoder in {:?}",
            reason, self.settings.respawn_delay
        );
        self.schedule(
            self.settings.respawn_delay,
            SupervisorEvent::RespawnDue { epoch: self.epoch },
        );
    }

    async fn begin_reconnect(&mut self) {
        self.sink.detach().await;
        self.session.destroy().await;
        self.enter_reconnecting();
    }

    fn enter_reconnecting(&mut self) {
        self.state = SupervisorState::Reconnecting;
        self.schedule(
            self.settings.reconnect_backoff,
            SupervisorEvent::ReconnectDue { epoch: self.epoch },
        );
    }

    async fn teardown(&mut self) {
        self.epoch += 1;
        self.sink.stop().await;
        self.process.kill().await;
        self.sink.detach().await;
        self.session.destroy().await;
        self.state = SupervisorState::Stopped;
    }

    fn schedule(&self, delay: Duration, event: SupervisorEvent) {
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(event);
        });
    }

    fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            state: self.state,
            streaming: self.state.is_active(),
            target: self.target.clone(),
            source: self.source.summary(),
            voice: self.session.state(),
            transcoder: self.process.state(),
            playback: self.sink.state(),
            volume: self.sink.volume(),
        }
    }

    fn stats(&self) -> SupervisorStats {
        let uptime = Utc::now().signed_duration_since(self.started_at);
        SupervisorStats {
            started_at: self.started_at,
            uptime_secs: uptime.num_milliseconds() as f64 / 1000.0,
            transcoder_launches: self.process.launches(),
            transcoder_pid: self.process.pid(),
            respawns: self.respawns,
            restarts: self.restarts,
            reconnects: self.reconnects,
            packets_sent: self.sink.packets_sent(),
            last_exit: self.last_exit.map(|exit| exit.to_string()),
        }
    }
}
