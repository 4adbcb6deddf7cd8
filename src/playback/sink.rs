use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::ogg::OggPacketReader;
use crate::error::StreamError;
use crate::supervisor::{EventSender, SupervisorEvent};
use crate::transcode::AudioOutput;
use crate::voice::{OpusPacket, TransportState, VoiceConnection};

/// Playback state as seen by the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SinkState {
    Idle,
    Playing,
    /// Output is running but no ready voice connection is bound
    Paused,
    Errored,
}

impl fmt::Display for SinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SinkState::Idle => "Idle",
            SinkState::Playing => "Playing",
            SinkState::Paused => "Paused",
            SinkState::Errored => "Errored",
        };
        f.write_str(s)
    }
}

type Binding = Arc<RwLock<Option<Arc<dyn VoiceConnection>>>>;

/// Feeds one transcoder's output into the bound voice connection.
///
/// The binding can be swapped while a stream is playing; that is how a voice
/// reconnect is applied without touching the transcoder.
pub struct PlaybackSink {
    events: EventSender,
    binding: Binding,
    bound: Option<Arc<dyn VoiceConnection>>,
    pump_state: Arc<watch::Sender<SinkState>>,
    volume: Arc<AtomicU32>,
    packets_sent: Arc<AtomicU64>,
    pump: Option<JoinHandle<()>>,
}

impl PlaybackSink {
    pub fn new(events: EventSender, volume: f32) -> Self {
        let (pump_state, _) = watch::channel(SinkState::Idle);
        Self {
            events,
            binding: Arc::new(RwLock::new(None)),
            bound: None,
            pump_state: Arc::new(pump_state),
            volume: Arc::new(AtomicU32::new(volume.to_bits())),
            packets_sent: Arc::new(AtomicU64::new(0)),
            pump: None,
        }
    }

    pub fn state(&self) -> SinkState {
        let reported = *self.pump_state.borrow();
        if reported != SinkState::Playing {
            return reported;
        }
        match &self.bound {
            Some(connection) if *connection.state().borrow() == TransportState::Ready => {
                SinkState::Playing
            }
            _ => SinkState::Paused,
        }
    }

    pub fn volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::SeqCst))
    }

    pub fn packets_sent(&self) -> u64 {
        self.packets_sent.load(Ordering::SeqCst)
    }

    /// Bind (or rebind) playback to a voice connection
    pub async fn attach(&mut self, connection: Arc<dyn VoiceConnection>) {
        info!("Playback bound to voice session {}", connection.session_id());
        *self.binding.write().await = Some(Arc::clone(&connection));
        self.bound = Some(connection);
    }

    /// Drop the binding; packets are discarded until the next attach
    pub async fn detach(&mut self) {
        if self.bound.take().is_some() {
            debug!("Playback detached from voice session");
        }
        *self.binding.write().await = None;
    }

    /// Start consuming a transcoder's output.
    ///
    /// `generation` tags the idle/error events this stream produces.
    pub async fn play(&mut self, generation: u64, output: AudioOutput, volume: f32) {
        self.stop().await;

        self.volume.store(volume.to_bits(), Ordering::SeqCst);
        self.pump_state.send_replace(SinkState::Playing);

        let binding = Arc::clone(&self.binding);
        let pump_state = Arc::clone(&self.pump_state);
        let volume = Arc::clone(&self.volume);
        let packets_sent = Arc::clone(&self.packets_sent);
        let events = self.events.clone();

        self.pump = Some(tokio::spawn(async move {
            let mut reader = OggPacketReader::new(output);
            let mut sequence = 0u64;

            loop {
                match reader.next_packet().await {
                    Ok(Some(payload)) => {
                        let connection = binding.read().await.clone();
                        let Some(connection) = connection else {
                            continue;
                        };
                        let ready = *connection.state().borrow() == TransportState::Ready;
                        if !ready {
                            continue;
                        }

                        let packet = OpusPacket {
                            payload,
                            sequence,
                            gain: f32::from_bits(volume.load(Ordering::SeqCst)),
                        };
                        sequence += 1;

                        if let Err(e) = connection.send_packet(packet).await {
                            error!("Failed to submit audio packet: {}", e);
                            pump_state.send_replace(SinkState::Errored);
                            let _ = events.send(SupervisorEvent::SinkErrored {
                                generation,
                                error: StreamError::SinkPlaybackError(format!(
                                    "packet submit failed: {}",
                                    e
                                )),
                            });
                            return;
                        }
                        packets_sent.fetch_add(1, Ordering::SeqCst);
                    }
                    Ok(None) => {
                        info!(
                            "Transcoder output exhausted after {} pages",
                            reader.pages_read()
                        );
                        pump_state.send_replace(SinkState::Idle);
                        let _ = events.send(SupervisorEvent::SinkIdle { generation });
                        return;
                    }
                    Err(e) => {
                        error!("Corrupt transcoder output: {}", e);
                        pump_state.send_replace(SinkState::Errored);
                        let _ = events.send(SupervisorEvent::SinkErrored {
                            generation,
                            error: StreamError::SinkPlaybackError(format!(
                                "corrupt transcoder output: {}",
                                e
                            )),
                        });
                        return;
                    }
                }
            }
        }));
    }

    /// Stop playback without reporting idle. Safe to call when idle.
    pub async fn stop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
            if let Err(e) = pump.await {
                if !e.is_cancelled() {
                    warn!("Playback task failed: {}", e);
                }
            }
        }
        self.pump_state.send_replace(SinkState::Idle);
    }

    /// Change volume of the running stream, including while it is paused on
    /// a voice reconnect.
    ///
    /// Returns false, leaving volume untouched, when no output is running.
    pub fn set_volume(&mut self, volume: f32) -> bool {
        if !matches!(self.state(), SinkState::Playing | SinkState::Paused) {
            return false;
        }
        self.volume.store(volume.to_bits(), Ordering::SeqCst);
        info!("Playback volume set to {:.2}", volume);
        true
    }
}
