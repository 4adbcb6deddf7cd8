// Shared in-memory fakes for the voice gateway and the transcoder
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio::sync::{oneshot, watch};
use tokio::time::Instant;
use voice_relay::error::{Result, StreamError};
use voice_relay::stream::{MediaSourceConfig, TargetChannel};
use voice_relay::supervisor::{StreamSupervisor, SupervisorDeps, SupervisorHandle, SupervisorSettings};
use voice_relay::transcode::{AudioOutput, ProcessExit, TranscodeChild, Transcoder};
use voice_relay::voice::{
    ChannelDirectory, OpusPacket, ResolvedChannel, TransportState, VoiceConnection, VoiceTransport,
};

pub const MISSING_CHANNEL: &str = "missing";

/// Resolves every id except [`MISSING_CHANNEL`]
pub struct FakeDirectory;

#[async_trait::async_trait]
impl ChannelDirectory for FakeDirectory {
    async fn resolve(&self, channel_id: &str) -> Result<ResolvedChannel> {
        if channel_id == MISSING_CHANNEL {
            return Err(StreamError::ChannelNotFound(channel_id.to_string()));
        }
        Ok(ResolvedChannel {
            channel_id: channel_id.to_string(),
            guild_id: "guild-1".to_string(),
            name: None,
        })
    }
}

/// What the fake transport saw for one opened connection
pub struct OpenedConnection {
    pub channel_id: String,
    pub opened_at: Instant,
    pub state: watch::Sender<TransportState>,
    pub destroys: Arc<AtomicUsize>,
    pub packets: Arc<Mutex<Vec<OpusPacket>>>,
}

#[derive(Default)]
pub struct FakeTransport {
    opened: Mutex<Vec<OpenedConnection>>,
    /// When set, new connections stay in Signalling
    pub hold_ready: AtomicBool,
}

impl FakeTransport {
    pub fn opens(&self) -> usize {
        self.opened.lock().unwrap().len()
    }

    pub fn opened_channels(&self) -> Vec<String> {
        self.opened
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.channel_id.clone())
            .collect()
    }

    pub fn opened_at(&self, index: usize) -> Instant {
        self.opened.lock().unwrap()[index].opened_at
    }

    pub fn destroys(&self, index: usize) -> usize {
        self.opened.lock().unwrap()[index].destroys.load(Ordering::SeqCst)
    }

    pub fn total_destroys(&self) -> usize {
        self.opened
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.destroys.load(Ordering::SeqCst))
            .sum()
    }

    /// Connections opened and not yet destroyed
    pub fn live_sessions(&self) -> usize {
        self.opened
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.destroys.load(Ordering::SeqCst) == 0)
            .count()
    }

    /// Push a transport state change on one connection
    pub fn set_state(&self, index: usize, state: TransportState) {
        self.opened.lock().unwrap()[index].state.send_replace(state);
    }

    pub fn packets(&self, index: usize) -> Vec<OpusPacket> {
        self.opened.lock().unwrap()[index].packets.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl VoiceTransport for FakeTransport {
    async fn open(&self, channel: &ResolvedChannel) -> Result<Box<dyn VoiceConnection>> {
        let initial = if self.hold_ready.load(Ordering::SeqCst) {
            TransportState::Signalling
        } else {
            TransportState::Ready
        };
        let (state, state_rx) = watch::channel(initial);
        let destroys = Arc::new(AtomicUsize::new(0));
        let packets = Arc::new(Mutex::new(Vec::new()));

        let mut opened = self.opened.lock().unwrap();
        let session_id = format!("session-{}", opened.len());
        opened.push(OpenedConnection {
            channel_id: channel.channel_id.clone(),
            opened_at: Instant::now(),
            state,
            destroys: Arc::clone(&destroys),
            packets: Arc::clone(&packets),
        });

        Ok(Box::new(FakeConnection {
            session_id,
            state_rx,
            destroys,
            packets,
        }))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

struct FakeConnection {
    session_id: String,
    state_rx: watch::Receiver<TransportState>,
    destroys: Arc<AtomicUsize>,
    packets: Arc<Mutex<Vec<OpusPacket>>>,
}

#[async_trait::async_trait]
impl VoiceConnection for FakeConnection {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn state(&self) -> watch::Receiver<TransportState> {
        self.state_rx.clone()
    }

    async fn send_packet(&self, packet: OpusPacket) -> Result<()> {
        self.packets.lock().unwrap().push(packet);
        Ok(())
    }

    async fn destroy(&self) -> Result<()> {
        self.destroys.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Test-side ends of one fake transcoder process
struct LaunchedProcess {
    source: MediaSourceConfig,
    writer: Option<DuplexStream>,
    exit: Option<oneshot::Sender<ProcessExit>>,
}

#[derive(Default)]
pub struct FakeTranscoder {
    launched: Mutex<Vec<LaunchedProcess>>,
    live: Arc<AtomicUsize>,
    max_live: Arc<AtomicUsize>,
    kills: Arc<AtomicUsize>,
}

impl FakeTranscoder {
    pub fn launches(&self) -> usize {
        self.launched.lock().unwrap().len()
    }

    pub fn launched_urls(&self) -> Vec<String> {
        self.launched
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.source.url.clone())
            .collect()
    }

    pub fn last_source(&self) -> Option<MediaSourceConfig> {
        self.launched.lock().unwrap().last().map(|p| p.source.clone())
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Highest number of processes ever alive at once
    pub fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }

    pub fn kills(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }

    /// Make the latest process exit, closing its output like a real process
    pub fn exit_latest(&self, exit: ProcessExit) {
        let mut launched = self.launched.lock().unwrap();
        if let Some(process) = launched.last_mut() {
            process.writer.take();
            if let Some(tx) = process.exit.take() {
                let _ = tx.send(exit);
            }
        }
    }

    /// Close the latest process's output while leaving it running
    pub fn close_output_latest(&self) {
        if let Some(process) = self.launched.lock().unwrap().last_mut() {
            process.writer.take();
        }
    }

    /// Write raw bytes to the latest process's output
    pub async fn write_latest(&self, bytes: &[u8]) {
        let writer = self
            .launched
            .lock()
            .unwrap()
            .last_mut()
            .and_then(|p| p.writer.take());
        let Some(mut writer) = writer else {
            return;
        };
        writer.write_all(bytes).await.unwrap();
        if let Some(process) = self.launched.lock().unwrap().last_mut() {
            process.writer = Some(writer);
        }
    }
}

#[async_trait::async_trait]
impl Transcoder for FakeTranscoder {
    async fn launch(&self, source: &MediaSourceConfig) -> Result<Box<dyn TranscodeChild>> {
        let (writer, reader) = tokio::io::duplex(64 * 1024);
        let (exit_tx, exit_rx) = oneshot::channel();

        self.launched.lock().unwrap().push(LaunchedProcess {
            source: source.clone(),
            writer: Some(writer),
            exit: Some(exit_tx),
        });
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_live.fetch_max(live, Ordering::SeqCst);

        Ok(Box::new(FakeChild {
            output: Some(Box::new(reader)),
            exit: Some(exit_rx),
            live: Arc::clone(&self.live),
            kills: Arc::clone(&self.kills),
            alive: true,
        }))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

struct FakeChild {
    output: Option<AudioOutput>,
    exit: Option<oneshot::Receiver<ProcessExit>>,
    live: Arc<AtomicUsize>,
    kills: Arc<AtomicUsize>,
    alive: bool,
}

impl FakeChild {
    fn reap(&mut self) {
        if self.alive {
            self.alive = false;
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait::async_trait]
impl TranscodeChild for FakeChild {
    fn id(&self) -> Option<u32> {
        None
    }

    fn take_output(&mut self) -> Option<AudioOutput> {
        self.output.take()
    }

    async fn wait(&mut self) -> std::io::Result<ProcessExit> {
        let exit = match self.exit.take() {
            Some(rx) => rx.await.ok(),
            None => None,
        };
        match exit {
            Some(exit) => {
                self.reap();
                Ok(exit)
            }
            None => std::future::pending().await,
        }
    }

    async fn kill(&mut self) -> std::io::Result<()> {
        self.kills.fetch_add(1, Ordering::SeqCst);
        self.reap();
        Ok(())
    }
}

pub struct Harness {
    pub handle: SupervisorHandle,
    pub transport: Arc<FakeTransport>,
    pub transcoder: Arc<FakeTranscoder>,
}

pub fn source(url: &str) -> MediaSourceConfig {
    MediaSourceConfig {
        url: url.to_string(),
        ..MediaSourceConfig::default()
    }
}

/// Supervisor with default timings, fake collaborators and an optional
/// initial target
pub fn harness(source: MediaSourceConfig, target: Option<&str>) -> Harness {
    let transport = Arc::new(FakeTransport::default());
    let transcoder = Arc::new(FakeTranscoder::default());
    let deps = SupervisorDeps {
        directory: Arc::new(FakeDirectory),
        transport: transport.clone(),
        transcoder: transcoder.clone(),
    };

    let supervisor = StreamSupervisor::new(
        SupervisorSettings::default(),
        deps,
        source,
        target.map(TargetChannel::new),
    );
    let (handle, _task) = supervisor.spawn();

    Harness {
        handle,
        transport,
        transcoder,
    }
}

/// Let spawned tasks run; with a paused clock this also advances time
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

pub async fn advance(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

/// Build one Ogg page holding the given packets
pub fn ogg_page(flags: u8, packets: &[&[u8]]) -> Vec<u8> {
    let mut lacing = Vec::new();
    let mut body = Vec::new();
    for packet in packets {
        let mut remaining = packet.len();
        loop {
            let chunk = remaining.min(255);
            lacing.push(chunk as u8);
            remaining -= chunk;
            if chunk < 255 {
                break;
            }
        }
        body.extend_from_slice(packet);
    }

    let mut out = Vec::new();
    out.extend_from_slice(b"OggS");
    out.push(0);
    out.push(flags);
    out.extend_from_slice(&[0u8; 8]);
    out.extend_from_slice(&[1, 0, 0, 0]);
    out.extend_from_slice(&[0u8; 4]);
    out.extend_from_slice(&[0u8; 4]);
    out.push(lacing.len() as u8);
    out.extend_from_slice(&lacing);
    out.extend_from_slice(&body);
    out
}

/// Opus stream header pages followed by one page of audio packets
pub fn opus_stream(packets: &[&[u8]]) -> Vec<u8> {
    let mut stream = ogg_page(0x02, &[b"OpusHead\x01\x02\x00\x0f\x80\xbb\x00\x00\x00\x00\x00"]);
    stream.extend(ogg_page(0, &[b"OpusTags\x00\x00\x00\x00"]));
    stream.extend(ogg_page(0, packets));
    stream
}
