pub mod config;
pub mod control;
pub mod error;
pub mod http;
pub mod nats;
pub mod playback;
pub mod stream;
pub mod supervisor;
pub mod transcode;
pub mod voice;

pub use config::Config;
pub use control::{Command, CommandRouter};
pub use error::{Result, StreamError};
pub use http::{create_router, AppState};
pub use nats::{ControlListener, NatsClient, NatsDirectory, NatsVoiceTransport};
pub use playback::{OggPacketReader, PlaybackSink, SinkState};
pub use stream::{MediaSourceConfig, SourceUpdate, TargetChannel};
pub use supervisor::{
    StatusSnapshot, StreamSupervisor, SupervisorDeps, SupervisorHandle, SupervisorSettings,
    SupervisorState, SupervisorStats,
};
pub use transcode::{FfmpegTranscoder, ProcessExit, ProcessState, TranscoderSettings};
pub use voice::{TransportState, VoiceSession, VoiceState};
