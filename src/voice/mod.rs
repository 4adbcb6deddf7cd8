//! Voice session lifecycle
//!
//! The wire protocol lives behind [`VoiceTransport`]; this module only decides
//! when a connection is opened, awaited and destroyed.

mod session;
mod transport;

pub use session::{VoiceSession, VoiceState};
pub use transport::{
    ChannelDirectory, OpusPacket, ResolvedChannel, TransportState, VoiceConnection, VoiceTransport,
};
