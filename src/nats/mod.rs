pub mod client;
pub mod control;
pub mod messages;
pub mod voice;

pub use client::NatsClient;
pub use control::ControlListener;
pub use messages::{AudioPacketMessage, ControlMessage, ControlReply, VoiceStateMessage};
pub use voice::{NatsDirectory, NatsVoiceTransport};
