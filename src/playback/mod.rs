//! Playback: Ogg/Opus demuxing and packet delivery to the voice session

mod ogg;
mod sink;

pub use ogg::OggPacketReader;
pub use sink::{PlaybackSink, SinkState};
