use serde::{Deserialize, Serialize};

/// The voice channel to stream into.
///
/// `guild_id` is filled in once the channel has been resolved through the
/// directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetChannel {
    pub channel_id: String,
    pub guild_id: Option<String>,
}

impl TargetChannel {
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            guild_id: None,
        }
    }
}
