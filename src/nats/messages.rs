use serde::{Deserialize, Serialize};

use crate::voice::TransportState;

/// Operator message received on the control subject
#[derive(Debug, Serialize, Deserialize)]
pub struct ControlMessage {
    pub author: String,
    pub text: String,
}

/// Reply published to the control message's reply subject
#[derive(Debug, Serialize, Deserialize)]
pub struct ControlReply {
    pub text: String,
}

/// Directory lookup request
#[derive(Debug, Serialize, Deserialize)]
pub struct ResolveRequest {
    pub channel_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub found: bool,
    pub channel_id: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Ask the voice gateway to open a session
#[derive(Debug, Serialize, Deserialize)]
pub struct OpenSessionRequest {
    pub session_id: String,
    pub guild_id: String,
    pub channel_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OpenSessionResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Connection phase published by the voice gateway
#[derive(Debug, Serialize, Deserialize)]
pub struct VoiceStateMessage {
    pub session_id: String,
    pub state: TransportState,
}

/// Opus packet published to the voice gateway
#[derive(Debug, Serialize, Deserialize)]
pub struct AudioPacketMessage {
    pub session_id: String,
    pub sequence: u64,
    pub opus: String, // Base64-encoded Opus packet
    pub gain: f32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DestroySessionMessage {
    pub session_id: String,
}
