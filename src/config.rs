use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

use crate::stream::{MediaSourceConfig, TargetChannel};
use crate::supervisor::SupervisorSettings;
use crate::transcode::TranscoderSettings;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    pub nats: NatsConfig,
    pub control: ControlConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub transcoder: TranscoderConfig,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,
    #[serde(default)]
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NatsConfig {
    pub url: String,
    #[serde(default)]
    pub token: Option<String>,
    /// Subject prefix of the voice gateway
    #[serde(default = "default_voice_prefix")]
    pub voice_prefix: String,
}

#[derive(Debug, Deserialize)]
pub struct ControlConfig {
    /// The single author allowed to issue commands
    pub operator_id: String,
    #[serde(default = "default_control_subject")]
    pub subject: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct StreamConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub cookie: Option<String>,
    #[serde(default)]
    pub volume: Option<f32>,
    #[serde(default)]
    pub channel_id: Option<String>,
    /// Start streaming as soon as the service is up
    #[serde(default)]
    pub autostart: bool,
}

#[derive(Debug, Deserialize)]
pub struct TranscoderConfig {
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default = "default_codec")]
    pub codec: String,
    #[serde(default)]
    pub bitrate: Option<String>,
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            codec: default_codec(),
            bitrate: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SupervisorConfig {
    #[serde(default = "default_respawn_delay")]
    pub respawn_delay_secs: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_disconnect_grace")]
    pub disconnect_grace_secs: u64,
    #[serde(default = "default_reconnect_backoff")]
    pub reconnect_backoff_secs: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            respawn_delay_secs: default_respawn_delay(),
            connect_timeout_secs: default_connect_timeout(),
            disconnect_grace_secs: default_disconnect_grace(),
            reconnect_backoff_secs: default_reconnect_backoff(),
        }
    }
}

fn default_service_name() -> String {
    "voice-relay".to_string()
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_voice_prefix() -> String {
    "voice".to_string()
}

fn default_control_subject() -> String {
    "voice-relay.control".to_string()
}

fn default_program() -> String {
    "ffmpeg".to_string()
}

fn default_codec() -> String {
    "libopus".to_string()
}

fn default_respawn_delay() -> u64 {
    5
}

fn default_connect_timeout() -> u64 {
    20
}

fn default_disconnect_grace() -> u64 {
    20
}

fn default_reconnect_backoff() -> u64 {
    30
}

impl Config {
    /// Load from a TOML file, then apply `VOICE_RELAY__SECTION__KEY`
    /// environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(
                config::Environment::with_prefix("VOICE_RELAY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn supervisor_settings(&self) -> SupervisorSettings {
        SupervisorSettings {
            respawn_delay: Duration::from_secs(self.supervisor.respawn_delay_secs),
            connect_timeout: Duration::from_secs(self.supervisor.connect_timeout_secs),
            disconnect_grace: Duration::from_secs(self.supervisor.disconnect_grace_secs),
            reconnect_backoff: Duration::from_secs(self.supervisor.reconnect_backoff_secs),
        }
    }

    pub fn transcoder_settings(&self) -> TranscoderSettings {
        TranscoderSettings {
            program: self.transcoder.program.clone(),
            codec: self.transcoder.codec.clone(),
            bitrate: self.transcoder.bitrate.clone(),
        }
    }

    /// Initial media source; an out-of-range volume falls back to 1.0
    pub fn media_source(&self) -> MediaSourceConfig {
        let mut source = MediaSourceConfig {
            url: self.stream.url.clone().unwrap_or_default(),
            cookie: self.stream.cookie.clone().filter(|c| !c.trim().is_empty()),
            ..MediaSourceConfig::default()
        };
        if let Some(volume) = self.stream.volume {
            match crate::stream::validate_volume(volume) {
                Ok(volume) => source.volume = volume,
                Err(e) => tracing::warn!("Ignoring configured volume: {}", e),
            }
        }
        source
    }

    pub fn target_channel(&self) -> Option<TargetChannel> {
        self.stream
            .channel_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .map(TargetChannel::new)
    }
}
