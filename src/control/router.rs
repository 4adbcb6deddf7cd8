use tracing::{info, warn};

use super::command::{Command, HELP, VOLUME_USAGE};
use crate::error::StreamError;
use crate::stream::{validate_volume, SourceUpdate, TargetChannel};
use crate::supervisor::SupervisorHandle;

/// Turns operator messages into supervisor calls and reply text
#[derive(Clone)]
pub struct CommandRouter {
    supervisor: SupervisorHandle,
    operator_id: String,
}

impl CommandRouter {
    pub fn new(supervisor: SupervisorHandle, operator_id: impl Into<String>) -> Self {
        Self {
            supervisor,
            operator_id: operator_id.into(),
        }
    }

    pub fn is_authorized(&self, author: &str) -> bool {
        author == self.operator_id
    }

    /// Handle one message. Returns the reply, or `None` when the author is
    /// not the operator.
    pub async fn handle(&self, author: &str, text: &str) -> Option<String> {
        if !self.is_authorized(author) {
            warn!("Ignoring control message from unauthorized author {}", author);
            return None;
        }
        Some(self.dispatch(text).await)
    }

    /// Execute a command line and produce exactly one reply
    pub async fn dispatch(&self, text: &str) -> String {
        let command = match Command::parse(text) {
            Ok(command) => command,
            Err(StreamError::Usage(usage)) => return format!("Usage: {}", usage),
            Err(StreamError::UnknownCommand(verb)) if verb.is_empty() => {
                return "Empty command. Type `help` for a list of commands.".to_string()
            }
            Err(e) => return format!("Error: {}. Type `help` for a list of commands.", e),
        };

        info!("Operator command: {:?}", command);
        self.execute(command).await
    }

    async fn execute(&self, command: Command) -> String {
        let sup = &self.supervisor;

        match command {
            Command::SetVc { channel_id, switch } => {
                match sup.set_target(TargetChannel::new(channel_id.clone())).await {
                    Ok(()) if switch => format!("Switched VC to {}", channel_id),
                    Ok(()) => format!("VC set to {}", channel_id),
                    Err(e) => format!("Failed to set VC: {}", e),
                }
            }
            Command::SetStream { url } => match sup.set_source(SourceUpdate::url(url.clone())).await {
                Ok(()) => format!("Stream set to {}", url),
                Err(e) => format!("Failed to set stream: {}", e),
            },
            Command::SetCookie { cookie } => {
                let clearing = cookie.is_none();
                match sup.set_source(SourceUpdate::cookie(cookie)).await {
                    Ok(()) if clearing => "Cookie cleared".to_string(),
                    Ok(()) => "Cookie set".to_string(),
                    Err(e) => format!("Failed to set cookie: {}", e),
                }
            }
            Command::Start => match sup.start().await {
                Ok(()) => "Streaming started".to_string(),
                Err(StreamError::AlreadyStreaming) => "Already streaming".to_string(),
                Err(e) => failure("start", &e),
            },
            Command::Stop => match sup.stop().await {
                Ok(()) => "Streaming stopped".to_string(),
                Err(e) => failure("stop", &e),
            },
            Command::Restart => match sup.restart().await {
                Ok(()) => "Streaming restarted".to_string(),
                Err(e) => failure("restart", &e),
            },
            Command::Reconnect => match sup.reconnect().await {
                Ok(()) => "Voice reconnected".to_string(),
                Err(StreamError::NotStreaming) => "Not streaming".to_string(),
                Err(e) => failure("reconnect", &e),
            },
            Command::Volume { volume } => {
                if validate_volume(volume).is_err() {
                    return format!("Usage: {}", VOLUME_USAGE);
                }
                match sup.set_volume(volume).await {
                    Ok(true) => format!("Volume set to {}", volume),
                    Ok(false) => "Nothing is playing".to_string(),
                    Err(StreamError::InvalidVolume(_)) => format!("Usage: {}", VOLUME_USAGE),
                    Err(e) => format!("Failed to set volume: {}", e),
                }
            }
            Command::Status => match sup.status().await {
                Ok(status) => status.render(),
                Err(e) => format!("Error: {}", e),
            },
            Command::Info => match sup.stats().await {
                Ok(stats) => stats.render(),
                Err(e) => format!("Error: {}", e),
            },
            Command::Help => HELP.to_string(),
        }
    }
}

fn failure(action: &str, error: &StreamError) -> String {
    if error.is_retryable() {
        format!("Failed to {}: {} (retrying automatically)", action, error)
    } else {
        format!("Failed to {}: {}", action, error)
    }
}
