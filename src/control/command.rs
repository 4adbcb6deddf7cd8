use crate::error::{Result, StreamError};

pub const HELP: &str = "Commands:\n\
setvc <channelId> - set the voice channel\n\
switchvc <channelId> - move the stream to another voice channel\n\
setstream <url> - set the stream URL\n\
setcookie <header value> - set the cookie header (empty to clear)\n\
start - start streaming\n\
stop - stop streaming\n\
restart - restart the transcoder and voice session\n\
reconnect - reconnect the voice session only\n\
volume <0.0-2.0> - set playback volume\n\
status - show current state\n\
info - show counters\n\
help - show this message";

pub const VOLUME_USAGE: &str = "volume <0.0-2.0>";

/// A parsed operator command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetVc { channel_id: String, switch: bool },
    SetStream { url: String },
    SetCookie { cookie: Option<String> },
    Start,
    Stop,
    Restart,
    Reconnect,
    Volume { volume: f32 },
    Status,
    Info,
    Help,
}

impl Command {
    /// Parse a whitespace-separated command line. Verbs are case-insensitive.
    pub fn parse(text: &str) -> Result<Self> {
        let mut tokens = text.split_whitespace();
        let verb = tokens
            .next()
            .ok_or_else(|| StreamError::UnknownCommand(String::new()))?
            .to_lowercase();
        let args: Vec<&str> = tokens.collect();

        let command = match verb.as_str() {
            "setvc" | "switchvc" => {
                let channel_id = single_arg(&args).ok_or(StreamError::Usage(if verb == "setvc" {
                    "setvc <channelId>"
                } else {
                    "switchvc <channelId>"
                }))?;
                Command::SetVc {
                    channel_id: channel_id.to_string(),
                    switch: verb == "switchvc",
                }
            }
            "setstream" => {
                let url = single_arg(&args).ok_or(StreamError::Usage("setstream <url>"))?;
                Command::SetStream {
                    url: url.to_string(),
                }
            }
            "setcookie" => {
                let cookie = args.join(" ");
                Command::SetCookie {
                    cookie: (!cookie.is_empty()).then_some(cookie),
                }
            }
            "start" => Command::Start,
            "stop" => Command::Stop,
            "restart" => Command::Restart,
            "reconnect" => Command::Reconnect,
            "volume" => {
                let volume = single_arg(&args)
                    .and_then(|v| v.parse::<f32>().ok())
                    .ok_or(StreamError::Usage(VOLUME_USAGE))?;
                Command::Volume { volume }
            }
            "status" => Command::Status,
            "info" => Command::Info,
            "help" => Command::Help,
            _ => return Err(StreamError::UnknownCommand(verb)),
        };

        Ok(command)
    }
}

fn single_arg<'a>(args: &[&'a str]) -> Option<&'a str> {
    match args {
        [only] => Some(*only),
        _ => None,
    }
}
