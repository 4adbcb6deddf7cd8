use std::time::Duration;

/// Recovery timings for the stream supervisor
#[derive(Debug, Clone, PartialEq)]
pub struct SupervisorSettings {
    /// Wait before replacing a transcoder that exited or went idle
    /// Default: 5 seconds
    pub respawn_delay: Duration,

    /// How long a new voice connection may take to become ready
    /// Default: 20 seconds
    pub connect_timeout: Duration,

    /// How long a dropped voice connection gets to start recovering by itself
    /// Default: 20 seconds
    pub disconnect_grace: Duration,

    /// Wait between explicit reconnect attempts
    /// Default: 30 seconds
    pub reconnect_backoff: Duration,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            respawn_delay: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(20),
            disconnect_grace: Duration::from_secs(20),
            reconnect_backoff: Duration::from_secs(30),
        }
    }
}
