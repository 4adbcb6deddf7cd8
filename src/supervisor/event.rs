use tokio::sync::mpsc;

use crate::error::StreamError;
use crate::transcode::ProcessExit;
use crate::voice::TransportState;

/// Internal events delivered to the supervisor's control loop.
///
/// Resource events carry the generation of the resource that produced them;
/// timer events carry the supervisor epoch at the time they were scheduled.
#[derive(Debug)]
pub enum SupervisorEvent {
    ProcessExited { generation: u64, exit: ProcessExit },
    SinkIdle { generation: u64 },
    SinkErrored { generation: u64, error: StreamError },
    VoiceStateChanged { generation: u64, state: TransportState },
    /// `disconnect` identifies the disconnect that started the grace period
    DisconnectGraceElapsed { epoch: u64, generation: u64, disconnect: u64 },
    RespawnDue { epoch: u64 },
    ReconnectDue { epoch: u64 },
}

pub type EventSender = mpsc::UnboundedSender<SupervisorEvent>;
