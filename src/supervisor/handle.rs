use tokio::sync::{mpsc, oneshot};

use super::state::{StatusSnapshot, SupervisorStats};
use crate::error::{Result, StreamError};
use crate::stream::{SourceUpdate, TargetChannel};

pub(crate) enum Request {
    SetTarget {
        target: TargetChannel,
        reply: oneshot::Sender<Result<()>>,
    },
    SetSource {
        update: SourceUpdate,
        reply: oneshot::Sender<Result<()>>,
    },
    Start {
        reply: oneshot::Sender<Result<()>>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
    Restart {
        reply: oneshot::Sender<Result<()>>,
    },
    Reconnect {
        reply: oneshot::Sender<Result<()>>,
    },
    SetVolume {
        volume: f32,
        reply: oneshot::Sender<Result<bool>>,
    },
    Status {
        reply: oneshot::Sender<StatusSnapshot>,
    },
    Stats {
        reply: oneshot::Sender<SupervisorStats>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable front door to a running [`StreamSupervisor`](super::StreamSupervisor).
///
/// Every call is queued onto the supervisor's control loop, so compound
/// operations never overlap.
#[derive(Clone)]
pub struct SupervisorHandle {
    tx: mpsc::Sender<Request>,
}

impl SupervisorHandle {
    pub(crate) fn new(tx: mpsc::Sender<Request>) -> Self {
        Self { tx }
    }

    async fn call<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Request) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| StreamError::SupervisorUnavailable)?;
        rx.await.map_err(|_| StreamError::SupervisorUnavailable)
    }

    /// Store the target; a running stream is moved to it before this returns
    /// control to the loop.
    pub async fn set_target(&self, target: TargetChannel) -> Result<()> {
        self.call(|reply| Request::SetTarget { target, reply }).await?
    }

    pub async fn set_source(&self, update: SourceUpdate) -> Result<()> {
        self.call(|reply| Request::SetSource { update, reply }).await?
    }

    pub async fn start(&self) -> Result<()> {
        self.call(|reply| Request::Start { reply }).await?
    }

    pub async fn stop(&self) -> Result<()> {
        self.call(|reply| Request::Stop { reply }).await
    }

    pub async fn restart(&self) -> Result<()> {
        self.call(|reply| Request::Restart { reply }).await?
    }

    /// Re-establish only the voice session
    pub async fn reconnect(&self) -> Result<()> {
        self.call(|reply| Request::Reconnect { reply }).await?
    }

    /// Returns `Ok(false)` when nothing is playing
    pub async fn set_volume(&self, volume: f32) -> Result<bool> {
        self.call(|reply| Request::SetVolume { volume, reply }).await?
    }

    pub async fn status(&self) -> Result<StatusSnapshot> {
        self.call(|reply| Request::Status { reply }).await
    }

    pub async fn stats(&self) -> Result<SupervisorStats> {
        self.call(|reply| Request::Stats { reply }).await
    }

    /// Stop streaming and end the control loop
    pub async fn shutdown(&self) -> Result<()> {
        self.call(|reply| Request::Shutdown { reply }).await
    }
}
