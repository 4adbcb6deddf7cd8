use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{AudioOutput, ProcessExit, ProcessState, Transcoder};
use crate::error::{Result, StreamError};
use crate::stream::MediaSourceConfig;
use crate::supervisor::{EventSender, SupervisorEvent};

/// Owner of the (at most one) live transcoder process.
///
/// Each spawned process gets a new generation number. A watcher task owns the
/// child and reports a natural exit as [`SupervisorEvent::ProcessExited`]; an
/// explicit kill is not reported.
pub struct TranscodeProcess {
    transcoder: Arc<dyn Transcoder>,
    events: EventSender,
    generation: u64,
    state: ProcessState,
    live: Option<LiveProcess>,
    launches: u64,
}

struct LiveProcess {
    pid: Option<u32>,
    kill_tx: Option<oneshot::Sender<()>>,
    watcher: JoinHandle<()>,
}

impl TranscodeProcess {
    pub fn new(transcoder: Arc<dyn Transcoder>, events: EventSender) -> Self {
        Self {
            transcoder,
            events,
            generation: 0,
            state: ProcessState::NotStarted,
            live: None,
            launches: 0,
        }
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_running(&self) -> bool {
        self.state == ProcessState::Running
    }

    pub fn pid(&self) -> Option<u32> {
        self.live.as_ref().and_then(|live| live.pid)
    }

    /// Total processes launched over the supervisor's lifetime
    pub fn launches(&self) -> u64 {
        self.launches
    }

    /// Kill any previous instance, then launch a new one.
    ///
    /// Returns the new generation and the process's encoded output.
    pub async fn spawn(&mut self, source: &MediaSourceConfig) -> Result<(u64, AudioOutput)> {
        self.kill().await;

        let mut child = self.transcoder.launch(source).await?;
        let Some(output) = child.take_output() else {
            if let Err(e) = child.kill().await {
                warn!("Failed to kill transcoder without output: {}", e);
            }
            return Err(StreamError::ProcessSpawnFailure(std::io::Error::other(
                "transcoder has no stdout",
            )));
        };

        self.generation += 1;
        self.launches += 1;
        let generation = self.generation;
        let pid = child.id();
        let events = self.events.clone();
        let (kill_tx, mut kill_rx) = oneshot::channel::<()>();

        let watcher = tokio::spawn(async move {
            tokio::select! {
                result = child.wait() => {
                    let exit = match result {
                        Ok(exit) => exit,
                        Err(e) => {
                            error!("Failed to wait on transcoder: {}", e);
                            ProcessExit { code: None, signal: None }
                        }
                    };
                    let _ = events.send(SupervisorEvent::ProcessExited { generation, exit });
                }
                _ = &mut kill_rx => {
                    if let Err(e) = child.kill().await {
                        warn!("Failed to kill transcoder: {}", e);
                    }
                }
            }
        });

        self.live = Some(LiveProcess {
            pid,
            kill_tx: Some(kill_tx),
            watcher,
        });
        self.state = ProcessState::Running;

        info!(
            "Transcoder {} started (generation {}, pid {:?})",
            self.transcoder.name(),
            generation,
            pid
        );

        Ok((generation, output))
    }

    /// Hard-kill the live process and wait until it has been reaped.
    ///
    /// Safe to call when nothing is running.
    pub async fn kill(&mut self) {
        let Some(mut live) = self.live.take() else {
            return;
        };

        if let Some(kill_tx) = live.kill_tx.take() {
            // Err means the watcher already saw the process exit
            let _ = kill_tx.send(());
        }
        if let Err(e) = live.watcher.await {
            error!("Transcoder watcher panicked: {}", e);
        }

        if self.state == ProcessState::Running {
            self.state = ProcessState::Killed;
        }
        debug!("Transcoder generation {} killed", self.generation);
    }

    /// Record a natural exit reported by the watcher.
    ///
    /// Returns false when the report is for a process that is no longer ours.
    pub fn mark_exited(&mut self, generation: u64, exit: &ProcessExit) -> bool {
        if generation != self.generation || self.live.is_none() {
            return false;
        }
        self.live = None;
        self.state = if exit.is_clean() {
            ProcessState::ExitedClean
        } else {
            ProcessState::ExitedError
        };
        true
    }
}
