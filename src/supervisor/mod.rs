//! Stream supervisor
//!
//! This module provides the `StreamSupervisor` that keeps the stream alive:
//! - Voice session lifecycle (connect, disconnect grace, reconnect loop)
//! - Transcoder lifecycle (spawn, hard kill, respawn after failure)
//! - Playback binding between the two
//! - Serialized operator commands and status snapshots

mod event;
mod handle;
mod settings;
mod state;
mod supervisor;

pub use event::{EventSender, SupervisorEvent};
pub use handle::SupervisorHandle;
pub use settings::SupervisorSettings;
pub use state::{StatusSnapshot, SupervisorState, SupervisorStats};
pub use supervisor::{StreamSupervisor, SupervisorDeps};
