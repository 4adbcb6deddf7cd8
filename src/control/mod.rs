//! Operator control: command parsing and dispatch to the supervisor

mod command;
mod router;

pub use command::{Command, HELP, VOLUME_USAGE};
pub use router::CommandRouter;
