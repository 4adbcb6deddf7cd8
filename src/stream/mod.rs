//! Stream target data: what to play and where to play it

mod source;
mod target;

pub use source::{validate_volume, MediaSourceConfig, SourceSummary, SourceUpdate, MAX_VOLUME, MIN_VOLUME};
pub use target::TargetChannel;
