use crate::error::{Result, StreamError};
use serde::{Deserialize, Serialize};

pub const MIN_VOLUME: f32 = 0.0;
pub const MAX_VOLUME: f32 = 2.0;

/// The media the transcoder pulls from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSourceConfig {
    /// Remote media URL handed to the transcoder
    pub url: String,

    /// Cookie header value, sent only when present
    pub cookie: Option<String>,

    /// Playback gain, 0.0 to 2.0
    pub volume: f32,
}

impl Default for MediaSourceConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            cookie: None,
            volume: 1.0,
        }
    }
}

impl MediaSourceConfig {
    /// Merge an update into this config. Latest value wins.
    pub fn apply(&mut self, update: SourceUpdate) {
        if let Some(url) = update.url {
            self.url = url;
        }
        if let Some(cookie) = update.cookie {
            self.cookie = cookie.filter(|c| !c.trim().is_empty());
        }
    }

    pub fn has_url(&self) -> bool {
        !self.url.trim().is_empty()
    }

    /// Snapshot safe to show an operator (cookie reduced to presence)
    pub fn summary(&self) -> SourceSummary {
        SourceSummary {
            url: self.url.clone(),
            cookie_set: self.cookie.is_some(),
            volume: self.volume,
        }
    }
}

/// Partial change to a [`MediaSourceConfig`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceUpdate {
    pub url: Option<String>,
    /// `Some(None)` clears the cookie
    pub cookie: Option<Option<String>>,
}

impl SourceUpdate {
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn cookie(cookie: Option<String>) -> Self {
        Self {
            cookie: Some(cookie),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSummary {
    pub url: String,
    pub cookie_set: bool,
    pub volume: f32,
}

/// Reject volumes outside [0.0, 2.0]. Out-of-range values are never clamped.
pub fn validate_volume(volume: f32) -> Result<f32> {
    if volume.is_finite() && (MIN_VOLUME..=MAX_VOLUME).contains(&volume) {
        Ok(volume)
    } else {
        Err(StreamError::InvalidVolume(volume))
    }
}
