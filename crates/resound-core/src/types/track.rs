//! Music track type.

use serde::{Deserialize, Serialize};

use super::ClipRef;

/// A music track played through the crossfade scheduler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    /// Track identifier.
    pub id: String,
    /// Clip to stream.
    pub clip: ClipRef,
    /// Baseline volume (0.0 to 1.0) applied on top of the fade gain.
    #[serde(default = "full_volume")]
    pub volume: f32,
}

const fn full_volume() -> f32 {
    1.0
}

impl Track {
    pub fn new(id: impl Into<String>, clip: impl Into<ClipRef>) -> Self {
        Self {
            id: id.into(),
            clip: clip.into(),
            volume: 1.0,
        }
    }

    /// Use the clip path as the track id.
    pub fn from_clip(clip: impl Into<String>) -> Self {
        let clip = clip.into();
        Self::new(clip.clone(), clip)
    }

    #[must_use]
    pub const fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }
}
