//! Fully resolved parameters handed to a rendering primitive.

use glam::Vec3;

use super::{ClipRef, PlaybackProfile, SpatialParams, Track};

/// Everything a rendering primitive needs to start one sound.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceParams {
    pub clip: ClipRef,
    pub volume: f32,
    pub pitch: f32,
    pub position: Vec3,
    pub spatial: SpatialParams,
    pub route: Option<String>,
    pub looping: bool,
}

impl VoiceParams {
    /// Resolve a profile at a world position. Jitter is applied afterwards.
    pub fn from_profile(profile: &PlaybackProfile, position: Vec3) -> Self {
        Self {
            clip: profile.clip.clone(),
            volume: profile.volume,
            pitch: profile.pitch,
            position,
            spatial: profile.spatial,
            route: profile.route.clone(),
            looping: profile.looping,
        }
    }

    /// Non-positional, non-looping parameters for a music track at the given gain.
    pub fn for_track(track: &Track, volume: f32) -> Self {
        Self {
            clip: track.clip.clone(),
            volume,
            pitch: 1.0,
            position: Vec3::ZERO,
            spatial: SpatialParams::default(),
            route: Some("music".to_string()),
            looping: false,
        }
    }
}
