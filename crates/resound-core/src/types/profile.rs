//! Playback profiles: named, reusable configuration for one kind of sound.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{Error, Result};

/// Identity of a playback profile. Live instance counts are keyed by this.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(String);

impl ProfileId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProfileId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ProfileId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Reference to an audio clip, resolved by the rendering backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipRef(String);

impl ClipRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClipRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClipRef {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for ClipRef {
    fn from(path: String) -> Self {
        Self(path)
    }
}

/// 3D parameters of a sound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialParams {
    /// 0.0 = fully 2D, 1.0 = fully positional.
    pub blend: f32,
    /// Distance below which the sound plays at full volume.
    pub min_distance: f32,
    /// Distance at which the sound becomes inaudible.
    pub max_distance: f32,
}

impl Default for SpatialParams {
    fn default() -> Self {
        Self {
            blend: 0.0,
            min_distance: 1.0,
            max_distance: 500.0,
        }
    }
}

impl SpatialParams {
    /// Fully positional parameters with the given rolloff range.
    pub const fn positional(min_distance: f32, max_distance: f32) -> Self {
        Self {
            blend: 1.0,
            min_distance,
            max_distance,
        }
    }
}

/// Static per-sound parameters. Immutable once handed to the pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackProfile {
    /// Profile identity.
    pub id: ProfileId,
    /// Clip to play.
    pub clip: ClipRef,
    /// Baseline volume (0.0 to 1.0).
    #[serde(default = "unit")]
    pub volume: f32,
    /// Baseline pitch (playback rate multiplier).
    #[serde(default = "unit")]
    pub pitch: f32,
    /// Spatial parameters.
    #[serde(default)]
    pub spatial: SpatialParams,
    /// Output route (mixer group) name.
    #[serde(default)]
    pub route: Option<String>,
    /// Whether the clip loops until stopped.
    #[serde(default)]
    pub looping: bool,
}

const fn unit() -> f32 {
    1.0
}

impl PlaybackProfile {
    pub fn new(id: impl Into<ProfileId>, clip: impl Into<ClipRef>) -> Self {
        Self {
            id: id.into(),
            clip: clip.into(),
            volume: 1.0,
            pitch: 1.0,
            spatial: SpatialParams::default(),
            route: None,
            looping: false,
        }
    }

    #[must_use]
    pub const fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    #[must_use]
    pub const fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = pitch;
        self
    }

    #[must_use]
    pub const fn with_spatial(mut self, spatial: SpatialParams) -> Self {
        self.spatial = spatial;
        self
    }

    #[must_use]
    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    #[must_use]
    pub const fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Wrap in an `Arc` for sharing between requests.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

/// A set of profiles loaded from a JSON array, addressable by id.
#[derive(Debug, Clone, Default)]
pub struct ProfileBank {
    profiles: HashMap<ProfileId, Arc<PlaybackProfile>>,
}

impl ProfileBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON array of profiles.
    pub fn from_json(json: &str) -> Result<Self> {
        let profiles: Vec<PlaybackProfile> = serde_json::from_str(json)?;
        let mut bank = Self::new();
        for profile in profiles {
            if bank.profiles.contains_key(&profile.id) {
                return Err(Error::invalid_config(format!(
                    "duplicate profile id: {}",
                    profile.id
                )));
            }
            bank.insert(profile);
        }
        Ok(bank)
    }

    /// Load a profile bank from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let bank = Self::from_json(&json)?;
        info!("Loaded {} profiles from {}", bank.len(), path.display());
        Ok(bank)
    }

    /// Add or replace a profile.
    pub fn insert(&mut self, profile: PlaybackProfile) -> Arc<PlaybackProfile> {
        let profile = Arc::new(profile);
        self.profiles.insert(profile.id.clone(), profile.clone());
        profile
    }

    /// Look up a profile by id.
    pub fn get(&self, id: &str) -> Option<Arc<PlaybackProfile>> {
        self.profiles.get(&ProfileId::new(id)).cloned()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Iterate over all profiles in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<PlaybackProfile>> {
        self.profiles.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_defaults_from_json() {
        let bank = ProfileBank::from_json(r#"[{"id": "jump", "clip": "sfx/jump.wav"}]"#).unwrap();
        let jump = bank.get("jump").unwrap();
        assert_eq!(jump.clip.as_str(), "sfx/jump.wav");
        assert!((jump.volume - 1.0).abs() < f32::EPSILON);
        assert!((jump.pitch - 1.0).abs() < f32::EPSILON);
        assert!(!jump.looping);
        assert_eq!(jump.spatial, SpatialParams::default());
    }

    #[test]
    fn test_profile_bank_rejects_duplicates() {
        let json = r#"[
            {"id": "hit", "clip": "a.wav"},
            {"id": "hit", "clip": "b.wav"}
        ]"#;
        let err = ProfileBank::from_json(json).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_profile_builder() {
        let profile = PlaybackProfile::new("engine", "loops/engine.ogg")
            .with_volume(0.5)
            .with_route("sfx")
            .looping(true);
        assert_eq!(profile.id, ProfileId::new("engine"));
        assert_eq!(profile.route.as_deref(), Some("sfx"));
        assert!(profile.looping);
    }

    #[test]
    fn test_ids_convert_from_owned_and_borrowed() {
        assert_eq!(ProfileId::from(String::from("hit")), ProfileId::from("hit"));
        assert_eq!(ClipRef::from(String::from("a.wav")), ClipRef::from("a.wav"));
    }
}
