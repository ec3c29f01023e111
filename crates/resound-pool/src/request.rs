//! Immutable description of one play intent.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::sync::Arc;

use glam::Vec3;
use resound_core::{HandleFactory, PlaybackProfile};
use tracing::debug;

use crate::handle::HandleId;
use crate::jitter::{Jitter, JitterRange};
use crate::pool::PlaybackPool;

/// A play request. Every `with_*` method returns a modified copy and leaves
/// the original untouched, so partially configured requests can be kept and
/// branched freely. Only [`PlaybackRequest::commit`] touches the pool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackRequest {
    profile: Option<Arc<PlaybackProfile>>,
    position: Vec3,
    jitter: Jitter,
}

impl PlaybackRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile(&self) -> Option<&Arc<PlaybackProfile>> {
        self.profile.as_ref()
    }

    pub const fn position(&self) -> Vec3 {
        self.position
    }

    pub const fn jitter(&self) -> Jitter {
        self.jitter
    }

    pub fn with_profile(&self, profile: Arc<PlaybackProfile>) -> Self {
        Self {
            profile: Some(profile),
            ..self.clone()
        }
    }

    pub fn with_position(&self, position: Vec3) -> Self {
        Self {
            position,
            ..self.clone()
        }
    }

    /// Enable or disable pitch jitter with the default range.
    pub fn with_pitch_jitter(&self, enabled: bool) -> Self {
        self.with_jitter(Jitter {
            pitch: enabled.then(JitterRange::default),
            ..self.jitter
        })
    }

    pub fn with_pitch_jitter_range(&self, min: f32, max: f32) -> Self {
        self.with_jitter(Jitter {
            pitch: Some(JitterRange::new(min, max)),
            ..self.jitter
        })
    }

    /// Enable or disable volume jitter with the default range.
    pub fn with_volume_jitter(&self, enabled: bool) -> Self {
        self.with_jitter(Jitter {
            volume: enabled.then(JitterRange::default),
            ..self.jitter
        })
    }

    pub fn with_volume_jitter_range(&self, min: f32, max: f32) -> Self {
        self.with_jitter(Jitter {
            volume: Some(JitterRange::new(min, max)),
            ..self.jitter
        })
    }

    fn with_jitter(&self, jitter: Jitter) -> Self {
        Self {
            jitter,
            ..self.clone()
        }
    }

    /// Resolve the request against the pool.
    ///
    /// Returns `None` without starting anything or changing any count when
    /// the profile is unset, its concurrency ceiling is reached, or the pool
    /// has no handle to give.
    pub fn commit<F: HandleFactory>(&self, pool: &mut PlaybackPool<F>) -> Option<HandleId> {
        let Some(profile) = &self.profile else {
            debug!("Play request declined: no profile");
            return None;
        };
        if !pool.can_play(Some(profile.as_ref())) {
            debug!(
                "Play request declined: {} at concurrency ceiling ({})",
                profile.id,
                pool.config().concurrency_ceiling
            );
            return None;
        }

        let id = pool.acquire()?;
        // Counted in the same step as the start so no admission check can
        // observe a started sound that is not yet counted.
        pool.increment_concurrency(&profile.id);
        pool.start_handle(id, profile.clone(), self.position, &self.jitter);
        Some(id)
    }
}
