//! Audio system facade: the playback pool for one-shot sounds and the
//! crossfade scheduler for music, driven together by the frame loop.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::sync::Arc;

use resound_core::{
    EngineConfig, HandleFactory, PlaybackProfile, ProfileBank, Result, Track, Vec3,
};
use resound_music::CrossfadeScheduler;
use resound_pool::{HandleId, PlaybackPool, PlaybackRequest, PoolStats};
use tracing::{debug, info, warn};

/// Owns every playing sound. Constructed by `main` and torn down with
/// [`AudioSystem::dispose`].
pub struct AudioSystem<F: HandleFactory> {
    pool: PlaybackPool<F>,
    music: CrossfadeScheduler<F>,
    profiles: ProfileBank,
    disposed: bool,
}

impl<F: HandleFactory + Clone> AudioSystem<F> {
    pub fn new(config: &EngineConfig, factory: F) -> Result<Self> {
        let pool = PlaybackPool::new(config.pool.clone(), factory.clone())?;
        let music = CrossfadeScheduler::new(config.music.clone(), factory)?;
        info!("Audio system initialized");
        Ok(Self {
            pool,
            music,
            profiles: ProfileBank::new(),
            disposed: false,
        })
    }
}

impl<F: HandleFactory> AudioSystem<F> {
    #[must_use]
    pub fn with_profiles(mut self, profiles: ProfileBank) -> Self {
        self.profiles = profiles;
        self
    }

    pub const fn profiles(&self) -> &ProfileBank {
        &self.profiles
    }

    pub fn add_profile(&mut self, profile: PlaybackProfile) -> Arc<PlaybackProfile> {
        self.profiles.insert(profile)
    }

    /// Start building a play request.
    pub fn create_request(&self) -> PlaybackRequest {
        self.pool.create_request()
    }

    pub fn commit(&mut self, request: &PlaybackRequest) -> Option<HandleId> {
        if self.disposed {
            return None;
        }
        request.commit(&mut self.pool)
    }

    /// Play a registered profile at `position` with pitch jitter.
    pub fn play(&mut self, profile: &str, position: Vec3) -> Option<HandleId> {
        let Some(profile) = self.profiles.get(profile) else {
            warn!("Unknown sound profile: {profile}");
            return None;
        };
        let request = self
            .create_request()
            .with_profile(profile)
            .with_position(position)
            .with_pitch_jitter(true);
        self.commit(&request)
    }

    pub fn stop(&mut self, id: HandleId) -> bool {
        self.pool.stop(id)
    }

    /// Stop every sound effect. Music is unaffected.
    pub fn stop_all(&mut self) {
        self.pool.stop_all();
    }

    pub fn enqueue(&mut self, track: Track) {
        if !self.disposed {
            self.music.enqueue(track);
        }
    }

    pub fn play_now(&mut self, track: Track) -> bool {
        !self.disposed && self.music.play_now(track)
    }

    pub fn skip(&mut self) -> bool {
        !self.disposed && self.music.skip()
    }

    /// Drop queued music. The current track keeps playing.
    pub fn clear(&mut self) -> usize {
        self.music.clear()
    }

    /// Advance one frame.
    pub fn tick(&mut self, delta: f32) {
        if self.disposed {
            return;
        }
        let finished = self.pool.tick();
        if finished > 0 {
            debug!("{finished} sounds finished");
        }
        self.music.tick(delta);
    }

    /// Stop everything and release all playback resources. Further calls
    /// are no-ops.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.music.dispose();
        self.pool.dispose();
        self.disposed = true;
        info!("Audio system disposed");
    }

    pub const fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }

    pub const fn pool(&self) -> &PlaybackPool<F> {
        &self.pool
    }

    pub const fn music(&self) -> &CrossfadeScheduler<F> {
        &self.music
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resound_core::testing::ScriptedFactory;
    use resound_core::PoolConfig;

    fn system() -> (ScriptedFactory, AudioSystem<ScriptedFactory>) {
        let factory = ScriptedFactory::new();
        let config = EngineConfig {
            pool: PoolConfig {
                initial_capacity: 2,
                max_capacity: 8,
                concurrency_ceiling: 2,
                jitter_seed: Some(9),
            },
            ..EngineConfig::default()
        };
        let mut profiles = ProfileBank::new();
        profiles.insert(PlaybackProfile::new("shot", "sfx/shot.wav"));
        let system = AudioSystem::new(&config, factory.clone())
            .unwrap()
            .with_profiles(profiles);
        (factory, system)
    }

    #[test]
    fn test_play_by_profile_id() {
        let (factory, mut audio) = system();
        let id = audio.play("shot", Vec3::new(1.0, 0.0, 0.0)).unwrap();
        assert!(audio.pool().is_active(id));
        assert_eq!(factory.playing("sfx/shot.wav").len(), 1);
        assert!(audio.play("missing", Vec3::ZERO).is_none());
    }

    #[test]
    fn test_ceiling_applies_through_facade() {
        let (_, mut audio) = system();
        assert!(audio.play("shot", Vec3::ZERO).is_some());
        assert!(audio.play("shot", Vec3::ZERO).is_some());
        assert!(audio.play("shot", Vec3::ZERO).is_none());
        assert_eq!(audio.stats().active, 2);
    }

    #[test]
    fn test_tick_releases_finished_sounds_and_advances_music() {
        let (factory, mut audio) = system();
        audio.play("shot", Vec3::ZERO).unwrap();
        audio.enqueue(Track::from_clip("music/a.ogg"));
        audio.enqueue(Track::from_clip("music/b.ogg"));

        let shot = factory.playing("sfx/shot.wav").pop().unwrap();
        let song = factory.playing("music/a.ogg").pop().unwrap();
        shot.finish();
        song.finish();
        audio.tick(1.0 / 60.0);

        assert_eq!(audio.stats().active, 0);
        assert_eq!(audio.music().now_playing().unwrap().id, "music/b.ogg");
    }

    #[test]
    fn test_stop_all_leaves_music() {
        let (factory, mut audio) = system();
        audio.play("shot", Vec3::ZERO).unwrap();
        audio.play_now(Track::from_clip("music/a.ogg"));
        audio.stop_all();

        assert_eq!(audio.stats().active, 0);
        assert_eq!(factory.playing("music/a.ogg").len(), 1);
    }

    #[test]
    fn test_dispose_is_final() {
        let (factory, mut audio) = system();
        audio.play("shot", Vec3::ZERO).unwrap();
        audio.enqueue(Track::from_clip("music/a.ogg"));
        audio.dispose();
        audio.dispose();

        assert!(audio.is_disposed());
        assert_eq!(factory.playing_count(), 0);
        assert_eq!(audio.pool().outstanding(), 0);
        assert!(audio.play("shot", Vec3::ZERO).is_none());
        assert!(!audio.play_now(Track::from_clip("music/b.ogg")));
        audio.tick(0.1);
    }
}
