//! Bounded pool of playback handles with per-profile admission control.
//!
//! The pool is driven from a single logical thread: the host calls
//! [`PlaybackPool::tick`] once per frame, which polls every running
//! completion watch and releases handles whose sound has ended.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use glam::Vec3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use resound_core::{HandleFactory, PlaybackProfile, PoolConfig, ProfileId, Result};
use tracing::{debug, info, trace};

use crate::handle::{HandleId, PlaybackHandle, WatchPoll};
use crate::jitter::Jitter;
use crate::request::PlaybackRequest;

type Handle<F> = PlaybackHandle<<F as HandleFactory>::Primitive>;

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Handles currently playing.
    pub active: usize,
    /// Handles pooled and ready for reuse.
    pub idle: usize,
    /// Handles in existence (active + idle).
    pub outstanding: usize,
    /// Live instance count per profile. Profiles with no live instance are absent.
    pub live: HashMap<ProfileId, usize>,
}

/// Owns every playback handle and the per-profile live counts.
pub struct PlaybackPool<F: HandleFactory> {
    config: PoolConfig,
    factory: F,
    /// Handle storage. `None` marks a slot freed by `shrink`.
    slots: Vec<Option<Handle<F>>>,
    /// Idle slots, least recently released first.
    idle: VecDeque<usize>,
    /// Active slots in acquisition order.
    active: Vec<usize>,
    /// Slots freed by `shrink`, available for new handles.
    free_slots: Vec<usize>,
    live_counts: HashMap<ProfileId, usize>,
    outstanding: usize,
    next_ticket: u64,
    rng: ChaCha8Rng,
}

impl<F: HandleFactory> PlaybackPool<F> {
    /// Create a pool and pre-warm `initial_capacity` handles.
    pub fn new(config: PoolConfig, factory: F) -> Result<Self> {
        config.validate()?;

        let rng = match config.jitter_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_os_rng(),
        };

        let mut pool = Self {
            slots: Vec::with_capacity(config.initial_capacity),
            idle: VecDeque::with_capacity(config.initial_capacity),
            active: Vec::new(),
            free_slots: Vec::new(),
            live_counts: HashMap::new(),
            outstanding: 0,
            next_ticket: 1,
            rng,
            config,
            factory,
        };

        for _ in 0..pool.config.initial_capacity {
            let index = pool.create_handle();
            pool.idle.push_back(index);
        }

        info!(
            "Playback pool ready: {} handles, max {}, ceiling {} per profile",
            pool.outstanding, pool.config.max_capacity, pool.config.concurrency_ceiling
        );
        Ok(pool)
    }

    pub const fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Start building a play request.
    pub fn create_request(&self) -> PlaybackRequest {
        PlaybackRequest::new()
    }

    /// Build and commit a request for `profile` at `position` without jitter.
    pub fn play(&mut self, profile: &Arc<PlaybackProfile>, position: Vec3) -> Option<HandleId> {
        PlaybackRequest::new()
            .with_profile(profile.clone())
            .with_position(position)
            .commit(self)
    }

    /// Whether a new instance of `profile` would be admitted.
    pub fn can_play(&self, profile: Option<&PlaybackProfile>) -> bool {
        profile.is_some_and(|p| self.live_count(&p.id) < self.config.concurrency_ceiling)
    }

    /// Hand out an idle handle, growing the pool if allowed.
    ///
    /// Returns `None` when no handle is idle and the pool is at maximum
    /// capacity; callers treat that as "cannot play now".
    pub(crate) fn acquire(&mut self) -> Option<HandleId> {
        let index = if let Some(index) = self.idle.pop_front() {
            index
        } else if self.outstanding < self.config.max_capacity {
            let index = self.create_handle();
            debug!("Playback pool grew to {} handles", self.outstanding);
            index
        } else {
            debug!(
                "Playback pool exhausted ({} handles active)",
                self.active.len()
            );
            return None;
        };

        let ticket = self.next_ticket;
        self.next_ticket += 1;

        let handle = self.slots[index].as_mut()?;
        handle.activate(ticket);
        self.active.push(index);
        Some(HandleId::new(index, ticket))
    }

    /// Configure and start the sound on an acquired handle.
    pub(crate) fn start_handle(
        &mut self,
        id: HandleId,
        profile: Arc<PlaybackProfile>,
        position: Vec3,
        jitter: &Jitter,
    ) -> bool {
        let Some(handle) = Self::lookup_mut(&mut self.slots, id) else {
            return false;
        };
        if !handle.is_active() {
            return false;
        }
        handle.start(profile, position, jitter, &mut self.rng);
        true
    }

    /// Count one started instance of `profile`.
    pub(crate) fn increment_concurrency(&mut self, profile: &ProfileId) {
        *self.live_counts.entry(profile.clone()).or_insert(0) += 1;
    }

    fn decrement_concurrency(&mut self, profile: &ProfileId) {
        if let Some(count) = self.live_counts.get_mut(profile) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.live_counts.remove(profile);
            }
        }
    }

    /// Return a handle to the pool. Idempotent: releasing an idle handle or a
    /// stale id does nothing. Returns whether anything was released.
    pub fn release(&mut self, id: HandleId) -> bool {
        let Some(handle) = Self::lookup_mut(&mut self.slots, id) else {
            return false;
        };
        if !handle.is_active() {
            return false;
        }

        if let Some(profile) = handle.deactivate() {
            self.decrement_concurrency(&profile.id);
        }
        self.active.retain(|&index| index != id.index());
        // `acquire` never grows past `max_capacity`, so the idle set always
        // has room for the returned handle.
        self.idle.push_back(id.index());
        true
    }

    /// Stop one sound and release its handle. No-op for stale ids.
    ///
    /// Releasing cancels the completion watch before halting the primitive,
    /// so the watch can never release the same handle again.
    pub fn stop(&mut self, id: HandleId) -> bool {
        self.release(id)
    }

    /// Stop every active sound.
    pub fn stop_all(&mut self) {
        let snapshot: Vec<HandleId> = self.active_ids();
        if !snapshot.is_empty() {
            debug!("Stopping {} active sounds", snapshot.len());
        }
        for id in snapshot {
            self.stop(id);
        }
    }

    /// Poll every running completion watch once and release handles whose
    /// sound ended on its own. Returns the number released.
    pub fn tick(&mut self) -> usize {
        let snapshot = self.active_ids();
        let mut released = 0;
        for id in snapshot {
            let finished = Self::lookup_mut(&mut self.slots, id)
                .is_some_and(|handle| handle.poll_watch() == WatchPoll::Finished);
            if finished && self.release(id) {
                trace!("Handle {} finished naturally", id.index());
                released += 1;
            }
        }
        released
    }

    /// Destroy idle handles until no more than `initial_capacity` remain
    /// outstanding. Returns the number destroyed.
    pub fn shrink(&mut self) -> usize {
        let mut destroyed = 0;
        while self.outstanding > self.config.initial_capacity {
            let Some(index) = self.idle.pop_back() else {
                break;
            };
            self.destroy_handle(index);
            destroyed += 1;
        }
        if destroyed > 0 {
            debug!("Shrank playback pool by {destroyed} handles");
        }
        destroyed
    }

    /// Stop everything and destroy every handle.
    pub fn dispose(&mut self) {
        self.stop_all();
        self.slots.clear();
        self.idle.clear();
        self.active.clear();
        self.free_slots.clear();
        self.live_counts.clear();
        self.outstanding = 0;
        info!("Playback pool disposed");
    }

    /// Live instance count of a profile.
    pub fn live_count(&self, profile: &ProfileId) -> usize {
        self.live_counts.get(profile).copied().unwrap_or(0)
    }

    /// Number of handles currently playing.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Number of pooled handles ready for reuse.
    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    /// Number of handles in existence.
    pub const fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Ids of all active handles, in acquisition order.
    pub fn active_ids(&self) -> Vec<HandleId> {
        self.active
            .iter()
            .filter_map(|&index| {
                let handle = self.slots.get(index)?.as_ref()?;
                Some(HandleId::new(index, handle.ticket()))
            })
            .collect()
    }

    /// Whether `id` still refers to a playing acquisition.
    pub fn is_active(&self, id: HandleId) -> bool {
        self.handle(id).is_some_and(PlaybackHandle::is_active)
    }

    /// The handle behind `id`, if the id is current.
    pub fn handle(&self, id: HandleId) -> Option<&Handle<F>> {
        self.slots
            .get(id.index())?
            .as_ref()
            .filter(|handle| handle.ticket() == id.ticket())
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            active: self.active.len(),
            idle: self.idle.len(),
            outstanding: self.outstanding,
            live: self.live_counts.clone(),
        }
    }

    fn lookup_mut(slots: &mut [Option<Handle<F>>], id: HandleId) -> Option<&mut Handle<F>> {
        slots
            .get_mut(id.index())?
            .as_mut()
            .filter(|handle| handle.ticket() == id.ticket())
    }

    fn create_handle(&mut self) -> usize {
        let handle = PlaybackHandle::new(self.factory.create());
        self.outstanding += 1;
        if let Some(index) = self.free_slots.pop() {
            self.slots[index] = Some(handle);
            index
        } else {
            self.slots.push(Some(handle));
            self.slots.len() - 1
        }
    }

    fn destroy_handle(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            if slot.take().is_some() {
                self.outstanding -= 1;
                self.free_slots.push(index);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resound_core::testing::ScriptedFactory;

    fn config(initial: usize, max: usize, ceiling: usize) -> PoolConfig {
        PoolConfig {
            initial_capacity: initial,
            max_capacity: max,
            concurrency_ceiling: ceiling,
            jitter_seed: Some(7),
        }
    }

    fn pool(initial: usize, max: usize, ceiling: usize) -> (ScriptedFactory, PlaybackPool<ScriptedFactory>) {
        let factory = ScriptedFactory::new();
        let pool = PlaybackPool::new(config(initial, max, ceiling), factory.clone()).unwrap();
        (factory, pool)
    }

    fn profile(id: &str) -> Arc<PlaybackProfile> {
        PlaybackProfile::new(id, format!("sfx/{id}.wav")).shared()
    }

    #[test]
    fn test_new_prewarms_initial_capacity() {
        let (factory, pool) = pool(3, 10, 5);
        assert_eq!(factory.created(), 3);
        assert_eq!(pool.idle_count(), 3);
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.outstanding(), 3);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let err = PlaybackPool::new(config(5, 2, 1), ScriptedFactory::new()).err().unwrap();
        assert!(err.is_config());
    }

    #[test]
    fn test_can_play() {
        let (_, mut pool) = pool(1, 4, 2);
        let shot = profile("shot");
        assert!(!pool.can_play(None));
        assert!(pool.can_play(Some(shot.as_ref())));

        pool.play(&shot, Vec3::ZERO).unwrap();
        pool.play(&shot, Vec3::ZERO).unwrap();
        assert!(!pool.can_play(Some(shot.as_ref())));
        assert!(pool.can_play(Some(profile("other").as_ref())));
    }

    #[test]
    fn test_acquire_reuses_least_recently_released() {
        let (_, mut pool) = pool(0, 4, 4);
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        pool.release(b);
        pool.release(a);

        // b went back first, so it comes out first.
        let next = pool.acquire().unwrap();
        assert_eq!(next.index(), b.index());
        assert_ne!(next, b);
    }

    #[test]
    fn test_acquire_never_exceeds_max() {
        let (factory, mut pool) = pool(0, 2, 10);
        assert!(pool.acquire().is_some());
        assert!(pool.acquire().is_some());
        assert!(pool.acquire().is_none());
        assert_eq!(factory.created(), 2);
        assert_eq!(pool.outstanding(), 2);
    }

    #[test]
    fn test_full_pool_returns_every_handle_to_idle() {
        let (factory, mut pool) = pool(1, 3, 10);
        let ids: Vec<HandleId> = (0..3).map(|_| pool.acquire().unwrap()).collect();
        for id in ids {
            assert!(pool.release(id));
        }

        assert_eq!(pool.outstanding(), 3);
        assert_eq!(pool.idle_count(), 3);
        for _ in 0..3 {
            pool.acquire().unwrap();
        }
        assert_eq!(factory.created(), 3);
    }

    #[test]
    fn test_stop_halts_primitive_once() {
        let (factory, mut pool) = pool(1, 4, 4);
        let id = pool.play(&profile("shot"), Vec3::ZERO).unwrap();
        let voice = factory.voice(id.index()).unwrap();

        assert!(pool.stop(id));
        assert!(!pool.stop(id));
        assert_eq!(voice.stops(), 1);
        assert!(!voice.is_playing());
    }

    #[test]
    fn test_release_is_idempotent() {
        let (_, mut pool) = pool(1, 4, 4);
        let shot = profile("shot");
        let id = pool.play(&shot, Vec3::ZERO).unwrap();
        assert_eq!(pool.live_count(&shot.id), 1);

        assert!(pool.release(id));
        assert!(!pool.release(id));
        assert_eq!(pool.live_count(&shot.id), 0);
        assert_eq!(pool.idle_count(), 1);
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn test_natural_completion_releases_once() {
        let (factory, mut pool) = pool(1, 4, 4);
        let shot = profile("shot");
        let id = pool.play(&shot, Vec3::ZERO).unwrap();

        assert_eq!(pool.tick(), 0);
        factory.voice(id.index()).unwrap().finish();
        assert_eq!(pool.tick(), 1);
        assert_eq!(pool.tick(), 0);
        assert_eq!(pool.live_count(&shot.id), 0);
        assert!(!pool.is_active(id));
    }

    #[test]
    fn test_stop_then_tick_releases_once() {
        let (factory, mut pool) = pool(1, 4, 4);
        let shot = profile("shot");
        let id = pool.play(&shot, Vec3::ZERO).unwrap();

        // Sound ends and is stopped within the same frame.
        factory.voice(id.index()).unwrap().finish();
        assert!(pool.stop(id));
        assert_eq!(pool.tick(), 0);
        assert!(!pool.stop(id));
        assert_eq!(pool.live_count(&shot.id), 0);
        assert_eq!(pool.idle_count(), 1);
    }

    #[test]
    fn test_stale_id_cannot_stop_reused_handle() {
        let (_, mut pool) = pool(1, 1, 4);
        let shot = profile("shot");
        let first = pool.play(&shot, Vec3::ZERO).unwrap();
        pool.stop(first);
        let second = pool.play(&shot, Vec3::ZERO).unwrap();
        assert_eq!(first.index(), second.index());

        assert!(!pool.stop(first));
        assert!(pool.is_active(second));
        assert_eq!(pool.live_count(&shot.id), 1);
    }

    #[test]
    fn test_torn_down_primitive_is_reclaimed() {
        let (factory, mut pool) = pool(1, 4, 4);
        let shot = profile("shot");
        let id = pool.play(&shot, Vec3::ZERO).unwrap();

        factory.voice(id.index()).unwrap().destroy();
        assert!(pool.stop(id));
        assert_eq!(pool.live_count(&shot.id), 0);
    }

    #[test]
    fn test_stop_all() {
        let (factory, mut pool) = pool(2, 8, 8);
        let a = profile("a");
        let b = profile("b");
        for _ in 0..3 {
            pool.play(&a, Vec3::ZERO).unwrap();
            pool.play(&b, Vec3::ZERO).unwrap();
        }
        assert_eq!(pool.active_count(), 6);

        pool.stop_all();
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.idle_count(), 6);
        assert_eq!(pool.live_count(&a.id), 0);
        assert_eq!(pool.live_count(&b.id), 0);
        assert_eq!(factory.playing_count(), 0);
    }

    #[test]
    fn test_shrink_to_initial_capacity() {
        let (_, mut pool) = pool(1, 8, 8);
        let shot = profile("shot");
        let ids: Vec<_> = (0..4).map(|_| pool.play(&shot, Vec3::ZERO).unwrap()).collect();
        for id in ids {
            pool.stop(id);
        }
        assert_eq!(pool.outstanding(), 4);
        assert_eq!(pool.shrink(), 3);
        assert_eq!(pool.outstanding(), 1);
        assert_eq!(pool.idle_count(), 1);

        // Freed slots are reused when the pool grows again.
        let ids: Vec<_> = (0..3).map(|_| pool.play(&shot, Vec3::ZERO).unwrap()).collect();
        assert!(ids.iter().all(|id| id.index() < 4));
    }

    #[test]
    fn test_dispose() {
        let (factory, mut pool) = pool(2, 8, 8);
        let shot = profile("shot");
        pool.play(&shot, Vec3::ZERO).unwrap();
        pool.dispose();
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.live_count(&shot.id), 0);
        assert_eq!(factory.playing_count(), 0);

        // A disposed pool can grow again on demand.
        assert!(pool.play(&shot, Vec3::ZERO).is_some());
    }

    #[test]
    fn test_stats() {
        let (_, mut pool) = pool(2, 8, 8);
        let shot = profile("shot");
        pool.play(&shot, Vec3::ZERO).unwrap();
        let stats = pool.stats();
        assert_eq!(stats.active, 1);
        assert_eq!(stats.idle, 1);
        assert_eq!(stats.outstanding, 2);
        assert_eq!(stats.live.get(&shot.id), Some(&1));
    }
}
