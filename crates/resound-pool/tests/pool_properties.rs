//! Accounting properties of the playback pool under arbitrary operation sequences.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::collections::HashMap;
use std::sync::Arc;

use proptest::prelude::*;
use resound_core::testing::ScriptedFactory;
use resound_core::{PlaybackProfile, PoolConfig, ProfileId, Vec3};
use resound_pool::{HandleId, PlaybackPool, PlaybackRequest};

const PROFILES: [&str; 3] = ["step", "shot", "door"];

#[derive(Debug, Clone)]
enum Op {
    Play(usize),
    Stop(usize),
    Finish(usize),
    Destroy(usize),
    StopStale(usize),
    Tick,
    Shrink,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..PROFILES.len()).prop_map(Op::Play),
        2 => any::<usize>().prop_map(Op::Stop),
        2 => any::<usize>().prop_map(Op::Finish),
        1 => any::<usize>().prop_map(Op::Destroy),
        1 => any::<usize>().prop_map(Op::StopStale),
        2 => Just(Op::Tick),
        1 => Just(Op::Shrink),
    ]
}

fn profiles() -> Vec<Arc<PlaybackProfile>> {
    PROFILES
        .iter()
        .map(|id| PlaybackProfile::new(*id, format!("sfx/{id}.wav")).shared())
        .collect()
}

fn pick(pool: &PlaybackPool<ScriptedFactory>, k: usize) -> Option<HandleId> {
    let ids = pool.active_ids();
    if ids.is_empty() {
        None
    } else {
        Some(ids[k % ids.len()])
    }
}

/// Live counts recomputed from the handles themselves.
fn bound_counts(pool: &PlaybackPool<ScriptedFactory>) -> HashMap<ProfileId, usize> {
    let mut counts = HashMap::new();
    for id in pool.active_ids() {
        let handle = pool.handle(id).unwrap();
        if let Some(profile) = handle.profile() {
            *counts.entry(profile.id.clone()).or_insert(0) += 1;
        }
    }
    counts
}

fn check_invariants(pool: &PlaybackPool<ScriptedFactory>, config: &PoolConfig) {
    let stats = pool.stats();
    assert!(stats.outstanding <= config.max_capacity);
    assert_eq!(stats.active + stats.idle, stats.outstanding);
    assert_eq!(stats.live, bound_counts(pool));
    for count in stats.live.values() {
        assert!(*count > 0 && *count <= config.concurrency_ceiling);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_accounting_holds_for_any_sequence(
        initial in 0usize..6,
        max in 1usize..8,
        ceiling in 1usize..4,
        ops in prop::collection::vec(op(), 0..64),
    ) {
        let config = PoolConfig {
            initial_capacity: initial.min(max),
            max_capacity: max,
            concurrency_ceiling: ceiling,
            jitter_seed: Some(11),
        };
        let mut pool = PlaybackPool::new(config.clone(), ScriptedFactory::new()).unwrap();
        let profiles = profiles();
        let mut retired: Vec<HandleId> = Vec::new();

        for op in ops {
            match op {
                Op::Play(p) => {
                    let profile = &profiles[p];
                    let before = pool.stats();
                    let admitted = pool.can_play(Some(profile.as_ref()));
                    let exhausted = before.idle == 0 && before.outstanding == config.max_capacity;
                    let id = pool
                        .create_request()
                        .with_profile(profile.clone())
                        .with_pitch_jitter(true)
                        .commit(&mut pool);

                    if admitted && !exhausted {
                        let id = id.unwrap();
                        prop_assert!(pool.is_active(id));
                        prop_assert_eq!(
                            pool.live_count(&profile.id),
                            before.live.get(&profile.id).copied().unwrap_or(0) + 1
                        );
                    } else {
                        prop_assert!(id.is_none());
                        prop_assert_eq!(pool.stats(), before);
                    }
                }
                Op::Stop(k) => {
                    if let Some(id) = pick(&pool, k) {
                        prop_assert!(pool.stop(id));
                        prop_assert!(!pool.is_active(id));
                        retired.push(id);
                    }
                }
                Op::Finish(k) => {
                    if let Some(id) = pick(&pool, k) {
                        pool.handle(id).unwrap().primitive().control().finish();
                    }
                }
                Op::Destroy(k) => {
                    if let Some(id) = pick(&pool, k) {
                        pool.handle(id).unwrap().primitive().control().destroy();
                    }
                }
                Op::StopStale(k) => {
                    if !retired.is_empty() {
                        let id = retired[k % retired.len()];
                        let before = pool.stats();
                        prop_assert!(!pool.stop(id));
                        prop_assert!(!pool.release(id));
                        prop_assert_eq!(pool.stats(), before);
                    }
                }
                Op::Tick => {
                    let finished: Vec<HandleId> = pool
                        .active_ids()
                        .into_iter()
                        .filter(|id| !pool.handle(*id).unwrap().is_playing())
                        .collect();
                    let released = pool.tick();
                    prop_assert_eq!(released, finished.len());
                    retired.extend(finished);
                    // A second tick has nothing left to release.
                    prop_assert_eq!(pool.tick(), 0);
                }
                Op::Shrink => {
                    pool.shrink();
                    prop_assert!(pool.outstanding() <= config.initial_capacity || pool.idle_count() == 0);
                }
            }
            check_invariants(&pool, &config);
        }

        pool.stop_all();
        let stats = pool.stats();
        prop_assert_eq!(stats.active, 0);
        prop_assert!(stats.live.is_empty());
        prop_assert_eq!(stats.idle, stats.outstanding);
    }
}

#[test]
fn test_second_request_over_ceiling_is_rejected() {
    let factory = ScriptedFactory::new();
    let config = PoolConfig {
        initial_capacity: 2,
        max_capacity: 100,
        concurrency_ceiling: 1,
        jitter_seed: Some(1),
    };
    let mut pool = PlaybackPool::new(config, factory.clone()).unwrap();
    let explosion = PlaybackProfile::new("explosion", "sfx/explosion.wav").shared();
    let request = PlaybackRequest::new()
        .with_profile(explosion.clone())
        .with_position(Vec3::new(4.0, 0.0, -2.0));

    let first = request.commit(&mut pool);
    let second = request.commit(&mut pool);

    assert!(first.is_some());
    assert!(second.is_none());
    assert_eq!(pool.live_count(&explosion.id), 1);
    assert_eq!(pool.active_count(), 1);
    assert_eq!(factory.playing("sfx/explosion.wav").len(), 1);
    assert_eq!(factory.created(), 2);
}

#[test]
fn test_finish_and_stop_in_same_frame_release_once() {
    let factory = ScriptedFactory::new();
    let mut pool = PlaybackPool::new(PoolConfig::default(), factory).unwrap();
    let step = PlaybackProfile::new("step", "sfx/step.wav").shared();

    let id = pool.play(&step, Vec3::ZERO).unwrap();
    pool.handle(id).unwrap().primitive().control().finish();

    assert!(pool.stop(id));
    assert_eq!(pool.tick(), 0);
    assert!(!pool.stop(id));
    assert_eq!(pool.live_count(&step.id), 0);
    assert_eq!(pool.idle_count(), PoolConfig::default().initial_capacity);
}

#[test]
fn test_released_handle_is_not_affected_by_old_id() {
    let factory = ScriptedFactory::new();
    let config = PoolConfig {
        initial_capacity: 1,
        max_capacity: 1,
        concurrency_ceiling: 4,
        jitter_seed: Some(5),
    };
    let mut pool = PlaybackPool::new(config, factory.clone()).unwrap();
    let step = PlaybackProfile::new("step", "sfx/step.wav").shared();
    let shot = PlaybackProfile::new("shot", "sfx/shot.wav").shared();

    let old = pool.play(&step, Vec3::ZERO).unwrap();
    factory.voice(0).unwrap().finish();
    assert_eq!(pool.tick(), 1);

    let new = pool.play(&shot, Vec3::ZERO).unwrap();
    assert_eq!(old.index(), new.index());
    assert!(!pool.stop(old));
    assert!(factory.voice(0).unwrap().is_playing());
    assert_eq!(pool.live_count(&shot.id), 1);
}
