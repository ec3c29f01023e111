//! A reusable unit that drives one concurrent sound.
//!
//! A handle is `Idle` while pooled and `Active` from acquire until release.
//! While active it carries at most one completion watch: a polled check of
//! the rendering primitive that reports, exactly once, when the sound ended
//! on its own. Cancelling the watch (stop, or a restart) hands the duty of
//! releasing the handle to whoever cancelled it.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::sync::Arc;

use glam::Vec3;
use rand::Rng;
use resound_core::{PlaybackProfile, RenderPrimitive, VoiceParams};
use tracing::trace;

use crate::jitter::Jitter;

/// Identifies one acquisition of a pooled handle.
///
/// Every acquire issues a new ticket, so an id kept after its sound ended
/// never refers to the next sound that reuses the same handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId {
    index: usize,
    ticket: u64,
}

impl HandleId {
    pub(crate) const fn new(index: usize, ticket: u64) -> Self {
        Self { index, ticket }
    }

    /// Slot of the handle inside its pool.
    pub const fn index(&self) -> usize {
        self.index
    }

    pub(crate) const fn ticket(&self) -> u64 {
        self.ticket
    }
}

/// Lifecycle state of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandleState {
    /// Pooled and unbound.
    #[default]
    Idle,
    /// Bound to a profile and handed out.
    Active,
}

/// Outcome of polling a handle's completion watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WatchPoll {
    /// No watch is running.
    Detached,
    /// The sound is still playing.
    Pending,
    /// The sound ended on its own; the watch has been consumed.
    Finished,
}

/// Token for a running completion watch. Dropping it cancels the watch.
#[derive(Debug)]
struct CompletionWatch {
    started_ticket: u64,
}

/// One pooled playback unit wrapping a rendering primitive.
#[derive(Debug)]
pub struct PlaybackHandle<P> {
    primitive: P,
    state: HandleState,
    ticket: u64,
    profile: Option<Arc<PlaybackProfile>>,
    watch: Option<CompletionWatch>,
}

impl<P: RenderPrimitive> PlaybackHandle<P> {
    pub(crate) const fn new(primitive: P) -> Self {
        Self {
            primitive,
            state: HandleState::Idle,
            ticket: 0,
            profile: None,
            watch: None,
        }
    }

    pub const fn state(&self) -> HandleState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == HandleState::Active
    }

    /// Profile bound since the last start, if any.
    pub fn profile(&self) -> Option<&Arc<PlaybackProfile>> {
        self.profile.as_ref()
    }

    /// Whether a completion watch is running.
    pub const fn is_watching(&self) -> bool {
        self.watch.is_some()
    }

    /// Whether the underlying sound is still audible.
    pub fn is_playing(&self) -> bool {
        self.primitive.is_alive() && self.primitive.is_playing()
    }

    pub const fn primitive(&self) -> &P {
        &self.primitive
    }

    pub(crate) const fn ticket(&self) -> u64 {
        self.ticket
    }

    /// Mark the handle as handed out under a fresh ticket.
    pub(crate) fn activate(&mut self, ticket: u64) {
        self.state = HandleState::Active;
        self.ticket = ticket;
    }

    /// Configure and start a sound, then begin watching for its end.
    ///
    /// Any previous watch is cancelled first, so at most one watch is live.
    pub(crate) fn start<R: Rng>(
        &mut self,
        profile: Arc<PlaybackProfile>,
        position: Vec3,
        jitter: &Jitter,
        rng: &mut R,
    ) {
        self.cancel_watch();

        let mut params = VoiceParams::from_profile(&profile, position);
        let (pitch, volume) = jitter.apply(params.pitch, params.volume, rng);
        params.pitch = pitch;
        params.volume = volume;

        if self.primitive.is_alive() {
            self.primitive.apply(&params);
            self.primitive.play();
        } else {
            trace!("Primitive for {} already torn down, start is a no-op", profile.id);
        }

        self.profile = Some(profile);
        self.watch = Some(CompletionWatch {
            started_ticket: self.ticket,
        });
    }

    /// Cancel the running watch. Returns whether one was running.
    pub(crate) fn cancel_watch(&mut self) -> bool {
        self.watch.take().is_some()
    }

    /// Halt the underlying sound, tolerating a torn-down primitive.
    pub(crate) fn halt(&mut self) {
        if self.primitive.is_alive() {
            self.primitive.stop();
        } else {
            trace!("Primitive already torn down, stop is a no-op");
        }
    }

    /// One step of the completion watch.
    ///
    /// A torn-down primitive counts as finished. `Finished` is reported at
    /// most once per start because the watch is consumed when it fires.
    pub(crate) fn poll_watch(&mut self) -> WatchPoll {
        let Some(watch) = &self.watch else {
            return WatchPoll::Detached;
        };
        if watch.started_ticket != self.ticket {
            // Left over from a previous acquisition.
            self.watch = None;
            return WatchPoll::Detached;
        }

        if self.is_playing() {
            WatchPoll::Pending
        } else {
            self.watch = None;
            WatchPoll::Finished
        }
    }

    /// Return to the idle state, unbinding the profile.
    pub(crate) fn deactivate(&mut self) -> Option<Arc<PlaybackProfile>> {
        self.cancel_watch();
        self.halt();
        self.state = HandleState::Idle;
        self.profile.take()
    }
}
