//! Two-slot music crossfader.
//!
//! At most two tracks sound at once: the `incoming` slot is the track being
//! faded in (or the one playing steadily once the fade is over) and the
//! `outgoing` slot is the track being faded out. Starting a new track shifts
//! incoming to outgoing and restarts the fade. The host drives the fade by
//! calling [`CrossfadeScheduler::tick`] once per frame.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use resound_core::volume::clamp01;
use resound_core::{HandleFactory, MusicConfig, RenderPrimitive, Result, Track, VoiceParams};
use tracing::{debug, info, trace};

use crate::queue::TrackQueue;

/// Elapsed fade time set by `play_now`. Any value above zero marks the fade
/// as running; zero means no fade is in progress.
pub const FADE_EPSILON: f32 = f32::EPSILON;

/// One playing music track and the primitive rendering it.
#[derive(Debug)]
pub struct TrackSlot<P> {
    track: Track,
    primitive: P,
    gain: f32,
}

impl<P: RenderPrimitive> TrackSlot<P> {
    /// Configure `primitive` for `track` at zero volume and start it.
    fn start(track: Track, mut primitive: P) -> Self {
        if primitive.is_alive() {
            primitive.apply(&VoiceParams::for_track(&track, 0.0));
            primitive.play();
        }
        Self {
            track,
            primitive,
            gain: 0.0,
        }
    }

    pub const fn track(&self) -> &Track {
        &self.track
    }

    /// Fade gain currently applied, before the track's own volume.
    pub const fn gain(&self) -> f32 {
        self.gain
    }

    pub const fn primitive(&self) -> &P {
        &self.primitive
    }

    pub fn is_playing(&self) -> bool {
        self.primitive.is_alive() && self.primitive.is_playing()
    }

    fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
        if self.primitive.is_alive() {
            self.primitive.set_volume(gain * self.track.volume);
        }
    }

    fn destroy(mut self) {
        if self.primitive.is_alive() {
            self.primitive.stop();
        }
    }
}

/// Queue-fed crossfader for background music.
pub struct CrossfadeScheduler<F: HandleFactory> {
    config: MusicConfig,
    factory: F,
    queue: TrackQueue,
    outgoing: Option<TrackSlot<F::Primitive>>,
    incoming: Option<TrackSlot<F::Primitive>>,
    /// Time since the fade began. Zero when no fade is running.
    elapsed: f32,
}

impl<F: HandleFactory> CrossfadeScheduler<F> {
    pub fn new(config: MusicConfig, factory: F) -> Result<Self> {
        config.validate()?;
        debug!(
            "Crossfade scheduler ready: {}s {:?} fade",
            config.crossfade_secs, config.curve
        );
        Ok(Self {
            config,
            factory,
            queue: TrackQueue::new(),
            outgoing: None,
            incoming: None,
            elapsed: 0.0,
        })
    }

    pub const fn config(&self) -> &MusicConfig {
        &self.config
    }

    /// Append a track to the queue. Starts it right away when no track is
    /// currently playing.
    pub fn enqueue(&mut self, track: Track) {
        debug!("Queued track {}", track.id);
        self.queue.push(track);
        if !self.is_playing() {
            self.advance();
        }
    }

    /// Crossfade to `track` now.
    ///
    /// Does nothing if `track` is already the incoming track and still
    /// playing. Returns whether a new track was started.
    pub fn play_now(&mut self, track: Track) -> bool {
        if self
            .incoming
            .as_ref()
            .is_some_and(|slot| slot.track == track && slot.is_playing())
        {
            trace!("Track {} already playing", track.id);
            return false;
        }

        if let Some(previous) = self.outgoing.take() {
            previous.destroy();
        }
        self.outgoing = self.incoming.take();

        debug!("Crossfade to {} started", track.id);
        let primitive = self.factory.create();
        self.incoming = Some(TrackSlot::start(track, primitive));
        self.elapsed = FADE_EPSILON;
        true
    }

    /// Advance the fade by `delta` seconds and start the next queued track
    /// when the incoming one has ended naturally.
    pub fn tick(&mut self, delta: f32) {
        if self.elapsed > 0.0 {
            self.elapsed += delta.max(0.0);
            let fraction = clamp01(self.elapsed / self.config.crossfade_secs);
            let perceptual = self.config.curve.apply(fraction);

            if let Some(slot) = &mut self.outgoing {
                slot.set_gain(1.0 - perceptual);
            }
            if let Some(slot) = &mut self.incoming {
                slot.set_gain(perceptual);
            }

            if fraction >= 1.0 {
                self.elapsed = 0.0;
                if let Some(slot) = self.outgoing.take() {
                    debug!("Crossfade complete, released {}", slot.track.id);
                    slot.destroy();
                }
            }
        }

        // Only a track that ended on its own hands over to the queue. Empty
        // slots after `stop` stay empty until the next `enqueue` or `skip`.
        let incoming_ended = self.incoming.as_ref().is_some_and(|slot| !slot.is_playing());
        if incoming_ended {
            self.advance();
        }
    }

    /// Start the next queued track immediately. Returns whether one was
    /// queued.
    pub fn skip(&mut self) -> bool {
        self.advance()
    }

    /// Drop queued tracks. Playback already in progress is unaffected.
    /// Returns the number of tracks dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.queue.clear();
        if dropped > 0 {
            debug!("Cleared {dropped} queued tracks");
        }
        dropped
    }

    /// Stop both slots and end any fade. The queue is kept.
    pub fn stop(&mut self) {
        for slot in [self.outgoing.take(), self.incoming.take()]
            .into_iter()
            .flatten()
        {
            slot.destroy();
        }
        self.elapsed = 0.0;
    }

    /// Stop playback and forget the queue.
    pub fn dispose(&mut self) {
        self.stop();
        self.queue.clear();
        info!("Crossfade scheduler disposed");
    }

    /// Whether either slot is producing sound.
    pub fn is_playing(&self) -> bool {
        [&self.outgoing, &self.incoming]
            .into_iter()
            .flatten()
            .any(TrackSlot::is_playing)
    }

    /// Track in the incoming slot.
    pub fn now_playing(&self) -> Option<&Track> {
        self.incoming.as_ref().map(TrackSlot::track)
    }

    pub fn queued(&self) -> impl Iterator<Item = &Track> {
        self.queue.iter()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_fading(&self) -> bool {
        self.elapsed > 0.0
    }

    /// Linear fade progress in `[0, 1]` while a fade is running.
    pub fn fade_progress(&self) -> Option<f32> {
        self.is_fading()
            .then(|| clamp01(self.elapsed / self.config.crossfade_secs))
    }

    pub fn incoming(&self) -> Option<&TrackSlot<F::Primitive>> {
        self.incoming.as_ref()
    }

    pub fn outgoing(&self) -> Option<&TrackSlot<F::Primitive>> {
        self.outgoing.as_ref()
    }

    pub fn incoming_volume(&self) -> Option<f32> {
        self.incoming.as_ref().map(TrackSlot::gain)
    }

    pub fn outgoing_volume(&self) -> Option<f32> {
        self.outgoing.as_ref().map(TrackSlot::gain)
    }

    fn advance(&mut self) -> bool {
        match self.queue.pop() {
            Some(next) => {
                debug!("Advancing to queued track {}", next.id);
                self.play_now(next);
                true
            }
            None => false,
        }
    }
}
