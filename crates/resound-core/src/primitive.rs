//! Boundary with the rendering backend.
//!
//! The pool and the crossfade scheduler only start, stop, and observe a
//! primitive. Decoding, mixing, and output routing live behind this trait.

use crate::VoiceParams;

/// One unit of the rendering backend capable of playing a single sound.
///
/// Every method must tolerate being called after the backing resource has
/// been torn down: calls become no-ops and `is_playing` reports `false`.
/// Callers check [`RenderPrimitive::is_alive`] before use rather than
/// relying on failures for control flow.
pub trait RenderPrimitive {
    /// Whether the backing resource still exists.
    fn is_alive(&self) -> bool;

    /// Configure the next sound. Does not start playback.
    fn apply(&mut self, params: &VoiceParams);

    /// Begin playback of the configured sound from the start.
    fn play(&mut self);

    /// Halt playback.
    fn stop(&mut self);

    /// Whether the sound is still producing output.
    fn is_playing(&self) -> bool;

    /// Change the volume of the sound in flight.
    fn set_volume(&mut self, volume: f32);
}

/// Produces new, inactive rendering primitives when capacity must grow.
pub trait HandleFactory {
    type Primitive: RenderPrimitive;

    fn create(&mut self) -> Self::Primitive;
}

impl<P: RenderPrimitive + ?Sized> RenderPrimitive for Box<P> {
    fn is_alive(&self) -> bool {
        (**self).is_alive()
    }

    fn apply(&mut self, params: &VoiceParams) {
        (**self).apply(params);
    }

    fn play(&mut self) {
        (**self).play();
    }

    fn stop(&mut self) {
        (**self).stop();
    }

    fn is_playing(&self) -> bool {
        (**self).is_playing()
    }

    fn set_volume(&mut self, volume: f32) {
        (**self).set_volume(volume);
    }
}
