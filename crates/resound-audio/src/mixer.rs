//! Software mixer and the voices it renders.
//!
//! The mixer owns a table of voices behind a lock shared with the output
//! callback. Each [`MixerVoice`] handed to the pool holds only a weak
//! reference to that table: once the mixer is torn down every voice reports
//! `is_alive() == false` and ignores further calls.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::collections::HashMap;
use std::f32::consts::{FRAC_PI_4, SQRT_2};
use std::sync::{Arc, Weak};

use glam::Vec3;
use parking_lot::Mutex;
use resound_core::volume::{clamp01, db_to_linear};
use resound_core::{
    HandleFactory, OutputConfig, RenderPrimitive, SpatialParams, VoiceParams,
};
use tracing::{debug, warn};

use crate::clip::{Clip, ClipLibrary};

/// Output samples above this magnitude are soft-limited.
const SOFT_CLIP_THRESHOLD: f32 = 0.9;

#[derive(Debug)]
struct Voice {
    clip: Option<Arc<Clip>>,
    params: Option<VoiceParams>,
    volume: f32,
    cursor: f64,
    playing: bool,
}

impl Voice {
    const fn new() -> Self {
        Self {
            clip: None,
            params: None,
            volume: 0.0,
            cursor: 0.0,
            playing: false,
        }
    }
}

#[derive(Debug)]
struct MixerState {
    voices: HashMap<u64, Voice>,
    next_voice: u64,
    master_volume: f32,
    /// Linear gain per route name.
    route_gains: HashMap<String, f32>,
    listener: Vec3,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<MixerState>,
    library: Mutex<ClipLibrary>,
    channels: usize,
}

/// Mixes every playing voice into interleaved output buffers.
#[derive(Debug, Clone)]
pub struct Mixer {
    shared: Arc<Shared>,
}

impl Mixer {
    /// `channels` is the output channel count. Voices render into the first
    /// two; any further channels receive silence.
    pub fn new(library: ClipLibrary, output: &OutputConfig, channels: usize) -> Self {
        let route_gains = output
            .routes
            .iter()
            .map(|(route, db)| (route.clone(), db_to_linear(*db)))
            .collect();

        debug!(
            "Mixer ready: {}Hz, {} channels, {} routes",
            library.sample_rate(),
            channels,
            output.routes.len()
        );

        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(MixerState {
                    voices: HashMap::new(),
                    next_voice: 0,
                    master_volume: clamp01(output.master_volume),
                    route_gains,
                    listener: Vec3::ZERO,
                }),
                library: Mutex::new(library),
                channels: channels.max(1),
            }),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.shared.library.lock().sample_rate()
    }

    pub fn channels(&self) -> usize {
        self.shared.channels
    }

    /// A factory producing voices bound to this mixer.
    pub fn factory(&self) -> MixerFactory {
        MixerFactory {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Create a silent voice.
    pub fn create_voice(&self) -> MixerVoice {
        let mut state = self.shared.state.lock();
        let id = state.next_voice;
        state.next_voice += 1;
        state.voices.insert(id, Voice::new());
        MixerVoice {
            id,
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Run `f` with the clip library locked.
    pub fn with_library<T>(&self, f: impl FnOnce(&mut ClipLibrary) -> T) -> T {
        f(&mut self.shared.library.lock())
    }

    pub fn set_master_volume(&self, volume: f32) {
        self.shared.state.lock().master_volume = clamp01(volume);
    }

    pub fn set_route_gain_db(&self, route: &str, db: f32) {
        self.shared
            .state
            .lock()
            .route_gains
            .insert(route.to_string(), db_to_linear(db));
    }

    pub fn set_listener(&self, position: Vec3) {
        self.shared.state.lock().listener = position;
    }

    /// Voices in existence.
    pub fn voice_count(&self) -> usize {
        self.shared.state.lock().voices.len()
    }

    /// Voices currently producing sound.
    pub fn playing_count(&self) -> usize {
        self.shared
            .state
            .lock()
            .voices
            .values()
            .filter(|v| v.playing)
            .count()
    }

    /// Mix one interleaved buffer of output. Voices that run past the end
    /// of a non-looping clip stop playing.
    pub fn render(&self, out: &mut [f32]) {
        out.fill(0.0);
        let channels = self.shared.channels;
        let mut state = self.shared.state.lock();
        let MixerState {
            voices,
            master_volume,
            route_gains,
            listener,
            ..
        } = &mut *state;

        for voice in voices.values_mut().filter(|v| v.playing) {
            let (Some(clip), Some(params)) = (voice.clip.clone(), voice.params.as_ref()) else {
                voice.playing = false;
                continue;
            };

            let route = params
                .route
                .as_ref()
                .and_then(|r| route_gains.get(r))
                .copied()
                .unwrap_or(1.0);
            let offset = params.position - *listener;
            let gain = voice.volume * route * attenuation(offset, &params.spatial);
            let (left_gain, right_gain) = pan_gains(pan(offset, &params.spatial));
            let rate = f64::from(params.pitch.max(0.0));
            let looping = params.looping;

            for frame in out.chunks_exact_mut(channels) {
                let Some((left, right)) = sample_at(&clip, voice.cursor, looping) else {
                    voice.playing = false;
                    break;
                };
                let (left, right) = (left * gain * left_gain, right * gain * right_gain);
                if let Some(slot) = frame.get_mut(1) {
                    *slot += right;
                    frame[0] += left;
                } else {
                    // Mono output folds the pair back together.
                    frame[0] += 0.5 * (left + right);
                }
                voice.cursor = advance(voice.cursor + rate, clip.frames(), looping);
            }
        }

        let master = *master_volume;
        for sample in out.iter_mut() {
            let s = *sample * master;
            *sample = if s.abs() > SOFT_CLIP_THRESHOLD { s.tanh() } else { s };
        }
    }
}

/// Wrap a looping cursor back into the clip.
fn advance(cursor: f64, frames: usize, looping: bool) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let len = frames as f64;
    if looping && len > 0.0 && cursor >= len {
        cursor % len
    } else {
        cursor
    }
}

/// Linearly interpolated frame at a fractional position. `None` once a
/// non-looping clip is exhausted.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn sample_at(clip: &Clip, cursor: f64, looping: bool) -> Option<(f32, f32)> {
    let frames = clip.frames();
    let index = cursor.floor() as usize;
    if index >= frames {
        return None;
    }
    let next = if index + 1 < frames {
        index + 1
    } else if looping {
        0
    } else {
        index
    };
    let t = (cursor - index as f64) as f32;
    let (l0, r0) = clip.frame(index);
    let (l1, r1) = clip.frame(next);
    Some(((l1 - l0).mul_add(t, l0), (r1 - r0).mul_add(t, r0)))
}

/// Linear rolloff between min and max distance, blended by the spatial mix.
pub fn attenuation(offset: Vec3, spatial: &SpatialParams) -> f32 {
    let distance = offset.length();
    let positional = if distance <= spatial.min_distance {
        1.0
    } else if distance >= spatial.max_distance {
        0.0
    } else {
        1.0 - (distance - spatial.min_distance) / (spatial.max_distance - spatial.min_distance)
    };
    let blend = clamp01(spatial.blend);
    (positional - 1.0).mul_add(blend, 1.0)
}

/// Stereo position in `[-1, 1]` from the x-axis direction of the source.
pub fn pan(offset: Vec3, spatial: &SpatialParams) -> f32 {
    let distance = offset.length();
    if distance <= f32::EPSILON {
        return 0.0;
    }
    (offset.x / distance).clamp(-1.0, 1.0) * clamp01(spatial.blend)
}

/// Equal-power gains for a pan position, normalized to unity at center.
pub fn pan_gains(pan: f32) -> (f32, f32) {
    let angle = (pan.clamp(-1.0, 1.0) + 1.0) * FRAC_PI_4;
    (
        (angle.cos() * SQRT_2).min(1.0),
        (angle.sin() * SQRT_2).min(1.0),
    )
}

/// Rendering primitive backed by one mixer voice.
#[derive(Debug)]
pub struct MixerVoice {
    id: u64,
    shared: Weak<Shared>,
}

impl MixerVoice {
    fn with_voice<T>(&self, f: impl FnOnce(&mut Voice) -> T) -> Option<T> {
        let shared = self.shared.upgrade()?;
        let mut state = shared.state.lock();
        state.voices.get_mut(&self.id).map(f)
    }
}

impl RenderPrimitive for MixerVoice {
    fn is_alive(&self) -> bool {
        self.with_voice(|_| ()).is_some()
    }

    fn apply(&mut self, params: &VoiceParams) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let clip = match shared.library.lock().load(&params.clip) {
            Ok(clip) => Some(clip),
            Err(e) => {
                warn!("Cannot play {}: {e}", params.clip);
                None
            }
        };
        drop(shared);

        self.with_voice(|voice| {
            voice.clip = clip;
            voice.volume = params.volume;
            voice.params = Some(params.clone());
            voice.cursor = 0.0;
            voice.playing = false;
        });
    }

    fn play(&mut self) {
        self.with_voice(|voice| {
            voice.cursor = 0.0;
            voice.playing = voice.clip.is_some();
        });
    }

    fn stop(&mut self) {
        self.with_voice(|voice| voice.playing = false);
    }

    fn is_playing(&self) -> bool {
        self.with_voice(|voice| voice.playing).unwrap_or(false)
    }

    fn set_volume(&mut self, volume: f32) {
        self.with_voice(|voice| voice.volume = volume);
    }
}

impl Drop for MixerVoice {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.state.lock().voices.remove(&self.id);
        }
    }
}

/// Creates mixer voices for the playback pool and the music scheduler.
#[derive(Debug, Clone)]
pub struct MixerFactory {
    shared: Weak<Shared>,
}

impl HandleFactory for MixerFactory {
    type Primitive = MixerVoice;

    fn create(&mut self) -> MixerVoice {
        match self.shared.upgrade() {
            Some(shared) => Mixer { shared }.create_voice(),
            // A voice of a torn-down mixer is born dead.
            None => MixerVoice {
                id: u64::MAX,
                shared: Weak::new(),
            },
        }
    }
}
