//! Random pitch and volume variation applied once when a sound starts.

use rand::Rng;
use resound_core::volume::clamp01;

/// Lowest pitch a jittered sound may play at.
pub const MIN_PITCH: f32 = 0.1;
/// Highest pitch a jittered sound may play at.
pub const MAX_PITCH: f32 = 3.0;

/// Largest offset magnitude a range may hold. Anything wider already
/// saturates both the pitch and the volume clamp.
pub const MAX_OFFSET: f32 = MAX_PITCH;

fn sanitize_bound(bound: f32) -> f32 {
    if bound.is_nan() {
        0.0
    } else {
        bound.clamp(-MAX_OFFSET, MAX_OFFSET)
    }
}

/// Closed range of random offsets added to a baseline value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JitterRange {
    min: f32,
    max: f32,
}

impl Default for JitterRange {
    fn default() -> Self {
        Self {
            min: -0.05,
            max: 0.05,
        }
    }
}

impl JitterRange {
    /// Build a range; bounds given in the wrong order are swapped.
    ///
    /// Bounds are limited to `±MAX_OFFSET` and a NaN bound becomes zero, so
    /// the span is always finite and [`sample`](Self::sample) cannot fail.
    pub fn new(min: f32, max: f32) -> Self {
        let (min, max) = (sanitize_bound(min), sanitize_bound(max));
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub const fn min(&self) -> f32 {
        self.min
    }

    pub const fn max(&self) -> f32 {
        self.max
    }

    /// Draw one offset uniformly from the range.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f32 {
        if self.min < self.max {
            rng.random_range(self.min..=self.max)
        } else {
            self.min
        }
    }
}

/// Which jitter to apply when a handle starts.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Jitter {
    pub pitch: Option<JitterRange>,
    pub volume: Option<JitterRange>,
}

impl Jitter {
    pub const NONE: Self = Self {
        pitch: None,
        volume: None,
    };

    /// Returns the jittered `(pitch, volume)` for the given baselines.
    pub fn apply<R: Rng>(&self, pitch: f32, volume: f32, rng: &mut R) -> (f32, f32) {
        let pitch = self
            .pitch
            .map_or(pitch, |range| jittered_pitch(pitch, range.sample(rng)));
        let volume = self
            .volume
            .map_or(volume, |range| jittered_volume(volume, range.sample(rng)));
        (pitch, volume)
    }
}

/// `clamp(baseline + offset, 0.1, 3.0)`
pub fn jittered_pitch(baseline: f32, offset: f32) -> f32 {
    let pitch = baseline + offset;
    if pitch.is_nan() {
        return MIN_PITCH;
    }
    pitch.clamp(MIN_PITCH, MAX_PITCH)
}

/// `clamp01(baseline + offset)`
pub fn jittered_volume(baseline: f32, offset: f32) -> f32 {
    clamp01(baseline + offset)
}
