//! Perceptual volume helpers: fade curves and decibel conversion.

use std::f32::consts::{FRAC_PI_2, PI};

use serde::{Deserialize, Serialize};

/// Quietest level in decibels; linear volumes at or below zero map here.
pub const MIN_DB: f32 = -80.0;

/// Mapping from linear fade progress to perceptual fade progress.
///
/// Every curve is monotonic on `[0, 1]` with `f(0) = 0` and `f(1) = 1`.
/// Input outside `[0, 1]` is clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadeCurve {
    /// `log10(1 + 9x)`: loudness perception is logarithmic, so this fade
    /// sounds even rather than abrupt-then-slow.
    #[default]
    Logarithmic,
    /// `x`
    Linear,
    /// `sin(x·π/2)`
    EqualPower,
    /// `0.5·(1 - cos(π·x))`
    SCurve,
}

impl FadeCurve {
    /// Perceptual fraction for a linear progress fraction.
    pub fn apply(self, fraction: f32) -> f32 {
        let x = clamp01(fraction);
        match self {
            Self::Logarithmic => 9.0f32.mul_add(x, 1.0).log10(),
            Self::Linear => x,
            Self::EqualPower => (x * FRAC_PI_2).sin(),
            Self::SCurve => 0.5 * (1.0 - (PI * x).cos()),
        }
    }
}

/// Clamp to `[0, 1]`, mapping NaN to 0.
pub fn clamp01(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Convert a linear gain to decibels, floored at [`MIN_DB`].
pub fn linear_to_db(volume: f32) -> f32 {
    if volume <= 0.0 {
        MIN_DB
    } else {
        (20.0 * volume.log10()).max(MIN_DB)
    }
}

/// Convert decibels to a linear gain. Anything at or below [`MIN_DB`] is silence.
pub fn db_to_linear(db: f32) -> f32 {
    if db <= MIN_DB {
        0.0
    } else {
        10.0f32.powf(db / 20.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURVES: [FadeCurve; 4] = [
        FadeCurve::Logarithmic,
        FadeCurve::Linear,
        FadeCurve::EqualPower,
        FadeCurve::SCurve,
    ];

    #[test]
    fn test_curve_endpoints() {
        for curve in CURVES {
            assert!(curve.apply(0.0).abs() < 1e-6, "{curve:?} f(0)");
            assert!((curve.apply(1.0) - 1.0).abs() < 1e-6, "{curve:?} f(1)");
        }
    }

    #[test]
    fn test_curve_monotonic() {
        for curve in CURVES {
            let mut previous = curve.apply(0.0);
            for step in 1..=100 {
                let value = curve.apply(step as f32 / 100.0);
                assert!(value >= previous, "{curve:?} decreased at step {step}");
                previous = value;
            }
        }
    }

    #[test]
    fn test_logarithmic_midpoint() {
        // log10(5.5) / log10(10)
        assert!((FadeCurve::Logarithmic.apply(0.5) - 0.740_363).abs() < 1e-4);
    }

    #[test]
    fn test_curve_clamps_input() {
        assert!(FadeCurve::Logarithmic.apply(-1.0).abs() < 1e-6);
        assert!((FadeCurve::Logarithmic.apply(3.0) - 1.0).abs() < 1e-6);
        assert!(FadeCurve::Linear.apply(f32::NAN).abs() < 1e-6);
    }

    #[test]
    fn test_db_conversion() {
        assert!(linear_to_db(1.0).abs() < 1e-6);
        assert!((linear_to_db(0.5) + 6.0206).abs() < 1e-3);
        assert!((linear_to_db(0.0) - MIN_DB).abs() < f32::EPSILON);
        assert!((db_to_linear(0.0) - 1.0).abs() < 1e-6);
        assert!(db_to_linear(MIN_DB).abs() < f32::EPSILON);
        assert!((db_to_linear(linear_to_db(0.25)) - 0.25).abs() < 1e-5);
    }
}
