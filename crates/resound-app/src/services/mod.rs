//! Engine services owned by the frame loop.
//!
//! - Audio system: sound-effect pool and music crossfader behind one facade

pub mod audio;

pub use audio::AudioSystem;
