//! # resound-audio
//!
//! Concrete rendering backend for Resound.
//!
//! Features:
//! - Clip decoding with symphonia, resampled to the output rate with rubato
//! - Software mixer whose voices implement the core rendering primitive
//! - cpal device output, or a headless sink advanced by the host

pub mod clip;
pub mod decode;
pub mod mixer;
pub mod output;
pub mod resample;

pub use clip::{Clip, ClipLibrary};
pub use mixer::{Mixer, MixerFactory, MixerVoice};
pub use output::{AudioOutput, HeadlessOutput, Output, OutputDevice};
