//! Core domain types for Resound.

pub mod profile;
pub mod track;
pub mod voice;

pub use profile::{ClipRef, PlaybackProfile, ProfileBank, ProfileId, SpatialParams};
pub use track::Track;
pub use voice::VoiceParams;
