//! # resound-music
//!
//! Music playback for Resound: a FIFO track queue feeding a two-slot
//! crossfade scheduler advanced by the host's frame tick.

pub mod queue;
pub mod scheduler;

pub use queue::TrackQueue;
pub use scheduler::{CrossfadeScheduler, TrackSlot, FADE_EPSILON};
