//! # resound-pool
//!
//! Reusable playback handles for one-shot and looping sounds.
//!
//! Features:
//! - Bounded handle pool that grows on demand and shrinks back to its initial size
//! - Per-profile concurrency ceiling with exactly-once live accounting
//! - Tick-polled completion watches that return finished handles to the pool
//! - Immutable request builder with optional pitch/volume jitter

pub mod handle;
pub mod jitter;
pub mod pool;
pub mod request;

pub use handle::{HandleId, HandleState, PlaybackHandle};
pub use jitter::{Jitter, JitterRange};
pub use pool::{PlaybackPool, PoolStats};
pub use request::PlaybackRequest;
