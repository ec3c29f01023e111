//! # resound-core
//!
//! Core types, traits, configuration, and error handling for the Resound
//! sound-instance pool and music crossfader.

pub mod config;
pub mod error;
pub mod primitive;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;
pub mod volume;

pub use config::{EngineConfig, MusicConfig, OutputConfig, PoolConfig};
pub use error::{Error, Result};
pub use glam::Vec3;
pub use primitive::{HandleFactory, RenderPrimitive};
pub use types::*;
pub use volume::FadeCurve;
