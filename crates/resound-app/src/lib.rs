//! # resound-app
//!
//! Host-side wiring for Resound. The binary owns an [`services::AudioSystem`]
//! and drives it from its frame loop.

pub mod services;
