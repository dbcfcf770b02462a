//! Media Engine - virtual audio engine for Chapterline
//!
//! Implements the engine capability traits from `chapterline-core` on top of
//! a tokio-driven playback clock instead of a decoder and an output device.

mod engine;
mod state;

pub use engine::{VirtualEngineFactory, VirtualHandle};
pub use state::ClockState;
