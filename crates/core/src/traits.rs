//! Audio engine capability traits
//!
//! The playback session drives whatever engine the platform provides through
//! these two traits. Implementations decode and render audio; the session
//! only issues commands and reads status back.

use crate::EngineResult;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Live status of an engine handle
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EngineStatus {
    pub playing: bool,
    /// Seconds into the source
    pub position: f64,
    /// Seconds; zero until the engine knows the length
    pub duration: f64,
    /// True exactly once, on the first status read after the source ended
    pub did_just_finish: bool,
}

/// Events an engine pushes to its listener
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineEvent {
    Status(EngineStatus),
    Finished,
}

/// Creates engine handles for audio sources
#[async_trait]
pub trait EngineFactory: Send + Sync {
    async fn create(&self, source: &str) -> EngineResult<Box<dyn EngineHandle>>;
}

/// One loaded audio source
///
/// A handle is owned by exactly one session and is dropped right after
/// [`EngineHandle::release`].
#[async_trait]
pub trait EngineHandle: Send {
    async fn play(&mut self) -> EngineResult<()>;

    async fn pause(&mut self) -> EngineResult<()>;

    async fn seek(&mut self, seconds: f64) -> EngineResult<()>;

    async fn set_rate(&mut self, rate: f32) -> EngineResult<()>;

    async fn set_volume(&mut self, volume: f32) -> EngineResult<()>;

    /// Frees decoder and device resources
    async fn release(&mut self) -> EngineResult<()>;

    fn status(&mut self) -> EngineStatus;

    /// Registers a listener for pushed events
    ///
    /// Returns `None` when the engine can only be polled.
    fn subscribe(&mut self) -> Option<mpsc::UnboundedReceiver<EngineEvent>>;

    fn remove_all_listeners(&mut self);
}
