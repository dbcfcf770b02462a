//! Virtual audio engine
//!
//! Renders nothing; it keeps a playback clock per handle and reports it the
//! same way a platform engine would. The CLI simulator and the session tests
//! run against it.

use crate::state::ClockState;
use async_trait::async_trait;
use chapterline_core::{
    EngineError, EngineEvent, EngineFactory, EngineHandle, EngineResult, EngineStatus,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Default)]
struct FactoryCounters {
    live: AtomicUsize,
    peak_live: AtomicUsize,
    created: AtomicUsize,
    released: AtomicUsize,
}

/// Creates [`VirtualHandle`]s for registered sources
///
/// Sources must be registered with a duration first; unknown sources fail
/// like a missing file would.
#[derive(Debug, Default)]
pub struct VirtualEngineFactory {
    sources: Mutex<HashMap<String, f64>>,
    counters: Arc<FactoryCounters>,
    push_events: AtomicBool,
    fail_release: Arc<AtomicBool>,
}

impl VirtualEngineFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(self, source: impl Into<String>, duration_secs: f64) -> Self {
        self.register(source, duration_secs);
        self
    }

    pub fn register(&self, source: impl Into<String>, duration_secs: f64) {
        if let Ok(mut sources) = self.sources.lock() {
            sources.insert(source.into(), duration_secs);
        }
    }

    pub fn unregister(&self, source: &str) {
        if let Ok(mut sources) = self.sources.lock() {
            sources.remove(source);
        }
    }

    /// Whether new handles offer a pushed event stream
    pub fn set_push_events(&self, enabled: bool) {
        self.push_events.store(enabled, Ordering::SeqCst);
    }

    /// Makes `release` fail on every handle, for exercising teardown paths
    pub fn set_fail_release(&self, fail: bool) {
        self.fail_release.store(fail, Ordering::SeqCst);
    }

    /// Handles created and not yet dropped
    pub fn live_handles(&self) -> usize {
        self.counters.live.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously live handles ever observed
    pub fn peak_live_handles(&self) -> usize {
        self.counters.peak_live.load(Ordering::SeqCst)
    }

    pub fn created_count(&self) -> usize {
        self.counters.created.load(Ordering::SeqCst)
    }

    pub fn released_count(&self) -> usize {
        self.counters.released.load(Ordering::SeqCst)
    }

    fn lookup(&self, source: &str) -> Option<f64> {
        self.sources
            .lock()
            .ok()
            .and_then(|sources| sources.get(source).copied())
    }
}

#[async_trait]
impl EngineFactory for VirtualEngineFactory {
    async fn create(&self, source: &str) -> EngineResult<Box<dyn EngineHandle>> {
        let duration = self
            .lookup(source)
            .ok_or_else(|| EngineError::SourceNotFound {
                source_uri: source.to_string(),
            })?;

        self.counters.created.fetch_add(1, Ordering::SeqCst);
        let live = self.counters.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak_live.fetch_max(live, Ordering::SeqCst);
        log::debug!("Virtual engine created for {} ({} live)", source, live);

        Ok(Box::new(VirtualHandle {
            source: source.to_string(),
            clock: ClockState::new(duration),
            push_events: self.push_events.load(Ordering::SeqCst),
            listener: None,
            finish_task: None,
            released: false,
            fail_release: Arc::clone(&self.fail_release),
            counters: Arc::clone(&self.counters),
        }))
    }
}

/// One loaded source in the virtual engine
pub struct VirtualHandle {
    source: String,
    clock: ClockState,
    push_events: bool,
    listener: Option<mpsc::UnboundedSender<EngineEvent>>,
    finish_task: Option<JoinHandle<()>>,
    released: bool,
    fail_release: Arc<AtomicBool>,
    counters: Arc<FactoryCounters>,
}

impl VirtualHandle {
    fn ensure_loaded(&self) -> EngineResult<()> {
        if self.released {
            Err(EngineError::Released)
        } else {
            Ok(())
        }
    }

    fn snapshot(&self) -> EngineStatus {
        EngineStatus {
            playing: self.clock.is_playing(),
            position: self.clock.position(),
            duration: self.clock.duration(),
            did_just_finish: false,
        }
    }

    fn emit(&self, event: EngineEvent) {
        if let Some(listener) = &self.listener {
            let _ = listener.send(event);
        }
    }

    /// Re-arms the pushed "finished" event for the current clock
    fn reschedule_finish(&mut self) {
        if let Some(task) = self.finish_task.take() {
            task.abort();
        }

        let Some(listener) = self.listener.clone() else {
            return;
        };
        if !self.clock.is_playing() {
            return;
        }

        let remaining = self.clock.remaining();
        self.finish_task = Some(tokio::spawn(async move {
            tokio::time::sleep(remaining).await;
            let _ = listener.send(EngineEvent::Finished);
        }));
    }
}

#[async_trait]
impl EngineHandle for VirtualHandle {
    async fn play(&mut self) -> EngineResult<()> {
        self.ensure_loaded()?;
        self.clock.play();
        self.reschedule_finish();
        self.emit(EngineEvent::Status(self.snapshot()));
        Ok(())
    }

    async fn pause(&mut self) -> EngineResult<()> {
        self.ensure_loaded()?;
        self.clock.pause();
        self.reschedule_finish();
        self.emit(EngineEvent::Status(self.snapshot()));
        Ok(())
    }

    async fn seek(&mut self, seconds: f64) -> EngineResult<()> {
        self.ensure_loaded()?;
        if !seconds.is_finite() {
            return Err(EngineError::InvalidArgument {
                argument: "seconds".to_string(),
                reason: "must be finite".to_string(),
            });
        }
        self.clock.seek(seconds);
        self.reschedule_finish();
        self.emit(EngineEvent::Status(self.snapshot()));
        Ok(())
    }

    async fn set_rate(&mut self, rate: f32) -> EngineResult<()> {
        self.ensure_loaded()?;
        if !(rate > 0.0 && rate.is_finite()) {
            return Err(EngineError::InvalidArgument {
                argument: "rate".to_string(),
                reason: format!("{} is not a positive rate", rate),
            });
        }
        self.clock.set_rate(rate);
        self.reschedule_finish();
        Ok(())
    }

    async fn set_volume(&mut self, volume: f32) -> EngineResult<()> {
        self.ensure_loaded()?;
        if !(0.0..=1.0).contains(&volume) {
            return Err(EngineError::InvalidArgument {
                argument: "volume".to_string(),
                reason: format!("{} is outside 0.0 - 1.0", volume),
            });
        }
        self.clock.set_volume(volume);
        Ok(())
    }

    async fn release(&mut self) -> EngineResult<()> {
        self.ensure_loaded()?;
        if let Some(task) = self.finish_task.take() {
            task.abort();
        }
        self.clock.pause();
        self.released = true;

        if self.fail_release.load(Ordering::SeqCst) {
            return Err(EngineError::Device {
                message: format!("device refused to close {}", self.source),
            });
        }

        self.counters.released.fetch_add(1, Ordering::SeqCst);
        log::debug!("Virtual engine released {}", self.source);
        Ok(())
    }

    fn status(&mut self) -> EngineStatus {
        let did_just_finish = !self.released && self.clock.take_finished();
        EngineStatus {
            did_just_finish,
            ..self.snapshot()
        }
    }

    fn subscribe(&mut self) -> Option<mpsc::UnboundedReceiver<EngineEvent>> {
        if !self.push_events || self.released {
            return None;
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.listener = Some(tx);
        self.reschedule_finish();
        Some(rx)
    }

    fn remove_all_listeners(&mut self) {
        self.listener = None;
        if let Some(task) = self.finish_task.take() {
            task.abort();
        }
    }
}

impl Drop for VirtualHandle {
    fn drop(&mut self) {
        if let Some(task) = self.finish_task.take() {
            task.abort();
        }
        self.counters.live.fetch_sub(1, Ordering::SeqCst);
    }
}
