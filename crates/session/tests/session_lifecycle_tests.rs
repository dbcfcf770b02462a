// crates/session/tests/session_lifecycle_tests.rs
//! Engine handle lifecycle: loading, reloading, teardown and stop

mod common;

use async_trait::async_trait;
use chapterline_core::{
    EngineError, EngineEvent, EngineFactory, EngineHandle, EngineResult, EngineStatus,
    PlaybackPhase,
};
use chapterline_session::{PlayOutcome, PlaybackSession, SessionError};
use common::{assert_close, sleep_secs, Harness};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

#[tokio::test(start_paused = true)]
async fn test_load_book_starts_paused_at_zero() {
    let h = Harness::new(3, 60);
    h.load(1).await;

    let state = h.session.snapshot();
    assert_eq!(state.phase(), PlaybackPhase::Paused);
    assert_eq!(state.current_chapter_index, 1);
    assert_eq!(state.position, 0.0);
    assert_eq!(state.duration, 60.0);
    assert_eq!(
        state.current_chapter().map(|c| c.title.as_str()),
        Some("Chapter 2")
    );
    assert!(h.session.has_engine().await);
}

#[tokio::test(start_paused = true)]
async fn test_reloads_never_hold_two_handles() {
    let h = Harness::new(4, 60);

    for index in [0, 1, 2, 3, 2, 0, 0] {
        h.load(index).await;
        assert_eq!(h.factory.live_handles(), 1);
    }

    assert_eq!(h.factory.peak_live_handles(), 1);
    assert_eq!(h.factory.created_count(), 7);
    assert_eq!(h.factory.released_count(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_out_of_range_load_is_rejected() {
    let h = Harness::new(2, 60);
    h.load(0).await;

    let result = h.session.load_book(h.book.clone(), 5).await;
    assert_eq!(
        result,
        Err(SessionError::ChapterOutOfRange { index: 5, count: 2 })
    );
    // The current chapter is untouched
    assert!(h.session.has_engine().await);
    assert_eq!(h.session.snapshot().current_chapter_index, 0);
}

#[tokio::test(start_paused = true)]
async fn test_load_failure_leaves_no_handle() {
    let h = Harness::new(2, 60);
    h.load(0).await;
    h.session.play().await.unwrap();
    h.factory.unregister("ch2.mp3");

    let result = h.session.load_book(h.book.clone(), 1).await;
    assert!(matches!(
        result,
        Err(SessionError::Load {
            chapter_index: 1,
            source: EngineError::SourceNotFound { .. },
            ..
        })
    ));

    assert!(!h.session.has_engine().await);
    assert_eq!(h.factory.live_handles(), 0);
    let state = h.session.snapshot();
    assert_eq!(state.current_chapter_index, 0);
    assert!(!state.is_playing);
    assert_eq!(state.position, 0.0);

    // The session recovers once the source is reachable again
    h.factory.register("ch2.mp3", 60.0);
    h.load(1).await;
    assert_eq!(h.factory.live_handles(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_playback_returns_to_idle() {
    let h = Harness::new(2, 600);
    h.load(0).await;
    h.session.set_playback_rate(1.5).await.unwrap();
    h.session.set_sleep_timer(10).await.unwrap();
    h.session.play().await.unwrap();
    sleep_secs(3.0).await;

    h.session.stop_playback().await;

    let state = h.session.snapshot();
    assert!(state.is_idle());
    assert!(!state.is_playing);
    assert!(!state.sleep_timer.is_active);
    assert_eq!(state.playback_rate, 1.5);
    assert!(!h.session.has_engine().await);
    assert_eq!(h.factory.live_handles(), 0);
    assert_eq!(h.session.sleep_timer_remaining().await, None);

    // No poller keeps writing into the idle state
    sleep_secs(5.0).await;
    assert_eq!(h.session.snapshot(), state);
}

#[tokio::test(start_paused = true)]
async fn test_stop_without_book_is_harmless() {
    let h = Harness::new(1, 60);
    h.session.stop_playback().await;
    assert!(h.session.snapshot().is_idle());
}

#[tokio::test(start_paused = true)]
async fn test_failing_release_is_swallowed() {
    let h = Harness::new(2, 60);
    h.factory.set_fail_release(true);

    h.load(0).await;
    h.load(1).await;
    h.session.stop_playback().await;

    assert_eq!(h.factory.live_handles(), 0);
    assert!(!h.session.has_engine().await);
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_see_changes() {
    let h = Harness::new(2, 60);
    let mut states = h.session.subscribe();

    h.load(1).await;
    states.changed().await.unwrap();
    assert_eq!(states.borrow_and_update().current_chapter_index, 1);

    h.session.play().await.unwrap();
    states.changed().await.unwrap();
    assert!(states.borrow_and_update().is_playing);
}

#[tokio::test(start_paused = true)]
async fn test_poller_mirrors_engine_clock() {
    let h = Harness::new(1, 600);
    h.load(0).await;
    h.session.play().await.unwrap();

    sleep_secs(10.2).await;
    let state = h.session.snapshot();
    assert!(state.is_playing);
    assert_close(state.position, 10.0);
}

#[tokio::test(start_paused = true)]
async fn test_pushed_events_drive_state() {
    let h = Harness::new(2, 10);
    h.factory.set_push_events(true);
    h.load(0).await;
    h.session.play().await.unwrap();

    sleep_secs(11.0).await;
    let state = h.session.snapshot();
    assert_eq!(state.current_chapter_index, 1);
    assert!(state.is_playing);
    assert_eq!(h.factory.live_handles(), 1);
}

/// Handle whose teardown panics, for checking the session survives it
struct PanickingHandle;

#[async_trait]
impl EngineHandle for PanickingHandle {
    async fn play(&mut self) -> EngineResult<()> {
        Ok(())
    }

    async fn pause(&mut self) -> EngineResult<()> {
        Ok(())
    }

    async fn seek(&mut self, _seconds: f64) -> EngineResult<()> {
        Ok(())
    }

    async fn set_rate(&mut self, _rate: f32) -> EngineResult<()> {
        Ok(())
    }

    async fn set_volume(&mut self, _volume: f32) -> EngineResult<()> {
        Ok(())
    }

    async fn release(&mut self) -> EngineResult<()> {
        panic!("decoder exploded");
    }

    fn status(&mut self) -> EngineStatus {
        EngineStatus {
            playing: false,
            position: 0.0,
            duration: 60.0,
            did_just_finish: false,
        }
    }

    fn subscribe(&mut self) -> Option<mpsc::UnboundedReceiver<EngineEvent>> {
        None
    }

    fn remove_all_listeners(&mut self) {}
}

struct PanickingFactory;

#[async_trait]
impl EngineFactory for PanickingFactory {
    async fn create(&self, _source: &str) -> EngineResult<Box<dyn EngineHandle>> {
        Ok(Box::new(PanickingHandle))
    }
}

#[tokio::test(start_paused = true)]
async fn test_panicking_teardown_still_clears_handle() {
    let session = PlaybackSession::builder(Arc::new(PanickingFactory)).build();
    let book = Arc::new(common::book(2, 60));

    session.load_book(book.clone(), 0).await.unwrap();
    session.load_book(book, 1).await.unwrap();
    assert_eq!(session.snapshot().current_chapter_index, 1);

    session.stop_playback().await;
    assert!(!session.has_engine().await);
    assert_eq!(session.play().await, Ok(PlayOutcome::NoMedia));
}

/// Handle that counts listener removals and releases
struct CountingHandle {
    detached: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

#[async_trait]
impl EngineHandle for CountingHandle {
    async fn play(&mut self) -> EngineResult<()> {
        Ok(())
    }

    async fn pause(&mut self) -> EngineResult<()> {
        Ok(())
    }

    async fn seek(&mut self, _seconds: f64) -> EngineResult<()> {
        Ok(())
    }

    async fn set_rate(&mut self, _rate: f32) -> EngineResult<()> {
        Ok(())
    }

    async fn set_volume(&mut self, _volume: f32) -> EngineResult<()> {
        Ok(())
    }

    async fn release(&mut self) -> EngineResult<()> {
        self.released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn status(&mut self) -> EngineStatus {
        EngineStatus {
            playing: false,
            position: 0.0,
            duration: 60.0,
            did_just_finish: false,
        }
    }

    fn subscribe(&mut self) -> Option<mpsc::UnboundedReceiver<EngineEvent>> {
        None
    }

    fn remove_all_listeners(&mut self) {
        self.detached.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct CountingFactory {
    detached: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

#[async_trait]
impl EngineFactory for CountingFactory {
    async fn create(&self, _source: &str) -> EngineResult<Box<dyn EngineHandle>> {
        Ok(Box::new(CountingHandle {
            detached: Arc::clone(&self.detached),
            released: Arc::clone(&self.released),
        }))
    }
}

#[tokio::test(start_paused = true)]
async fn test_dropping_session_detaches_listeners() {
    let factory = Arc::new(CountingFactory::default());
    let session = PlaybackSession::builder(factory.clone()).build();
    let clone = session.clone();
    session
        .load_book(Arc::new(common::book(1, 60)), 0)
        .await
        .unwrap();

    drop(session);
    assert_eq!(factory.detached.load(Ordering::SeqCst), 0);

    drop(clone);
    assert_eq!(factory.detached.load(Ordering::SeqCst), 1);
    assert_eq!(factory.released.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_stopped_session_detaches_nothing_twice() {
    let factory = Arc::new(CountingFactory::default());
    let session = PlaybackSession::builder(factory.clone()).build();
    session
        .load_book(Arc::new(common::book(1, 60)), 0)
        .await
        .unwrap();

    session.stop_playback().await;
    drop(session);

    assert_eq!(factory.detached.load(Ordering::SeqCst), 1);
    assert_eq!(factory.released.load(Ordering::SeqCst), 1);
}
