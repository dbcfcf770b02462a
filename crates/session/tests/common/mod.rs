// crates/session/tests/common/mod.rs
//! Shared fixtures for session integration tests

#![allow(dead_code)]

use chapterline_core::{Book, Chapter, Duration};
use chapterline_media_engine::VirtualEngineFactory;
use chapterline_session::{
    ChannelNotifier, GuestFlag, PlaybackSession, SessionNotice, SharedSilenceSensor,
};
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct Harness {
    pub session: PlaybackSession,
    pub factory: Arc<VirtualEngineFactory>,
    pub notices: mpsc::UnboundedReceiver<SessionNotice>,
    pub guest: GuestFlag,
    pub silence: SharedSilenceSensor,
    pub book: Arc<Book>,
}

impl Harness {
    /// Book with `chapters` chapters of `chapter_secs` each, all registered
    pub fn new(chapters: usize, chapter_secs: u64) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let factory = Arc::new(VirtualEngineFactory::new());
        let book = Arc::new(book(chapters, chapter_secs));
        for chapter in &book.chapters {
            factory.register(chapter.source.clone(), chapter_secs as f64);
        }

        let (notifier, notices) = ChannelNotifier::new();
        let guest = GuestFlag::new(false);
        let silence = SharedSilenceSensor::new(false);
        let session = PlaybackSession::builder(factory.clone())
            .guest_flag(guest.clone())
            .silence_sensor(silence.clone())
            .notifier(notifier)
            .build();

        Self {
            session,
            factory,
            notices,
            guest,
            silence,
            book,
        }
    }

    pub async fn load(&self, chapter_index: usize) {
        self.session
            .load_book(self.book.clone(), chapter_index)
            .await
            .expect("chapter should load");
    }

    /// Every notice delivered so far
    pub fn drain_notices(&mut self) -> Vec<SessionNotice> {
        let mut notices = Vec::new();
        while let Ok(notice) = self.notices.try_recv() {
            notices.push(notice);
        }
        notices
    }
}

pub fn book(chapters: usize, chapter_secs: u64) -> Book {
    let chapters = (0..chapters)
        .map(|i| {
            Chapter::new(
                format!("Chapter {}", i + 1),
                format!("ch{}.mp3", i + 1),
                Duration::from_seconds(chapter_secs),
            )
        })
        .collect();
    Book::new("The Test Book", chapters).with_author("A. Writer")
}

pub async fn sleep_secs(seconds: f64) {
    tokio::time::sleep(std::time::Duration::from_secs_f64(seconds)).await;
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 0.01,
        "expected {expected}, got {actual}"
    );
}
