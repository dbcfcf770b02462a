//! Chapter navigation
//!
//! Every chapter change is a full reload: the current handle is retired and
//! a fresh one is created for the target chapter. Guests are checked against
//! the chapter limit before anything is torn down.

use crate::session::SessionCore;
use crate::{PlaybackSession, SessionError, SessionResult};
use chapterline_core::Book;
use std::sync::Arc;

/// "Previous" restarts the current chapter past this many seconds
pub const RESTART_THRESHOLD_SECS: f64 = 3.0;

/// Whether playback continues on the new chapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resume {
    /// Keep playing only if the old chapter was playing
    IfWasPlaying,
    /// Chapter finished on its own; the next one always starts
    Always,
}

impl PlaybackSession {
    pub async fn next_chapter(&self) -> SessionResult<()> {
        let mut core = self.shared.core.lock().await;
        let result = core.next_chapter(Resume::IfWasPlaying).await;
        self.shared.commit(core);
        result
    }

    /// Restarts the chapter, or goes back one if near its start
    pub async fn previous_chapter(&self) -> SessionResult<()> {
        let mut core = self.shared.core.lock().await;
        let result = core.previous_chapter().await;
        self.shared.commit(core);
        result
    }

    pub async fn jump_to_chapter(&self, index: usize) -> SessionResult<()> {
        let mut core = self.shared.core.lock().await;
        let result = core.jump_to_chapter(index).await;
        self.shared.commit(core);
        result
    }
}

impl SessionCore {
    pub(crate) async fn next_chapter(&mut self, resume: Resume) -> SessionResult<()> {
        let Some(book) = self.state.current_book.clone() else {
            return Ok(());
        };
        let next = self.state.current_chapter_index + 1;

        if let Some(reason) = self.guest.check_chapter(self.guest_flag.is_guest(), next) {
            self.pause_for_guest_limit(reason).await;
            return Ok(());
        }

        if next >= book.chapter_count() {
            log::debug!("Already on the last chapter of \"{}\"", book.title);
            return Ok(());
        }

        self.switch_chapter(book, next, resume).await
    }

    pub(crate) async fn previous_chapter(&mut self) -> SessionResult<()> {
        let Some(book) = self.state.current_book.clone() else {
            return Ok(());
        };

        if self.state.position > RESTART_THRESHOLD_SECS {
            return self.seek_to(0.0).await;
        }

        match self.state.current_chapter_index.checked_sub(1) {
            Some(previous) => self.switch_chapter(book, previous, Resume::IfWasPlaying).await,
            None => Ok(()),
        }
    }

    pub(crate) async fn jump_to_chapter(&mut self, index: usize) -> SessionResult<()> {
        let Some(book) = self.state.current_book.clone() else {
            return Ok(());
        };

        if index >= book.chapter_count() {
            return Err(SessionError::ChapterOutOfRange {
                index,
                count: book.chapter_count(),
            });
        }

        if let Some(reason) = self.guest.check_chapter(self.guest_flag.is_guest(), index) {
            self.pause_for_guest_limit(reason).await;
            return Ok(());
        }

        self.switch_chapter(book, index, Resume::IfWasPlaying).await
    }

    async fn switch_chapter(
        &mut self,
        book: Arc<Book>,
        index: usize,
        resume: Resume,
    ) -> SessionResult<()> {
        let should_play = match resume {
            Resume::Always => true,
            Resume::IfWasPlaying => self.state.is_playing,
        };

        self.load(book, index).await?;
        if should_play {
            self.play_unchecked().await?;
        }
        Ok(())
    }
}
