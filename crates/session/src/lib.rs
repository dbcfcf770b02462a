//! Chapterline playback session
//!
//! Owns the one audio engine handle a listener has open and everything that
//! happens around it: transport commands, chapter navigation and automatic
//! advance, the sleep timer, guest preview limits and the silent playback
//! safeguard.
//!
//! # Example
//!
//! ```rust,no_run
//! use chapterline_core::{Book, Chapter, Duration};
//! use chapterline_media_engine::VirtualEngineFactory;
//! use chapterline_session::{PlaybackSession, PlayOutcome};
//! use std::sync::Arc;
//!
//! # async fn demo() -> chapterline_session::SessionResult<()> {
//! let factory = Arc::new(VirtualEngineFactory::new().with_source("ch1.mp3", 600.0));
//! let session = PlaybackSession::builder(factory).build();
//!
//! let book = Arc::new(Book::new(
//!     "The Long Walk",
//!     vec![Chapter::new("One", "ch1.mp3", Duration::from_seconds(600))],
//! ));
//! session.load_book(book, 0).await?;
//! assert_eq!(session.play().await?, PlayOutcome::Started);
//! # Ok(())
//! # }
//! ```

mod capabilities;
mod error;
mod guest;
mod navigator;
mod poller;
mod session;
mod silence;
mod sleep_timer;
mod transport;

pub use capabilities::{
    AlwaysAudible, ChannelNotifier, GuestFlag, GuestFlagProvider, NoopNotifier, SessionNotice,
    SessionNotifier, SharedSilenceSensor, SilenceSensor,
};
pub use error::{SessionError, SessionResult};
pub use guest::{GuestLimitReason, GuestPolicy, GuestPolicyGuard};
pub use navigator::RESTART_THRESHOLD_SECS;
pub use session::{PlaybackSession, SessionBuilder};
pub use silence::{SilenceTrigger, SilentPlaybackGuard, SilentPlaybackPrompt};
pub use transport::PlayOutcome;
