//! Domain types for Chapterline
//!
//! - `book`: Book and Chapter as supplied by the catalog
//! - `playback`: Session-visible playback state
//! - `common`: Time types and the `Validator` trait

mod book;
mod common;
mod playback;

pub use book::{Book, BookId, Chapter, ChapterId};
pub use common::{Duration, Timestamp, Validator};
pub use playback::{PlaybackPhase, PlaybackState, SleepTimerState};
