//! Chapterline core - domain types and engine capabilities shared by every crate

pub mod error;
pub mod traits;
pub mod types;

pub use error::{EngineError, EngineResult, ErrorSeverity};
pub use traits::{EngineEvent, EngineFactory, EngineHandle, EngineStatus};
pub use types::{
    Book, BookId, Chapter, ChapterId, Duration, PlaybackPhase, PlaybackState, SleepTimerState,
    Timestamp, Validator,
};
