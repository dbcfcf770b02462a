//! Session error types

use chapterline_core::{BookId, EngineError, ErrorSeverity};
use thiserror::Error;

pub type SessionResult<T> = Result<T, SessionError>;

/// Errors returned by [`crate::PlaybackSession`] operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// The engine could not be created for a chapter source
    #[error("Failed to load chapter {chapter_index} of book {book_id}: {source}")]
    Load {
        book_id: BookId,
        chapter_index: usize,
        #[source]
        source: EngineError,
    },

    #[error("Chapter index {index} out of range for {count} chapters")]
    ChapterOutOfRange { index: usize, count: usize },

    /// A command reached the engine and the engine refused it
    #[error("Engine rejected {command}: {source}")]
    Engine {
        command: &'static str,
        #[source]
        source: EngineError,
    },

    #[error("Invalid playback rate: {0} (must be positive)")]
    InvalidRate(f32),

    #[error("Invalid volume: {0}")]
    InvalidVolume(f32),

    #[error("Invalid skip interval: {0}")]
    InvalidSkip(f64),

    #[error("Sleep timer needs at least one minute")]
    InvalidSleepTimer,
}

impl SessionError {
    pub(crate) fn engine(command: &'static str) -> impl FnOnce(EngineError) -> Self {
        move |source| Self::Engine { command, source }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Load { source, .. } | Self::Engine { source, .. } => source.severity(),
            _ => ErrorSeverity::Recoverable,
        }
    }

    /// Message suitable for showing to the listener
    pub fn user_message(&self) -> String {
        match self {
            Self::Load { source, .. } | Self::Engine { source, .. } => source.user_message(),
            Self::ChapterOutOfRange { .. } => "That chapter does not exist.".to_string(),
            Self::InvalidRate(_) => "Playback speed must be above zero.".to_string(),
            Self::InvalidVolume(_) => "Volume must be between 0 and 100%.".to_string(),
            Self::InvalidSkip(_) => "Skip interval must be a number of seconds.".to_string(),
            Self::InvalidSleepTimer => "Choose a sleep timer of at least one minute.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_load_error_keeps_engine_cause() {
        let error = SessionError::Load {
            book_id: BookId::new(),
            chapter_index: 2,
            source: EngineError::SourceNotFound {
                source_uri: "ch3.mp3".to_string(),
            },
        };

        assert!(error.to_string().contains("chapter 2"));
        assert!(error.source().is_some());
        assert_eq!(error.severity(), ErrorSeverity::Degraded);
    }

    #[test]
    fn test_engine_error_helper() {
        let error = SessionError::engine("seek")(EngineError::Released);
        assert_eq!(
            error,
            SessionError::Engine {
                command: "seek",
                source: EngineError::Released
            }
        );
        assert!(error.to_string().starts_with("Engine rejected seek"));
    }

    #[test]
    fn test_caller_errors_are_recoverable() {
        assert_eq!(
            SessionError::InvalidRate(0.0).severity(),
            ErrorSeverity::Recoverable
        );
        assert!(!SessionError::InvalidSleepTimer.user_message().is_empty());
    }
}
