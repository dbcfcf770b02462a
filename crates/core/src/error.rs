//! Engine error taxonomy
//!
//! Every engine failure carries a severity so callers can decide between
//! retrying, degrading and giving up:
//! - **Recoverable**: a retry may succeed (device briefly busy)
//! - **Degraded**: this source cannot play, the session can continue
//! - **Fatal**: the engine itself is unusable

use std::fmt;
use thiserror::Error;

/// Error severity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Recoverable,
    Degraded,
    Fatal,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recoverable => write!(f, "Recoverable"),
            Self::Degraded => write!(f, "Degraded"),
            Self::Fatal => write!(f, "Fatal"),
        }
    }
}

/// Failure reported by an audio engine or its factory
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The source URI could not be resolved
    #[error("Audio source not found: {source_uri}")]
    SourceNotFound { source_uri: String },

    /// The source resolved but could not be decoded
    #[error("Audio decode error for {source_uri}: {message}")]
    Decode { source_uri: String, message: String },

    /// Output device unavailable or busy
    #[error("Playback device error: {message}")]
    Device { message: String },

    /// A command reached a handle after `release`
    #[error("Engine handle already released")]
    Released,

    /// A command argument the engine refuses
    #[error("Invalid argument: {argument} - {reason}")]
    InvalidArgument { argument: String, reason: String },

    #[error("Internal engine error: {message}")]
    Internal { message: String },
}

impl EngineError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Device { .. } => ErrorSeverity::Recoverable,
            Self::SourceNotFound { .. }
            | Self::Decode { .. }
            | Self::Released
            | Self::InvalidArgument { .. } => ErrorSeverity::Degraded,
            Self::Internal { .. } => ErrorSeverity::Fatal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.severity() == ErrorSeverity::Recoverable
    }

    /// Message suitable for showing to a listener
    pub fn user_message(&self) -> String {
        match self {
            Self::SourceNotFound { .. } => {
                "This chapter is not available right now.".to_string()
            }
            Self::Decode { .. } => {
                "Cannot play this chapter. The audio may be damaged.".to_string()
            }
            Self::Device { .. } => {
                "Cannot access audio playback. Please check your device settings.".to_string()
            }
            Self::Released | Self::Internal { .. } => {
                "An unexpected playback error occurred. Please try again.".to_string()
            }
            Self::InvalidArgument { .. } => "Invalid playback setting.".to_string(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Convenience type alias for engine results
pub type EngineResult<T> = std::result::Result<T, EngineError>;
