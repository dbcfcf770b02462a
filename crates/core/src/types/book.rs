//! Book and chapter domain models
//!
//! Books arrive from the catalog fully formed; playback code only reads them.

use crate::types::{Duration, Validator};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookId(Uuid);

impl BookId {
    /// Creates a new random BookId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses a BookId from a UUID string
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for BookId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a chapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChapterId(Uuid);

impl ChapterId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ChapterId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ChapterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An audiobook as supplied by the catalog
///
/// Chapter order is playback order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: Option<String>,
    pub chapters: Vec<Chapter>,
}

impl Book {
    pub fn new(title: impl Into<String>, chapters: Vec<Chapter>) -> Self {
        Self {
            id: BookId::new(),
            title: title.into(),
            author: None,
            chapters,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn chapter(&self, index: usize) -> Option<&Chapter> {
        self.chapters.get(index)
    }

    pub fn chapter_count(&self) -> usize {
        self.chapters.len()
    }

    /// Sum of the nominal chapter durations
    pub fn total_duration(&self) -> Duration {
        Duration::from_millis(self.chapters.iter().map(|c| c.duration.as_millis()).sum())
    }
}

impl Validator for Book {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.title.trim().is_empty() {
            errors.push("Title cannot be empty".to_string());
        }

        if self.chapters.is_empty() {
            errors.push("Book must have at least one chapter".to_string());
        }

        for (index, chapter) in self.chapters.iter().enumerate() {
            if let Err(chapter_errors) = chapter.validate() {
                errors.extend(
                    chapter_errors
                        .into_iter()
                        .map(|e| format!("Chapter {}: {}", index, e)),
                );
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// A single playable chapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: ChapterId,
    pub title: String,
    /// Audio source reference handed to the engine factory
    pub source: String,
    /// Nominal duration from the catalog; the engine's report wins once playing
    pub duration: Duration,
}

impl Chapter {
    pub fn new(title: impl Into<String>, source: impl Into<String>, duration: Duration) -> Self {
        Self {
            id: ChapterId::new(),
            title: title.into(),
            source: source.into(),
            duration,
        }
    }
}

impl Validator for Chapter {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.title.trim().is_empty() {
            errors.push("Chapter title cannot be empty".to_string());
        }

        if self.source.trim().is_empty() {
            errors.push("Chapter source cannot be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
