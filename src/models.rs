//! Domain models for the reading collection. These types are the exact shape
//! that gets serialized into durable storage, so the serde attributes here
//! double as the persistence schema. Validation lives next to the data it
//! guards so `BookStore::add` and `BookStore::update` share one rule set.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Lowest rating a saved book may carry.
pub const MIN_RATING: u8 = 1;
/// Highest rating a saved book may carry.
pub const MAX_RATING: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
/// Identifier assigned by the store when a book is first added. Serialized as
/// the hyphenated UUID string.
pub struct BookId(Uuid);

impl BookId {
    /// Generate a fresh random identifier.
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BookId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// A single tracked reading entry.
pub struct Book {
    /// Store-assigned identifier; never changes once set.
    pub id: BookId,
    /// Title shown on cards and used by text search.
    pub title: String,
    /// Author exactly as the user typed it. Search compares case-insensitively
    /// but the original spelling is what aggregates report.
    pub author: String,
    /// Star rating between [`MIN_RATING`] and [`MAX_RATING`].
    pub rating: u8,
    /// Free-form notes, possibly empty.
    pub notes: String,
    /// Cover payload handed over by the image picker: a data URI or a URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    /// Creation timestamp, written as RFC 3339.
    pub date_added: DateTime<Utc>,
}

impl Book {
    /// Check the invariants every stored record must satisfy.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(&self.title, &self.author, self.rating)
    }

    /// `Title by Author`, used by list rows and status messages.
    pub fn display_title(&self) -> String {
        format!("{} by {}", self.title, self.author)
    }

    /// Whether the cover is something a browser can open, as opposed to an
    /// inline data URI.
    pub fn cover_link(&self) -> Option<&str> {
        self.cover_image
            .as_deref()
            .map(str::trim)
            .filter(|cover| cover.starts_with("http://") || cover.starts_with("https://"))
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// User input for a book that does not exist yet. The store assigns the id and,
/// unless one is provided here, the timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    /// `0` is what an untouched rating widget produces; it fails validation.
    pub rating: u8,
    pub notes: String,
    pub cover_image: Option<String>,
    /// Explicit creation time, mostly useful for imports and tests.
    pub date_added: Option<DateTime<Utc>>,
}

impl BookDraft {
    /// Draft with the required fields filled in and everything else empty.
    pub fn new(title: impl Into<String>, author: impl Into<String>, rating: u8) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            rating,
            ..Self::default()
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_cover_image(mut self, cover: impl Into<String>) -> Self {
        self.cover_image = Some(cover.into());
        self
    }

    pub fn with_date_added(mut self, date_added: DateTime<Utc>) -> Self {
        self.date_added = Some(date_added);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(&self.title, &self.author, self.rating)
    }
}

/// Partial update for an existing book. `None` leaves a field untouched.
///
/// `cover_image` is doubly optional: `Some(None)` removes the cover while
/// `None` keeps whatever is stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub rating: Option<u8>,
    pub notes: Option<String>,
    pub cover_image: Option<Option<String>>,
}

impl BookPatch {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn rating(mut self, rating: u8) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn cover_image(mut self, cover: Option<String>) -> Self {
        self.cover_image = Some(cover);
        self
    }

    /// True when applying the patch would not change anything.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.rating.is_none()
            && self.notes.is_none()
            && self.cover_image.is_none()
    }

    /// Produce the merged record without touching `book`. `id` and
    /// `date_added` always come from the original.
    pub(crate) fn apply_to(&self, book: &Book) -> Book {
        let mut merged = book.clone();
        if let Some(title) = &self.title {
            merged.title = title.clone();
        }
        if let Some(author) = &self.author {
            merged.author = author.clone();
        }
        if let Some(rating) = self.rating {
            merged.rating = rating;
        }
        if let Some(notes) = &self.notes {
            merged.notes = notes.clone();
        }
        if let Some(cover) = &self.cover_image {
            merged.cover_image = cover.clone();
        }
        merged
    }
}

/// Shared rule set for drafts, merged patches, and records read back from
/// storage. Whitespace-only text counts as empty.
fn validate_fields(title: &str, author: &str, rating: u8) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if author.trim().is_empty() {
        return Err(ValidationError::EmptyAuthor);
    }
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(ValidationError::RatingOutOfRange(rating));
    }
    Ok(())
}
