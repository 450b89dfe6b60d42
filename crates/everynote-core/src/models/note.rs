//! Note model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Maximum number of characters kept in a derived title
pub const TITLE_MAX_CHARS: usize = 20;

/// Title used when a note has no visible text
pub const UNTITLED: &str = "Untitled";

/// A unique identifier for a note.
///
/// New notes get a UUID v7 (time-sortable); ids written by other clients are
/// accepted as opaque non-empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    /// Create a new unique note ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation of this ID
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NoteId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NoteId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("Note ID cannot be empty".into()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// A note in the system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Unique identifier, stable for the note's lifetime
    pub id: NoteId,
    /// Short label derived from the content
    pub title: String,
    /// Free text content
    pub content: String,
    /// User-chosen category label
    pub category: String,
    /// Creation timestamp, immutable after insert
    #[serde(with = "iso_timestamp")]
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    #[serde(with = "iso_timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// Create a new note with a fresh id
    #[must_use]
    pub fn new(content: impl Into<String>, category: impl Into<String>) -> Self {
        Self::with_id(NoteId::new(), content, category)
    }

    /// Create a new note with a caller-supplied id
    #[must_use]
    pub fn with_id(id: NoteId, content: impl Into<String>, category: impl Into<String>) -> Self {
        let content = content.into();
        let now = now_timestamp();
        Self {
            id,
            title: derive_title(&content),
            content,
            category: category.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Produce the next revision of this note.
    ///
    /// `id` and `created_at` are carried over; `updated_at` is guaranteed to be
    /// later than the current value.
    #[must_use]
    pub fn revise(&self, content: impl Into<String>, category: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            id: self.id.clone(),
            title: derive_title(&content),
            content,
            category: category.into(),
            created_at: self.created_at,
            updated_at: next_update_timestamp(self.updated_at),
        }
    }

    /// Check the fields the store relies on
    pub fn validate(&self) -> Result<()> {
        if self.id.as_str().trim().is_empty() {
            return Err(Error::InvalidInput("Note ID cannot be empty".into()));
        }
        if self.category.trim().is_empty() {
            return Err(Error::InvalidInput("Category cannot be empty".into()));
        }
        if self.updated_at < self.created_at {
            return Err(Error::InvalidInput(format!(
                "updatedAt {} is earlier than createdAt {}",
                format_timestamp(&self.updated_at),
                format_timestamp(&self.created_at)
            )));
        }
        Ok(())
    }

    /// Check if note content is empty (whitespace-only counts as empty)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Derive a title from note content.
///
/// Uses the first non-blank line, truncated to [`TITLE_MAX_CHARS`] characters,
/// or [`UNTITLED`] when there is no text.
///
/// ```
/// use everynote_core::models::derive_title;
///
/// assert_eq!(derive_title("Buy milk\nand eggs"), "Buy milk");
/// assert_eq!(derive_title("   "), "Untitled");
/// ```
#[must_use]
pub fn derive_title(content: &str) -> String {
    let title: String = content
        .trim()
        .lines()
        .next()
        .unwrap_or("")
        .trim_end()
        .chars()
        .take(TITLE_MAX_CHARS)
        .collect();

    if title.is_empty() {
        UNTITLED.to_string()
    } else {
        title
    }
}

/// Current time truncated to millisecond precision.
///
/// Stored timestamps carry milliseconds only, so truncating here keeps a note
/// equal to itself after a round trip through the store.
pub fn now_timestamp() -> DateTime<Utc> {
    truncate_to_millis(Utc::now())
}

/// Timestamp for an update following `previous`: now, or one millisecond after
/// `previous` if the clock has not moved past it.
pub fn next_update_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let floor = truncate_to_millis(previous) + TimeDelta::milliseconds(1);
    now_timestamp().max(floor)
}

/// Render a timestamp in the stored ISO-8601 form (`2025-04-25T10:00:00.000Z`).
///
/// All stored values share this fixed-width form, so lexical order in SQL
/// matches chronological order.
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an ISO-8601 / RFC 3339 timestamp into UTC
pub fn parse_timestamp(raw: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw.trim()).map(|value| value.with_timezone(&Utc))
}

fn truncate_to_millis(value: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(value.timestamp_millis()).unwrap_or(value)
}

mod iso_timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_id_unique() {
        let id1 = NoteId::new();
        let id2 = NoteId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_note_id_parse() {
        let id = NoteId::new();
        let parsed: NoteId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);

        let opaque: NoteId = "n1".parse().unwrap();
        assert_eq!(opaque.as_str(), "n1");
        assert!("  ".parse::<NoteId>().is_err());
    }

    #[test]
    fn test_note_new() {
        let note = Note::new("Buy milk", "To-Do");
        assert_eq!(note.title, "Buy milk");
        assert_eq!(note.category, "To-Do");
        assert_eq!(note.created_at, note.updated_at);
        assert!(note.validate().is_ok());
    }

    #[test]
    fn test_revise_keeps_identity_and_advances_time() {
        let note = Note::new("Buy milk", "To-Do");
        let revised = note.revise("Buy milk and eggs", "General");

        assert_eq!(revised.id, note.id);
        assert_eq!(revised.created_at, note.created_at);
        assert!(revised.updated_at > note.updated_at);
        assert_eq!(revised.title, "Buy milk and eggs");
        assert_eq!(revised.category, "General");
    }

    #[test]
    fn test_next_update_timestamp_is_strictly_later_than_future_value() {
        let future = now_timestamp() + TimeDelta::hours(1);
        let next = next_update_timestamp(future);
        assert_eq!(next, future + TimeDelta::milliseconds(1));
    }

    #[test]
    fn test_derive_title_truncates() {
        assert_eq!(
            derive_title("This is a fairly long first line"),
            "This is a fairly lon"
        );
        assert_eq!(derive_title("\n\n  Second try\nrest"), "Second try");
        assert_eq!(derive_title(""), UNTITLED);
    }

    #[test]
    fn test_derive_title_counts_characters_not_bytes() {
        let title = derive_title("ĉiuj ĝojoj ŝajnas ĥaosaj ĵaŭdon");
        assert_eq!(title.chars().count(), TITLE_MAX_CHARS);
    }

    #[test]
    fn test_validate_rejects_time_travel() {
        let mut note = Note::new("Hello", "General");
        note.updated_at = note.created_at - TimeDelta::seconds(1);
        assert!(matches!(note.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_validate_rejects_blank_category() {
        let note = Note::new("Hello", "  ");
        assert!(matches!(note.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_timestamp_format_roundtrip() {
        let parsed = parse_timestamp("2025-04-25T10:00:00.000Z").unwrap();
        assert_eq!(format_timestamp(&parsed), "2025-04-25T10:00:00.000Z");

        let offset = parse_timestamp("2025-04-25T12:00:00+02:00").unwrap();
        assert_eq!(format_timestamp(&offset), "2025-04-25T10:00:00.000Z");
    }

    #[test]
    fn test_json_uses_camel_case_iso_fields() {
        let mut note = Note::with_id("n1".parse().unwrap(), "Buy milk", "To-Do");
        note.created_at = parse_timestamp("2025-04-25T10:00:00.000Z").unwrap();
        note.updated_at = note.created_at;

        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["id"], "n1");
        assert_eq!(json["createdAt"], "2025-04-25T10:00:00.000Z");
        assert_eq!(json["updatedAt"], "2025-04-25T10:00:00.000Z");

        let back: Note = serde_json::from_value(json).unwrap();
        assert_eq!(back, note);
    }

    #[test]
    fn test_is_empty() {
        assert!(Note::new("   ", "General").is_empty());
        assert!(!Note::new("Hello", "General").is_empty());
    }
}
