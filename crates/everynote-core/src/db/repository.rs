//! Note repository implementation
//!
//! Rows are decoded explicitly: every column must be present as TEXT and the
//! timestamps must parse, otherwise the read fails with [`Error::Decode`]
//! naming the offending column.

use std::ffi::c_int;

use chrono::{DateTime, Utc};
use libsql::{Connection, Row, Value};

use crate::error::{Error, Result};
use crate::models::{format_timestamp, parse_timestamp, Note, NoteId};

const SQLITE_CONSTRAINT: c_int = 19;
const NOTE_COLUMN_COUNT: i32 = 6;

/// Trait for note storage operations (async)
#[allow(async_fn_in_trait)]
pub trait NoteRepository {
    /// Ensure the backing table exists. Idempotent.
    async fn initialize(&self) -> Result<()>;

    /// Insert a new note; fails with `ConstraintViolation` if the id is taken
    async fn insert(&self, note: &Note) -> Result<()>;

    /// Overwrite title, content, category and `updated_at` of an existing note.
    ///
    /// `id` and `created_at` are never written. Fails with `NotFound` when no
    /// row has the note's id.
    async fn update(&self, note: &Note) -> Result<()>;

    /// Get a note by ID
    async fn get(&self, id: &NoteId) -> Result<Option<Note>>;

    /// All notes, most recently updated first.
    ///
    /// Notes with equal `updated_at` are returned most recently inserted first.
    async fn list_all(&self) -> Result<Vec<Note>>;

    /// Delete a note. Deleting a missing id is a no-op.
    async fn delete(&self, id: &NoteId) -> Result<()>;

    /// Distinct categories in use, most recently used first
    async fn list_categories(&self) -> Result<Vec<String>>;
}

/// libSQL implementation of `NoteRepository`
pub struct LibSqlNoteRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlNoteRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl NoteRepository for LibSqlNoteRepository<'_> {
    async fn initialize(&self) -> Result<()> {
        super::migrations::run(self.conn).await
    }

    async fn insert(&self, note: &Note) -> Result<()> {
        note.validate()?;

        let created_at = format_timestamp(&note.created_at);
        let updated_at = format_timestamp(&note.updated_at);
        let result = self
            .conn
            .execute(
                "INSERT INTO Notes (id, title, content, category, createdAt, updatedAt)
                 VALUES (?, ?, ?, ?, ?, ?)",
                [
                    note.id.as_str(),
                    note.title.as_str(),
                    note.content.as_str(),
                    note.category.as_str(),
                    created_at.as_str(),
                    updated_at.as_str(),
                ],
            )
            .await;

        match result {
            Ok(_) => {
                tracing::debug!("Inserted note {}", note.id);
                Ok(())
            }
            Err(error) if is_constraint_violation(&error) => {
                Err(Error::ConstraintViolation(note.id.to_string()))
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn update(&self, note: &Note) -> Result<()> {
        note.validate()?;

        let updated_at = format_timestamp(&note.updated_at);
        // julianday compares instants, so legacy createdAt text with an offset
        // or without milliseconds is still ordered correctly
        let rows = self
            .conn
            .execute(
                "UPDATE Notes SET title = ?1, content = ?2, category = ?3, updatedAt = ?4
                 WHERE id = ?5 AND julianday(createdAt) <= julianday(?4)",
                [
                    note.title.as_str(),
                    note.content.as_str(),
                    note.category.as_str(),
                    updated_at.as_str(),
                    note.id.as_str(),
                ],
            )
            .await?;

        if rows == 0 {
            // Nothing was written; report why
            return match self.get(&note.id).await? {
                None => Err(Error::NotFound(note.id.to_string())),
                Some(existing) => Err(Error::InvalidInput(format!(
                    "updatedAt {} is earlier than the stored createdAt {}",
                    updated_at,
                    format_timestamp(&existing.created_at)
                ))),
            };
        }

        tracing::debug!("Updated note {}", note.id);
        Ok(())
    }

    async fn get(&self, id: &NoteId) -> Result<Option<Note>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, title, content, category, createdAt, updatedAt
                 FROM Notes
                 WHERE id = ?",
                [id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(decode_note(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_all(&self) -> Result<Vec<Note>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, title, content, category, createdAt, updatedAt
                 FROM Notes
                 ORDER BY rowid DESC",
                (),
            )
            .await?;

        let mut notes = Vec::new();
        while let Some(row) = rows.next().await? {
            notes.push(decode_note(&row)?);
        }

        // Stored text may carry offsets, so order by the parsed instant.
        // The sort is stable: equal instants stay newest insert first.
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(notes)
    }

    async fn delete(&self, id: &NoteId) -> Result<()> {
        let rows = self
            .conn
            .execute("DELETE FROM Notes WHERE id = ?", [id.as_str()])
            .await?;

        if rows == 0 {
            tracing::debug!("Delete of missing note {} ignored", id);
        }

        Ok(())
    }

    async fn list_categories(&self) -> Result<Vec<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT category, updatedAt
                 FROM Notes
                 WHERE category IS NOT NULL AND TRIM(category) <> ''",
                (),
            )
            .await?;

        let mut latest: Vec<(String, DateTime<Utc>)> = Vec::new();
        while let Some(row) = rows.next().await? {
            let category = text_column(&row, 0, "category")?;
            let updated_at = timestamp_column(&row, 1, "updatedAt")?;
            match latest.iter_mut().find(|(name, _)| *name == category) {
                Some(entry) => entry.1 = entry.1.max(updated_at),
                None => latest.push((category, updated_at)),
            }
        }

        latest.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(latest.into_iter().map(|(category, _)| category).collect())
    }
}

/// Decode a `SELECT id, title, content, category, createdAt, updatedAt` row
fn decode_note(row: &Row) -> Result<Note> {
    let columns = row.column_count();
    if columns != NOTE_COLUMN_COUNT {
        return Err(Error::Decode(format!(
            "expected {NOTE_COLUMN_COUNT} columns, found {columns}"
        )));
    }

    let id = text_column(row, 0, "id")?
        .parse::<NoteId>()
        .map_err(|_| Error::Decode("column `id` is empty".into()))?;

    Ok(Note {
        id,
        title: text_column(row, 1, "title")?,
        content: text_column(row, 2, "content")?,
        category: text_column(row, 3, "category")?,
        created_at: timestamp_column(row, 4, "createdAt")?,
        updated_at: timestamp_column(row, 5, "updatedAt")?,
    })
}

fn text_column(row: &Row, index: i32, name: &str) -> Result<String> {
    match row.get_value(index)? {
        Value::Text(text) => Ok(text),
        Value::Null => Err(Error::Decode(format!("column `{name}` is NULL"))),
        other => Err(Error::Decode(format!(
            "column `{name}` holds {} instead of TEXT",
            value_type_name(&other)
        ))),
    }
}

fn timestamp_column(row: &Row, index: i32, name: &str) -> Result<DateTime<Utc>> {
    let raw = text_column(row, index, name)?;
    parse_timestamp(&raw)
        .map_err(|error| Error::Decode(format!("column `{name}` is not ISO-8601 ({raw}): {error}")))
}

const fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "NULL",
        Value::Integer(_) => "INTEGER",
        Value::Real(_) => "REAL",
        Value::Text(_) => "TEXT",
        Value::Blob(_) => "BLOB",
    }
}

fn is_constraint_violation(error: &libsql::Error) -> bool {
    match error {
        // Extended result codes keep the primary code in the low byte
        libsql::Error::SqliteFailure(code, _) if (*code & 0xff) == SQLITE_CONSTRAINT => true,
        other => other.to_string().contains("UNIQUE constraint failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use chrono::TimeDelta;
    use pretty_assertions::assert_eq;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn at(raw: &str) -> DateTime<Utc> {
        parse_timestamp(raw).unwrap()
    }

    fn note_at(id: &str, content: &str, category: &str, timestamp: &str) -> Note {
        let mut note = Note::with_id(id.parse().unwrap(), content, category);
        note.created_at = at(timestamp);
        note.updated_at = at(timestamp);
        note
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_initialize_is_idempotent() {
        let db = setup().await;
        let repo = LibSqlNoteRepository::new(db.connection());

        repo.initialize().await.unwrap();
        repo.insert(&Note::new("Kept", "General")).await.unwrap();
        repo.initialize().await.unwrap();

        assert_eq!(repo.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_insert_then_list() {
        let db = setup().await;
        let repo = LibSqlNoteRepository::new(db.connection());

        let note = Note::with_id("n1".parse().unwrap(), "Buy milk", "To-Do");
        repo.insert(&note).await.unwrap();

        let notes = repo.list_all().await.unwrap();
        assert_eq!(notes, vec![note.clone()]);
        assert_eq!(notes[0].title, "Buy milk");
        assert_eq!(notes[0].created_at, notes[0].updated_at);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_insert_duplicate_id_is_constraint_violation() {
        let db = setup().await;
        let repo = LibSqlNoteRepository::new(db.connection());

        let note = Note::with_id("n1".parse().unwrap(), "First", "General");
        repo.insert(&note).await.unwrap();

        let clash = Note::with_id("n1".parse().unwrap(), "Second", "General");
        let err = repo.insert(&clash).await.unwrap_err();
        assert!(matches!(err, Error::ConstraintViolation(ref id) if id == "n1"));

        let notes = repo.list_all().await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].content, "First");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_insert_rejects_invalid_note() {
        let db = setup().await;
        let repo = LibSqlNoteRepository::new(db.connection());

        let mut note = Note::new("Hello", "General");
        note.updated_at = note.created_at - TimeDelta::seconds(5);
        assert!(matches!(
            repo.insert(&note).await,
            Err(Error::InvalidInput(_))
        ));
        assert!(repo.list_all().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_preserves_identity() {
        let db = setup().await;
        let repo = LibSqlNoteRepository::new(db.connection());

        let note = Note::with_id("n1".parse().unwrap(), "Buy milk", "To-Do");
        repo.insert(&note).await.unwrap();

        let mut revised = note.revise("Buy milk and eggs", "To-Do");
        // createdAt from the caller is ignored
        revised.created_at = note.created_at - TimeDelta::days(1);
        repo.update(&revised).await.unwrap();

        let notes = repo.list_all().await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, note.id);
        assert_eq!(notes[0].created_at, note.created_at);
        assert_eq!(notes[0].content, "Buy milk and eggs");
        assert!(notes[0].updated_at > note.updated_at);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_missing_is_not_found() {
        let db = setup().await;
        let repo = LibSqlNoteRepository::new(db.connection());

        let ghost = Note::with_id("ghost".parse().unwrap(), "Nobody", "General");
        let err = repo.update(&ghost).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(ref id) if id == "ghost"));
        assert!(repo.list_all().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_before_created_at_is_rejected() {
        let db = setup().await;
        let repo = LibSqlNoteRepository::new(db.connection());

        let note = note_at("n1", "Hello", "General", "2025-04-25T10:00:00.000Z");
        repo.insert(&note).await.unwrap();

        let stale = note_at("n1", "Rewritten", "General", "2025-04-24T10:00:00.000Z");
        assert!(matches!(
            repo.update(&stale).await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_orders_by_updated_at_desc() {
        let db = setup().await;
        let repo = LibSqlNoteRepository::new(db.connection());

        // Insert out of chronological order
        repo.insert(&note_at("b", "B", "General", "2025-04-25T10:00:02.000Z"))
            .await
            .unwrap();
        repo.insert(&note_at("c", "C", "General", "2025-04-25T10:00:03.000Z"))
            .await
            .unwrap();
        repo.insert(&note_at("a", "A", "General", "2025-04-25T10:00:01.000Z"))
            .await
            .unwrap();

        let ids: Vec<String> = repo
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|note| note.id.to_string())
            .collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_ties_are_newest_insert_first() {
        let db = setup().await;
        let repo = LibSqlNoteRepository::new(db.connection());

        let same = "2025-04-25T10:00:00.000Z";
        repo.insert(&note_at("first", "1", "General", same))
            .await
            .unwrap();
        repo.insert(&note_at("second", "2", "General", same))
            .await
            .unwrap();

        let notes = repo.list_all().await.unwrap();
        assert_eq!(notes[0].id.as_str(), "second");
        assert_eq!(notes[1].id.as_str(), "first");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_moves_note_to_front() {
        let db = setup().await;
        let repo = LibSqlNoteRepository::new(db.connection());

        let old = note_at("old", "Old", "General", "2025-04-25T10:00:00.000Z");
        let new = note_at("new", "New", "General", "2025-04-25T11:00:00.000Z");
        repo.insert(&old).await.unwrap();
        repo.insert(&new).await.unwrap();

        repo.update(&old.revise("Old, edited", "General"))
            .await
            .unwrap();

        let notes = repo.list_all().await.unwrap();
        assert_eq!(notes[0].id.as_str(), "old");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delete_is_idempotent() {
        let db = setup().await;
        let repo = LibSqlNoteRepository::new(db.connection());

        let note = Note::new("To delete", "General");
        repo.insert(&note).await.unwrap();

        repo.delete(&note.id).await.unwrap();
        assert!(repo.get(&note.id).await.unwrap().is_none());
        assert!(repo.list_all().await.unwrap().is_empty());

        repo.delete(&note.id).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_get() {
        let db = setup().await;
        let repo = LibSqlNoteRepository::new(db.connection());

        let note = Note::new("Hello world", "Meeting");
        repo.insert(&note).await.unwrap();

        assert_eq!(repo.get(&note.id).await.unwrap(), Some(note));
        let missing: NoteId = "missing".parse().unwrap();
        assert_eq!(repo.get(&missing).await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_decode_rejects_null_column() {
        let db = setup().await;
        let repo = LibSqlNoteRepository::new(db.connection());

        db.connection()
            .execute(
                "INSERT INTO Notes (id, title, content, category, createdAt, updatedAt)
                 VALUES ('legacy', NULL, 'Body', 'General',
                         '2025-04-25T10:00:00.000Z', '2025-04-25T10:00:00.000Z')",
                (),
            )
            .await
            .unwrap();

        let err = repo.list_all().await.unwrap_err();
        assert!(matches!(err, Error::Decode(ref msg) if msg.contains("title")));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_decode_rejects_bad_timestamp() {
        let db = setup().await;
        let repo = LibSqlNoteRepository::new(db.connection());

        db.connection()
            .execute(
                "INSERT INTO Notes (id, title, content, category, createdAt, updatedAt)
                 VALUES ('legacy', 'T', 'Body', 'General', 'yesterday', 'today')",
                (),
            )
            .await
            .unwrap();

        let legacy: NoteId = "legacy".parse().unwrap();
        let err = repo.get(&legacy).await.unwrap_err();
        assert!(matches!(err, Error::Decode(ref msg) if msg.contains("createdAt")));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_decode_rejects_non_text_column() {
        let db = setup().await;
        let repo = LibSqlNoteRepository::new(db.connection());

        db.connection()
            .execute(
                "INSERT INTO Notes (id, title, content, category, createdAt, updatedAt)
                 VALUES ('legacy', 'T', 'Body', X'6869',
                         '2025-04-25T10:00:00.000Z', '2025-04-25T10:00:00.000Z')",
                (),
            )
            .await
            .unwrap();

        let err = repo.list_all().await.unwrap_err();
        assert!(matches!(err, Error::Decode(ref msg) if msg.contains("BLOB")));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_categories() {
        let db = setup().await;
        let repo = LibSqlNoteRepository::new(db.connection());

        repo.insert(&note_at("a", "A", "Ideas", "2025-04-25T10:00:00.000Z"))
            .await
            .unwrap();
        repo.insert(&note_at("b", "B", "Travel", "2025-04-25T11:00:00.000Z"))
            .await
            .unwrap();
        repo.insert(&note_at("c", "C", "Ideas", "2025-04-25T09:00:00.000Z"))
            .await
            .unwrap();

        assert_eq!(
            repo.list_categories().await.unwrap(),
            vec!["Travel".to_string(), "Ideas".to_string()]
        );
    }

    /// Insert a row as another writer stored it, bypassing validation
    async fn insert_raw(db: &Database, id: &str, category: &str, timestamp: &str) {
        db.connection()
            .execute(
                "INSERT INTO Notes (id, title, content, category, createdAt, updatedAt)
                 VALUES (?1, ?1, ?1, ?2, ?3, ?3)",
                [id, category, timestamp],
            )
            .await
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_orders_mixed_timestamp_forms_by_instant() {
        let db = setup().await;
        let repo = LibSqlNoteRepository::new(db.connection());

        // 11:00+02:00 is 09:00Z, so it sorts after 10:00Z despite the larger text
        insert_raw(&db, "offset", "General", "2025-04-25T11:00:00+02:00").await;
        insert_raw(&db, "canonical", "General", "2025-04-25T10:00:00.000Z").await;
        insert_raw(&db, "seconds", "General", "2025-04-25T09:30:00Z").await;

        let notes = repo.list_all().await.unwrap();
        let ids: Vec<&str> = notes.iter().map(|note| note.id.as_str()).collect();
        assert_eq!(ids, vec!["canonical", "seconds", "offset"]);
        assert!(notes
            .windows(2)
            .all(|pair| pair[0].updated_at >= pair[1].updated_at));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_keeps_insert_order_for_same_instant_in_different_forms() {
        let db = setup().await;
        let repo = LibSqlNoteRepository::new(db.connection());

        insert_raw(&db, "first", "General", "2025-04-25T10:00:00.000Z").await;
        insert_raw(&db, "second", "General", "2025-04-25T12:00:00+02:00").await;

        let notes = repo.list_all().await.unwrap();
        assert_eq!(notes[0].id.as_str(), "second");
        assert_eq!(notes[1].id.as_str(), "first");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_categories_orders_mixed_timestamp_forms_by_instant() {
        let db = setup().await;
        let repo = LibSqlNoteRepository::new(db.connection());

        insert_raw(&db, "a", "Travel", "2025-04-25T11:00:00+02:00").await;
        insert_raw(&db, "b", "Ideas", "2025-04-25T10:00:00.000Z").await;

        assert_eq!(
            repo.list_categories().await.unwrap(),
            vec!["Ideas".to_string(), "Travel".to_string()]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_compares_created_at_as_instant() {
        let db = setup().await;
        let repo = LibSqlNoteRepository::new(db.connection());

        // Stored createdAt is 09:00Z
        insert_raw(&db, "legacy", "General", "2025-04-25T11:00:00+02:00").await;
        let legacy: NoteId = "legacy".parse().unwrap();

        let mut edited = note_at("legacy", "Edited", "General", "2025-04-25T10:00:00.000Z");
        edited.created_at = at("2025-04-25T09:00:00.000Z");
        repo.update(&edited).await.unwrap();
        assert_eq!(repo.get(&legacy).await.unwrap().unwrap().content, "Edited");

        let mut stale = note_at("legacy", "Stale", "General", "2025-04-25T08:59:59.999Z");
        stale.created_at = stale.updated_at;
        assert!(matches!(
            repo.update(&stale).await,
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(repo.get(&legacy).await.unwrap().unwrap().content, "Edited");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_rejected_update_leaves_no_open_transaction() {
        let db = setup().await;
        let repo = LibSqlNoteRepository::new(db.connection());

        let note = note_at("n1", "Hello", "General", "2025-04-25T10:00:00.000Z");
        repo.insert(&note).await.unwrap();

        let stale = note_at("n1", "Rewritten", "General", "2025-04-24T10:00:00.000Z");
        assert!(repo.update(&stale).await.is_err());
        let ghost = Note::with_id("ghost".parse().unwrap(), "Nobody", "General");
        assert!(repo.update(&ghost).await.is_err());

        // BEGIN fails inside an open transaction
        db.connection().execute("BEGIN", ()).await.unwrap();
        db.connection().execute("COMMIT", ()).await.unwrap();
        assert_eq!(repo.get(&note.id).await.unwrap(), Some(note));
    }
}
