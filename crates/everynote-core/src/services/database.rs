//! Shared database service wrapper used across clients.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use crate::db::{Database, LibSqlNoteRepository, NoteRepository};
use crate::models::{merge_categories, normalize_category, Note};
use crate::{Error, NoteId, Result};

/// Thread-safe service for DB and repository operations.
///
/// All calls share one connection; the mutex serializes them. A fatal store
/// failure closes the connection. File-backed services reopen it on the next
/// call, in-memory ones stay unavailable.
#[derive(Clone)]
pub struct DatabaseService {
    db: Arc<Mutex<Option<Database>>>,
    db_path: Option<PathBuf>,
}

impl DatabaseService {
    /// Open a database service at the given filesystem path.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|error| Error::StoreUnavailable(error.to_string()))?;
        }

        let db = Database::open(&db_path).await?;
        Ok(Self {
            db: Arc::new(Mutex::new(Some(db))),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory database service (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            db: Arc::new(Mutex::new(Some(db))),
            db_path: None,
        })
    }

    /// Replace the connection with a fresh one.
    ///
    /// In-memory services have nothing to reopen and return `false`.
    pub async fn reopen(&self) -> Result<bool> {
        let Some(db_path) = self.db_path.as_ref() else {
            return Ok(false);
        };

        tracing::warn!("Reopening note database at {}", db_path.display());
        let reopened = Database::open(db_path).await?;
        *self.db.lock().await = Some(reopened);
        Ok(true)
    }

    /// Whether the connection is currently open
    pub async fn is_available(&self) -> bool {
        self.db.lock().await.is_some()
    }

    /// Lock the connection slot, reopening a closed file-backed store first.
    async fn lock_open(&self) -> Result<MutexGuard<'_, Option<Database>>> {
        let mut slot = self.db.lock().await;
        if slot.is_none() {
            let Some(db_path) = self.db_path.as_ref() else {
                return Err(Error::StoreUnavailable(
                    "in-memory note store was closed after a failure".into(),
                ));
            };
            tracing::warn!("Reopening note database at {}", db_path.display());
            *slot = Some(Database::open(db_path).await?);
        }
        Ok(slot)
    }

    /// Close the connection when `result` is a fatal store failure.
    fn settle<T>(slot: &mut Option<Database>, result: Result<T>) -> Result<T> {
        if let Err(error) = &result {
            if error.is_fatal() && slot.take().is_some() {
                tracing::error!("Closing note database after fatal error: {}", error);
            }
        }
        result
    }

    /// Ensure the Notes table exists.
    pub async fn initialize(&self) -> Result<()> {
        let mut slot = self.lock_open().await?;
        let result = LibSqlNoteRepository::new(live(&slot)?.connection())
            .initialize()
            .await;
        Self::settle(&mut slot, result)
    }

    /// List all notes, most recently updated first.
    pub async fn list_notes(&self) -> Result<Vec<Note>> {
        let mut slot = self.lock_open().await?;
        let result = LibSqlNoteRepository::new(live(&slot)?.connection())
            .list_all()
            .await;
        Self::settle(&mut slot, result)
    }

    /// List notes in one category (case-insensitive), most recently updated first.
    pub async fn list_notes_in_category(&self, category: &str) -> Result<Vec<Note>> {
        let category = normalize_category(category)?.to_lowercase();
        Ok(self
            .list_notes()
            .await?
            .into_iter()
            .filter(|note| note.category.to_lowercase() == category)
            .collect())
    }

    /// Fetch a note by id.
    pub async fn get_note(&self, id: &NoteId) -> Result<Option<Note>> {
        let mut slot = self.lock_open().await?;
        let result = LibSqlNoteRepository::new(live(&slot)?.connection())
            .get(id)
            .await;
        Self::settle(&mut slot, result)
    }

    /// Create a note from editor input.
    ///
    /// Derives the title, assigns a fresh id and sets both timestamps to now.
    pub async fn create_note(&self, content: &str, category: &str) -> Result<Note> {
        let note = Note::new(normalize_content(content)?, normalize_category(category)?);
        self.insert_note(&note).await?;
        Ok(note)
    }

    /// Apply editor input to an existing note.
    ///
    /// Keeps `id` and `created_at`; `updated_at` always moves forward.
    pub async fn edit_note(&self, id: &NoteId, content: &str, category: &str) -> Result<Note> {
        let content = normalize_content(content)?;
        let category = normalize_category(category)?;

        let mut slot = self.lock_open().await?;
        let result = revise_stored(live(&slot)?, id, content, &category).await;
        Self::settle(&mut slot, result).inspect_err(|error| {
            tracing::error!("Failed to update note {}: {}", id, error);
        })
    }

    /// Insert a fully-formed note.
    pub async fn insert_note(&self, note: &Note) -> Result<()> {
        let mut slot = self.lock_open().await?;
        let result = LibSqlNoteRepository::new(live(&slot)?.connection())
            .insert(note)
            .await;
        Self::settle(&mut slot, result).inspect_err(|error| {
            tracing::error!("Failed to insert note {}: {}", note.id, error);
        })
    }

    /// Overwrite an existing note's mutable fields.
    pub async fn update_note(&self, note: &Note) -> Result<()> {
        let mut slot = self.lock_open().await?;
        let result = LibSqlNoteRepository::new(live(&slot)?.connection())
            .update(note)
            .await;
        Self::settle(&mut slot, result)
    }

    /// Delete a note; missing ids are ignored.
    pub async fn delete_note(&self, id: &NoteId) -> Result<()> {
        let mut slot = self.lock_open().await?;
        let result = LibSqlNoteRepository::new(live(&slot)?.connection())
            .delete(id)
            .await;
        Self::settle(&mut slot, result)
    }

    /// Default categories followed by the ones users created.
    pub async fn list_categories(&self) -> Result<Vec<String>> {
        let used = {
            let mut slot = self.lock_open().await?;
            let result = LibSqlNoteRepository::new(live(&slot)?.connection())
                .list_categories()
                .await;
            Self::settle(&mut slot, result)?
        };
        Ok(merge_categories(used))
    }
}

fn live(slot: &Option<Database>) -> Result<&Database> {
    slot.as_ref()
        .ok_or_else(|| Error::StoreUnavailable("note database is closed".into()))
}

async fn revise_stored(db: &Database, id: &NoteId, content: &str, category: &str) -> Result<Note> {
    let repo = LibSqlNoteRepository::new(db.connection());
    let existing = repo
        .get(id)
        .await?
        .ok_or_else(|| Error::NotFound(id.to_string()))?;

    let revised = existing.revise(content, category);
    repo.update(&revised).await?;
    Ok(revised)
}

fn normalize_content(content: &str) -> Result<&str> {
    if content.trim().is_empty() {
        return Err(Error::InvalidInput("Note content cannot be empty".into()));
    }
    Ok(content)
}
