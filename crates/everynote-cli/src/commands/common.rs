use std::path::Path;

use chrono::{DateTime, Utc};
use everynote_core::models::format_timestamp;
use everynote_core::services::DatabaseService;
use everynote_core::{Note, NoteId};
use serde::Serialize;

use crate::error::CliError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteListItem {
    pub id: String,
    pub title: String,
    pub category: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
    pub relative_time: String,
}

pub async fn list_notes(
    category: Option<&str>,
    limit: Option<usize>,
    db_path: &Path,
) -> Result<Vec<Note>, CliError> {
    let db = open_database(db_path).await?;
    let notes = if let Some(category) = category {
        db.list_notes_in_category(category).await?
    } else {
        db.list_notes().await?
    };

    Ok(match limit {
        Some(limit) => notes.into_iter().take(limit).collect(),
        None => notes,
    })
}

pub async fn resolve_note_for_edit(
    note_query: &str,
    db: &DatabaseService,
) -> Result<Note, CliError> {
    if let Ok(note_id) = note_query.parse::<NoteId>() {
        if let Some(note) = db.get_note(&note_id).await? {
            return Ok(note);
        }
    }

    let mut matching = db
        .list_notes()
        .await?
        .into_iter()
        .filter(|note| note.id.as_str().starts_with(note_query))
        .collect::<Vec<_>>();

    match matching.len() {
        0 => Err(CliError::NoteNotFound(note_query.to_string())),
        1 => Ok(matching.remove(0)),
        _ => {
            let options = matching
                .iter()
                .take(3)
                .map(|note| short_id(&note.id))
                .collect::<Vec<_>>()
                .join(", ");

            Err(CliError::AmbiguousNoteId(format!(
                "ID prefix '{note_query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn short_id(id: &NoteId) -> String {
    id.as_str().chars().take(13).collect()
}

pub fn format_note_lines(notes: &[Note]) -> Vec<String> {
    let now = Utc::now();
    notes
        .iter()
        .map(|note| {
            let short_id = short_id(&note.id);
            let relative_time = format_relative_time(note.updated_at, now);
            format!(
                "{short_id:<13}  {:<10}  {:<20}  {relative_time}",
                note.category, note.title
            )
        })
        .collect()
}

pub fn note_to_list_item(note: &Note) -> NoteListItem {
    NoteListItem {
        id: note.id.to_string(),
        title: note.title.clone(),
        category: note.category.clone(),
        content: note.content.clone(),
        created_at: format_timestamp(&note.created_at),
        updated_at: format_timestamp(&note.updated_at),
        relative_time: format_relative_time(note.updated_at, Utc::now()),
    }
}

pub fn format_relative_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = (now - timestamp).num_milliseconds().max(0);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn normalize_note_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyNoteId)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Log a failed save and keep the typed text so it is not lost.
pub fn preserve_unsaved_input(error: CliError, content: &str, path: &Path) -> CliError {
    tracing::error!("Failed to save note: {}", error);

    let written = path
        .parent()
        .map_or(Ok(()), std::fs::create_dir_all)
        .and_then(|()| std::fs::write(path, content));

    match written {
        Ok(()) => CliError::Unsaved {
            source: Box::new(error),
            path: path.to_path_buf(),
        },
        Err(write_error) => {
            tracing::warn!(
                "Failed to preserve unsaved note at {}: {}",
                path.display(),
                write_error
            );
            error
        }
    }
}

pub async fn open_database(path: &Path) -> Result<DatabaseService, CliError> {
    Ok(DatabaseService::open_path(path).await?)
}
