use everynote_core::Note;

use crate::commands::common::{open_database, preserve_unsaved_input};
use crate::commands::editor::{discard_unsaved_input, resolve_note_input};
use crate::config::CliSettings;
use crate::error::CliError;

pub async fn run_add(
    content_parts: &[String],
    category: Option<&str>,
    settings: &CliSettings,
) -> Result<(), CliError> {
    let input = resolve_note_input(content_parts, settings)?;
    let category = category.unwrap_or(&settings.default_category);

    let note = match save_new_note(&input.content, category, settings).await {
        Ok(note) => note,
        Err(error) => {
            return Err(preserve_unsaved_input(
                error,
                &input.content,
                &settings.unsaved_note_path(),
            ))
        }
    };

    if input.recovered {
        discard_unsaved_input(&settings.unsaved_note_path());
    }

    println!("{}", note.id);
    Ok(())
}

async fn save_new_note(
    content: &str,
    category: &str,
    settings: &CliSettings,
) -> Result<Note, CliError> {
    let db = open_database(&settings.db_path).await?;
    Ok(db.create_note(content, category).await?)
}
