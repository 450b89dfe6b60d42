use crate::commands::common::{
    normalize_content, normalize_note_identifier, open_database, preserve_unsaved_input,
    resolve_note_for_edit,
};
use crate::commands::editor::{edit_in_editor, preferred_editor};
use crate::config::CliSettings;
use crate::error::CliError;

pub async fn run_edit(
    id: &str,
    content_parts: &[String],
    category: Option<&str>,
    settings: &CliSettings,
) -> Result<(), CliError> {
    let normalized_id = normalize_note_identifier(id)?;
    let db = open_database(&settings.db_path).await?;
    let note = resolve_note_for_edit(&normalized_id, &db).await?;

    let content = match normalize_content(&content_parts.join(" ")) {
        Some(content) => content,
        None => {
            let editor = preferred_editor(|key| std::env::var(key).ok());
            edit_in_editor(&editor, &note.content, &settings.data_dir)?
                .ok_or(CliError::EmptyContent)?
        }
    };
    let category = category.map_or_else(
        || note.category.clone(),
        |category| category.trim().to_string(),
    );

    if content == note.content && category == note.category {
        println!("{}", note.id);
        return Ok(());
    }

    match db.edit_note(&note.id, &content, &category).await {
        Ok(updated) => {
            println!("{}", updated.id);
            Ok(())
        }
        Err(error) => Err(preserve_unsaved_input(
            error.into(),
            &content,
            &settings.unsaved_note_path(),
        )),
    }
}
