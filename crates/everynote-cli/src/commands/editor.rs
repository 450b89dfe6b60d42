//! Note input from piped stdin or an external editor.
//!
//! The editor works on a draft inside the data directory. A draft survives an
//! editor failure, and text kept by a failed save is offered again the next
//! time a note is composed.

use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::commands::common::normalize_content;
use crate::config::CliSettings;
use crate::error::CliError;

const DRAFT_FILE: &str = "draft-note.md";

/// Text for a new note and where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteInput {
    pub content: String,
    /// The editor was seeded with input a failed save preserved
    pub recovered: bool,
}

/// Content for a new note: arguments, then piped stdin, then the editor.
pub fn resolve_note_input(
    content_parts: &[String],
    settings: &CliSettings,
) -> Result<NoteInput, CliError> {
    if let Some(content) = normalize_content(&content_parts.join(" ")) {
        return Ok(NoteInput {
            content,
            recovered: false,
        });
    }

    if let Some(content) = read_piped_stdin()? {
        return Ok(NoteInput {
            content,
            recovered: false,
        });
    }

    let unsaved = read_unsaved_input(&settings.unsaved_note_path());
    let editor = preferred_editor(|key| std::env::var(key).ok());
    let initial = unsaved.as_deref().unwrap_or_default();
    let content =
        edit_in_editor(&editor, initial, &settings.data_dir)?.ok_or(CliError::EmptyContent)?;

    Ok(NoteInput {
        content,
        recovered: unsaved.is_some(),
    })
}

/// Text a failed save left behind, if any
pub fn read_unsaved_input(path: &Path) -> Option<String> {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|content| normalize_content(&content))
}

/// Forget preserved input once it has been saved.
pub fn discard_unsaved_input(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::info!("Recovered unsaved note from {}", path.display()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => tracing::warn!("Failed to remove {}: {}", path.display(), error),
    }
}

fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

/// Open `initial` in `editor` and return the trimmed result.
///
/// Returns `None` when the user leaves the draft blank. When the editor fails
/// the draft stays in `data_dir` and the error names it.
pub fn edit_in_editor(
    editor: &str,
    initial: &str,
    data_dir: &Path,
) -> Result<Option<String>, CliError> {
    std::fs::create_dir_all(data_dir)?;
    let draft = draft_path(data_dir);
    std::fs::write(&draft, initial)?;

    if let Err(error) = launch_editor(editor, &draft) {
        return Err(CliError::EditorFailed(format!(
            "{error}; draft kept at {}",
            draft.display()
        )));
    }

    let content = std::fs::read_to_string(&draft)?;
    if let Err(error) = std::fs::remove_file(&draft) {
        tracing::debug!("Failed to remove draft {}: {}", draft.display(), error);
    }
    Ok(normalize_content(&content))
}

pub fn draft_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DRAFT_FILE)
}

/// Run `editor` on `file_path`. The command may carry arguments,
/// e.g. `code --wait`.
fn launch_editor(editor: &str, file_path: &Path) -> Result<(), String> {
    let mut parts = editor.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| "no editor configured".to_string())?;

    let status = Command::new(program)
        .args(parts)
        .arg(file_path)
        .status()
        .map_err(|error| format!("could not start `{editor}`: {error}"))?;

    if status.success() {
        Ok(())
    } else {
        Err(format!("`{editor}` exited with {status}"))
    }
}

/// `$VISUAL`, then `$EDITOR`, then the platform default. Blank values are skipped.
pub fn preferred_editor(env: impl Fn(&str) -> Option<String>) -> String {
    ["VISUAL", "EDITOR"]
        .into_iter()
        .filter_map(&env)
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| default_editor().to_string())
}

pub const fn default_editor() -> &'static str {
    if cfg!(windows) {
        "notepad"
    } else {
        "vi"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn env_from(
        pairs: &'static [(&'static str, &'static str)],
    ) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value).to_string())
        }
    }

    #[test]
    fn preferred_editor_order() {
        assert_eq!(
            preferred_editor(env_from(&[("VISUAL", "code --wait"), ("EDITOR", "nano")])),
            "code --wait"
        );
        assert_eq!(
            preferred_editor(env_from(&[("VISUAL", "  "), ("EDITOR", "nano")])),
            "nano"
        );
        assert_eq!(preferred_editor(env_from(&[])), default_editor());
    }

    #[test]
    fn unsaved_input_is_read_back_trimmed() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("unsaved-note.txt");
        assert_eq!(read_unsaved_input(&path), None);

        std::fs::write(&path, "  Call the bank\n").unwrap();
        assert_eq!(read_unsaved_input(&path).as_deref(), Some("Call the bank"));

        discard_unsaved_input(&path);
        assert!(!path.exists());
        // Second discard is a no-op
        discard_unsaved_input(&path);
    }

    #[cfg(unix)]
    #[test]
    fn editor_that_keeps_the_draft_returns_initial_text() {
        let tmp = tempdir().unwrap();

        let content = edit_in_editor("true", "Recovered text", tmp.path()).unwrap();
        assert_eq!(content.as_deref(), Some("Recovered text"));
        assert!(!draft_path(tmp.path()).exists());
    }

    #[cfg(unix)]
    #[test]
    fn editor_writes_are_returned() {
        let tmp = tempdir().unwrap();
        // `cp <typed> <draft>` stands in for a user typing into the draft
        let typed = tmp.path().join("typed.txt");
        std::fs::write(&typed, "  Typed in editor\n").unwrap();
        let editor = format!("cp {}", typed.display());

        let data_dir = tmp.path().join("data");
        let content = edit_in_editor(&editor, "", &data_dir).unwrap();
        assert_eq!(content.as_deref(), Some("Typed in editor"));
    }

    #[cfg(unix)]
    #[test]
    fn failed_editor_keeps_draft() {
        let tmp = tempdir().unwrap();

        let error = edit_in_editor("false", "Half-written", tmp.path()).unwrap_err();
        assert!(matches!(error, CliError::EditorFailed(ref msg) if msg.contains("draft kept")));
        assert_eq!(
            std::fs::read_to_string(draft_path(tmp.path())).unwrap(),
            "Half-written"
        );
    }

    #[cfg(unix)]
    #[test]
    fn blank_draft_is_no_content() {
        let tmp = tempdir().unwrap();
        assert_eq!(edit_in_editor("true", "   ", tmp.path()).unwrap(), None);
    }

    #[test]
    fn missing_editor_program_is_reported() {
        let tmp = tempdir().unwrap();
        let error = edit_in_editor("everynote-no-such-editor", "x", tmp.path()).unwrap_err();
        assert!(
            matches!(error, CliError::EditorFailed(ref msg) if msg.contains("could not start"))
        );
    }
}
