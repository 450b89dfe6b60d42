//! Note categories
//!
//! Categories are plain labels. A small default set is always offered and
//! users may add their own; anything non-blank is accepted.

use std::collections::HashSet;

use crate::error::{Error, Result};

/// Categories offered before the user creates any
pub const DEFAULT_CATEGORIES: [&str; 3] = ["General", "Meeting", "To-Do"];

/// Category preselected for a new note
pub const DEFAULT_CATEGORY: &str = "To-Do";

/// Longest accepted category label, in characters
pub const CATEGORY_MAX_CHARS: usize = 40;

/// Trim and validate a category label
pub fn normalize_category(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("Category cannot be empty".into()));
    }
    if trimmed.chars().count() > CATEGORY_MAX_CHARS {
        return Err(Error::InvalidInput(format!(
            "Category must be at most {CATEGORY_MAX_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Defaults first, then user categories in the given order.
///
/// Duplicates are dropped case-insensitively; the first spelling wins.
pub fn merge_categories<I>(used: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    DEFAULT_CATEGORIES
        .iter()
        .map(|name| (*name).to_string())
        .chain(used)
        .filter(|name| !name.trim().is_empty())
        .filter(|name| seen.insert(name.to_lowercase()))
        .collect()
}
