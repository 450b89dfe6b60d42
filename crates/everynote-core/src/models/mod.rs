//! Data models for EveryNote

mod category;
mod note;
mod user;

pub use category::{
    merge_categories, normalize_category, CATEGORY_MAX_CHARS, DEFAULT_CATEGORIES,
    DEFAULT_CATEGORY,
};
pub use note::{
    derive_title, format_timestamp, next_update_timestamp, now_timestamp, parse_timestamp, Note,
    NoteId, TITLE_MAX_CHARS, UNTITLED,
};
pub use user::User;
